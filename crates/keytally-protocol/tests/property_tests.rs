//! Property-based tests for line framing and event decoding.
//!
//! The device link is noisy: diagnostic prints share the channel with button
//! events and reads split lines at arbitrary points. These properties check
//! that neither affects which events come out.

use keytally_core::{ButtonEvent, ButtonId, PressKind};
use keytally_protocol::{DeviceMessage, IndicatorCommand, LineParser, decode};
use proptest::prelude::*;

/// Strategy for generating valid button events.
fn button_event() -> impl Strategy<Value = ButtonEvent> {
    (1u8..=9u8, any::<bool>()).prop_map(|(id, long)| {
        let button = ButtonId::new(id).expect("strategy yields 1-9");
        if long {
            ButtonEvent::long_press(button)
        } else {
            ButtonEvent::press(button)
        }
    })
}

/// Strategy for diagnostic lines that never look like protocol lines.
fn noise_line() -> impl Strategy<Value = String> {
    prop::string::string_regex("[a-z ]{0,30}").expect("Failed to create noise regex strategy")
}

fn wire_line(event: &ButtonEvent) -> String {
    match event.kind {
        PressKind::Press => format!("BTN:{}\n", event.button),
        PressKind::LongPress => format!("BTN:{}:LONG\n", event.button),
    }
}

proptest! {
    /// Property: however the byte stream is chunked, the same events come out
    /// in the same order.
    #[test]
    fn prop_chunking_preserves_events(
        events in prop::collection::vec(button_event(), 1..20),
        chunk in 1usize..16,
    ) {
        let stream: String = events.iter().map(wire_line).collect();

        let mut parser = LineParser::new();
        let mut decoded = Vec::new();
        for piece in stream.as_bytes().chunks(chunk) {
            parser.feed(piece);
            for line in parser.drain_lines() {
                if let Ok(Some(DeviceMessage::Button(event))) = decode(&line) {
                    decoded.push(event);
                }
            }
        }

        prop_assert_eq!(decoded, events);
        prop_assert_eq!(parser.pending_bytes(), 0);
    }

    /// Property: diagnostic lines interleaved with events are ignored and
    /// never turn into decode errors.
    #[test]
    fn prop_noise_is_ignored(
        events in prop::collection::vec(button_event(), 1..10),
        noise in prop::collection::vec(noise_line(), 1..10),
    ) {
        let mut parser = LineParser::new();
        for (event, junk) in events.iter().zip(noise.iter().cycle()) {
            parser.feed(format!("{junk}\n").as_bytes());
            parser.feed(wire_line(event).as_bytes());
        }

        let mut decoded = Vec::new();
        for line in parser.drain_lines() {
            match decode(&line) {
                Ok(Some(DeviceMessage::Button(event))) => decoded.push(event),
                Ok(_) => {}
                Err(e) => prop_assert!(false, "noise produced decode error: {}", e),
            }
        }

        prop_assert_eq!(decoded, events);
    }

    /// Property: decode never panics on arbitrary input.
    #[test]
    fn prop_decode_total(line in ".*") {
        let _ = decode(&line);
    }

    /// Property: every encoded indicator command parses back to itself.
    #[test]
    fn prop_indicator_lines_are_parseable(
        index in 0u8..8,
        r in any::<u8>(), g in any::<u8>(), b in any::<u8>(),
    ) {
        let index = keytally_core::IndicatorIndex::new(index).expect("strategy yields 0-7");
        let color = keytally_core::Rgb::new(r, g, b);
        for command in [
            IndicatorCommand::All(color),
            IndicatorCommand::set(index, color),
            IndicatorCommand::animate(index, color),
        ] {
            let parsed: IndicatorCommand = command.encode().parse().expect("encoded command parses");
            prop_assert_eq!(parsed, command);
        }
    }
}
