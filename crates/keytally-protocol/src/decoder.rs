//! Decoder for lines sent by the keypad.
//!
//! The device channel is shared with diagnostic output from the firmware,
//! so the decoder distinguishes three outcomes:
//!
//! | Input | Result |
//! |-------|--------|
//! | `BTN:4`, `BTN:4:LONG`, `BTN:4,LONG` | `Ok(Some(DeviceMessage::Button(..)))` |
//! | `PONG:<id>` | `Ok(Some(DeviceMessage::Identity(..)))` |
//! | anything else | `Ok(None)` |
//! | `BTN:` with a bad number or suffix | `Err(DecodeError)` |
//!
//! A decode error only concerns the offending line; callers log it and keep
//! reading.

use keytally_core::constants::{BUTTON_PREFIX, LONG_PRESS_TOKEN, PONG_PREFIX};
use keytally_core::{ButtonEvent, ButtonId, PressKind};
use thiserror::Error;

/// Message received from the keypad.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeviceMessage {
    /// Button press or long press.
    Button(ButtonEvent),

    /// Reply to a `PING` probe carrying the device identity.
    Identity(String),
}

/// Error for a line that claims to be a button event but is malformed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    /// The button field is missing or not a decimal number.
    #[error("Invalid button number in {line:?}")]
    InvalidNumber { line: String },

    /// The button number is outside 1-9.
    #[error("Button {value} out of range in {line:?}")]
    ButtonOutOfRange { line: String, value: u32 },

    /// Something other than the long-press marker follows the number.
    #[error("Unexpected suffix {suffix:?} in {line:?}")]
    UnexpectedSuffix { line: String, suffix: String },
}

/// Decode one line from the device.
///
/// # Errors
///
/// Returns a [`DecodeError`] if the line starts with `BTN:` but does not
/// follow `BTN:<digits>[(:|,)LONG]`.
///
/// # Example
///
/// ```
/// use keytally_protocol::{DeviceMessage, decode};
/// use keytally_core::{ButtonEvent, ButtonId};
///
/// let nine = ButtonId::new(9).unwrap();
/// assert_eq!(
///     decode("BTN:9:LONG").unwrap(),
///     Some(DeviceMessage::Button(ButtonEvent::long_press(nine)))
/// );
/// assert_eq!(decode("code.py output:").unwrap(), None);
/// assert!(decode("BTN:x").is_err());
/// ```
pub fn decode(line: &str) -> Result<Option<DeviceMessage>, DecodeError> {
    let line = line.trim();

    if let Some(rest) = line.strip_prefix(BUTTON_PREFIX) {
        return decode_button(line, rest).map(|event| Some(DeviceMessage::Button(event)));
    }

    if let Some(identity) = line.strip_prefix(PONG_PREFIX) {
        return Ok(Some(DeviceMessage::Identity(identity.trim().to_string())));
    }

    Ok(None)
}

fn decode_button(line: &str, rest: &str) -> Result<ButtonEvent, DecodeError> {
    let digits_end = rest
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(rest.len());
    let (digits, suffix) = rest.split_at(digits_end);

    if digits.is_empty() {
        return Err(DecodeError::InvalidNumber {
            line: line.to_string(),
        });
    }

    let value: u32 = digits.parse().map_err(|_| DecodeError::InvalidNumber {
        line: line.to_string(),
    })?;

    let button = u8::try_from(value)
        .ok()
        .and_then(|v| ButtonId::new(v).ok())
        .ok_or_else(|| DecodeError::ButtonOutOfRange {
            line: line.to_string(),
            value,
        })?;

    let kind = match suffix {
        "" => PressKind::Press,
        s if is_long_suffix(s) => PressKind::LongPress,
        other => {
            return Err(DecodeError::UnexpectedSuffix {
                line: line.to_string(),
                suffix: other.to_string(),
            });
        }
    };

    Ok(ButtonEvent { button, kind })
}

fn is_long_suffix(suffix: &str) -> bool {
    suffix
        .strip_prefix([':', ','])
        .is_some_and(|token| token == LONG_PRESS_TOKEN)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn button(id: u8) -> ButtonId {
        ButtonId::new(id).unwrap()
    }

    #[rstest]
    #[case("BTN:1", ButtonEvent::press(button(1)))]
    #[case("BTN:9", ButtonEvent::press(button(9)))]
    #[case("  BTN:5  ", ButtonEvent::press(button(5)))]
    #[case("BTN:5:LONG", ButtonEvent::long_press(button(5)))]
    #[case("BTN:2,LONG", ButtonEvent::long_press(button(2)))]
    #[case("BTN:03", ButtonEvent::press(button(3)))]
    fn test_decode_button(#[case] line: &str, #[case] expected: ButtonEvent) {
        assert_eq!(
            decode(line).unwrap(),
            Some(DeviceMessage::Button(expected))
        );
    }

    #[test]
    fn test_press_and_long_press_are_distinct() {
        let press = decode("BTN:4").unwrap();
        let long = decode("BTN:4:LONG").unwrap();
        assert_ne!(press, long);
    }

    #[rstest]
    #[case("")]
    #[case("Hello from CircuitPython")]
    #[case("btn:1")]
    #[case("LED:ALL:0,0,0")]
    #[case("BTN")]
    fn test_decode_ignores_foreign_lines(#[case] line: &str) {
        assert_eq!(decode(line).unwrap(), None);
    }

    #[test]
    fn test_decode_identity() {
        assert_eq!(
            decode("PONG:PICO-KEYPAD-V1").unwrap(),
            Some(DeviceMessage::Identity("PICO-KEYPAD-V1".to_string()))
        );
        assert_eq!(
            decode("PONG:").unwrap(),
            Some(DeviceMessage::Identity(String::new()))
        );
    }

    #[rstest]
    #[case("BTN:")]
    #[case("BTN:x")]
    #[case("BTN::LONG")]
    #[case("BTN:99999999999999999999")]
    fn test_decode_invalid_number(#[case] line: &str) {
        assert!(matches!(
            decode(line),
            Err(DecodeError::InvalidNumber { .. }) | Err(DecodeError::ButtonOutOfRange { .. })
        ));
    }

    #[rstest]
    #[case("BTN:0", 0)]
    #[case("BTN:10", 10)]
    #[case("BTN:300:LONG", 300)]
    fn test_decode_out_of_range(#[case] line: &str, #[case] value: u32) {
        assert_eq!(
            decode(line),
            Err(DecodeError::ButtonOutOfRange {
                line: line.trim().to_string(),
                value
            })
        );
    }

    #[rstest]
    #[case("BTN:4:SHORT", ":SHORT")]
    #[case("BTN:4:long", ":long")]
    #[case("BTN:4 LONG", " LONG")]
    #[case("BTN:4,", ",")]
    fn test_decode_unexpected_suffix(#[case] line: &str, #[case] suffix: &str) {
        assert_eq!(
            decode(line),
            Err(DecodeError::UnexpectedSuffix {
                line: line.to_string(),
                suffix: suffix.to_string()
            })
        );
    }

    #[test]
    fn test_error_display_mentions_line() {
        let err = decode("BTN:abc").unwrap_err();
        assert!(err.to_string().contains("BTN:abc"));
    }
}
