//! Line protocol spoken between the host and the keypad firmware.
//!
//! The device link carries plain ASCII lines. This crate turns the raw byte
//! stream into lines ([`LineParser`]), lines into typed device messages
//! ([`decode`]), and indicator state into outbound command lines
//! ([`IndicatorCommand`]).
//!
//! ```
//! use keytally_protocol::{DeviceMessage, LineParser, decode};
//! use keytally_core::{ButtonEvent, ButtonId};
//!
//! let mut parser = LineParser::new();
//! parser.feed(b"booting...\nBTN:");
//! parser.feed(b"4\n");
//!
//! let messages: Vec<_> = parser
//!     .drain_lines()
//!     .filter_map(|line| decode(&line).ok().flatten())
//!     .collect();
//!
//! assert_eq!(
//!     messages,
//!     vec![DeviceMessage::Button(ButtonEvent::press(ButtonId::new(4).unwrap()))]
//! );
//! ```

pub mod decoder;
pub mod indicator;
pub mod line_parser;

pub use decoder::{DecodeError, DeviceMessage, decode};
pub use indicator::IndicatorCommand;
pub use line_parser::{DrainLines, LineParser};
