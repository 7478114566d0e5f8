//! Constants shared by the keypad bridge.
//!
//! This module centralizes every fixed value of the device link and the
//! time-tracking log: wire tokens exchanged with the firmware, timings for
//! polling and reconnecting, the indicator layout owned by the host, and
//! the naming of the per-day log files.
//!
//! # Wire Format
//!
//! The link is ASCII text, one command or event per `\n`-terminated line:
//!
//! ```text
//! device -> host   BTN:4          press of button 4
//!                  BTN:4:LONG     button 4 held past the long-press threshold
//!                  PONG:<id>      reply to a PING probe
//!
//! host -> device   LED:ALL:r,g,b
//!                  LED:<idx>:r,g,b
//!                  LED:ANIM:<idx>:r,g,b
//!                  LED:STOP
//!                  PING
//! ```
//!
//! # Usage
//!
//! ```
//! use keytally_core::constants::*;
//! use std::time::Duration;
//!
//! assert_eq!(BUTTON_PREFIX, "BTN:");
//! let backoff = Duration::from_millis(RECONNECT_DELAY_MS);
//! assert_eq!(backoff.as_secs(), 2);
//! ```

// ============================================================================
// Device Link Tokens
// ============================================================================

/// Prefix of every button event line sent by the device.
pub const BUTTON_PREFIX: &str = "BTN:";

/// Suffix token marking a long press (`BTN:<n>:LONG`).
pub const LONG_PRESS_TOKEN: &str = "LONG";

/// Prefix of the identity reply sent in answer to [`PING_COMMAND`].
pub const PONG_PREFIX: &str = "PONG:";

/// Identity probe written by the host during discovery.
pub const PING_COMMAND: &str = "PING";

/// Prefix of every indicator command.
pub const LED_PREFIX: &str = "LED";

/// Indicator target meaning "every light".
pub const LED_ALL: &str = "ALL";

/// Indicator sub-command starting a pulse animation.
pub const LED_ANIM: &str = "ANIM";

/// Indicator sub-command cancelling the running animation.
pub const LED_STOP: &str = "STOP";

/// Identity string reported by the keypad firmware.
pub const DEVICE_ID: &str = "PICO-KEYPAD-V1";

// ============================================================================
// Keypad Geometry
// ============================================================================

/// Lowest button number reported by the device.
pub const MIN_BUTTON: u8 = 1;

/// Highest button number reported by the device.
pub const MAX_BUTTON: u8 = 9;

/// Number of addressable indicator lights on the device.
pub const INDICATOR_COUNT: u8 = 8;

/// Hold duration after which the firmware emits a `LONG` event, in seconds.
pub const LONG_PRESS_SECS: u64 = 5;

// ============================================================================
// Indicator Layout
// ============================================================================

/// Indicator lit while the sleep inhibitor is running.
pub const SLEEP_INDICATOR: u8 = 0;

/// Indicator pulsing while a task is being tracked.
pub const TRACKING_INDICATOR: u8 = 1;

/// Indicator showing the color of the current project.
pub const PROJECT_INDICATOR: u8 = 2;

/// Indicator lit while the shifted layer is active.
pub const LAYER_INDICATOR: u8 = 7;

// ============================================================================
// Serial Link Timing
// ============================================================================

/// Baud rate of the CDC data channel.
pub const BAUD_RATE: u32 = 115_200;

/// Read timeout configured on an opened port, in milliseconds.
pub const READ_TIMEOUT_MS: u64 = 100;

/// Sleep between two polls of an idle port, in milliseconds.
pub const POLL_INTERVAL_MS: u64 = 10;

/// Fixed delay between two reconnect attempts, in milliseconds.
pub const RECONNECT_DELAY_MS: u64 = 2_000;

/// Time allowed for a `PONG` reply during discovery, in milliseconds.
pub const HANDSHAKE_TIMEOUT_MS: u64 = 1_000;

/// Delay after opening a port before it is used, in milliseconds.
///
/// The CDC stack on the device drops bytes written immediately after open.
pub const SETTLE_DELAY_MS: u64 = 500;

/// Delay after opening a port for a handshake, in milliseconds.
pub const PROBE_SETTLE_MS: u64 = 100;

// ============================================================================
// Endpoint Discovery
// ============================================================================

/// Port name fragments identifying candidate keypad endpoints.
pub const PORT_NAME_PATTERNS: [&str; 4] = ["tty.usbmodem", "tty.usbserial", "ttyACM", "ttyUSB"];

/// Number of leading digits forming the group key of an endpoint.
pub const GROUP_PREFIX_DIGITS: usize = 5;

/// Group key for endpoints without a usable numeric prefix.
pub const UNGROUPED_KEY: &str = "other";

/// Environment variable holding the endpoint substring filter.
pub const PORT_FILTER_ENV: &str = "KEYTALLY_PORT";

// ============================================================================
// Time-Tracking Log
// ============================================================================

/// Reserved label meaning "no task running as of this timestamp".
pub const STOP_LABEL: &str = "STOP";

/// Label used when tracking is started without a project.
pub const DEFAULT_TASK_LABEL: &str = "General";

/// Header row written at the top of every log file.
pub const LOG_HEADER: &str = "timestamp,label";

/// File name prefix of the per-day log files.
pub const LOG_FILE_PREFIX: &str = "times-";

/// File name extension of the per-day log files.
pub const LOG_FILE_EXTENSION: &str = "csv";

/// `chrono` format of the date part of a log file name.
pub const LOG_DATE_FORMAT: &str = "%Y-%m-%d";

/// `chrono` format of a log entry timestamp (ISO-8601, local, seconds).
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

/// Suffix appended to a log file renamed by a reset.
pub const BACKUP_SUFFIX: &str = ".bak";
