//! Keypad-driven time tracker.
//!
//! The tracker turns button events into actions on the time log, the
//! sleep inhibitor, and the keypad's indicators.
//!
//! - [`keymap`]: the two-layer button→[`Action`] table, default or JSON.
//! - [`session`]: [`TrackerSession`], the state every action mutates,
//!   and the indicator replay used after reconnects.
//! - [`inhibitor`]: the sleep-prevention subprocess.
//! - [`runner`]: the event loop over a
//!   [`SessionManager`](keytally_hardware::SessionManager).

pub mod error;
pub mod inhibitor;
pub mod keymap;
pub mod runner;
pub mod session;

pub use error::{Result, TrackerError};
pub use inhibitor::{CommandLauncher, InhibitorLauncher, InhibitorProcess, SleepInhibitor, UnsupportedLauncher};
pub use keymap::{Action, Keymap};
pub use runner::{StopReason, run};
pub use session::{DispatchOutcome, TrackerSession};
