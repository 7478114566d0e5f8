//! Persistence for keytally.
//!
//! - [`log`]: the append-only, date-partitioned time log ([`TimeLog`]) and
//!   the tracker state restored from it.
//! - [`report`]: durations derived from a day of log rows ([`DayReport`]).
//! - [`remap`]: the raw→logical button map file ([`ButtonRemap`]).
//! - [`clock`]: the time source behind every timestamp.
//! - [`csv`]: record quoting for log rows.
//!
//! Everything here is synchronous; a write is one `open`/`write`/`sync_data`
//! on a small file, done inline by the single control loop.

pub mod clock;
pub mod csv;
pub mod error;
pub mod log;
pub mod remap;
pub mod report;

pub use clock::{Clock, ManualClock, ScriptedClock, SystemClock};
pub use error::{StorageError, StorageResult};
pub use log::{LogEntry, TimeLog};
pub use remap::{ButtonRemap, DuplicatePolicy};
pub use report::{DayReport, LabelTotal, ReportEntry, label_order};
