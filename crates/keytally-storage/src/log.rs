//! Append-only, date-partitioned time log.
//!
//! Each local calendar day has its own file, `times-YYYY-MM-DD.csv`,
//! created on the first write of that day:
//!
//! ```text
//! timestamp,label
//! 2026-10-16T09:00:12,Project 1
//! 2026-10-16T10:30:40,Support
//! 2026-10-16T12:01:05,STOP
//! ```
//!
//! A row starts the named task and implicitly ends the previous one; `STOP`
//! ends the running task without starting another. Durations are never
//! stored, they are derived from consecutive rows by
//! [`DayReport`](crate::report::DayReport).
//!
//! Every append opens the file, writes one record and calls `sync_data`
//! before returning, so a crash loses at most the row being written. The
//! target file is resolved from the clock on every call, which moves the
//! log to a new file at midnight without touching the previous day.

use crate::clock::Clock;
use crate::csv::{format_record, parse_record};
use crate::error::{StorageError, StorageResult};
use crate::report::DayReport;
use chrono::{NaiveDate, NaiveDateTime};
use keytally_core::constants::{
    BACKUP_SUFFIX, LOG_DATE_FORMAT, LOG_FILE_EXTENSION, LOG_FILE_PREFIX, LOG_HEADER, STOP_LABEL,
    TIMESTAMP_FORMAT,
};
use keytally_core::validate_label;
use std::fs::{self, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// One row of the log.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogEntry {
    pub timestamp: NaiveDateTime,
    pub label: String,
}

impl LogEntry {
    pub fn new(timestamp: NaiveDateTime, label: impl Into<String>) -> Self {
        Self {
            timestamp,
            label: label.into(),
        }
    }

    /// Whether this is the stop sentinel.
    pub fn is_stop(&self) -> bool {
        self.label == STOP_LABEL
    }

    fn to_record(&self) -> String {
        let timestamp = self.timestamp.format(TIMESTAMP_FORMAT).to_string();
        format_record(&[&timestamp, &self.label])
    }

    fn from_record(line: &str) -> Result<Self, String> {
        let fields = parse_record(line)?;
        let [timestamp, label] = fields.as_slice() else {
            return Err(format!("expected 2 fields, found {}", fields.len()));
        };
        let timestamp = NaiveDateTime::parse_from_str(timestamp.trim(), TIMESTAMP_FORMAT)
            .map_err(|e| format!("bad timestamp {timestamp:?}: {e}"))?;
        Ok(Self::new(timestamp, label.as_str()))
    }
}

/// File name of the log for `date`.
pub fn file_name_for(date: NaiveDate) -> String {
    format!(
        "{LOG_FILE_PREFIX}{}.{LOG_FILE_EXTENSION}",
        date.format(LOG_DATE_FORMAT)
    )
}

/// Read all entries of a log file.
///
/// A missing file reads as empty. Rows that cannot be parsed, such as a
/// row torn by a crash mid-write, are skipped with a warning.
///
/// # Errors
///
/// Returns an error if the file exists but cannot be read.
pub fn read_entries(path: &Path) -> StorageResult<Vec<LogEntry>> {
    let content = match fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(StorageError::io(path, e)),
    };

    let mut entries = Vec::new();
    for (index, line) in content.lines().enumerate() {
        let line = line.trim_end_matches('\r');
        if line.trim().is_empty() || (index == 0 && line == LOG_HEADER) {
            continue;
        }
        match LogEntry::from_record(line) {
            Ok(entry) => entries.push(entry),
            Err(message) => warn!(
                file = %path.display(),
                line = index + 1,
                %message,
                "Skipping unreadable log row"
            ),
        }
    }
    Ok(entries)
}

/// The time log plus the in-memory tracker state derived from it.
///
/// # Examples
///
/// ```
/// use keytally_storage::{SystemClock, TimeLog};
/// use std::sync::Arc;
///
/// # fn main() -> keytally_storage::StorageResult<()> {
/// let dir = tempfile::tempdir().unwrap();
/// let mut log = TimeLog::open(dir.path(), Arc::new(SystemClock))?;
///
/// log.start_task("Support")?;
/// assert_eq!(log.current_task(), Some("Support"));
///
/// log.stop_task()?;
/// assert_eq!(log.current_task(), None);
/// assert_eq!(log.show_today()?.summary.len(), 1);
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct TimeLog {
    dir: PathBuf,
    clock: Arc<dyn Clock>,
    current_task: Option<String>,
    last_timestamp: Option<NaiveDateTime>,
}

impl TimeLog {
    /// Open the log in `dir` and restore today's state.
    ///
    /// The directory is created if needed. No file is written.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory cannot be created or today's file
    /// cannot be read.
    pub fn open(dir: impl Into<PathBuf>, clock: Arc<dyn Clock>) -> StorageResult<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir).map_err(|e| StorageError::io(&dir, e))?;

        let mut log = Self {
            dir,
            clock,
            current_task: None,
            last_timestamp: None,
        };
        log.restore()?;
        Ok(log)
    }

    /// Re-read today's file and restore the running task from its tail.
    ///
    /// The last row decides: a label other than `STOP` is restored as the
    /// current task, without writing anything.
    ///
    /// # Errors
    ///
    /// Returns an error if today's file cannot be read.
    pub fn restore(&mut self) -> StorageResult<Option<&str>> {
        let entries = self.entries_for(self.today())?;
        let last = entries.last();

        self.last_timestamp = last.map(|e| e.timestamp);
        self.current_task = last.filter(|e| !e.is_stop()).map(|e| e.label.clone());

        if let Some(task) = &self.current_task {
            info!(task = %task, "Restored running task");
        }
        Ok(self.current_task.as_deref())
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn current_task(&self) -> Option<&str> {
        self.current_task.as_deref()
    }

    pub fn is_tracking(&self) -> bool {
        self.current_task.is_some()
    }

    /// Today's date according to the log's clock.
    pub fn today(&self) -> NaiveDate {
        self.clock.now().date()
    }

    /// Path of the file for `date`.
    pub fn path_for(&self, date: NaiveDate) -> PathBuf {
        self.dir.join(file_name_for(date))
    }

    /// Start `label`, implicitly ending whatever was running.
    ///
    /// # Errors
    ///
    /// Returns a validation error for an empty, multi-line or reserved
    /// label, or an I/O error if the row could not be persisted. On error
    /// the in-memory state is unchanged.
    pub fn start_task(&mut self, label: &str) -> StorageResult<LogEntry> {
        validate_label(label)?;
        let entry = self.append(label)?;
        info!(task = %label, at = %entry.timestamp, "Task started");
        self.current_task = Some(label.to_string());
        Ok(entry)
    }

    /// Stop the running task; does nothing when idle.
    ///
    /// # Errors
    ///
    /// Returns an error if the `STOP` row could not be persisted; the task
    /// then stays current.
    pub fn stop_task(&mut self) -> StorageResult<Option<LogEntry>> {
        let Some(task) = self.current_task.clone() else {
            debug!("Stop requested while idle");
            return Ok(None);
        };

        let entry = self.append(STOP_LABEL)?;
        info!(task = %task, at = %entry.timestamp, "Task stopped");
        self.current_task = None;
        Ok(Some(entry))
    }

    /// Entries of the file for `date`, in file order.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read.
    pub fn entries_for(&self, date: NaiveDate) -> StorageResult<Vec<LogEntry>> {
        read_entries(&self.path_for(date))
    }

    /// Report over today's file, with the running task measured up to now.
    ///
    /// # Errors
    ///
    /// Returns an error if today's file cannot be read.
    pub fn show_today(&self) -> StorageResult<DayReport> {
        let now = self.clock.now();
        let entries = self.entries_for(now.date())?;
        Ok(DayReport::from_entries(now.date(), &entries, now))
    }

    /// Move today's file aside and start it over.
    ///
    /// The file is renamed with a `.bak` suffix, replacing an older backup,
    /// and a fresh file holding only the header is written. The running
    /// task is forgotten without a `STOP` row. Returns the backup path if a
    /// file was moved.
    ///
    /// # Errors
    ///
    /// Returns an error if the rename or the new file fails.
    pub fn reset_today(&mut self) -> StorageResult<Option<PathBuf>> {
        let path = self.path_for(self.today());
        let mut backup_name = path.clone().into_os_string();
        backup_name.push(BACKUP_SUFFIX);
        let backup = PathBuf::from(backup_name);

        let moved = if path.exists() {
            if backup.exists() {
                fs::remove_file(&backup).map_err(|e| StorageError::io(&backup, e))?;
            }
            fs::rename(&path, &backup).map_err(|e| StorageError::io(&path, e))?;
            true
        } else {
            false
        };

        let mut file = fs::File::create(&path).map_err(|e| StorageError::io(&path, e))?;
        file.write_all(format!("{LOG_HEADER}\n").as_bytes())
            .and_then(|()| file.sync_data())
            .map_err(|e| StorageError::io(&path, e))?;

        self.current_task = None;
        self.last_timestamp = None;
        info!(file = %path.display(), "Today's log reset");

        Ok(moved.then_some(backup))
    }

    /// Timestamp for a new row: now, but never before the previous row of
    /// the same day.
    fn next_timestamp(&self) -> NaiveDateTime {
        let now = self.clock.now();
        match self.last_timestamp {
            Some(last) if last > now && last.date() == now.date() => {
                warn!(%now, %last, "Clock went backwards, reusing last timestamp");
                last
            }
            _ => now,
        }
    }

    fn append(&mut self, label: &str) -> StorageResult<LogEntry> {
        let entry = LogEntry::new(self.next_timestamp(), label);
        let path = self.path_for(entry.timestamp.date());

        let mut file = OpenOptions::new()
            .read(true)
            .create(true)
            .append(true)
            .open(&path)
            .map_err(|e| StorageError::io(&path, e))?;

        let len = file
            .metadata()
            .map_err(|e| StorageError::io(&path, e))?
            .len();

        let mut record = String::new();
        if len == 0 {
            debug!(file = %path.display(), "Starting new log file");
            record.push_str(LOG_HEADER);
            record.push('\n');
        } else if !ends_with_newline(&mut file).map_err(|e| StorageError::io(&path, e))? {
            warn!(file = %path.display(), "Terminating torn log row");
            record.push('\n');
        }
        record.push_str(&entry.to_record());

        file.write_all(record.as_bytes())
            .and_then(|()| file.sync_data())
            .map_err(|e| StorageError::io(&path, e))?;

        self.last_timestamp = Some(entry.timestamp);
        Ok(entry)
    }
}

fn ends_with_newline(file: &mut fs::File) -> std::io::Result<bool> {
    let mut last = [0u8; 1];
    file.seek(SeekFrom::End(-1))?;
    file.read_exact(&mut last)?;
    Ok(last[0] == b'\n')
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use chrono::TimeDelta;
    use tempfile::TempDir;

    fn at(day: u32, h: u32, m: u32, s: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2026, 10, day)
            .unwrap()
            .and_hms_opt(h, m, s)
            .unwrap()
    }

    fn setup(start: NaiveDateTime) -> (TempDir, Arc<ManualClock>, TimeLog) {
        let dir = TempDir::new().unwrap();
        let clock = Arc::new(ManualClock::new(start));
        let log = TimeLog::open(dir.path(), clock.clone()).unwrap();
        (dir, clock, log)
    }

    #[test]
    fn test_file_name() {
        let date = NaiveDate::from_ymd_opt(2026, 1, 5).unwrap();
        assert_eq!(file_name_for(date), "times-2026-01-05.csv");
    }

    #[test]
    fn test_open_writes_nothing() {
        let (dir, _clock, log) = setup(at(16, 9, 0, 0));
        assert_eq!(log.current_task(), None);
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[test]
    fn test_start_creates_file_with_header() {
        let (_dir, _clock, mut log) = setup(at(16, 9, 0, 0));
        log.start_task("Project 1").unwrap();

        let content = fs::read_to_string(log.path_for(log.today())).unwrap();
        assert_eq!(content, "timestamp,label\n2026-10-16T09:00:00,Project 1\n");
    }

    #[test]
    fn test_back_to_back_starts() {
        let (_dir, clock, mut log) = setup(at(16, 9, 0, 0));
        log.start_task("Project 1").unwrap();
        clock.advance(TimeDelta::minutes(5));
        log.start_task("Project 2").unwrap();

        let entries = log.entries_for(log.today()).unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(log.current_task(), Some("Project 2"));
    }

    #[test]
    fn test_stop_when_idle_is_noop() {
        let (dir, _clock, mut log) = setup(at(16, 9, 0, 0));
        assert_eq!(log.stop_task().unwrap(), None);
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[test]
    fn test_stop_appends_sentinel() {
        let (_dir, clock, mut log) = setup(at(16, 9, 0, 0));
        log.start_task("Support").unwrap();
        clock.advance(TimeDelta::seconds(90));

        let entry = log.stop_task().unwrap().unwrap();
        assert!(entry.is_stop());
        assert_eq!(entry.timestamp, at(16, 9, 1, 30));
        assert_eq!(log.current_task(), None);
    }

    #[test]
    fn test_rejects_reserved_label() {
        let (_dir, _clock, mut log) = setup(at(16, 9, 0, 0));
        assert!(matches!(
            log.start_task("STOP"),
            Err(StorageError::Validation(_))
        ));
        assert!(log.start_task("").is_err());
        assert_eq!(log.current_task(), None);
    }

    #[test]
    fn test_restore_running_task() {
        let (dir, clock, mut log) = setup(at(16, 9, 0, 0));
        log.start_task("ProjectX").unwrap();
        let before = fs::read_to_string(log.path_for(log.today())).unwrap();
        drop(log);

        let restored = TimeLog::open(dir.path(), clock.clone()).unwrap();
        assert_eq!(restored.current_task(), Some("ProjectX"));

        let after = fs::read_to_string(restored.path_for(restored.today())).unwrap();
        assert_eq!(before, after);
    }

    #[test]
    fn test_restore_after_stop_is_idle() {
        let (dir, clock, mut log) = setup(at(16, 9, 0, 0));
        log.start_task("ProjectX").unwrap();
        log.stop_task().unwrap();

        let restored = TimeLog::open(dir.path(), clock).unwrap();
        assert_eq!(restored.current_task(), None);
    }

    #[test]
    fn test_restore_tolerates_torn_row() {
        let (dir, clock, mut log) = setup(at(16, 9, 0, 0));
        log.start_task("Meetings").unwrap();

        let path = log.path_for(log.today());
        let mut file = OpenOptions::new().append(true).open(&path).unwrap();
        file.write_all(b"2026-10-16T09:").unwrap();
        drop(file);

        let mut restored = TimeLog::open(dir.path(), clock).unwrap();
        assert_eq!(restored.current_task(), Some("Meetings"));

        restored.stop_task().unwrap();
        let entries = restored.entries_for(restored.today()).unwrap();
        assert_eq!(entries.len(), 2);
        assert!(entries[1].is_stop());
    }

    #[test]
    fn test_timestamps_never_decrease() {
        let (_dir, clock, mut log) = setup(at(16, 9, 0, 0));
        log.start_task("A").unwrap();
        clock.set(at(16, 8, 59, 0));
        let entry = log.start_task("B").unwrap();

        assert_eq!(entry.timestamp, at(16, 9, 0, 0));
    }

    #[test]
    fn test_day_rollover_carries_task() {
        let (_dir, clock, mut log) = setup(at(16, 23, 50, 0));
        log.start_task("Project 1").unwrap();
        let yesterday = fs::read_to_string(log.path_for(log.today())).unwrap();

        clock.set(at(17, 0, 10, 0));
        assert_eq!(log.current_task(), Some("Project 1"));
        log.stop_task().unwrap();

        let old_path = log.path_for(NaiveDate::from_ymd_opt(2026, 10, 16).unwrap());
        assert_eq!(fs::read_to_string(old_path).unwrap(), yesterday);

        let today = log.entries_for(log.today()).unwrap();
        assert_eq!(today.len(), 1);
        assert!(today[0].is_stop());
    }

    #[test]
    fn test_quoted_label_survives() {
        let (dir, clock, mut log) = setup(at(16, 9, 0, 0));
        log.start_task("Client \"A\", phase 2").unwrap();

        let restored = TimeLog::open(dir.path(), clock).unwrap();
        assert_eq!(restored.current_task(), Some("Client \"A\", phase 2"));
    }

    #[test]
    fn test_reset_today() {
        let (_dir, _clock, mut log) = setup(at(16, 9, 0, 0));
        log.start_task("Support").unwrap();
        let path = log.path_for(log.today());

        let backup = log.reset_today().unwrap().unwrap();
        assert!(backup.to_string_lossy().ends_with("times-2026-10-16.csv.bak"));
        assert!(fs::read_to_string(&backup).unwrap().contains("Support"));
        assert_eq!(fs::read_to_string(&path).unwrap(), "timestamp,label\n");
        assert_eq!(log.current_task(), None);

        log.start_task("Meetings").unwrap();
        let second_backup = log.reset_today().unwrap().unwrap();
        let content = fs::read_to_string(second_backup).unwrap();
        assert!(content.contains("Meetings"));
        assert!(!content.contains("Support"));
    }

    #[test]
    fn test_reset_without_file() {
        let (_dir, _clock, mut log) = setup(at(16, 9, 0, 0));
        assert_eq!(log.reset_today().unwrap(), None);
        assert!(log.path_for(log.today()).exists());
    }
}
