//! Daily report derived from the log.
//!
//! Durations are computed, never stored: each task row lasts until the
//! next row of the file, and the last task (if not stopped) runs until
//! "now".

use crate::log::LogEntry;
use chrono::{NaiveDate, NaiveDateTime, TimeDelta};
use std::cmp::Ordering;
use std::collections::HashMap;
use std::fmt;

/// One task interval of the day.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportEntry {
    pub start: NaiveDateTime,
    pub label: String,
    pub duration: TimeDelta,

    /// The interval is still open and was measured up to "now".
    pub running: bool,
}

/// Accumulated time of one label.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LabelTotal {
    pub label: String,
    pub duration: TimeDelta,
}

/// Report over one day of the log.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DayReport {
    pub date: NaiveDate,

    /// Task intervals in file order; `STOP` rows are not listed.
    pub entries: Vec<ReportEntry>,

    /// Per-label totals ordered by [`label_order`].
    pub summary: Vec<LabelTotal>,

    pub total: TimeDelta,
}

impl DayReport {
    /// Derive the report from a day's entries.
    ///
    /// Negative intervals (a clock that stepped back between runs) count
    /// as zero.
    pub fn from_entries(date: NaiveDate, entries: &[LogEntry], now: NaiveDateTime) -> Self {
        let mut report_entries = Vec::new();
        let mut totals: HashMap<&str, TimeDelta> = HashMap::new();

        for (index, entry) in entries.iter().enumerate() {
            if entry.is_stop() {
                continue;
            }

            let next = entries.get(index + 1);
            let end = next.map_or(now, |n| n.timestamp);
            let duration = (end - entry.timestamp).max(TimeDelta::zero());

            let total = totals
                .entry(entry.label.as_str())
                .or_insert_with(TimeDelta::zero);
            *total = *total + duration;
            report_entries.push(ReportEntry {
                start: entry.timestamp,
                label: entry.label.clone(),
                duration,
                running: next.is_none(),
            });
        }

        let mut summary: Vec<LabelTotal> = totals
            .into_iter()
            .map(|(label, duration)| LabelTotal {
                label: label.to_string(),
                duration,
            })
            .collect();
        summary.sort_by(|a, b| label_order(&a.label, &b.label));

        let total = summary
            .iter()
            .fold(TimeDelta::zero(), |acc, t| acc + t.duration);

        Self {
            date,
            entries: report_entries,
            summary,
            total,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Total time of `label`, if it appears in the report.
    pub fn duration_of(&self, label: &str) -> Option<TimeDelta> {
        self.summary
            .iter()
            .find(|t| t.label == label)
            .map(|t| t.duration)
    }

    /// Labels in summary order.
    pub fn labels(&self) -> Vec<&str> {
        self.summary.iter().map(|t| t.label.as_str()).collect()
    }
}

/// Trailing decimal number of a label, e.g. `2` for `"Project 2"`.
fn trailing_number(label: &str) -> Option<u64> {
    let trimmed = label.trim_end();
    let digits_start = trimmed
        .char_indices()
        .rev()
        .take_while(|(_, c)| c.is_ascii_digit())
        .last()
        .map(|(i, _)| i)?;
    trimmed[digits_start..].parse().ok()
}

/// Ordering of labels in reports.
///
/// Labels without a trailing number come first, alphabetically; numbered
/// labels follow by number, so `Project 2` sorts before `Project 10`.
///
/// ```
/// use keytally_storage::report::label_order;
///
/// let mut labels = vec!["Project 10", "Project 2", "Support"];
/// labels.sort_by(|a, b| label_order(a, b));
/// assert_eq!(labels, vec!["Support", "Project 2", "Project 10"]);
/// ```
pub fn label_order(a: &str, b: &str) -> Ordering {
    match (trailing_number(a), trailing_number(b)) {
        (None, None) => a.cmp(b),
        (None, Some(_)) => Ordering::Less,
        (Some(_), None) => Ordering::Greater,
        (Some(x), Some(y)) => x.cmp(&y).then_with(|| a.cmp(b)),
    }
}

/// `HH:MM:SS`, hours not wrapping at 24.
pub fn format_duration(duration: TimeDelta) -> String {
    let secs = duration.num_seconds().max(0);
    format!("{:02}:{:02}:{:02}", secs / 3600, (secs % 3600) / 60, secs % 60)
}

impl fmt::Display for DayReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Today ({})", self.date)?;

        if self.entries.is_empty() {
            return writeln!(f, "  no entries");
        }

        let width = self
            .summary
            .iter()
            .map(|t| t.label.chars().count())
            .max()
            .unwrap_or(0);

        for entry in &self.entries {
            let marker = if entry.running { "  (running)" } else { "" };
            writeln!(
                f,
                "  {}  {:<width$}  {}{marker}",
                entry.start.format("%H:%M:%S"),
                entry.label,
                format_duration(entry.duration),
            )?;
        }

        writeln!(f)?;
        writeln!(f, "Summary")?;
        for total in &self.summary {
            writeln!(
                f,
                "  {:<width$}  {}",
                total.label,
                format_duration(total.duration)
            )?;
        }

        writeln!(f)?;
        write!(f, "Total: {}", format_duration(self.total))
    }
}
