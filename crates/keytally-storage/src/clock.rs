//! Time source for log timestamps.
//!
//! All timestamps are local wall-clock time at second precision. Tests
//! drive a [`ManualClock`] to cross midnight or step time backwards, or a
//! [`ScriptedClock`] when each reading must land on a given instant.

use chrono::{Local, NaiveDateTime, TimeDelta, Timelike};
use std::fmt;
use std::collections::VecDeque;
use std::sync::Mutex;

/// Source of the current local time.
pub trait Clock: Send + Sync + fmt::Debug {
    /// Current local time, truncated to whole seconds.
    fn now(&self) -> NaiveDateTime;
}

/// The host's local clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> NaiveDateTime {
        let now = Local::now().naive_local();
        now.with_nanosecond(0).unwrap_or(now)
    }
}

/// Clock that only moves when told to.
#[derive(Debug)]
pub struct ManualClock {
    now: Mutex<NaiveDateTime>,
}

impl ManualClock {
    pub fn new(start: NaiveDateTime) -> Self {
        Self {
            now: Mutex::new(start),
        }
    }

    pub fn set(&self, now: NaiveDateTime) {
        *self.now.lock().unwrap_or_else(|e| e.into_inner()) = now;
    }

    pub fn advance(&self, delta: TimeDelta) {
        let mut now = self.now.lock().unwrap_or_else(|e| e.into_inner());
        *now += delta;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> NaiveDateTime {
        *self.now.lock().unwrap_or_else(|e| e.into_inner())
    }
}

/// Clock answering each reading with the next scripted instant.
///
/// Once the script runs out the last instant repeats.
#[derive(Debug)]
pub struct ScriptedClock {
    state: Mutex<(VecDeque<NaiveDateTime>, NaiveDateTime)>,
}

impl ScriptedClock {
    pub fn new(first: NaiveDateTime, rest: impl IntoIterator<Item = NaiveDateTime>) -> Self {
        let mut script: VecDeque<_> = rest.into_iter().collect();
        script.push_front(first);
        Self {
            state: Mutex::new((script, first)),
        }
    }
}

impl Clock for ScriptedClock {
    fn now(&self) -> NaiveDateTime {
        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        let (script, last) = &mut *state;
        if let Some(next) = script.pop_front() {
            *last = next;
        }
        *last
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    #[test]
    fn test_system_clock_has_no_subseconds() {
        assert_eq!(SystemClock.now().nanosecond(), 0);
    }

    #[test]
    fn test_manual_clock() {
        let start = NaiveDate::from_ymd_opt(2026, 10, 16)
            .unwrap()
            .and_hms_opt(23, 59, 30)
            .unwrap();
        let clock = ManualClock::new(start);
        assert_eq!(clock.now(), start);

        clock.advance(TimeDelta::seconds(45));
        assert_eq!(clock.now().date(), NaiveDate::from_ymd_opt(2026, 10, 17).unwrap());

        clock.set(start);
        assert_eq!(clock.now(), start);
    }

    #[test]
    fn test_scripted_clock_repeats_last() {
        let day = NaiveDate::from_ymd_opt(2026, 10, 16).unwrap();
        let morning = day.and_hms_opt(9, 0, 0).unwrap();
        let evening = day.and_hms_opt(18, 30, 0).unwrap();
        let clock = ScriptedClock::new(morning, [evening]);

        assert_eq!(clock.now(), morning);
        assert_eq!(clock.now(), evening);
        assert_eq!(clock.now(), evening);
    }
}
