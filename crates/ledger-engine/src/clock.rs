//! Source of "today" for issue, payment and paid dates.

use chrono::{NaiveDate, Utc};
use std::sync::RwLock;

pub trait Clock: Send + Sync {
    fn today(&self) -> NaiveDate;
}

/// Current UTC date.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn today(&self) -> NaiveDate {
        Utc::now().date_naive()
    }
}

/// A settable date, for tests and backfills.
#[derive(Debug)]
pub struct FixedClock {
    date: RwLock<NaiveDate>,
}

impl FixedClock {
    pub fn new(date: NaiveDate) -> Self {
        FixedClock {
            date: RwLock::new(date),
        }
    }

    pub fn set(&self, date: NaiveDate) {
        let mut guard = match self.date.write() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        *guard = date;
    }
}

impl Clock for FixedClock {
    fn today(&self) -> NaiveDate {
        match self.date.read() {
            Ok(guard) => *guard,
            Err(poisoned) => *poisoned.into_inner(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fixed_clock() {
        let clock = FixedClock::new(NaiveDate::from_ymd_opt(2025, 1, 31).unwrap());
        assert_eq!(clock.today().to_string(), "2025-01-31");
        clock.set(NaiveDate::from_ymd_opt(2025, 2, 1).unwrap());
        assert_eq!(clock.today().to_string(), "2025-02-01");
    }
}
