//! The daily maintenance window during which the upstream service is
//! expected to be unreachable, and polling it would only produce noise.

use chrono::{NaiveTime, Timelike};

/// A fixed daily recurring downtime window, defined by a UTC start time of
/// day and a duration in whole hours.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MaintenanceWindow {
    start: NaiveTime,
    duration_hours: u32,
}

impl MaintenanceWindow {
    pub fn new(start: NaiveTime, duration_hours: u32) -> Self {
        MaintenanceWindow {
            start,
            duration_hours,
        }
    }

    /// Whether `now` (a UTC time of day) falls inside the window.
    ///
    /// The end is the start plus the duration on the same calendar date; if
    /// that wraps past midnight the window membership becomes a disjunction
    /// over the two partial days.
    pub fn contains(&self, now: NaiveTime) -> bool {
        let end = self.end();

        if end < self.start {
            now >= self.start || now <= end
        } else {
            self.start <= now && now <= end
        }
    }

    fn end(&self) -> NaiveTime {
        let minutes_per_day: u64 = 24 * 60;
        let start_minutes = u64::from(self.start.hour()) * 60 + u64::from(self.start.minute());
        let end_minutes = (start_minutes + u64::from(self.duration_hours) * 60) % minutes_per_day;

        // In-range by construction after the modulo.
        NaiveTime::from_hms_opt((end_minutes / 60) as u32, (end_minutes % 60) as u32, 0)
            .unwrap_or(self.start)
    }
}
