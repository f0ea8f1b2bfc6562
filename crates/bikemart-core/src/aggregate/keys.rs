// Composite aggregation keys
//
// Field order is the sort order of the written marts.

use crate::records::TripCalendar;

/// `(year, month, day, hour)`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DailyHourlyKey {
    pub year: i32,
    pub month: u8,
    pub day: u8,
    pub hour: u8,
}

impl DailyHourlyKey {
    pub fn new(calendar: TripCalendar, hour: u8) -> Self {
        Self {
            year: calendar.year,
            month: calendar.month,
            day: calendar.day,
            hour,
        }
    }

    pub fn monthly(&self) -> MonthlyKey {
        MonthlyKey {
            year: self.year,
            month: self.month,
        }
    }
}

/// `(year, month)`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MonthlyKey {
    pub year: i32,
    pub month: u8,
}

/// Trimmed station id.
pub type StationKey = String;

/// `(start_station_id, end_station_id)`
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RouteKey {
    pub start: String,
    pub end: String,
}

impl RouteKey {
    pub fn new(start: &str, end: &str) -> Self {
        Self {
            start: start.to_string(),
            end: end.to_string(),
        }
    }
}
