// Record normalization
//
// Raw rows → normalized rows plus per-cause reject counts. A row is dropped
// only when a column its projection requires cannot be parsed; station ids
// and metrics are allowed to be null and are handled by the consumers.

use crate::records::{NormalizedRecord, RawTripRecord, TripCalendar};
use crate::schema::{Projection, TripColumn};
use chrono::{Datelike, NaiveDate};
use serde::Serialize;

/// Rows dropped by the normalizer, by cause.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RejectCounts {
    pub bad_date: u64,
    pub bad_time_bucket: u64,
    pub bad_trip_count: u64,
}

impl RejectCounts {
    pub fn total(&self) -> u64 {
        self.bad_date + self.bad_time_bucket + self.bad_trip_count
    }

    pub fn add(&mut self, other: &RejectCounts) {
        self.bad_date += other.bad_date;
        self.bad_time_bucket += other.bad_time_bucket;
        self.bad_trip_count += other.bad_trip_count;
    }
}

/// Output of normalizing one batch.
#[derive(Debug, Clone, Default)]
pub struct NormalizedBatch {
    pub records: Vec<NormalizedRecord>,
    pub rejected: RejectCounts,
}

/// Normalize one batch of raw rows read with `projection`.
pub fn normalize_batch(raw: Vec<RawTripRecord>, projection: Projection) -> NormalizedBatch {
    let needs = |column: TripColumn| projection.contains(&column);
    let needs_date = needs(TripColumn::BaseDate);
    let needs_bucket = needs(TripColumn::TimeBucket);
    let needs_count = needs(TripColumn::TripCount);

    let mut out = NormalizedBatch {
        records: Vec::with_capacity(raw.len()),
        rejected: RejectCounts::default(),
    };

    for row in raw {
        let calendar = if needs_date {
            match row.base_date.as_deref().and_then(parse_base_date) {
                Some(calendar) => Some(calendar),
                None => {
                    out.rejected.bad_date += 1;
                    continue;
                }
            }
        } else {
            None
        };

        let hour = if needs_bucket {
            match row.time_bucket.and_then(hour_from_bucket) {
                Some(hour) => Some(hour),
                None => {
                    out.rejected.bad_time_bucket += 1;
                    continue;
                }
            }
        } else {
            None
        };

        let trip_count = if needs_count {
            match row.trip_count.and_then(|c| u64::try_from(c).ok()) {
                Some(count) => count,
                None => {
                    out.rejected.bad_trip_count += 1;
                    continue;
                }
            }
        } else {
            0
        };

        out.records.push(NormalizedRecord {
            calendar,
            hour,
            start_station: row.start_station.as_deref().and_then(normalize_station_id),
            end_station: row.end_station.as_deref().and_then(normalize_station_id),
            trip_count,
            duration_minutes: row.duration_minutes,
            distance_meters: row.distance_meters,
        });
    }

    out
}

/// Parse a `YYYYMMDD` date into calendar fields.
///
/// Accepts surrounding whitespace and a trailing `.0` left behind by float
/// encoded dates.
pub fn parse_base_date(raw: &str) -> Option<TripCalendar> {
    let digits = raw.trim();
    let digits = digits.strip_suffix(".0").unwrap_or(digits);
    if digits.len() != 8 || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }

    let year: i32 = digits[0..4].parse().ok()?;
    let month: u32 = digits[4..6].parse().ok()?;
    let day: u32 = digits[6..8].parse().ok()?;
    let date = NaiveDate::from_ymd_opt(year, month, day)?;

    Some(TripCalendar {
        year: date.year(),
        month: date.month() as u8,
        day: date.day() as u8,
        weekday: date.weekday().num_days_from_monday() as u8,
    })
}

/// Hour of day for a time bucket (`HHMM`), flooring odd step widths.
///
/// Returns `None` for buckets that do not land in `0..=23`.
pub fn hour_from_bucket(bucket: i64) -> Option<u8> {
    if bucket < 0 {
        return None;
    }
    u8::try_from(bucket / 100).ok().filter(|hour| *hour < 24)
}

/// Trim a station id and map blank or NaN-like spellings to `None`.
///
/// The same rule is applied to trip rows and to the station master so the
/// two sides of the reference join compare equal.
pub fn normalize_station_id(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }
    const NULL_LIKE: [&str; 5] = ["nan", "none", "null", "<na>", "nat"];
    if NULL_LIKE.iter().any(|n| trimmed.eq_ignore_ascii_case(n)) {
        return None;
    }
    Some(trimmed.to_string())
}
