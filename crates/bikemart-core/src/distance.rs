// Trip duration/distance cleaning and statistics
//
// Cleaning runs in two stages per year: a hard domain filter while
// streaming, then an IQR trim computed over the domain-filtered pairs. Only
// those pairs are kept in memory; raw rows are never materialized.

use crate::aggregate::BatchFold;
use crate::error::Result;
use crate::normalize::NormalizedBatch;
use crate::schema::{Projection, DISTANCE_PROJECTION};
use serde::Serialize;
use std::collections::BTreeMap;

/// Longest plausible trip, in minutes (12 hours).
pub const MAX_DURATION_MINUTES: f64 = 720.0;
/// Longest plausible trip, in meters.
pub const MAX_DISTANCE_METERS: f64 = 50_000.0;

const IQR_FACTOR: f64 = 1.5;

/// One cleaned trip as written to `distance_time_<year>`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct DistanceTimeRow {
    pub duration_minutes: f64,
    pub distance_meters: f64,
    /// 0 = Monday .. 6 = Sunday
    pub weekday: u8,
}

/// Rows removed at each cleaning stage.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DistanceDrops {
    pub null_metric: u64,
    pub out_of_domain: u64,
    pub iqr_outlier: u64,
}

impl DistanceDrops {
    pub fn total(&self) -> u64 {
        self.null_metric + self.out_of_domain + self.iqr_outlier
    }

    pub fn add(&mut self, other: &DistanceDrops) {
        self.null_metric += other.null_metric;
        self.out_of_domain += other.out_of_domain;
        self.iqr_outlier += other.iqr_outlier;
    }
}

/// `0 < duration <= 720` and `0 < distance <= 50_000`.
pub fn in_domain(duration_minutes: f64, distance_meters: f64) -> bool {
    duration_minutes > 0.0
        && duration_minutes <= MAX_DURATION_MINUTES
        && distance_meters > 0.0
        && distance_meters <= MAX_DISTANCE_METERS
}

/// Domain-filtered trip metrics of one year.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DistanceFold {
    pub rows: Vec<DistanceTimeRow>,
    pub drops: DistanceDrops,
}

impl BatchFold for DistanceFold {
    const PROJECTION: Projection = DISTANCE_PROJECTION;

    fn fold(&mut self, batch: &NormalizedBatch) -> Result<()> {
        for record in &batch.records {
            let (Some(duration), Some(distance), Some(calendar)) = (
                record.duration_minutes,
                record.distance_meters,
                record.calendar,
            ) else {
                self.drops.null_metric += 1;
                continue;
            };
            if !in_domain(duration, distance) {
                self.drops.out_of_domain += 1;
                continue;
            }
            self.rows.push(DistanceTimeRow {
                duration_minutes: duration,
                distance_meters: distance,
                weekday: calendar.weekday,
            });
        }
        Ok(())
    }

    fn combine(&mut self, other: Self) -> Result<()> {
        self.rows.extend(other.rows);
        self.drops.add(&other.drops);
        Ok(())
    }
}

impl DistanceFold {
    /// Apply the IQR trim and return the cleaned rows in input order.
    pub fn finish(self) -> (Vec<DistanceTimeRow>, DistanceDrops) {
        let mut drops = self.drops;
        let rows = trim_outliers(self.rows, &mut drops);
        (rows, drops)
    }
}

/// Quantile of ascending `sorted` values with linear interpolation between
/// the closest ranks.
pub fn quantile(sorted: &[f64], q: f64) -> Option<f64> {
    if sorted.is_empty() {
        return None;
    }
    let position = q.clamp(0.0, 1.0) * (sorted.len() - 1) as f64;
    let lower = position.floor() as usize;
    let upper = position.ceil() as usize;
    let fraction = position - lower as f64;
    Some(sorted[lower] + (sorted[upper] - sorted[lower]) * fraction)
}

/// Closed interval of values kept by the IQR trim.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct IqrBounds {
    pub lower: f64,
    pub upper: f64,
}

impl IqrBounds {
    /// `[max(Q1 - 1.5 IQR, 0), min(Q3 + 1.5 IQR, cap)]`
    pub fn from_values(values: &[f64], cap: f64) -> Option<Self> {
        let mut sorted = values.to_vec();
        sorted.sort_by(f64::total_cmp);
        let q1 = quantile(&sorted, 0.25)?;
        let q3 = quantile(&sorted, 0.75)?;
        let iqr = q3 - q1;
        Some(Self {
            lower: (q1 - IQR_FACTOR * iqr).max(0.0),
            upper: (q3 + IQR_FACTOR * iqr).min(cap),
        })
    }

    pub fn contains(&self, value: f64) -> bool {
        value >= self.lower && value <= self.upper
    }
}

/// Drop rows outside the IQR bounds of either metric.
///
/// Both bounds come from the same input set; a row must fall inside both.
pub fn trim_outliers(rows: Vec<DistanceTimeRow>, drops: &mut DistanceDrops) -> Vec<DistanceTimeRow> {
    let durations: Vec<f64> = rows.iter().map(|r| r.duration_minutes).collect();
    let distances: Vec<f64> = rows.iter().map(|r| r.distance_meters).collect();
    let (Some(time_bounds), Some(distance_bounds)) = (
        IqrBounds::from_values(&durations, MAX_DURATION_MINUTES),
        IqrBounds::from_values(&distances, MAX_DISTANCE_METERS),
    ) else {
        return rows;
    };

    let before = rows.len();
    let kept: Vec<DistanceTimeRow> = rows
        .into_iter()
        .filter(|r| time_bounds.contains(r.duration_minutes) && distance_bounds.contains(r.distance_meters))
        .collect();
    drops.iqr_outlier += (before - kept.len()) as u64;
    kept
}

/// Descriptive statistics of one metric.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct MetricStats {
    pub mean: f64,
    pub median: f64,
    /// Sample standard deviation; `None` with fewer than two values
    pub std: Option<f64>,
    pub min: f64,
    pub max: f64,
}

impl MetricStats {
    pub fn from_values(values: &[f64]) -> Option<Self> {
        if values.is_empty() {
            return None;
        }
        let mut sorted = values.to_vec();
        sorted.sort_by(f64::total_cmp);
        let n = sorted.len() as f64;
        let mean = sorted.iter().sum::<f64>() / n;
        let std = (sorted.len() > 1).then(|| {
            let squares: f64 = sorted.iter().map(|v| (v - mean).powi(2)).sum();
            (squares / (n - 1.0)).sqrt()
        });
        Some(Self {
            mean,
            median: quantile(&sorted, 0.5)?,
            std,
            min: sorted[0],
            max: sorted[sorted.len() - 1],
        })
    }
}

/// Per-weekday mean duration and distance, rounded to 2 decimals.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct WeekdayAverages {
    pub weekday: u8,
    pub avg_time: f64,
    pub avg_distance: f64,
}

/// Full statistics of one year's cleaned rows.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct YearlyDistanceStats {
    pub year: i32,
    pub total_records: u64,
    pub time: MetricStats,
    pub distance: MetricStats,
    pub weekdays: Vec<WeekdayAverages>,
    pub drops: DistanceDrops,
}

/// Statistics of a year's cleaned rows; `None` when nothing survived cleaning.
pub fn yearly_stats(year: i32, rows: &[DistanceTimeRow], drops: DistanceDrops) -> Option<YearlyDistanceStats> {
    let durations: Vec<f64> = rows.iter().map(|r| r.duration_minutes).collect();
    let distances: Vec<f64> = rows.iter().map(|r| r.distance_meters).collect();
    Some(YearlyDistanceStats {
        year,
        total_records: rows.len() as u64,
        time: MetricStats::from_values(&durations)?,
        distance: MetricStats::from_values(&distances)?,
        weekdays: weekday_averages(rows),
        drops,
    })
}

/// Mean duration and distance per weekday present in `rows`, Monday first.
pub fn weekday_averages(rows: &[DistanceTimeRow]) -> Vec<WeekdayAverages> {
    let mut sums: BTreeMap<u8, (f64, f64, u64)> = BTreeMap::new();
    for row in rows {
        let entry = sums.entry(row.weekday).or_insert((0.0, 0.0, 0));
        entry.0 += row.duration_minutes;
        entry.1 += row.distance_meters;
        entry.2 += 1;
    }
    sums.into_iter()
        .map(|(weekday, (time, distance, count))| WeekdayAverages {
            weekday,
            avg_time: round2(time / count as f64),
            avg_distance: round2(distance / count as f64),
        })
        .collect()
}

/// Round half away from zero to 2 decimals.
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
