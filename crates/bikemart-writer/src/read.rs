//! Mart Reader
//!
//! Read side used by the dashboard. Per-year marts are loaded for the
//! requested years and concatenated in year order; a year whose file does
//! not exist is logged and skipped, so the result may be empty but never
//! fails for a missing file. Integer columns are cast back to the row
//! types regardless of the width they were stored with.

use crate::error::{Result, WriterError};
use bikemart_core::marts::{
    DailyHourlyRow, HourlyAverageRow, MonthlyRow, RouteSummary, StationSummary, WeekdayStatsRow,
    YearlyDistanceRow,
};
use bikemart_core::{DistanceTimeRow, MartKind, MartTable};
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use std::collections::BTreeMap;
use std::fs::File;
use std::io;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Loads marts from one output directory.
#[derive(Debug, Clone)]
pub struct MartReader {
    dir: PathBuf,
}

impl MartReader {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// `{year, month, total_rentals}` for every requested year.
    pub fn load_monthly(&self, years: &[i32]) -> Result<Vec<MonthlyRow>> {
        self.load_years(years, MartKind::Monthly)
    }

    /// Every daily-hourly row of the requested years.
    pub fn load_daily_hourly(&self, years: &[i32]) -> Result<Vec<DailyHourlyRow>> {
        self.load_years(years, MartKind::DailyHourly)
    }

    /// Hourly rows of one calendar day, for each requested year.
    pub fn load_daily(&self, years: &[i32], month: u8, day: u8) -> Result<Vec<DailyHourlyRow>> {
        let mut rows = self.load_daily_hourly(years)?;
        rows.retain(|r| r.month == month && r.day == day);
        Ok(rows)
    }

    /// Mean rentals per hour over the days of `month` that had rentals in
    /// that hour, per year.
    pub fn load_hourly_for_month(&self, years: &[i32], month: u8) -> Result<Vec<HourlyAverageRow>> {
        let mut sums: BTreeMap<(i32, u8), (u64, u64)> = BTreeMap::new();
        for row in self.load_daily_hourly(years)? {
            if row.month != month {
                continue;
            }
            let entry = sums.entry((row.year, row.hour)).or_default();
            entry.0 = entry.0.checked_add(row.total_rentals).ok_or_else(|| {
                WriterError::read_failure(
                    self.dir.join(MartKind::DailyHourly(row.year).file_name()),
                    format!("hourly total for month {month} hour {} overflows", row.hour),
                )
            })?;
            entry.1 += 1;
        }

        Ok(sums
            .into_iter()
            .map(|((year, hour), (total, days))| HourlyAverageRow {
                year,
                hour,
                avg_total_rentals: total as f64 / days as f64,
            })
            .collect())
    }

    pub fn load_station_summary(&self) -> Result<Vec<StationSummary>> {
        self.load(MartKind::StationSummary)
    }

    pub fn load_route_summary(&self) -> Result<Vec<RouteSummary>> {
        self.load(MartKind::RouteSummary)
    }

    /// Cleaned `(duration, distance, weekday)` rows of the requested years.
    pub fn load_distance_time(&self, years: &[i32]) -> Result<Vec<DistanceTimeRow>> {
        self.load_years(years, MartKind::DistanceTime)
    }

    pub fn load_distance_time_summary(&self) -> Result<Vec<YearlyDistanceRow>> {
        self.load(MartKind::DistanceSummary)
    }

    /// Weekday averages, restricted to the requested years.
    pub fn load_weekday_stats(&self, years: &[i32]) -> Result<Vec<WeekdayStatsRow>> {
        let mut rows: Vec<WeekdayStatsRow> = self.load(MartKind::DistanceWeekday)?;
        rows.retain(|r| years.contains(&r.year));
        Ok(rows)
    }

    fn load_years<T: MartTable>(&self, years: &[i32], kind: fn(i32) -> MartKind) -> Result<Vec<T>> {
        let mut rows = Vec::new();
        for &year in years {
            rows.extend(self.load::<T>(kind(year))?);
        }
        Ok(rows)
    }

    /// Load one mart file; a missing file yields no rows.
    fn load<T: MartTable>(&self, kind: MartKind) -> Result<Vec<T>> {
        let path = self.dir.join(kind.file_name());
        let file = match File::open(&path) {
            Ok(file) => file,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                warn!(path = %path.display(), "mart file not found, skipping");
                return Ok(Vec::new());
            }
            Err(e) => return Err(WriterError::read_failure(&path, e)),
        };

        let reader = ParquetRecordBatchReaderBuilder::try_new(file)
            .and_then(|builder| builder.build())
            .map_err(|e| WriterError::read_failure(&path, e))?;

        let mut rows = Vec::new();
        for batch in reader {
            let batch = batch.map_err(|e| WriterError::read_failure(&path, e))?;
            rows.extend(T::from_batch(&batch).map_err(|e| WriterError::read_failure(&path, e))?);
        }
        debug!(path = %path.display(), rows = rows.len(), "loaded mart");
        Ok(rows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::write::MartWriter;
    use tempfile::TempDir;

    fn daily(month: u8, day: u8, hour: u8, total: u64) -> DailyHourlyRow {
        DailyHourlyRow {
            year: 2021,
            month,
            day,
            hour,
            total_rentals: total,
        }
    }

    #[test]
    fn test_missing_years_are_skipped() {
        let tmp = TempDir::new().unwrap();
        let writer = MartWriter::new(tmp.path()).unwrap();
        let rows = vec![MonthlyRow {
            year: 2021,
            month: 3,
            total_rentals: 9,
        }];
        writer.write(MartKind::Monthly(2021), &rows).unwrap();

        let reader = MartReader::new(tmp.path());
        assert_eq!(reader.load_monthly(&[2020, 2021, 2022]).unwrap(), rows);
        assert!(reader.load_monthly(&[2019]).unwrap().is_empty());
        assert!(reader.load_station_summary().unwrap().is_empty());
    }

    #[test]
    fn test_hourly_average_over_days_of_month() {
        let tmp = TempDir::new().unwrap();
        let writer = MartWriter::new(tmp.path()).unwrap();
        let rows = vec![
            daily(1, 5, 8, 3),
            daily(1, 6, 8, 6),
            daily(1, 6, 9, 4),
            daily(2, 1, 8, 100),
        ];
        writer.write(MartKind::DailyHourly(2021), &rows).unwrap();

        let reader = MartReader::new(tmp.path());
        let hourly = reader.load_hourly_for_month(&[2021], 1).unwrap();
        assert_eq!(
            hourly,
            vec![
                HourlyAverageRow {
                    year: 2021,
                    hour: 8,
                    avg_total_rentals: 4.5
                },
                HourlyAverageRow {
                    year: 2021,
                    hour: 9,
                    avg_total_rentals: 4.0
                },
            ]
        );

        let day = reader.load_daily(&[2021], 1, 6).unwrap();
        assert_eq!(day, vec![daily(1, 6, 8, 6), daily(1, 6, 9, 4)]);
        assert!(reader.load_daily(&[2021], 3, 1).unwrap().is_empty());
    }

    #[test]
    fn test_corrupt_mart_is_read_failure() {
        let tmp = TempDir::new().unwrap();
        std::fs::write(tmp.path().join("station_summary.parquet"), b"garbage").unwrap();
        let err = MartReader::new(tmp.path()).load_station_summary().unwrap_err();
        assert_eq!(err.code().as_str(), "E006");
    }

    #[test]
    fn test_hourly_sum_overflow_is_read_failure() {
        let tmp = TempDir::new().unwrap();
        let writer = MartWriter::new(tmp.path()).unwrap();
        let rows = vec![daily(1, 5, 8, u64::MAX), daily(1, 6, 8, 1)];
        writer.write(MartKind::DailyHourly(2021), &rows).unwrap();

        let reader = MartReader::new(tmp.path());
        let err = reader.load_hourly_for_month(&[2021], 1).unwrap_err();
        assert_eq!(err.code(), crate::error::ErrorCode::E006ReadFailure);
        assert!(reader.load_hourly_for_month(&[2021], 2).unwrap().is_empty());
    }
}
