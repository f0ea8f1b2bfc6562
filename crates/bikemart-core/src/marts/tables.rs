// Mart row types and their Arrow conversions
//
// `to_batch` builds the canonical wide layout (Int64 calendar columns,
// UInt64 totals, Float64 measures); the writer narrows integers before
// persisting. `from_batch` accepts any integer width and casts back.

use super::columns::{
    read_f64, read_i64, read_narrow, read_opt_f64, read_opt_string, read_string, read_u64,
};
use crate::aggregate::{Accumulator, DailyHourlyKey, MonthlyKey};
use crate::distance::{round2, DistanceTimeRow, YearlyDistanceStats};
use crate::error::{PipelineError, Result};
use crate::field_names::mart;
use crate::join::StationInfo;
use crate::records::TripType;
use arrow::array::{ArrayRef, Float64Array, Int64Array, RecordBatch, StringArray, UInt64Array};
use arrow::datatypes::{DataType, Field, Schema, SchemaRef};
use serde::Serialize;
use std::sync::Arc;

/// A table that can be persisted as a mart file.
pub trait MartTable: Sized {
    /// Canonical schema, before integer narrowing.
    fn schema() -> SchemaRef;

    fn to_batch(rows: &[Self]) -> Result<RecordBatch>;

    fn from_batch(batch: &RecordBatch) -> Result<Vec<Self>>;
}

fn int_column(values: impl Iterator<Item = i64>) -> ArrayRef {
    Arc::new(Int64Array::from_iter_values(values))
}

fn uint_column(values: impl Iterator<Item = u64>) -> ArrayRef {
    Arc::new(UInt64Array::from_iter_values(values))
}

fn float_column(values: impl Iterator<Item = f64>) -> ArrayRef {
    Arc::new(Float64Array::from_iter_values(values))
}

fn opt_float_column(values: impl Iterator<Item = Option<f64>>) -> ArrayRef {
    Arc::new(values.collect::<Float64Array>())
}

fn string_column<'a>(values: impl Iterator<Item = &'a str>) -> ArrayRef {
    Arc::new(StringArray::from_iter_values(values))
}

fn opt_string_column<'a>(values: impl Iterator<Item = Option<&'a str>>) -> ArrayRef {
    Arc::new(values.collect::<StringArray>())
}

fn build(schema: SchemaRef, columns: Vec<ArrayRef>) -> Result<RecordBatch> {
    Ok(RecordBatch::try_new(schema, columns)?)
}

/// `summary_daily_hourly_<year>` row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DailyHourlyRow {
    pub year: i32,
    pub month: u8,
    pub day: u8,
    pub hour: u8,
    pub total_rentals: u64,
}

impl DailyHourlyRow {
    pub fn from_accumulator(acc: &Accumulator<DailyHourlyKey>) -> Vec<Self> {
        acc.iter()
            .map(|(key, total)| Self {
                year: key.year,
                month: key.month,
                day: key.day,
                hour: key.hour,
                total_rentals: total,
            })
            .collect()
    }
}

impl MartTable for DailyHourlyRow {
    fn schema() -> SchemaRef {
        Arc::new(Schema::new(vec![
            Field::new(mart::YEAR, DataType::Int64, false),
            Field::new(mart::MONTH, DataType::Int64, false),
            Field::new(mart::DAY, DataType::Int64, false),
            Field::new(mart::HOUR, DataType::Int64, false),
            Field::new(mart::TOTAL_RENTALS, DataType::UInt64, false),
        ]))
    }

    fn to_batch(rows: &[Self]) -> Result<RecordBatch> {
        build(
            Self::schema(),
            vec![
                int_column(rows.iter().map(|r| r.year as i64)),
                int_column(rows.iter().map(|r| r.month as i64)),
                int_column(rows.iter().map(|r| r.day as i64)),
                int_column(rows.iter().map(|r| r.hour as i64)),
                uint_column(rows.iter().map(|r| r.total_rentals)),
            ],
        )
    }

    fn from_batch(batch: &RecordBatch) -> Result<Vec<Self>> {
        let years = read_narrow::<i32>(batch, mart::YEAR)?;
        let months = read_narrow::<u8>(batch, mart::MONTH)?;
        let days = read_narrow::<u8>(batch, mart::DAY)?;
        let hours = read_narrow::<u8>(batch, mart::HOUR)?;
        let totals = read_u64(batch, mart::TOTAL_RENTALS)?;
        Ok((0..batch.num_rows())
            .map(|i| Self {
                year: years[i],
                month: months[i],
                day: days[i],
                hour: hours[i],
                total_rentals: totals[i],
            })
            .collect())
    }
}

/// `summary_monthly_<year>` row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct MonthlyRow {
    pub year: i32,
    pub month: u8,
    pub total_rentals: u64,
}

impl MonthlyRow {
    pub fn from_accumulator(acc: &Accumulator<MonthlyKey>) -> Vec<Self> {
        acc.iter()
            .map(|(key, total)| Self {
                year: key.year,
                month: key.month,
                total_rentals: total,
            })
            .collect()
    }
}

impl MartTable for MonthlyRow {
    fn schema() -> SchemaRef {
        Arc::new(Schema::new(vec![
            Field::new(mart::YEAR, DataType::Int64, false),
            Field::new(mart::MONTH, DataType::Int64, false),
            Field::new(mart::TOTAL_RENTALS, DataType::UInt64, false),
        ]))
    }

    fn to_batch(rows: &[Self]) -> Result<RecordBatch> {
        build(
            Self::schema(),
            vec![
                int_column(rows.iter().map(|r| r.year as i64)),
                int_column(rows.iter().map(|r| r.month as i64)),
                uint_column(rows.iter().map(|r| r.total_rentals)),
            ],
        )
    }

    fn from_batch(batch: &RecordBatch) -> Result<Vec<Self>> {
        let years = read_narrow::<i32>(batch, mart::YEAR)?;
        let months = read_narrow::<u8>(batch, mart::MONTH)?;
        let totals = read_u64(batch, mart::TOTAL_RENTALS)?;
        Ok((0..batch.num_rows())
            .map(|i| Self {
                year: years[i],
                month: months[i],
                total_rentals: totals[i],
            })
            .collect())
    }
}

/// Mean rentals per hour over the days of one month. Derived on read,
/// never persisted.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct HourlyAverageRow {
    pub year: i32,
    pub hour: u8,
    pub avg_total_rentals: f64,
}

/// `station_summary` row.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StationSummary {
    pub station_id: String,
    #[serde(flatten)]
    pub info: StationInfo,
    pub total_rentals: u64,
    pub total_returns: u64,
    pub total_usage: u64,
    /// rentals - returns; positive means bikes drain from the station
    pub net_flow: i64,
}

impl MartTable for StationSummary {
    fn schema() -> SchemaRef {
        Arc::new(Schema::new(vec![
            Field::new(mart::STATION_ID, DataType::Utf8, false),
            Field::new(mart::ADDRESS1, DataType::Utf8, false),
            Field::new(mart::ADDRESS2, DataType::Utf8, true),
            Field::new(mart::LATITUDE, DataType::Float64, false),
            Field::new(mart::LONGITUDE, DataType::Float64, false),
            Field::new(mart::TOTAL_RENTALS, DataType::UInt64, false),
            Field::new(mart::TOTAL_RETURNS, DataType::UInt64, false),
            Field::new(mart::TOTAL_USAGE, DataType::UInt64, false),
            Field::new(mart::NET_FLOW, DataType::Int64, false),
        ]))
    }

    fn to_batch(rows: &[Self]) -> Result<RecordBatch> {
        build(
            Self::schema(),
            vec![
                string_column(rows.iter().map(|r| r.station_id.as_str())),
                string_column(rows.iter().map(|r| r.info.address1.as_str())),
                opt_string_column(rows.iter().map(|r| r.info.address2.as_deref())),
                float_column(rows.iter().map(|r| r.info.latitude)),
                float_column(rows.iter().map(|r| r.info.longitude)),
                uint_column(rows.iter().map(|r| r.total_rentals)),
                uint_column(rows.iter().map(|r| r.total_returns)),
                uint_column(rows.iter().map(|r| r.total_usage)),
                int_column(rows.iter().map(|r| r.net_flow)),
            ],
        )
    }

    fn from_batch(batch: &RecordBatch) -> Result<Vec<Self>> {
        let ids = read_string(batch, mart::STATION_ID)?;
        let infos = read_station_info(batch, "")?;
        let rentals = read_u64(batch, mart::TOTAL_RENTALS)?;
        let returns = read_u64(batch, mart::TOTAL_RETURNS)?;
        let usage = read_u64(batch, mart::TOTAL_USAGE)?;
        let net_flow = read_i64(batch, mart::NET_FLOW)?;
        Ok(ids
            .into_iter()
            .zip(infos)
            .enumerate()
            .map(|(i, (station_id, info))| Self {
                station_id,
                info,
                total_rentals: rentals[i],
                total_returns: returns[i],
                total_usage: usage[i],
                net_flow: net_flow[i],
            })
            .collect())
    }
}

/// Reads the four attribute columns of a station, with an optional
/// `start_`/`end_` prefix for route marts.
fn read_station_info(batch: &RecordBatch, prefix: &str) -> Result<Vec<StationInfo>> {
    let name = |column: &str| format!("{prefix}{column}");
    let address1 = read_string(batch, &name(mart::ADDRESS1))?;
    let address2 = read_opt_string(batch, &name(mart::ADDRESS2))?;
    let latitude = read_f64(batch, &name(mart::LATITUDE))?;
    let longitude = read_f64(batch, &name(mart::LONGITUDE))?;
    Ok(address1
        .into_iter()
        .zip(address2)
        .enumerate()
        .map(|(i, (address1, address2))| StationInfo {
            address1,
            address2,
            latitude: latitude[i],
            longitude: longitude[i],
        })
        .collect())
}

/// `route_summary` row.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RouteSummary {
    pub start_station_id: String,
    pub end_station_id: String,
    pub usage_count: u64,
    pub trip_type: TripType,
    pub start: StationInfo,
    pub end: StationInfo,
}

impl MartTable for RouteSummary {
    fn schema() -> SchemaRef {
        Arc::new(Schema::new(vec![
            Field::new(mart::START_STATION_ID, DataType::Utf8, false),
            Field::new(mart::END_STATION_ID, DataType::Utf8, false),
            Field::new(mart::USAGE_COUNT, DataType::UInt64, false),
            Field::new(mart::TRIP_TYPE, DataType::Utf8, false),
            Field::new(mart::START_ADDRESS1, DataType::Utf8, false),
            Field::new(mart::START_ADDRESS2, DataType::Utf8, true),
            Field::new(mart::START_LATITUDE, DataType::Float64, false),
            Field::new(mart::START_LONGITUDE, DataType::Float64, false),
            Field::new(mart::END_ADDRESS1, DataType::Utf8, false),
            Field::new(mart::END_ADDRESS2, DataType::Utf8, true),
            Field::new(mart::END_LATITUDE, DataType::Float64, false),
            Field::new(mart::END_LONGITUDE, DataType::Float64, false),
        ]))
    }

    fn to_batch(rows: &[Self]) -> Result<RecordBatch> {
        build(
            Self::schema(),
            vec![
                string_column(rows.iter().map(|r| r.start_station_id.as_str())),
                string_column(rows.iter().map(|r| r.end_station_id.as_str())),
                uint_column(rows.iter().map(|r| r.usage_count)),
                string_column(rows.iter().map(|r| r.trip_type.as_str())),
                string_column(rows.iter().map(|r| r.start.address1.as_str())),
                opt_string_column(rows.iter().map(|r| r.start.address2.as_deref())),
                float_column(rows.iter().map(|r| r.start.latitude)),
                float_column(rows.iter().map(|r| r.start.longitude)),
                string_column(rows.iter().map(|r| r.end.address1.as_str())),
                opt_string_column(rows.iter().map(|r| r.end.address2.as_deref())),
                float_column(rows.iter().map(|r| r.end.latitude)),
                float_column(rows.iter().map(|r| r.end.longitude)),
            ],
        )
    }

    fn from_batch(batch: &RecordBatch) -> Result<Vec<Self>> {
        let starts = read_string(batch, mart::START_STATION_ID)?;
        let ends = read_string(batch, mart::END_STATION_ID)?;
        let usage = read_u64(batch, mart::USAGE_COUNT)?;
        let trip_types = read_string(batch, mart::TRIP_TYPE)?
            .iter()
            .map(|value| {
                TripType::parse(value)
                    .ok_or_else(|| PipelineError::parse(mart::TRIP_TYPE, format!("unknown value '{value}'")))
            })
            .collect::<Result<Vec<_>>>()?;
        let start_infos = read_station_info(batch, "start_")?;
        let end_infos = read_station_info(batch, "end_")?;

        Ok(starts
            .into_iter()
            .zip(ends)
            .zip(start_infos.into_iter().zip(end_infos))
            .enumerate()
            .map(|(i, ((start_station_id, end_station_id), (start, end)))| Self {
                start_station_id,
                end_station_id,
                usage_count: usage[i],
                trip_type: trip_types[i],
                start,
                end,
            })
            .collect())
    }
}

impl MartTable for DistanceTimeRow {
    fn schema() -> SchemaRef {
        Arc::new(Schema::new(vec![
            Field::new(mart::DURATION_MINUTES, DataType::Float64, false),
            Field::new(mart::DISTANCE_METERS, DataType::Float64, false),
            Field::new(mart::WEEKDAY, DataType::Int64, false),
        ]))
    }

    fn to_batch(rows: &[Self]) -> Result<RecordBatch> {
        build(
            Self::schema(),
            vec![
                float_column(rows.iter().map(|r| r.duration_minutes)),
                float_column(rows.iter().map(|r| r.distance_meters)),
                int_column(rows.iter().map(|r| r.weekday as i64)),
            ],
        )
    }

    fn from_batch(batch: &RecordBatch) -> Result<Vec<Self>> {
        let durations = read_f64(batch, mart::DURATION_MINUTES)?;
        let distances = read_f64(batch, mart::DISTANCE_METERS)?;
        let weekdays = read_narrow::<u8>(batch, mart::WEEKDAY)?;
        Ok((0..batch.num_rows())
            .map(|i| Self {
                duration_minutes: durations[i],
                distance_meters: distances[i],
                weekday: weekdays[i],
            })
            .collect())
    }
}

/// `distance_time_summary` row. Measures are rounded to 2 decimals.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct YearlyDistanceRow {
    pub year: i32,
    pub total_records: u64,
    pub avg_time: f64,
    pub avg_distance: f64,
    pub median_time: f64,
    pub median_distance: f64,
    pub std_time: Option<f64>,
    pub std_distance: Option<f64>,
    pub min_time: f64,
    pub max_time: f64,
    pub min_distance: f64,
    pub max_distance: f64,
}

impl From<&YearlyDistanceStats> for YearlyDistanceRow {
    fn from(stats: &YearlyDistanceStats) -> Self {
        Self {
            year: stats.year,
            total_records: stats.total_records,
            avg_time: round2(stats.time.mean),
            avg_distance: round2(stats.distance.mean),
            median_time: round2(stats.time.median),
            median_distance: round2(stats.distance.median),
            std_time: stats.time.std.map(round2),
            std_distance: stats.distance.std.map(round2),
            min_time: round2(stats.time.min),
            max_time: round2(stats.time.max),
            min_distance: round2(stats.distance.min),
            max_distance: round2(stats.distance.max),
        }
    }
}

impl MartTable for YearlyDistanceRow {
    fn schema() -> SchemaRef {
        Arc::new(Schema::new(vec![
            Field::new(mart::YEAR, DataType::Int64, false),
            Field::new(mart::TOTAL_RECORDS, DataType::UInt64, false),
            Field::new(mart::AVG_TIME, DataType::Float64, false),
            Field::new(mart::AVG_DISTANCE, DataType::Float64, false),
            Field::new(mart::MEDIAN_TIME, DataType::Float64, false),
            Field::new(mart::MEDIAN_DISTANCE, DataType::Float64, false),
            Field::new(mart::STD_TIME, DataType::Float64, true),
            Field::new(mart::STD_DISTANCE, DataType::Float64, true),
            Field::new(mart::MIN_TIME, DataType::Float64, false),
            Field::new(mart::MAX_TIME, DataType::Float64, false),
            Field::new(mart::MIN_DISTANCE, DataType::Float64, false),
            Field::new(mart::MAX_DISTANCE, DataType::Float64, false),
        ]))
    }

    fn to_batch(rows: &[Self]) -> Result<RecordBatch> {
        build(
            Self::schema(),
            vec![
                int_column(rows.iter().map(|r| r.year as i64)),
                uint_column(rows.iter().map(|r| r.total_records)),
                float_column(rows.iter().map(|r| r.avg_time)),
                float_column(rows.iter().map(|r| r.avg_distance)),
                float_column(rows.iter().map(|r| r.median_time)),
                float_column(rows.iter().map(|r| r.median_distance)),
                opt_float_column(rows.iter().map(|r| r.std_time)),
                opt_float_column(rows.iter().map(|r| r.std_distance)),
                float_column(rows.iter().map(|r| r.min_time)),
                float_column(rows.iter().map(|r| r.max_time)),
                float_column(rows.iter().map(|r| r.min_distance)),
                float_column(rows.iter().map(|r| r.max_distance)),
            ],
        )
    }

    fn from_batch(batch: &RecordBatch) -> Result<Vec<Self>> {
        let years = read_narrow::<i32>(batch, mart::YEAR)?;
        let records = read_u64(batch, mart::TOTAL_RECORDS)?;
        let avg_time = read_f64(batch, mart::AVG_TIME)?;
        let avg_distance = read_f64(batch, mart::AVG_DISTANCE)?;
        let median_time = read_f64(batch, mart::MEDIAN_TIME)?;
        let median_distance = read_f64(batch, mart::MEDIAN_DISTANCE)?;
        let std_time = read_opt_f64(batch, mart::STD_TIME)?;
        let std_distance = read_opt_f64(batch, mart::STD_DISTANCE)?;
        let min_time = read_f64(batch, mart::MIN_TIME)?;
        let max_time = read_f64(batch, mart::MAX_TIME)?;
        let min_distance = read_f64(batch, mart::MIN_DISTANCE)?;
        let max_distance = read_f64(batch, mart::MAX_DISTANCE)?;
        Ok((0..batch.num_rows())
            .map(|i| Self {
                year: years[i],
                total_records: records[i],
                avg_time: avg_time[i],
                avg_distance: avg_distance[i],
                median_time: median_time[i],
                median_distance: median_distance[i],
                std_time: std_time[i],
                std_distance: std_distance[i],
                min_time: min_time[i],
                max_time: max_time[i],
                min_distance: min_distance[i],
                max_distance: max_distance[i],
            })
            .collect())
    }
}

/// `distance_time_weekday` row.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct WeekdayStatsRow {
    pub year: i32,
    pub weekday: u8,
    pub avg_time: f64,
    pub avg_distance: f64,
}

impl WeekdayStatsRow {
    pub fn from_stats(stats: &YearlyDistanceStats) -> Vec<Self> {
        stats
            .weekdays
            .iter()
            .map(|w| Self {
                year: stats.year,
                weekday: w.weekday,
                avg_time: w.avg_time,
                avg_distance: w.avg_distance,
            })
            .collect()
    }
}

impl MartTable for WeekdayStatsRow {
    fn schema() -> SchemaRef {
        Arc::new(Schema::new(vec![
            Field::new(mart::YEAR, DataType::Int64, false),
            Field::new(mart::WEEKDAY, DataType::Int64, false),
            Field::new(mart::AVG_TIME, DataType::Float64, false),
            Field::new(mart::AVG_DISTANCE, DataType::Float64, false),
        ]))
    }

    fn to_batch(rows: &[Self]) -> Result<RecordBatch> {
        build(
            Self::schema(),
            vec![
                int_column(rows.iter().map(|r| r.year as i64)),
                int_column(rows.iter().map(|r| r.weekday as i64)),
                float_column(rows.iter().map(|r| r.avg_time)),
                float_column(rows.iter().map(|r| r.avg_distance)),
            ],
        )
    }

    fn from_batch(batch: &RecordBatch) -> Result<Vec<Self>> {
        let years = read_narrow::<i32>(batch, mart::YEAR)?;
        let weekdays = read_narrow::<u8>(batch, mart::WEEKDAY)?;
        let avg_time = read_f64(batch, mart::AVG_TIME)?;
        let avg_distance = read_f64(batch, mart::AVG_DISTANCE)?;
        Ok((0..batch.num_rows())
            .map(|i| Self {
                year: years[i],
                weekday: weekdays[i],
                avg_time: avg_time[i],
                avg_distance: avg_distance[i],
            })
            .collect())
    }
}
