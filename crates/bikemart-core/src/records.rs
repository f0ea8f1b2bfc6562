// Typed trip records
//
// `RawTripRecord` is what comes off a projected Arrow batch, with every
// field optional because projections differ per mart family.
// `NormalizedRecord` is what the aggregators consume: calendar fields
// derived, station ids cleaned, sentinels resolved.

use crate::error::Result;
use crate::schema::{ColumnPlan, TripColumn};
use arrow::array::{AsArray, RecordBatch};
use arrow::compute::cast;
use arrow::datatypes::{Float64Type, Int64Type};
use serde::Serialize;

/// One row of a trip file as read, before any cleaning.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawTripRecord {
    pub base_date: Option<String>,
    pub time_bucket: Option<i64>,
    pub start_station: Option<String>,
    pub end_station: Option<String>,
    pub trip_count: Option<i64>,
    pub duration_minutes: Option<f64>,
    pub distance_meters: Option<f64>,
}

/// Calendar fields derived from the encoded date.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TripCalendar {
    pub year: i32,
    pub month: u8,
    pub day: u8,
    /// 0 = Monday .. 6 = Sunday
    pub weekday: u8,
}

/// A cleaned trip row.
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedRecord {
    /// Present when the date column was projected
    pub calendar: Option<TripCalendar>,
    /// Present when the time bucket column was projected
    pub hour: Option<u8>,
    /// Trimmed start id; `None` when blank or NaN-like
    pub start_station: Option<String>,
    /// Trimmed end id; `None` when blank or NaN-like
    pub end_station: Option<String>,
    /// 0 when the count column was not projected
    pub trip_count: u64,
    pub duration_minutes: Option<f64>,
    pub distance_meters: Option<f64>,
}

/// Start ids equal to this (any case) are maintenance movements, not rentals.
pub const CENTER_SENTINEL: &str = "center";
/// End id recorded when a bike was never returned to a station.
pub const NO_RETURN_SENTINEL: &str = "X";

/// Trip classification by endpoints.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TripType {
    RoundTrip,
    OneWay,
}

impl TripType {
    pub fn of(start: &str, end: &str) -> Self {
        if start == end {
            TripType::RoundTrip
        } else {
            TripType::OneWay
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            TripType::RoundTrip => "round_trip",
            TripType::OneWay => "one_way",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "round_trip" => Some(TripType::RoundTrip),
            "one_way" => Some(TripType::OneWay),
            _ => None,
        }
    }
}

impl std::fmt::Display for TripType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

fn is_center(id: &str) -> bool {
    id.eq_ignore_ascii_case(CENTER_SENTINEL)
}

impl NormalizedRecord {
    /// Station credited with the rental, or `None` if the row is excluded
    /// from every station accumulator.
    pub fn rental_station(&self) -> Option<&str> {
        self.start_station.as_deref().filter(|id| !is_center(id))
    }

    /// Station credited with the return, if the trip was completed.
    ///
    /// Rows without a valid rental station never count as returns.
    pub fn return_station(&self) -> Option<&str> {
        self.rental_station()?;
        self.end_station
            .as_deref()
            .filter(|id| !id.eq_ignore_ascii_case(NO_RETURN_SENTINEL) && !is_center(id))
    }

    /// `(start, end)` for completed trips.
    pub fn route(&self) -> Option<(&str, &str)> {
        Some((self.rental_station()?, self.return_station()?))
    }
}

/// Extract typed rows from a projected batch.
///
/// Each projected column is cast to its canonical type first; values the
/// cast cannot represent become nulls and are rejected later by the
/// normalizer.
pub fn raw_records(batch: &RecordBatch, plan: &ColumnPlan) -> Result<Vec<RawTripRecord>> {
    let mut rows = vec![RawTripRecord::default(); batch.num_rows()];

    for column in [
        TripColumn::BaseDate,
        TripColumn::TimeBucket,
        TripColumn::StartStation,
        TripColumn::EndStation,
        TripColumn::TripCount,
        TripColumn::DurationMinutes,
        TripColumn::DistanceMeters,
    ] {
        let Some(index) = plan.batch_index(column) else {
            continue;
        };
        let array = cast(batch.column(index), &column.canonical_type())?;

        match column {
            TripColumn::BaseDate | TripColumn::StartStation | TripColumn::EndStation => {
                let values = array.as_string::<i32>();
                for (row, value) in rows.iter_mut().zip(values.iter()) {
                    let value = value.map(str::to_string);
                    match column {
                        TripColumn::BaseDate => row.base_date = value,
                        TripColumn::StartStation => row.start_station = value,
                        _ => row.end_station = value,
                    }
                }
            }
            TripColumn::TimeBucket | TripColumn::TripCount => {
                let values = array.as_primitive::<Int64Type>();
                for (row, value) in rows.iter_mut().zip(values.iter()) {
                    if column == TripColumn::TimeBucket {
                        row.time_bucket = value;
                    } else {
                        row.trip_count = value;
                    }
                }
            }
            TripColumn::DurationMinutes | TripColumn::DistanceMeters => {
                let values = array.as_primitive::<Float64Type>();
                for (row, value) in rows.iter_mut().zip(values.iter()) {
                    // some exports store missing measures as NaN
                    let value = value.filter(|v| !v.is_nan());
                    if column == TripColumn::DurationMinutes {
                        row.duration_minutes = value;
                    } else {
                        row.distance_meters = value;
                    }
                }
            }
        }
    }

    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::field_names::source;
    use crate::schema::{InputShape, FLOW_PROJECTION, TIME_PROJECTION};
    use arrow::array::{Float64Array, Int32Array, Int64Array, StringArray};
    use arrow::datatypes::{DataType, Field, Schema};
    use std::sync::Arc;

    fn record(start: Option<&str>, end: Option<&str>) -> NormalizedRecord {
        NormalizedRecord {
            calendar: None,
            hour: None,
            start_station: start.map(str::to_string),
            end_station: end.map(str::to_string),
            trip_count: 1,
            duration_minutes: None,
            distance_meters: None,
        }
    }

    #[test]
    fn test_station_classification() {
        let r = record(Some("ST-1"), Some("ST-2"));
        assert_eq!(r.rental_station(), Some("ST-1"));
        assert_eq!(r.return_station(), Some("ST-2"));
        assert_eq!(r.route(), Some(("ST-1", "ST-2")));

        let no_return = record(Some("ST-1"), Some("X"));
        assert_eq!(no_return.rental_station(), Some("ST-1"));
        assert_eq!(no_return.return_station(), None);
        assert_eq!(no_return.route(), None);

        let null_end = record(Some("ST-1"), None);
        assert_eq!(null_end.return_station(), None);

        let center = record(Some("CENTER"), Some("ST-2"));
        assert_eq!(center.rental_station(), None);
        assert_eq!(center.return_station(), None);
        assert_eq!(center.route(), None);
    }

    #[test]
    fn test_trip_type() {
        assert_eq!(TripType::of("A", "A"), TripType::RoundTrip);
        assert_eq!(TripType::of("A", "B"), TripType::OneWay);
        assert_eq!(TripType::parse("one_way"), Some(TripType::OneWay));
        assert_eq!(TripType::parse("편도"), None);
    }

    #[test]
    fn test_raw_records_casts_physical_types() {
        // Compact layout with integer dates and 32-bit buckets
        let schema = Arc::new(Schema::new(vec![
            Field::new(source::BASE_DATE, DataType::Int64, true),
            Field::new(source::TIME_BUCKET, DataType::Int32, true),
            Field::new(source::START_STATION_ID, DataType::Utf8, true),
            Field::new(source::END_STATION_ID, DataType::Utf8, true),
            Field::new(source::TRIP_COUNT, DataType::Int64, true),
            Field::new(source::DURATION_MINUTES, DataType::Float64, true),
            Field::new(source::DISTANCE_METERS, DataType::Float64, true),
        ]));
        let batch = RecordBatch::try_new(
            schema.clone(),
            vec![
                Arc::new(Int64Array::from(vec![Some(20210105), None])),
                Arc::new(Int32Array::from(vec![800, 1700])),
                Arc::new(StringArray::from(vec![Some(" ST-1 "), None])),
                Arc::new(StringArray::from(vec![Some("ST-2"), Some("X")])),
                Arc::new(Int64Array::from(vec![3, 2])),
                Arc::new(Float64Array::from(vec![Some(12.5), Some(f64::NAN)])),
                Arc::new(Float64Array::from(vec![Some(1500.0), None])),
            ],
        )
        .unwrap();

        let plan = ColumnPlan::new(InputShape::Compact, &schema, TIME_PROJECTION);
        let projected = batch.project(plan.file_indices()).unwrap();
        let rows = raw_records(&projected, &plan).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].base_date.as_deref(), Some("20210105"));
        assert_eq!(rows[0].time_bucket, Some(800));
        assert_eq!(rows[0].trip_count, Some(3));
        assert_eq!(rows[0].start_station.as_deref(), Some(" ST-1 "));
        assert_eq!(rows[0].end_station, None, "not projected");
        assert_eq!(rows[1].base_date, None);

        let plan = ColumnPlan::new(InputShape::Compact, &schema, FLOW_PROJECTION);
        let projected = batch.project(plan.file_indices()).unwrap();
        let rows = raw_records(&projected, &plan).unwrap();
        assert_eq!(rows[0].start_station.as_deref(), Some(" ST-1 "));
        assert_eq!(rows[1].end_station.as_deref(), Some("X"));
        assert_eq!(rows[0].base_date, None, "not projected");
    }

    #[test]
    fn test_raw_records_nan_metrics_become_null() {
        let schema = Arc::new(Schema::new(vec![
            Field::new(source::BASE_DATE, DataType::Utf8, true),
            Field::new(source::TIME_BUCKET, DataType::Int64, true),
            Field::new(source::START_STATION_ID, DataType::Utf8, true),
            Field::new(source::END_STATION_ID, DataType::Utf8, true),
            Field::new(source::TRIP_COUNT, DataType::Int64, true),
            Field::new(source::DURATION_MINUTES, DataType::Float64, true),
            Field::new(source::DISTANCE_METERS, DataType::Float64, true),
        ]));
        let batch = RecordBatch::try_new(
            schema.clone(),
            vec![
                Arc::new(StringArray::from(vec!["20210105"])),
                Arc::new(Int64Array::from(vec![800])),
                Arc::new(StringArray::from(vec!["ST-1"])),
                Arc::new(StringArray::from(vec!["ST-2"])),
                Arc::new(Int64Array::from(vec![1])),
                Arc::new(Float64Array::from(vec![f64::NAN])),
                Arc::new(Float64Array::from(vec![250.0])),
            ],
        )
        .unwrap();

        let plan = ColumnPlan::new(
            InputShape::Compact,
            &schema,
            crate::schema::DISTANCE_PROJECTION,
        );
        let projected = batch.project(plan.file_indices()).unwrap();
        let rows = raw_records(&projected, &plan).unwrap();
        assert_eq!(rows[0].duration_minutes, None);
        assert_eq!(rows[0].distance_meters, Some(250.0));
    }
}
