// Raw trip file layouts
//
// Monthly exports come in two historical layouts. The 10-column layout
// carries station names and an aggregation marker; the 7-column layout
// drops them. Both are mapped onto the same set of logical columns here.
// This is migration debt: only these two layouts are accepted, anything
// else is a schema mismatch and the file is skipped.

use crate::field_names::source;
use arrow::datatypes::{DataType, Schema};

/// A logical column the pipeline can project out of a trip file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TripColumn {
    BaseDate,
    TimeBucket,
    StartStation,
    EndStation,
    TripCount,
    DurationMinutes,
    DistanceMeters,
}

impl TripColumn {
    pub fn source_name(self) -> &'static str {
        match self {
            TripColumn::BaseDate => source::BASE_DATE,
            TripColumn::TimeBucket => source::TIME_BUCKET,
            TripColumn::StartStation => source::START_STATION_ID,
            TripColumn::EndStation => source::END_STATION_ID,
            TripColumn::TripCount => source::TRIP_COUNT,
            TripColumn::DurationMinutes => source::DURATION_MINUTES,
            TripColumn::DistanceMeters => source::DISTANCE_METERS,
        }
    }

    /// Arrow type the physical column is cast to before extraction.
    ///
    /// Dates go through `Utf8` so both integer and string encodings of
    /// `YYYYMMDD` parse the same way.
    pub fn canonical_type(self) -> DataType {
        match self {
            TripColumn::BaseDate | TripColumn::StartStation | TripColumn::EndStation => {
                DataType::Utf8
            }
            TripColumn::TimeBucket | TripColumn::TripCount => DataType::Int64,
            TripColumn::DurationMinutes | TripColumn::DistanceMeters => DataType::Float64,
        }
    }
}

/// The columns a pipeline stage needs from every file.
pub type Projection = &'static [TripColumn];

/// Columns for the daily-hourly and monthly marts.
///
/// The start id is read only to drop maintenance and blank-start rows.
pub const TIME_PROJECTION: Projection = &[
    TripColumn::BaseDate,
    TripColumn::TimeBucket,
    TripColumn::StartStation,
    TripColumn::TripCount,
];

/// Columns for the station and route marts.
pub const FLOW_PROJECTION: Projection = &[
    TripColumn::StartStation,
    TripColumn::EndStation,
    TripColumn::TripCount,
];

/// Columns for the distance/time marts.
pub const DISTANCE_PROJECTION: Projection = &[
    TripColumn::BaseDate,
    TripColumn::DurationMinutes,
    TripColumn::DistanceMeters,
];

const FULL_LAYOUT: [&str; 10] = [
    source::BASE_DATE,
    source::AGGREGATION_BASIS,
    source::TIME_BUCKET,
    source::START_STATION_ID,
    source::START_STATION_NAME,
    source::END_STATION_ID,
    source::END_STATION_NAME,
    source::TRIP_COUNT,
    source::DURATION_MINUTES,
    source::DISTANCE_METERS,
];

const COMPACT_LAYOUT: [&str; 7] = [
    source::BASE_DATE,
    source::TIME_BUCKET,
    source::START_STATION_ID,
    source::END_STATION_ID,
    source::TRIP_COUNT,
    source::DURATION_MINUTES,
    source::DISTANCE_METERS,
];

/// One of the two accepted raw layouts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputShape {
    /// 10 columns, with station names and aggregation marker
    Full,
    /// 7 columns, ids and measures only
    Compact,
}

impl InputShape {
    /// Detect the layout from the column count; `None` means schema mismatch.
    pub fn detect(schema: &Schema) -> Option<Self> {
        match schema.fields().len() {
            10 => Some(InputShape::Full),
            7 => Some(InputShape::Compact),
            _ => None,
        }
    }

    pub fn layout(self) -> &'static [&'static str] {
        match self {
            InputShape::Full => &FULL_LAYOUT,
            InputShape::Compact => &COMPACT_LAYOUT,
        }
    }

    pub fn column_count(self) -> usize {
        self.layout().len()
    }

    /// Resolve a logical column to a field index of `schema`.
    ///
    /// Looks the column up by name first and falls back to its position in
    /// this layout, since older exports carried the right columns under
    /// different headers.
    pub fn resolve(self, schema: &Schema, column: TripColumn) -> usize {
        schema
            .index_of(column.source_name())
            .unwrap_or_else(|_| self.position(column))
    }

    /// Canonical position of a logical column in this layout.
    pub fn position(self, column: TripColumn) -> usize {
        match (self, column) {
            (_, TripColumn::BaseDate) => 0,
            (InputShape::Full, TripColumn::TimeBucket) => 2,
            (InputShape::Full, TripColumn::StartStation) => 3,
            (InputShape::Full, TripColumn::EndStation) => 5,
            (InputShape::Full, TripColumn::TripCount) => 7,
            (InputShape::Full, TripColumn::DurationMinutes) => 8,
            (InputShape::Full, TripColumn::DistanceMeters) => 9,
            (InputShape::Compact, TripColumn::TimeBucket) => 1,
            (InputShape::Compact, TripColumn::StartStation) => 2,
            (InputShape::Compact, TripColumn::EndStation) => 3,
            (InputShape::Compact, TripColumn::TripCount) => 4,
            (InputShape::Compact, TripColumn::DurationMinutes) => 5,
            (InputShape::Compact, TripColumn::DistanceMeters) => 6,
        }
    }
}

/// Where each projected logical column lives in a file and in its
/// projected batches.
#[derive(Debug, Clone)]
pub struct ColumnPlan {
    shape: InputShape,
    columns: Vec<(TripColumn, usize)>,
    file_indices: Vec<usize>,
}

impl ColumnPlan {
    pub fn new(shape: InputShape, schema: &Schema, projection: Projection) -> Self {
        let columns: Vec<(TripColumn, usize)> = projection
            .iter()
            .map(|column| (*column, shape.resolve(schema, *column)))
            .collect();
        let mut file_indices: Vec<usize> = columns.iter().map(|(_, index)| *index).collect();
        file_indices.sort_unstable();
        file_indices.dedup();
        Self {
            shape,
            columns,
            file_indices,
        }
    }

    pub fn shape(&self) -> InputShape {
        self.shape
    }

    /// Root column indices to read, ascending.
    pub fn file_indices(&self) -> &[usize] {
        &self.file_indices
    }

    /// Index of `column` inside a batch read with [`Self::file_indices`].
    ///
    /// Projected batches keep file order, so this is the rank of the file
    /// index among the projected ones.
    pub fn batch_index(&self, column: TripColumn) -> Option<usize> {
        let (_, file_index) = self.columns.iter().find(|(c, _)| *c == column)?;
        self.file_indices.binary_search(file_index).ok()
    }

    pub fn projects(&self, column: TripColumn) -> bool {
        self.columns.iter().any(|(c, _)| *c == column)
    }
}
