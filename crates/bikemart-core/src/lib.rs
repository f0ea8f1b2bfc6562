// bikemart-core - Pure mart-building logic
//
// Everything between "a projected Arrow batch" and "a mart RecordBatch":
// schema detection, normalization, incremental aggregation, distance/time
// cleaning, the station master join and the mart table layouts. No file
// I/O happens here; the batch and writer crates own the files.

pub mod aggregate;
pub mod distance;
pub mod error;
pub mod field_names;
pub mod join;
pub mod marts;
pub mod normalize;
pub mod records;
pub mod report;
pub mod schema;

pub use aggregate::{
    Accumulator, BatchFold, DailyHourlyKey, FlowFold, MonthlyKey, RouteKey, StationKey, TimeFold,
};
pub use distance::{DistanceDrops, DistanceFold, DistanceTimeRow, YearlyDistanceStats};
pub use error::{ErrorCode, PipelineError, Result};
pub use join::{join_routes, join_stations, Joined, StationInfo, StationMaster};
pub use marts::{MartKind, MartTable};
pub use normalize::{normalize_batch, normalize_station_id, NormalizedBatch, RejectCounts};
pub use records::{raw_records, NormalizedRecord, RawTripRecord, TripType};
pub use report::{RunReport, ScanStats, WrittenMart};
pub use schema::{ColumnPlan, InputShape, Projection, TripColumn};
