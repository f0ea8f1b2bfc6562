// Incremental aggregation
//
// Key → sum accumulators and the folds that drive them from normalized
// batches.

pub mod accumulator;
pub mod fold;
pub mod keys;

pub use accumulator::Accumulator;
pub use fold::{BatchFold, FlowFold, TimeFold};
pub use keys::{DailyHourlyKey, MonthlyKey, RouteKey, StationKey};
