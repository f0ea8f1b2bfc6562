// Input schema handling
//
// Layout detection and column projection for raw trip files.

pub mod input;

pub use input::{
    ColumnPlan, InputShape, Projection, TripColumn, DISTANCE_PROJECTION, FLOW_PROJECTION,
    TIME_PROJECTION,
};
