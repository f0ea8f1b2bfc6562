// bikemart - Data marts from partitioned bike-share trip files
//
// Orchestrates the input, core and writer crates into the three mart
// families (time, station/route flows, distance/time) and reports what
// every run scanned, skipped and wrote.

mod init;
pub mod pipeline;

pub use init::init_tracing;
pub use pipeline::Pipeline;
