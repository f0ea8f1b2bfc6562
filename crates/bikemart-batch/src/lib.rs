//! Input side of the mart pipeline.
//!
//! Finds the monthly trip files of each year, reads them as bounded,
//! projected Arrow batches, loads the station master and drives folds over
//! whole file sets with per-file failure isolation.

pub mod discovery;
pub mod master;
pub mod reader;
pub mod scan;

pub use discovery::{discover_files, discover_year_files, year_dir, Discovered};
pub use master::load_station_master;
pub use reader::{BatchReader, DEFAULT_BATCH_ROWS};
pub use scan::{scan_file, scan_files, ScanOptions, ScanOutput};
