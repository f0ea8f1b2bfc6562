// bikemart-writer - Mart persistence
//
// The Mart Writer turns finished summaries into standalone Parquet files
// with minimal-width integer columns; the Mart Reader loads them back for
// the dashboard.

mod encoding;
pub mod error;
pub mod read;
pub mod write;

pub use encoding::set_parquet_row_group_size;
pub use error::{ErrorCode, Result, WriterError};
pub use read::MartReader;
pub use write::MartWriter;
