// Batch Reader
//
// Opens one trip file, detects its layout, and yields bounded record
// batches holding only the columns a fold needs. The file is never read in
// full; memory is one batch at a time.

use arrow::array::RecordBatch;
use bikemart_core::{ColumnPlan, InputShape, PipelineError, Projection, Result};
use parquet::arrow::arrow_reader::{ParquetRecordBatchReader, ParquetRecordBatchReaderBuilder};
use parquet::arrow::ProjectionMask;
use parquet::errors::ParquetError;
use std::fs::File;
use std::io;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Default rows per batch.
pub const DEFAULT_BATCH_ROWS: usize = 500_000;

fn parquet_error(path: &Path, err: ParquetError) -> PipelineError {
    PipelineError::io(path, io::Error::new(io::ErrorKind::InvalidData, err))
}

/// Lazy, finite sequence of projected batches from one file.
pub struct BatchReader {
    path: PathBuf,
    plan: ColumnPlan,
    inner: ParquetRecordBatchReader,
}

impl BatchReader {
    /// Open `path` for `projection`.
    ///
    /// Fails with `Io` when the file cannot be opened or is not valid
    /// Parquet, and with `SchemaMismatch` when its column count matches
    /// neither accepted layout.
    pub fn open(path: &Path, projection: Projection, batch_rows: usize) -> Result<Self> {
        let file = File::open(path).map_err(|e| PipelineError::io(path, e))?;
        let builder =
            ParquetRecordBatchReaderBuilder::try_new(file).map_err(|e| parquet_error(path, e))?;

        let schema = builder.schema().clone();
        let shape = InputShape::detect(&schema).ok_or_else(|| PipelineError::SchemaMismatch {
            path: path.to_path_buf(),
            found: schema.fields().len(),
        })?;
        let plan = ColumnPlan::new(shape, &schema, projection);

        let mask = ProjectionMask::roots(builder.parquet_schema(), plan.file_indices().iter().copied());
        let total_rows = builder.metadata().file_metadata().num_rows();
        let inner = builder
            .with_projection(mask)
            .with_batch_size(batch_rows.max(1))
            .build()
            .map_err(|e| parquet_error(path, e))?;

        debug!(
            file = %path.display(),
            shape = ?shape,
            rows = total_rows,
            columns = ?plan.file_indices(),
            "opened trip file"
        );

        Ok(Self {
            path: path.to_path_buf(),
            plan,
            inner,
        })
    }

    /// How logical columns map onto the batches this reader yields.
    pub fn plan(&self) -> &ColumnPlan {
        &self.plan
    }

    pub fn shape(&self) -> InputShape {
        self.plan.shape()
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Iterator for BatchReader {
    type Item = Result<RecordBatch>;

    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next().map(|batch| batch.map_err(PipelineError::from))
    }
}

impl std::fmt::Debug for BatchReader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BatchReader")
            .field("path", &self.path)
            .field("plan", &self.plan)
            .finish_non_exhaustive()
    }
}
