// Scan driver
//
// Folds every file of a unit list into one `BatchFold`. Each file produces
// a private partial fold that is combined into the running result as soon
// as the file is done, so at most one partial per worker is alive besides
// the result. Files are independent units, so with more than one worker
// they are scanned on a rayon pool; the ordered reduce still combines
// partials in file order.
//
// A file that cannot be opened, has an unknown layout, or fails mid-read
// is logged and excluded as a whole. Overflow is the only fatal error.

use crate::reader::{BatchReader, DEFAULT_BATCH_ROWS};
use bikemart_core::{normalize_batch, raw_records, BatchFold, PipelineError, Result, ScanStats};
use rayon::prelude::*;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// How a scan reads its files.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScanOptions {
    /// Rows per batch
    pub batch_rows: usize,
    /// 1 scans sequentially; 0 uses one worker per CPU
    pub workers: usize,
}

impl Default for ScanOptions {
    fn default() -> Self {
        Self {
            batch_rows: DEFAULT_BATCH_ROWS,
            workers: 1,
        }
    }
}

/// Final fold of a scan and what it skipped.
#[derive(Debug, Clone, Default)]
pub struct ScanOutput<F> {
    pub fold: F,
    pub stats: ScanStats,
}

impl<F: BatchFold> ScanOutput<F> {
    /// Absorb the output of files that come after this one.
    fn absorb(&mut self, later: ScanOutput<F>) -> Result<()> {
        self.fold.combine(later.fold)?;
        self.stats.add(&later.stats);
        Ok(())
    }
}

/// Fold every file in `files` into `F`.
pub fn scan_files<F: BatchFold>(files: &[PathBuf], options: &ScanOptions) -> Result<ScanOutput<F>> {
    let output = if options.workers == 1 || files.len() <= 1 {
        scan_sequential::<F>(files, options.batch_rows)?
    } else {
        match build_pool(options.workers) {
            Ok(pool) => pool.install(|| scan_parallel::<F>(files, options.batch_rows))?,
            Err(e) => {
                warn!(error = %e, "could not start worker pool, scanning sequentially");
                scan_sequential::<F>(files, options.batch_rows)?
            }
        }
    };

    info!(
        files = output.stats.files_scanned,
        skipped = output.stats.files_skipped(),
        rows = output.stats.rows_read,
        rejected = output.stats.rejected.total(),
        "scan complete"
    );
    Ok(output)
}

fn scan_sequential<F: BatchFold>(files: &[PathBuf], batch_rows: usize) -> Result<ScanOutput<F>> {
    let mut output = ScanOutput::<F>::default();
    for path in files {
        output.absorb(scan_unit::<F>(path, batch_rows)?)?;
    }
    Ok(output)
}

fn scan_parallel<F: BatchFold>(files: &[PathBuf], batch_rows: usize) -> Result<ScanOutput<F>> {
    // reduce over an indexed iterator keeps left/right order
    files
        .par_iter()
        .map(|path| scan_unit::<F>(path, batch_rows))
        .try_reduce(ScanOutput::<F>::default, |mut earlier, later| {
            earlier.absorb(later)?;
            Ok(earlier)
        })
}

fn build_pool(workers: usize) -> std::result::Result<rayon::ThreadPool, rayon::ThreadPoolBuildError> {
    // 0 lets rayon pick one thread per CPU
    rayon::ThreadPoolBuilder::new().num_threads(workers).build()
}

/// Scan one file, turning skippable failures into skip counters.
fn scan_unit<F: BatchFold>(path: &Path, batch_rows: usize) -> Result<ScanOutput<F>> {
    match scan_file::<F>(path, batch_rows) {
        Ok(output) => Ok(output),
        Err(err @ PipelineError::Overflow { .. }) => Err(err),
        Err(err) => {
            warn!(file = %path.display(), error = %err, "skipping file");
            let mut stats = ScanStats::default();
            match err {
                PipelineError::SchemaMismatch { .. } => stats.files_skipped_schema = 1,
                _ => stats.files_skipped_io = 1,
            }
            stats.skipped_files.push(path.to_path_buf());
            Ok(ScanOutput {
                fold: F::default(),
                stats,
            })
        }
    }
}

/// Stream one file through normalization into a fresh fold.
pub fn scan_file<F: BatchFold>(path: &Path, batch_rows: usize) -> Result<ScanOutput<F>> {
    let mut reader = BatchReader::open(path, F::PROJECTION, batch_rows)?;
    let mut output = ScanOutput::<F>::default();

    while let Some(batch) = reader.next() {
        let batch = batch?;
        let raw = raw_records(&batch, reader.plan())?;
        let normalized = normalize_batch(raw, F::PROJECTION);
        output.fold.fold(&normalized)?;

        output.stats.batches += 1;
        output.stats.rows_read += batch.num_rows() as u64;
        output.stats.rejected.add(&normalized.rejected);
    }
    output.stats.files_scanned = 1;

    debug!(
        file = %path.display(),
        batches = output.stats.batches,
        rows = output.stats.rows_read,
        rejected = output.stats.rejected.total(),
        "scanned file"
    );
    Ok(output)
}
