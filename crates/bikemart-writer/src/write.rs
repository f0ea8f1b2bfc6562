//! Mart Writer
//!
//! Each mart is one standalone Parquet file. Integer columns are narrowed
//! to the smallest safe width, the file is encoded in memory while a blake3
//! hash is computed over the bytes, and the result is moved into place with
//! a rename so an interrupted run never leaves a partial mart behind.

use crate::encoding::writer_properties;
use crate::error::{Result, WriterError};
use arrow::array::RecordBatch;
use bikemart_core::marts::downcast_integers;
use bikemart_core::{MartKind, MartTable, WrittenMart};
use parquet::arrow::ArrowWriter;
use serde::Serialize;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

struct HashingBuffer {
    buffer: Vec<u8>,
    hasher: blake3::Hasher,
}

impl HashingBuffer {
    fn new() -> Self {
        Self {
            buffer: Vec::new(),
            hasher: blake3::Hasher::new(),
        }
    }

    fn finish(self) -> (Vec<u8>, blake3::Hash) {
        let hash = self.hasher.finalize();
        (self.buffer, hash)
    }
}

impl Write for HashingBuffer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.hasher.update(buf);
        self.buffer.extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Writes marts into one output directory.
#[derive(Debug, Clone)]
pub struct MartWriter {
    dir: PathBuf,
}

impl MartWriter {
    /// Create a writer for `dir`, creating the directory if needed.
    pub fn new(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        if dir.as_os_str().is_empty() {
            return Err(WriterError::invalid_config("output directory is empty"));
        }
        fs::create_dir_all(&dir).map_err(|e| WriterError::write_failure(&dir, e))?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path a mart of `kind` is written to.
    pub fn path_for(&self, kind: MartKind) -> PathBuf {
        self.dir.join(kind.file_name())
    }

    /// Persist `rows` as the mart `kind`.
    pub fn write<T: MartTable>(&self, kind: MartKind, rows: &[T]) -> Result<WrittenMart> {
        let path = self.path_for(kind);
        let batch = T::to_batch(rows).map_err(|e| WriterError::write_failure(&path, e))?;
        self.write_batch(kind, &batch)
    }

    /// Persist an already built mart batch.
    pub fn write_batch(&self, kind: MartKind, batch: &RecordBatch) -> Result<WrittenMart> {
        let path = self.path_for(kind);
        let narrowed = downcast_integers(batch).map_err(|e| WriterError::write_failure(&path, e))?;

        let (bytes, hash) = encode(&narrowed).map_err(|e| WriterError::write_failure(&path, e))?;
        persist(&path, &bytes)?;

        let written = WrittenMart {
            name: kind.file_stem(),
            path,
            rows: narrowed.num_rows() as u64,
            content_hash: hash.to_hex().to_string(),
        };
        info!(
            mart = %written.name,
            rows = written.rows,
            bytes = bytes.len(),
            hash = %written.content_hash,
            "wrote mart"
        );
        Ok(written)
    }

    /// Write `value` as pretty JSON next to the marts.
    pub fn write_json<S: Serialize>(&self, file_name: &str, value: &S) -> Result<PathBuf> {
        let path = self.dir.join(file_name);
        let bytes =
            serde_json::to_vec_pretty(value).map_err(|e| WriterError::write_failure(&path, e))?;
        persist(&path, &bytes)?;
        debug!(path = %path.display(), bytes = bytes.len(), "wrote json document");
        Ok(path)
    }
}

fn encode(batch: &RecordBatch) -> parquet::errors::Result<(Vec<u8>, blake3::Hash)> {
    let mut writer = ArrowWriter::try_new(
        HashingBuffer::new(),
        batch.schema(),
        Some(writer_properties().clone()),
    )?;
    writer.write(batch)?;
    Ok(writer.into_inner()?.finish())
}

/// Write `bytes` to a sibling temp file and rename it over `path`.
fn persist(path: &Path, bytes: &[u8]) -> Result<()> {
    let file_name = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .ok_or_else(|| WriterError::invalid_config(format!("no file name in {}", path.display())))?;
    let tmp = path.with_file_name(format!(".{file_name}.tmp"));

    let result = fs::write(&tmp, bytes).and_then(|()| fs::rename(&tmp, path));
    if let Err(e) = result {
        let _ = fs::remove_file(&tmp);
        return Err(WriterError::write_failure(path, e));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use bikemart_core::marts::MonthlyRow;
    use tempfile::TempDir;

    fn rows() -> Vec<MonthlyRow> {
        vec![
            MonthlyRow {
                year: 2021,
                month: 1,
                total_rentals: 120,
            },
            MonthlyRow {
                year: 2021,
                month: 2,
                total_rentals: 70_000,
            },
        ]
    }

    #[test]
    fn test_write_is_deterministic() {
        let tmp = TempDir::new().unwrap();
        let writer = MartWriter::new(tmp.path().join("marts")).unwrap();

        let first = writer.write(MartKind::Monthly(2021), &rows()).unwrap();
        let second = writer.write(MartKind::Monthly(2021), &rows()).unwrap();
        assert_eq!(first, second);
        assert_eq!(first.rows, 2);
        assert_eq!(first.name, "summary_monthly_2021");
        assert_eq!(first.content_hash.len(), 64);
        assert!(first.path.ends_with("summary_monthly_2021.parquet"));
    }

    #[test]
    fn test_no_temp_files_left_behind() {
        let tmp = TempDir::new().unwrap();
        let writer = MartWriter::new(tmp.path()).unwrap();
        writer.write(MartKind::Monthly(2020), &rows()).unwrap();
        writer.write_json("summary.json", &rows()).unwrap();

        let mut names: Vec<String> = fs::read_dir(tmp.path())
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        names.sort();
        assert_eq!(names, vec!["summary.json", "summary_monthly_2020.parquet"]);
    }

    #[test]
    fn test_empty_dir_is_invalid_config() {
        let err = MartWriter::new("").unwrap_err();
        assert_eq!(err.code().as_str(), "E004");
    }
}
