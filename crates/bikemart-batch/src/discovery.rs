// Input discovery
//
// Trip files live under `<base_dir>/<year>/`, one Parquet file per month.

use bikemart_core::ScanStats;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Files found for a set of years, plus the listings that failed.
#[derive(Debug, Clone, Default)]
pub struct Discovered {
    pub files: Vec<PathBuf>,
    pub stats: ScanStats,
}

impl Discovered {
    fn extend(&mut self, other: Discovered) {
        self.files.extend(other.files);
        self.stats.add(&other.stats);
    }
}

/// Directory holding one year's monthly files.
pub fn year_dir(base_dir: &Path, year: i32) -> PathBuf {
    base_dir.join(year.to_string())
}

/// Monthly Parquet files of `year`, in lexicographic order.
///
/// Listing never fails: a missing year directory yields no files, and a
/// directory or entry that cannot be read is logged and counted in the
/// returned stats. Either way that year's marts come out empty or partial.
pub fn discover_year_files(base_dir: &Path, year: i32) -> Discovered {
    let dir = year_dir(base_dir, year);
    let mut found = Discovered::default();

    let entries = match fs::read_dir(&dir) {
        Ok(entries) => entries,
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            warn!(year, dir = %dir.display(), "year directory not found, skipping");
            return found;
        }
        Err(e) => {
            warn!(year, dir = %dir.display(), error = %e, "cannot list year directory, skipping");
            found.stats.dirs_skipped_io += 1;
            found.stats.skipped_files.push(dir);
            return found;
        }
    };

    for entry in entries {
        let path = match entry {
            Ok(entry) => entry.path(),
            Err(e) => {
                warn!(year, dir = %dir.display(), error = %e, "unreadable directory entry");
                found.stats.files_skipped_io += 1;
                found.stats.skipped_files.push(dir.clone());
                continue;
            }
        };
        let is_parquet = path
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("parquet"));
        if is_parquet && path.is_file() {
            found.files.push(path);
        }
    }
    found.files.sort();

    if found.files.is_empty() {
        warn!(year, dir = %dir.display(), "no parquet files for year");
    } else {
        debug!(year, files = found.files.len(), "discovered monthly files");
    }
    found
}

/// Files of every year in `years`, year by year.
pub fn discover_files(base_dir: &Path, years: impl IntoIterator<Item = i32>) -> Discovered {
    let mut found = Discovered::default();
    for year in years {
        found.extend(discover_year_files(base_dir, year));
    }
    found
}
