// Run report
//
// Every skip the pipeline makes is counted here so a run can be audited
// after the fact: skipped files, dropped rows, join misses and the marts
// that were written.

use crate::distance::DistanceDrops;
use crate::normalize::RejectCounts;
use serde::Serialize;
use std::path::PathBuf;

/// Counters of one scan over a set of files.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ScanStats {
    /// Year directories that exist but could not be listed
    pub dirs_skipped_io: u64,
    pub files_scanned: u64,
    pub files_skipped_io: u64,
    pub files_skipped_schema: u64,
    pub batches: u64,
    pub rows_read: u64,
    pub rejected: RejectCounts,
    pub skipped_files: Vec<PathBuf>,
}

impl ScanStats {
    pub fn files_skipped(&self) -> u64 {
        self.files_skipped_io + self.files_skipped_schema
    }

    pub fn add(&mut self, other: &ScanStats) {
        self.dirs_skipped_io += other.dirs_skipped_io;
        self.files_scanned += other.files_scanned;
        self.files_skipped_io += other.files_skipped_io;
        self.files_skipped_schema += other.files_skipped_schema;
        self.batches += other.batches;
        self.rows_read += other.rows_read;
        self.rejected.add(&other.rejected);
        self.skipped_files.extend(other.skipped_files.iter().cloned());
    }
}

/// A mart file produced by the run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WrittenMart {
    pub name: String,
    pub path: PathBuf,
    pub rows: u64,
    /// blake3 of the file bytes, hex
    pub content_hash: String,
}

/// Everything a run skipped, dropped or wrote.
///
/// Counters are summed over the stages of a run; a `build_all` run reads
/// each file once per mart family and counts its skips once per family.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RunReport {
    pub scan: ScanStats,
    /// Rows whose start id was missing or the maintenance sentinel
    pub excluded_start: u64,
    /// Rentals with no completed return
    pub no_return: u64,
    pub station_join_misses: u64,
    pub route_join_misses: u64,
    pub master_duplicates: u64,
    /// Master rows dropped for missing coordinates; their stations cannot join
    pub master_no_coordinates: u64,
    pub distance_drops: DistanceDrops,
    pub marts: Vec<WrittenMart>,
}

impl RunReport {
    /// Rows dropped for unparseable fields.
    pub fn rows_rejected(&self) -> u64 {
        self.scan.rejected.total()
    }

    pub fn merge(&mut self, other: RunReport) {
        self.scan.add(&other.scan);
        self.excluded_start += other.excluded_start;
        self.no_return += other.no_return;
        self.station_join_misses += other.station_join_misses;
        self.route_join_misses += other.route_join_misses;
        self.master_duplicates += other.master_duplicates;
        self.master_no_coordinates += other.master_no_coordinates;
        self.distance_drops.add(&other.distance_drops);
        self.marts.extend(other.marts);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_merge_reports() {
        let mut first = RunReport::default();
        first.scan.files_scanned = 2;
        first.scan.rejected.bad_date = 1;
        first.station_join_misses = 3;

        let mut second = RunReport::default();
        second.scan.files_skipped_io = 1;
        second.scan.skipped_files.push(PathBuf::from("2021/broken.parquet"));
        second.scan.rejected.bad_trip_count = 2;
        second.marts.push(WrittenMart {
            name: "station_summary".to_string(),
            path: PathBuf::from("out/station_summary.parquet"),
            rows: 10,
            content_hash: "00".to_string(),
        });

        first.merge(second);
        assert_eq!(first.scan.files_scanned, 2);
        assert_eq!(first.scan.files_skipped(), 1);
        assert_eq!(first.rows_rejected(), 3);
        assert_eq!(first.station_join_misses, 3);
        assert_eq!(first.marts.len(), 1);

        let json = serde_json::to_value(&first).unwrap();
        assert_eq!(json["scan"]["files_skipped_io"], 1);
        assert_eq!(json["marts"][0]["rows"], 10);
    }
}
