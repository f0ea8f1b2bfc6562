// Batch Reader and scan driver over real Parquet files.

use arrow::array::{ArrayRef, Float64Array, Int32Array, Int64Array, RecordBatch, StringArray};
use arrow::datatypes::{DataType, Field, Schema};
use bikemart_batch::{scan_files, BatchReader, ScanOptions};
use bikemart_core::field_names::source;
use bikemart_core::schema::TIME_PROJECTION;
use bikemart_core::schema::Projection;
use bikemart_core::{
    BatchFold, DailyHourlyKey, DistanceFold, FlowFold, NormalizedBatch, PipelineError, TimeFold,
    TripColumn,
};
use parquet::arrow::ArrowWriter;
use std::fs::{self, File};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tempfile::TempDir;

/// (date, bucket, start, end, count, minutes, meters)
type Trip<'a> = (&'a str, i64, &'a str, &'a str, i64, f64, f64);

fn write_parquet(path: &Path, batch: &RecordBatch) {
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    let file = File::create(path).unwrap();
    let mut writer = ArrowWriter::try_new(file, batch.schema(), None).unwrap();
    writer.write(batch).unwrap();
    writer.close().unwrap();
}

fn full_file(path: &Path, trips: &[Trip]) -> PathBuf {
    let schema = Arc::new(Schema::new(vec![
        Field::new(source::BASE_DATE, DataType::Utf8, true),
        Field::new(source::AGGREGATION_BASIS, DataType::Utf8, true),
        Field::new(source::TIME_BUCKET, DataType::Int64, true),
        Field::new(source::START_STATION_ID, DataType::Utf8, true),
        Field::new(source::START_STATION_NAME, DataType::Utf8, true),
        Field::new(source::END_STATION_ID, DataType::Utf8, true),
        Field::new(source::END_STATION_NAME, DataType::Utf8, true),
        Field::new(source::TRIP_COUNT, DataType::Int64, true),
        Field::new(source::DURATION_MINUTES, DataType::Float64, true),
        Field::new(source::DISTANCE_METERS, DataType::Float64, true),
    ]));
    let columns: Vec<ArrayRef> = vec![
        Arc::new(StringArray::from_iter_values(trips.iter().map(|t| t.0))),
        Arc::new(StringArray::from_iter_values(trips.iter().map(|_| "출발시간"))),
        Arc::new(Int64Array::from_iter_values(trips.iter().map(|t| t.1))),
        Arc::new(StringArray::from_iter_values(trips.iter().map(|t| t.2))),
        Arc::new(StringArray::from_iter_values(trips.iter().map(|t| t.2))),
        Arc::new(StringArray::from_iter_values(trips.iter().map(|t| t.3))),
        Arc::new(StringArray::from_iter_values(trips.iter().map(|t| t.3))),
        Arc::new(Int64Array::from_iter_values(trips.iter().map(|t| t.4))),
        Arc::new(Float64Array::from_iter_values(trips.iter().map(|t| t.5))),
        Arc::new(Float64Array::from_iter_values(trips.iter().map(|t| t.6))),
    ];
    write_parquet(path, &RecordBatch::try_new(schema, columns).unwrap());
    path.to_path_buf()
}

/// Compact layout with integer-typed dates and 32-bit buckets.
fn compact_file(path: &Path, trips: &[Trip]) -> PathBuf {
    let schema = Arc::new(Schema::new(vec![
        Field::new(source::BASE_DATE, DataType::Int64, true),
        Field::new(source::TIME_BUCKET, DataType::Int32, true),
        Field::new(source::START_STATION_ID, DataType::Utf8, true),
        Field::new(source::END_STATION_ID, DataType::Utf8, true),
        Field::new(source::TRIP_COUNT, DataType::Int64, true),
        Field::new(source::DURATION_MINUTES, DataType::Float64, true),
        Field::new(source::DISTANCE_METERS, DataType::Float64, true),
    ]));
    let columns: Vec<ArrayRef> = vec![
        Arc::new(Int64Array::from_iter_values(
            trips.iter().map(|t| t.0.parse::<i64>().unwrap()),
        )),
        Arc::new(Int32Array::from_iter_values(trips.iter().map(|t| t.1 as i32))),
        Arc::new(StringArray::from_iter_values(trips.iter().map(|t| t.2))),
        Arc::new(StringArray::from_iter_values(trips.iter().map(|t| t.3))),
        Arc::new(Int64Array::from_iter_values(trips.iter().map(|t| t.4))),
        Arc::new(Float64Array::from_iter_values(trips.iter().map(|t| t.5))),
        Arc::new(Float64Array::from_iter_values(trips.iter().map(|t| t.6))),
    ];
    write_parquet(path, &RecordBatch::try_new(schema, columns).unwrap());
    path.to_path_buf()
}

fn eight_column_file(path: &Path) -> PathBuf {
    let fields: Vec<Field> = (0..8)
        .map(|i| Field::new(format!("c{i}"), DataType::Int64, true))
        .collect();
    let columns: Vec<ArrayRef> = (0..8)
        .map(|_| Arc::new(Int64Array::from(vec![1])) as ArrayRef)
        .collect();
    let batch = RecordBatch::try_new(Arc::new(Schema::new(fields)), columns).unwrap();
    write_parquet(path, &batch);
    path.to_path_buf()
}

fn month_trips(n: usize) -> Vec<Trip<'static>> {
    const STATIONS: [&str; 4] = ["ST-1", "ST-2", "ST-3", "X"];
    (0..n)
        .map(|i| {
            (
                "20210105",
                (i as i64 % 24) * 100,
                STATIONS[i % 3],
                STATIONS[i % 4],
                (i % 3) as i64 + 1,
                10.0 + i as f64,
                1000.0 + i as f64,
            )
        })
        .collect()
}

#[test]
fn reader_yields_bounded_projected_batches() {
    let tmp = TempDir::new().unwrap();
    let path = full_file(&tmp.path().join("2021/m01.parquet"), &month_trips(10));

    let reader = BatchReader::open(&path, TIME_PROJECTION, 3).unwrap();
    assert_eq!(reader.plan().file_indices(), &[0, 2, 3, 7]);
    assert_eq!(reader.plan().batch_index(TripColumn::TripCount), Some(3));

    let batches: Vec<RecordBatch> = reader.map(|b| b.unwrap()).collect();
    assert_eq!(batches.len(), 4);
    assert!(batches.iter().all(|b| b.num_rows() <= 3 && b.num_columns() == 4));
    assert_eq!(batches.iter().map(|b| b.num_rows()).sum::<usize>(), 10);
}

#[test]
fn reader_rejects_unknown_layout() {
    let tmp = TempDir::new().unwrap();
    let path = eight_column_file(&tmp.path().join("odd.parquet"));
    let err = BatchReader::open(&path, TIME_PROJECTION, 100).unwrap_err();
    assert!(matches!(err, PipelineError::SchemaMismatch { found: 8, .. }));
}

#[test]
fn reader_missing_file_is_io_error() {
    let tmp = TempDir::new().unwrap();
    let err =
        BatchReader::open(&tmp.path().join("nope.parquet"), TIME_PROJECTION, 100)
            .unwrap_err();
    assert!(matches!(err, PipelineError::Io { .. }));
}

#[test]
fn two_monthly_files_sum_into_one_hour() {
    let tmp = TempDir::new().unwrap();
    let files = vec![
        full_file(
            &tmp.path().join("2021/m01.parquet"),
            &[("20210105", 800, "S1", "S2", 3, 10.0, 900.0)],
        ),
        compact_file(
            &tmp.path().join("2021/m02.parquet"),
            &[("20210105", 800, "S1", "S2", 2, 12.0, 1100.0)],
        ),
    ];

    let output = scan_files::<TimeFold>(&files, &ScanOptions::default()).unwrap();
    let key = DailyHourlyKey {
        year: 2021,
        month: 1,
        day: 5,
        hour: 8,
    };
    assert_eq!(output.fold.daily_hourly.get(&key), 5);
    assert_eq!(output.stats.files_scanned, 2);
    assert_eq!(output.stats.rows_read, 2);
}

#[test]
fn bad_files_are_skipped_and_counted() {
    let tmp = TempDir::new().unwrap();
    let good = full_file(&tmp.path().join("2021/a.parquet"), &month_trips(20));
    let odd = eight_column_file(&tmp.path().join("2021/b.parquet"));
    let corrupt = tmp.path().join("2021/c.parquet");
    fs::write(&corrupt, b"definitely not parquet").unwrap();
    let missing = tmp.path().join("2021/d.parquet");

    let files = vec![good.clone(), odd.clone(), corrupt.clone(), missing];
    let output = scan_files::<FlowFold>(&files, &ScanOptions::default()).unwrap();
    assert_eq!(output.stats.files_scanned, 1);
    assert_eq!(output.stats.files_skipped_schema, 1);
    assert_eq!(output.stats.files_skipped_io, 2);
    assert_eq!(output.stats.skipped_files.len(), 3);
    assert!(output.stats.skipped_files.contains(&odd));

    let only_good = scan_files::<FlowFold>(&[good], &ScanOptions::default()).unwrap();
    assert_eq!(output.fold, only_good.fold);
}

#[test]
fn parallel_scan_matches_sequential() {
    let tmp = TempDir::new().unwrap();
    let files: Vec<PathBuf> = (1..=6)
        .map(|m| {
            let path = tmp.path().join(format!("2021/m{m:02}.parquet"));
            if m % 2 == 0 {
                compact_file(&path, &month_trips(50 + m))
            } else {
                full_file(&path, &month_trips(50 + m))
            }
        })
        .collect();

    let sequential = ScanOptions {
        batch_rows: 7,
        workers: 1,
    };
    let parallel = ScanOptions {
        batch_rows: 16,
        workers: 3,
    };

    let a = scan_files::<FlowFold>(&files, &sequential).unwrap();
    let b = scan_files::<FlowFold>(&files, &parallel).unwrap();
    assert_eq!(a.fold, b.fold);
    assert_eq!(a.stats.rows_read, b.stats.rows_read);

    let a = scan_files::<TimeFold>(&files, &sequential).unwrap();
    let b = scan_files::<TimeFold>(&files, &parallel).unwrap();
    assert_eq!(a.fold, b.fold);

    let a = scan_files::<DistanceFold>(&files, &sequential).unwrap();
    let b = scan_files::<DistanceFold>(&files, &parallel).unwrap();
    assert_eq!(a.fold, b.fold, "partials combine in file order");
}

static LIVE_FOLDS: AtomicUsize = AtomicUsize::new(0);
static PEAK_FOLDS: AtomicUsize = AtomicUsize::new(0);

/// A time fold that tracks how many instances exist at once.
struct TrackedFold(TimeFold);

impl Default for TrackedFold {
    fn default() -> Self {
        let live = LIVE_FOLDS.fetch_add(1, Ordering::SeqCst) + 1;
        PEAK_FOLDS.fetch_max(live, Ordering::SeqCst);
        Self(TimeFold::default())
    }
}

impl Drop for TrackedFold {
    fn drop(&mut self) {
        LIVE_FOLDS.fetch_sub(1, Ordering::SeqCst);
    }
}

impl BatchFold for TrackedFold {
    const PROJECTION: Projection = TIME_PROJECTION;

    fn fold(&mut self, batch: &NormalizedBatch) -> bikemart_core::Result<()> {
        self.0.fold(batch)
    }

    fn combine(&mut self, mut other: Self) -> bikemart_core::Result<()> {
        self.0.combine(std::mem::take(&mut other.0))
    }
}

#[test]
fn sequential_scan_keeps_one_partial_alive() {
    let tmp = TempDir::new().unwrap();
    let files: Vec<PathBuf> = (1..=12)
        .map(|m| {
            full_file(
                &tmp.path().join(format!("2021/m{m:02}.parquet")),
                &[("20210105", 800, "S1", "S2", 1, 10.0, 900.0)],
            )
        })
        .collect();

    let output = scan_files::<TrackedFold>(&files, &ScanOptions::default()).unwrap();
    assert_eq!(output.stats.files_scanned, 12);
    let key = DailyHourlyKey {
        year: 2021,
        month: 1,
        day: 5,
        hour: 8,
    };
    assert_eq!(output.fold.0.daily_hourly.get(&key), 12);

    // the running result plus the file being read
    assert!(PEAK_FOLDS.load(Ordering::SeqCst) <= 2);
    drop(output);
    assert_eq!(LIVE_FOLDS.load(Ordering::SeqCst), 0);
}
