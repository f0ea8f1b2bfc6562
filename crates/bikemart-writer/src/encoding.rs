use parquet::basic::{Compression, ZstdLevel};
use parquet::file::properties::{EnabledStatistics, WriterProperties};
use parquet::format::KeyValue;
use std::sync::OnceLock;

const DEFAULT_ROW_GROUP_SIZE: usize = 32 * 1024;
static ROW_GROUP_SIZE: OnceLock<usize> = OnceLock::new();

/// Configure the global Parquet row group size used by mart writers.
///
/// Must be called before the first mart is written. Subsequent calls
/// are ignored to preserve the existing writer properties cache.
pub fn set_parquet_row_group_size(row_group_size: usize) {
    if row_group_size == 0 {
        return;
    }

    let _ = ROW_GROUP_SIZE.set(row_group_size);
}

fn configured_row_group_size() -> usize {
    ROW_GROUP_SIZE
        .get()
        .copied()
        .unwrap_or(DEFAULT_ROW_GROUP_SIZE)
}

fn compression_setting() -> Compression {
    let level = ZstdLevel::try_new(2).unwrap_or_default();
    Compression::ZSTD(level)
}

/// Get shared writer properties (cached)
///
/// Marts are small and read whole by the dashboard, so:
/// - ZSTD compression
/// - Dictionary encoding enabled (station ids and addresses repeat)
/// - 32k rows per group by default (configurable)
/// - Writer version embedded in file metadata
pub(crate) fn writer_properties() -> &'static WriterProperties {
    static PROPERTIES: OnceLock<WriterProperties> = OnceLock::new();
    PROPERTIES.get_or_init(|| {
        let metadata = vec![KeyValue {
            key: "bikemart.version".to_string(),
            value: Some(env!("CARGO_PKG_VERSION").to_string()),
        }];

        WriterProperties::builder()
            .set_dictionary_enabled(true)
            .set_statistics_enabled(EnabledStatistics::Page)
            .set_compression(compression_setting())
            .set_data_page_size_limit(256 * 1024)
            .set_write_batch_size(32 * 1024)
            .set_max_row_group_size(configured_row_group_size())
            .set_dictionary_page_size_limit(128 * 1024)
            .set_key_value_metadata(Some(metadata))
            .build()
    })
}
