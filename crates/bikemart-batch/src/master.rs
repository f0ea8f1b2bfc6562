// Station master loader
//
// Reads the delimited master table once. English headers are canonical and
// the Korean headers of the public data portal export are accepted as aliases.
// That export is CP949 encoded, so files that are not UTF-8 are decoded as
// CP949 before parsing.

use bikemart_core::{PipelineError, Result, StationInfo, StationMaster};
use encoding_rs::{EUC_KR, UTF_8};
use serde::Deserialize;
use std::borrow::Cow;
use std::fs;
use std::io;
use std::path::Path;
use tracing::{debug, info, warn};

#[derive(Debug, Deserialize)]
struct MasterRow {
    #[serde(alias = "대여소_ID")]
    station_id: String,
    #[serde(alias = "주소1", default)]
    address_line_1: Option<String>,
    #[serde(alias = "주소2", default)]
    address_line_2: Option<String>,
    #[serde(alias = "위도", default, deserialize_with = "csv::invalid_option")]
    latitude: Option<f64>,
    #[serde(alias = "경도", default, deserialize_with = "csv::invalid_option")]
    longitude: Option<f64>,
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn csv_error(path: &Path, err: csv::Error) -> PipelineError {
    PipelineError::io(path, io::Error::new(io::ErrorKind::InvalidData, err))
}

/// UTF-8, with or without a BOM, or CP949 (WHATWG `EUC-KR`).
fn decode_master<'a>(path: &Path, bytes: &'a [u8]) -> Result<Cow<'a, str>> {
    let (text, had_errors) = UTF_8.decode_with_bom_removal(bytes);
    if !had_errors {
        return Ok(text);
    }

    let (text, _, had_errors) = EUC_KR.decode(bytes);
    if had_errors {
        return Err(PipelineError::io(
            path,
            io::Error::new(
                io::ErrorKind::InvalidData,
                "station master is neither UTF-8 nor CP949",
            ),
        ));
    }
    debug!(path = %path.display(), "decoded station master as CP949");
    Ok(text)
}

/// Load the station master from `path`.
///
/// Rows without usable coordinates are skipped and counted; duplicate ids
/// keep their first occurrence.
pub fn load_station_master(path: &Path) -> Result<StationMaster> {
    let bytes = fs::read(path).map_err(|e| PipelineError::io(path, e))?;
    let text = decode_master(path, &bytes)?;
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::Headers)
        .flexible(true)
        .from_reader(text.as_bytes());

    let mut master = StationMaster::new();
    let mut rows = 0u64;

    for result in reader.deserialize::<MasterRow>() {
        let row = result.map_err(|e| csv_error(path, e))?;
        rows += 1;

        let (Some(latitude), Some(longitude)) = (row.latitude, row.longitude) else {
            master.skip_without_coordinates();
            continue;
        };
        master.insert(
            &row.station_id,
            StationInfo {
                address1: non_blank(row.address_line_1).unwrap_or_default(),
                address2: non_blank(row.address_line_2),
                latitude,
                longitude,
            },
        );
    }

    if master.duplicates() > 0 {
        warn!(
            duplicates = master.duplicates(),
            "duplicate station ids in master, keeping first occurrence"
        );
    }
    if master.no_coordinates() > 0 || master.blank_ids() > 0 {
        warn!(
            no_coordinates = master.no_coordinates(),
            blank_ids = master.blank_ids(),
            "skipped unusable station master rows"
        );
    }
    info!(
        path = %path.display(),
        rows,
        stations = master.len(),
        "loaded station master"
    );
    Ok(master)
}

#[cfg(test)]
mod tests {
    use super::*;
    use bikemart_core::field_names::master as columns;
    use std::fs;
    use tempfile::TempDir;

    fn write_csv(dir: &TempDir, content: &str) -> std::path::PathBuf {
        let path = dir.path().join("master.csv");
        fs::write(&path, content).unwrap();
        path
    }

    #[test]
    fn test_english_headers() {
        let tmp = TempDir::new().unwrap();
        let header = [
            columns::STATION_ID,
            columns::ADDRESS1,
            columns::ADDRESS2,
            columns::LATITUDE,
            columns::LONGITUDE,
        ]
        .join(",");
        let path = write_csv(
            &tmp,
            &format!("{header}\n ST-1 ,Mapo-gu 1,,37.55,126.91\nST-2,Jung-gu 9,2F,37.56,126.97\n"),
        );

        let master = load_station_master(&path).unwrap();
        assert_eq!(master.len(), 2);
        let st1 = master.get("ST-1").unwrap();
        assert_eq!(st1.address1, "Mapo-gu 1");
        assert_eq!(st1.address2, None);
        assert_eq!(master.get("ST-2").unwrap().address2.as_deref(), Some("2F"));
    }

    #[test]
    fn test_korean_headers_and_bad_rows() {
        let tmp = TempDir::new().unwrap();
        let header = [
            columns::STATION_ID_ALIAS,
            columns::ADDRESS1_ALIAS,
            columns::ADDRESS2_ALIAS,
            columns::LATITUDE_ALIAS,
            columns::LONGITUDE_ALIAS,
        ]
        .join(",");
        let path = write_csv(
            &tmp,
            &format!(
                "{header}\n\
                 ST-1,A,,37.5,127.0\n\
                 ST-1,duplicate,,37.0,127.0\n\
                 ST-2,B,,not-a-number,127.0\n\
                 ST-3,C,,,\n\
                 ST-4,D,,37.6,127.1\n"
            ),
        );

        let master = load_station_master(&path).unwrap();
        assert_eq!(master.len(), 2);
        assert_eq!(master.duplicates(), 1);
        assert_eq!(master.get("ST-1").unwrap().address1, "A");
        assert!(master.get("ST-2").is_none());
        assert!(master.get("ST-3").is_none());
        assert_eq!(master.no_coordinates(), 2);
    }

    #[test]
    fn test_cp949_export() {
        let tmp = TempDir::new().unwrap();
        let header = [
            columns::STATION_ID_ALIAS,
            columns::ADDRESS1_ALIAS,
            columns::ADDRESS2_ALIAS,
            columns::LATITUDE_ALIAS,
            columns::LONGITUDE_ALIAS,
        ]
        .join(",");
        let content = format!("{header}\nST-1,서울특별시 마포구,망원동,37.55,126.91\n");
        let (encoded, _, unmappable) = EUC_KR.encode(&content);
        assert!(!unmappable);
        assert!(std::str::from_utf8(&encoded).is_err());

        let path = tmp.path().join("master.csv");
        fs::write(&path, &encoded).unwrap();

        let master = load_station_master(&path).unwrap();
        let st1 = master.get("ST-1").unwrap();
        assert_eq!(st1.address1, "서울특별시 마포구");
        assert_eq!(st1.address2.as_deref(), Some("망원동"));
    }

    #[test]
    fn test_utf8_bom_header() {
        let tmp = TempDir::new().unwrap();
        let path = write_csv(
            &tmp,
            "\u{feff}station_id,address_line_1,address_line_2,latitude,longitude\nST-1,A,,37.5,127.0\n",
        );
        let master = load_station_master(&path).unwrap();
        assert_eq!(master.len(), 1);
    }

    #[test]
    fn test_undecodable_bytes_are_io_error() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("master.csv");
        fs::write(&path, b"station_id,latitude\n\xff\xfe\xff,1.0\n").unwrap();
        let err = load_station_master(&path).unwrap_err();
        assert_eq!(err.code().as_str(), "E101");
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let tmp = TempDir::new().unwrap();
        let err = load_station_master(&tmp.path().join("absent.csv")).unwrap_err();
        assert_eq!(err.code().as_str(), "E101");
    }
}
