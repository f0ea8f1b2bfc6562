//! Column name constants for trip inputs, the station master and the marts.
//!
//! Source trip files use the Korean headers of the public bike-share export.
//! Mart files use snake_case English names so downstream readers never have to
//! deal with the source naming.

/// Column names of the raw monthly trip files.
pub mod source {
    /// Encoded date, `YYYYMMDD`
    pub const BASE_DATE: &str = "기준_날짜";
    /// Aggregation basis marker (full shape only)
    pub const AGGREGATION_BASIS: &str = "집계_기준";
    /// Encoded time bucket, `HHMM` in steps of 100
    pub const TIME_BUCKET: &str = "기준_시간대";
    pub const START_STATION_ID: &str = "시작_대여소_ID";
    /// Start station display name (full shape only)
    pub const START_STATION_NAME: &str = "시작_대여소명";
    pub const END_STATION_ID: &str = "종료_대여소_ID";
    /// End station display name (full shape only)
    pub const END_STATION_NAME: &str = "종료_대여소명";
    pub const TRIP_COUNT: &str = "전체_건수";
    pub const DURATION_MINUTES: &str = "전체_이용_분";
    pub const DISTANCE_METERS: &str = "전체_이용_거리";
}

/// Column names of the station master CSV.
///
/// English headers are canonical; the Korean headers of the public
/// data portal export are accepted as aliases.
pub mod master {
    pub const STATION_ID: &str = "station_id";
    pub const STATION_ID_ALIAS: &str = "대여소_ID";
    pub const ADDRESS1: &str = "address_line_1";
    pub const ADDRESS1_ALIAS: &str = "주소1";
    pub const ADDRESS2: &str = "address_line_2";
    pub const ADDRESS2_ALIAS: &str = "주소2";
    pub const LATITUDE: &str = "latitude";
    pub const LATITUDE_ALIAS: &str = "위도";
    pub const LONGITUDE: &str = "longitude";
    pub const LONGITUDE_ALIAS: &str = "경도";
}

/// Column names of the written marts.
pub mod mart {
    pub const YEAR: &str = "year";
    pub const MONTH: &str = "month";
    pub const DAY: &str = "day";
    pub const HOUR: &str = "hour";
    pub const WEEKDAY: &str = "weekday";
    pub const TOTAL_RENTALS: &str = "total_rentals";

    pub const STATION_ID: &str = "station_id";
    pub const ADDRESS1: &str = "address1";
    pub const ADDRESS2: &str = "address2";
    pub const LATITUDE: &str = "latitude";
    pub const LONGITUDE: &str = "longitude";
    pub const TOTAL_RETURNS: &str = "total_returns";
    pub const TOTAL_USAGE: &str = "total_usage";
    pub const NET_FLOW: &str = "net_flow";

    pub const START_STATION_ID: &str = "start_station_id";
    pub const END_STATION_ID: &str = "end_station_id";
    pub const USAGE_COUNT: &str = "usage_count";
    pub const TRIP_TYPE: &str = "trip_type";
    pub const START_ADDRESS1: &str = "start_address1";
    pub const START_ADDRESS2: &str = "start_address2";
    pub const START_LATITUDE: &str = "start_latitude";
    pub const START_LONGITUDE: &str = "start_longitude";
    pub const END_ADDRESS1: &str = "end_address1";
    pub const END_ADDRESS2: &str = "end_address2";
    pub const END_LATITUDE: &str = "end_latitude";
    pub const END_LONGITUDE: &str = "end_longitude";

    pub const DURATION_MINUTES: &str = "duration_minutes";
    pub const DISTANCE_METERS: &str = "distance_meters";
    pub const TOTAL_RECORDS: &str = "total_records";
    pub const AVG_TIME: &str = "avg_time";
    pub const AVG_DISTANCE: &str = "avg_distance";
    pub const MEDIAN_TIME: &str = "median_time";
    pub const MEDIAN_DISTANCE: &str = "median_distance";
    pub const STD_TIME: &str = "std_time";
    pub const STD_DISTANCE: &str = "std_distance";
    pub const MIN_TIME: &str = "min_time";
    pub const MAX_TIME: &str = "max_time";
    pub const MIN_DISTANCE: &str = "min_distance";
    pub const MAX_DISTANCE: &str = "max_distance";
}
