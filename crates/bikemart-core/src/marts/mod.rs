// Mart tables
//
// Row types, their Arrow layouts, integer narrowing and mart file naming.

pub mod columns;
pub mod tables;
pub mod width;

pub use tables::{
    DailyHourlyRow, HourlyAverageRow, MartTable, MonthlyRow, RouteSummary, StationSummary,
    WeekdayStatsRow, YearlyDistanceRow,
};
pub use width::{downcast_integers, narrowest_signed, narrowest_unsigned};

/// Every mart the pipeline writes, with its file naming.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MartKind {
    DailyHourly(i32),
    Monthly(i32),
    StationSummary,
    RouteSummary,
    DistanceTime(i32),
    DistanceSummary,
    DistanceWeekday,
}

impl MartKind {
    pub fn file_stem(&self) -> String {
        match self {
            MartKind::DailyHourly(year) => format!("summary_daily_hourly_{year}"),
            MartKind::Monthly(year) => format!("summary_monthly_{year}"),
            MartKind::StationSummary => "station_summary".to_string(),
            MartKind::RouteSummary => "route_summary".to_string(),
            MartKind::DistanceTime(year) => format!("distance_time_{year}"),
            MartKind::DistanceSummary => "distance_time_summary".to_string(),
            MartKind::DistanceWeekday => "distance_time_weekday".to_string(),
        }
    }

    pub fn file_name(&self) -> String {
        format!("{}.parquet", self.file_stem())
    }
}

/// Detailed distance/time summary document written next to the marts.
pub const DISTANCE_SUMMARY_JSON: &str = "distance_time_summary.json";
