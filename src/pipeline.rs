// Pipeline orchestration
//
// One run builds some or all mart families from the configured years:
// - time marts, one pair of files per year
// - station and route marts over all years, joined with the station master
// - distance/time marts, one cleaned file per year plus cross-year summaries
//
// Each family streams its files through a fold, writes its marts only after
// the fold is complete, and returns a RunReport of everything it skipped.

use anyhow::{Context, Result};
use bikemart_batch::{
    discover_files, discover_year_files, load_station_master, scan_files, ScanOptions,
};
use bikemart_config::BikemartConfig;
use bikemart_core::distance::yearly_stats;
use bikemart_core::marts::{
    DailyHourlyRow, MonthlyRow, WeekdayStatsRow, YearlyDistanceRow, DISTANCE_SUMMARY_JSON,
};
use bikemart_core::{
    join_routes, join_stations, DistanceFold, FlowFold, MartKind, RunReport, TimeFold,
    YearlyDistanceStats,
};
use bikemart_writer::{set_parquet_row_group_size, MartWriter};
use std::collections::BTreeMap;
use tracing::{info, warn};

/// A configured mart build.
#[derive(Debug)]
pub struct Pipeline {
    config: BikemartConfig,
    writer: MartWriter,
    options: ScanOptions,
}

impl Pipeline {
    /// Prepare a run. The config is expected to be validated.
    pub fn new(config: BikemartConfig) -> Result<Self> {
        set_parquet_row_group_size(config.output.row_group_size);
        let writer = MartWriter::new(&config.output.dir).with_context(|| {
            format!(
                "Failed to prepare output directory {}",
                config.output.dir.display()
            )
        })?;
        let options = ScanOptions {
            batch_rows: config.batch.rows,
            workers: config.parallel.workers,
        };
        Ok(Self {
            config,
            writer,
            options,
        })
    }

    pub fn config(&self) -> &BikemartConfig {
        &self.config
    }

    fn years(&self) -> Vec<i32> {
        self.config.years.years()
    }

    /// `summary_daily_hourly_<year>` and `summary_monthly_<year>` for every
    /// configured year. A year without input still gets empty marts.
    pub fn build_time_marts(&self) -> Result<RunReport> {
        let mut report = RunReport::default();

        for year in self.years() {
            let found = discover_year_files(&self.config.input.base_dir, year);
            let files = found.files;
            let output = scan_files::<TimeFold>(&files, &self.options)
                .with_context(|| format!("Failed to aggregate {year}"))?;

            let daily = DailyHourlyRow::from_accumulator(&output.fold.daily_hourly);
            let monthly = MonthlyRow::from_accumulator(&output.fold.monthly);
            if daily.is_empty() {
                warn!(year, "no trips aggregated, writing empty time marts");
            }

            report
                .marts
                .push(self.writer.write(MartKind::DailyHourly(year), &daily)?);
            report
                .marts
                .push(self.writer.write(MartKind::Monthly(year), &monthly)?);
            report.scan.add(&found.stats);
            report.scan.add(&output.stats);
            report.excluded_start += output.fold.excluded_start;

            info!(
                year,
                files = files.len(),
                daily_rows = daily.len(),
                monthly_rows = monthly.len(),
                "built time marts"
            );
        }

        Ok(report)
    }

    /// `station_summary` and `route_summary` across all configured years.
    pub fn build_flow_marts(&self) -> Result<RunReport> {
        let master_path = &self.config.input.station_master;
        let master = load_station_master(master_path).with_context(|| {
            format!("Failed to load station master {}", master_path.display())
        })?;

        let found = discover_files(&self.config.input.base_dir, self.years());
        let output = scan_files::<FlowFold>(&found.files, &self.options)
            .context("Failed to aggregate station flows")?;
        let fold = output.fold;
        let mut scan = found.stats;
        scan.add(&output.stats);

        let stations = join_stations(&fold.rentals, &fold.returns, &master)
            .context("Failed to join stations")?;
        let routes = join_routes(&fold.routes, &master);
        if stations.misses > 0 || routes.misses > 0 {
            warn!(
                station_misses = stations.misses,
                route_misses = routes.misses,
                "station ids missing from master were excluded"
            );
        }

        let mut report = RunReport {
            scan,
            excluded_start: fold.excluded_start,
            no_return: fold.no_return,
            station_join_misses: stations.misses,
            route_join_misses: routes.misses,
            master_duplicates: master.duplicates(),
            master_no_coordinates: master.no_coordinates(),
            ..RunReport::default()
        };
        report
            .marts
            .push(self.writer.write(MartKind::StationSummary, &stations.rows)?);
        report
            .marts
            .push(self.writer.write(MartKind::RouteSummary, &routes.rows)?);

        info!(
            stations = stations.rows.len(),
            routes = routes.rows.len(),
            "built flow marts"
        );
        Ok(report)
    }

    /// `distance_time_<year>` per year, then the yearly summary, the weekday
    /// table and the detailed JSON document over all years that had data.
    pub fn build_distance_marts(&self) -> Result<RunReport> {
        let mut report = RunReport::default();
        let mut summaries: BTreeMap<i32, YearlyDistanceStats> = BTreeMap::new();

        for year in self.years() {
            let found = discover_year_files(&self.config.input.base_dir, year);
            let output = scan_files::<DistanceFold>(&found.files, &self.options)
                .with_context(|| format!("Failed to collect trip metrics for {year}"))?;
            let (rows, drops) = output.fold.finish();

            report
                .marts
                .push(self.writer.write(MartKind::DistanceTime(year), &rows)?);
            report.scan.add(&found.stats);
            report.scan.add(&output.stats);
            report.distance_drops.add(&drops);

            info!(
                year,
                rows = rows.len(),
                null_metric = drops.null_metric,
                out_of_domain = drops.out_of_domain,
                iqr_outlier = drops.iqr_outlier,
                "cleaned trip metrics"
            );
            match yearly_stats(year, &rows, drops) {
                Some(stats) => {
                    summaries.insert(year, stats);
                }
                None => warn!(year, "no trip metrics survived cleaning"),
            }
        }

        let summary_rows: Vec<YearlyDistanceRow> =
            summaries.values().map(YearlyDistanceRow::from).collect();
        let weekday_rows: Vec<WeekdayStatsRow> = summaries
            .values()
            .flat_map(WeekdayStatsRow::from_stats)
            .collect();

        report
            .marts
            .push(self.writer.write(MartKind::DistanceSummary, &summary_rows)?);
        report
            .marts
            .push(self.writer.write(MartKind::DistanceWeekday, &weekday_rows)?);
        self.writer
            .write_json(DISTANCE_SUMMARY_JSON, &summaries)
            .context("Failed to write distance summary document")?;

        Ok(report)
    }

    /// Every mart family, in order.
    pub fn build_all(&self) -> Result<RunReport> {
        let mut report = self.build_time_marts()?;
        report.merge(self.build_flow_marts()?);
        report.merge(self.build_distance_marts()?);
        Ok(report)
    }
}

/// Log the audit counters of a finished run.
pub fn log_report(report: &RunReport) {
    info!(
        dirs_skipped_io = report.scan.dirs_skipped_io,
        files_scanned = report.scan.files_scanned,
        files_skipped_io = report.scan.files_skipped_io,
        files_skipped_schema = report.scan.files_skipped_schema,
        rows_read = report.scan.rows_read,
        rows_rejected = report.rows_rejected(),
        excluded_start = report.excluded_start,
        no_return = report.no_return,
        station_join_misses = report.station_join_misses,
        route_join_misses = report.route_join_misses,
        master_duplicates = report.master_duplicates,
        master_no_coordinates = report.master_no_coordinates,
        distance_drops = report.distance_drops.total(),
        marts = report.marts.len(),
        "run complete"
    );
}
