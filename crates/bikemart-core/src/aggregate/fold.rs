// Batch folds
//
// A fold owns every accumulator one pipeline stage needs and updates all of
// them from the same batch, so each file is read once per stage. Folds are
// partial results: the scan driver may build one per file on separate
// workers and combine them afterwards in any order.

use super::accumulator::Accumulator;
use super::keys::{DailyHourlyKey, MonthlyKey, RouteKey, StationKey};
use crate::error::Result;
use crate::normalize::NormalizedBatch;
use crate::schema::{Projection, FLOW_PROJECTION, TIME_PROJECTION};

/// Incremental state driven by a stream of normalized batches.
pub trait BatchFold: Default + Send {
    /// Columns the fold reads from every file.
    const PROJECTION: Projection;

    /// Fold one normalized batch into the running state.
    fn fold(&mut self, batch: &NormalizedBatch) -> Result<()>;

    /// Merge a partial state produced from a disjoint set of batches.
    fn combine(&mut self, other: Self) -> Result<()>;
}

/// Daily-hourly and monthly rental totals of one year.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimeFold {
    pub daily_hourly: Accumulator<DailyHourlyKey>,
    pub monthly: Accumulator<MonthlyKey>,
    /// Rows whose start id was missing or the maintenance sentinel
    pub excluded_start: u64,
}

impl Default for TimeFold {
    fn default() -> Self {
        Self {
            daily_hourly: Accumulator::new("daily_hourly"),
            monthly: Accumulator::new("monthly"),
            excluded_start: 0,
        }
    }
}

impl BatchFold for TimeFold {
    const PROJECTION: Projection = TIME_PROJECTION;

    fn fold(&mut self, batch: &NormalizedBatch) -> Result<()> {
        let records = &batch.records;
        self.excluded_start += records
            .iter()
            .filter(|r| r.rental_station().is_none())
            .count() as u64;

        self.daily_hourly.merge(
            records,
            |r| {
                r.rental_station()?;
                Some(DailyHourlyKey::new(r.calendar?, r.hour?))
            },
            |r| r.trip_count,
        )?;
        self.monthly.merge(
            records,
            |r| {
                r.rental_station()?;
                r.calendar.map(|c| MonthlyKey {
                    year: c.year,
                    month: c.month,
                })
            },
            |r| r.trip_count,
        )?;
        Ok(())
    }

    fn combine(&mut self, other: Self) -> Result<()> {
        self.daily_hourly.combine(other.daily_hourly)?;
        self.monthly.combine(other.monthly)?;
        self.excluded_start += other.excluded_start;
        Ok(())
    }
}

/// Rentals and returns per station plus usage per route, across all years.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlowFold {
    pub rentals: Accumulator<StationKey>,
    pub returns: Accumulator<StationKey>,
    pub routes: Accumulator<RouteKey>,
    /// Rows whose start id was missing or the maintenance sentinel
    pub excluded_start: u64,
    /// Rentals with no completed return
    pub no_return: u64,
}

impl Default for FlowFold {
    fn default() -> Self {
        Self {
            rentals: Accumulator::new("rentals"),
            returns: Accumulator::new("returns"),
            routes: Accumulator::new("routes"),
            excluded_start: 0,
            no_return: 0,
        }
    }
}

impl BatchFold for FlowFold {
    const PROJECTION: Projection = FLOW_PROJECTION;

    fn fold(&mut self, batch: &NormalizedBatch) -> Result<()> {
        let records = &batch.records;
        for record in records {
            match (record.rental_station(), record.return_station()) {
                (None, _) => self.excluded_start += 1,
                (Some(_), None) => self.no_return += 1,
                _ => {}
            }
        }

        self.rentals.merge(
            records,
            |r| r.rental_station().map(str::to_string),
            |r| r.trip_count,
        )?;
        self.returns.merge(
            records,
            |r| r.return_station().map(str::to_string),
            |r| r.trip_count,
        )?;
        self.routes.merge(
            records,
            |r| r.route().map(|(start, end)| RouteKey::new(start, end)),
            |r| r.trip_count,
        )?;
        Ok(())
    }

    fn combine(&mut self, other: Self) -> Result<()> {
        self.rentals.combine(other.rentals)?;
        self.returns.combine(other.returns)?;
        self.routes.combine(other.routes)?;
        self.excluded_start += other.excluded_start;
        self.no_return += other.no_return;
        Ok(())
    }
}
