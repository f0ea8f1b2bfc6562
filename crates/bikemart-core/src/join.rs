// Reference join against the station master
//
// Inner join: accumulator keys without a master entry are dropped and
// counted, never reported as errors. Both sides go through
// `normalize_station_id`, so ids that differ only by surrounding whitespace
// still match.

use crate::aggregate::{Accumulator, RouteKey, StationKey};
use crate::error::{PipelineError, Result};
use crate::marts::{RouteSummary, StationSummary};
use crate::normalize::normalize_station_id;
use crate::records::TripType;
use serde::Serialize;
use std::collections::{BTreeSet, HashMap};
use tracing::debug;

/// Attributes of one station in the master table.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StationInfo {
    pub address1: String,
    pub address2: Option<String>,
    pub latitude: f64,
    pub longitude: f64,
}

/// Station master keyed by trimmed station id. Read-only once loaded.
#[derive(Debug, Clone, Default)]
pub struct StationMaster {
    stations: HashMap<String, StationInfo>,
    duplicates: u64,
    blank_ids: u64,
    no_coordinates: u64,
}

impl StationMaster {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a master row; the first occurrence of an id wins.
    ///
    /// Returns `false` when the row was ignored, either as a duplicate or
    /// because its id is blank.
    pub fn insert(&mut self, raw_id: &str, info: StationInfo) -> bool {
        let Some(id) = normalize_station_id(raw_id) else {
            self.blank_ids += 1;
            return false;
        };
        if self.stations.contains_key(&id) {
            self.duplicates += 1;
            return false;
        }
        self.stations.insert(id, info);
        true
    }

    pub fn get(&self, id: &str) -> Option<&StationInfo> {
        self.stations.get(id.trim())
    }

    pub fn len(&self) -> usize {
        self.stations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stations.is_empty()
    }

    /// Rows skipped because their id was already present.
    pub fn duplicates(&self) -> u64 {
        self.duplicates
    }

    /// Rows skipped because their id was blank.
    pub fn blank_ids(&self) -> u64 {
        self.blank_ids
    }

    /// Record a master row dropped for lacking usable coordinates.
    pub fn skip_without_coordinates(&mut self) {
        self.no_coordinates += 1;
    }

    /// Rows skipped because latitude or longitude was missing or invalid.
    pub fn no_coordinates(&self) -> u64 {
        self.no_coordinates
    }
}

/// Joined rows plus the number of accumulator keys with no master entry.
#[derive(Debug, Clone, PartialEq)]
pub struct Joined<T> {
    pub rows: Vec<T>,
    pub misses: u64,
}

/// One row per station seen as a rental or return origin that is also in
/// the master, in station id order.
pub fn join_stations(
    rentals: &Accumulator<StationKey>,
    returns: &Accumulator<StationKey>,
    master: &StationMaster,
) -> Result<Joined<StationSummary>> {
    let ids: BTreeSet<&StationKey> = rentals.keys().chain(returns.keys()).collect();
    let mut rows = Vec::with_capacity(ids.len());
    let mut misses = 0;

    for id in ids {
        let Some(info) = master.get(id) else {
            misses += 1;
            continue;
        };
        let total_rentals = rentals.get(id);
        let total_returns = returns.get(id);
        let total_usage = total_rentals
            .checked_add(total_returns)
            .ok_or_else(|| PipelineError::overflow("total_usage"))?;
        let net_flow = i64::try_from(i128::from(total_rentals) - i128::from(total_returns))
            .map_err(|_| PipelineError::overflow("net_flow"))?;

        rows.push(StationSummary {
            station_id: id.clone(),
            info: info.clone(),
            total_rentals,
            total_returns,
            total_usage,
            net_flow,
        });
    }

    debug!(rows = rows.len(), misses, "joined stations against master");
    Ok(Joined { rows, misses })
}

/// One row per route whose both endpoints are in the master, in
/// `(start, end)` order.
pub fn join_routes(routes: &Accumulator<RouteKey>, master: &StationMaster) -> Joined<RouteSummary> {
    let mut rows = Vec::with_capacity(routes.len());
    let mut misses = 0;

    for (key, usage_count) in routes.iter() {
        let (Some(start), Some(end)) = (master.get(&key.start), master.get(&key.end)) else {
            misses += 1;
            continue;
        };
        rows.push(RouteSummary {
            start_station_id: key.start.clone(),
            end_station_id: key.end.clone(),
            usage_count,
            trip_type: TripType::of(&key.start, &key.end),
            start: start.clone(),
            end: end.clone(),
        });
    }

    debug!(rows = rows.len(), misses, "joined routes against master");
    Joined { rows, misses }
}
