//! Route resolution: remote checkpoints with a local fallback.
//!
//! The declared route is authoritative. Remote checkpoint data only
//! contributes coordinates for cities it names; any remote failure is
//! absorbed by synthesizing the stops from the static city table.
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::geo::{CityTable, Coordinates, normalize_city};

/// Errors a checkpoint source can report. None of them reach callers of
/// [`RouteResolver::resolve`]; they only select the fallback reason.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CheckpointError {
    #[error("checkpoint source unavailable: {0}")]
    Unavailable(String),
    #[error("checkpoint source answered with status {0}")]
    Status(u16),
    #[error("malformed checkpoint payload: {0}")]
    Malformed(String),
}

/// A remote record of one stop along a journey.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Checkpoint {
    pub city: String,
    #[serde(default)]
    pub lat: Option<f64>,
    #[serde(default, alias = "lon")]
    pub lng: Option<f64>,
}

impl Checkpoint {
    #[must_use]
    pub fn named(city: impl Into<String>) -> Self {
        Self {
            city: city.into(),
            lat: None,
            lng: None,
        }
    }

    #[must_use]
    pub fn at(city: impl Into<String>, coordinates: Coordinates) -> Self {
        Self {
            city: city.into(),
            lat: Some(coordinates.lat),
            lng: Some(coordinates.lng),
        }
    }

    /// Remote coordinates, when both components are present and in range.
    #[must_use]
    pub fn coordinates(&self) -> Option<Coordinates> {
        let coords = Coordinates::new(self.lat?, self.lng?);
        coords.is_valid().then_some(coords)
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum CheckpointPayload {
    Bare(Vec<Checkpoint>),
    Wrapped { checkpoints: Vec<Checkpoint> },
}

/// Parse a checkpoint response body.
///
/// Accepts either a bare array or an object with a `checkpoints` array.
///
/// # Errors
///
/// Returns [`CheckpointError::Malformed`] if the body matches neither shape.
pub fn parse_checkpoints(body: &str) -> Result<Vec<Checkpoint>, CheckpointError> {
    match serde_json::from_str::<CheckpointPayload>(body) {
        Ok(CheckpointPayload::Bare(list) | CheckpointPayload::Wrapped { checkpoints: list }) => {
            Ok(list)
        }
        Err(err) => Err(CheckpointError::Malformed(err.to_string())),
    }
}

/// Where a resolved stop took its coordinates from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StopOrigin {
    Remote,
    Table,
    Default,
}

/// A geocoded stop ready for scheduling.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResolvedStop {
    pub city: String,
    pub coordinates: Coordinates,
    pub origin: StopOrigin,
}

impl ResolvedStop {
    fn from_table(city: &str, table: &CityTable) -> Self {
        let (coordinates, origin) = match table.get(city) {
            Some(coords) => (coords, StopOrigin::Table),
            None => (table.default_coordinates(), StopOrigin::Default),
        };
        Self {
            city: city.to_string(),
            coordinates,
            origin,
        }
    }
}

/// Build stops for `route` from the static table alone. Never fails.
#[must_use]
pub fn synthesize(route: &[String], table: &CityTable) -> Vec<ResolvedStop> {
    route
        .iter()
        .map(|city| ResolvedStop::from_table(city, table))
        .collect()
}

/// Merge remote checkpoints into `route`.
///
/// Returns `None` when the remote list is empty or any checkpoint lacks a
/// city, so the caller can fall back. Otherwise the result has exactly one
/// stop per route entry, named from the route; a stop uses remote
/// coordinates when a checkpoint for the same city carries valid ones.
#[must_use]
pub fn reconcile(
    route: &[String],
    checkpoints: &[Checkpoint],
    table: &CityTable,
) -> Option<Vec<ResolvedStop>> {
    if checkpoints.is_empty() || checkpoints.iter().any(|c| c.city.trim().is_empty()) {
        return None;
    }
    if checkpoints.len() != route.len() {
        log::debug!(
            target: crate::constants::LOG_TARGET_ROUTE,
            "remote reported {} checkpoints for a {}-stop route; keeping declared route",
            checkpoints.len(),
            route.len()
        );
    }

    let stops = route
        .iter()
        .map(|city| {
            let key = normalize_city(city);
            checkpoints
                .iter()
                .filter(|c| normalize_city(&c.city) == key)
                .find_map(Checkpoint::coordinates)
                .map_or_else(
                    || ResolvedStop::from_table(city, table),
                    |coordinates| ResolvedStop {
                        city: city.clone(),
                        coordinates,
                        origin: StopOrigin::Remote,
                    },
                )
        })
        .collect();
    Some(stops)
}

/// Why a resolution fell back to local synthesis.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "reason", content = "detail")]
pub enum FallbackReason {
    Error(String),
    Timeout,
    Empty,
    Malformed,
}

impl std::fmt::Display for FallbackReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Error(detail) => write!(f, "error: {detail}"),
            Self::Timeout => write!(f, "timed out"),
            Self::Empty => write!(f, "no checkpoints"),
            Self::Malformed => write!(f, "malformed checkpoints"),
        }
    }
}

/// Which path produced a set of stops.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResolutionSource {
    Remote,
    Fallback(FallbackReason),
}

/// Stops for a journey together with how they were obtained.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RouteResolution {
    pub stops: Vec<ResolvedStop>,
    pub source: ResolutionSource,
}

impl RouteResolution {
    #[must_use]
    pub fn fallback(route: &[String], table: &CityTable, reason: FallbackReason) -> Self {
        log::warn!(
            target: crate::constants::LOG_TARGET_ROUTE,
            "route lookup fell back to local synthesis ({reason})"
        );
        Self {
            stops: synthesize(route, table),
            source: ResolutionSource::Fallback(reason),
        }
    }

    #[must_use]
    pub const fn is_remote(&self) -> bool {
        matches!(self.source, ResolutionSource::Remote)
    }
}

#[cfg(feature = "async")]
pub use resolver::{CheckpointSource, OfflineSource, RouteResolver};

#[cfg(feature = "async")]
mod resolver {
    use async_trait::async_trait;
    use std::time::Duration;

    use super::{
        Checkpoint, CheckpointError, FallbackReason, ResolutionSource, RouteResolution, reconcile,
    };
    use crate::constants::{DEFAULT_REMOTE_TIMEOUT, LOG_TARGET_ROUTE};
    use crate::geo::CityTable;

    /// Remote provider of previously recorded checkpoints.
    #[async_trait]
    pub trait CheckpointSource: Send + Sync {
        /// Fetch checkpoints recorded for `journey_id`.
        ///
        /// # Errors
        ///
        /// Returns an error when the lookup cannot produce a checkpoint list.
        async fn fetch(&self, journey_id: &str) -> Result<Vec<Checkpoint>, CheckpointError>;
    }

    /// A source with no remote data; every lookup resolves locally.
    #[derive(Debug, Clone, Copy, Default)]
    pub struct OfflineSource;

    #[async_trait]
    impl CheckpointSource for OfflineSource {
        async fn fetch(&self, _journey_id: &str) -> Result<Vec<Checkpoint>, CheckpointError> {
            Ok(Vec::new())
        }
    }

    /// Resolves a journey's stops, bounded by a timeout.
    #[derive(Debug, Clone)]
    pub struct RouteResolver<S> {
        source: S,
        table: CityTable,
        timeout: Duration,
    }

    impl<S: CheckpointSource> RouteResolver<S> {
        /// Resolver over `source` using the bundled city table.
        #[must_use]
        pub fn new(source: S) -> Self {
            Self {
                source,
                table: CityTable::bundled().clone(),
                timeout: DEFAULT_REMOTE_TIMEOUT,
            }
        }

        #[must_use]
        pub fn with_table(mut self, table: CityTable) -> Self {
            self.table = table;
            self
        }

        #[must_use]
        pub const fn with_timeout(mut self, timeout: Duration) -> Self {
            self.timeout = timeout;
            self
        }

        #[must_use]
        pub const fn table(&self) -> &CityTable {
            &self.table
        }

        #[must_use]
        pub const fn timeout(&self) -> Duration {
            self.timeout
        }

        /// Resolve `route` for `journey_id`.
        ///
        /// Never fails: errors, timeouts, empty and malformed responses all
        /// yield stops synthesized from the city table.
        pub async fn resolve(&self, journey_id: &str, route: &[String]) -> RouteResolution {
            let fetched = tokio::time::timeout(self.timeout, self.source.fetch(journey_id)).await;
            let checkpoints = match fetched {
                Err(_) => {
                    return RouteResolution::fallback(route, &self.table, FallbackReason::Timeout);
                }
                Ok(Err(CheckpointError::Malformed(_))) => {
                    return RouteResolution::fallback(
                        route,
                        &self.table,
                        FallbackReason::Malformed,
                    );
                }
                Ok(Err(err)) => {
                    return RouteResolution::fallback(
                        route,
                        &self.table,
                        FallbackReason::Error(err.to_string()),
                    );
                }
                Ok(Ok(list)) if list.is_empty() => {
                    return RouteResolution::fallback(route, &self.table, FallbackReason::Empty);
                }
                Ok(Ok(list)) => list,
            };

            match reconcile(route, &checkpoints, &self.table) {
                Some(stops) => {
                    log::debug!(
                        target: LOG_TARGET_ROUTE,
                        "resolved {} stops for {journey_id} from remote checkpoints",
                        stops.len()
                    );
                    RouteResolution {
                        stops,
                        source: ResolutionSource::Remote,
                    }
                }
                None => RouteResolution::fallback(route, &self.table, FallbackReason::Malformed),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn route(cities: &[&str]) -> Vec<String> {
        cities.iter().map(ToString::to_string).collect()
    }

    #[test]
    fn synthesize_maps_every_city_with_default_for_unknowns() {
        let table = CityTable::bundled();
        let stops = synthesize(&route(&["Dhaka", "Nowhere", "Sylhet"]), table);
        assert_eq!(stops.len(), 3);
        assert_eq!(stops[0].origin, StopOrigin::Table);
        assert_eq!(stops[1].origin, StopOrigin::Default);
        assert_eq!(stops[1].coordinates, table.default_coordinates());
        assert_eq!(stops[2].city, "Sylhet");
    }

    #[test]
    fn reconcile_rejects_empty_and_blank_lists() {
        let table = CityTable::bundled();
        let declared = route(&["Dhaka", "Feni"]);
        assert!(reconcile(&declared, &[], table).is_none());
        let blank = [Checkpoint::named("Dhaka"), Checkpoint::named("  ")];
        assert!(reconcile(&declared, &blank, table).is_none());
    }

    #[test]
    fn reconcile_keeps_route_length_and_prefers_remote_coordinates() {
        let table = CityTable::bundled();
        let declared = route(&["Dhaka", "Comilla", "Feni"]);
        let remote = [
            Checkpoint::named("dhaka"),
            Checkpoint::at("FENI", Coordinates::new(23.0, 91.4)),
            Checkpoint::at("Khulna", Coordinates::new(22.8, 89.5)),
            Checkpoint::at("Comilla", Coordinates::new(123.0, 0.0)),
        ];
        let stops = reconcile(&declared, &remote, table).unwrap();
        let cities: Vec<&str> = stops.iter().map(|s| s.city.as_str()).collect();
        assert_eq!(cities, vec!["Dhaka", "Comilla", "Feni"]);
        assert_eq!(stops[0].origin, StopOrigin::Table);
        assert_eq!(stops[1].origin, StopOrigin::Table);
        assert_eq!(stops[2].origin, StopOrigin::Remote);
        assert_eq!(stops[2].coordinates, Coordinates::new(23.0, 91.4));
    }

    #[test]
    fn parse_accepts_bare_and_wrapped_payloads() {
        let bare = parse_checkpoints(r#"[{"city":"Dhaka","lat":23.8,"lon":90.4}]"#).unwrap();
        assert_eq!(bare[0].coordinates(), Some(Coordinates::new(23.8, 90.4)));
        let wrapped = parse_checkpoints(r#"{"checkpoints":[{"city":"Feni"}]}"#).unwrap();
        assert_eq!(wrapped, vec![Checkpoint::named("Feni")]);
        assert!(matches!(
            parse_checkpoints(r#"{"data": 1}"#),
            Err(CheckpointError::Malformed(_))
        ));
    }

    #[test]
    fn fallback_reason_serializes_with_tag() {
        let value = serde_json::to_value(ResolutionSource::Fallback(FallbackReason::Timeout)).unwrap();
        assert_eq!(value["fallback"]["reason"], "timeout");
    }
}
