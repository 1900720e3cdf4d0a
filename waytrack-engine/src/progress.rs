//! Live progress computation over a resolved route.
//!
//! Everything here is a pure function of the journey timing, the resolved
//! stops and an evaluation instant. The overall percentage is derived from
//! departure and arrival directly; waypoint statuses come from an even
//! division of the same span, so both move forward together as time passes.
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::constants::{PERCENT_MAX, PERCENT_MIN, READY_THRESHOLD_PCT};
use crate::geo::{Coordinates, haversine_km};
use crate::journey::Journey;
use crate::numbers::{even_share, i64_to_f64, ratio_to_percent};
use crate::route::ResolvedStop;

/// Position of a waypoint relative to the evaluation time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WaypointStatus {
    Completed,
    Current,
    Upcoming,
}

impl std::fmt::Display for WaypointStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Completed => write!(f, "completed"),
            Self::Current => write!(f, "current"),
            Self::Upcoming => write!(f, "upcoming"),
        }
    }
}

/// One scheduled stop along the route.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Waypoint {
    pub city: String,
    pub coordinates: Coordinates,
    pub scheduled_time: DateTime<Utc>,
    pub status: WaypointStatus,
}

/// Tunables for snapshot evaluation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressConfig {
    /// Percentage at or above which completion becomes available.
    #[serde(default = "ProgressConfig::default_ready_threshold")]
    pub ready_threshold: u8,
}

impl Default for ProgressConfig {
    fn default() -> Self {
        Self {
            ready_threshold: Self::default_ready_threshold(),
        }
    }
}

impl ProgressConfig {
    const fn default_ready_threshold() -> u8 {
        READY_THRESHOLD_PCT
    }
}

/// Engine output for a single evaluation instant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressSnapshot {
    pub journey_id: String,
    pub evaluated_at: DateTime<Utc>,
    pub percentage: u8,
    pub waypoints: Vec<Waypoint>,
    pub ready_to_complete: bool,
    /// Index into `waypoints` of the stop currently being approached.
    pub current_index: Option<usize>,
    pub elapsed_secs: i64,
    pub remaining_secs: i64,
    /// Straight-line length of the resolved route.
    pub distance_km: f64,
}

impl ProgressSnapshot {
    #[must_use]
    pub fn current(&self) -> Option<&Waypoint> {
        self.current_index.and_then(|idx| self.waypoints.get(idx))
    }

    #[must_use]
    pub fn count(&self, status: WaypointStatus) -> usize {
        self.waypoints.iter().filter(|w| w.status == status).count()
    }

    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.percentage == PERCENT_MAX
    }

    #[must_use]
    pub fn has_started(&self) -> bool {
        self.waypoints
            .iter()
            .any(|w| w.status != WaypointStatus::Upcoming)
    }
}

/// Whole-number completion of the span `departure..arrival` at `now`.
///
/// Returns 0 before departure and 100 only once `now` is strictly past
/// arrival. Inside the span the rounded value is capped at 99 so a reported
/// 100 always coincides with every waypoint being completed. A non-positive
/// span counts as already complete.
#[must_use]
pub fn percentage(departure: DateTime<Utc>, arrival: DateTime<Utc>, now: DateTime<Utc>) -> u8 {
    if arrival <= departure {
        return PERCENT_MAX;
    }
    if now < departure {
        return PERCENT_MIN;
    }
    if now > arrival {
        return PERCENT_MAX;
    }
    let total = (arrival - departure).num_milliseconds().max(1);
    let elapsed = (now - departure).num_milliseconds();
    ratio_to_percent(i64_to_f64(elapsed) / i64_to_f64(total)).min(PERCENT_MAX - 1)
}

/// Spread `stops` evenly across `departure..arrival`.
///
/// The first stop is due at departure and the last exactly at arrival; every
/// hop between them lasts the same time. All statuses start as upcoming. A
/// reversed span is treated as zero length.
#[must_use]
pub fn schedule_waypoints(
    stops: &[ResolvedStop],
    departure: DateTime<Utc>,
    arrival: DateTime<Utc>,
) -> Vec<Waypoint> {
    let arrival = arrival.max(departure);
    let total = (arrival - departure).num_milliseconds();
    let segments = stops.len().saturating_sub(1);

    stops
        .iter()
        .enumerate()
        .map(|(idx, stop)| {
            let scheduled_time = if idx == 0 {
                departure
            } else if idx == segments {
                arrival
            } else {
                departure + Duration::milliseconds(even_share(total, idx, segments))
            };
            Waypoint {
                city: stop.city.clone(),
                coordinates: stop.coordinates,
                scheduled_time,
                status: WaypointStatus::Upcoming,
            }
        })
        .collect()
}

/// Assign statuses to scheduled waypoints for the instant `now`.
///
/// The current waypoint is the first one whose scheduled time has not yet
/// passed (`now <= scheduled_time`). Everything before it is completed and
/// everything after it upcoming. Before the first scheduled time nothing has
/// started; once every time has passed there is no current waypoint.
///
/// Returns the index of the current waypoint.
pub fn assign_statuses(waypoints: &mut [Waypoint], now: DateTime<Utc>) -> Option<usize> {
    let not_started = waypoints.first().is_none_or(|w| now < w.scheduled_time);
    if not_started {
        for waypoint in waypoints.iter_mut() {
            waypoint.status = WaypointStatus::Upcoming;
        }
        return None;
    }

    let current = waypoints.iter().position(|w| now <= w.scheduled_time);
    for (idx, waypoint) in waypoints.iter_mut().enumerate() {
        waypoint.status = match current {
            Some(cur) if idx == cur => WaypointStatus::Current,
            Some(cur) if idx > cur => WaypointStatus::Upcoming,
            _ => WaypointStatus::Completed,
        };
    }
    current
}

/// Straight-line length of a waypoint chain in kilometres.
#[must_use]
pub fn route_distance_km(waypoints: &[Waypoint]) -> f64 {
    waypoints
        .windows(2)
        .map(|pair| haversine_km(pair[0].coordinates, pair[1].coordinates))
        .sum()
}

/// Composes percentage, schedule and statuses into one consistent snapshot.
#[derive(Debug, Clone, Default)]
pub struct ProgressEngine {
    config: ProgressConfig,
}

impl ProgressEngine {
    #[must_use]
    pub const fn new(config: ProgressConfig) -> Self {
        Self { config }
    }

    #[must_use]
    pub const fn config(&self) -> &ProgressConfig {
        &self.config
    }

    /// Evaluate `journey` over its resolved `stops` at `now`.
    #[must_use]
    pub fn snapshot(
        &self,
        journey: &Journey,
        stops: &[ResolvedStop],
        now: DateTime<Utc>,
    ) -> ProgressSnapshot {
        let departure = journey.departure_time();
        let arrival = journey.arrival_time();
        let percentage = percentage(departure, arrival, now);

        let mut waypoints = schedule_waypoints(stops, departure, arrival);
        let mut current_index = assign_statuses(&mut waypoints, now);
        if percentage == PERCENT_MAX {
            for waypoint in &mut waypoints {
                waypoint.status = WaypointStatus::Completed;
            }
            current_index = None;
        }

        let total = (arrival - departure).num_seconds().max(0);
        let elapsed = (now - departure).num_seconds().clamp(0, total);

        ProgressSnapshot {
            journey_id: journey.id().to_string(),
            evaluated_at: now,
            percentage,
            distance_km: route_distance_km(&waypoints),
            waypoints,
            ready_to_complete: percentage >= self.config.ready_threshold,
            current_index,
            elapsed_secs: elapsed,
            remaining_secs: total - elapsed,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geo::CityTable;
    use crate::route::synthesize;
    use chrono::TimeZone;

    const ROUTE: [&str; 5] = ["Dhaka", "Comilla", "Feni", "Chittagong", "Cox's Bazar"];

    fn hms(h: u32, m: u32, s: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 1, h, m, s).unwrap()
    }

    fn coastal_journey() -> Journey {
        Journey::new(
            "coastal",
            "Dhaka",
            "Cox's Bazar",
            ROUTE.iter().map(ToString::to_string).collect(),
            hms(8, 0, 0),
            hms(14, 30, 0),
        )
        .unwrap()
    }

    fn coastal_stops() -> Vec<ResolvedStop> {
        synthesize(coastal_journey().route(), CityTable::bundled())
    }

    fn statuses(snapshot: &ProgressSnapshot) -> Vec<WaypointStatus> {
        snapshot.waypoints.iter().map(|w| w.status).collect()
    }

    #[test]
    fn percentage_bounds_and_rounding() {
        let (dep, arr) = (hms(8, 0, 0), hms(14, 30, 0));
        assert_eq!(percentage(dep, arr, hms(7, 59, 59)), 0);
        assert_eq!(percentage(dep, arr, dep), 0);
        assert_eq!(percentage(dep, arr, hms(11, 15, 0)), 50);
        assert_eq!(percentage(dep, arr, hms(14, 29, 59)), 99);
        assert_eq!(percentage(dep, arr, arr), 99);
        assert_eq!(percentage(dep, arr, hms(14, 30, 1)), 100);
    }

    #[test]
    fn non_positive_span_counts_as_complete() {
        let t = hms(9, 0, 0);
        assert_eq!(percentage(t, t, hms(8, 0, 0)), 100);
        assert_eq!(percentage(t, hms(8, 0, 0), t), 100);
    }

    #[test]
    fn schedule_divides_span_evenly() {
        let waypoints = schedule_waypoints(&coastal_stops(), hms(8, 0, 0), hms(14, 30, 0));
        let times: Vec<_> = waypoints.iter().map(|w| w.scheduled_time).collect();
        assert_eq!(
            times,
            vec![
                hms(8, 0, 0),
                hms(9, 37, 30),
                hms(11, 15, 0),
                hms(12, 52, 30),
                hms(14, 30, 0)
            ]
        );
        assert!(waypoints.iter().all(|w| w.status == WaypointStatus::Upcoming));
    }

    #[test]
    fn schedule_handles_single_and_empty_inputs() {
        let stops = synthesize(&["Dhaka".to_string()], CityTable::bundled());
        let single = schedule_waypoints(&stops, hms(8, 0, 0), hms(9, 0, 0));
        assert_eq!(single.len(), 1);
        assert_eq!(single[0].scheduled_time, hms(8, 0, 0));
        assert!(schedule_waypoints(&[], hms(8, 0, 0), hms(9, 0, 0)).is_empty());
    }

    #[test]
    fn boundary_instant_keeps_waypoint_current() {
        let engine = ProgressEngine::default();
        let snapshot = engine.snapshot(&coastal_journey(), &coastal_stops(), hms(11, 15, 0));
        assert_eq!(snapshot.percentage, 50);
        assert_eq!(snapshot.current_index, Some(2));
        assert_eq!(snapshot.current().map(|w| w.city.as_str()), Some("Feni"));
        assert_eq!(
            statuses(&snapshot),
            vec![
                WaypointStatus::Completed,
                WaypointStatus::Completed,
                WaypointStatus::Current,
                WaypointStatus::Upcoming,
                WaypointStatus::Upcoming
            ]
        );
        assert!(!snapshot.ready_to_complete);
        assert_eq!(snapshot.elapsed_secs, 3 * 3600 + 15 * 60);
        assert_eq!(snapshot.remaining_secs, 3 * 3600 + 15 * 60);
    }

    #[test]
    fn last_second_is_ready_but_not_finished() {
        let engine = ProgressEngine::default();
        let snapshot = engine.snapshot(&coastal_journey(), &coastal_stops(), hms(14, 29, 59));
        assert_eq!(snapshot.percentage, 99);
        assert!(snapshot.ready_to_complete);
        assert!(!snapshot.is_finished());
        assert_eq!(snapshot.current_index, Some(4));
        assert_eq!(snapshot.count(WaypointStatus::Completed), 4);
    }

    #[test]
    fn before_departure_nothing_has_started() {
        let engine = ProgressEngine::default();
        let snapshot = engine.snapshot(&coastal_journey(), &coastal_stops(), hms(6, 0, 0));
        assert_eq!(snapshot.percentage, 0);
        assert!(!snapshot.has_started());
        assert_eq!(snapshot.current_index, None);
        assert_eq!(snapshot.elapsed_secs, 0);
    }

    #[test]
    fn after_arrival_everything_is_completed() {
        let engine = ProgressEngine::default();
        let snapshot = engine.snapshot(&coastal_journey(), &coastal_stops(), hms(20, 0, 0));
        assert_eq!(snapshot.percentage, 100);
        assert!(snapshot.is_finished());
        assert!(snapshot.ready_to_complete);
        assert_eq!(snapshot.count(WaypointStatus::Completed), 5);
        assert_eq!(snapshot.remaining_secs, 0);
    }

    #[test]
    fn threshold_is_configurable() {
        let engine = ProgressEngine::new(ProgressConfig { ready_threshold: 50 });
        let snapshot = engine.snapshot(&coastal_journey(), &coastal_stops(), hms(11, 15, 0));
        assert!(snapshot.ready_to_complete);
        let default_cfg: ProgressConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(default_cfg.ready_threshold, 90);
    }

    #[test]
    fn route_distance_sums_legs() {
        let waypoints = schedule_waypoints(&coastal_stops(), hms(8, 0, 0), hms(14, 30, 0));
        let km = route_distance_km(&waypoints);
        assert!((300.0..450.0).contains(&km), "got {km}");
    }
}
