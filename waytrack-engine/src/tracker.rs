//! Live tracking session for a single journey.
//!
//! A session resolves its route once, then answers snapshots against its
//! clock and remembers whether readiness has already been announced.
use chrono::{DateTime, Utc};

use crate::clock::{Clock, SystemClock};
use crate::constants::LOG_TARGET_TRACKER;
use crate::geo::CityTable;
use crate::journey::Journey;
use crate::progress::{ProgressEngine, ProgressSnapshot};
use crate::route::{FallbackReason, ResolvedStop, RouteResolution};

/// Result of one polling step.
#[derive(Debug, Clone, PartialEq)]
pub struct PollUpdate {
    pub snapshot: ProgressSnapshot,
    /// True only on the first poll that observes readiness.
    pub became_ready: bool,
}

/// High-level session binding a journey to its resolved stops and a clock.
///
/// The route is resolved once per session; every snapshot afterwards is a
/// pure evaluation against the clock.
#[derive(Debug)]
pub struct LiveJourney<C = SystemClock> {
    journey: Journey,
    resolution: RouteResolution,
    engine: ProgressEngine,
    clock: C,
    announced_ready: bool,
}

impl LiveJourney<SystemClock> {
    /// Session against the system clock with stops synthesized locally.
    #[must_use]
    pub fn offline(journey: Journey, engine: ProgressEngine) -> Self {
        Self::offline_with_clock(journey, engine, SystemClock)
    }
}

impl<C: Clock> LiveJourney<C> {
    #[must_use]
    pub const fn new(
        journey: Journey,
        resolution: RouteResolution,
        engine: ProgressEngine,
        clock: C,
    ) -> Self {
        Self {
            journey,
            resolution,
            engine,
            clock,
            announced_ready: false,
        }
    }

    /// Session whose stops come from the bundled city table only.
    #[must_use]
    pub fn offline_with_clock(journey: Journey, engine: ProgressEngine, clock: C) -> Self {
        let resolution =
            RouteResolution::fallback(journey.route(), CityTable::bundled(), FallbackReason::Empty);
        Self::new(journey, resolution, engine, clock)
    }

    /// Resolve the journey's route once and start a session.
    #[cfg(feature = "async")]
    pub async fn resolve<S>(
        journey: Journey,
        resolver: &crate::route::RouteResolver<S>,
        engine: ProgressEngine,
        clock: C,
    ) -> Self
    where
        S: crate::route::CheckpointSource,
    {
        let resolution = resolver.resolve(journey.id(), journey.route()).await;
        Self::new(journey, resolution, engine, clock)
    }

    #[must_use]
    pub const fn journey(&self) -> &Journey {
        &self.journey
    }

    #[must_use]
    pub const fn resolution(&self) -> &RouteResolution {
        &self.resolution
    }

    #[must_use]
    pub fn stops(&self) -> &[ResolvedStop] {
        &self.resolution.stops
    }

    #[must_use]
    pub const fn clock(&self) -> &C {
        &self.clock
    }

    /// Snapshot at the clock's current time.
    #[must_use]
    pub fn snapshot(&self) -> ProgressSnapshot {
        self.snapshot_at(self.clock.now())
    }

    /// Snapshot at an explicit instant.
    #[must_use]
    pub fn snapshot_at(&self, now: DateTime<Utc>) -> ProgressSnapshot {
        self.engine
            .snapshot(&self.journey, &self.resolution.stops, now)
    }

    /// Take a snapshot and report whether readiness was just reached.
    pub fn poll(&mut self) -> PollUpdate {
        let snapshot = self.snapshot();
        let became_ready = snapshot.ready_to_complete && !self.announced_ready;
        if became_ready {
            self.announced_ready = true;
            log::info!(
                target: LOG_TARGET_TRACKER,
                "journey {} reached {}% and can be completed",
                self.journey.id(),
                snapshot.percentage
            );
        }
        PollUpdate {
            snapshot,
            became_ready,
        }
    }
}
