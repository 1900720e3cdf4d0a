//! Waytrack Journey Engine
//!
//! Platform-agnostic progress logic for live journey tracking. Given a
//! journey's timing and its ordered stops, the engine derives a completion
//! percentage, a per-waypoint schedule and status list, and the readiness
//! flag that unlocks trip completion. Rendering and persistence stay with
//! the caller.

pub mod clock;
pub mod completion;
pub mod constants;
pub mod geo;
pub mod journey;
pub mod numbers;
pub mod progress;
pub mod route;
pub mod tracker;

// Re-export commonly used types
pub use clock::{Clock, FixedClock, SystemClock};
#[cfg(feature = "async")]
pub use completion::CompletionWorkflow;
pub use completion::{CompletionError, CompletionRequest, ensure_ready};
pub use geo::{CityTable, Coordinates, DEFAULT_COORDINATES, haversine_km};
pub use journey::{Journey, JourneyError};
pub use progress::{
    ProgressConfig, ProgressEngine, ProgressSnapshot, Waypoint, WaypointStatus, assign_statuses,
    percentage, schedule_waypoints,
};
#[cfg(feature = "async")]
pub use route::{CheckpointSource, OfflineSource, RouteResolver};
pub use route::{
    Checkpoint, CheckpointError, FallbackReason, ResolutionSource, ResolvedStop, RouteResolution,
    StopOrigin, parse_checkpoints, reconcile, synthesize,
};
pub use tracker::{LiveJourney, PollUpdate};
