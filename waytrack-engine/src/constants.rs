//! Centralized thresholds and limits for journey progress logic.
//!
//! These values define the observable contract of the engine. Keeping them
//! together means behaviour only changes through reviewed code changes,
//! never through external configuration assets.

use std::time::Duration;

// Log targets --------------------------------------------------------------
pub(crate) const LOG_TARGET_ROUTE: &str = "waytrack::route";
pub(crate) const LOG_TARGET_TRACKER: &str = "waytrack::tracker";

// Progress -----------------------------------------------------------------
/// Percentage at which a journey becomes eligible for completion.
pub const READY_THRESHOLD_PCT: u8 = 90;
pub const PERCENT_MIN: u8 = 0;
pub const PERCENT_MAX: u8 = 100;

// Route resolution ---------------------------------------------------------
/// Upper bound on a single remote checkpoint lookup before falling back.
pub const DEFAULT_REMOTE_TIMEOUT: Duration = Duration::from_secs(5);
pub const MIN_ROUTE_LEN: usize = 2;

// Completion submission ----------------------------------------------------
pub const RATING_MIN: u8 = 1;
pub const RATING_MAX: u8 = 5;
pub const REVIEW_MAX_CHARS: usize = 500;
pub const MAX_PHOTOS: usize = 3;
