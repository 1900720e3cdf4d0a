//! Completion trigger boundary.
//!
//! The engine only exposes readiness and validates the submission shape.
//! Actually recording a completion belongs to a [`CompletionWorkflow`]
//! implemented by the caller.
use serde::Serialize;
use thiserror::Error;

use crate::constants::{MAX_PHOTOS, RATING_MAX, RATING_MIN, REVIEW_MAX_CHARS};
use crate::progress::ProgressSnapshot;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CompletionError {
    #[error("journey is only {percentage}% complete")]
    NotReady { percentage: u8 },
    #[error("rating must be between 1 and 5, got {0}")]
    RatingOutOfRange(u8),
    #[error("review is {0} characters, limit is 500")]
    ReviewTooLong(usize),
    #[error("at most 3 photos may be attached, got {0}")]
    TooManyPhotos(usize),
    #[error("photo reference at position {0} is blank")]
    BlankPhoto(usize),
    #[error("completion submission failed: {0}")]
    Submission(String),
}

/// A validated trip-completion submission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CompletionRequest {
    rating: u8,
    #[serde(skip_serializing_if = "Option::is_none")]
    review: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    photos: Vec<String>,
}

impl CompletionRequest {
    /// Validate a submission.
    ///
    /// A blank review is treated as absent.
    ///
    /// # Errors
    ///
    /// Returns the first field that fails validation.
    pub fn new(
        rating: u8,
        review: Option<String>,
        photos: Vec<String>,
    ) -> Result<Self, CompletionError> {
        if !(RATING_MIN..=RATING_MAX).contains(&rating) {
            return Err(CompletionError::RatingOutOfRange(rating));
        }
        let review = review
            .map(|text| text.trim().to_string())
            .filter(|text| !text.is_empty());
        if let Some(text) = &review {
            let chars = text.chars().count();
            if chars > REVIEW_MAX_CHARS {
                return Err(CompletionError::ReviewTooLong(chars));
            }
        }
        if photos.len() > MAX_PHOTOS {
            return Err(CompletionError::TooManyPhotos(photos.len()));
        }
        if let Some(idx) = photos.iter().position(|p| p.trim().is_empty()) {
            return Err(CompletionError::BlankPhoto(idx));
        }
        Ok(Self {
            rating,
            review,
            photos,
        })
    }

    #[must_use]
    pub const fn rating(&self) -> u8 {
        self.rating
    }

    #[must_use]
    pub fn review(&self) -> Option<&str> {
        self.review.as_deref()
    }

    #[must_use]
    pub fn photos(&self) -> &[String] {
        &self.photos
    }
}

/// Gate a completion on the snapshot's readiness flag.
///
/// # Errors
///
/// Returns [`CompletionError::NotReady`] until the threshold is crossed.
pub fn ensure_ready(snapshot: &ProgressSnapshot) -> Result<(), CompletionError> {
    if snapshot.ready_to_complete {
        Ok(())
    } else {
        Err(CompletionError::NotReady {
            percentage: snapshot.percentage,
        })
    }
}

/// External collaborator that records a completed journey.
#[cfg(feature = "async")]
#[async_trait::async_trait]
pub trait CompletionWorkflow: Send + Sync {
    /// Submit `request` for `journey_id`.
    ///
    /// # Errors
    ///
    /// Returns [`CompletionError::Submission`] when the collaborator rejects it.
    async fn submit(
        &self,
        journey_id: &str,
        request: &CompletionRequest,
    ) -> Result<(), CompletionError>;
}
