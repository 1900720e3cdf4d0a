//! HTTP adapters for the journey API.
use anyhow::{Context, Result, ensure};
use async_trait::async_trait;
use reqwest::{Client, StatusCode, Url};
use std::time::Duration;
use waytrack_engine::{
    Checkpoint, CheckpointError, CheckpointSource, CompletionError, CompletionRequest,
    CompletionWorkflow, parse_checkpoints,
};

const LOG_TARGET_HTTP: &str = "waytrack::http";

/// Shared client for one API base URL.
#[derive(Debug, Clone)]
pub struct JourneyApi {
    client: Client,
    base: Url,
}

impl JourneyApi {
    /// # Errors
    ///
    /// Returns an error if `base` is not a hierarchical URL or the HTTP
    /// client cannot be constructed.
    pub fn new(base: &str, timeout: Duration) -> Result<Self> {
        let base = Url::parse(base).with_context(|| format!("invalid API base {base:?}"))?;
        ensure!(!base.cannot_be_a_base(), "API base {base} cannot hold a path");
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .context("building HTTP client")?;
        Ok(Self { client, base })
    }

    #[must_use]
    pub fn checkpoints_url(&self, journey_id: &str) -> Url {
        self.journey_url(journey_id, "checkpoints")
    }

    #[must_use]
    pub fn completion_url(&self, journey_id: &str) -> Url {
        self.journey_url(journey_id, "complete")
    }

    /// `{base}/journeys/{id}/{action}` with the id percent-encoded as one segment.
    fn journey_url(&self, journey_id: &str, action: &str) -> Url {
        let mut url = self.base.clone();
        if let Ok(mut segments) = url.path_segments_mut() {
            segments
                .pop_if_empty()
                .extend(["journeys", journey_id, action]);
        }
        url
    }
}

#[async_trait]
impl CheckpointSource for JourneyApi {
    async fn fetch(&self, journey_id: &str) -> Result<Vec<Checkpoint>, CheckpointError> {
        let url = self.checkpoints_url(journey_id);
        log::debug!(target: LOG_TARGET_HTTP, "GET {url}");
        let resp = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|err| CheckpointError::Unavailable(err.to_string()))?;

        match resp.status() {
            StatusCode::NOT_FOUND | StatusCode::NO_CONTENT => return Ok(Vec::new()),
            status if !status.is_success() => {
                return Err(CheckpointError::Status(status.as_u16()));
            }
            _ => {}
        }

        let body = resp
            .text()
            .await
            .map_err(|err| CheckpointError::Unavailable(err.to_string()))?;
        parse_checkpoints(&body)
    }
}

#[async_trait]
impl CompletionWorkflow for JourneyApi {
    async fn submit(
        &self,
        journey_id: &str,
        request: &CompletionRequest,
    ) -> Result<(), CompletionError> {
        let url = self.completion_url(journey_id);
        log::debug!(target: LOG_TARGET_HTTP, "POST {url}");
        let resp = self
            .client
            .post(url)
            .json(request)
            .send()
            .await
            .map_err(|err| CompletionError::Submission(err.to_string()))?;
        let status = resp.status();
        if status.is_success() {
            Ok(())
        } else {
            let detail = resp.text().await.unwrap_or_default();
            Err(CompletionError::Submission(format!(
                "{status}: {}",
                detail.trim()
            )))
        }
    }
}
