//! AI analysis of individual photos via an external vision service.

pub mod coordinator;
pub mod provider;

pub use coordinator::{AnalysisCoordinator, AnalysisEvent};
pub use provider::{GeminiProvider, VisionProvider};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Structured result returned by the vision service for one photo.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisResult {
    /// Short, searchable keywords (recommended 5-10).
    pub tags: Vec<String>,
    /// One concise sentence.
    pub description: String,
    /// Suggested rating 1-5; only applied to still-unrated records.
    pub rating_suggestion: u8,
}

/// Failure taxonomy for a single analysis attempt. None of these are
/// fatal to the process; each is scoped to one record's invocation and
/// never rolls back unrelated state.
#[derive(Debug, Clone, Error)]
pub enum AnalysisError {
    /// Required credential missing; surfaced feature-level, no call
    /// is attempted.
    #[error("analysis API key is not configured")]
    MissingCredential,

    /// The local downscale/encode failed before any call was issued.
    #[error("failed to prepare image for analysis: {0}")]
    ImagePreparation(String),

    /// The external call did not complete (network, non-success
    /// status, timeout).
    #[error("analysis request failed: {0}")]
    Transport(String),

    /// The call returned, but the payload does not match the expected
    /// shape.
    #[error("unexpected analysis response: {0}")]
    MalformedResponse(String),
}
