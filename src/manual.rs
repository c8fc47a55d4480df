//! The generated-manual document model.
//!
//! Manuals are exchanged with the generation boundary as structured JSON,
//! so the field names follow the generator's schema (`frameIndex`).

use serde::{Deserialize, Serialize};

use crate::error::PipelineError;

/// One operation step in a generated manual.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManualStep {
    /// Short action title (e.g. "ログインボタンをクリック").
    pub title: String,
    /// Detailed instruction text.
    pub description: String,
    /// Index into the sampled-frame sequence that best illustrates this
    /// step. References the frame, does not own it.
    #[serde(rename = "frameIndex")]
    pub frame_index: usize,
}

/// A complete generated operating manual.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeneratedManual {
    /// Document title.
    pub title: String,
    /// Introductory overview of the recorded process.
    pub overview: String,
    /// Ordered operation steps.
    pub steps: Vec<ManualStep>,
}

impl GeneratedManual {
    /// Parse a manual from the generation boundary's JSON shape.
    pub fn from_json(json: &str) -> Result<Self, PipelineError> {
        serde_json::from_str(json).map_err(|error| PipelineError::Generation(error.to_string()))
    }

    /// Serialize to the generation boundary's JSON shape.
    pub fn to_json(&self) -> Result<String, PipelineError> {
        serde_json::to_string_pretty(self)
            .map_err(|error| PipelineError::Generation(error.to_string()))
    }
}
