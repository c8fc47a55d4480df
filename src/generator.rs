//! The manual-generation boundary.
//!
//! The core treats generation as an opaque function: frames plus optional
//! audio in, structured manual out. [`ManualGenerator`] is that seam; a
//! model-backed client implements it outside this crate. The transport
//! shapes ([`FramePart`], [`AudioPart`]) carry the media as base64 so any
//! JSON-speaking endpoint can consume them directly.

use serde::Serialize;

use crate::{
    audio::EncodedAudio,
    error::PipelineError,
    manual::{GeneratedManual, ManualStep},
    sampler::{FRAME_MIME_TYPE, SampledFrame},
};

/// Opaque generation seam: frames + optional audio → structured manual.
pub trait ManualGenerator {
    /// Produce a manual from the sampled media.
    ///
    /// # Errors
    ///
    /// Implementations report failures as
    /// [`PipelineError::Generation`]; the coordinator surfaces them
    /// unchanged.
    fn generate(
        &self,
        frames: &[SampledFrame],
        audio: Option<&EncodedAudio>,
    ) -> Result<GeneratedManual, PipelineError>;
}

/// A transport-safe frame for the generation call.
#[derive(Debug, Clone, Serialize)]
pub struct FramePart {
    /// Index in the sampled sequence (what manual steps reference).
    pub index: usize,
    /// Capture offset in seconds.
    pub time: f64,
    /// Always `image/jpeg`.
    #[serde(rename = "mimeType")]
    pub mime_type: &'static str,
    /// Base64 of the encoded image.
    pub data: String,
}

/// A transport-safe audio payload for the generation call.
#[derive(Debug, Clone, Serialize)]
pub struct AudioPart {
    /// MIME type of the encoded payload.
    #[serde(rename = "mimeType")]
    pub mime_type: &'static str,
    /// Base64 of the encoded container bytes.
    pub data: String,
}

/// Re-encode sampled frames for transport, preserving order and indices.
pub fn frame_parts(frames: &[SampledFrame]) -> Vec<FramePart> {
    frames
        .iter()
        .map(|frame| FramePart {
            index: frame.index,
            time: frame.time,
            mime_type: FRAME_MIME_TYPE,
            data: frame.to_base64(),
        })
        .collect()
}

/// Re-encode a captured audio payload for transport.
pub fn audio_part(audio: &EncodedAudio) -> AudioPart {
    AudioPart {
        mime_type: audio.mime_type,
        data: audio.to_base64(),
    }
}

/// Placeholder generator producing a bare outline: one step per sampled
/// frame, titled by its timestamp. Lets the pipeline and export run end to
/// end without a model endpoint wired up.
pub struct OutlineGenerator;

impl ManualGenerator for OutlineGenerator {
    fn generate(
        &self,
        frames: &[SampledFrame],
        audio: Option<&EncodedAudio>,
    ) -> Result<GeneratedManual, PipelineError> {
        let steps = frames
            .iter()
            .map(|frame| ManualStep {
                title: format!("手順 {} ({:.1}秒)", frame.index + 1, frame.time),
                description: "この画面で行われた操作を記入してください。".to_string(),
                frame_index: frame.index,
            })
            .collect();

        Ok(GeneratedManual {
            title: "操作マニュアル（下書き）".to_string(),
            overview: match audio {
                Some(_) => "画面収録と音声トラックから生成された下書きです。".to_string(),
                None => "画面収録から生成された下書きです。".to_string(),
            },
            steps,
        })
    }
}

/// Generator that returns a pre-written manual (e.g. a model response saved
/// as JSON), attaching it to the freshly sampled frames.
pub struct FixedManualGenerator {
    manual: GeneratedManual,
}

impl FixedManualGenerator {
    /// Wrap an already-generated manual.
    pub fn new(manual: GeneratedManual) -> Self {
        Self { manual }
    }
}

impl ManualGenerator for FixedManualGenerator {
    fn generate(
        &self,
        frames: &[SampledFrame],
        _audio: Option<&EncodedAudio>,
    ) -> Result<GeneratedManual, PipelineError> {
        for step in &self.manual.steps {
            if step.frame_index >= frames.len() {
                return Err(PipelineError::Generation(format!(
                    "step '{}' references frame {} but only {} frames were sampled",
                    step.title,
                    step.frame_index,
                    frames.len(),
                )));
            }
        }
        Ok(self.manual.clone())
    }
}
