//! Pipeline tunables.
//!
//! The three sampling tunables mirror what the capture surface exposes:
//! sampling interval (seconds between stills), maximum output frame height
//! (pixels, aspect ratio preserved), and JPEG quality (0–1 fraction). The
//! audio options carry the safety margin that bounds worst-case capture time.
//!
//! All builders validate lazily: [`SamplerOptions::validate`] is called at
//! the start of every sampling run so an invalid value is rejected before
//! any native resource is opened.

use std::time::Duration;

use crate::{audio::AudioEncoding, error::PipelineError, progress::CancellationToken};

/// Default gap between consecutive capture offsets, in seconds.
pub const DEFAULT_SAMPLE_INTERVAL: f64 = 2.5;

/// Default maximum output frame height, in pixels.
///
/// 720 px keeps UI text legible for vision models while bounding payload
/// size; width scales proportionally and frames are never upscaled.
pub const DEFAULT_MAX_HEIGHT: u32 = 720;

/// Default JPEG quality for sampled frames, as a 0–1 fraction.
pub const DEFAULT_JPEG_QUALITY: f32 = 0.6;

/// Default slack added to the resource duration before audio capture is
/// forcibly stopped.
pub const DEFAULT_SAFETY_MARGIN: Duration = Duration::from_secs(5);

/// Tunables for [`sample`](crate::sampler::sample).
///
/// # Example
///
/// ```
/// use docuflow::SamplerOptions;
///
/// let options = SamplerOptions::new()
///     .with_interval(1.0)
///     .with_max_height(512)
///     .with_jpeg_quality(0.8);
/// assert!(options.validate().is_ok());
/// ```
#[derive(Debug, Clone)]
pub struct SamplerOptions {
    /// Seconds between capture offsets. Must be finite and > 0.
    pub interval: f64,
    /// Maximum output frame height in pixels. Must be > 0.
    pub max_height: u32,
    /// JPEG quality in (0, 1].
    pub jpeg_quality: f32,
    /// Optional cancellation token, checked once per seek/capture cycle.
    pub(crate) cancellation: Option<CancellationToken>,
}

impl Default for SamplerOptions {
    fn default() -> Self {
        Self::new()
    }
}

impl SamplerOptions {
    /// Create options with the default interval, height cap, and quality.
    pub fn new() -> Self {
        Self {
            interval: DEFAULT_SAMPLE_INTERVAL,
            max_height: DEFAULT_MAX_HEIGHT,
            jpeg_quality: DEFAULT_JPEG_QUALITY,
            cancellation: None,
        }
    }

    /// Set the sampling interval in seconds.
    #[must_use]
    pub fn with_interval(mut self, seconds: f64) -> Self {
        self.interval = seconds;
        self
    }

    /// Set the maximum output frame height in pixels.
    #[must_use]
    pub fn with_max_height(mut self, pixels: u32) -> Self {
        self.max_height = pixels;
        self
    }

    /// Set the JPEG quality as a fraction in (0, 1].
    #[must_use]
    pub fn with_jpeg_quality(mut self, quality: f32) -> Self {
        self.jpeg_quality = quality;
        self
    }

    /// Attach a cancellation token honored at every seek/capture iteration.
    #[must_use]
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancellation = Some(token);
        self
    }

    /// Reject out-of-range tunables before any native context is opened.
    pub fn validate(&self) -> Result<(), PipelineError> {
        if !self.interval.is_finite() || self.interval <= 0.0 {
            return Err(PipelineError::InvalidOptions(format!(
                "sampling interval must be a positive number of seconds, got {}",
                self.interval
            )));
        }
        if self.max_height == 0 {
            return Err(PipelineError::InvalidOptions(
                "max frame height must be at least 1 pixel".to_string(),
            ));
        }
        if !(self.jpeg_quality > 0.0 && self.jpeg_quality <= 1.0) {
            return Err(PipelineError::InvalidOptions(format!(
                "JPEG quality must be in (0, 1], got {}",
                self.jpeg_quality
            )));
        }
        Ok(())
    }

    pub(crate) fn is_cancelled(&self) -> bool {
        self.cancellation
            .as_ref()
            .is_some_and(CancellationToken::is_cancelled)
    }
}

/// Tunables for [`extract_audio`](crate::audio::extract_audio).
#[derive(Debug, Clone)]
pub struct AudioOptions {
    /// Wall-clock slack beyond the resource duration before capture is
    /// forcibly stopped and whatever was collected is finalized.
    pub safety_margin: Duration,
    /// Candidate encodings in descending preference order. The first one
    /// the linked FFmpeg build can encode wins.
    pub preferences: Vec<AudioEncoding>,
}

impl Default for AudioOptions {
    fn default() -> Self {
        Self::new()
    }
}

impl AudioOptions {
    /// Create options with the default safety margin and preference order.
    pub fn new() -> Self {
        Self {
            safety_margin: DEFAULT_SAFETY_MARGIN,
            preferences: AudioEncoding::PREFERENCE.to_vec(),
        }
    }

    /// Set the safety margin added to the resource duration.
    #[must_use]
    pub fn with_safety_margin(mut self, margin: Duration) -> Self {
        self.safety_margin = margin;
        self
    }

    /// Replace the encoding preference list.
    #[must_use]
    pub fn with_preferences(mut self, preferences: Vec<AudioEncoding>) -> Self {
        self.preferences = preferences;
        self
    }
}

/// Combined options for a full [`Pipeline`](crate::pipeline::Pipeline) run.
#[derive(Debug, Clone)]
pub struct PipelineOptions {
    /// Frame sampling tunables.
    pub sampler: SamplerOptions,
    /// Audio capture tunables.
    pub audio: AudioOptions,
    /// Share of the combined 0–100 progress range given to frame sampling.
    /// The remainder covers audio capture and generation. Clamped to 100.
    pub sampling_weight: u8,
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self::new()
    }
}

impl PipelineOptions {
    /// Create options with defaults: sampling gets the first half of the
    /// combined progress range.
    pub fn new() -> Self {
        Self {
            sampler: SamplerOptions::new(),
            audio: AudioOptions::new(),
            sampling_weight: 50,
        }
    }

    /// Replace the sampler tunables.
    #[must_use]
    pub fn with_sampler(mut self, sampler: SamplerOptions) -> Self {
        self.sampler = sampler;
        self
    }

    /// Replace the audio tunables.
    #[must_use]
    pub fn with_audio(mut self, audio: AudioOptions) -> Self {
        self.audio = audio;
        self
    }

    /// Set the progress share given to frame sampling.
    #[must_use]
    pub fn with_sampling_weight(mut self, weight: u8) -> Self {
        self.sampling_weight = weight.min(100);
        self
    }
}
