//! Pipeline coordination.
//!
//! [`Pipeline::run`] sequences the two media pipelines and the generation
//! call for one resource: sample frames (mandatory), capture audio
//! (best-effort), generate. Frame-sampler progress is forwarded scaled into
//! the first `sampling_weight` percent of a combined 0–100 range; the run
//! reports 100 only after generation succeeds.
//!
//! Frame extraction must complete with at least one frame before audio
//! capture begins; the audio outcome never blocks proceeding.

use crate::{
    audio::{EncodedAudio, extract_audio},
    config::PipelineOptions,
    error::PipelineError,
    generator::ManualGenerator,
    manual::GeneratedManual,
    progress::{ProgressSink, ScaledProgress},
    resource::MediaResource,
    sampler::{SampledFrame, sample},
};

/// Everything one end-to-end run produces: the sampled frames, the audio
/// payload when one was captured, and the generated manual whose steps
/// reference frames by index.
#[derive(Debug)]
pub struct ManualBundle {
    /// Ordered sampled frames.
    pub frames: Vec<SampledFrame>,
    /// Captured audio, or `None` when extraction resolved absent.
    pub audio: Option<EncodedAudio>,
    /// The generated manual.
    pub manual: GeneratedManual,
}

/// Coordinator for one end-to-end processing run.
pub struct Pipeline {
    options: PipelineOptions,
}

impl Default for Pipeline {
    fn default() -> Self {
        Self::new(PipelineOptions::new())
    }
}

impl Pipeline {
    /// Create a coordinator with the given options.
    pub fn new(options: PipelineOptions) -> Self {
        Self { options }
    }

    /// Run frame sampling, audio capture, and generation against one
    /// resource.
    ///
    /// # Errors
    ///
    /// - [`PipelineError::InvalidOptions`] and
    ///   [`PipelineError::Cancelled`] from [`sample`], unchanged.
    /// - [`PipelineError::NoFramesExtracted`] when sampling fails for any
    ///   other reason or yields zero frames. The diagnostic cause goes to
    ///   the log; the error's display string is the user-facing message.
    ///   The generator is never called in that case.
    /// - [`PipelineError::Generation`] from the generator.
    ///
    /// Audio capture cannot fail the run.
    ///
    /// # Example
    ///
    /// ```no_run
    /// use docuflow::{MediaResource, NoOpProgress, OutlineGenerator, Pipeline};
    ///
    /// let resource = MediaResource::open("recording.mp4")?;
    /// let bundle = Pipeline::default().run(&resource, &OutlineGenerator, &NoOpProgress)?;
    /// println!("{} steps", bundle.manual.steps.len());
    /// # Ok::<(), docuflow::PipelineError>(())
    /// ```
    pub fn run(
        &self,
        resource: &MediaResource,
        generator: &dyn ManualGenerator,
        progress: &dyn ProgressSink,
    ) -> Result<ManualBundle, PipelineError> {
        let sampling_weight = self.options.sampling_weight.min(100);

        let scaled = ScaledProgress::new(progress, 0, sampling_weight);
        let frames = match sample(resource, &self.options.sampler, &scaled) {
            Ok(frames) => frames,
            Err(error @ (PipelineError::InvalidOptions(_) | PipelineError::Cancelled)) => {
                return Err(error);
            }
            Err(error) => {
                log::error!(
                    "frame sampling failed for {}: {error}",
                    resource.path().display(),
                );
                return Err(PipelineError::NoFramesExtracted);
            }
        };
        if frames.is_empty() {
            return Err(PipelineError::NoFramesExtracted);
        }
        log::info!(
            "sampled {} frames from {}",
            frames.len(),
            resource.path().display(),
        );

        let audio = extract_audio(resource, &self.options.audio);
        if audio.is_none() {
            log::info!("proceeding without audio");
        }

        let manual = generator.generate(&frames, audio.as_ref())?;
        progress.on_progress(100);

        Ok(ManualBundle {
            frames,
            audio,
            manual,
        })
    }
}
