//! # docuflow
//!
//! Turn a screen recording into a step-by-step operating manual.
//!
//! `docuflow` is the media-ingestion core of that workflow: it samples a
//! video into an ordered sequence of bounded-resolution JPEG stills, makes
//! a best-effort capture of the audio track, and coordinates both stages
//! into a single call to an opaque manual generator, with weighted and
//! monotonic progress reporting throughout. Media decoding is powered by
//! FFmpeg via the [`ffmpeg-next`](https://crates.io/crates/ffmpeg-next)
//! crate.
//!
//! ## Quick start
//!
//! ```no_run
//! use docuflow::{MediaResource, NoOpProgress, SamplerOptions, sample};
//!
//! let resource = MediaResource::open("recording.mp4")?;
//! let frames = sample(&resource, &SamplerOptions::new(), &NoOpProgress)?;
//! println!("captured {} frames", frames.len());
//! # Ok::<(), docuflow::PipelineError>(())
//! ```
//!
//! ## Full pipeline
//!
//! ```no_run
//! use docuflow::{MediaResource, NoOpProgress, OutlineGenerator, Pipeline, export};
//!
//! let resource = MediaResource::open("recording.mp4")?;
//! let bundle = Pipeline::default().run(&resource, &OutlineGenerator, &NoOpProgress)?;
//! export::save_markdown("manual.md", &bundle.manual, &bundle.frames)?;
//! # Ok::<(), docuflow::PipelineError>(())
//! ```
//!
//! ## Contracts worth knowing
//!
//! - **Frame sampling is all-or-nothing.** A decode failure mid-run aborts
//!   with [`PipelineError::MediaDecode`] and returns no partial frames.
//! - **Audio capture never fails.** [`extract_audio`] resolves to
//!   `Option<EncodedAudio>`; every internal failure collapses to `None` and
//!   the pipeline proceeds without audio.
//! - **Progress is monotonic.** Within one stage, reported percentages
//!   never decrease, and a successful stage ends at 100.
//! - **Resources are released on every path.** Each run opens its own
//!   demux/decode contexts and drops them on success and failure alike.
//!
//! ## Requirements
//!
//! FFmpeg development libraries must be installed on the system.

pub mod audio;
pub mod config;
mod conversion;
pub mod error;
pub mod export;
pub mod ffmpeg;
pub mod generator;
pub mod manual;
pub mod pipeline;
pub mod progress;
pub mod resource;
pub mod sampler;

pub use audio::{AudioEncoding, EncodedAudio, extract_audio};
pub use config::{
    AudioOptions, DEFAULT_JPEG_QUALITY, DEFAULT_MAX_HEIGHT, DEFAULT_SAFETY_MARGIN,
    DEFAULT_SAMPLE_INTERVAL, PipelineOptions, SamplerOptions,
};
pub use error::PipelineError;
pub use ffmpeg::{FfmpegLogLevel, set_ffmpeg_log_level};
pub use generator::{
    AudioPart, FixedManualGenerator, FramePart, ManualGenerator, OutlineGenerator, audio_part,
    frame_parts,
};
pub use manual::{GeneratedManual, ManualStep};
pub use pipeline::{ManualBundle, Pipeline};
pub use progress::{CancellationToken, NoOpProgress, ProgressSink, ScaledProgress, percent_of};
pub use resource::{MediaInfo, MediaResource};
pub use sampler::{FRAME_MIME_TYPE, SampledFrame, plan_offsets, sample, scaled_dimensions};
