//! Media resource handle.
//!
//! [`MediaResource`] is the opaque handle both pipelines operate on. Opening
//! it demuxes the container once to probe metadata (duration, dimensions,
//! audio presence); every subsequent sampling or capture run opens its own
//! fresh demuxer from the handle, so repeated runs start from identical
//! state and no decode context is ever shared between runs. Native contexts
//! are owned by the run that opened them and released by `Drop` on every
//! exit path.

use std::{
    fmt::{Debug, Formatter, Result as FmtResult},
    path::{Path, PathBuf},
};

use ffmpeg_next::{codec::context::Context as CodecContext, format::context::Input, media::Type};

use crate::error::PipelineError;

/// Probe metadata gathered when a [`MediaResource`] is opened.
#[derive(Debug, Clone)]
#[must_use]
pub struct MediaInfo {
    /// Total duration in seconds. `0.0` when the container reports none.
    pub duration: f64,
    /// Native frame width in pixels (0 when no video stream exists).
    pub width: u32,
    /// Native frame height in pixels (0 when no video stream exists).
    pub height: u32,
    /// Whether the container carries at least one audio stream.
    pub has_audio: bool,
    /// Container format name (e.g. `"mov,mp4,m4a,3gp,3g2,mj2"`, `"matroska,webm"`).
    pub format: String,
}

/// Opaque handle to one user-supplied video.
///
/// Created per processing run and never reused across runs. The handle keeps
/// the source path plus probe metadata; the demux/decode contexts live only
/// inside the pipeline call that needs them.
///
/// # Example
///
/// ```no_run
/// use docuflow::MediaResource;
///
/// let resource = MediaResource::open("recording.mp4")?;
/// println!("duration: {:.1}s", resource.info().duration);
/// # Ok::<(), docuflow::PipelineError>(())
/// ```
pub struct MediaResource {
    path: PathBuf,
    info: MediaInfo,
}

impl Debug for MediaResource {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.debug_struct("MediaResource")
            .field("path", &self.path)
            .field("info", &self.info)
            .finish()
    }
}

impl MediaResource {
    /// Open a video resource and probe its metadata.
    ///
    /// Initializes FFmpeg (idempotent) and demuxes the container once. A
    /// container that cannot be demuxed at all fails with
    /// [`PipelineError::Resource`]; a demuxable container with no video
    /// stream opens fine and fails later, at sampling time, with
    /// [`PipelineError::NoVideoStream`].
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, PipelineError> {
        let path = path.as_ref().to_path_buf();

        ffmpeg_next::init().map_err(|error| PipelineError::Resource {
            path: path.clone(),
            reason: format!("FFmpeg initialisation failed: {error}"),
        })?;

        let input = ffmpeg_next::format::input(&path).map_err(|error| PipelineError::Resource {
            path: path.clone(),
            reason: error.to_string(),
        })?;

        let info = probe(&input);
        log::debug!(
            "opened {} ({}, {:.2}s, {}x{}, audio: {})",
            path.display(),
            info.format,
            info.duration,
            info.width,
            info.height,
            info.has_audio,
        );

        Ok(Self { path, info })
    }

    /// Probe metadata gathered at open time.
    pub fn info(&self) -> &MediaInfo {
        &self.info
    }

    /// Path of the underlying video.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Open a fresh demuxer for one pipeline run.
    ///
    /// The returned context is exclusively owned by the caller and released
    /// when dropped, whether the run succeeds or fails.
    pub(crate) fn demux(&self) -> Result<Input, PipelineError> {
        ffmpeg_next::format::input(&self.path)
            .map_err(|error| PipelineError::MediaDecode(error.to_string()))
    }
}

/// Extract container-level metadata from a freshly opened demuxer.
fn probe(input: &Input) -> MediaInfo {
    let duration_microseconds = input.duration();
    let duration = if duration_microseconds > 0 {
        duration_microseconds as f64 / 1_000_000.0
    } else {
        0.0
    };

    let (width, height) = input
        .streams()
        .best(Type::Video)
        .and_then(|stream| {
            let decoder = CodecContext::from_parameters(stream.parameters())
                .ok()?
                .decoder()
                .video()
                .ok()?;
            Some((decoder.width(), decoder.height()))
        })
        .unwrap_or((0, 0));

    let has_audio = input.streams().best(Type::Audio).is_some();

    MediaInfo {
        duration,
        width,
        height,
        has_audio,
        format: input.format().name().to_string(),
    }
}
