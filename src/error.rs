//! Error types for the `docuflow` crate.
//!
//! This module defines [`PipelineError`], the unified error type returned by
//! all fallible operations. The taxonomy is deliberately small: opening a
//! resource either works or fails fatally, frame sampling either works or
//! fails fatally, and audio capture never surfaces an error at all (it
//! collapses to `None`, see [`crate::audio`]).

use std::{io::Error as IoError, path::PathBuf};

use ffmpeg_next::Error as FfmpegError;
use image::ImageError;
use thiserror::Error;

/// The unified error type for all `docuflow` operations.
///
/// Every public method that can fail returns `Result<T, PipelineError>`.
/// Frame sampling is all-or-nothing: a mid-run decode failure aborts the
/// whole operation with no partial results.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum PipelineError {
    /// The input stream could not be opened or demuxed at all
    /// (corrupt or unsupported container). Fatal to the whole run.
    #[error("Failed to open media resource at {path}: {reason}")]
    Resource {
        /// Path that was passed to [`crate::MediaResource::open`].
        path: PathBuf,
        /// Underlying reason the open failed.
        reason: String,
    },

    /// The resource does not contain a video stream.
    #[error("No video stream found in resource")]
    NoVideoStream,

    /// Failure during metadata load or a mid-stream seek/decode cycle in the
    /// frame sampler. Fatal to frame extraction; no retries.
    #[error("Failed to decode video: {0}")]
    MediaDecode(String),

    /// Frame sampling failed or produced no frames. Frames are mandatory
    /// for the pipeline to have value, so the coordinator aborts the run
    /// with this error and logs the diagnostic cause.
    ///
    /// The display string is the user-facing message shown by the upload
    /// surface.
    #[error("動画からフレームを抽出できませんでした")]
    NoFramesExtracted,

    /// A tunable was outside its documented range (e.g. a non-positive
    /// sampling interval).
    #[error("Invalid options: {0}")]
    InvalidOptions(String),

    /// The manual-generation call failed. The generator is an opaque
    /// boundary; the message is whatever it reported.
    #[error("Manual generation failed: {0}")]
    Generation(String),

    /// The operation was cancelled via a
    /// [`CancellationToken`](crate::CancellationToken).
    #[error("Operation cancelled")]
    Cancelled,

    /// An I/O error occurred while writing frames or documents.
    #[error("I/O error: {0}")]
    Io(#[from] IoError),

    /// An error from the `image` crate during JPEG encoding.
    #[error("Image encoding error: {0}")]
    Image(#[from] ImageError),
}

impl From<FfmpegError> for PipelineError {
    fn from(error: FfmpegError) -> Self {
        PipelineError::MediaDecode(error.to_string())
    }
}
