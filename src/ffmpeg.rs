//! FFmpeg console verbosity control.
//!
//! FFmpeg logs to stderr through its own system, separate from the Rust
//! `log` crate. By default it prints warnings, which is noisy for a library
//! consumer, so the CLI (and embedders) can tune it here without importing
//! `ffmpeg-next` directly.

use ffmpeg_next::util::log::Level;

/// FFmpeg internal log verbosity, most quiet first.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FfmpegLogLevel {
    /// Print nothing at all.
    Quiet,
    /// Recoverable errors and worse.
    Error,
    /// Warnings and worse (FFmpeg's default).
    Warning,
    /// Informational messages and worse.
    Info,
    /// Debugging output.
    Debug,
}

/// Set FFmpeg's internal stderr verbosity. Does not affect Rust-side `log`
/// output.
pub fn set_ffmpeg_log_level(level: FfmpegLogLevel) {
    let level = match level {
        FfmpegLogLevel::Quiet => Level::Quiet,
        FfmpegLogLevel::Error => Level::Error,
        FfmpegLogLevel::Warning => Level::Warning,
        FfmpegLogLevel::Info => Level::Info,
        FfmpegLogLevel::Debug => Level::Debug,
    };
    ffmpeg_next::util::log::set_level(level);
}
