//! Progress reporting and cancellation support.
//!
//! Both pipelines report completion as an integer percentage 0–100 through a
//! [`ProgressSink`]. Within a single stage the reported values are
//! monotonically non-decreasing; the final report before a stage completes
//! successfully is always 100.
//!
//! The percentage is computed as a pure function of `(offset, duration)` on
//! every step ([`percent_of`]); the [`ProgressReporter`] only clamps and
//! enforces monotonicity on top of that. No shared mutable counter exists.

use std::sync::{
    Arc,
    atomic::{AtomicBool, Ordering},
};

/// Receiver for progress updates during sampling and pipeline runs.
///
/// Implementations must be [`Send`] and [`Sync`] so a sink can be shared
/// with whatever surface displays the progress (UI thread, progress bar).
/// Sinks are infallible observers; use a [`CancellationToken`] to abort.
pub trait ProgressSink: Send + Sync {
    /// Called with the current completion percentage, 0..=100.
    fn on_progress(&self, percent: u8);
}

impl<F> ProgressSink for F
where
    F: Fn(u8) + Send + Sync,
{
    fn on_progress(&self, percent: u8) {
        self(percent);
    }
}

/// A no-op sink that discards all progress notifications.
///
/// This is the default when no sink is configured.
pub struct NoOpProgress;

impl ProgressSink for NoOpProgress {
    fn on_progress(&self, _percent: u8) {}
}

/// Compute the completion percentage for `offset` seconds into a resource of
/// `duration` seconds, rounded and clamped to 0..=100.
///
/// A non-positive or non-finite duration yields 0 (callers reject such
/// durations before sampling starts; this keeps the function total).
pub fn percent_of(offset: f64, duration: f64) -> u8 {
    if !duration.is_finite() || duration <= 0.0 {
        return 0;
    }
    let percent = (offset / duration * 100.0).round();
    percent.clamp(0.0, 100.0) as u8
}

/// Forwards progress from one stage into a sub-range of a combined 0–100
/// scale, so a coordinator can weight frame sampling and later stages into a
/// single bar.
pub struct ScaledProgress<'a> {
    inner: &'a dyn ProgressSink,
    start: u8,
    end: u8,
}

impl<'a> ScaledProgress<'a> {
    /// Map the wrapped stage's 0..=100 onto `start..=end` of `inner`.
    /// `start` and `end` are clamped to 100 and ordered.
    pub fn new(inner: &'a dyn ProgressSink, start: u8, end: u8) -> Self {
        let start = start.min(100);
        let end = end.min(100).max(start);
        Self { inner, start, end }
    }
}

impl ProgressSink for ScaledProgress<'_> {
    fn on_progress(&self, percent: u8) {
        let span = (self.end - self.start) as u32;
        let scaled = self.start as u32 + span * percent.min(100) as u32 / 100;
        self.inner.on_progress(scaled as u8);
    }
}

/// Internal guard that clamps reports to 0..=100 and drops any value lower
/// than the last one emitted, so a stage can never signal regressing
/// progress even if its offsets are perturbed.
pub(crate) struct ProgressReporter<'a> {
    sink: &'a dyn ProgressSink,
    last: u8,
}

impl<'a> ProgressReporter<'a> {
    pub(crate) fn new(sink: &'a dyn ProgressSink) -> Self {
        Self { sink, last: 0 }
    }

    /// Emit `percent` if it does not regress below the previous report.
    pub(crate) fn report(&mut self, percent: u8) {
        let clamped = percent.min(100);
        if clamped >= self.last {
            self.last = clamped;
            self.sink.on_progress(clamped);
        }
    }

    /// Emit the terminal 100% report.
    pub(crate) fn finish(&mut self) {
        self.report(100);
    }
}

/// Cooperative cancellation token backed by an [`AtomicBool`].
///
/// Clone the token and share it across threads; calling
/// [`cancel`](CancellationToken::cancel) from anywhere makes the sampling
/// loop return [`PipelineError::Cancelled`](crate::PipelineError::Cancelled)
/// at its next seek/capture iteration.
///
/// # Example
///
/// ```
/// use docuflow::CancellationToken;
///
/// let token = CancellationToken::new();
/// assert!(!token.is_cancelled());
/// token.cancel();
/// assert!(token.is_cancelled());
/// ```
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    cancelled: Arc<AtomicBool>,
}

impl CancellationToken {
    /// Create a new, non-cancelled token.
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation. All clones observe it.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Release);
    }

    /// Check whether cancellation has been requested.
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Acquire)
    }
}
