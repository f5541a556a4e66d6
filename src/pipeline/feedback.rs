//! Progress reporting and cooperative cancellation.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use tracing::{debug, info, warn};

/// Host-supplied progress and cancellation channel.
///
/// The pipeline polls [`Feedback::is_canceled`] between stages and hands
/// the same object to every stage so long-running stages can report
/// sub-progress and stop early.
pub trait Feedback: Send + Sync {
    /// True once the host has asked the run to stop.
    fn is_canceled(&self) -> bool;

    /// Reports progress as a percentage in `0.0..=100.0`.
    fn set_progress(&self, _percent: f64) {}

    fn push_info(&self, message: &str) {
        info!("{}", message);
    }

    fn push_warning(&self, message: &str) {
        warn!("{}", message);
    }
}

/// Shared cancellation flag.
///
/// Clones observe the same flag, so a host thread can keep one clone and
/// cancel a run that owns another.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken(Arc<AtomicBool>);

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Feedback that logs through `tracing` and remembers the last progress.
#[derive(Debug, Clone, Default)]
pub struct LogFeedback {
    token: CancellationToken,
    progress: Arc<AtomicU64>,
}

impl LogFeedback {
    pub fn new(token: CancellationToken) -> Self {
        Self {
            token,
            progress: Arc::default(),
        }
    }

    pub fn token(&self) -> &CancellationToken {
        &self.token
    }

    /// Last reported progress percentage.
    pub fn progress(&self) -> f64 {
        f64::from_bits(self.progress.load(Ordering::Relaxed))
    }
}

impl Feedback for LogFeedback {
    fn is_canceled(&self) -> bool {
        self.token.is_cancelled()
    }

    fn set_progress(&self, percent: f64) {
        let percent = percent.clamp(0.0, 100.0);
        let previous = f64::from_bits(self.progress.swap(percent.to_bits(), Ordering::Relaxed));
        // One log line per 10% step.
        if (percent / 10.0).floor() > (previous / 10.0).floor() {
            debug!("Progress: {:.0}%", percent);
        }
    }
}

/// Maps a stage's 0-100% progress onto its slice of the overall run.
pub struct StepFeedback<'a> {
    parent: &'a dyn Feedback,
    step: usize,
    total: usize,
}

impl<'a> StepFeedback<'a> {
    pub fn new(parent: &'a dyn Feedback, step: usize, total: usize) -> Self {
        Self {
            parent,
            step,
            total: total.max(1),
        }
    }
}

impl Feedback for StepFeedback<'_> {
    fn is_canceled(&self) -> bool {
        self.parent.is_canceled()
    }

    fn set_progress(&self, percent: f64) {
        let fraction = percent.clamp(0.0, 100.0) / 100.0;
        self.parent
            .set_progress((self.step as f64 + fraction) / self.total as f64 * 100.0);
    }

    fn push_info(&self, message: &str) {
        self.parent.push_info(message);
    }

    fn push_warning(&self, message: &str) {
        self.parent.push_warning(message);
    }
}
