//! Cooperative progress reporting and cancellation.
//!
//! An extraction run polls its [`CancellationToken`] every time it emits a
//! progress value, so cancellation latency is bounded by the distance between
//! progress updates (at most a handful of image rows or cube layers).

use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};

/// A shared flag used to request that a running extraction stop early.
///
/// The token is owned by the host; clones share the same flag. The algorithm
/// only ever reads it and never blocks on it.
///
/// # Examples
/// ```
/// # use nievette::CancellationToken;
/// let token = CancellationToken::new();
/// let shared = token.clone();
/// shared.cancel();
/// assert!(token.is_cancelled());
/// ```
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    /// The shared stop flag.
    cancelled: Arc<AtomicBool>,
}

impl CancellationToken {
    /// Creates a new token in the not-cancelled state.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Requests that runs observing this token stop early.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Relaxed);
    }

    /// Whether cancellation has been requested.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Relaxed)
    }
}

/// The progress sink and cancellation token for one extraction run.
///
/// The sink receives monotonically non-decreasing percentages in `0..=100`
/// at fixed milestones after each stage and at intermediate steps inside the
/// long per-row and per-layer loops.
pub struct ProgressMonitor<'a> {
    /// Where progress percentages are sent, if anywhere.
    sink: Option<&'a mut dyn FnMut(u8)>,
    /// The token polled after every emission.
    token: CancellationToken,
}

impl<'a> ProgressMonitor<'a> {
    /// Creates a monitor that reports progress to `sink` and polls `token`.
    #[must_use]
    pub fn new(sink: &'a mut dyn FnMut(u8), token: CancellationToken) -> Self {
        Self { sink: Some(sink), token }
    }

    /// Creates a monitor with no sink that polls `token`.
    #[must_use]
    pub fn with_token(token: CancellationToken) -> Self {
        Self { sink: None, token }
    }

    /// Creates a monitor with no sink and a token that is never cancelled.
    #[must_use]
    pub fn silent() -> Self {
        Self { sink: None, token: CancellationToken::new() }
    }
}

impl Default for ProgressMonitor<'_> {
    fn default() -> Self {
        Self::silent()
    }
}

/// Marker returned when a cancelled token is observed mid-run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Cancelled;

/// Tracks the completion percentage of one run and forwards it to the monitor.
///
/// The percentage is kept as an `f64` so that fractional per-row increments
/// accumulate without drift; emitted values are whole percents.
pub(crate) struct Tracker<'m, 'a> {
    /// The host-provided sink and token.
    monitor: &'m mut ProgressMonitor<'a>,
    /// The current completion percentage in `0.0..=100.0`.
    percent: f64,
}

impl<'m, 'a> Tracker<'m, 'a> {
    /// Creates a tracker at zero percent.
    pub(crate) fn new(monitor: &'m mut ProgressMonitor<'a>) -> Self {
        Self { monitor, percent: 0.0 }
    }

    /// Slack for the floating-point accumulation of per-step increments.
    const EPSILON: f64 = 1e-6;

    /// Sets the percentage to a new value and emits it.
    ///
    /// Progress must never decrease or exceed 100 beyond accumulated
    /// floating-point error.
    pub(crate) fn set(&mut self, percent: f64) -> Result<(), Cancelled> {
        debug_assert!(
            percent >= self.percent - Self::EPSILON,
            "progress went backward: {} -> {percent}",
            self.percent,
        );
        debug_assert!(
            percent <= 100.0 + Self::EPSILON,
            "progress exceeded 100: {percent}"
        );
        self.percent = percent;
        self.emit()
    }

    /// Advances the percentage by `delta` and emits it.
    pub(crate) fn advance(&mut self, delta: f64) -> Result<(), Cancelled> {
        self.set(self.percent + delta)
    }

    /// Returns the per-step increment that reaches `target` in `steps` steps.
    pub(crate) fn step(&self, target: f64, steps: usize) -> f64 {
        debug_assert!(
            (self.percent..=100.0).contains(&target),
            "target {target} outside {}..=100",
            self.percent,
        );
        if steps == 0 {
            0.0
        } else {
            #[allow(clippy::cast_precision_loss)]
            let steps = steps as f64;
            (target - self.percent) / steps
        }
    }

    /// Sends the current percentage to the sink and polls the token.
    fn emit(&mut self) -> Result<(), Cancelled> {
        if let Some(sink) = self.monitor.sink.as_mut() {
            #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
            sink(self.percent as u8);
        }
        if self.monitor.token.is_cancelled() {
            Err(Cancelled)
        } else {
            Ok(())
        }
    }
}
