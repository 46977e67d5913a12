//! Poll an asynchronously updating source until consecutive samples agree.
//!
//! Nothing here knows about markup or browsers. A sampler returns `Some(value)`
//! once the source looks ready and `None` while it is still loading. The first
//! ready sample becomes the snapshot; each later sample equal to it counts as
//! one repeat, and the value is stable once `required_samples` repeats have
//! been seen in a row.

use async_trait::async_trait;
use std::time::Duration;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

/// Timing and threshold for one polling run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StabilityPolicy {
    pub interval: Duration,
    pub required_samples: u32,
    pub max_wait: Duration,
}

impl StabilityPolicy {
    #[must_use]
    pub fn new(interval: Duration, required_samples: u32, max_wait: Duration) -> Self {
        Self {
            interval,
            // A threshold of zero would never observe anything
            required_samples: required_samples.max(1),
            max_wait,
        }
    }
}

/// How a polling run ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollOutcome<T> {
    Stable(T),
    /// Budget elapsed; carries the last ready sample seen, if any.
    TimedOut { last: Option<T> },
    Cancelled,
}

/// Source of samples for [`poll_until_stable`].
#[async_trait]
pub trait StabilitySampler: Send {
    type Output: PartialEq + Clone + Send;

    /// `None` means "not ready yet"; errors should be folded into `None` by
    /// the implementation after logging.
    async fn sample(&mut self) -> Option<Self::Output>;
}

/// Counts consecutive repeats of the current snapshot.
#[derive(Debug, Clone)]
pub struct StabilityTracker<T> {
    snapshot: Option<T>,
    last_ready: Option<T>,
    repeats: u32,
    required: u32,
}

impl<T: PartialEq + Clone> StabilityTracker<T> {
    #[must_use]
    pub fn new(required: u32) -> Self {
        Self {
            snapshot: None,
            last_ready: None,
            repeats: 0,
            required: required.max(1),
        }
    }

    /// Feed one sample; returns the snapshot once it has been repeated
    /// `required` times in a row.
    pub fn observe(&mut self, sample: Option<T>) -> Option<T> {
        let Some(current) = sample else {
            // A not-ready read breaks the run and drops the snapshot
            self.repeats = 0;
            self.snapshot = None;
            return None;
        };

        if self.snapshot.as_ref() == Some(&current) {
            self.repeats += 1;
        } else {
            self.repeats = 0;
            self.snapshot = Some(current.clone());
        }
        self.last_ready = Some(current);

        if self.repeats >= self.required {
            self.snapshot.clone()
        } else {
            None
        }
    }

    /// Last ready sample, stable or not.
    #[must_use]
    pub fn last(&self) -> Option<&T> {
        self.last_ready.as_ref()
    }

    #[must_use]
    pub fn repeats(&self) -> u32 {
        self.repeats
    }
}

/// Sample at `policy.interval` until stable, out of budget, or cancelled.
pub async fn poll_until_stable<S: StabilitySampler>(
    sampler: &mut S,
    policy: &StabilityPolicy,
    cancel: &CancellationToken,
) -> PollOutcome<S::Output> {
    let started = Instant::now();
    let mut tracker = StabilityTracker::new(policy.required_samples);
    let mut attempts = 0u32;

    loop {
        if cancel.is_cancelled() {
            return PollOutcome::Cancelled;
        }

        attempts += 1;
        let sample = sampler.sample().await;
        let ready = sample.is_some();
        if let Some(stable) = tracker.observe(sample) {
            log::debug!(
                "Stable after {} samples ({:?})",
                attempts,
                started.elapsed()
            );
            return PollOutcome::Stable(stable);
        }
        log::debug!(
            "Sample {}: ready={}, repeats {}/{}",
            attempts,
            ready,
            tracker.repeats(),
            policy.required_samples
        );

        if started.elapsed() + policy.interval > policy.max_wait {
            log::warn!(
                "No stable sample within {:?} ({} samples)",
                policy.max_wait,
                attempts
            );
            return PollOutcome::TimedOut {
                last: tracker.last().cloned(),
            };
        }

        tokio::select! {
            () = cancel.cancelled() => return PollOutcome::Cancelled,
            () = tokio::time::sleep(policy.interval) => {}
        }
    }
}
