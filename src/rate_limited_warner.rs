//! Rate limiting for warnings about dropped events.

use std::{
    sync::atomic::{AtomicU64, Ordering},
    time::{Duration, Instant},
};

/// Default minimum spacing between two warnings.
pub const DEFAULT_WARN_INTERVAL: Duration = Duration::from_secs(5);

const NEVER: u64 = u64::MAX;

/// Counts dropped events and reports them at most once per interval.
///
/// Callers bump the counter with [`record_drop`](Self::record_drop). The next
/// [`warn_if_due`](Self::warn_if_due) after the interval has elapsed hands the
/// accumulated count to the callback and resets it. [`flush`](Self::flush)
/// reports immediately.
pub(crate) struct RateLimitedWarner {
    interval: Duration,
    origin: Instant,
    last_warn_ms: AtomicU64,
    dropped: AtomicU64,
}

impl RateLimitedWarner {
    /// The first warning may be emitted immediately.
    pub(crate) fn new(interval: Duration) -> Self {
        Self {
            interval,
            origin: Instant::now(),
            last_warn_ms: AtomicU64::new(NEVER),
            dropped: AtomicU64::new(0),
        }
    }

    pub(crate) fn record_drop(&self) {
        self.dropped.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn pending(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }

    pub(crate) fn warn_if_due(&self, warn: impl FnOnce(u64)) {
        let now = self.elapsed_ms();
        let prev = self.last_warn_ms.load(Ordering::Relaxed);
        let interval = u64::try_from(self.interval.as_millis()).unwrap_or(u64::MAX);
        if prev != NEVER && now.saturating_sub(prev) < interval {
            return;
        }
        if self
            .last_warn_ms
            .compare_exchange(prev, now, Ordering::AcqRel, Ordering::Relaxed)
            .is_err()
        {
            return;
        }
        let count = self.dropped.swap(0, Ordering::Relaxed);
        if count > 0 {
            warn(count);
        }
    }

    pub(crate) fn flush(&self, warn: impl FnOnce(u64)) {
        let count = self.dropped.swap(0, Ordering::Relaxed);
        if count > 0 {
            warn(count);
            self.last_warn_ms.store(self.elapsed_ms(), Ordering::Relaxed);
        }
    }

    fn elapsed_ms(&self) -> u64 {
        u64::try_from(self.origin.elapsed().as_millis()).unwrap_or(NEVER - 1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    fn emits_first_warning_immediately() {
        let warner = RateLimitedWarner::new(DEFAULT_WARN_INTERVAL);
        let mut warnings = Vec::new();
        warner.record_drop();
        warner.warn_if_due(|c| warnings.push(c));
        assert_eq!(warnings, vec![1]);
    }

    #[rstest]
    fn rate_limits_subsequent_warnings() {
        let warner = RateLimitedWarner::new(DEFAULT_WARN_INTERVAL);
        let mut warnings = Vec::new();
        warner.record_drop();
        warner.warn_if_due(|c| warnings.push(c));
        warner.record_drop();
        warner.record_drop();
        warner.warn_if_due(|c| warnings.push(c));
        assert_eq!(warnings, vec![1]);
        assert_eq!(warner.pending(), 2);
    }

    #[rstest]
    fn zero_interval_never_suppresses() {
        let warner = RateLimitedWarner::new(Duration::ZERO);
        let mut warnings = Vec::new();
        for _ in 0..3 {
            warner.record_drop();
            warner.warn_if_due(|c| warnings.push(c));
        }
        assert_eq!(warnings, vec![1, 1, 1]);
    }

    #[rstest]
    fn flush_emits_pending_warning() {
        let warner = RateLimitedWarner::new(DEFAULT_WARN_INTERVAL);
        let mut warnings = Vec::new();
        warner.record_drop();
        warner.warn_if_due(|c| warnings.push(c));
        warner.record_drop();
        warner.flush(|c| warnings.push(c));
        assert_eq!(warnings, vec![1, 1]);
        assert_eq!(warner.pending(), 0);
    }
}
