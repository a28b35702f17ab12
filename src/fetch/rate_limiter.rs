//! Per-agent rate limiting for outbound fetches.
//!
//! This module provides the [`RateLimiter`] struct which bounds how many
//! operations one agent may have in flight and how closely successive
//! operations may start, so catalog sites are not hammered.
//!
//! # Overview
//!
//! Every agent owns exactly one limiter for its whole lifetime. All fetches
//! the agent issues (from any stage, from any number of concurrent callers)
//! pass through [`RateLimiter::schedule`]. Limiters of different agents never
//! wait on each other.
//!
//! # Example
//!
//! ```
//! use std::time::Duration;
//! use aggregator_core::fetch::RateLimiter;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! // At most one request in flight, starts at least one second apart
//! let limiter = RateLimiter::new(1, Duration::from_secs(1))?;
//!
//! let first = limiter.schedule(|| async { "page one" }).await;
//! // Waits until one second after the first start
//! let second = limiter.schedule(|| async { "page two" }).await;
//! # let _ = (first, second);
//! # Ok(())
//! # }
//! ```

use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::time::Duration;

use tokio::sync::{Mutex, Semaphore};
use tokio::time::Instant;
use tracing::{debug, instrument, warn};

use super::error::LimiterError;

/// Warning threshold for cumulative throttling delay (30 seconds).
const CUMULATIVE_DELAY_WARNING_THRESHOLD: Duration = Duration::from_secs(30);

/// Concurrency and spacing throttle owned by a single agent.
///
/// Operations are admitted in submission order. An operation that would
/// exceed `max_concurrent` or start sooner than `min_time` after the previous
/// start waits; it is never rejected, and there is no queue limit or timeout.
/// Whatever the operation returns, errors included, is handed back unchanged.
///
/// Dropping a `schedule` future while it is still queued removes it from the
/// queue. Once admitted, the operation runs on its own task and holds its
/// slot until it completes, even if the caller stops waiting; its output is
/// then discarded.
#[derive(Debug)]
pub struct RateLimiter {
    /// Upper bound on simultaneous operations.
    max_concurrent: usize,

    /// Minimum time between successive operation starts.
    min_time: Duration,

    /// Whether throttling is disabled.
    disabled: bool,

    /// One permit per concurrent slot. Tokio's semaphore hands out permits
    /// in FIFO order, which gives submission-order admission.
    slots: Arc<Semaphore>,

    /// Start time of the most recent operation.
    /// `None` until the first operation starts (first start is immediate).
    last_start: Mutex<Option<Instant>>,

    /// Number of operations currently running.
    in_flight: Arc<AtomicUsize>,

    /// Total spacing delay applied so far, in milliseconds.
    cumulative_delay_ms: AtomicU64,
}

impl RateLimiter {
    /// Creates a limiter allowing `max_concurrent` simultaneous operations
    /// whose starts are at least `min_time` apart.
    ///
    /// # Errors
    ///
    /// Returns [`LimiterError::InvalidConcurrency`] when `max_concurrent` is 0.
    #[instrument(skip_all, fields(max_concurrent = max_concurrent, min_time_ms = min_time.as_millis()))]
    pub fn new(max_concurrent: usize, min_time: Duration) -> Result<Self, LimiterError> {
        if max_concurrent == 0 {
            return Err(LimiterError::InvalidConcurrency {
                value: max_concurrent,
            });
        }
        let max_concurrent = max_concurrent.min(Semaphore::MAX_PERMITS);
        debug!("creating rate limiter");
        Ok(Self::build(max_concurrent, min_time, false))
    }

    /// Creates a limiter that applies no concurrency bound and no spacing.
    #[must_use]
    #[instrument]
    pub fn disabled() -> Self {
        debug!("creating disabled rate limiter");
        Self::build(Semaphore::MAX_PERMITS, Duration::ZERO, true)
    }

    fn build(max_concurrent: usize, min_time: Duration, disabled: bool) -> Self {
        Self {
            max_concurrent,
            min_time,
            disabled,
            slots: Arc::new(Semaphore::new(max_concurrent)),
            last_start: Mutex::new(None),
            in_flight: Arc::new(AtomicUsize::new(0)),
            cumulative_delay_ms: AtomicU64::new(0),
        }
    }

    /// Returns whether throttling is disabled.
    #[must_use]
    pub fn is_disabled(&self) -> bool {
        self.disabled
    }

    /// Returns the configured concurrency bound.
    #[must_use]
    pub fn max_concurrent(&self) -> usize {
        self.max_concurrent
    }

    /// Returns the configured minimum spacing between starts.
    #[must_use]
    pub fn min_time(&self) -> Duration {
        self.min_time
    }

    /// Returns the number of operations currently running.
    #[must_use]
    pub fn in_flight(&self) -> usize {
        self.in_flight.load(Ordering::SeqCst)
    }

    /// Returns the total spacing delay applied so far.
    #[must_use]
    pub fn cumulative_delay(&self) -> Duration {
        Duration::from_millis(self.cumulative_delay_ms.load(Ordering::SeqCst))
    }

    /// Runs `operation` once a slot is free and the spacing bound allows.
    ///
    /// The operation's output is returned as-is; the limiter neither retries
    /// nor wraps failures. The admitted operation is spawned onto the runtime
    /// together with its slot, so abandoning this future does not cancel it.
    ///
    /// # Panics
    ///
    /// Re-raises a panic from the operation, and panics if the runtime shuts
    /// down before the operation finishes.
    ///
    /// # Example
    ///
    /// ```
    /// use std::time::Duration;
    /// use aggregator_core::fetch::RateLimiter;
    ///
    /// # async fn example() {
    /// let limiter = RateLimiter::disabled();
    /// let result: Result<u32, String> = limiter.schedule(|| async { Err("boom".to_string()) }).await;
    /// assert_eq!(result, Err("boom".to_string()));
    /// # }
    /// ```
    #[instrument(level = "debug", skip_all)]
    pub async fn schedule<F, Fut, T>(&self, operation: F) -> T
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = T> + Send + 'static,
        T: Send + 'static,
    {
        let permit = if self.disabled {
            None
        } else {
            // The semaphore is owned by this limiter and never closed, so
            // acquisition only fails if that invariant is broken.
            let permit = Arc::clone(&self.slots).acquire_owned().await.ok();
            self.wait_for_spacing().await;
            permit
        };

        let running = InFlight::enter(Arc::clone(&self.in_flight));
        let pending = operation();
        let task = tokio::spawn(async move {
            let _permit = permit;
            let _running = running;
            pending.await
        });

        match task.await {
            Ok(output) => output,
            Err(error) if error.is_panic() => std::panic::resume_unwind(error.into_panic()),
            Err(error) => panic!("scheduled operation did not finish: {error}"),
        }
    }

    /// Waits until `min_time` has passed since the previous start, then
    /// records a new start. The lock is held while sleeping so that waiters
    /// start in queue order.
    async fn wait_for_spacing(&self) {
        let mut last_start = self.last_start.lock().await;

        if let Some(previous) = *last_start {
            let elapsed = previous.elapsed();
            if elapsed < self.min_time {
                let delay = self.min_time.saturating_sub(elapsed);
                let cumulative = self.add_cumulative_delay(delay);

                debug!(
                    delay_ms = delay.as_millis(),
                    cumulative_ms = cumulative.as_millis(),
                    "applying rate limit delay"
                );

                if cumulative >= CUMULATIVE_DELAY_WARNING_THRESHOLD
                    && cumulative.saturating_sub(delay) < CUMULATIVE_DELAY_WARNING_THRESHOLD
                {
                    warn!(
                        cumulative_delay_secs = cumulative.as_secs(),
                        "excessive rate limiting - consider reducing request volume for this agent"
                    );
                }

                tokio::time::sleep(delay).await;
            }
        } else {
            debug!("first operation - no delay");
        }

        *last_start = Some(Instant::now());
    }

    #[allow(clippy::cast_possible_truncation)]
    fn add_cumulative_delay(&self, delay: Duration) -> Duration {
        let delay_ms = delay.as_millis() as u64;
        let new_total = self
            .cumulative_delay_ms
            .fetch_add(delay_ms, Ordering::SeqCst)
            + delay_ms;
        Duration::from_millis(new_total)
    }
}

/// Counts an operation as in flight until dropped.
struct InFlight(Arc<AtomicUsize>);

impl InFlight {
    fn enter(counter: Arc<AtomicUsize>) -> Self {
        counter.fetch_add(1, Ordering::SeqCst);
        Self(counter)
    }
}

impl Drop for InFlight {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::Arc;
    use std::sync::Mutex as StdMutex;

    use super::*;
    use crate::fetch::FetchError;

    // ==================== Construction Tests ====================

    #[test]
    fn test_rate_limiter_new_keeps_configuration() {
        let limiter = RateLimiter::new(3, Duration::from_millis(500)).unwrap();
        assert_eq!(limiter.max_concurrent(), 3);
        assert_eq!(limiter.min_time(), Duration::from_millis(500));
        assert!(!limiter.is_disabled());
        assert_eq!(limiter.in_flight(), 0);
    }

    #[test]
    fn test_rate_limiter_rejects_zero_concurrency() {
        let result = RateLimiter::new(0, Duration::from_millis(100));
        assert_eq!(
            result.unwrap_err(),
            LimiterError::InvalidConcurrency { value: 0 }
        );
    }

    #[test]
    fn test_rate_limiter_disabled_has_zero_spacing() {
        let limiter = RateLimiter::disabled();
        assert_eq!(limiter.min_time(), Duration::ZERO);
        assert!(limiter.is_disabled());
    }

    // ==================== Spacing Tests ====================

    #[tokio::test]
    async fn test_rate_limiter_first_operation_no_delay() {
        tokio::time::pause();

        let limiter = RateLimiter::new(1, Duration::from_secs(1)).unwrap();
        let start = Instant::now();

        limiter.schedule(|| async {}).await;

        assert!(start.elapsed() < Duration::from_millis(10));
    }

    #[tokio::test]
    async fn test_rate_limiter_spaces_sequential_operations() {
        tokio::time::pause();

        let limiter = RateLimiter::new(1, Duration::from_secs(1)).unwrap();
        let start = Instant::now();

        limiter.schedule(|| async {}).await;
        assert!(start.elapsed() < Duration::from_millis(10));

        limiter.schedule(|| async {}).await;
        assert!(start.elapsed() >= Duration::from_secs(1));
        assert!(start.elapsed() < Duration::from_millis(1100));

        limiter.schedule(|| async {}).await;
        assert!(start.elapsed() >= Duration::from_secs(2));
        assert_eq!(limiter.cumulative_delay(), Duration::from_secs(2));
    }

    #[tokio::test]
    async fn test_rate_limiter_back_to_back_never_overlap_or_crowd() {
        tokio::time::pause();

        let limiter = RateLimiter::new(1, Duration::from_millis(1000)).unwrap();
        let spans: Arc<StdMutex<Vec<(Instant, Instant)>>> = Arc::default();

        let run = |recorded: Arc<StdMutex<Vec<(Instant, Instant)>>>| {
            move || async move {
                let began = Instant::now();
                tokio::time::sleep(Duration::from_millis(300)).await;
                recorded.lock().unwrap().push((began, Instant::now()));
            }
        };

        tokio::join!(
            limiter.schedule(run(Arc::clone(&spans))),
            limiter.schedule(run(Arc::clone(&spans)))
        );

        let spans = spans.lock().unwrap().clone();
        assert_eq!(spans.len(), 2);
        let (first_start, first_end) = spans[0];
        let (second_start, _) = spans[1];
        assert!(second_start >= first_end, "operations must not overlap");
        assert!(
            second_start.duration_since(first_start) >= Duration::from_millis(1000),
            "starts must be at least min_time apart"
        );
    }

    #[tokio::test]
    async fn test_rate_limiter_disabled_no_delay() {
        tokio::time::pause();

        let limiter = RateLimiter::disabled();
        let start = Instant::now();

        limiter.schedule(|| async {}).await;
        limiter.schedule(|| async {}).await;
        limiter.schedule(|| async {}).await;

        assert!(start.elapsed() < Duration::from_millis(10));
    }

    // ==================== Concurrency Tests ====================

    #[tokio::test]
    async fn test_rate_limiter_bounds_concurrency() {
        tokio::time::pause();

        let limiter = RateLimiter::new(2, Duration::ZERO).unwrap();
        let current = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));

        let run = || {
            let current = Arc::clone(&current);
            let peak = Arc::clone(&peak);
            move || async move {
                let now = current.fetch_add(1, Ordering::SeqCst) + 1;
                peak.fetch_max(now, Ordering::SeqCst);
                tokio::time::sleep(Duration::from_millis(100)).await;
                current.fetch_sub(1, Ordering::SeqCst);
            }
        };

        tokio::join!(
            limiter.schedule(run()),
            limiter.schedule(run()),
            limiter.schedule(run()),
            limiter.schedule(run()),
        );

        assert_eq!(peak.load(Ordering::SeqCst), 2);
        assert_eq!(limiter.in_flight(), 0);
    }

    #[tokio::test]
    async fn test_rate_limiter_admits_in_submission_order() {
        tokio::time::pause();

        let limiter = RateLimiter::new(1, Duration::from_millis(50)).unwrap();
        let order: Arc<StdMutex<Vec<u32>>> = Arc::default();

        let run = |n: u32| {
            let recorded = Arc::clone(&order);
            move || async move {
                recorded.lock().unwrap().push(n);
            }
        };

        tokio::join!(
            limiter.schedule(run(1)),
            limiter.schedule(run(2)),
            limiter.schedule(run(3)),
        );

        assert_eq!(*order.lock().unwrap(), vec![1, 2, 3]);
    }

    #[tokio::test]
    async fn test_rate_limiter_spacing_holds_with_spare_slots() {
        tokio::time::pause();

        let limiter = RateLimiter::new(2, Duration::from_millis(1000)).unwrap();
        let origin = Instant::now();

        let run = || {
            move || async move {
                let began = Instant::now();
                tokio::time::sleep(Duration::from_secs(5)).await;
                began
            }
        };

        let (a, b, c) = tokio::join!(
            limiter.schedule(run()),
            limiter.schedule(run()),
            limiter.schedule(run()),
        );

        let mut starts: Vec<Duration> = [a, b, c]
            .iter()
            .map(|began| began.duration_since(origin))
            .collect();
        starts.sort();

        // Second start waits only for spacing; third waits for a free slot.
        assert!(starts[0] < Duration::from_millis(10));
        assert!(starts[1] >= Duration::from_millis(1000));
        assert!(starts[1] < Duration::from_millis(1100));
        assert!(starts[2] >= Duration::from_millis(5000));
        assert!(starts[2] < Duration::from_millis(5100));
    }

    // ==================== Abandonment Tests ====================

    #[tokio::test]
    async fn test_rate_limiter_abandoned_operation_runs_to_completion() {
        tokio::time::pause();

        let limiter = RateLimiter::new(1, Duration::ZERO).unwrap();
        let finished = Arc::new(AtomicUsize::new(0));

        let flag = Arc::clone(&finished);
        let waited = tokio::time::timeout(
            Duration::from_millis(100),
            limiter.schedule(move || async move {
                tokio::time::sleep(Duration::from_millis(500)).await;
                flag.store(1, Ordering::SeqCst);
            }),
        )
        .await;
        assert!(waited.is_err(), "caller should give up before the operation ends");
        assert_eq!(limiter.in_flight(), 1);

        tokio::time::sleep(Duration::from_secs(2)).await;

        assert_eq!(finished.load(Ordering::SeqCst), 1);
        assert_eq!(limiter.in_flight(), 0);
    }

    #[tokio::test]
    async fn test_rate_limiter_abandoned_operation_keeps_its_slot() {
        tokio::time::pause();

        let limiter = RateLimiter::new(1, Duration::ZERO).unwrap();
        let origin = Instant::now();

        let abandoned = tokio::time::timeout(
            Duration::from_millis(100),
            limiter.schedule(|| tokio::time::sleep(Duration::from_millis(500))),
        )
        .await;
        assert!(abandoned.is_err());

        let next_start = limiter.schedule(|| async { Instant::now() }).await;
        assert!(next_start.duration_since(origin) >= Duration::from_millis(500));
    }

    #[tokio::test]
    async fn test_rate_limiter_queued_caller_can_leave_without_running() {
        tokio::time::pause();

        let limiter = RateLimiter::new(1, Duration::from_secs(1)).unwrap();
        limiter.schedule(|| async {}).await;

        let ran = Arc::new(AtomicUsize::new(0));
        let flag = Arc::clone(&ran);
        let left = tokio::time::timeout(
            Duration::from_millis(100),
            limiter.schedule(move || async move {
                flag.store(1, Ordering::SeqCst);
            }),
        )
        .await;
        assert!(left.is_err());

        tokio::time::sleep(Duration::from_secs(2)).await;
        assert_eq!(ran.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_rate_limiter_shared_across_tasks() {
        tokio::time::pause();

        let limiter = Arc::new(RateLimiter::new(1, Duration::from_millis(500)).unwrap());
        let start = Instant::now();

        let mut handles = Vec::new();
        for _ in 0..3 {
            let limiter = Arc::clone(&limiter);
            handles.push(tokio::spawn(async move {
                limiter.schedule(|| async { Instant::now() }).await
            }));
        }

        let mut starts = Vec::new();
        for handle in handles {
            starts.push(handle.await.unwrap());
        }
        starts.sort();

        assert!(starts[0].duration_since(start) < Duration::from_millis(10));
        assert!(starts[1].duration_since(starts[0]) >= Duration::from_millis(500));
        assert!(starts[2].duration_since(starts[1]) >= Duration::from_millis(500));
    }

    // ==================== Error Pass-through Tests ====================

    #[tokio::test]
    async fn test_rate_limiter_propagates_operation_error_unchanged() {
        let limiter = RateLimiter::new(1, Duration::ZERO).unwrap();

        let result: Result<String, FetchError> = limiter
            .schedule(|| async { Err(FetchError::http_status("https://example.com/x", 502)) })
            .await;

        match result {
            Err(FetchError::HttpStatus { url, status }) => {
                assert_eq!(url, "https://example.com/x");
                assert_eq!(status, 502);
            }
            other => panic!("unexpected result: {other:?}"),
        }
        assert_eq!(limiter.in_flight(), 0);
    }

    #[tokio::test]
    async fn test_rate_limiter_independent_instances() {
        tokio::time::pause();

        let a = RateLimiter::new(1, Duration::from_secs(1)).unwrap();
        let b = RateLimiter::new(1, Duration::from_secs(1)).unwrap();

        a.schedule(|| async {}).await;

        // A different limiter is not affected by `a`'s last start
        let start = Instant::now();
        b.schedule(|| async {}).await;
        assert!(start.elapsed() < Duration::from_millis(10));
    }
}
