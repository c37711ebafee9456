//! Process-wide outbound request gate.
//!
//! The limiter keeps the timestamps of the requests admitted during the last
//! window. A request is admitted once fewer than `limit` of them remain, so no
//! window-length interval ever contains more than `limit` requests.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use tokio::sync::Mutex;

/// Time source for the limiter and the scan loop
#[async_trait]
pub trait Clock: Send + Sync {
    fn now(&self) -> Instant;

    async fn sleep(&self, duration: Duration);
}

/// Wall clock backed by tokio timers
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

#[async_trait]
impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }

    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

/// Clock that only moves when told to. Sleeping advances it instantly.
#[derive(Debug)]
pub struct ManualClock {
    origin: Instant,
    offset_nanos: AtomicU64,
}

impl ManualClock {
    pub fn new() -> Self {
        Self { origin: Instant::now(), offset_nanos: AtomicU64::new(0) }
    }

    pub fn advance(&self, duration: Duration) {
        let nanos = u64::try_from(duration.as_nanos()).unwrap_or(u64::MAX);
        self.offset_nanos.fetch_add(nanos, Ordering::SeqCst);
    }

    /// Total time advanced since creation
    pub fn elapsed(&self) -> Duration {
        Duration::from_nanos(self.offset_nanos.load(Ordering::SeqCst))
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Clock for ManualClock {
    fn now(&self) -> Instant {
        self.origin + self.elapsed()
    }

    async fn sleep(&self, duration: Duration) {
        self.advance(duration);
        tokio::task::yield_now().await;
    }
}

/// Point-in-time view of the gate
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimiterState {
    /// Requests admitted within the current window
    pub request_count: usize,
    /// Admission time of the oldest request still in the window
    pub window_start: Instant,
    pub limit: usize,
    pub window_duration: Duration,
}

#[derive(Debug)]
struct SlidingWindow {
    limit: usize,
    window: Duration,
    stamps: VecDeque<Instant>,
}

impl SlidingWindow {
    fn evict(&mut self, now: Instant) {
        while let Some(&oldest) = self.stamps.front() {
            if now.saturating_duration_since(oldest) >= self.window {
                self.stamps.pop_front();
            } else {
                break;
            }
        }
    }

    /// How long a request arriving at `now` has to wait, if at all
    fn delay_at(&mut self, now: Instant) -> Option<Duration> {
        self.evict(now);
        if self.stamps.len() < self.limit {
            return None;
        }
        self.stamps
            .front()
            .map(|&oldest| (oldest + self.window).saturating_duration_since(now))
    }

    fn record(&mut self, now: Instant) {
        self.stamps.push_back(now);
    }
}

/// Shared request gate. Clone the `Arc` to share it between clients.
pub struct RateLimiter {
    window: Mutex<SlidingWindow>,
    clock: Arc<dyn Clock>,
}

impl RateLimiter {
    /// A `limit` of zero is raised to one
    pub fn new(limit: u32, window: Duration, clock: Arc<dyn Clock>) -> Self {
        let limit = usize::try_from(limit.max(1)).unwrap_or(usize::MAX);
        Self {
            window: Mutex::new(SlidingWindow {
                limit,
                window,
                stamps: VecDeque::with_capacity(limit.min(1024)),
            }),
            clock,
        }
    }

    /// Wait until a request may be sent and count it.
    ///
    /// The lock is held while sleeping, so concurrent callers queue up
    /// behind the one currently waiting.
    pub async fn acquire(&self) {
        let mut window = self.window.lock().await;
        loop {
            let now = self.clock.now();
            match window.delay_at(now) {
                None => {
                    window.record(now);
                    return;
                }
                Some(wait) => {
                    tracing::info!(
                        "Rate limit approaching, sleeping for {:.2} seconds",
                        wait.as_secs_f64()
                    );
                    self.clock.sleep(wait).await;
                }
            }
        }
    }

    pub async fn snapshot(&self) -> RateLimiterState {
        let mut window = self.window.lock().await;
        let now = self.clock.now();
        window.evict(now);
        RateLimiterState {
            request_count: window.stamps.len(),
            window_start: window.stamps.front().copied().unwrap_or(now),
            limit: window.limit,
            window_duration: window.window,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn limiter(limit: u32, window_secs: u64) -> (Arc<ManualClock>, RateLimiter) {
        let clock = Arc::new(ManualClock::new());
        let limiter = RateLimiter::new(limit, Duration::from_secs(window_secs), clock.clone());
        (clock, limiter)
    }

    #[tokio::test]
    async fn test_requests_under_limit_do_not_wait() {
        let (clock, limiter) = limiter(3, 10);
        for _ in 0..3 {
            limiter.acquire().await;
        }
        assert_eq!(clock.elapsed(), Duration::ZERO);

        let state = limiter.snapshot().await;
        assert_eq!(state.request_count, 3);
        assert_eq!(state.limit, 3);
        assert_eq!(state.window_duration, Duration::from_secs(10));
    }

    #[tokio::test]
    async fn test_request_over_limit_waits_for_oldest_to_expire() {
        let (clock, limiter) = limiter(2, 10);
        limiter.acquire().await;
        clock.advance(Duration::from_secs(4));
        limiter.acquire().await;

        limiter.acquire().await;
        // The first request leaves the window at t=10
        assert_eq!(clock.elapsed(), Duration::from_secs(10));

        let state = limiter.snapshot().await;
        assert_eq!(state.request_count, 2);
        assert_eq!(state.window_start, clock.now() - Duration::from_secs(6));
    }

    #[tokio::test]
    async fn test_window_empties_after_idle_period() {
        let (clock, limiter) = limiter(5, 10);
        for _ in 0..5 {
            limiter.acquire().await;
        }
        clock.advance(Duration::from_secs(30));

        let state = limiter.snapshot().await;
        assert_eq!(state.request_count, 0);
        assert_eq!(state.window_start, clock.now());
    }

    #[tokio::test]
    async fn test_zero_limit_is_raised_to_one() {
        let (clock, limiter) = limiter(0, 1);
        limiter.acquire().await;
        limiter.acquire().await;
        assert_eq!(clock.elapsed(), Duration::from_secs(1));
    }

    #[tokio::test]
    async fn test_concurrent_callers_share_the_gate() {
        let clock = Arc::new(ManualClock::new());
        let limiter = Arc::new(RateLimiter::new(4, Duration::from_secs(10), clock.clone()));

        let mut handles = Vec::new();
        for _ in 0..8 {
            let limiter = limiter.clone();
            handles.push(tokio::spawn(async move { limiter.acquire().await }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        assert_eq!(clock.elapsed(), Duration::from_secs(10));
        assert_eq!(limiter.snapshot().await.request_count, 4);
    }
}
