//! Trailing-window rate limiter for LLM calls
//!
//! The window keeps one timestamp per admitted call. Timestamps 60 seconds or
//! older are evicted on every check; when the window is full the caller sleeps
//! until the oldest entry ages out and checks again.
//!
//! One [`RateLimiter`] is built per pipeline run and shared with every component
//! that calls the LLM.

use std::collections::VecDeque;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::time::Instant;
use tracing::debug;

use crate::DEFAULT_RPM;

/// Length of the trailing window
pub const WINDOW: Duration = Duration::from_secs(60);

/// Timestamps of admitted calls within the trailing window
#[derive(Debug, Clone)]
pub struct RateWindow {
    rpm: usize,
    calls: VecDeque<Instant>,
}

impl RateWindow {
    /// Create a window admitting `rpm` calls per minute (at least one)
    pub fn new(rpm: u32) -> Self {
        let rpm = rpm.max(1) as usize;
        Self {
            rpm,
            calls: VecDeque::with_capacity(rpm),
        }
    }

    pub fn rpm(&self) -> usize {
        self.rpm
    }

    /// Drop timestamps that have left the window as of `now`
    pub fn evict(&mut self, now: Instant) {
        while let Some(&oldest) = self.calls.front() {
            if now.saturating_duration_since(oldest) >= WINDOW {
                self.calls.pop_front();
            } else {
                break;
            }
        }
    }

    /// Admit a call at `now`, or return how long to wait before retrying
    pub fn try_acquire(&mut self, now: Instant) -> Result<(), Duration> {
        self.evict(now);

        if self.calls.len() >= self.rpm {
            if let Some(&oldest) = self.calls.front() {
                let age = now.saturating_duration_since(oldest);
                return Err(WINDOW.saturating_sub(age));
            }
        }

        self.calls.push_back(now);
        Ok(())
    }

    /// Calls currently counted against the window
    pub fn len(&self) -> usize {
        self.calls.len()
    }

    pub fn is_empty(&self) -> bool {
        self.calls.is_empty()
    }
}

/// Blocking limiter shared across LLM-calling components
#[derive(Debug)]
pub struct RateLimiter {
    window: Mutex<RateWindow>,
}

impl Default for RateLimiter {
    fn default() -> Self {
        Self::new(DEFAULT_RPM)
    }
}

impl RateLimiter {
    pub fn new(rpm: u32) -> Self {
        Self {
            window: Mutex::new(RateWindow::new(rpm)),
        }
    }

    pub fn rpm(&self) -> usize {
        self.window.lock().rpm()
    }

    /// Wait until one more call fits in the window, then record it.
    ///
    /// Call immediately before each LLM request.
    pub async fn allow(&self) {
        loop {
            let wait = match self.window.lock().try_acquire(Instant::now()) {
                Ok(()) => return,
                Err(wait) => wait,
            };

            debug!("Rate window full, waiting {:?}", wait);
            tokio::time::sleep(wait).await;
        }
    }

    /// Calls still inside the window as of now
    pub fn in_window(&self) -> usize {
        let mut window = self.window.lock();
        window.evict(Instant::now());
        window.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_window_admits_up_to_rpm() {
        let start = Instant::now();
        let mut window = RateWindow::new(3);

        assert!(window.try_acquire(start).is_ok());
        assert!(window.try_acquire(start + Duration::from_secs(1)).is_ok());
        assert!(window.try_acquire(start + Duration::from_secs(2)).is_ok());

        let wait = window.try_acquire(start + Duration::from_secs(10)).unwrap_err();
        assert_eq!(wait, Duration::from_secs(50));
        assert_eq!(window.len(), 3);
    }

    #[test]
    fn test_window_evicts_old_calls() {
        let start = Instant::now();
        let mut window = RateWindow::new(2);
        window.try_acquire(start).unwrap();
        window.try_acquire(start + Duration::from_secs(30)).unwrap();

        window.evict(start + Duration::from_secs(60));
        assert_eq!(window.len(), 1);

        window.evict(start + Duration::from_secs(91));
        assert!(window.is_empty());
    }

    #[test]
    fn test_zero_rpm_admits_one() {
        let start = Instant::now();
        let mut window = RateWindow::new(0);
        assert_eq!(window.rpm(), 1);
        assert!(window.try_acquire(start).is_ok());
        assert!(window.try_acquire(start).is_err());
        assert_eq!(RateLimiter::new(0).rpm(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_rpm_calls_do_not_block() {
        let limiter = RateLimiter::new(15);
        let start = Instant::now();

        for _ in 0..15 {
            limiter.allow().await;
        }

        assert_eq!(start.elapsed(), Duration::ZERO);
        assert_eq!(limiter.in_window(), 15);
    }

    #[tokio::test(start_paused = true)]
    async fn test_call_over_rpm_blocks_until_window_frees() {
        let limiter = RateLimiter::new(15);
        let start = Instant::now();

        for _ in 0..15 {
            limiter.allow().await;
        }
        limiter.allow().await;

        assert!(start.elapsed() >= WINDOW);
        assert!(limiter.in_window() <= 15);
    }

    #[tokio::test(start_paused = true)]
    async fn test_idle_window_empties() {
        let limiter = RateLimiter::new(15);
        for _ in 0..15 {
            limiter.allow().await;
        }

        tokio::time::advance(Duration::from_secs(61)).await;
        assert_eq!(limiter.in_window(), 0);

        let before = Instant::now();
        limiter.allow().await;
        assert_eq!(before.elapsed(), Duration::ZERO);
    }
}
