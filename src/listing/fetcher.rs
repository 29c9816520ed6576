//! One-page fetch with a bounded retry loop.
//!
//! Attempt state machine: attempt → success, or retryable failure → backoff →
//! attempt again while budget remains → definitive [FetchError::Exhausted].
//! Every failure class (transport, non-success status, malformed body) is retried.

use crate::listing::client::Transport;
use crate::listing::error::{AttemptError, FetchError};
use crate::listing::page::Page;
use crate::listing::ListingTarget;
use crate::model::Cursor;
use std::time::Duration;
use tracing::{debug, error, warn};

/// Attempt budget per page (initial attempt plus retries).
const DEFAULT_MAX_ATTEMPTS: u32 = 5;
const DEFAULT_BASE_DELAY_MS: u64 = 1000;
const DEFAULT_MAX_DELAY_MS: u64 = 30_000;
const DEFAULT_MULTIPLIER: f64 = 2.0;
const DEFAULT_JITTER_FACTOR: f64 = 0.1;

/// Attempt budget and backoff shape.
///
/// Delay before retry `n` (0-based) is `base_delay * multiplier^n`, capped at
/// `max_delay`, plus up to `jitter_factor` of that again. `multiplier = 1.0` with
/// no jitter gives a fixed delay.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub multiplier: f64,
    pub max_delay: Duration,
    pub jitter_factor: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            base_delay: Duration::from_millis(DEFAULT_BASE_DELAY_MS),
            multiplier: DEFAULT_MULTIPLIER,
            max_delay: Duration::from_millis(DEFAULT_MAX_DELAY_MS),
            jitter_factor: DEFAULT_JITTER_FACTOR,
        }
    }
}

impl RetryPolicy {
    /// Same delay before every retry, no jitter.
    pub fn fixed(max_attempts: u32, delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            base_delay: delay,
            multiplier: 1.0,
            max_delay: delay,
            jitter_factor: 0.0,
        }
    }

    /// Delay to sleep before retry number `retry` (0 = before the second attempt).
    pub fn delay_for(&self, retry: u32) -> Duration {
        let base_ms = self.base_delay.as_millis() as f64;
        let max_ms = self.max_delay.as_millis() as u64;
        let multiplier = if self.multiplier.is_finite() && self.multiplier >= 1.0 {
            self.multiplier
        } else {
            1.0
        };
        let exp_ms = base_ms * multiplier.powi(retry.min(32) as i32);
        let capped_ms = if exp_ms.is_finite() {
            (exp_ms as u64).min(max_ms)
        } else {
            max_ms
        };

        let jitter_factor = self.jitter_factor.clamp(0.0, 1.0);
        let jitter_range = (capped_ms as f64 * jitter_factor) as u64;
        let jitter = if jitter_range == 0 {
            0
        } else {
            fastrand::u64(0..=jitter_range)
        };
        Duration::from_millis(capped_ms.saturating_add(jitter))
    }
}

/// Anything that can produce listing pages for a cursor. The walker depends only on this.
pub trait PageSource {
    fn fetch_page(&mut self, cursor: Option<&Cursor>) -> Result<Page, FetchError>;
}

/// Fetches listing pages for one target over a [Transport], retrying per [RetryPolicy].
#[derive(Debug)]
pub struct Fetcher<T> {
    transport: T,
    target: ListingTarget,
    policy: RetryPolicy,
}

impl<T: Transport> Fetcher<T> {
    pub fn new(transport: T, target: ListingTarget, policy: RetryPolicy) -> Self {
        Self {
            transport,
            target,
            policy,
        }
    }

    #[cfg(test)]
    pub(crate) fn transport(&self) -> &T {
        &self.transport
    }

    /// Fetch and decode one page, retrying until the attempt budget is spent.
    pub fn fetch(&mut self, cursor: Option<&Cursor>) -> Result<Page, FetchError> {
        let url = self.target.page_url(cursor);
        let max_attempts = self.policy.max_attempts.max(1);
        let mut attempt = 1;
        loop {
            match self.attempt(&url) {
                Ok((status, page)) => {
                    debug!(url = %url, attempt, status, posts = page.len(), "listing page fetched");
                    return Ok(page);
                }
                Err(e) if attempt < max_attempts => {
                    let delay = self.policy.delay_for(attempt - 1);
                    warn!(
                        url = %url,
                        attempt,
                        max_attempts,
                        error = %e,
                        retry_in_ms = delay.as_millis() as u64,
                        "listing fetch attempt failed; retrying"
                    );
                    std::thread::sleep(delay);
                    attempt += 1;
                }
                Err(e) => {
                    error!(url = %url, attempts = attempt, error = %e, "listing fetch failed; max retries exceeded");
                    return Err(FetchError::Exhausted {
                        url,
                        attempts: attempt,
                        last: e,
                    });
                }
            }
        }
    }

    fn attempt(&mut self, url: &str) -> Result<(u16, Page), AttemptError> {
        let response = self.transport.get(url)?;
        if !response.is_success() {
            return Err(AttemptError::Status {
                status: response.status,
            });
        }
        let page = Page::from_json(&response.body).map_err(|e| AttemptError::Malformed {
            reason: e.to_string(),
        })?;
        Ok((response.status, page))
    }
}

impl<T: Transport> PageSource for Fetcher<T> {
    fn fetch_page(&mut self, cursor: Option<&Cursor>) -> Result<Page, FetchError> {
        self.fetch(cursor)
    }
}
