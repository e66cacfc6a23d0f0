//! Article fetching with a bounded retry budget.
//!
//! # Retry Strategy
//!
//! - At most `max_attempts` GETs (3 by default)
//! - 429/503: sleep `throttle_backoff * attempt` (1.5 s, 3 s, ...)
//! - transport errors and other non-2xx/3xx statuses: sleep
//!   `error_backoff * attempt` (1.2 s, 2.4 s, ...)
//! - the final attempt never sleeps; its failure is returned as a [`FetchError`]
//! - optional random jitter (`0..=jitter_ms`) is added to each sleep
//!
//! A cancellation request is honoured before every attempt and interrupts a
//! pending sleep.

use crate::config::RetryPolicy;
use crate::error::FetchError;
use crate::http::{HttpClient, HttpResponse};
use rand::{Rng, rng};
use std::time::{Duration, Instant};
use tokio::time::sleep;
use tokio_util::sync::CancellationToken;
use tracing::{debug, instrument, warn};

/// Retrying GET on top of any [`HttpClient`].
pub struct Fetcher<'a, C> {
    client: &'a C,
    policy: RetryPolicy,
}

impl<'a, C: HttpClient> Fetcher<'a, C> {
    pub fn new(client: &'a C, policy: RetryPolicy) -> Self {
        Self { client, policy }
    }

    /// Fetch `url`, retrying transient failures within the policy budget.
    #[instrument(level = "debug", skip(self, cancel))]
    pub async fn fetch(&self, url: &str, cancel: &CancellationToken) -> Result<HttpResponse, FetchError> {
        let max_attempts = self.policy.max_attempts.max(1);
        let total_t0 = Instant::now();
        let mut attempt = 0u32;

        loop {
            if cancel.is_cancelled() {
                return Err(FetchError::Cancelled);
            }
            attempt += 1;

            let (delay, failure) = match self.client.get(url).await {
                Ok(resp) if resp.is_throttled() => (
                    self.policy.throttle_delay(attempt),
                    FetchError::Throttled {
                        status: resp.status,
                        attempts: attempt,
                    },
                ),
                Ok(resp) if resp.is_success() => {
                    debug!(
                        attempt,
                        status = resp.status,
                        elapsed_ms_total = total_t0.elapsed().as_millis() as u64,
                        "Fetched"
                    );
                    return Ok(resp);
                }
                Ok(resp) => (
                    self.policy.error_delay(attempt),
                    FetchError::Status {
                        status: resp.status,
                        attempts: attempt,
                    },
                ),
                Err(source) => (
                    self.policy.error_delay(attempt),
                    FetchError::Transport {
                        source,
                        attempts: attempt,
                    },
                ),
            };

            if attempt >= max_attempts {
                warn!(
                    attempt,
                    max = max_attempts,
                    elapsed_ms_total = total_t0.elapsed().as_millis() as u64,
                    error = %failure,
                    "Fetch exhausted retries"
                );
                return Err(failure);
            }

            let delay = delay + self.jitter();
            warn!(attempt, max = max_attempts, ?delay, error = %failure, "Fetch attempt failed; backing off");
            tokio::select! {
                _ = cancel.cancelled() => return Err(FetchError::Cancelled),
                _ = sleep(delay) => {}
            }
        }
    }

    fn jitter(&self) -> Duration {
        if self.policy.jitter_ms == 0 {
            return Duration::ZERO;
        }
        Duration::from_millis(rng().random_range(0..=self.policy.jitter_ms))
    }
}
