use super::errors::ConfigError;
use governor::clock::{Clock, DefaultClock};
use governor::{DefaultDirectRateLimiter, Quota};
use std::num::NonZeroU32;
use std::sync::Arc;
use std::time::Duration;

/// Shared ceiling on how many delete calls may start per second.
///
/// Independent of the concurrency limit: the worker pool bounds how many
/// deletions are in flight, this bounds how fast new ones are issued. Cloning
/// shares the underlying quota.
#[derive(Clone)]
pub struct DeleteRateLimiter {
    quota: Arc<DefaultDirectRateLimiter>,
    deletes_per_second: NonZeroU32,
}

impl std::fmt::Debug for DeleteRateLimiter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "DeleteRateLimiter({}/s)", self.deletes_per_second)
    }
}

impl DeleteRateLimiter {
    /// Admit `deletes_per_second` deletes per second, bursting up to the same amount
    pub fn per_second(deletes_per_second: u32) -> Result<Self, ConfigError> {
        let Some(rate) = NonZeroU32::new(deletes_per_second) else {
            return Err(ConfigError::DeleteRate {
                configured: deletes_per_second,
            });
        };

        Ok(Self {
            quota: Arc::new(DefaultDirectRateLimiter::direct(Quota::per_second(rate))),
            deletes_per_second: rate,
        })
    }

    /// Take a slot if one is free right now
    pub fn try_acquire(&self) -> Result<(), RateLimitError> {
        self.quota.check().map_err(|not_until| RateLimitError::Throttled {
            retry_after: not_until.wait_time_from(DefaultClock::default().now()),
        })
    }

    /// Take a slot, waiting for one to free up if necessary
    pub async fn acquire(&self) {
        if let Err(RateLimitError::Throttled { retry_after }) = self.try_acquire() {
            log::debug!("Delete rate limit reached, next slot in {retry_after:?}");
            self.quota.until_ready().await;
        }
    }

    pub fn deletes_per_second(&self) -> u32 {
        self.deletes_per_second.get()
    }
}

#[derive(Debug, thiserror::Error)]
pub enum RateLimitError {
    #[error("Delete rate limit reached, retry after {retry_after:?}")]
    Throttled { retry_after: Duration },
}
