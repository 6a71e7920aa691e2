use governor::{DefaultDirectRateLimiter, Quota, RateLimiter as GovernorRateLimiter};
use std::fmt;
use std::num::NonZeroU32;
use std::time::Instant;
use tracing::{debug, info};

/// Steady-rate gate in front of one external API.
///
/// Burst capacity is one cell, so calls are spaced evenly at `1 / rate`
/// instead of releasing a full second's worth at once. Shared through an
/// `Arc` by every task that talks to the same API.
pub struct RateLimiter {
    name: String,
    per_second: u32,
    limiter: DefaultDirectRateLimiter,
}

impl RateLimiter {
    pub fn per_second(name: &str, per_second: u32) -> Self {
        let rate = NonZeroU32::new(per_second).unwrap_or(NonZeroU32::MIN);
        let quota = Quota::per_second(rate).allow_burst(NonZeroU32::MIN);

        info!(limiter = name, rps_limit = rate.get(), "Initialized rate limiter");

        Self {
            name: name.to_string(),
            per_second: rate.get(),
            limiter: GovernorRateLimiter::direct(quota),
        }
    }

    /// Waits until one more call may be made. Never fails.
    pub async fn acquire(&self) {
        let wait_start = Instant::now();
        self.limiter.until_ready().await;

        let waited = wait_start.elapsed();
        if waited.as_millis() > 500 {
            debug!(limiter = %self.name, wait_ms = waited.as_millis() as u64, "Rate limiter wait");
        }
    }

    pub fn per_second_limit(&self) -> u32 {
        self.per_second
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

impl fmt::Debug for RateLimiter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RateLimiter")
            .field("name", &self.name)
            .field("per_second", &self.per_second)
            .finish()
    }
}
