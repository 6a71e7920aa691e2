use chrono::Utc;
use serde::{Deserialize, Serialize};

/// Half width of the price window around a single transaction, in seconds.
pub const SINGLE_TRX_HALF_WINDOW_SECS: u64 = 60;
/// Width of the trailing price window used by the live tail, in seconds.
pub const LIVE_WINDOW_SECS: u64 = 60;

/// Closed `[start, end]` interval of unix seconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeWindow {
    pub start: u64,
    pub end: u64,
}

impl TimeWindow {
    pub fn new(start: u64, end: u64) -> Self {
        Self { start, end }
    }

    pub fn start_millis(&self) -> u64 {
        self.start.saturating_mul(1000)
    }

    pub fn end_millis(&self) -> u64 {
        self.end.saturating_mul(1000)
    }

    /// `[t - 60, t + 60]`
    pub fn around(trx_time: u64) -> Self {
        Self::new(
            trx_time.saturating_sub(SINGLE_TRX_HALF_WINDOW_SECS),
            trx_time.saturating_add(SINGLE_TRX_HALF_WINDOW_SECS),
        )
    }

    /// `[now - 60, now]`
    pub fn trailing(now: u64) -> Self {
        Self::new(now.saturating_sub(LIVE_WINDOW_SECS), now)
    }

    /// Smallest window covering every timestamp; `None` for an empty batch.
    pub fn spanning<I: IntoIterator<Item = u64>>(times: I) -> Option<Self> {
        times.into_iter().fold(None, |window, t| match window {
            None => Some(Self::new(t, t)),
            Some(w) => Some(Self::new(w.start.min(t), w.end.max(t))),
        })
    }
}

pub fn now_unix() -> u64 {
    Utc::now().timestamp().max(0) as u64
}
