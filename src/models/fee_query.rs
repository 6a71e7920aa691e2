use serde::{Deserialize, Serialize};

pub const DEFAULT_LIST_LIMIT: u32 = 20;
pub const MAX_LIST_LIMIT: u32 = 50;

/// Paginated range listing over the `(symbol, trx_time)` index.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeeQuery {
    /// Empty lists the tracked symbol.
    #[serde(default)]
    pub symbol: String,
    #[serde(default)]
    pub start_time: u64,
    /// Zero means no upper bound.
    #[serde(default)]
    pub end_time: u64,
    #[serde(default)]
    pub page: u32,
    #[serde(default)]
    pub limit: u32,
}

impl FeeQuery {
    /// Out of range limits fall back to the default rather than the maximum.
    pub fn effective_limit(&self) -> u32 {
        if self.limit == 0 || self.limit > MAX_LIST_LIMIT {
            DEFAULT_LIST_LIMIT
        } else {
            self.limit
        }
    }

    pub fn offset(&self) -> u64 {
        self.page as u64 * self.effective_limit() as u64
    }

    pub fn upper_time(&self) -> u64 {
        if self.end_time == 0 {
            i64::MAX as u64
        } else {
            self.end_time
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn query(page: u32, limit: u32) -> FeeQuery {
        FeeQuery {
            symbol: "WETH/USDC".to_string(),
            page,
            limit,
            ..Default::default()
        }
    }

    #[test]
    fn test_limit_defaults_and_clamps() {
        assert_eq!(query(0, 0).effective_limit(), 20);
        assert_eq!(query(0, 1000).effective_limit(), 20);
        assert_eq!(query(0, 51).effective_limit(), 20);
        assert_eq!(query(0, 50).effective_limit(), 50);
        assert_eq!(query(0, 7).effective_limit(), 7);
    }

    #[test]
    fn test_offset_uses_effective_limit() {
        assert_eq!(query(0, 10).offset(), 0);
        assert_eq!(query(3, 10).offset(), 30);
        assert_eq!(query(2, 0).offset(), 40);
    }

    #[test]
    fn test_zero_end_time_is_unbounded() {
        assert_eq!(query(0, 0).upper_time(), i64::MAX as u64);
        let bounded = FeeQuery { end_time: 99, ..query(0, 0) };
        assert_eq!(bounded.upper_time(), 99);
    }
}
