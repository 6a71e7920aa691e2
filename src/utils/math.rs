use bigdecimal::BigDecimal;
use num_traits::Zero;

/// 10^18, the number of wei in one native unit.
pub fn wei_per_native() -> BigDecimal {
    BigDecimal::from(1_000_000_000_000_000_000u64)
}

/// `(gas_price_wei / 1e18) * gas_used * quote_price`
pub fn fee_in_quote(gas_used: u64, gas_price_wei: u64, quote_price: &BigDecimal) -> BigDecimal {
    // Multiply before dividing so the only inexact step is the final division.
    let cost_wei = BigDecimal::from(gas_price_wei) * BigDecimal::from(gas_used);
    (cost_wei * quote_price / wei_per_native()).normalized()
}

/// Mean of every open and close price: `sum(open + close) / (2 * n)`.
pub fn average_open_close(samples: &[(BigDecimal, BigDecimal)]) -> Option<BigDecimal> {
    if samples.is_empty() {
        return None;
    }

    let sum = samples
        .iter()
        .fold(BigDecimal::zero(), |acc, (open, close)| acc + open + close);
    let count = BigDecimal::from(samples.len() as u64 * 2);
    Some((sum / count).normalized())
}
