use bigdecimal::BigDecimal;
use serde::{Deserialize, Serialize};
use sqlx::{postgres::PgRow, FromRow, Row};

use crate::utils::math::fee_in_quote;

/// Gas data of one mined transaction, decoded from the explorer payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrxGas {
    pub trx_hash: String,
    pub trx_time: u64,
    pub gas_used: u64,
    pub gas_price_wei: u64,
    pub block_number: u64,
}

/// A transaction fee priced in the quote currency. `(symbol, trx_hash)` is unique in the store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeeRecord {
    pub symbol: String,
    pub trx_hash: String,
    pub trx_time: u64,
    pub gas_used: u64,
    pub gas_price_wei: u64,
    pub block_number: u64,
    pub quote_price: BigDecimal,
    pub fee_in_quote: BigDecimal,
}

impl FeeRecord {
    pub fn new(symbol: &str, gas: TrxGas, quote_price: BigDecimal) -> Self {
        let fee = fee_in_quote(gas.gas_used, gas.gas_price_wei, &quote_price);
        Self {
            symbol: symbol.to_string(),
            trx_hash: gas.trx_hash,
            trx_time: gas.trx_time,
            gas_used: gas.gas_used,
            gas_price_wei: gas.gas_price_wei,
            block_number: gas.block_number,
            quote_price,
            fee_in_quote: fee,
        }
    }

    /// Prices a whole batch with a single quote.
    pub fn batch(symbol: &str, batch: Vec<TrxGas>, quote_price: &BigDecimal) -> Vec<Self> {
        batch
            .into_iter()
            .map(|gas| Self::new(symbol, gas, quote_price.clone()))
            .collect()
    }

    pub fn key(&self) -> (String, String) {
        (self.symbol.clone(), self.trx_hash.clone())
    }
}

// Postgres has no unsigned integers; counters are stored as BIGINT.
impl<'r> FromRow<'r, PgRow> for FeeRecord {
    fn from_row(row: &'r PgRow) -> Result<Self, sqlx::Error> {
        Ok(Self {
            symbol: row.try_get("symbol")?,
            trx_hash: row.try_get("trx_hash")?,
            trx_time: to_unsigned(row, "trx_time")?,
            gas_used: to_unsigned(row, "gas_used")?,
            gas_price_wei: to_unsigned(row, "gas_price_wei")?,
            block_number: to_unsigned(row, "block_number")?,
            quote_price: row.try_get("quote_price")?,
            fee_in_quote: row.try_get("fee_in_quote")?,
        })
    }
}

pub(crate) fn to_unsigned(row: &PgRow, column: &str) -> Result<u64, sqlx::Error> {
    let value: i64 = row.try_get(column)?;
    u64::try_from(value).map_err(|e| sqlx::Error::ColumnDecode {
        index: column.to_string(),
        source: Box::new(e),
    })
}
