use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{postgres::PgRow, FromRow, Row};

use super::fee_record::to_unsigned;

/// Highest block whose transactions the historical loop has durably recorded for `symbol`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BlockBookmark {
    pub symbol: String,
    pub max_block: u64,
    pub updated_at: DateTime<Utc>,
}

impl BlockBookmark {
    pub fn new(symbol: &str, max_block: u64) -> Self {
        Self {
            symbol: symbol.to_string(),
            max_block,
            updated_at: Utc::now(),
        }
    }

    /// Never moves the bookmark backwards.
    pub fn advance(&mut self, max_block: u64) {
        if max_block > self.max_block {
            self.max_block = max_block;
        }
        self.updated_at = Utc::now();
    }
}

impl<'r> FromRow<'r, PgRow> for BlockBookmark {
    fn from_row(row: &'r PgRow) -> Result<Self, sqlx::Error> {
        Ok(Self {
            symbol: row.try_get("symbol")?,
            max_block: to_unsigned(row, "max_block")?,
            updated_at: row.try_get("updated_at")?,
        })
    }
}
