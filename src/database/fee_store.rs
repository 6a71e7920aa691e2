use async_trait::async_trait;
use bigdecimal::BigDecimal;
use sqlx::{PgConnection, PgPool, Postgres, QueryBuilder};
use tracing::{debug, info};

use crate::error::AppError;
use crate::models::{BlockBookmark, FeeQuery, FeeRecord};

/// Rows per INSERT statement; eight binds per row stays far below the 65535 bind limit.
const INSERT_CHUNK_ROWS: usize = 1000;

/// Persistence boundary for fee records and the backfill bookmark.
///
/// Implementations must serialize concurrent batch writes; the live and
/// historical loops write through the same handle.
#[async_trait]
pub trait FeeStore: Send + Sync {
    /// Inserts every record whose `(symbol, trx_hash)` is new and skips the rest.
    /// Returns the number of newly stored records.
    async fn batch_insert(&self, records: &[FeeRecord]) -> Result<u64, AppError>;

    /// `batch_insert` plus a bookmark upsert, committed as one unit.
    async fn record_backfill_progress(
        &self,
        records: &[FeeRecord],
        symbol: &str,
        max_block: u64,
    ) -> Result<u64, AppError>;

    /// 0 when the symbol has no bookmark yet.
    async fn get_max_block(&self, symbol: &str) -> Result<u64, AppError>;

    async fn get_by_hash(
        &self,
        symbol: &str,
        trx_hash: &str,
    ) -> Result<Option<FeeRecord>, AppError>;

    async fn list(&self, query: &FeeQuery) -> Result<Vec<FeeRecord>, AppError>;

    async fn close(&self);
}

struct FeeRow {
    symbol: String,
    trx_hash: String,
    trx_time: i64,
    gas_used: i64,
    gas_price_wei: i64,
    block_number: i64,
    quote_price: BigDecimal,
    fee_in_quote: BigDecimal,
}

impl TryFrom<&FeeRecord> for FeeRow {
    type Error = AppError;

    fn try_from(record: &FeeRecord) -> Result<Self, Self::Error> {
        Ok(Self {
            symbol: record.symbol.clone(),
            trx_hash: record.trx_hash.clone(),
            trx_time: to_signed("trx_time", record.trx_time)?,
            gas_used: to_signed("gas_used", record.gas_used)?,
            gas_price_wei: to_signed("gas_price_wei", record.gas_price_wei)?,
            block_number: to_signed("block_number", record.block_number)?,
            quote_price: record.quote_price.clone(),
            fee_in_quote: record.fee_in_quote.clone(),
        })
    }
}

fn to_signed(field: &str, value: u64) -> Result<i64, AppError> {
    i64::try_from(value)
        .map_err(|_| AppError::ValidationError(format!("{} out of range: {}", field, value)))
}

pub struct PgFeeStore {
    pool: PgPool,
}

impl PgFeeStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    async fn insert_rows(conn: &mut PgConnection, rows: Vec<FeeRow>) -> Result<u64, AppError> {
        let mut inserted = 0;

        for chunk in rows.chunks(INSERT_CHUNK_ROWS) {
            let mut builder: QueryBuilder<Postgres> = QueryBuilder::new(
                "INSERT INTO trx_fees (symbol, trx_hash, trx_time, gas_used, gas_price_wei, \
                 block_number, quote_price, fee_in_quote) ",
            );
            builder.push_values(chunk, |mut b, row| {
                b.push_bind(row.symbol.clone())
                    .push_bind(row.trx_hash.clone())
                    .push_bind(row.trx_time)
                    .push_bind(row.gas_used)
                    .push_bind(row.gas_price_wei)
                    .push_bind(row.block_number)
                    .push_bind(row.quote_price.clone())
                    .push_bind(row.fee_in_quote.clone());
            });
            builder.push(" ON CONFLICT (symbol, trx_hash) DO NOTHING");

            let result = builder.build().execute(&mut *conn).await?;
            inserted += result.rows_affected();
        }

        Ok(inserted)
    }

    fn rows(records: &[FeeRecord]) -> Result<Vec<FeeRow>, AppError> {
        records.iter().map(FeeRow::try_from).collect()
    }
}

#[async_trait]
impl FeeStore for PgFeeStore {
    async fn batch_insert(&self, records: &[FeeRecord]) -> Result<u64, AppError> {
        if records.is_empty() {
            return Ok(0);
        }
        let rows = Self::rows(records)?;

        let mut tx = self.pool.begin().await?;
        let inserted = Self::insert_rows(&mut tx, rows).await?;
        tx.commit().await?;

        debug!(batch = records.len(), inserted, "Stored fee batch");
        Ok(inserted)
    }

    async fn record_backfill_progress(
        &self,
        records: &[FeeRecord],
        symbol: &str,
        max_block: u64,
    ) -> Result<u64, AppError> {
        let rows = Self::rows(records)?;
        let max_block_signed = to_signed("max_block", max_block)?;

        // Dropping `tx` on any early return rolls both statements back.
        let mut tx = self.pool.begin().await?;
        let inserted = Self::insert_rows(&mut tx, rows).await?;

        sqlx::query(
            r#"
            INSERT INTO block_bookmarks (symbol, max_block, updated_at)
            VALUES ($1, $2, NOW())
            ON CONFLICT (symbol) DO UPDATE
            SET max_block = GREATEST(block_bookmarks.max_block, EXCLUDED.max_block),
                updated_at = NOW()
            "#,
        )
        .bind(symbol)
        .bind(max_block_signed)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        debug!(symbol, max_block, inserted, "Recorded backfill progress");
        Ok(inserted)
    }

    async fn get_max_block(&self, symbol: &str) -> Result<u64, AppError> {
        let bookmark = sqlx::query_as::<_, BlockBookmark>(
            "SELECT symbol, max_block, updated_at FROM block_bookmarks WHERE symbol = $1",
        )
        .bind(symbol)
        .fetch_optional(&self.pool)
        .await?;

        Ok(bookmark.map(|b| b.max_block).unwrap_or(0))
    }

    async fn get_by_hash(
        &self,
        symbol: &str,
        trx_hash: &str,
    ) -> Result<Option<FeeRecord>, AppError> {
        let record = sqlx::query_as::<_, FeeRecord>(
            r#"
            SELECT symbol, trx_hash, trx_time, gas_used, gas_price_wei,
                   block_number, quote_price, fee_in_quote
            FROM trx_fees
            WHERE symbol = $1 AND trx_hash = $2
            "#,
        )
        .bind(symbol)
        .bind(trx_hash)
        .fetch_optional(&self.pool)
        .await?;

        Ok(record)
    }

    async fn list(&self, query: &FeeQuery) -> Result<Vec<FeeRecord>, AppError> {
        let records = sqlx::query_as::<_, FeeRecord>(
            r#"
            SELECT symbol, trx_hash, trx_time, gas_used, gas_price_wei,
                   block_number, quote_price, fee_in_quote
            FROM trx_fees
            WHERE symbol = $1 AND trx_time >= $2 AND trx_time <= $3
            ORDER BY trx_time ASC, trx_hash ASC
            LIMIT $4 OFFSET $5
            "#,
        )
        .bind(&query.symbol)
        .bind(to_signed("start_time", query.start_time)?)
        .bind(to_signed("end_time", query.upper_time())?)
        .bind(query.effective_limit() as i64)
        .bind(to_signed("offset", query.offset())?)
        .fetch_all(&self.pool)
        .await?;

        Ok(records)
    }

    async fn close(&self) {
        if !self.pool.is_closed() {
            info!("Closing database pool");
            self.pool.close().await;
        }
    }
}
