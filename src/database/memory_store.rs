use async_trait::async_trait;
use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use tokio::sync::Mutex;

use super::fee_store::FeeStore;
use crate::error::AppError;
use crate::models::{BlockBookmark, FeeQuery, FeeRecord};

#[derive(Default)]
struct MemoryState {
    records: BTreeMap<(String, String), FeeRecord>,
    bookmarks: HashMap<String, BlockBookmark>,
    closed: bool,
}

/// In-process `FeeStore` with the same dedup, bookmark and pagination rules as
/// the Postgres store. Writes can be made to fail for exercising error paths.
#[derive(Default)]
pub struct MemoryFeeStore {
    state: Mutex<MemoryState>,
    fail_inserts: AtomicBool,
    fail_bookmark_upsert: AtomicBool,
    writes: AtomicU64,
}

impl MemoryFeeStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every following write fail with `StoreError` before touching any state.
    pub fn fail_inserts(&self, fail: bool) {
        self.fail_inserts.store(fail, Ordering::SeqCst);
    }

    /// Makes the bookmark half of `record_backfill_progress` fail.
    pub fn fail_bookmark_upsert(&self, fail: bool) {
        self.fail_bookmark_upsert.store(fail, Ordering::SeqCst);
    }

    /// Number of successful write calls.
    pub fn write_count(&self) -> u64 {
        self.writes.load(Ordering::SeqCst)
    }

    pub async fn len(&self) -> usize {
        self.state.lock().await.records.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    pub async fn is_closed(&self) -> bool {
        self.state.lock().await.closed
    }

    /// Every stored record ordered by `(symbol, trx_hash)`.
    pub async fn snapshot(&self) -> Vec<FeeRecord> {
        self.state.lock().await.records.values().cloned().collect()
    }

    fn check_writable(&self, state: &MemoryState) -> Result<(), AppError> {
        if state.closed {
            return Err(AppError::StoreError("store is closed".to_string()));
        }
        if self.fail_inserts.load(Ordering::SeqCst) {
            return Err(AppError::StoreError("injected insert failure".to_string()));
        }
        Ok(())
    }

    /// Records from `batch` that are not stored yet, first occurrence wins.
    fn new_records(state: &MemoryState, batch: &[FeeRecord]) -> Vec<FeeRecord> {
        let mut seen = HashMap::new();
        for record in batch {
            let key = record.key();
            if !state.records.contains_key(&key) {
                seen.entry(key).or_insert_with(|| record.clone());
            }
        }
        seen.into_values().collect()
    }

    fn apply(state: &mut MemoryState, records: Vec<FeeRecord>) -> u64 {
        let inserted = records.len() as u64;
        for record in records {
            state.records.insert(record.key(), record);
        }
        inserted
    }
}

#[async_trait]
impl FeeStore for MemoryFeeStore {
    async fn batch_insert(&self, records: &[FeeRecord]) -> Result<u64, AppError> {
        let mut state = self.state.lock().await;
        self.check_writable(&state)?;

        let fresh = Self::new_records(&state, records);
        let inserted = Self::apply(&mut state, fresh);
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(inserted)
    }

    async fn record_backfill_progress(
        &self,
        records: &[FeeRecord],
        symbol: &str,
        max_block: u64,
    ) -> Result<u64, AppError> {
        let mut state = self.state.lock().await;
        self.check_writable(&state)?;

        // Stage both halves; nothing is applied unless the bookmark succeeds too.
        let fresh = Self::new_records(&state, records);
        if self.fail_bookmark_upsert.load(Ordering::SeqCst) {
            return Err(AppError::StoreError("injected bookmark upsert failure".to_string()));
        }

        let inserted = Self::apply(&mut state, fresh);
        state
            .bookmarks
            .entry(symbol.to_string())
            .and_modify(|b| b.advance(max_block))
            .or_insert_with(|| BlockBookmark::new(symbol, max_block));
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(inserted)
    }

    async fn get_max_block(&self, symbol: &str) -> Result<u64, AppError> {
        let state = self.state.lock().await;
        Ok(state.bookmarks.get(symbol).map(|b| b.max_block).unwrap_or(0))
    }

    async fn get_by_hash(
        &self,
        symbol: &str,
        trx_hash: &str,
    ) -> Result<Option<FeeRecord>, AppError> {
        let state = self.state.lock().await;
        Ok(state
            .records
            .get(&(symbol.to_string(), trx_hash.to_string()))
            .cloned())
    }

    async fn list(&self, query: &FeeQuery) -> Result<Vec<FeeRecord>, AppError> {
        let state = self.state.lock().await;
        let upper = query.upper_time();

        let mut matching: Vec<&FeeRecord> = state
            .records
            .values()
            .filter(|r| {
                r.symbol == query.symbol && r.trx_time >= query.start_time && r.trx_time <= upper
            })
            .collect();
        matching.sort_by(|a, b| (a.trx_time, &a.trx_hash).cmp(&(b.trx_time, &b.trx_hash)));

        Ok(matching
            .into_iter()
            .skip(query.offset() as usize)
            .take(query.effective_limit() as usize)
            .cloned()
            .collect())
    }

    async fn close(&self) {
        self.state.lock().await.closed = true;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::TrxGas;
    use bigdecimal::BigDecimal;

    fn record(symbol: &str, hash: &str, block: u64, time: u64) -> FeeRecord {
        FeeRecord::new(
            symbol,
            TrxGas {
                trx_hash: hash.to_string(),
                trx_time: time,
                gas_used: 21_000,
                gas_price_wei: 1_000_000_000,
                block_number: block,
            },
            BigDecimal::from(2000),
        )
    }

    #[tokio::test]
    async fn test_batch_insert_skips_duplicates() {
        let store = MemoryFeeStore::new();
        let batch = vec![record("A", "0x1", 1, 1), record("A", "0x2", 2, 2)];
        assert_eq!(store.batch_insert(&batch).await.unwrap(), 2);

        let mixed = vec![
            record("A", "0x2", 2, 2),
            record("A", "0x3", 3, 3),
            record("A", "0x3", 3, 3),
        ];
        assert_eq!(store.batch_insert(&mixed).await.unwrap(), 1);
        assert_eq!(store.len().await, 3);

        // same hash under a different symbol is a different record
        assert_eq!(store.batch_insert(&[record("B", "0x1", 1, 1)]).await.unwrap(), 1);
        assert_eq!(store.len().await, 4);
    }

    #[tokio::test]
    async fn test_bookmark_defaults_to_zero_and_is_monotonic() {
        let store = MemoryFeeStore::new();
        assert_eq!(store.get_max_block("A").await.unwrap(), 0);

        store.record_backfill_progress(&[record("A", "0x1", 10, 1)], "A", 10).await.unwrap();
        store.record_backfill_progress(&[], "A", 4).await.unwrap();
        assert_eq!(store.get_max_block("A").await.unwrap(), 10);
        assert_eq!(store.get_max_block("B").await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_failed_bookmark_rolls_back_batch() {
        let store = MemoryFeeStore::new();
        store.fail_bookmark_upsert(true);

        let result = store.record_backfill_progress(&[record("A", "0x1", 10, 1)], "A", 10).await;
        assert!(matches!(result, Err(AppError::StoreError(_))));
        assert!(store.is_empty().await);
        assert_eq!(store.get_max_block("A").await.unwrap(), 0);
        assert_eq!(store.write_count(), 0);
    }

    #[tokio::test]
    async fn test_list_filters_orders_and_paginates() {
        let store = MemoryFeeStore::new();
        let batch: Vec<_> = (0..30u64)
            .map(|i| record("A", &format!("0x{:02}", i), i, 1_000 + (29 - i)))
            .collect();
        store.batch_insert(&batch).await.unwrap();
        store.batch_insert(&[record("B", "0xff", 1, 1_000)]).await.unwrap();

        let query = FeeQuery {
            symbol: "A".to_string(),
            start_time: 1_005,
            end_time: 1_024,
            page: 0,
            limit: 0,
        };
        let first = store.list(&query).await.unwrap();
        assert_eq!(first.len(), 20);
        assert_eq!(first[0].trx_time, 1_005);
        assert!(first.windows(2).all(|w| w[0].trx_time <= w[1].trx_time));

        let second = store.list(&FeeQuery { page: 1, limit: 15, ..query.clone() }).await.unwrap();
        assert_eq!(second.len(), 5);
        assert_eq!(second[0].trx_time, 1_020);

        let unbounded = store
            .list(&FeeQuery { symbol: "A".to_string(), limit: 50, ..Default::default() })
            .await
            .unwrap();
        assert_eq!(unbounded.len(), 30);
    }

    #[tokio::test]
    async fn test_closed_store_rejects_writes() {
        let store = MemoryFeeStore::new();
        store.close().await;
        assert!(store.is_closed().await);
        assert!(store.batch_insert(&[record("A", "0x1", 1, 1)]).await.is_err());
    }
}
