mod common;

use proptest::prelude::*;
use std::collections::HashSet;

use common::{trx, SYMBOL};
use pool_fee_tracker::{
    database::{FeeStore, MemoryFeeStore},
    models::{FeeQuery, FeeRecord},
};

fn records(hashes: &[u8]) -> Vec<FeeRecord> {
    hashes
        .iter()
        .map(|h| {
            let gas = trx(&format!("0x{:02x}", h), *h as u64, 1_000 + *h as u64);
            FeeRecord::new(SYMBOL, gas, 2000.into())
        })
        .collect()
}

proptest! {
    #[test]
    fn batch_insert_counts_only_new_keys(
        batches in prop::collection::vec(prop::collection::vec(0u8..40, 0..15), 1..6)
    ) {
        tokio_test::block_on(async {
            let store = MemoryFeeStore::new();
            let mut seen = HashSet::new();

            for batch in &batches {
                let expected = batch.iter().filter(|h| seen.insert(**h)).count() as u64;
                let inserted = store.batch_insert(&records(batch)).await.unwrap();
                prop_assert_eq!(inserted, expected);
            }
            prop_assert_eq!(store.len().await, seen.len());

            // replaying everything is a no-op
            for batch in &batches {
                prop_assert_eq!(store.batch_insert(&records(batch)).await.unwrap(), 0);
            }
            Ok(())
        })?;
    }

    #[test]
    fn bookmark_is_running_maximum(blocks in prop::collection::vec(0u64..1_000_000, 1..20)) {
        tokio_test::block_on(async {
            let store = MemoryFeeStore::new();
            let mut max = 0;

            for block in &blocks {
                store.record_backfill_progress(&[], SYMBOL, *block).await.unwrap();
                max = max.max(*block);
                prop_assert_eq!(store.get_max_block(SYMBOL).await.unwrap(), max);
            }
            Ok(())
        })?;
    }

    #[test]
    fn list_pages_partition_the_range(n in 0u8..60, limit in 1u32..=50) {
        tokio_test::block_on(async {
            let store = MemoryFeeStore::new();
            let hashes: Vec<u8> = (0..n).collect();
            store.batch_insert(&records(&hashes)).await.unwrap();

            let mut collected = Vec::new();
            let mut page = 0;
            loop {
                let query = FeeQuery {
                    symbol: SYMBOL.to_string(),
                    page,
                    limit,
                    ..Default::default()
                };
                let chunk = store.list(&query).await.unwrap();
                prop_assert!(chunk.len() <= limit as usize);
                if chunk.is_empty() {
                    break;
                }
                collected.extend(chunk);
                page += 1;
            }

            prop_assert_eq!(collected.len(), n as usize);
            prop_assert!(collected.windows(2).all(|w| w[0].trx_time <= w[1].trx_time));
            Ok(())
        })?;
    }
}
