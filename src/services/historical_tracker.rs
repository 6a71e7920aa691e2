use async_trait::async_trait;
use std::sync::Arc;
use tracing::info;

use crate::database::FeeStore;
use crate::error::AppError;
use crate::models::FeeRecord;
use crate::services::explorer_client::{ChainExplorer, SortOrder, TransactionListQuery};
use crate::services::price_feed::PriceFeed;
use crate::services::tracker_service::{PollingLoop, TickOutcome, TrackerConfig};
use crate::utils::time::TimeWindow;

/// Backfill from the stored bookmark up to the head seen at startup.
///
/// The bookmark is read once, on the first tick that manages to read it, and
/// the range start stays fixed from then on; progress within the range is the
/// page cursor. Each batch and its bookmark advance are written atomically.
pub struct HistoricalTracker {
    explorer: Arc<dyn ChainExplorer>,
    price_feed: Arc<dyn PriceFeed>,
    store: Arc<dyn FeeStore>,
    config: TrackerConfig,
    end_block: u64,
    start_block: Option<u64>,
    page: u64,
    caught_up: bool,
}

impl HistoricalTracker {
    pub fn new(
        explorer: Arc<dyn ChainExplorer>,
        price_feed: Arc<dyn PriceFeed>,
        store: Arc<dyn FeeStore>,
        config: TrackerConfig,
        end_block: u64,
    ) -> Self {
        Self {
            explorer,
            price_feed,
            store,
            config,
            end_block,
            start_block: None,
            page: 1,
            caught_up: false,
        }
    }

    pub fn page(&self) -> u64 {
        self.page
    }

    /// Bookmark read at startup, once known.
    pub fn start_block(&self) -> Option<u64> {
        self.start_block
    }

    pub fn end_block(&self) -> u64 {
        self.end_block
    }

    /// Whether a stored batch has reached the startup head.
    pub fn is_caught_up(&self) -> bool {
        self.caught_up
    }

    async fn anchor(&mut self) -> Result<u64, AppError> {
        if let Some(start_block) = self.start_block {
            return Ok(start_block);
        }

        let start_block = self.store.get_max_block(&self.config.symbol).await?;
        info!(
            symbol = %self.config.symbol,
            start_block,
            end_block = self.end_block,
            "Historical backfill anchored at bookmark"
        );
        self.start_block = Some(start_block);
        Ok(start_block)
    }
}

#[async_trait]
impl PollingLoop for HistoricalTracker {
    fn name(&self) -> &'static str {
        "historical"
    }

    async fn poll_once(&mut self) -> Result<TickOutcome, AppError> {
        let start_block = self.anchor().await?;

        let query = TransactionListQuery {
            address: self.config.pool_address.clone(),
            start_block,
            end_block: Some(self.end_block),
            page: self.page,
            page_size: self.config.page_size,
            sort: SortOrder::Ascending,
        };
        let batch = self.explorer.list_transactions(&query).await?;

        let (max_block, window) = match (
            batch.iter().map(|trx| trx.block_number).max(),
            TimeWindow::spanning(batch.iter().map(|trx| trx.trx_time)),
        ) {
            (Some(max_block), Some(window)) => (max_block, window),
            _ => return Ok(TickOutcome::Empty),
        };

        let price = self
            .price_feed
            .query_average_price(&self.config.price_pair, &self.config.price_interval, window)
            .await?;

        let count = batch.len();
        let records = FeeRecord::batch(&self.config.symbol, batch, &price);
        let inserted = self
            .store
            .record_backfill_progress(&records, &self.config.symbol, max_block)
            .await?;

        self.page += 1;

        if !self.caught_up && max_block >= self.end_block {
            self.caught_up = true;
            info!(
                symbol = %self.config.symbol,
                max_block,
                end_block = self.end_block,
                "Historical backfill reached startup head"
            );
        }

        Ok(TickOutcome::Recorded { count, inserted })
    }
}
