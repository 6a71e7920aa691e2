use async_trait::async_trait;
use std::sync::Arc;
use tracing::debug;

use crate::database::FeeStore;
use crate::error::AppError;
use crate::models::FeeRecord;
use crate::services::explorer_client::{ChainExplorer, SortOrder, TransactionListQuery};
use crate::services::price_feed::PriceFeed;
use crate::services::tracker_service::{PollingLoop, TickOutcome, TrackerConfig};
use crate::utils::time::{now_unix, TimeWindow};

/// Forward-only tail of the pool's transactions starting at the head seen at startup.
///
/// Keeps no durable cursor: transactions mined while the process is down are
/// left to the historical loop.
pub struct LiveTracker {
    explorer: Arc<dyn ChainExplorer>,
    price_feed: Arc<dyn PriceFeed>,
    store: Arc<dyn FeeStore>,
    config: TrackerConfig,
    head_height: u64,
    page: u64,
}

impl LiveTracker {
    pub fn new(
        explorer: Arc<dyn ChainExplorer>,
        price_feed: Arc<dyn PriceFeed>,
        store: Arc<dyn FeeStore>,
        config: TrackerConfig,
        head_height: u64,
    ) -> Self {
        Self {
            explorer,
            price_feed,
            store,
            config,
            head_height,
            page: 1,
        }
    }

    pub fn page(&self) -> u64 {
        self.page
    }

    pub fn head_height(&self) -> u64 {
        self.head_height
    }

    fn page_query(&self) -> TransactionListQuery {
        TransactionListQuery {
            address: self.config.pool_address.clone(),
            start_block: self.head_height,
            end_block: None,
            page: self.page,
            page_size: self.config.page_size,
            sort: SortOrder::Ascending,
        }
    }
}

#[async_trait]
impl PollingLoop for LiveTracker {
    fn name(&self) -> &'static str {
        "live"
    }

    async fn poll_once(&mut self) -> Result<TickOutcome, AppError> {
        let window = TimeWindow::trailing(now_unix());
        let price = self
            .price_feed
            .query_average_price(&self.config.price_pair, &self.config.price_interval, window)
            .await?;

        let batch = self.explorer.list_transactions(&self.page_query()).await?;
        if batch.is_empty() {
            return Ok(TickOutcome::Empty);
        }

        let count = batch.len();
        let records = FeeRecord::batch(&self.config.symbol, batch, &price);
        let inserted = self.store.batch_insert(&records).await?;

        self.page += 1;
        debug!(page = self.page, count, "Live page cursor advanced");

        Ok(TickOutcome::Recorded { count, inserted })
    }
}
