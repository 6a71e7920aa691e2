use std::sync::Arc;
use tracing::{debug, info};

use crate::database::FeeStore;
use crate::error::AppError;
use crate::models::{FeeQuery, FeeRecord};
use crate::services::explorer_client::ChainExplorer;
use crate::services::price_feed::PriceFeed;
use crate::services::tracker_service::TrackerConfig;
use crate::utils::math::fee_in_quote;
use crate::utils::time::TimeWindow;

/// Read side used by the query API.
pub struct FeeService {
    explorer: Arc<dyn ChainExplorer>,
    price_feed: Arc<dyn PriceFeed>,
    store: Arc<dyn FeeStore>,
    config: TrackerConfig,
}

impl FeeService {
    pub fn new(
        explorer: Arc<dyn ChainExplorer>,
        price_feed: Arc<dyn PriceFeed>,
        store: Arc<dyn FeeStore>,
        config: TrackerConfig,
    ) -> Self {
        Self {
            explorer,
            price_feed,
            store,
            config,
        }
    }

    /// Fee of one transaction in the quote currency, as a decimal string.
    ///
    /// Served from the store when the transaction is tracked, otherwise computed
    /// from the receipt, the block timestamp and the price around it. Computed
    /// fees are not stored.
    pub async fn get_single_fee(&self, trx_hash: &str) -> Result<String, AppError> {
        let trx_hash = normalize_hash(trx_hash)?;

        if let Some(record) = self.store.get_by_hash(&self.config.symbol, &trx_hash).await? {
            debug!(trx_hash = %trx_hash, "Fee served from store");
            return Ok(record.fee_in_quote.to_string());
        }

        let receipt = self.explorer.get_transaction_receipt(&trx_hash).await?;
        let trx_time = self.explorer.get_block_timestamp(receipt.block_number).await?;
        let price = self
            .price_feed
            .query_average_price(
                &self.config.price_pair,
                &self.config.price_interval,
                TimeWindow::around(trx_time),
            )
            .await?;

        let fee = fee_in_quote(receipt.gas_used, receipt.effective_gas_price, &price);
        info!(
            trx_hash = %trx_hash,
            block = receipt.block_number,
            fee = %fee,
            "Computed fee from explorer"
        );
        Ok(fee.to_string())
    }

    /// An empty symbol lists the tracked symbol.
    pub async fn list_fees(&self, mut query: FeeQuery) -> Result<Vec<FeeRecord>, AppError> {
        if query.symbol.is_empty() {
            query.symbol = self.config.symbol.clone();
        }
        if query.end_time != 0 && query.end_time < query.start_time {
            return Err(AppError::ValidationError(format!(
                "end_time {} is before start_time {}",
                query.end_time, query.start_time
            )));
        }

        self.store.list(&query).await
    }

    pub fn tracked_symbol(&self) -> &str {
        &self.config.symbol
    }
}

/// Accepts `0x` + 64 hex digits in any case and returns it lowercased.
pub fn normalize_hash(trx_hash: &str) -> Result<String, AppError> {
    let trimmed = trx_hash.trim();
    let valid = trimmed
        .strip_prefix("0x")
        .map(|hex| hex.len() == 64 && hex.chars().all(|c| c.is_ascii_hexdigit()))
        .unwrap_or(false);

    if !valid {
        return Err(AppError::ValidationError(format!(
            "invalid transaction hash: {:?}",
            trx_hash
        )));
    }
    Ok(trimmed.to_ascii_lowercase())
}
