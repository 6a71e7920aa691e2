use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::Value;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};
use url::Url;

use crate::config::ExplorerSettings;
use crate::error::AppError;
use crate::models::TrxGas;
use crate::utils::numeric::{decode_hex_u64, decode_quantity, encode_hex_u64};
use crate::utils::RateLimiter;

const STATUS_OK: &str = "1";
const NO_TRANSACTIONS_FOUND: &str = "No transactions found";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortOrder {
    Ascending,
    Descending,
}

impl SortOrder {
    pub fn as_str(&self) -> &'static str {
        match self {
            SortOrder::Ascending => "asc",
            SortOrder::Descending => "desc",
        }
    }
}

impl fmt::Display for SortOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One page of the transaction list for an address. Pages start at 1.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransactionListQuery {
    pub address: String,
    pub start_block: u64,
    /// `None` leaves the range open towards the chain head.
    pub end_block: Option<u64>,
    pub page: u64,
    pub page_size: u64,
    pub sort: SortOrder,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrxReceipt {
    pub trx_hash: String,
    pub gas_used: u64,
    pub effective_gas_price: u64,
    pub block_number: u64,
}

/// Read access to the chain explorer.
#[async_trait]
pub trait ChainExplorer: Send + Sync {
    async fn get_head_height(&self) -> Result<u64, AppError>;

    /// Returns an empty vector when the range holds no (more) transactions.
    async fn list_transactions(
        &self,
        query: &TransactionListQuery,
    ) -> Result<Vec<TrxGas>, AppError>;

    async fn get_transaction_receipt(&self, trx_hash: &str) -> Result<TrxReceipt, AppError>;

    async fn get_block_timestamp(&self, block_number: u64) -> Result<u64, AppError>;
}

#[derive(Debug, Deserialize)]
struct ExplorerApiError {
    #[serde(default)]
    code: i64,
    #[serde(default)]
    message: String,
}

/// Envelope of the JSON-RPC proxy module.
#[derive(Debug, Deserialize)]
struct ProxyEnvelope {
    #[serde(default)]
    result: Value,
    #[serde(default)]
    error: Option<ExplorerApiError>,
    #[serde(default)]
    status: Option<String>,
    #[serde(default)]
    message: Option<String>,
}

/// Envelope of the account module list endpoints.
#[derive(Debug, Deserialize)]
struct ListEnvelope {
    status: String,
    #[serde(default)]
    message: String,
    #[serde(default)]
    result: Value,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawTransaction {
    hash: String,
    block_number: String,
    #[serde(rename = "timeStamp")]
    time_stamp: String,
    gas_price: String,
    gas_used: String,
}

impl RawTransaction {
    fn decode(self) -> Result<TrxGas, AppError> {
        Ok(TrxGas {
            trx_time: decode_quantity(&self.time_stamp)?,
            gas_used: decode_quantity(&self.gas_used)?,
            gas_price_wei: decode_quantity(&self.gas_price)?,
            block_number: decode_quantity(&self.block_number)?,
            // lookups by hash are lowercase
            trx_hash: self.hash.to_ascii_lowercase(),
        })
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawReceipt {
    #[serde(default)]
    transaction_hash: Option<String>,
    gas_used: String,
    effective_gas_price: String,
    block_number: String,
}

#[derive(Debug, Deserialize)]
struct RawBlock {
    timestamp: String,
}

/// Etherscan-compatible explorer client. Every request first waits on the shared rate limiter.
pub struct ExplorerClient {
    client: Client,
    base_url: Url,
    api_key: String,
    rate_limiter: Arc<RateLimiter>,
}

impl ExplorerClient {
    pub fn new(settings: &ExplorerSettings) -> Result<Self, AppError> {
        let rate_limiter = Arc::new(RateLimiter::per_second(
            "explorer",
            settings.requests_per_second,
        ));
        Self::with_rate_limiter(&settings.base_url, &settings.api_key, rate_limiter)
    }

    pub fn with_rate_limiter(
        base_url: &str,
        api_key: &str,
        rate_limiter: Arc<RateLimiter>,
    ) -> Result<Self, AppError> {
        let base_url = base_url
            .parse::<Url>()
            .map_err(|e| AppError::ConfigError(format!("Invalid explorer URL: {}", e)))?;

        let client = Client::builder()
            .timeout(Duration::from_secs(15))
            .user_agent("Pool-Fee-Tracker/1.0")
            .build()
            .map_err(|e| AppError::InternalError(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url,
            api_key: api_key.to_string(),
            rate_limiter,
        })
    }

    async fn get(&self, params: &[(&str, String)]) -> Result<String, AppError> {
        self.rate_limiter.acquire().await;

        let mut url = self.base_url.clone();
        url.query_pairs_mut()
            .extend_pairs(params.iter().map(|(k, v)| (*k, v.as_str())));
        debug!(url = %url, "Explorer request");
        url.query_pairs_mut().append_pair("apikey", &self.api_key);

        let response = self.client.get(url).send().await?;
        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            warn!(status = %status, "Explorer returned non-success status");
            return Err(AppError::UpstreamError(format!(
                "explorer returned status {}: {}",
                status, body
            )));
        }

        Ok(body)
    }

    async fn proxy_call(&self, action: &str, params: &[(&str, String)]) -> Result<Value, AppError> {
        let mut all = vec![("module", "proxy".to_string()), ("action", action.to_string())];
        all.extend_from_slice(params);

        let body = self.get(&all).await?;
        let envelope: ProxyEnvelope = serde_json::from_str(&body)?;

        if let Some(err) = envelope.error {
            if err.code != 0 {
                return Err(AppError::UpstreamError(format!(
                    "explorer {} failed with code {}: {}",
                    action, err.code, err.message
                )));
            }
        }

        // Throttled or rejected proxy calls come back in the account-module shape.
        if envelope.status.as_deref() == Some("0") {
            return Err(AppError::UpstreamError(format!(
                "explorer {} not ok: {} {}",
                action,
                envelope.message.unwrap_or_default(),
                envelope.result
            )));
        }

        Ok(envelope.result)
    }
}

#[async_trait]
impl ChainExplorer for ExplorerClient {
    async fn get_head_height(&self) -> Result<u64, AppError> {
        let result = self.proxy_call("eth_blockNumber", &[]).await?;
        let hex = result
            .as_str()
            .ok_or_else(|| {
                AppError::DecodeError(format!("block number is not a string: {}", result))
            })?;
        decode_hex_u64(hex)
    }

    async fn list_transactions(
        &self,
        query: &TransactionListQuery,
    ) -> Result<Vec<TrxGas>, AppError> {
        let mut params = vec![
            ("module", "account".to_string()),
            ("action", "txlist".to_string()),
            ("address", query.address.clone()),
            ("startblock", query.start_block.to_string()),
            ("page", query.page.to_string()),
            ("offset", query.page_size.to_string()),
            ("sort", query.sort.to_string()),
        ];
        if let Some(end_block) = query.end_block {
            params.push(("endblock", end_block.to_string()));
        }

        let body = self.get(&params).await?;
        let envelope: ListEnvelope = serde_json::from_str(&body)?;

        if envelope.status != STATUS_OK {
            if envelope.message.starts_with(NO_TRANSACTIONS_FOUND) {
                return Ok(Vec::new());
            }
            return Err(AppError::UpstreamError(format!(
                "explorer txlist not ok: status {}, {}: {}",
                envelope.status, envelope.message, envelope.result
            )));
        }

        let raw: Vec<RawTransaction> = serde_json::from_value(envelope.result)?;
        raw.into_iter().map(RawTransaction::decode).collect()
    }

    async fn get_transaction_receipt(&self, trx_hash: &str) -> Result<TrxReceipt, AppError> {
        let result = self
            .proxy_call("eth_getTransactionReceipt", &[("txhash", trx_hash.to_string())])
            .await?;
        if result.is_null() {
            return Err(AppError::NotFound(format!("transaction {} not found", trx_hash)));
        }

        let raw: RawReceipt = serde_json::from_value(result)?;
        Ok(TrxReceipt {
            trx_hash: raw.transaction_hash.unwrap_or_else(|| trx_hash.to_string()),
            gas_used: decode_hex_u64(&raw.gas_used)?,
            effective_gas_price: decode_hex_u64(&raw.effective_gas_price)?,
            block_number: decode_hex_u64(&raw.block_number)?,
        })
    }

    async fn get_block_timestamp(&self, block_number: u64) -> Result<u64, AppError> {
        let result = self
            .proxy_call(
                "eth_getBlockByNumber",
                &[
                    ("tag", encode_hex_u64(block_number)),
                    ("boolean", "false".to_string()),
                ],
            )
            .await?;
        if result.is_null() {
            return Err(AppError::NotFound(format!("block {} not found", block_number)));
        }

        let raw: RawBlock = serde_json::from_value(result)?;
        decode_hex_u64(&raw.timestamp)
    }
}
