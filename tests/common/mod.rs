#![allow(dead_code)]

use async_trait::async_trait;
use bigdecimal::BigDecimal;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use pool_fee_tracker::{
    models::TrxGas,
    services::{ChainExplorer, PriceFeed, TrackerConfig, TransactionListQuery, TrxReceipt},
    utils::time::TimeWindow,
    AppError,
};

pub const SYMBOL: &str = "WETH/USDC";
pub const POOL: &str = "0x88e6a0c2ddd26feeb64f039a2c41296fcb3f5640";

pub fn config() -> TrackerConfig {
    TrackerConfig {
        symbol: SYMBOL.to_string(),
        pool_address: POOL.to_string(),
        page_size: 20,
        tick_interval: Duration::from_millis(10),
        price_pair: "ETHUSDT".to_string(),
        price_interval: "1m".to_string(),
        live_enabled: true,
        historical_enabled: true,
    }
}

pub fn trx(hash: &str, block: u64, time: u64) -> TrxGas {
    TrxGas {
        trx_hash: hash.to_string(),
        trx_time: time,
        gas_used: 21_000,
        gas_price_wei: 1_000_000_000,
        block_number: block,
    }
}

pub fn hash(n: u8) -> String {
    format!("0x{}", format!("{:02x}", n).repeat(32))
}

/// Scripted explorer. Pages are served by number regardless of the block range.
pub struct FakeExplorer {
    head: Mutex<Result<u64, AppError>>,
    pages: Mutex<HashMap<u64, Vec<TrxGas>>>,
    receipts: Mutex<HashMap<String, TrxReceipt>>,
    block_times: Mutex<HashMap<u64, u64>>,
    fail_list: AtomicBool,
    queries: Mutex<Vec<TransactionListQuery>>,
}

impl FakeExplorer {
    pub fn new(head: u64) -> Self {
        Self {
            head: Mutex::new(Ok(head)),
            pages: Mutex::new(HashMap::new()),
            receipts: Mutex::new(HashMap::new()),
            block_times: Mutex::new(HashMap::new()),
            fail_list: AtomicBool::new(false),
            queries: Mutex::new(Vec::new()),
        }
    }

    pub fn failing_head(err: AppError) -> Self {
        let explorer = Self::new(0);
        *explorer.head.lock().unwrap() = Err(err);
        explorer
    }

    pub fn set_page(&self, page: u64, trxs: Vec<TrxGas>) {
        self.pages.lock().unwrap().insert(page, trxs);
    }

    pub fn set_receipt(&self, receipt: TrxReceipt, block_time: u64) {
        self.block_times.lock().unwrap().insert(receipt.block_number, block_time);
        self.receipts.lock().unwrap().insert(receipt.trx_hash.clone(), receipt);
    }

    pub fn fail_list(&self, fail: bool) {
        self.fail_list.store(fail, Ordering::SeqCst);
    }

    pub fn queries(&self) -> Vec<TransactionListQuery> {
        self.queries.lock().unwrap().clone()
    }
}

#[async_trait]
impl ChainExplorer for FakeExplorer {
    async fn get_head_height(&self) -> Result<u64, AppError> {
        self.head.lock().unwrap().clone()
    }

    async fn list_transactions(
        &self,
        query: &TransactionListQuery,
    ) -> Result<Vec<TrxGas>, AppError> {
        self.queries.lock().unwrap().push(query.clone());
        if self.fail_list.load(Ordering::SeqCst) {
            return Err(AppError::UpstreamError("explorer unavailable".to_string()));
        }
        Ok(self.pages.lock().unwrap().get(&query.page).cloned().unwrap_or_default())
    }

    async fn get_transaction_receipt(&self, trx_hash: &str) -> Result<TrxReceipt, AppError> {
        self.receipts
            .lock()
            .unwrap()
            .get(trx_hash)
            .cloned()
            .ok_or_else(|| AppError::NotFound(format!("receipt {}", trx_hash)))
    }

    async fn get_block_timestamp(&self, block_number: u64) -> Result<u64, AppError> {
        self.block_times
            .lock()
            .unwrap()
            .get(&block_number)
            .copied()
            .ok_or_else(|| AppError::NotFound(format!("block {}", block_number)))
    }
}

/// Constant price source that records every window it was asked about.
pub struct FakePriceFeed {
    price: Mutex<Option<BigDecimal>>,
    fail: AtomicBool,
    windows: Mutex<Vec<TimeWindow>>,
}

impl FakePriceFeed {
    pub fn new(price: u64) -> Self {
        Self {
            price: Mutex::new(Some(BigDecimal::from(price))),
            fail: AtomicBool::new(false),
            windows: Mutex::new(Vec::new()),
        }
    }

    pub fn without_candles() -> Self {
        let feed = Self::new(0);
        *feed.price.lock().unwrap() = None;
        feed
    }

    pub fn fail(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }

    pub fn windows(&self) -> Vec<TimeWindow> {
        self.windows.lock().unwrap().clone()
    }
}

#[async_trait]
impl PriceFeed for FakePriceFeed {
    async fn query_average_price(
        &self,
        _pair: &str,
        _interval: &str,
        window: TimeWindow,
    ) -> Result<BigDecimal, AppError> {
        self.windows.lock().unwrap().push(window);
        if self.fail.load(Ordering::SeqCst) {
            return Err(AppError::UpstreamError("price feed unavailable".to_string()));
        }
        self.price
            .lock()
            .unwrap()
            .clone()
            .ok_or_else(|| AppError::NotFound("price not found".to_string()))
    }
}
