use async_trait::async_trait;
use futures::future::join_all;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio::time::{self, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::config::Settings;
use crate::database::FeeStore;
use crate::error::AppError;
use crate::services::explorer_client::ChainExplorer;
use crate::services::historical_tracker::HistoricalTracker;
use crate::services::live_tracker::LiveTracker;
use crate::services::price_feed::PriceFeed;

/// Everything the two loops need to know about what they track.
#[derive(Debug, Clone)]
pub struct TrackerConfig {
    pub symbol: String,
    pub pool_address: String,
    pub page_size: u64,
    pub tick_interval: Duration,
    pub price_pair: String,
    pub price_interval: String,
    pub live_enabled: bool,
    pub historical_enabled: bool,
}

impl TrackerConfig {
    pub fn from_settings(settings: &Settings) -> Self {
        Self {
            symbol: settings.tracker.symbol.clone(),
            pool_address: settings.tracker.pool_address.clone(),
            page_size: settings.tracker.page_size,
            tick_interval: settings.tracker.tick_interval(),
            price_pair: settings.price_feed.pair.clone(),
            price_interval: settings.price_feed.interval.clone(),
            live_enabled: settings.tracker.live_enabled,
            historical_enabled: settings.tracker.historical_enabled,
        }
    }
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self::from_settings(&Settings::default())
    }
}

/// Result of one successful tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// A page was priced and stored; the page cursor moved forward.
    Recorded { count: usize, inserted: u64 },
    /// Nothing to record; the cursor stays put.
    Empty,
}

/// One periodically polled tracking loop.
#[async_trait]
pub trait PollingLoop: Send {
    fn name(&self) -> &'static str;

    /// Runs a single tick. Errors leave the cursor untouched.
    async fn poll_once(&mut self) -> Result<TickOutcome, AppError>;
}

/// Ticks `tracker` every `period` until `cancel` fires.
///
/// Cancellation is only observed between ticks, so a batch that has started
/// is always allowed to finish.
pub async fn run_polling_loop<L: PollingLoop>(
    mut tracker: L,
    period: Duration,
    cancel: CancellationToken,
) {
    let name = tracker.name();
    info!(tracker = name, period_ms = period.as_millis() as u64, "Tracker loop started");

    let mut interval = time::interval(period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            _ = interval.tick() => {
                match tracker.poll_once().await {
                    Ok(TickOutcome::Recorded { count, inserted }) => {
                        info!(tracker = name, count, inserted, "Recorded fee batch");
                    }
                    Ok(TickOutcome::Empty) => {
                        debug!(tracker = name, "No transaction to record");
                    }
                    Err(e) => {
                        warn!(tracker = name, error = %e, "Tick failed, retrying on next tick");
                    }
                }
            }
        }
    }

    info!(tracker = name, "Tracker loop stopped");
}

/// Owns the live and historical loops and their shared cancellation signal.
pub struct Tracker {
    explorer: Arc<dyn ChainExplorer>,
    price_feed: Arc<dyn PriceFeed>,
    store: Arc<dyn FeeStore>,
    config: TrackerConfig,
    cancel: CancellationToken,
    started: AtomicBool,
    tasks: Mutex<Vec<JoinHandle<()>>>,
}

impl Tracker {
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
            cancel: CancellationToken::new(),
            started: AtomicBool::new(false),
            tasks: Mutex::new(Vec::new()),
        }
    }

    /// Anchors both loops at the current chain head and spawns them.
    ///
    /// Returns the head height once the loops are running. A failed or zero
    /// head is returned as an error; there is nothing to anchor on without it.
    pub async fn run(&self) -> Result<u64, AppError> {
        if self.started.swap(true, Ordering::SeqCst) {
            return Err(AppError::InternalError("tracker already started".to_string()));
        }

        let head_height = match self.explorer.get_head_height().await {
            Ok(0) => {
                error!("Chain head height is zero");
                return Err(AppError::UpstreamError("chain head height is zero".to_string()));
            }
            Ok(height) => height,
            Err(e) => {
                error!(error = %e, "Failed to get chain head height");
                return Err(e);
            }
        };

        info!(
            symbol = %self.config.symbol,
            pool = %self.config.pool_address,
            head_height,
            "Starting fee tracker"
        );

        let mut tasks = self.tasks.lock().await;

        if self.config.live_enabled {
            let live = LiveTracker::new(
                self.explorer.clone(),
                self.price_feed.clone(),
                self.store.clone(),
                self.config.clone(),
                head_height,
            );
            tasks.push(tokio::spawn(run_polling_loop(
                live,
                self.config.tick_interval,
                self.cancel.clone(),
            )));
        }

        if self.config.historical_enabled {
            let historical = HistoricalTracker::new(
                self.explorer.clone(),
                self.price_feed.clone(),
                self.store.clone(),
                self.config.clone(),
                head_height,
            );
            tasks.push(tokio::spawn(run_polling_loop(
                historical,
                self.config.tick_interval,
                self.cancel.clone(),
            )));
        }

        Ok(head_height)
    }

    /// Signals both loops to stop at their next tick boundary.
    pub fn stop(&self) {
        self.cancel.cancel();
    }

    pub fn is_stopped(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Stops the loops, waits for them to return, then closes the store.
    pub async fn shutdown(&self) {
        self.stop();

        let handles: Vec<_> = self.tasks.lock().await.drain(..).collect();
        for result in join_all(handles).await {
            if let Err(e) = result {
                error!(error = %e, "Tracker loop task failed");
            }
        }

        self.store.close().await;
        info!("Fee tracker shut down");
    }

    pub async fn running_loops(&self) -> usize {
        self.tasks
            .lock()
            .await
            .iter()
            .filter(|handle| !handle.is_finished())
            .count()
    }
}
