pub mod explorer_client;
pub mod fee_service;
pub mod historical_tracker;
pub mod live_tracker;
pub mod price_feed;
pub mod tracker_service;

pub use explorer_client::{
    ChainExplorer, ExplorerClient, SortOrder, TransactionListQuery, TrxReceipt,
};
pub use fee_service::FeeService;
pub use historical_tracker::HistoricalTracker;
pub use live_tracker::LiveTracker;
pub use price_feed::{PriceFeed, PriceFeedClient};
pub use tracker_service::{PollingLoop, TickOutcome, Tracker, TrackerConfig};
