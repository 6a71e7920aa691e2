pub mod config;
pub mod models;
pub mod services;
pub mod handlers;
pub mod database;
pub mod utils;
pub mod error;

pub use error::types::*;

use std::sync::Arc;

use services::FeeService;

#[derive(Clone)]
pub struct AppState {
    pub fee_service: Arc<FeeService>,
}
