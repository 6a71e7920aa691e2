pub mod fees;
pub mod health;

pub use fees::{create_fee_routes, get_single_fee, list_fees, FeeListResponse, SingleFeeResponse};
pub use health::health_check;

use axum::{routing::get, Router};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::AppState;

pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .nest("/api/v1", create_fee_routes())
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
