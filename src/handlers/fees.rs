use axum::{
    extract::{Path, Query, State},
    response::Json,
    routing::get,
    Router,
};
use serde::{Deserialize, Serialize};

use crate::error::AppError;
use crate::models::{FeeQuery, FeeRecord};
use crate::services::fee_service::normalize_hash;
use crate::AppState;

#[derive(Debug, Serialize, Deserialize)]
pub struct SingleFeeResponse {
    pub trx_hash: String,
    pub fee_in_quote: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct FeeListResponse {
    pub records: Vec<FeeRecord>,
    pub page: u32,
    pub limit: u32,
}

pub async fn get_single_fee(
    State(state): State<AppState>,
    Path(trx_hash): Path<String>,
) -> Result<Json<SingleFeeResponse>, AppError> {
    let trx_hash = normalize_hash(&trx_hash)?;
    let fee_in_quote = state.fee_service.get_single_fee(&trx_hash).await?;
    Ok(Json(SingleFeeResponse {
        trx_hash,
        fee_in_quote,
    }))
}

pub async fn list_fees(
    State(state): State<AppState>,
    Query(query): Query<FeeQuery>,
) -> Result<Json<FeeListResponse>, AppError> {
    let page = query.page;
    let limit = query.effective_limit();
    let records = state.fee_service.list_fees(query).await?;
    Ok(Json(FeeListResponse { records, page, limit }))
}

pub fn create_fee_routes() -> Router<AppState> {
    Router::new()
        .route("/trxfee/list", get(list_fees))
        .route("/trxfee/:trx_hash", get(get_single_fee))
}
