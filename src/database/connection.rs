use sqlx::{postgres::PgPoolOptions, PgPool};
use tracing::{error, info};

use crate::config::DatabaseSettings;
use crate::error::AppError;

/// Opens the pool shared by both tracker loops and the query API.
pub async fn establish_connection(settings: &DatabaseSettings) -> Result<PgPool, AppError> {
    info!(
        max_connections = settings.max_connections,
        min_connections = settings.min_connections,
        "Opening database pool"
    );

    PgPoolOptions::new()
        .max_connections(settings.max_connections)
        .min_connections(settings.min_connections)
        .acquire_timeout(settings.acquire_timeout())
        .connect(&settings.url)
        .await
        .map_err(|e| {
            error!(error = %e, "Failed to open database pool");
            AppError::StoreError(format!("Connection failed: {}", e))
        })
}

pub async fn test_connection(pool: &PgPool) -> Result<(), AppError> {
    let one: i32 = sqlx::query_scalar("SELECT 1").fetch_one(pool).await?;
    if one != 1 {
        return Err(AppError::StoreError(format!("Unexpected connection check result: {}", one)));
    }
    Ok(())
}
