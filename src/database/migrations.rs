use sqlx::{migrate::MigrateDatabase, PgPool, Postgres};
use tracing::info;

use crate::error::AppError;

/// Applies `migrations/` (the `trx_fees` and `block_bookmarks` schema).
pub async fn run_migrations(pool: &PgPool) -> Result<(), AppError> {
    let migrator = sqlx::migrate!("./migrations");
    migrator.run(pool).await?;

    info!(known = migrator.iter().count(), "Schema is up to date");
    Ok(())
}

pub async fn create_database_if_not_exists(database_url: &str) -> Result<(), AppError> {
    if Postgres::database_exists(database_url).await? {
        return Ok(());
    }

    info!("Creating missing database");
    Postgres::create_database(database_url).await?;
    Ok(())
}
