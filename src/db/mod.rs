pub mod models;
pub mod watchlist;

use crate::error::Result;

/// Open (creating if needed) the SQLite database and apply migrations.
pub async fn connect(db_path: &str) -> Result<sqlx::SqlitePool> {
    let options = sqlx::sqlite::SqliteConnectOptions::new()
        .filename(db_path)
        .create_if_missing(true);
    let pool = sqlx::SqlitePool::connect_with(options).await?;
    sqlx::migrate!("./migrations").run(&pool).await?;
    Ok(pool)
}
