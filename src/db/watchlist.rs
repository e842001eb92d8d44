use std::time::{SystemTime, UNIX_EPOCH};

use crate::db::models::TokenRow;
use crate::engine::normalize_address;
use crate::error::Result;

/// All watched tokens, newest first.
pub async fn list(pool: &sqlx::SqlitePool) -> Result<Vec<TokenRow>> {
    let rows = sqlx::query_as::<_, TokenRow>(
        r#"
        SELECT id, address, chain_id, created_at
        FROM tokens
        ORDER BY id DESC
        "#,
    )
    .fetch_all(pool)
    .await?;
    Ok(rows)
}

/// Watched addresses, newest first.
pub async fn addresses(pool: &sqlx::SqlitePool) -> Result<Vec<String>> {
    Ok(list(pool).await?.into_iter().map(|r| r.address).collect())
}

/// Add an address to the watch-list. Returns false when it was already present.
pub async fn insert(pool: &sqlx::SqlitePool, address: &str, chain_id: Option<&str>) -> Result<bool> {
    let address = normalize_address(address);
    let result = sqlx::query(
        r#"
        INSERT OR IGNORE INTO tokens (address, chain_id, created_at)
        VALUES (?, ?, ?)
        "#,
    )
    .bind(&address)
    .bind(chain_id)
    .bind(now_secs())
    .execute(pool)
    .await?;
    Ok(result.rows_affected() > 0)
}

/// Insert `defaults` only when the table is empty. Returns the number added.
pub async fn seed_if_empty(pool: &sqlx::SqlitePool, defaults: &[String]) -> Result<usize> {
    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM tokens")
        .fetch_one(pool)
        .await?;
    if count > 0 {
        return Ok(0);
    }

    let mut added = 0;
    for address in defaults {
        if insert(pool, address, None).await? {
            added += 1;
        }
    }
    Ok(added)
}

fn now_secs() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs() as i64
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    /// Single-connection in-memory database with the schema applied.
    pub(crate) async fn memory_pool() -> sqlx::SqlitePool {
        let pool = sqlx::sqlite::SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .unwrap();
        sqlx::migrate!("./migrations").run(&pool).await.unwrap();
        pool
    }

    #[tokio::test]
    async fn insert_normalizes_and_ignores_duplicates() {
        let pool = memory_pool().await;
        assert!(insert(&pool, " 0xAbC ", Some("bsc")).await.unwrap());
        assert!(!insert(&pool, "0xabc", None).await.unwrap());

        let rows = list(&pool).await.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].address, "0xabc");
        assert_eq!(rows[0].chain_id.as_deref(), Some("bsc"));
        assert!(rows[0].created_at > 0);
    }

    #[tokio::test]
    async fn list_is_newest_first() {
        let pool = memory_pool().await;
        for a in ["0x01", "0x02", "0x03"] {
            insert(&pool, a, None).await.unwrap();
        }
        assert_eq!(addresses(&pool).await.unwrap(), vec!["0x03", "0x02", "0x01"]);
    }

    #[tokio::test]
    async fn seed_only_fills_an_empty_table() {
        let pool = memory_pool().await;
        let defaults = vec!["0xaa".to_string(), "0xbb".to_string(), "0xAA".to_string()];
        assert_eq!(seed_if_empty(&pool, &defaults).await.unwrap(), 2);
        assert_eq!(seed_if_empty(&pool, &["0xcc".to_string()]).await.unwrap(), 0);
        assert_eq!(addresses(&pool).await.unwrap().len(), 2);
    }
}
