use serde::Serialize;

/// Row of the `tokens` watch-list table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct TokenRow {
    pub id: i64,
    pub address: String,
    pub chain_id: Option<String>,
    /// Unix seconds.
    pub created_at: i64,
}
