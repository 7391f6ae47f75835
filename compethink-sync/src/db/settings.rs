//! Settings table accessors
//!
//! Values are stored as text; structured values go through serde_json.

use compethink_common::Result;
use serde::de::DeserializeOwned;
use serde::Serialize;
use sqlx::{Pool, Sqlite};

/// Raw text value of a setting
pub async fn get_setting(db: &Pool<Sqlite>, key: &str) -> Result<Option<String>> {
    let row: Option<(String,)> = sqlx::query_as("SELECT value FROM settings WHERE key = ?")
        .bind(key)
        .fetch_optional(db)
        .await?;

    Ok(row.map(|(value,)| value))
}

/// Insert or replace a setting
pub async fn set_setting(db: &Pool<Sqlite>, key: &str, value: &str) -> Result<()> {
    sqlx::query(
        "INSERT INTO settings (key, value) VALUES (?, ?)
         ON CONFLICT(key) DO UPDATE SET value = excluded.value",
    )
    .bind(key)
    .bind(value)
    .execute(db)
    .await?;

    Ok(())
}

/// Setting decoded from JSON
pub async fn get_json<T: DeserializeOwned>(db: &Pool<Sqlite>, key: &str) -> Result<Option<T>> {
    match get_setting(db, key).await? {
        Some(value) => Ok(Some(serde_json::from_str(&value)?)),
        None => Ok(None),
    }
}

/// Setting encoded as JSON
pub async fn set_json<T: Serialize>(db: &Pool<Sqlite>, key: &str, value: &T) -> Result<()> {
    let encoded = serde_json::to_string(value)?;
    set_setting(db, key, &encoded).await
}
