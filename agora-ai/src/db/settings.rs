//! Settings database operations
//!
//! Key-value accessors over the settings table; the OpenAI API key stored here
//! takes priority over ENV and TOML (see `config::resolve_openai_api_key`).

use sqlx::SqlitePool;

use crate::error::{Error, Result};

/// Get OpenAI API key from database
///
/// Returns Some(key) if set, None otherwise
pub async fn get_openai_api_key(db: &SqlitePool) -> Result<Option<String>> {
    get_setting::<String>(db, "openai_api_key").await
}

/// Set OpenAI API key in database
pub async fn set_openai_api_key(db: &SqlitePool, key: String) -> Result<()> {
    set_setting(db, "openai_api_key", key).await
}

/// Generic setting getter (internal)
async fn get_setting<T>(db: &SqlitePool, key: &str) -> Result<Option<T>>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    let row: Option<(String,)> = sqlx::query_as("SELECT value FROM settings WHERE key = ?")
        .bind(key)
        .fetch_optional(db)
        .await?;

    match row {
        Some((value,)) => {
            let parsed = value
                .parse::<T>()
                .map_err(|e| Error::Config(format!("Parse setting failed: {}", e)))?;
            Ok(Some(parsed))
        }
        None => Ok(None),
    }
}

/// Generic setting setter (internal)
async fn set_setting<T>(db: &SqlitePool, key: &str, value: T) -> Result<()>
where
    T: std::fmt::Display,
{
    sqlx::query(
        "INSERT INTO settings (key, value) VALUES (?, ?)
         ON CONFLICT(key) DO UPDATE SET value = excluded.value",
    )
    .bind(key)
    .bind(value.to_string())
    .execute(db)
    .await?;

    Ok(())
}
