//! Namespaced key-value storage access
//!
//! Generic get/set over the storage table plus typed helpers for the
//! player settings that persist across restarts.

use std::str::FromStr;

use sqlx::{Pool, Sqlite};

use crate::error::{Error, Result};

/// Generic value getter
pub async fn get_value<T: FromStr>(db: &Pool<Sqlite>, namespace: &str) -> Result<Option<T>> {
    let value: Option<String> =
        sqlx::query_scalar("SELECT value FROM storage WHERE namespace = ?")
            .bind(namespace)
            .fetch_optional(db)
            .await?;

    match value {
        Some(s) => match s.parse::<T>() {
            Ok(parsed) => Ok(Some(parsed)),
            Err(_) => Err(Error::Config(format!(
                "Failed to parse stored value for '{}': {}",
                namespace, s
            ))),
        },
        None => Ok(None),
    }
}

/// Generic value setter (insert or update)
pub async fn set_value<T: ToString>(db: &Pool<Sqlite>, namespace: &str, value: T) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO storage (namespace, value, updated_at)
        VALUES (?, ?, datetime('now'))
        ON CONFLICT(namespace) DO UPDATE
            SET value = excluded.value, updated_at = excluded.updated_at
        "#,
    )
    .bind(namespace)
    .bind(value.to_string())
    .execute(db)
    .await?;

    Ok(())
}

/// Get persisted volume (0.0-1.0)
pub async fn get_volume(db: &Pool<Sqlite>) -> Result<f32> {
    match get_value::<f32>(db, "volume_level").await? {
        Some(vol) => Ok(vol.clamp(0.0, 1.0)),
        None => {
            set_volume(db, 1.0).await?;
            Ok(1.0)
        }
    }
}

/// Persist volume (0.0-1.0)
pub async fn set_volume(db: &Pool<Sqlite>, volume: f32) -> Result<()> {
    set_value(db, "volume_level", volume.clamp(0.0, 1.0)).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::init::memory_pool;

    #[tokio::test]
    async fn volume_defaults_then_round_trips() {
        let pool = memory_pool().await;

        assert_eq!(get_volume(&pool).await.unwrap(), 1.0);

        set_volume(&pool, 0.3).await.unwrap();
        assert_eq!(get_volume(&pool).await.unwrap(), 0.3);

        // Out-of-range values are clamped on write
        set_volume(&pool, 2.5).await.unwrap();
        assert_eq!(get_volume(&pool).await.unwrap(), 1.0);
    }

    #[tokio::test]
    async fn unparseable_value_is_a_config_error() {
        let pool = memory_pool().await;
        set_value(&pool, "volume_level", "loud").await.unwrap();

        assert!(matches!(
            get_value::<f32>(&pool, "volume_level").await,
            Err(Error::Config(_))
        ));
    }
}
