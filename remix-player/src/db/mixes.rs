//! Persistent mix storage
//!
//! The whole mix collection is stored as one JSON array under a fixed
//! namespace in the storage table. Mixes are small and few, so
//! load-modify-save keeps the code simple and makes every write atomic
//! at the collection level.

use remix_common::interchange;
use remix_common::models::Mix;
use sqlx::{Pool, Sqlite};
use tracing::info;
use uuid::Uuid;

use crate::db::storage::{get_value, set_value};
use crate::error::{Error, Result};

const MIXES_NAMESPACE: &str = "music-mixer-mixes";

/// Load the full stored mix collection
pub async fn list_mixes(db: &Pool<Sqlite>) -> Result<Vec<Mix>> {
    match get_value::<String>(db, MIXES_NAMESPACE).await? {
        Some(json) => {
            let mixes = serde_json::from_str(&json)
                .map_err(|e| Error::Validation(format!("Corrupt stored mixes: {}", e)))?;
            Ok(mixes)
        }
        None => Ok(Vec::new()),
    }
}

/// Get one stored mix by id
pub async fn get_mix(db: &Pool<Sqlite>, id: Uuid) -> Result<Option<Mix>> {
    Ok(list_mixes(db).await?.into_iter().find(|m| m.id == id))
}

/// Save a mix, inserting or replacing by id
pub async fn save_mix(db: &Pool<Sqlite>, mix: Mix) -> Result<Mix> {
    let mut mix = mix;
    mix.normalize();

    let mut mixes = list_mixes(db).await?;
    match mixes.iter_mut().find(|m| m.id == mix.id) {
        Some(existing) => *existing = mix.clone(),
        None => mixes.push(mix.clone()),
    }
    persist(db, &mixes).await?;

    info!("Saved mix {} ({})", mix.id, mix.name);
    Ok(mix)
}

/// Delete a stored mix; returns false when the id is unknown
pub async fn delete_mix(db: &Pool<Sqlite>, id: Uuid) -> Result<bool> {
    let mut mixes = list_mixes(db).await?;
    let before = mixes.len();
    mixes.retain(|m| m.id != id);
    if mixes.len() == before {
        return Ok(false);
    }
    persist(db, &mixes).await?;

    info!("Deleted mix {}", id);
    Ok(true)
}

/// Export a stored mix as interchange JSON
pub async fn export_mix(db: &Pool<Sqlite>, id: Uuid) -> Result<String> {
    let mix = get_mix(db, id)
        .await?
        .ok_or_else(|| Error::NotFound(format!("mix {}", id)))?;
    Ok(interchange::export_mix(&mix)?)
}

/// Import a mix from interchange JSON and persist it under a fresh id
///
/// Validation failures happen before any write, so stored state is
/// untouched when the payload is rejected.
pub async fn import_mix(db: &Pool<Sqlite>, json: &str) -> Result<Mix> {
    let imported = interchange::import_mix(json)?;
    save_mix(db, imported).await
}

async fn persist(db: &Pool<Sqlite>, mixes: &[Mix]) -> Result<()> {
    let json = serde_json::to_string(mixes)
        .map_err(|e| Error::Internal(format!("Failed to serialize mixes: {}", e)))?;
    set_value(db, MIXES_NAMESPACE, json).await
}
