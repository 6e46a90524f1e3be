//! Mix interchange format (JSON export/import)
//!
//! A mix serializes losslessly to JSON, including the embedded song and
//! section snapshots. Import validates the shape before deserializing and
//! always assigns a fresh id so an imported mix can never collide with an
//! existing record.

use crate::error::{Error, Result};
use crate::models::Mix;
use chrono::Utc;
use uuid::Uuid;

/// Serialize a mix to pretty-printed interchange JSON
pub fn export_mix(mix: &Mix) -> Result<String> {
    Ok(serde_json::to_string_pretty(mix)?)
}

/// Parse interchange JSON into a mix with a fresh identity
///
/// Required fields: `id`, `name`, and an array-typed `sections`. A mix
/// failing validation is rejected without side effects; callers must not
/// mutate persisted state on error.
pub fn import_mix(data: &str) -> Result<Mix> {
    let value: serde_json::Value =
        serde_json::from_str(data).map_err(|e| Error::Validation(format!("malformed JSON: {e}")))?;

    let obj = value
        .as_object()
        .ok_or_else(|| Error::Validation("mix must be a JSON object".into()))?;

    for field in ["id", "name", "sections"] {
        if !obj.contains_key(field) {
            return Err(Error::Validation(format!("missing required field '{field}'")));
        }
    }
    if !obj["sections"].is_array() {
        return Err(Error::Validation("'sections' must be an array".into()));
    }

    let mut mix: Mix = serde_json::from_value(value)
        .map_err(|e| Error::Validation(format!("invalid mix structure: {e}")))?;

    // Fresh id avoids colliding with existing records
    mix.id = Uuid::new_v4();
    mix.name = format!("{} (Imported)", mix.name);
    mix.updated_at = Utc::now();

    Ok(mix)
}
