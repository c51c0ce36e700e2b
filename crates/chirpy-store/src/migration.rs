//! Document schema upgrades.
//!
//! Upgrades are stored as an ordered table of steps keyed by the version
//! they produce. Each step rewrites the raw JSON value of the previous
//! version, so an old document is never deserialized into the current
//! types before it has been brought up to date. A document without a
//! `schema_version` field is version 0.

use serde_json::{Map, Value};
use tracing::{debug, info, warn};

use crate::document::SCHEMA_VERSION;
use crate::error::{StoreError, StoreResult};

/// A single upgrade step.
struct Migration {
    /// Version this step produces (1, 2, 3, ...).
    version: u32,
    /// Human-readable description.
    description: &'static str,
    /// Rewrites the top-level object from `version - 1` to `version`.
    apply: fn(&mut Map<String, Value>) -> Result<(), String>,
}

/// All upgrade steps in order. Add new steps to the end of this array and
/// bump [`SCHEMA_VERSION`].
static MIGRATIONS: &[Migration] = &[Migration {
    version: 1,
    description: "versioned document with id sequences; account password renamed to secret_hash",
    apply: v1_versioned_document,
}];

// ── public API ───────────────────────────────────────────────────────

/// Return the schema version of a raw document, or 0 if it has none.
pub fn document_version(value: &Value) -> StoreResult<u32> {
    let obj = value.as_object().ok_or_else(|| StoreError::MalformedDocument {
        reason: "top-level value is not an object".into(),
    })?;
    match obj.get("schema_version") {
        None => Ok(0),
        Some(v) => v
            .as_u64()
            .and_then(|v| u32::try_from(v).ok())
            .ok_or_else(|| StoreError::MalformedDocument {
                reason: format!("invalid schema_version: {v}"),
            }),
    }
}

/// Bring a raw document up to [`SCHEMA_VERSION`].
///
/// Returns the upgraded value and whether any step ran.
pub fn upgrade(mut value: Value) -> StoreResult<(Value, bool)> {
    let current = document_version(&value)?;
    if current > SCHEMA_VERSION {
        return Err(StoreError::UnsupportedSchema {
            found: current,
            supported: SCHEMA_VERSION,
        });
    }

    let pending: Vec<&Migration> = MIGRATIONS.iter().filter(|m| m.version > current).collect();
    if pending.is_empty() {
        debug!(current_version = current, "document schema is up to date");
        return Ok((value, false));
    }

    info!(
        current_version = current,
        pending = pending.len(),
        "upgrading document schema"
    );

    let Some(obj) = value.as_object_mut() else {
        return Err(StoreError::MalformedDocument {
            reason: "top-level value is not an object".into(),
        });
    };
    for migration in pending {
        info!(
            version = migration.version,
            description = migration.description,
            "applying migration"
        );
        if let Err(message) = (migration.apply)(obj) {
            warn!(version = migration.version, %message, "migration failed");
            return Err(StoreError::Migration {
                version: migration.version,
                message,
            });
        }
        obj.insert("schema_version".into(), Value::from(migration.version));
    }

    Ok((value, true))
}

// ── steps ────────────────────────────────────────────────────────────

fn v1_versioned_document(obj: &mut Map<String, Value>) -> Result<(), String> {
    let mut sequences = Map::new();

    for collection in ["chirps", "users"] {
        let records = obj
            .entry(collection)
            .or_insert_with(|| Value::Object(Map::new()));
        // Early documents could serialize an empty map as null.
        if records.is_null() {
            *records = Value::Object(Map::new());
        }
        let records = records
            .as_object_mut()
            .ok_or_else(|| format!("collection {collection} is not an object"))?;

        let mut highest = 0u64;
        for (key, record) in records.iter_mut() {
            let id: u64 = key
                .parse()
                .map_err(|_| format!("{collection}: non-numeric id {key:?}"))?;
            highest = highest.max(id);

            if collection == "users" {
                let record = record
                    .as_object_mut()
                    .ok_or_else(|| format!("users.{key} is not an object"))?;
                if let Some(hash) = record.remove("password") {
                    record.entry("secret_hash").or_insert(hash);
                }
            }
        }
        sequences.insert(collection.to_string(), Value::from(highest));
    }

    obj.insert("sequences".into(), Value::Object(sequences));
    Ok(())
}

// ── tests ────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::document::Document;

    #[test]
    fn migrations_are_ordered() {
        for window in MIGRATIONS.windows(2) {
            assert!(
                window[1].version > window[0].version,
                "migration versions must be strictly increasing: {} >= {}",
                window[0].version,
                window[1].version,
            );
        }
    }

    #[test]
    fn latest_migration_matches_schema_version() {
        assert_eq!(MIGRATIONS.last().map(|m| m.version), Some(SCHEMA_VERSION));
    }

    #[test]
    fn missing_version_is_zero() {
        assert_eq!(document_version(&json!({"chirps": {}})).unwrap(), 0);
    }

    #[test]
    fn non_object_is_malformed() {
        let err = document_version(&json!([1, 2, 3])).unwrap_err();
        assert!(matches!(err, StoreError::MalformedDocument { .. }));
    }

    #[test]
    fn legacy_document_upgrades() {
        let legacy = json!({
            "chirps": {
                "1": {"id": 1, "body": "first"},
                "2": {"id": 2, "body": "second"}
            },
            "users": {
                "1": {"id": 1, "email": "a@x.com", "password": "legacy-hash"}
            }
        });

        let (upgraded, changed) = upgrade(legacy).unwrap();
        assert!(changed);
        assert_eq!(upgraded["schema_version"], 1);
        assert_eq!(upgraded["sequences"]["chirps"], 2);
        assert_eq!(upgraded["sequences"]["users"], 1);
        assert_eq!(upgraded["users"]["1"]["secret_hash"], "legacy-hash");
        assert!(upgraded["users"]["1"].get("password").is_none());

        let doc: Document = serde_json::from_value(upgraded).unwrap();
        assert_eq!(doc.messages.len(), 2);
        assert_eq!(doc.accounts[&1].secret_hash, "legacy-hash");
    }

    #[test]
    fn legacy_null_collections_become_empty() {
        let (upgraded, _) = upgrade(json!({"chirps": null})).unwrap();
        let doc: Document = serde_json::from_value(upgraded).unwrap();
        assert!(doc.messages.is_empty());
        assert!(doc.accounts.is_empty());
    }

    #[test]
    fn current_document_is_untouched() {
        let current = serde_json::to_value(Document::empty()).unwrap();
        let (upgraded, changed) = upgrade(current.clone()).unwrap();
        assert!(!changed);
        assert_eq!(upgraded, current);
    }

    #[test]
    fn newer_version_is_rejected() {
        let err = upgrade(json!({"schema_version": SCHEMA_VERSION + 1})).unwrap_err();
        match err {
            StoreError::UnsupportedSchema { found, supported } => {
                assert_eq!(found, SCHEMA_VERSION + 1);
                assert_eq!(supported, SCHEMA_VERSION);
            }
            other => panic!("expected UnsupportedSchema, got: {other}"),
        }
    }

    #[test]
    fn non_numeric_id_fails_migration() {
        let err = upgrade(json!({"chirps": {"abc": {"id": 1, "body": "x"}}})).unwrap_err();
        assert!(matches!(err, StoreError::Migration { version: 1, .. }));
    }
}
