//! Property assignment policy.
//!
//! Each target key gets exactly one write attempt per invocation. Writes are
//! logged at info level and skips at warn level, so every decision shows up in
//! the build output.

use serde::Serialize;

use crate::properties::PropertyStore;

/// What happened to one target key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum OverridePolicyResult {
    /// The key was absent and has been written.
    WriteNew,
    /// The key held a value which has been replaced. For the timestamp key the
    /// replacement accounts for the previous value.
    WriteMerged,
    /// The key held a value which was left untouched.
    SkipExisting,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Assignment {
    pub key: String,
    pub result: OverridePolicyResult,
    /// The value the store holds for `key` afterwards.
    pub value: String,
}

/// Write `value` unless `key` already holds something and `override_existing`
/// is off.
pub fn assign_description(
    store: &mut dyn PropertyStore,
    key: &str,
    value: &str,
    override_existing: bool,
) -> Assignment {
    match store.get(key) {
        None => write(store, key, value.to_string(), OverridePolicyResult::WriteNew),
        Some(_) if override_existing => {
            write(store, key, value.to_string(), OverridePolicyResult::WriteMerged)
        }
        Some(existing) => skip(key, existing),
    }
}

/// Timestamp keys merge instead of plainly overriding.
///
/// - absent: `resolved_time` is written.
/// - present and an integer: with override the later of the two is written,
///   otherwise the existing value is kept.
/// - present but not an integer: replaced by `resolved_time` regardless of
///   override.
pub fn assign_timestamp(
    store: &mut dyn PropertyStore,
    key: &str,
    resolved_time: i64,
    override_existing: bool,
) -> Assignment {
    let Some(existing) = store.get(key) else {
        return write(
            store,
            key,
            resolved_time.to_string(),
            OverridePolicyResult::WriteNew,
        );
    };

    match existing.parse::<i64>() {
        Ok(previous) => {
            let merged = resolved_time.max(previous);
            if override_existing {
                tracing::debug!(
                    key,
                    previous,
                    resolved_time,
                    merged,
                    "Merging timestamp with previous value"
                );
                write(
                    store,
                    key,
                    merged.to_string(),
                    OverridePolicyResult::WriteMerged,
                )
            } else {
                skip(key, existing)
            }
        }
        Err(_) => {
            tracing::warn!(
                "Property \"{}\" holds non-numeric value \"{}\", replacing it",
                key,
                existing
            );
            write(
                store,
                key,
                resolved_time.to_string(),
                OverridePolicyResult::WriteMerged,
            )
        }
    }
}

fn write(
    store: &mut dyn PropertyStore,
    key: &str,
    value: String,
    result: OverridePolicyResult,
) -> Assignment {
    store.set(key, value.clone());
    tracing::info!("Set property \"{}\" to \"{}\"", key, value);
    Assignment {
        key: key.to_string(),
        result,
        value,
    }
}

fn skip(key: &str, existing: String) -> Assignment {
    tracing::warn!(
        "Property \"{}\" is already set to \"{}\", leaving it unchanged",
        key,
        existing
    );
    Assignment {
        key: key.to_string(),
        result: OverridePolicyResult::SkipExisting,
        value: existing,
    }
}
