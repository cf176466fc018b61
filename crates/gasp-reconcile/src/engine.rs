use std::collections::BTreeMap;

use serde_json::Value;
use tracing::{info, warn};

use crate::{DiffResult, RemoteEntity, Setting, TYPE_DISCRIMINATOR};

/// Map key for a key-field value. JSON text keeps `"1"` and `1` apart.
fn key_repr(v: &Value) -> String {
    v.to_string()
}

/// `true` when every field of `setting` (minus the type discriminator) is
/// present in the serialized `existing` entity with an equal value.
///
/// Containment, not equality: the remote entity may carry any number of
/// extra server-populated fields. Nested values compare by full equality.
pub fn is_containing<E: RemoteEntity + ?Sized>(setting: &Setting, existing: &E) -> bool {
    let native = existing.to_fields();
    setting
        .iter()
        .filter(|(k, _)| k.as_str() != TYPE_DISCRIMINATOR)
        .all(|(k, v)| native.get(k) == Some(v))
}

/// Partition `settings` against `existing` by the `key` field.
///
/// - key absent from `existing` (or from the setting itself) => `notfound`
/// - key present and `key_only` => `existing`, no field comparison
/// - key present otherwise => [`is_containing`] decides `existing` / `different`
///
/// When two remote entities share a key the later one wins; this is logged
/// because the outcome then depends on remote result order.
pub fn compare_objects<E: RemoteEntity>(
    key: &str,
    settings: Vec<Setting>,
    existing: &[E],
    key_only: bool,
) -> DiffResult {
    let mut existing_map: BTreeMap<String, &E> = BTreeMap::new();
    for e in existing {
        let Some(k) = e.field(key) else {
            continue;
        };
        let repr = key_repr(k);
        if existing_map.insert(repr.clone(), e).is_some() {
            warn!(key, value = %repr, "remote returned duplicate key; last entity wins");
        }
    }

    let mut result = DiffResult::default();
    for s in settings {
        match s.get(key).and_then(|k| existing_map.get(&key_repr(k))) {
            None => result.notfound.push(s),
            Some(_) if key_only => result.existing.push(s),
            Some(e) => {
                if is_containing(&s, *e) {
                    result.existing.push(s);
                } else {
                    result.different.push(s);
                }
            }
        }
    }
    result
}

/// A desired setting's key matches a remote object with diverging fields.
///
/// Carries every conflicting setting for operator inspection.
#[derive(Clone, Debug, PartialEq)]
pub struct ExistingDifferentObject {
    pub object: String,
    pub settings: Vec<Setting>,
}

impl std::fmt::Display for ExistingDifferentObject {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let pretty = serde_json::to_string_pretty(&self.settings)
            .unwrap_or_else(|_| format!("{:?}", self.settings));
        write!(
            f,
            "{}: {} existing object(s) differ from the desired settings:\n{}",
            self.object,
            self.settings.len(),
            pretty
        )
    }
}

impl std::error::Error for ExistingDifferentObject {}

/// Apply the downstream policy to a diff:
/// - any `different` => hard stop with [`ExistingDifferentObject`]
/// - any `existing` => logged, nothing to do for those
///
/// Only `notfound` is left for the caller to create.
pub fn handle_compare_result(
    object_name: &str,
    result: &DiffResult,
) -> Result<(), ExistingDifferentObject> {
    if !result.different.is_empty() {
        return Err(ExistingDifferentObject {
            object: object_name.to_string(),
            settings: result.different.clone(),
        });
    }
    if !result.existing.is_empty() {
        info!(
            "{}: existing {}/{} objects",
            object_name,
            result.existing.len(),
            result.len()
        );
    }
    Ok(())
}
