//! gasp-config
//!
//! Layered configuration for a sync run.
//!
//! - YAML (or JSON, which is valid YAML) documents are merged in order: later
//!   layers override earlier ones key by key.
//! - The merged document is serialized with sorted keys and hashed, so every
//!   sync run can print the exact configuration it used.
//! - Values are read by dotted path (`ad_manager.network_code`), with an
//!   optional fallback to built-in defaults.
//! - Credentials never live in config: only the NAME of the env var holding
//!   them (see [`secrets`]).

pub mod secrets;

use anyhow::{anyhow, bail, Context, Result};
use serde_json::Value;
use sha2::{Digest, Sha256};
use std::fs;
use std::sync::OnceLock;

/// Prefixes of credential material that must never be pasted into config.
const SECRET_PREFIXES: &[&str] = &[
    "-----BEGIN", // PEM private keys (service-account key material)
    "ya29.",      // Google OAuth access token
    "AIza",       // Google API key
    "1//",        // Google OAuth refresh token
];

/// Built-in defaults consulted by [`LoadedConfig::get_or_default`].
pub fn defaults() -> &'static Value {
    static DEFAULTS: OnceLock<Value> = OnceLock::new();
    DEFAULTS.get_or_init(|| {
        serde_json::json!({
            "ad_manager": {
                "application_name": "gasp",
                "token_env": "GASP_AD_MANAGER_TOKEN",
            },
            "sync": {
                "chunk_size": 30,
                "pause_ms": 1000,
            },
            "creative": {
                "safe_frame_compatible": true,
            },
            "lineitem": {
                "type": "PRICE_PRIORITY",
            },
        })
    })
}

/// Walk a dotted path (`a.b.c`) through nested objects.
///
/// Every intermediate segment must resolve to an object; the last segment may
/// hold any value.
pub fn get_field<'a>(path: &str, config: &'a Value) -> Option<&'a Value> {
    let mut cur = config;
    for part in path.split('.') {
        cur = cur.as_object()?.get(part)?;
    }
    Some(cur)
}

#[derive(Debug, Clone)]
pub struct LoadedConfig {
    pub config_hash: String,
    pub canonical_json: String,
    pub config_json: Value,
}

impl LoadedConfig {
    /// Value at dotted `path`; CONFIG_KEY_MISSING when absent.
    pub fn get(&self, path: &str) -> Result<&Value> {
        get_field(path, &self.config_json).ok_or_else(|| anyhow!("CONFIG_KEY_MISSING path={path}"))
    }

    /// Value at dotted `path`, falling back to [`defaults`].
    pub fn get_or_default(&self, path: &str) -> Result<&Value> {
        match get_field(path, &self.config_json) {
            Some(v) => Ok(v),
            None => get_field(path, defaults())
                .ok_or_else(|| anyhow!("CONFIG_KEY_MISSING path={path} (no default)")),
        }
    }

    /// Non-empty string at `path`. Numbers are accepted and rendered
    /// (network codes are often written unquoted).
    pub fn get_str(&self, path: &str) -> Result<String> {
        as_string(path, self.get(path)?)
    }

    pub fn get_str_or_default(&self, path: &str) -> Result<String> {
        as_string(path, self.get_or_default(path)?)
    }

    pub fn get_u64_or_default(&self, path: &str) -> Result<u64> {
        let v = self.get_or_default(path)?;
        v.as_u64()
            .ok_or_else(|| anyhow!("CONFIG_TYPE_MISMATCH path={path}: expected unsigned integer, got {v}"))
    }

    pub fn get_bool_or_default(&self, path: &str) -> Result<bool> {
        let v = self.get_or_default(path)?;
        v.as_bool()
            .ok_or_else(|| anyhow!("CONFIG_TYPE_MISMATCH path={path}: expected bool, got {v}"))
    }
}

fn as_string(path: &str, v: &Value) -> Result<String> {
    let s = match v {
        Value::String(s) => s.trim().to_string(),
        Value::Number(n) => n.to_string(),
        other => bail!("CONFIG_TYPE_MISMATCH path={path}: expected string, got {other}"),
    };
    if s.is_empty() {
        bail!("CONFIG_EMPTY_VALUE path={path}");
    }
    Ok(s)
}

/// Read and merge config files, first path is the base layer.
pub fn load_layered_yaml(paths: &[&str]) -> Result<LoadedConfig> {
    let docs = paths
        .iter()
        .map(|p| fs::read_to_string(p).with_context(|| format!("failed to read config path: {p}")))
        .collect::<Result<Vec<String>>>()?;
    let refs: Vec<&str> = docs.iter().map(String::as_str).collect();
    load_layered_yaml_from_strings(&refs)
}

pub fn load_layered_yaml_from_strings(yaml_docs: &[&str]) -> Result<LoadedConfig> {
    let mut merged = Value::Object(Default::default());
    for (layer, raw) in yaml_docs.iter().enumerate() {
        let doc: Value = serde_yaml::from_str(raw)
            .with_context(|| format!("config layer {layer}: invalid yaml"))?;
        merge_layer(&mut merged, doc);
    }

    if let Some(path) = find_secret_literal(&merged, &mut Vec::new()) {
        bail!("CONFIG_SECRET_DETECTED path={path} value=REDACTED");
    }

    // serde_json's Map is ordered, so this is canonical
    let canonical_json = serde_json::to_string(&merged).context("serialize merged config")?;
    let config_hash = hex::encode(Sha256::digest(canonical_json.as_bytes()));
    Ok(LoadedConfig {
        config_hash,
        canonical_json,
        config_json: merged,
    })
}

/// Objects merge key by key; anything else in `layer` replaces `base`.
fn merge_layer(base: &mut Value, layer: Value) {
    match (base, layer) {
        (Value::Object(base), Value::Object(layer)) => {
            for (key, value) in layer {
                match base.get_mut(&key) {
                    Some(slot) => merge_layer(slot, value),
                    None => {
                        base.insert(key, value);
                    }
                }
            }
        }
        (slot, value) => *slot = value,
    }
}

/// Dotted path of the first string that looks like pasted credentials.
fn find_secret_literal(v: &Value, path: &mut Vec<String>) -> Option<String> {
    match v {
        Value::Object(map) => map.iter().find_map(|(k, child)| {
            path.push(k.clone());
            let hit = find_secret_literal(child, path);
            path.pop();
            hit
        }),
        Value::Array(items) => items.iter().enumerate().find_map(|(i, child)| {
            path.push(i.to_string());
            let hit = find_secret_literal(child, path);
            path.pop();
            hit
        }),
        Value::String(s) if looks_like_secret(s) => Some(path.join(".")),
        _ => None,
    }
}

fn looks_like_secret(s: &str) -> bool {
    let t = s.trim();
    t.len() >= 8 && SECRET_PREFIXES.iter().any(|p| t.starts_with(p))
}
