//! Runtime secret resolution.
//!
//! # Contract
//! - Config stores only the env var NAME (`ad_manager.token_env`), never the token.
//! - Callers invoke [`resolve_secrets`] once at startup and pass the result
//!   into constructors; no `std::env::var` calls elsewhere.
//! - `Debug` redacts values. Errors name the env var, never its value.

use anyhow::{bail, Result};
use serde_json::Value;

use crate::{defaults, get_field};

/// Secrets for one sync run. **Values are redacted in `Debug` output.**
#[derive(Clone)]
pub struct ResolvedSecrets {
    /// Bearer token for the Ad Manager gateway. `None` if the named env var
    /// was absent or blank.
    pub ad_manager_token: Option<String>,
    /// Name of the env var the token was read from.
    pub token_env: String,
}

impl std::fmt::Debug for ResolvedSecrets {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResolvedSecrets")
            .field(
                "ad_manager_token",
                &self.ad_manager_token.as_ref().map(|_| "<REDACTED>"),
            )
            .field("token_env", &self.token_env)
            .finish()
    }
}

fn read_str_at<'a>(config: &'a Value, path: &str) -> Option<&'a str> {
    let s = get_field(path, config)?.as_str()?.trim();
    if s.is_empty() {
        None
    } else {
        Some(s)
    }
}

fn resolve_env(var_name: &str) -> Option<String> {
    match std::env::var(var_name) {
        Ok(v) if !v.trim().is_empty() => Some(v),
        _ => None,
    }
}

/// Resolve the gateway token from the env var named by `ad_manager.token_env`
/// (default `GASP_AD_MANAGER_TOKEN`).
///
/// When `required` is set, a missing token fails with SECRETS_MISSING.
pub fn resolve_secrets(config_json: &Value, required: bool) -> Result<ResolvedSecrets> {
    let token_env = read_str_at(config_json, "ad_manager.token_env")
        .or_else(|| read_str_at(defaults(), "ad_manager.token_env"))
        .unwrap_or("GASP_AD_MANAGER_TOKEN")
        .to_string();

    let ad_manager_token = resolve_env(&token_env);
    if required && ad_manager_token.is_none() {
        bail!(
            "SECRETS_MISSING: required env var '{}' (ad manager token) is not set or empty",
            token_env
        );
    }

    Ok(ResolvedSecrets {
        ad_manager_token,
        token_env,
    })
}
