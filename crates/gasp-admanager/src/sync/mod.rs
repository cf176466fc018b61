//! Entity synchronizers.
//!
//! Each stage turns rows into desired settings, reads the matching remote
//! objects, diffs them, and creates only what is missing. Stages process
//! rows in chunks of `chunk_size` with a fixed pause between chunks.

pub mod associations;
pub mod creatives;
pub mod lineitems;
pub mod orders;
pub mod targeting;

use std::time::Duration;

use anyhow::{bail, Result};
use gasp_config::LoadedConfig;
use gasp_reconcile::{compare_objects, handle_compare_result, Setting};
use serde::Serialize;
use serde_json::Value;
use tracing::info;

use crate::cache::AdManager;
use crate::error::SyncError;
use crate::service::{AdManagerService, Endpoint};

pub use associations::sync_associations;
pub use creatives::sync_creatives;
pub use lineitems::sync_lineitems;
pub use orders::sync_orders;

/// Largest chunk the platform accepts in a single create call.
pub const MAX_CHUNK_SIZE: usize = 500;

/// Knobs shared by every stage.
///
/// Fields are private so `chunk_size` is always in `1..=MAX_CHUNK_SIZE`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncSettings {
    chunk_size: usize,
    pause: Duration,
    currency_code: String,
    safe_frame_compatible: bool,
    lineitem_type: String,
}

impl SyncSettings {
    pub fn new(chunk_size: usize, pause: Duration, currency_code: &str) -> Result<Self> {
        if chunk_size == 0 || chunk_size > MAX_CHUNK_SIZE {
            bail!("CONFIG_INVALID sync.chunk_size={chunk_size} (expected 1..={MAX_CHUNK_SIZE})");
        }
        if currency_code.trim().is_empty() {
            bail!("CONFIG_EMPTY_VALUE path=ad_manager.currency_code");
        }
        Ok(Self {
            chunk_size,
            pause,
            currency_code: currency_code.trim().to_string(),
            safe_frame_compatible: true,
            lineitem_type: "PRICE_PRIORITY".to_string(),
        })
    }

    pub fn from_config(cfg: &LoadedConfig) -> Result<Self> {
        let settings = Self::new(
            cfg.get_u64_or_default("sync.chunk_size")? as usize,
            Duration::from_millis(cfg.get_u64_or_default("sync.pause_ms")?),
            &cfg.get_str("ad_manager.currency_code")?,
        )?;
        Ok(settings
            .with_safe_frame_compatible(cfg.get_bool_or_default("creative.safe_frame_compatible")?)
            .with_lineitem_type(&cfg.get_str_or_default("lineitem.type")?))
    }

    /// Settings for in-process runs: no pause, default chunking.
    pub fn for_tests(currency_code: &str) -> Self {
        Self {
            chunk_size: 30,
            pause: Duration::ZERO,
            currency_code: currency_code.to_string(),
            safe_frame_compatible: true,
            lineitem_type: "PRICE_PRIORITY".to_string(),
        }
    }

    pub fn with_safe_frame_compatible(mut self, yes: bool) -> Self {
        self.safe_frame_compatible = yes;
        self
    }

    pub fn with_lineitem_type(mut self, lineitem_type: &str) -> Self {
        self.lineitem_type = lineitem_type.to_string();
        self
    }

    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    pub fn pause(&self) -> Duration {
        self.pause
    }

    pub fn currency_code(&self) -> &str {
        &self.currency_code
    }

    pub fn safe_frame_compatible(&self) -> bool {
        self.safe_frame_compatible
    }

    pub fn lineitem_type(&self) -> &str {
        &self.lineitem_type
    }
}

/// Outcome counts for one stage.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StageReport {
    pub stage: &'static str,
    pub chunks: usize,
    pub desired: usize,
    pub existing: usize,
    pub created: usize,
}

impl StageReport {
    pub fn new(stage: &'static str) -> Self {
        Self {
            stage,
            ..Self::default()
        }
    }
}

/// Sleeps `pause` before every chunk except the first.
pub(crate) struct Pacer {
    pause: Duration,
    started: bool,
}

impl Pacer {
    pub(crate) fn new(pause: Duration) -> Self {
        Self {
            pause,
            started: false,
        }
    }

    pub(crate) async fn next_chunk(&mut self, report: &mut StageReport) {
        if self.started && !self.pause.is_zero() {
            tokio::time::sleep(self.pause).await;
        }
        self.started = true;
        report.chunks += 1;
    }
}

/// Values of `key` across `settings`, in order.
pub(crate) fn key_values(settings: &[Setting], key: &str) -> Vec<Value> {
    settings.iter().filter_map(|s| s.get(key).cloned()).collect()
}

/// Diff one chunk, abort on any divergence, create the rest.
#[allow(clippy::too_many_arguments)]
pub(crate) async fn reconcile_chunk<S: AdManagerService>(
    am: &mut AdManager<S>,
    report: &mut StageReport,
    key: &str,
    desired: Vec<Setting>,
    existing: &[Value],
    key_only: bool,
    create: Endpoint,
) -> Result<(), SyncError> {
    let desired_len = desired.len();
    let result = compare_objects(key, desired, existing, key_only);
    handle_compare_result(report.stage, &result)?;

    report.desired += desired_len;
    report.existing += result.existing.len();

    if result.notfound.is_empty() {
        return Ok(());
    }
    let objects: Vec<Value> = result.notfound.into_iter().map(Value::Object).collect();
    let n = objects.len();
    am.create(create, objects).await?;
    report.created += n;
    info!(stage = report.stage, created = n, "created missing objects");
    Ok(())
}
