//! Command handler modules for gasp-cli.
//!
//! Shared utilities used by multiple command paths live here.

pub mod sync;

use anyhow::{Context, Result};
use gasp_config::LoadedConfig;
use gasp_rows::{CsvRowSource, RowSource};

/// Merge the `--config` layers in the order given.
pub fn load_config(config_paths: &[String]) -> Result<LoadedConfig> {
    let path_refs: Vec<&str> = config_paths.iter().map(String::as_str).collect();
    gasp_config::load_layered_yaml(&path_refs)
}

/// `--rows` wins; otherwise `rows.dir` from config.
pub fn resolve_rows_dir(cli_rows: Option<String>, cfg: &LoadedConfig) -> Result<String> {
    if let Some(dir) = cli_rows {
        return Ok(dir);
    }
    cfg.get_str("rows.dir")
        .context("ROWS_DIR_MISSING: pass --rows or set rows.dir in config")
}

/// `gasp check`: run the Row Validator over a CSV directory.
pub fn check_rows(dir: &str) -> Result<()> {
    let source = CsvRowSource::new(dir);
    let keys = source
        .check_settings()
        .with_context(|| format!("rows check failed for '{dir}'"))?;
    println!(
        "rows_ok=true orders={} lineitems={} creatives={}",
        keys.order_names.len(),
        keys.lineitem_keys.len(),
        keys.creative_names.len()
    );
    Ok(())
}
