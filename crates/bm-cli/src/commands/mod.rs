//! Command handler modules for bm-cli.
//!
//! Shared config and store bootstrap lives here; command-specific logic
//! lives in the submodules.

pub mod orders;
pub mod reconcile;

use anyhow::Result;
use bm_config::{
    load_layered_yaml, report_unused_keys, resolve_secrets_for_mode, ConfigMode, LoadedConfig,
    MarketSettings, UnusedKeyPolicy,
};
use bm_db::PgPurchaseSource;
use tracing::warn;

/// Merge `--config` layers; no layers means built-in defaults.
pub fn load_config(paths: &[String]) -> Result<LoadedConfig> {
    if paths.is_empty() {
        return Ok(LoadedConfig::empty());
    }
    let path_refs: Vec<&str> = paths.iter().map(|s| s.as_str()).collect();
    load_layered_yaml(&path_refs)
}

/// Typed settings plus the unused-key check for `mode`.
pub fn settings_for(mode: ConfigMode, loaded: &LoadedConfig, strict: bool) -> Result<MarketSettings> {
    let policy = if strict {
        UnusedKeyPolicy::Fail
    } else {
        UnusedKeyPolicy::Warn
    };
    let report = report_unused_keys(mode, &loaded.config_json, policy)?;
    if !report.is_clean() {
        warn!(mode = %report.mode, keys = ?report.unused_leaf_pointers, "config contains unused keys");
    }
    MarketSettings::from_config_json(&loaded.config_json)
}

/// Store-backed purchase source; the connection string comes from the env
/// var named in config (`BM_DATABASE_URL` by default).
pub async fn connect_store(loaded: &LoadedConfig) -> Result<PgPurchaseSource> {
    let secrets = resolve_secrets_for_mode(&loaded.config_json, ConfigMode::Service)?;
    let pool = bm_db::connect(secrets.require_database_url()?).await?;
    Ok(PgPurchaseSource::new(pool))
}
