//! Shared runtime state for bm-daemon.
//!
//! Handlers receive `State<Arc<AppState>>` from Axum. The state owns the
//! purchase source, the typed settings and the clock; nothing here is
//! mutable after boot.

use std::sync::Arc;

use bm_config::MarketSettings;
use bm_db::PurchaseSource;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Static build metadata included in health responses.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct BuildInfo {
    pub service: &'static str,
    pub version: &'static str,
}

type Clock = Arc<dyn Fn() -> DateTime<Utc> + Send + Sync>;

/// Cloneable (Arc) handle shared across all Axum handlers.
#[derive(Clone)]
pub struct AppState {
    pub build: BuildInfo,
    /// Raw purchase rows; reconciliation happens per request.
    pub source: Arc<dyn PurchaseSource>,
    pub settings: Arc<MarketSettings>,
    /// Staleness and relative-time labels are evaluated against this clock.
    clock: Clock,
    /// Hash of the merged config the daemon booted with.
    pub config_hash: String,
}

impl AppState {
    pub fn new(source: Arc<dyn PurchaseSource>, settings: MarketSettings) -> Self {
        Self {
            build: BuildInfo {
                service: "bm-daemon",
                version: env!("CARGO_PKG_VERSION"),
            },
            source,
            settings: Arc::new(settings),
            clock: Arc::new(Utc::now),
            config_hash: bm_config::LoadedConfig::empty().config_hash,
        }
    }

    pub fn with_config_hash(mut self, config_hash: impl Into<String>) -> Self {
        self.config_hash = config_hash.into();
        self
    }

    /// Pin the clock; tests use this to make staleness deterministic.
    pub fn with_fixed_now(mut self, now: DateTime<Utc>) -> Self {
        self.clock = Arc::new(move || now);
        self
    }

    pub fn now(&self) -> DateTime<Utc> {
        (self.clock)()
    }
}

/// Seconds since first call (process lifetime).
pub fn uptime_secs() -> u64 {
    static START: std::sync::OnceLock<std::time::Instant> = std::sync::OnceLock::new();
    START
        .get_or_init(std::time::Instant::now)
        .elapsed()
        .as_secs()
}
