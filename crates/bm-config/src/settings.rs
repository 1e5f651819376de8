//! Typed settings extracted from the merged config JSON.
//!
//! Absent keys take the built-in defaults. Present keys with the wrong type
//! or an out-of-range value are errors: a typo in a fee must not silently
//! fall back to the default fee.

use std::collections::BTreeSet;

use anyhow::{anyhow, bail, Result};
use bm_analytics::{DashboardSettings, PayoutPolicy};
use bm_reconcile::{ReconcilePolicy, PLACEHOLDER_REFERENCE};
use chrono::Duration;
use chrono_tz::Tz;
use serde_json::Value;

/// Chart range upper bound; longer ranges belong in a report, not a dashboard.
const MAX_MONTHS: u64 = 36;

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct MarketSettings {
    pub reconcile: ReconcilePolicy,
    pub payout: PayoutPolicy,
    pub dashboard: DashboardSettings,
    /// `/daemon/bind_addr`; `BM_DAEMON_ADDR` wins when both are set.
    pub daemon_bind_addr: Option<String>,
}

impl MarketSettings {
    pub fn from_config_json(config: &Value) -> Result<Self> {
        let mut out = MarketSettings::default();

        if let Some(secs) = read_u64(config, "/reconcile/stale_after_secs")? {
            if secs == 0 {
                bail!("CONFIG_INVALID /reconcile/stale_after_secs: must be > 0");
            }
            out.reconcile.stale_after = i64::try_from(secs)
                .ok()
                .and_then(Duration::try_seconds)
                .ok_or_else(|| {
                    anyhow!("CONFIG_INVALID /reconcile/stale_after_secs: {} is out of range", secs)
                })?;
        }
        if let Some(mut refs) = read_string_set(config, "/reconcile/placeholder_refs")? {
            // The store writes this on every draft; it is never a gateway id.
            refs.insert(PLACEHOLDER_REFERENCE.to_string());
            out.reconcile.placeholder_refs = refs;
        }
        if let Some(refs) = read_string_set(config, "/reconcile/test_refs")? {
            out.reconcile.test_refs = refs;
        }
        if let Some(shared) = out
            .reconcile
            .placeholder_refs
            .intersection(&out.reconcile.test_refs)
            .next()
        {
            bail!(
                "CONFIG_INVALID /reconcile: '{}' is both a placeholder and a test reference",
                shared
            );
        }

        if let Some(bps) = read_u64(config, "/payout/platform_fee_bps")? {
            if bps > 10_000 {
                bail!("CONFIG_INVALID /payout/platform_fee_bps: {} exceeds 10000", bps);
            }
            out.payout.platform_fee_bps = bps as u32;
        }
        if let Some(plans) = read_string_set(config, "/payout/fee_exempt_plans")? {
            out.payout.fee_exempt_plans = plans;
        }

        if let Some(name) = read_str(config, "/analytics/timezone")? {
            out.dashboard.timezone = name
                .parse::<Tz>()
                .map_err(|_| anyhow!("CONFIG_INVALID /analytics/timezone: unknown zone '{}'", name))?;
        }
        if let Some(months) = read_u64(config, "/analytics/months")? {
            if months == 0 || months > MAX_MONTHS {
                bail!(
                    "CONFIG_INVALID /analytics/months: {} not in 1..={}",
                    months,
                    MAX_MONTHS
                );
            }
            out.dashboard.months = months as u32;
        }

        out.daemon_bind_addr = read_str(config, "/daemon/bind_addr")?;

        Ok(out)
    }
}

fn read_u64(config: &Value, pointer: &str) -> Result<Option<u64>> {
    match config.pointer(pointer) {
        None | Some(Value::Null) => Ok(None),
        Some(v) => v
            .as_u64()
            .map(Some)
            .ok_or_else(|| anyhow!("CONFIG_INVALID {}: expected a non-negative integer", pointer)),
    }
}

fn read_str(config: &Value, pointer: &str) -> Result<Option<String>> {
    match config.pointer(pointer) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) if !s.trim().is_empty() => Ok(Some(s.trim().to_string())),
        Some(_) => bail!("CONFIG_INVALID {}: expected a non-empty string", pointer),
    }
}

fn read_string_set(config: &Value, pointer: &str) -> Result<Option<BTreeSet<String>>> {
    let arr = match config.pointer(pointer) {
        None | Some(Value::Null) => return Ok(None),
        Some(Value::Array(arr)) => arr,
        Some(_) => bail!("CONFIG_INVALID {}: expected a list of strings", pointer),
    };
    let mut out = BTreeSet::new();
    for (i, v) in arr.iter().enumerate() {
        match v.as_str().map(str::trim) {
            Some(s) if !s.is_empty() => {
                out.insert(s.to_string());
            }
            _ => bail!("CONFIG_INVALID {}/{}: expected a non-empty string", pointer, i),
        }
    }
    Ok(Some(out))
}
