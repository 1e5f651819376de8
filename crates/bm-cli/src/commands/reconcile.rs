//! `bm reconcile`: offline reconciliation of a JSON export.

use std::fs;

use anyhow::{Context, Result};
use bm_config::ConfigMode;
use bm_reconcile::{reconcile_inputs, RecordInput, View};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Either a bare array of records or `{"records": [...]}` as the daemon
/// accepts it.
#[derive(Deserialize)]
#[serde(untagged)]
enum InputFile {
    Bare(Vec<RecordInput>),
    Wrapped { records: Vec<RecordInput> },
}

impl InputFile {
    fn into_records(self) -> Vec<RecordInput> {
        match self {
            InputFile::Bare(r) | InputFile::Wrapped { records: r } => r,
        }
    }
}

#[derive(Serialize)]
struct Output<'a> {
    view: &'a View,
    now: DateTime<Utc>,
    config_hash: &'a str,
    superseded: usize,
    abandoned: usize,
    #[serde(flatten)]
    report: &'a bm_reconcile::ReconcileReport,
}

pub struct ReconcileArgs {
    pub input: String,
    pub seller: Option<String>,
    pub now: Option<DateTime<Utc>>,
    pub config_paths: Vec<String>,
    pub strict_config: bool,
}

pub fn run(args: ReconcileArgs) -> Result<()> {
    let loaded = super::load_config(&args.config_paths)?;
    let settings = super::settings_for(ConfigMode::Offline, &loaded, args.strict_config)?;

    let raw = fs::read_to_string(&args.input)
        .with_context(|| format!("read input failed: {}", args.input))?;
    // Tolerate a UTF-8 BOM from spreadsheet exports.
    let raw = raw.strip_prefix('\u{feff}').unwrap_or(&raw);
    let parsed: InputFile = serde_json::from_str(raw)
        .with_context(|| format!("input is not a JSON record list: {}", args.input))?;

    let view = match args.seller {
        Some(seller_id) => View::Seller(seller_id),
        None => View::Buyer,
    };
    let now = args.now.unwrap_or_else(Utc::now);

    let report = reconcile_inputs(parsed.into_records(), &view, now, &settings.reconcile)?;

    let out = Output {
        view: &view,
        now,
        config_hash: &loaded.config_hash,
        superseded: report.superseded_count(),
        abandoned: report.abandoned_count(),
        report: &report,
    };
    println!(
        "{}",
        serde_json::to_string_pretty(&out).context("serialize report failed")?
    );
    Ok(())
}
