//! Unused-key report: keys nothing reads are reported (Warn) or rejected (Fail).

use bm_config::{load_layered_yaml_from_strings, report_unused_keys, ConfigMode, UnusedKeyPolicy};

const YAML: &str = r#"
reconcile:
  stale_after_secs: 600
payout:
  platform_fee_bps: 150
store:
  database_url_env: "BM_DATABASE_URL"
  pool_size: 5
legacy:
  paypal_mode: "sandbox"
"#;

fn config() -> serde_json::Value {
    load_layered_yaml_from_strings(&[YAML]).unwrap().config_json
}

#[test]
fn offline_warn_reports_store_and_unknown_sections() {
    let report = report_unused_keys(ConfigMode::Offline, &config(), UnusedKeyPolicy::Warn).unwrap();
    assert_eq!(report.mode, "OFFLINE");
    assert_eq!(
        report.unused_leaf_pointers,
        vec![
            "/legacy/paypal_mode".to_string(),
            "/store/database_url_env".to_string(),
            "/store/pool_size".to_string(),
        ]
    );
    assert!(!report.is_clean());
}

#[test]
fn service_mode_consumes_store_connection_name_only() {
    let report = report_unused_keys(ConfigMode::Service, &config(), UnusedKeyPolicy::Warn).unwrap();
    assert_eq!(
        report.unused_leaf_pointers,
        vec!["/legacy/paypal_mode".to_string(), "/store/pool_size".to_string()]
    );
}

#[test]
fn fail_policy_errors_with_preview() {
    let err = report_unused_keys(ConfigMode::Service, &config(), UnusedKeyPolicy::Fail)
        .unwrap_err()
        .to_string();
    assert!(err.contains("CONFIG_UNUSED_KEYS"), "got: {err}");
    assert!(err.contains("mode=SERVICE"));
    assert!(err.contains("/legacy/paypal_mode"));
}

#[test]
fn clean_config_passes_fail_policy() {
    let yaml = "reconcile:\n  test_refs: [\"test\", \"sim\"]\nanalytics:\n  months: 12\n";
    let cfg = load_layered_yaml_from_strings(&[yaml]).unwrap().config_json;
    let report = report_unused_keys(ConfigMode::Offline, &cfg, UnusedKeyPolicy::Fail).unwrap();
    assert!(report.is_clean());
    assert!(report.consumed_prefixes.contains(&"/analytics".to_string()));
}
