//! Typed settings: overrides flow into the engine, payout and dashboard
//! policies; malformed values are errors rather than silent defaults.

use bm_config::{load_layered_yaml_from_strings, MarketSettings};
use bm_reconcile::{
    reconcile, ItemType, PurchaseItem, PurchaseRecord, PurchaseStatus, ReferenceKind, View,
    PLACEHOLDER_REFERENCE,
};
use chrono::{Duration, TimeZone, Utc};

fn settings(yaml: &str) -> anyhow::Result<MarketSettings> {
    let cfg = load_layered_yaml_from_strings(&[yaml])?.config_json;
    MarketSettings::from_config_json(&cfg)
}

#[test]
fn overrides_reach_every_policy() {
    let s = settings(
        r#"
reconcile:
  stale_after_secs: 1800
  placeholder_refs: ["pending", "awaiting_webhook"]
  test_refs: ["test", "simulated"]
payout:
  platform_fee_bps: 500
  fee_exempt_plans: ["Studio+"]
analytics:
  timezone: "America/New_York"
  months: 12
daemon:
  bind_addr: "0.0.0.0:8899"
"#,
    )
    .unwrap();

    assert_eq!(s.reconcile.stale_after, Duration::minutes(30));
    assert!(s.reconcile.placeholder_refs.contains("awaiting_webhook"));
    assert!(!s.reconcile.placeholder_refs.contains("pending_redirect"));
    assert!(s.reconcile.is_real_reference("pi_42"));
    assert!(!s.reconcile.is_real_reference("simulated"));

    assert_eq!(s.payout.platform_fee_bps, 500);
    assert_eq!(s.payout.fee_bps_for(Some("Pro")), 500);
    assert_eq!(s.payout.fee_bps_for(Some("Studio+")), 0);

    assert_eq!(s.dashboard.timezone, chrono_tz::America::New_York);
    assert_eq!(s.dashboard.months, 12);
    assert_eq!(s.daemon_bind_addr.as_deref(), Some("0.0.0.0:8899"));
}

#[test]
fn partial_config_keeps_other_defaults() {
    let s = settings("payout:\n  platform_fee_bps: 0\n").unwrap();
    assert_eq!(s.payout.platform_fee_bps, 0);
    assert_eq!(s.reconcile, bm_reconcile::ReconcilePolicy::default());
    assert_eq!(s.dashboard, bm_analytics::DashboardSettings::default());
}

#[test]
fn invalid_values_are_errors() {
    let cases = [
        ("reconcile:\n  stale_after_secs: 0\n", "/reconcile/stale_after_secs"),
        ("reconcile:\n  stale_after_secs: \"15m\"\n", "/reconcile/stale_after_secs"),
        ("reconcile:\n  stale_after_secs: 100000000000000000\n", "/reconcile/stale_after_secs"),
        ("reconcile:\n  stale_after_secs: 18446744073709551615\n", "/reconcile/stale_after_secs"),
        ("reconcile:\n  test_refs: \"test\"\n", "/reconcile/test_refs"),
        ("reconcile:\n  placeholder_refs: [\"pending\", \"\"]\n", "/reconcile/placeholder_refs/1"),
        ("payout:\n  platform_fee_bps: 10001\n", "/payout/platform_fee_bps"),
        ("payout:\n  platform_fee_bps: -5\n", "/payout/platform_fee_bps"),
        ("analytics:\n  timezone: \"Mars/Olympus\"\n", "/analytics/timezone"),
        ("analytics:\n  months: 0\n", "/analytics/months"),
        ("analytics:\n  months: 120\n", "/analytics/months"),
    ];
    for (yaml, pointer) in cases {
        let err = settings(yaml).unwrap_err().to_string();
        assert!(err.contains("CONFIG_INVALID"), "{yaml}: {err}");
        assert!(err.contains(pointer), "{yaml}: {err}");
    }
}

#[test]
fn placeholder_override_keeps_the_store_draft_sentinel() {
    let s = settings("reconcile:\n  placeholder_refs: [\"pending_redirect\"]\n").unwrap();
    let policy = &s.reconcile;
    assert!(policy.placeholder_refs.contains(PLACEHOLDER_REFERENCE));
    assert_eq!(policy.classify("pending"), ReferenceKind::Placeholder);
    assert_eq!(policy.classify("pending_redirect"), ReferenceKind::Placeholder);

    // Two unrelated drafts written by the store, both past the staleness
    // window: neither merges with the other, both are hidden as abandoned.
    let now = Utc.with_ymd_and_hms(2026, 6, 1, 12, 0, 0).unwrap();
    let draft = |id: &str, name: &str| {
        PurchaseRecord::new(id, now - Duration::hours(3), PurchaseStatus::Processing, "pending")
            .with_item(PurchaseItem::new("s1", name, ItemType::BeatLicense, 1_000_000))
    };
    let report = reconcile(&[draft("a", "Beat A"), draft("b", "Beat B")], &View::Buyer, now, policy)
        .unwrap();
    assert!(report.orders.is_empty());
    assert_eq!(report.abandoned_count(), 2);
    assert_eq!(report.superseded_count(), 0);
}

#[test]
fn store_draft_sentinel_cannot_be_reclassified_as_test() {
    let err = settings(
        "reconcile:\n  placeholder_refs: [\"pending_redirect\"]\n  test_refs: [\"pending\"]\n",
    )
    .unwrap_err()
    .to_string();
    assert!(err.contains("CONFIG_INVALID /reconcile"), "{err}");
    assert!(err.contains("'pending'"), "{err}");
}
