use std::fs;
use std::path::Path;

use assert_cmd::prelude::*;
use predicates::prelude::*;
use serde_json::json;

/// `bm reconcile` works on a JSON export with no store configured.

fn write(dir: &Path, name: &str, body: &str) -> String {
    let p = dir.join(name);
    fs::write(&p, body).expect("write fixture");
    p.to_string_lossy().to_string()
}

fn bm(dir: &Path) -> std::process::Command {
    let mut cmd = std::process::Command::cargo_bin("bm").expect("bm binary");
    // Keep a developer's .env.local and DB out of the picture.
    cmd.current_dir(dir).env_remove("BM_DATABASE_URL");
    cmd
}

fn checkout_stages() -> serde_json::Value {
    let cart = json!([
        {"seller_id": "seller-a", "item_name": "Night Drive", "item_type": "Beat License", "price_micros": 10000000},
        {"seller_id": "seller-a", "item_name": "Drum Stems", "item_type": "Sound Kit", "price_micros": 5000000},
        {"seller_id": "seller-b", "item_name": "Mix Session", "item_type": "Mixing", "price_micros": 40000000}
    ]);
    json!([
        {"id": "draft", "buyer_id": "u1", "created_at": "2026-05-10T17:58:00Z",
         "status": "Processing", "payment_reference": "pending", "items": cart},
        {"id": "paid", "buyer_id": "u1", "created_at": "2026-05-10T17:58:30Z",
         "status": "Completed", "payment_reference": "pi_123", "items": cart},
        {"id": "stale", "buyer_id": "u1", "created_at": "2026-05-10T16:00:00Z",
         "status": "Processing", "payment_reference": "pending",
         "items": [{"seller_id": "seller-a", "item_name": "Old Beat", "price_micros": 1000000}]}
    ])
}

fn stdout_json(out: &std::process::Output) -> serde_json::Value {
    serde_json::from_slice(&out.stdout).expect("stdout is JSON")
}

#[test]
fn buyer_view_collapses_stages_and_hides_stale_drafts() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let input = write(dir.path(), "records.json", &checkout_stages().to_string());

    let out = bm(dir.path())
        .args(["reconcile", "--input", &input, "--now", "2026-05-10T18:00:00Z"])
        .output()?;
    assert!(out.status.success(), "stderr: {}", String::from_utf8_lossy(&out.stderr));

    let v = stdout_json(&out);
    let orders = v["orders"].as_array().unwrap();
    assert_eq!(orders.len(), 1);
    assert_eq!(orders[0]["id"], "paid");
    assert_eq!(orders[0]["total_amount_micros"], 55_000_000);
    assert_eq!(orders[0]["display_name"], "Night Drive + 2 more");
    assert_eq!(v["superseded"], 1);
    assert_eq!(v["abandoned"], 1);
    assert_eq!(v["resolutions"].as_array().unwrap().len(), 3);
    assert_eq!(v["view"], json!({"view": "buyer"}));
    Ok(())
}

#[test]
fn seller_view_totals_only_that_sellers_items() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let wrapped = json!({ "records": checkout_stages() });
    let input = write(dir.path(), "records.json", &wrapped.to_string());

    let out = bm(dir.path())
        .args([
            "reconcile",
            "--input",
            &input,
            "--seller",
            "seller-a",
            "--now",
            "2026-05-10T18:00:00Z",
        ])
        .output()?;
    assert!(out.status.success(), "stderr: {}", String::from_utf8_lossy(&out.stderr));

    let v = stdout_json(&out);
    assert_eq!(v["orders"][0]["total_amount_micros"], 15_000_000);
    Ok(())
}

#[test]
fn config_can_widen_the_staleness_window() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let input = write(dir.path(), "records.json", &checkout_stages().to_string());
    let cfg = write(dir.path(), "bm.yaml", "reconcile:\n  stale_after_secs: 86400\n");

    let out = bm(dir.path())
        .args([
            "reconcile",
            "--input",
            &input,
            "--now",
            "2026-05-10T18:00:00Z",
            "--config",
            &cfg,
        ])
        .output()?;
    assert!(out.status.success(), "stderr: {}", String::from_utf8_lossy(&out.stderr));

    let v = stdout_json(&out);
    let ids: Vec<&str> = v["orders"]
        .as_array()
        .unwrap()
        .iter()
        .map(|o| o["id"].as_str().unwrap())
        .collect();
    assert_eq!(ids, vec!["paid", "stale"]);
    assert_eq!(v["config_hash"].as_str().unwrap().len(), 64);
    Ok(())
}

#[test]
fn malformed_record_fails_the_command() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let input = write(
        dir.path(),
        "records.json",
        r#"[{"id": "r1", "status": "Completed", "payment_reference": "pi_1"}]"#,
    );

    bm(dir.path())
        .args(["reconcile", "--input", &input])
        .assert()
        .failure()
        .stderr(predicate::str::contains("missing required field `created_at`"));
    Ok(())
}

#[test]
fn secret_literal_in_config_is_refused() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let input = write(dir.path(), "records.json", "[]");
    let cfg = write(
        dir.path(),
        "bm.yaml",
        "gateway:\n  secret_key: \"sk_live_51HabcdefGHIJ\"\n",
    );

    bm(dir.path())
        .args(["reconcile", "--input", &input, "--config", &cfg])
        .assert()
        .failure()
        .stderr(predicate::str::contains("CONFIG_SECRET_DETECTED"))
        .stderr(predicate::str::contains("sk_live_51").not());
    Ok(())
}

#[test]
fn strict_config_rejects_store_keys_offline() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let input = write(dir.path(), "records.json", "[]");
    let cfg = write(
        dir.path(),
        "bm.yaml",
        "store:\n  database_url_env: \"BM_DATABASE_URL\"\n",
    );

    bm(dir.path())
        .args(["reconcile", "--input", &input, "--config", &cfg, "--strict-config"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("CONFIG_UNUSED_KEYS"));

    // Without --strict-config the same file only warns.
    bm(dir.path())
        .args(["reconcile", "--input", &input, "--config", &cfg])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"orders\": []"));
    Ok(())
}

#[test]
fn invalid_now_is_rejected() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let input = write(dir.path(), "records.json", "[]");
    bm(dir.path())
        .args(["reconcile", "--input", &input, "--now", "yesterday"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("invalid --now"));
    Ok(())
}
