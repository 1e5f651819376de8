//! Store-backed order views: `bm orders`, `bm sales`, `bm dashboard`.

use anyhow::Result;
use bm_analytics::seller_dashboard;
use bm_config::ConfigMode;
use bm_db::{canonical_id, PurchaseSource};
use bm_reconcile::{reconcile, ResolvedOrder, View};
use chrono::Utc;

fn print_orders(orders: &[ResolvedOrder]) {
    println!("count={}", orders.len());
    for o in orders {
        println!(
            "id={} created_at={} status={} payment_reference={} total_micros={} name={:?}",
            o.record.id,
            o.record.created_at.to_rfc3339(),
            o.record.status.as_str(),
            o.record.payment_reference,
            o.total_amount_micros,
            o.display_name
        );
    }
}

pub async fn orders(buyer_id: &str, config_paths: &[String], json: bool) -> Result<()> {
    let loaded = super::load_config(config_paths)?;
    let settings = super::settings_for(ConfigMode::Service, &loaded, false)?;
    let source = super::connect_store(&loaded).await?;

    let buyer_id = canonical_id(buyer_id);
    let rows = source.records_for_buyer(&buyer_id).await?;
    let report = reconcile(&rows, &View::Buyer, Utc::now(), &settings.reconcile)?;
    if json {
        println!("{}", serde_json::to_string_pretty(&report.orders)?);
    } else {
        println!("buyer_id={buyer_id}");
        print_orders(&report.orders);
    }
    Ok(())
}

pub async fn sales(seller_id: &str, config_paths: &[String], json: bool) -> Result<()> {
    let loaded = super::load_config(config_paths)?;
    let settings = super::settings_for(ConfigMode::Service, &loaded, false)?;
    let source = super::connect_store(&loaded).await?;

    let seller_id = canonical_id(seller_id);
    let rows = source.records_for_seller(&seller_id).await?;
    let view = View::Seller(seller_id.clone());
    let report = reconcile(&rows, &view, Utc::now(), &settings.reconcile)?;
    if json {
        println!("{}", serde_json::to_string_pretty(&report.orders)?);
    } else {
        println!("seller_id={seller_id}");
        print_orders(&report.orders);
    }
    Ok(())
}

pub async fn dashboard(seller_id: &str, config_paths: &[String]) -> Result<()> {
    let loaded = super::load_config(config_paths)?;
    let settings = super::settings_for(ConfigMode::Service, &loaded, false)?;
    let source = super::connect_store(&loaded).await?;

    let now = Utc::now();
    let seller_id = canonical_id(seller_id);
    let rows = source.records_for_seller(&seller_id).await?;
    let view = View::Seller(seller_id.clone());
    let report = reconcile(&rows, &view, now, &settings.reconcile)?;
    let plan = source.seller_plan(&seller_id).await?;

    let d = seller_dashboard(
        &seller_id,
        &report.orders,
        plan.as_deref(),
        &settings.payout,
        &settings.dashboard,
        now,
    );

    println!("seller_id={}", d.seller_id);
    println!("plan={}", plan.as_deref().unwrap_or("none"));
    println!("total_revenue_micros={}", d.total_revenue_micros);
    println!("active_orders={}", d.active_orders);
    println!("completed_orders={}", d.completed_orders);
    println!("estimated_payout_micros={}", d.estimated_payout_micros);
    for m in &d.monthly {
        println!(
            "month={} label={} revenue_micros={} orders={}",
            m.month_start, m.label, m.revenue_micros, m.orders
        );
    }
    for r in &d.recent_orders {
        println!(
            "recent id={} status={} amount_micros={} when={:?} name={:?}",
            r.id,
            r.status.as_str(),
            r.amount_micros,
            r.time_ago,
            r.display_name
        );
    }
    Ok(())
}
