use bm_analytics::*;
use bm_reconcile::*;
use chrono::{DateTime, Duration, TimeZone, Utc};

fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 3, 20, 12, 0, 0).unwrap()
}

fn sale(
    id: &str,
    name: &str,
    at: DateTime<Utc>,
    status: PurchaseStatus,
    reference: &str,
    price: i64,
) -> PurchaseRecord {
    PurchaseRecord::new(id, at, status, reference)
        .with_buyer("buyer-1")
        .with_item(PurchaseItem::new("seller-a", name, ItemType::BeatLicense, price))
        .with_item(PurchaseItem::new("seller-b", "Someone Else's Kit", ItemType::SoundKit, 99 * MICROS_SCALE))
}

fn seller_view(records: &[PurchaseRecord]) -> Vec<ResolvedOrder> {
    reconcile(
        records,
        &View::Seller("seller-a".to_string()),
        now(),
        &ReconcilePolicy::default(),
    )
    .unwrap()
    .orders
}

#[test]
fn scenario_dashboard_totals_follow_the_reconciled_seller_view() {
    let records = vec![
        sale("jan", "Winter Beat", Utc.with_ymd_and_hms(2026, 1, 5, 10, 0, 0).unwrap(), PurchaseStatus::Completed, "pi_jan", 50 * MICROS_SCALE),
        // Draft and confirmation of the same cart: must count once.
        sale("mar-draft", "Summer Beat", now() - Duration::hours(3), PurchaseStatus::Processing, "pending", 20 * MICROS_SCALE),
        sale("mar", "Summer Beat", now() - Duration::hours(2), PurchaseStatus::Completed, "pi_mar", 20 * MICROS_SCALE),
        sale("open", "Open Beat", now() - Duration::minutes(5), PurchaseStatus::Processing, "pending", 10 * MICROS_SCALE),
        sale("declined", "Declined Beat", now() - Duration::days(1), PurchaseStatus::Failed, "pi_dec", 70 * MICROS_SCALE),
    ];
    let sales = seller_view(&records);

    let d = seller_dashboard(
        "seller-a",
        &sales,
        None,
        &PayoutPolicy::default(),
        &DashboardSettings::default(),
        now(),
    );

    assert_eq!(d.total_revenue_micros, 80 * MICROS_SCALE);
    assert_eq!(d.active_orders, 1);
    assert_eq!(d.completed_orders, 2);
    // 2% of 50 and of 20.
    assert_eq!(d.estimated_payout_micros, 49 * MICROS_SCALE + 19_600_000);

    assert_eq!(d.monthly.len(), 6);
    let labels: Vec<&str> = d.monthly.iter().map(|m| m.label.as_str()).collect();
    assert_eq!(labels, vec!["Oct", "Nov", "Dec", "Jan", "Feb", "Mar"]);
    assert_eq!(d.monthly[3].revenue_micros, 50 * MICROS_SCALE);
    assert_eq!(d.monthly[3].orders, 1);
    assert_eq!(d.monthly[5].revenue_micros, 30 * MICROS_SCALE);
    assert_eq!(d.monthly[5].orders, 2);

    let recent: Vec<&str> = d.recent_orders.iter().map(|o| o.id.as_str()).collect();
    assert_eq!(recent, vec!["open", "mar", "declined", "jan"]);
    assert_eq!(d.recent_orders[0].time_ago, "5m ago");
    assert_eq!(d.recent_orders[1].display_name, "Summer Beat + 1 more");
}

#[test]
fn scenario_fee_exempt_plan_keeps_full_payout() {
    let records = vec![sale("s1", "Pro Beat", now() - Duration::days(2), PurchaseStatus::Completed, "pi_1", 40 * MICROS_SCALE)];
    let sales = seller_view(&records);

    let d = seller_dashboard(
        "seller-a",
        &sales,
        Some("Pro"),
        &PayoutPolicy::default(),
        &DashboardSettings::default(),
        now(),
    );
    assert_eq!(d.estimated_payout_micros, 40 * MICROS_SCALE);
}

#[test]
fn scenario_empty_sales_produce_zeroed_months() {
    let d = seller_dashboard(
        "seller-a",
        &[],
        None,
        &PayoutPolicy::default(),
        &DashboardSettings { months: 3, ..DashboardSettings::default() },
        now(),
    );
    assert_eq!(d.total_revenue_micros, 0);
    assert!(d.recent_orders.is_empty());
    assert_eq!(d.monthly.len(), 3);
    assert!(d.monthly.iter().all(|m| m.orders == 0 && m.revenue_micros == 0));
}
