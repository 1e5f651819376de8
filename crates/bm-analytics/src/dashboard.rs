//! Seller dashboard summary.
//!
//! Input is the seller view produced by `bm_reconcile::reconcile` with
//! `View::Seller`, so duplicates and abandoned drafts are already gone and
//! `total_amount_micros` is the seller's own share.

use bm_reconcile::{PurchaseStatus, ResolvedOrder};
use chrono::{DateTime, Datelike, NaiveDate, Utc};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};

use crate::payout::{order_payout, PayoutPolicy};
use crate::relative::time_ago;

pub const DEFAULT_MONTHS: u32 = 6;
pub const RECENT_ORDERS_LIMIT: usize = 5;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DashboardSettings {
    /// Number of calendar months in the chart, current month included.
    pub months: u32,
    /// Month boundaries are taken in this timezone.
    pub timezone: Tz,
}

impl Default for DashboardSettings {
    fn default() -> Self {
        Self {
            months: DEFAULT_MONTHS,
            timezone: Tz::UTC,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MonthBucket {
    /// Short month name, e.g. `"Mar"`.
    pub label: String,
    pub month_start: NaiveDate,
    pub revenue_micros: i64,
    pub orders: usize,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecentOrder {
    pub id: String,
    pub display_name: String,
    pub created_at: DateTime<Utc>,
    pub amount_micros: i64,
    pub status: PurchaseStatus,
    pub time_ago: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SellerDashboard {
    pub seller_id: String,
    /// Seller's share over every order that has not failed.
    pub total_revenue_micros: i64,
    /// Orders still awaiting gateway confirmation.
    pub active_orders: usize,
    pub completed_orders: usize,
    /// Net of platform fees, completed orders only.
    pub estimated_payout_micros: i64,
    /// Oldest month first.
    pub monthly: Vec<MonthBucket>,
    /// Newest first, at most [`RECENT_ORDERS_LIMIT`].
    pub recent_orders: Vec<RecentOrder>,
}

fn month_key(ts: DateTime<Utc>, tz: Tz) -> (i32, u32) {
    let local = ts.with_timezone(&tz).date_naive();
    (local.year(), local.month())
}

/// The `count` calendar months ending with the month containing `now`.
fn saturating_sum(values: impl Iterator<Item = i64>) -> i64 {
    values.fold(0, i64::saturating_add)
}

fn month_starts(now: DateTime<Utc>, tz: Tz, count: u32) -> Vec<NaiveDate> {
    let (year, month) = month_key(now, tz);
    let current = year * 12 + (month as i32 - 1);
    (0..count as i32)
        .rev()
        .filter_map(|back| {
            let idx = current - back;
            NaiveDate::from_ymd_opt(idx.div_euclid(12), idx.rem_euclid(12) as u32 + 1, 1)
        })
        .collect()
}

pub fn seller_dashboard(
    seller_id: &str,
    sales: &[ResolvedOrder],
    seller_plan: Option<&str>,
    payout: &PayoutPolicy,
    settings: &DashboardSettings,
    now: DateTime<Utc>,
) -> SellerDashboard {
    let counted: Vec<&ResolvedOrder> = sales
        .iter()
        .filter(|o| o.record.status != PurchaseStatus::Failed)
        .collect();

    let total_revenue_micros = saturating_sum(counted.iter().map(|o| o.total_amount_micros));
    let active_orders = counted
        .iter()
        .filter(|o| o.record.status == PurchaseStatus::Processing)
        .count();

    let completed: Vec<&ResolvedOrder> = counted
        .iter()
        .copied()
        .filter(|o| o.record.status == PurchaseStatus::Completed)
        .collect();
    let estimated_payout_micros = saturating_sum(
        completed
            .iter()
            .map(|o| order_payout(&o.record, seller_id, seller_plan, payout).net_micros),
    );

    let monthly = month_starts(now, settings.timezone, settings.months)
        .into_iter()
        .map(|start| {
            let key = (start.year(), start.month());
            let in_month: Vec<&&ResolvedOrder> = counted
                .iter()
                .filter(|o| month_key(o.record.created_at, settings.timezone) == key)
                .collect();
            MonthBucket {
                label: start.format("%b").to_string(),
                month_start: start,
                revenue_micros: saturating_sum(in_month.iter().map(|o| o.total_amount_micros)),
                orders: in_month.len(),
            }
        })
        .collect();

    let mut newest: Vec<&ResolvedOrder> = sales.iter().collect();
    newest.sort_by(|a, b| b.record.created_at.cmp(&a.record.created_at));
    let recent_orders = newest
        .into_iter()
        .take(RECENT_ORDERS_LIMIT)
        .map(|o| RecentOrder {
            id: o.record.id.clone(),
            display_name: o.display_name.clone(),
            created_at: o.record.created_at,
            amount_micros: o.total_amount_micros,
            status: o.record.status,
            time_ago: time_ago(o.record.created_at, now),
        })
        .collect();

    SellerDashboard {
        seller_id: seller_id.to_string(),
        total_revenue_micros,
        active_orders,
        completed_orders: completed.len(),
        estimated_payout_micros,
        monthly,
        recent_orders,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn month_starts_cross_year_boundary() {
        let now = Utc.with_ymd_and_hms(2026, 2, 15, 0, 0, 0).unwrap();
        let starts = month_starts(now, Tz::UTC, 4);
        let labels: Vec<String> = starts.iter().map(|d| d.format("%Y-%m").to_string()).collect();
        assert_eq!(labels, vec!["2025-11", "2025-12", "2026-01", "2026-02"]);
    }

    #[test]
    fn month_boundary_follows_timezone() {
        // 03:00 UTC on March 1st is still February in New York.
        let ts = Utc.with_ymd_and_hms(2026, 3, 1, 3, 0, 0).unwrap();
        assert_eq!(month_key(ts, Tz::UTC), (2026, 3));
        assert_eq!(month_key(ts, chrono_tz::America::New_York), (2026, 2));
    }

    #[test]
    fn revenue_across_orders_saturates() {
        assert_eq!(saturating_sum([i64::MAX, 1, 5].into_iter()), i64::MAX);
        assert_eq!(saturating_sum([2, 3].into_iter()), 5);
        assert_eq!(saturating_sum(std::iter::empty()), 0);
    }
}
