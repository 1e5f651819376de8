//! bm-analytics
//!
//! Seller-facing figures computed over an already reconciled sales view:
//! payout splits, the dashboard summary and relative time labels.
//!
//! Pure logic. Callers pass `now`.

mod dashboard;
mod payout;
mod relative;

pub use dashboard::{
    seller_dashboard, DashboardSettings, MonthBucket, RecentOrder, SellerDashboard,
    DEFAULT_MONTHS, RECENT_ORDERS_LIMIT,
};
pub use payout::{order_payout, PayoutPolicy, PayoutSplit, DEFAULT_PLATFORM_FEE_BPS};
pub use relative::time_ago;
