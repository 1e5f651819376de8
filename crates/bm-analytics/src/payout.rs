use std::collections::BTreeSet;

use bm_reconcile::PurchaseRecord;
use serde::{Deserialize, Serialize};

/// Platform fee on marketplace sales: 2%.
pub const DEFAULT_PLATFORM_FEE_BPS: u32 = 200;

const BPS_DENOMINATOR: i128 = 10_000;

/// How much of a sale reaches the seller.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PayoutPolicy {
    pub platform_fee_bps: u32,
    /// Subscription plans whose sellers pay no platform fee.
    pub fee_exempt_plans: BTreeSet<String>,
}

impl Default for PayoutPolicy {
    fn default() -> Self {
        Self {
            platform_fee_bps: DEFAULT_PLATFORM_FEE_BPS,
            fee_exempt_plans: ["Pro", "Studio+"].into_iter().map(String::from).collect(),
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PayoutSplit {
    pub gross_micros: i64,
    pub fee_micros: i64,
    pub net_micros: i64,
}

impl PayoutSplit {
    fn add(self, other: PayoutSplit) -> PayoutSplit {
        PayoutSplit {
            gross_micros: self.gross_micros.saturating_add(other.gross_micros),
            fee_micros: self.fee_micros.saturating_add(other.fee_micros),
            net_micros: self.net_micros.saturating_add(other.net_micros),
        }
    }
}

impl PayoutPolicy {
    pub fn fee_bps_for(&self, plan: Option<&str>) -> u32 {
        match plan {
            Some(p) if self.fee_exempt_plans.contains(p) => 0,
            _ => self.platform_fee_bps,
        }
    }

    /// Fee rounds half-up to the micro; net is whatever remains.
    pub fn split(&self, gross_micros: i64, plan: Option<&str>) -> PayoutSplit {
        let bps = self.fee_bps_for(plan) as i128;
        let gross = gross_micros.max(0) as i128;
        let fee = (gross * bps + BPS_DENOMINATOR / 2) / BPS_DENOMINATOR;
        PayoutSplit {
            gross_micros: gross as i64,
            fee_micros: fee as i64,
            net_micros: (gross - fee) as i64,
        }
    }
}

/// Seller's payout for one order. Each item is transferred separately, so
/// the fee is rounded per item before summing.
pub fn order_payout(
    record: &PurchaseRecord,
    seller_id: &str,
    plan: Option<&str>,
    policy: &PayoutPolicy,
) -> PayoutSplit {
    record
        .items
        .iter()
        .filter(|i| i.seller_id == seller_id)
        .map(|i| policy.split(i.price_micros, plan))
        .fold(PayoutSplit::default(), PayoutSplit::add)
}
