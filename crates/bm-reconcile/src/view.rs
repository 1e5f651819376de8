use serde::{Deserialize, Serialize};

use crate::{PurchaseItem, PurchaseRecord};

/// Display name of a record without items.
pub const UNKNOWN_ITEM: &str = "Unknown Item";

/// Whose perspective the reconciled list is built for.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "view", content = "seller_id", rename_all = "snake_case")]
pub enum View {
    /// "My purchases": totals cover every item.
    Buyer,
    /// "My sales": totals cover only this seller's items.
    Seller(String),
}

impl View {
    pub fn total_micros(&self, record: &PurchaseRecord) -> i64 {
        match self {
            View::Buyer => record.total_micros(),
            View::Seller(seller_id) => record.seller_total_micros(seller_id),
        }
    }

    /// A seller's sale is named after the seller's own first item. A record
    /// carrying none of the seller's items keeps the cart-wide name.
    pub fn display_name(&self, record: &PurchaseRecord) -> String {
        match self {
            View::Seller(seller_id) if record.has_seller(seller_id) => {
                let own: Vec<PurchaseItem> = record
                    .items
                    .iter()
                    .filter(|i| &i.seller_id == seller_id)
                    .cloned()
                    .collect();
                display_name(&own)
            }
            _ => display_name(&record.items),
        }
    }
}

/// First item's name, with `" + N more"` when further items exist.
pub fn display_name(items: &[PurchaseItem]) -> String {
    match items {
        [] => UNKNOWN_ITEM.to_string(),
        [only] => only.item_name.clone(),
        [first, rest @ ..] => format!("{} + {} more", first.item_name, rest.len()),
    }
}

/// A surviving record annotated for display.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedOrder {
    #[serde(flatten)]
    pub record: PurchaseRecord,
    pub total_amount_micros: i64,
    pub display_name: String,
}

impl ResolvedOrder {
    pub fn annotate(record: &PurchaseRecord, view: &View) -> Self {
        Self {
            record: record.clone(),
            total_amount_micros: view.total_micros(record),
            display_name: view.display_name(record),
        }
    }
}
