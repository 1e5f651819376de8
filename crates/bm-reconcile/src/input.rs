//! Loosely-typed record shape as handed over by callers that read JSON or
//! untyped rows. Every required field is optional here so a missing one
//! surfaces as a [`ReconcileError`] instead of a decode panic elsewhere.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{ItemType, PurchaseItem, PurchaseRecord, PurchaseStatus, ReconcileError};

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemInput {
    pub seller_id: Option<String>,
    pub item_name: Option<String>,
    pub item_type: Option<String>,
    pub price_micros: Option<i64>,
    pub contract_id: Option<String>,
    pub track_id: Option<String>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordInput {
    pub id: Option<String>,
    pub buyer_id: Option<String>,
    pub created_at: Option<DateTime<Utc>>,
    pub status: Option<String>,
    pub payment_reference: Option<String>,
    pub amount_micros: Option<i64>,
    #[serde(default)]
    pub items: Vec<ItemInput>,
}

fn required<T>(v: Option<T>, record: &str, field: &'static str) -> Result<T, ReconcileError> {
    v.ok_or_else(|| ReconcileError::MissingField {
        record: record.to_string(),
        field,
    })
}

impl RecordInput {
    /// `position` labels the record in errors when its id is the missing field.
    pub fn validate(self, position: usize) -> Result<PurchaseRecord, ReconcileError> {
        let id = match self.id.filter(|s| !s.trim().is_empty()) {
            Some(id) => id,
            None => {
                return Err(ReconcileError::MissingField {
                    record: format!("#{position}"),
                    field: "id",
                })
            }
        };

        let created_at = required(self.created_at, &id, "created_at")?;
        let status = PurchaseStatus::parse(&required(self.status, &id, "status")?)?;
        let payment_reference = required(self.payment_reference, &id, "payment_reference")?;

        let mut items = Vec::with_capacity(self.items.len());
        for it in self.items {
            let item_type = match it.item_type {
                Some(t) => ItemType::parse(&t)?,
                None => ItemType::Service,
            };
            items.push(PurchaseItem {
                seller_id: required(it.seller_id, &id, "items.seller_id")?,
                item_name: required(it.item_name, &id, "items.item_name")?,
                item_type,
                price_micros: required(it.price_micros, &id, "items.price_micros")?,
                contract_id: it.contract_id,
                track_id: it.track_id,
            });
        }

        let record = PurchaseRecord {
            id,
            buyer_id: self.buyer_id,
            created_at,
            status,
            payment_reference,
            amount_micros: self.amount_micros,
            items,
        };
        record.validate()?;
        Ok(record)
    }
}
