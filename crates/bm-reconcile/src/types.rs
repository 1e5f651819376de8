use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::ReconcileError;
use crate::policy::{ReconcilePolicy, ReferenceKind};

/// Micros scale (1e-6) used for every price and total.
pub const MICROS_SCALE: i64 = 1_000_000;

/// Checkout status as stored on a purchase row.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum PurchaseStatus {
    Processing,
    Completed,
    Failed,
}

impl PurchaseStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PurchaseStatus::Processing => "Processing",
            PurchaseStatus::Completed => "Completed",
            PurchaseStatus::Failed => "Failed",
        }
    }

    pub fn parse(s: &str) -> Result<Self, ReconcileError> {
        match s {
            "Processing" => Ok(PurchaseStatus::Processing),
            "Completed" => Ok(PurchaseStatus::Completed),
            "Failed" => Ok(PurchaseStatus::Failed),
            other => Err(ReconcileError::UnknownValue {
                field: "status",
                value: other.to_string(),
            }),
        }
    }
}

/// What was sold on a line item.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum ItemType {
    #[serde(rename = "Beat License")]
    BeatLicense,
    #[serde(rename = "Sound Kit")]
    SoundKit,
    Service,
    Mixing,
    Mastering,
}

impl ItemType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ItemType::BeatLicense => "Beat License",
            ItemType::SoundKit => "Sound Kit",
            ItemType::Service => "Service",
            ItemType::Mixing => "Mixing",
            ItemType::Mastering => "Mastering",
        }
    }

    pub fn parse(s: &str) -> Result<Self, ReconcileError> {
        match s {
            "Beat License" => Ok(ItemType::BeatLicense),
            "Sound Kit" => Ok(ItemType::SoundKit),
            "Service" => Ok(ItemType::Service),
            "Mixing" => Ok(ItemType::Mixing),
            "Mastering" => Ok(ItemType::Mastering),
            other => Err(ReconcileError::UnknownValue {
                field: "item_type",
                value: other.to_string(),
            }),
        }
    }

    /// Services are booked work rather than downloadable assets.
    pub fn is_service(&self) -> bool {
        matches!(self, ItemType::Service | ItemType::Mixing | ItemType::Mastering)
    }
}

/// One line item within a purchase. Position in `PurchaseRecord::items`
/// is cart order.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PurchaseItem {
    pub seller_id: String,
    pub item_name: String,
    pub item_type: ItemType,
    pub price_micros: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub contract_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub track_id: Option<String>,
}

impl PurchaseItem {
    pub fn new(
        seller_id: impl Into<String>,
        item_name: impl Into<String>,
        item_type: ItemType,
        price_micros: i64,
    ) -> Self {
        Self {
            seller_id: seller_id.into(),
            item_name: item_name.into(),
            item_type,
            price_micros,
            contract_id: None,
            track_id: None,
        }
    }

    pub fn with_contract(mut self, contract_id: impl Into<String>) -> Self {
        self.contract_id = Some(contract_id.into());
        self
    }

    pub fn with_track(mut self, track_id: impl Into<String>) -> Self {
        self.track_id = Some(track_id.into());
        self
    }
}

/// One checkout attempt as materialized from the store.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PurchaseRecord {
    pub id: String,
    /// `None` for guest checkout.
    #[serde(default)]
    pub buyer_id: Option<String>,
    pub created_at: DateTime<Utc>,
    pub status: PurchaseStatus,
    pub payment_reference: String,
    /// Recorded total from the legacy `amount` column. Only consulted for
    /// records that carry no items.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub amount_micros: Option<i64>,
    #[serde(default)]
    pub items: Vec<PurchaseItem>,
}

impl PurchaseRecord {
    pub fn new(
        id: impl Into<String>,
        created_at: DateTime<Utc>,
        status: PurchaseStatus,
        payment_reference: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            buyer_id: None,
            created_at,
            status,
            payment_reference: payment_reference.into(),
            amount_micros: None,
            items: Vec::new(),
        }
    }

    pub fn with_buyer(mut self, buyer_id: impl Into<String>) -> Self {
        self.buyer_id = Some(buyer_id.into());
        self
    }

    pub fn with_amount(mut self, amount_micros: i64) -> Self {
        self.amount_micros = Some(amount_micros);
        self
    }

    pub fn with_item(mut self, item: PurchaseItem) -> Self {
        self.items.push(item);
        self
    }

    /// Sum of every item price; falls back to the recorded amount for an
    /// item-less record.
    pub fn total_micros(&self) -> i64 {
        if self.items.is_empty() {
            return self.amount_micros.unwrap_or(0);
        }
        self.items
            .iter()
            .fold(0i64, |acc, i| acc.saturating_add(i.price_micros))
    }

    /// Sum of the prices of the items sold by `seller_id`.
    pub fn seller_total_micros(&self, seller_id: &str) -> i64 {
        self.items
            .iter()
            .filter(|i| i.seller_id == seller_id)
            .fold(0i64, |acc, i| acc.saturating_add(i.price_micros))
    }

    pub fn has_seller(&self, seller_id: &str) -> bool {
        self.items.iter().any(|i| i.seller_id == seller_id)
    }

    /// Abandoned checkout draft: still `Processing`, still carrying the
    /// placeholder reference, and older than the staleness threshold.
    pub fn is_abandoned(&self, now: DateTime<Utc>, policy: &ReconcilePolicy) -> bool {
        self.status == PurchaseStatus::Processing
            && policy.classify(&self.payment_reference) == ReferenceKind::Placeholder
            && now.signed_duration_since(self.created_at) > policy.stale_after
    }

    /// Apply a gateway confirmation. Returns `false` when the record was
    /// already completed (duplicate delivery); the record is left untouched.
    pub fn confirm(&mut self, reference: impl Into<String>) -> bool {
        if self.status == PurchaseStatus::Completed {
            return false;
        }
        self.status = PurchaseStatus::Completed;
        self.payment_reference = reference.into();
        true
    }

    /// Apply a gateway decline. Only `Processing` records move to `Failed`.
    pub fn fail(&mut self) -> bool {
        if self.status != PurchaseStatus::Processing {
            return false;
        }
        self.status = PurchaseStatus::Failed;
        true
    }

    /// Structural checks the type system cannot express.
    pub fn validate(&self) -> Result<(), ReconcileError> {
        if self.id.trim().is_empty() {
            return Err(ReconcileError::MissingField {
                record: "<unnamed>".to_string(),
                field: "id",
            });
        }
        if let Some(amount) = self.amount_micros {
            if amount < 0 {
                return Err(ReconcileError::NegativeAmount {
                    record: self.id.clone(),
                    amount_micros: amount,
                });
            }
        }
        for (position, item) in self.items.iter().enumerate() {
            if item.price_micros < 0 {
                return Err(ReconcileError::NegativePrice {
                    record: self.id.clone(),
                    position,
                    price_micros: item.price_micros,
                });
            }
            if item.seller_id.trim().is_empty() {
                return Err(ReconcileError::MissingField {
                    record: self.id.clone(),
                    field: "items.seller_id",
                });
            }
        }
        // Prices are non-negative here, so any per-seller subtotal fits too.
        self.items
            .iter()
            .try_fold(0i64, |acc, i| acc.checked_add(i.price_micros))
            .ok_or_else(|| ReconcileError::TotalOverflow {
                record: self.id.clone(),
            })?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap()
    }

    #[test]
    fn confirm_is_idempotent_on_completed_records() {
        let mut r = PurchaseRecord::new("p1", t0(), PurchaseStatus::Processing, "pending");
        assert!(r.confirm("pi_1"));
        assert_eq!(r.status, PurchaseStatus::Completed);
        assert_eq!(r.payment_reference, "pi_1");

        assert!(!r.confirm("pi_2"));
        assert_eq!(r.payment_reference, "pi_1");
    }

    #[test]
    fn fail_never_downgrades_a_completed_record() {
        let mut r = PurchaseRecord::new("p1", t0(), PurchaseStatus::Completed, "pi_1");
        assert!(!r.fail());
        assert_eq!(r.status, PurchaseStatus::Completed);

        let mut r = PurchaseRecord::new("p2", t0(), PurchaseStatus::Processing, "pending");
        assert!(r.fail());
        assert_eq!(r.status, PurchaseStatus::Failed);
    }

    #[test]
    fn abandoned_requires_processing_placeholder_and_age() {
        let policy = ReconcilePolicy::default();
        let now = t0() + Duration::minutes(20);

        let draft = PurchaseRecord::new("p1", t0(), PurchaseStatus::Processing, "pending");
        assert!(draft.is_abandoned(now, &policy));

        let confirmed_ref = PurchaseRecord::new("p2", t0(), PurchaseStatus::Processing, "pi_1");
        assert!(!confirmed_ref.is_abandoned(now, &policy));

        let failed = PurchaseRecord::new("p3", t0(), PurchaseStatus::Failed, "pending");
        assert!(!failed.is_abandoned(now, &policy));

        let young = PurchaseRecord::new("p4", now - Duration::minutes(10), PurchaseStatus::Processing, "pending");
        assert!(!young.is_abandoned(now, &policy));
    }

    #[test]
    fn item_less_total_falls_back_to_recorded_amount() {
        let r = PurchaseRecord::new("p1", t0(), PurchaseStatus::Completed, "pi_1")
            .with_amount(25 * MICROS_SCALE);
        assert_eq!(r.total_micros(), 25 * MICROS_SCALE);
        assert_eq!(r.seller_total_micros("anyone"), 0);
    }

    #[test]
    fn validate_rejects_negative_prices() {
        let r = PurchaseRecord::new("p1", t0(), PurchaseStatus::Completed, "pi_1").with_item(
            PurchaseItem::new("s1", "Beat", ItemType::BeatLicense, -1),
        );
        assert_eq!(
            r.validate(),
            Err(ReconcileError::NegativePrice {
                record: "p1".to_string(),
                position: 0,
                price_micros: -1
            })
        );
    }

    #[test]
    fn validate_rejects_totals_that_overflow() {
        let r = PurchaseRecord::new("p1", t0(), PurchaseStatus::Completed, "pi_1")
            .with_item(PurchaseItem::new("s1", "Beat", ItemType::BeatLicense, i64::MAX))
            .with_item(PurchaseItem::new("s2", "Kit", ItemType::SoundKit, 1));
        assert_eq!(
            r.validate(),
            Err(ReconcileError::TotalOverflow {
                record: "p1".to_string()
            })
        );
        // Unvalidated callers get a clamped total rather than a panic.
        assert_eq!(r.total_micros(), i64::MAX);
        assert_eq!(r.seller_total_micros("s1"), i64::MAX);

        let at_limit = PurchaseRecord::new("p2", t0(), PurchaseStatus::Completed, "pi_2")
            .with_item(PurchaseItem::new("s1", "Beat", ItemType::BeatLicense, i64::MAX - 1))
            .with_item(PurchaseItem::new("s2", "Kit", ItemType::SoundKit, 1));
        assert_eq!(at_limit.validate(), Ok(()));
        assert_eq!(at_limit.total_micros(), i64::MAX);
    }

    #[test]
    fn status_and_item_type_round_trip_their_store_strings() {
        for s in [
            PurchaseStatus::Processing,
            PurchaseStatus::Completed,
            PurchaseStatus::Failed,
        ] {
            assert_eq!(PurchaseStatus::parse(s.as_str()).unwrap(), s);
        }
        assert_eq!(ItemType::parse("Beat License").unwrap(), ItemType::BeatLicense);
        assert!(ItemType::parse("Vinyl").is_err());
        assert!(ItemType::Mixing.is_service());
        assert!(!ItemType::SoundKit.is_service());
    }
}
