//! Survivor selection and the per-record resolution ledger.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{PurchaseRecord, PurchaseStatus, ReconcilePolicy};

/// Which grouping pass superseded a record.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    PaymentReference,
    ContentSignature,
}

/// Outcome for one input record. Exactly one per input, in input order.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "resolution", rename_all = "snake_case")]
pub enum Resolution {
    /// Survived both passes and the staleness filter.
    Kept { record_id: String },
    /// Collapsed into another record of the same logical order.
    SupersededBy {
        record_id: String,
        survivor_id: String,
        phase: Phase,
    },
    /// Survived grouping but is an abandoned checkout draft; hidden.
    Abandoned { record_id: String },
}

impl Resolution {
    pub fn record_id(&self) -> &str {
        match self {
            Resolution::Kept { record_id }
            | Resolution::SupersededBy { record_id, .. }
            | Resolution::Abandoned { record_id } => record_id,
        }
    }

    pub fn is_kept(&self) -> bool {
        matches!(self, Resolution::Kept { .. })
    }
}

/// Phase-2 ranking. Field order is the tie-break order: completed status,
/// then a real gateway reference, then recency.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub struct SurvivorKey {
    pub completed: bool,
    pub real_reference: bool,
    pub created_at: DateTime<Utc>,
}

impl SurvivorKey {
    pub fn of(record: &PurchaseRecord, policy: &ReconcilePolicy) -> Self {
        Self {
            completed: record.status == PurchaseStatus::Completed,
            real_reference: policy.is_real_reference(&record.payment_reference),
            created_at: record.created_at,
        }
    }
}

/// Phase 1: within a shared gateway reference only completion matters; the
/// first record seen wins otherwise.
pub(crate) fn reference_group_prefers(current: &PurchaseRecord, candidate: &PurchaseRecord) -> bool {
    candidate.status == PurchaseStatus::Completed && current.status != PurchaseStatus::Completed
}

/// Phase 2: `>=` so an exact tie goes to the record encountered later.
pub(crate) fn signature_group_prefers(
    current: &PurchaseRecord,
    candidate: &PurchaseRecord,
    policy: &ReconcilePolicy,
) -> bool {
    SurvivorKey::of(candidate, policy) >= SurvivorKey::of(current, policy)
}
