use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::policy::ReferenceKind;
use crate::resolution::{reference_group_prefers, signature_group_prefers};
use crate::{
    Phase, PurchaseRecord, ReconcileError, ReconcilePolicy, RecordInput, Resolution, ResolvedOrder,
    Signature, View,
};

/// Full result of one reconciliation pass.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReconcileReport {
    /// One entry per logical order, newest first.
    pub orders: Vec<ResolvedOrder>,
    /// One entry per input record, in input order.
    pub resolutions: Vec<Resolution>,
}

impl ReconcileReport {
    pub fn empty() -> Self {
        Self {
            orders: Vec::new(),
            resolutions: Vec::new(),
        }
    }

    /// Surviving records without annotations, e.g. to feed them back in.
    pub fn records(&self) -> Vec<PurchaseRecord> {
        self.orders.iter().map(|o| o.record.clone()).collect()
    }

    pub fn superseded_count(&self) -> usize {
        self.resolutions
            .iter()
            .filter(|r| matches!(r, Resolution::SupersededBy { .. }))
            .count()
    }

    pub fn abandoned_count(&self) -> usize {
        self.resolutions
            .iter()
            .filter(|r| matches!(r, Resolution::Abandoned { .. }))
            .count()
    }
}

// ---------------------------------------------------------------------------
// Phase 1: shared gateway reference
// ---------------------------------------------------------------------------

/// Returns the indices that survive, in input order. Placeholder and test
/// sentinels are shared by unrelated checkouts, so only real gateway
/// references group here.
fn collapse_by_reference(
    records: &[PurchaseRecord],
    policy: &ReconcilePolicy,
    ledger: &mut [Option<Resolution>],
) -> Vec<usize> {
    let mut best: BTreeMap<&str, usize> = BTreeMap::new();
    for (idx, r) in records.iter().enumerate() {
        if policy.classify(&r.payment_reference) != ReferenceKind::Gateway {
            continue;
        }
        best.entry(r.payment_reference.trim())
            .and_modify(|cur| {
                if reference_group_prefers(&records[*cur], r) {
                    *cur = idx;
                }
            })
            .or_insert(idx);
    }

    let mut out = Vec::with_capacity(records.len());
    for (idx, r) in records.iter().enumerate() {
        match best.get(r.payment_reference.trim()) {
            Some(&winner) if winner != idx => {
                ledger[idx] = Some(Resolution::SupersededBy {
                    record_id: r.id.clone(),
                    survivor_id: records[winner].id.clone(),
                    phase: Phase::PaymentReference,
                });
            }
            _ => out.push(idx),
        }
    }
    out
}

// ---------------------------------------------------------------------------
// Phase 2: shared cart signature
// ---------------------------------------------------------------------------

fn collapse_by_signature(
    records: &[PurchaseRecord],
    candidates: &[usize],
    policy: &ReconcilePolicy,
    ledger: &mut [Option<Resolution>],
) -> Vec<usize> {
    let signatures: Vec<Signature> = candidates
        .iter()
        .map(|&idx| Signature::of(&records[idx]))
        .collect();

    let mut best: BTreeMap<&Signature, usize> = BTreeMap::new();
    for (sig, &idx) in signatures.iter().zip(candidates) {
        best.entry(sig)
            .and_modify(|cur| {
                if signature_group_prefers(&records[*cur], &records[idx], policy) {
                    *cur = idx;
                }
            })
            .or_insert(idx);
    }

    let mut out = Vec::with_capacity(best.len());
    for (sig, &idx) in signatures.iter().zip(candidates) {
        let winner = best[sig];
        if winner == idx {
            out.push(idx);
        } else {
            ledger[idx] = Some(Resolution::SupersededBy {
                record_id: records[idx].id.clone(),
                survivor_id: records[winner].id.clone(),
                phase: Phase::ContentSignature,
            });
        }
    }
    out
}

// ---------------------------------------------------------------------------
// Entry points
// ---------------------------------------------------------------------------

/// Collapse raw purchase rows into one annotated entry per logical order.
///
/// 1. Phase 1 groups rows sharing a real gateway reference.
/// 2. Phase 2 groups the remaining candidates by cart signature.
/// 3. Abandoned placeholder drafts are hidden.
/// 4. Survivors are sorted newest first (ties by id, ascending) and
///    annotated for `view`.
///
/// Every record is validated before any grouping happens; the first
/// malformed record fails the call.
pub fn reconcile(
    records: &[PurchaseRecord],
    view: &View,
    now: DateTime<Utc>,
    policy: &ReconcilePolicy,
) -> Result<ReconcileReport, ReconcileError> {
    for r in records {
        r.validate()?;
    }
    if records.is_empty() {
        return Ok(ReconcileReport::empty());
    }

    let mut ledger: Vec<Option<Resolution>> = vec![None; records.len()];
    let after_refs = collapse_by_reference(records, policy, &mut ledger);
    let after_sigs = collapse_by_signature(records, &after_refs, policy, &mut ledger);

    let mut orders = Vec::with_capacity(after_sigs.len());
    for idx in after_sigs {
        let r = &records[idx];
        if r.is_abandoned(now, policy) {
            ledger[idx] = Some(Resolution::Abandoned {
                record_id: r.id.clone(),
            });
            continue;
        }
        ledger[idx] = Some(Resolution::Kept {
            record_id: r.id.clone(),
        });
        orders.push(ResolvedOrder::annotate(r, view));
    }

    orders.sort_by(|a, b| {
        b.record
            .created_at
            .cmp(&a.record.created_at)
            .then_with(|| a.record.id.cmp(&b.record.id))
    });

    let resolutions: Vec<Resolution> = ledger.into_iter().flatten().collect();
    let report = ReconcileReport {
        orders,
        resolutions,
    };

    debug!(
        input = records.len(),
        kept = report.orders.len(),
        superseded = report.superseded_count(),
        abandoned = report.abandoned_count(),
        "reconciled purchase records"
    );

    Ok(report)
}

/// Validate loosely-typed inputs, then [`reconcile`]. Fails on the first
/// malformed input; nothing is reconciled in that case.
pub fn reconcile_inputs(
    inputs: Vec<RecordInput>,
    view: &View,
    now: DateTime<Utc>,
    policy: &ReconcilePolicy,
) -> Result<ReconcileReport, ReconcileError> {
    let records = inputs
        .into_iter()
        .enumerate()
        .map(|(pos, input)| input.validate(pos))
        .collect::<Result<Vec<_>, _>>()?;
    reconcile(&records, view, now, policy)
}
