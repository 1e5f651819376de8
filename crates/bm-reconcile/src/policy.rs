use std::collections::BTreeSet;

use chrono::Duration;

/// Sentinel written on a checkout row before the gateway has confirmed it.
pub const PLACEHOLDER_REFERENCE: &str = "pending";

/// Sentinel written for simulated payments.
pub const TEST_REFERENCE: &str = "test";

/// Abandoned-draft threshold (15 minutes).
pub const DEFAULT_STALE_AFTER_SECS: i64 = 15 * 60;

/// How a payment reference string is interpreted.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum ReferenceKind {
    /// Not yet confirmed by the gateway.
    Placeholder,
    /// Simulated payment.
    Test,
    /// Real gateway transaction id.
    Gateway,
}

/// Tunables for a reconciliation pass.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ReconcilePolicy {
    pub stale_after: Duration,
    pub placeholder_refs: BTreeSet<String>,
    pub test_refs: BTreeSet<String>,
}

impl Default for ReconcilePolicy {
    fn default() -> Self {
        Self {
            stale_after: Duration::seconds(DEFAULT_STALE_AFTER_SECS),
            // Redirect-based checkouts report `pending_redirect` until the
            // gateway webhook lands.
            placeholder_refs: [PLACEHOLDER_REFERENCE, "pending_redirect"]
                .into_iter()
                .map(String::from)
                .collect(),
            test_refs: [TEST_REFERENCE].into_iter().map(String::from).collect(),
        }
    }
}

impl ReconcilePolicy {
    /// Blank references count as placeholders: the row has not been
    /// confirmed by anyone.
    pub fn classify(&self, reference: &str) -> ReferenceKind {
        let r = reference.trim();
        if r.is_empty() || self.placeholder_refs.contains(r) {
            ReferenceKind::Placeholder
        } else if self.test_refs.contains(r) {
            ReferenceKind::Test
        } else {
            ReferenceKind::Gateway
        }
    }

    pub fn is_real_reference(&self, reference: &str) -> bool {
        self.classify(reference) == ReferenceKind::Gateway
    }
}
