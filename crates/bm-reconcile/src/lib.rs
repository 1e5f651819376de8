//! bm-reconcile
//!
//! Order reconciliation engine.
//!
//! A single checkout can leave several `purchases` rows behind: the
//! client-side `Processing` draft written before the gateway answers, the
//! gateway-confirmed row, repeated webhook deliveries and simulated test
//! payments. This crate collapses those rows into one logical order per real
//! checkout and annotates each order for a buyer or seller view.
//!
//! - Phase 1 groups records sharing a real gateway reference.
//! - Phase 2 groups records sharing a cart-content signature.
//! - Abandoned placeholder drafts are hidden, never deleted.
//! - Every input record receives exactly one [`Resolution`].
//!
//! Deterministic, pure logic. No IO. No clock: the caller passes `now`.

mod engine;
mod error;
mod input;
mod policy;
mod resolution;
mod signature;
mod types;
mod view;

pub use engine::{reconcile, reconcile_inputs, ReconcileReport};
pub use error::ReconcileError;
pub use input::{ItemInput, RecordInput};
pub use policy::{
    ReconcilePolicy, ReferenceKind, DEFAULT_STALE_AFTER_SECS, PLACEHOLDER_REFERENCE,
    TEST_REFERENCE,
};
pub use resolution::{Phase, Resolution, SurvivorKey};
pub use signature::Signature;
pub use types::*;
pub use view::{display_name, ResolvedOrder, View, UNKNOWN_ITEM};
