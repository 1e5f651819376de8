//! In-memory purchase store for tests and offline tooling.
//!
//! Applies the same transition rules as the Postgres store: confirmations
//! never touch a completed record and declines only move `Processing` rows.

use std::collections::BTreeMap;
use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use bm_reconcile::PurchaseRecord;
use tokio::sync::RwLock;
use tracing::warn;

use crate::source::PurchaseSource;

#[derive(Debug, Default, Clone)]
pub struct MemoryPurchaseSource {
    records: Arc<RwLock<Vec<PurchaseRecord>>>,
    plans: Arc<RwLock<BTreeMap<String, String>>>,
}

impl MemoryPurchaseSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_records(records: Vec<PurchaseRecord>) -> Self {
        Self {
            records: Arc::new(RwLock::new(records)),
            plans: Arc::default(),
        }
    }

    pub async fn insert(&self, record: PurchaseRecord) {
        self.records.write().await.push(record);
    }

    pub async fn set_seller_plan(&self, seller_id: &str, plan: &str) {
        self.plans
            .write()
            .await
            .insert(seller_id.to_string(), plan.to_string());
    }

    /// `false` when the record is unknown or already completed.
    pub async fn confirm_payment(&self, purchase_id: &str, reference: &str) -> bool {
        let mut records = self.records.write().await;
        let applied = records
            .iter_mut()
            .find(|r| r.id == purchase_id)
            .map(|r| r.confirm(reference))
            .unwrap_or(false);
        if !applied {
            warn!(purchase_id, "confirm_payment no-op: already completed or unknown");
        }
        applied
    }

    pub async fn fail_payment(&self, purchase_id: &str) -> bool {
        let mut records = self.records.write().await;
        records
            .iter_mut()
            .find(|r| r.id == purchase_id)
            .map(|r| r.fail())
            .unwrap_or(false)
    }

    pub async fn len(&self) -> usize {
        self.records.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.records.read().await.is_empty()
    }
}

#[async_trait]
impl PurchaseSource for MemoryPurchaseSource {
    async fn records_for_buyer(&self, buyer_id: &str) -> Result<Vec<PurchaseRecord>> {
        let records = self.records.read().await;
        Ok(records
            .iter()
            .filter(|r| r.buyer_id.as_deref() == Some(buyer_id))
            .cloned()
            .collect())
    }

    async fn records_for_seller(&self, seller_id: &str) -> Result<Vec<PurchaseRecord>> {
        let records = self.records.read().await;
        Ok(records
            .iter()
            .filter(|r| r.has_seller(seller_id))
            .cloned()
            .collect())
    }

    async fn seller_plan(&self, seller_id: &str) -> Result<Option<String>> {
        Ok(self.plans.read().await.get(seller_id).cloned())
    }
}
