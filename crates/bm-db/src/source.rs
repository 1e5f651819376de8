use anyhow::Result;
use async_trait::async_trait;
use bm_reconcile::PurchaseRecord;
use sqlx::PgPool;
use uuid::Uuid;

/// Where raw purchase records come from. Implementations return rows as
/// stored: duplicates and abandoned drafts included.
#[async_trait]
pub trait PurchaseSource: Send + Sync {
    async fn records_for_buyer(&self, buyer_id: &str) -> Result<Vec<PurchaseRecord>>;

    /// Records with at least one item sold by `seller_id`, each with all of
    /// its items.
    async fn records_for_seller(&self, seller_id: &str) -> Result<Vec<PurchaseRecord>>;

    /// Subscription plan name, if the seller has one on file.
    async fn seller_plan(&self, seller_id: &str) -> Result<Option<String>>;
}

#[derive(Clone)]
pub struct PgPurchaseSource {
    pool: PgPool,
}

impl PgPurchaseSource {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

/// Store ids are UUIDs rendered lowercase and hyphenated, which is how item
/// `seller_id`s come back from the store. Callers comparing a caller-supplied
/// id against those strings must canonicalize it first; anything that does
/// not parse as a UUID is returned trimmed but otherwise unchanged.
pub fn canonical_id(id: &str) -> String {
    let id = id.trim();
    match Uuid::parse_str(id) {
        Ok(uuid) => uuid.to_string(),
        Err(_) => id.to_string(),
    }
}

// Ids are UUIDs in the store; anything else cannot match a row.

#[async_trait]
impl PurchaseSource for PgPurchaseSource {
    async fn records_for_buyer(&self, buyer_id: &str) -> Result<Vec<PurchaseRecord>> {
        match Uuid::parse_str(buyer_id) {
            Ok(id) => crate::fetch_records_for_buyer(&self.pool, id).await,
            Err(_) => Ok(Vec::new()),
        }
    }

    async fn records_for_seller(&self, seller_id: &str) -> Result<Vec<PurchaseRecord>> {
        match Uuid::parse_str(seller_id) {
            Ok(id) => crate::fetch_records_for_seller(&self.pool, id).await,
            Err(_) => Ok(Vec::new()),
        }
    }

    async fn seller_plan(&self, seller_id: &str) -> Result<Option<String>> {
        match Uuid::parse_str(seller_id) {
            Ok(id) => crate::fetch_seller_plan(&self.pool, id).await,
            Err(_) => Ok(None),
        }
    }
}
