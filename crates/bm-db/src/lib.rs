use std::collections::BTreeMap;

use anyhow::{Context, Result};
use bm_reconcile::{
    ItemType, PurchaseItem, PurchaseRecord, PurchaseStatus, PLACEHOLDER_REFERENCE,
};
use chrono::{DateTime, Utc};
use sqlx::postgres::{PgPoolOptions, PgRow};
use sqlx::{PgPool, Row};
use tracing::warn;
use uuid::Uuid;

pub mod memory;
pub mod source;

pub use memory::MemoryPurchaseSource;
pub use source::{canonical_id, PgPurchaseSource, PurchaseSource};

pub const ENV_DB_URL: &str = "BM_DATABASE_URL";

/// Connect to Postgres using BM_DATABASE_URL.
pub async fn connect_from_env() -> Result<PgPool> {
    let url = std::env::var(ENV_DB_URL)
        .with_context(|| format!("missing env var {ENV_DB_URL}"))?;
    connect(&url).await
}

pub async fn connect(url: &str) -> Result<PgPool> {
    let pool = PgPoolOptions::new()
        .max_connections(10)
        .connect(url)
        .await
        .context("failed to connect to Postgres")?;

    Ok(pool)
}

/// Run embedded SQLx migrations.
pub async fn migrate(pool: &PgPool) -> Result<()> {
    sqlx::migrate!("./migrations")
        .run(pool)
        .await
        .context("db migrate failed")?;
    Ok(())
}

/// Connectivity + schema presence.
pub async fn status(pool: &PgPool) -> Result<DbStatus> {
    let (one,): (i32,) = sqlx::query_as::<_, (i32,)>("select 1")
        .fetch_one(pool)
        .await
        .context("status connectivity query failed")?;
    let ok = one == 1;

    let (exists,): (bool,) = sqlx::query_as::<_, (bool,)>(
        r#"
        select exists (
            select 1
            from information_schema.tables
            where table_schema='public' and table_name='purchases'
        )
        "#,
    )
    .fetch_one(pool)
    .await
    .context("status table-exists query failed")?;

    Ok(DbStatus {
        ok,
        has_purchases_table: exists,
    })
}

#[derive(Debug, Clone)]
pub struct DbStatus {
    pub ok: bool,
    pub has_purchases_table: bool,
}

// ---------------------------------------------------------------------------
// Writes
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct NewPurchaseItem {
    pub seller_id: Uuid,
    pub item_name: String,
    pub item_type: ItemType,
    pub price_micros: i64,
    pub contract_id: Option<Uuid>,
    pub track_id: Option<Uuid>,
}

#[derive(Debug, Clone)]
pub struct NewPurchase {
    pub id: Uuid,
    /// `None` for guest checkout; `guest_email` is then expected.
    pub buyer_id: Option<Uuid>,
    pub guest_email: Option<String>,
    pub created_at: DateTime<Utc>,
    /// Defaults to the placeholder until the gateway confirms.
    pub payment_reference: Option<String>,
    pub amount_micros: Option<i64>,
    /// Cart order.
    pub items: Vec<NewPurchaseItem>,
}

/// Insert a `Processing` purchase and its items in one transaction.
pub async fn insert_purchase(pool: &PgPool, p: &NewPurchase) -> Result<()> {
    let mut tx = pool.begin().await.context("insert_purchase begin failed")?;

    sqlx::query(
        r#"
        insert into purchases (
          id, buyer_id, guest_email, created_at, status, payment_reference, amount_micros
        ) values (
          $1, $2, $3, $4, 'Processing', $5, $6
        )
        "#,
    )
    .bind(p.id)
    .bind(p.buyer_id)
    .bind(&p.guest_email)
    .bind(p.created_at)
    .bind(p.payment_reference.as_deref().unwrap_or(PLACEHOLDER_REFERENCE))
    .bind(p.amount_micros)
    .execute(&mut *tx)
    .await
    .context("insert_purchase row failed")?;

    for (position, item) in p.items.iter().enumerate() {
        sqlx::query(
            r#"
            insert into purchase_items (
              id, purchase_id, position, seller_id, item_name, item_type,
              price_micros, contract_id, track_id
            ) values (
              $1, $2, $3, $4, $5, $6, $7, $8, $9
            )
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(p.id)
        .bind(position as i32)
        .bind(item.seller_id)
        .bind(&item.item_name)
        .bind(item.item_type.as_str())
        .bind(item.price_micros)
        .bind(item.contract_id)
        .bind(item.track_id)
        .execute(&mut *tx)
        .await
        .with_context(|| format!("insert_purchase item {position} failed"))?;
    }

    tx.commit().await.context("insert_purchase commit failed")?;
    Ok(())
}

/// Gateway confirmation. One atomic UPDATE; a row that is already
/// `Completed` is left untouched and `false` is returned, so duplicate
/// webhook deliveries are no-ops.
pub async fn confirm_payment(pool: &PgPool, purchase_id: Uuid, reference: &str) -> Result<bool> {
    let res = sqlx::query(
        r#"
        update purchases
        set status = 'Completed',
            payment_reference = $2
        where id = $1
          and status <> 'Completed'
        "#,
    )
    .bind(purchase_id)
    .bind(reference)
    .execute(pool)
    .await
    .context("confirm_payment update failed")?;

    let applied = res.rows_affected() == 1;
    if !applied {
        warn!(%purchase_id, "confirm_payment no-op: already completed or unknown");
    }
    Ok(applied)
}

/// Gateway decline: `Processing -> Failed`. Completed rows are never
/// downgraded.
pub async fn fail_payment(pool: &PgPool, purchase_id: Uuid) -> Result<bool> {
    let res = sqlx::query(
        r#"
        update purchases
        set status = 'Failed'
        where id = $1
          and status = 'Processing'
        "#,
    )
    .bind(purchase_id)
    .execute(pool)
    .await
    .context("fail_payment update failed")?;

    Ok(res.rows_affected() == 1)
}

pub async fn set_seller_plan(pool: &PgPool, seller_id: Uuid, plan: &str) -> Result<()> {
    sqlx::query(
        r#"
        insert into seller_plans (seller_id, plan)
        values ($1, $2)
        on conflict (seller_id) do update
          set plan = excluded.plan,
              updated_at = now()
        "#,
    )
    .bind(seller_id)
    .bind(plan)
    .execute(pool)
    .await
    .context("set_seller_plan failed")?;
    Ok(())
}

// ---------------------------------------------------------------------------
// Reads
// ---------------------------------------------------------------------------

pub async fn fetch_records_for_buyer(pool: &PgPool, buyer_id: Uuid) -> Result<Vec<PurchaseRecord>> {
    let rows = sqlx::query(
        r#"
        select id, buyer_id, created_at, status, payment_reference, amount_micros
        from purchases
        where buyer_id = $1
        order by created_at desc, id
        "#,
    )
    .bind(buyer_id)
    .fetch_all(pool)
    .await
    .context("fetch_records_for_buyer failed")?;

    attach_items(pool, rows).await
}

/// Every record containing at least one item sold by `seller_id`. Records
/// carry all of their items; the seller view narrows totals later.
pub async fn fetch_records_for_seller(
    pool: &PgPool,
    seller_id: Uuid,
) -> Result<Vec<PurchaseRecord>> {
    let rows = sqlx::query(
        r#"
        select p.id, p.buyer_id, p.created_at, p.status, p.payment_reference, p.amount_micros
        from purchases p
        where exists (
            select 1
            from purchase_items i
            where i.purchase_id = p.id
              and i.seller_id = $1
        )
        order by p.created_at desc, p.id
        "#,
    )
    .bind(seller_id)
    .fetch_all(pool)
    .await
    .context("fetch_records_for_seller failed")?;

    attach_items(pool, rows).await
}

pub async fn fetch_seller_plan(pool: &PgPool, seller_id: Uuid) -> Result<Option<String>> {
    let row: Option<(String,)> =
        sqlx::query_as::<_, (String,)>("select plan from seller_plans where seller_id = $1")
            .bind(seller_id)
            .fetch_optional(pool)
            .await
            .context("fetch_seller_plan failed")?;
    Ok(row.map(|(plan,)| plan))
}

async fn attach_items(pool: &PgPool, rows: Vec<PgRow>) -> Result<Vec<PurchaseRecord>> {
    let mut records = Vec::with_capacity(rows.len());
    let mut ids: Vec<Uuid> = Vec::with_capacity(rows.len());
    for row in &rows {
        let id: Uuid = row.try_get("id")?;
        ids.push(id);
        records.push(record_from_row(row)?);
    }
    if ids.is_empty() {
        return Ok(records);
    }

    let item_rows = sqlx::query(
        r#"
        select purchase_id, seller_id, item_name, item_type, price_micros, contract_id, track_id
        from purchase_items
        where purchase_id = any($1)
        order by purchase_id, position
        "#,
    )
    .bind(&ids)
    .fetch_all(pool)
    .await
    .context("fetch purchase_items failed")?;

    let mut by_purchase: BTreeMap<Uuid, Vec<PurchaseItem>> = BTreeMap::new();
    for row in &item_rows {
        let purchase_id: Uuid = row.try_get("purchase_id")?;
        by_purchase
            .entry(purchase_id)
            .or_default()
            .push(item_from_row(row)?);
    }

    for (id, record) in ids.iter().zip(records.iter_mut()) {
        if let Some(items) = by_purchase.remove(id) {
            record.items = items;
        }
    }
    Ok(records)
}

fn record_from_row(row: &PgRow) -> Result<PurchaseRecord> {
    let id: Uuid = row.try_get("id")?;
    let buyer_id: Option<Uuid> = row.try_get("buyer_id")?;
    let status: String = row.try_get("status")?;
    Ok(PurchaseRecord {
        id: id.to_string(),
        buyer_id: buyer_id.map(|b| b.to_string()),
        created_at: row.try_get("created_at")?,
        status: PurchaseStatus::parse(&status)?,
        payment_reference: row.try_get("payment_reference")?,
        amount_micros: row.try_get("amount_micros")?,
        items: Vec::new(),
    })
}

fn item_from_row(row: &PgRow) -> Result<PurchaseItem> {
    let seller_id: Uuid = row.try_get("seller_id")?;
    let item_type: String = row.try_get("item_type")?;
    let contract_id: Option<Uuid> = row.try_get("contract_id")?;
    let track_id: Option<Uuid> = row.try_get("track_id")?;
    Ok(PurchaseItem {
        seller_id: seller_id.to_string(),
        item_name: row.try_get("item_name")?,
        item_type: ItemType::parse(&item_type)?,
        price_micros: row.try_get("price_micros")?,
        contract_id: contract_id.map(|c| c.to_string()),
        track_id: track_id.map(|t| t.to_string()),
    })
}
