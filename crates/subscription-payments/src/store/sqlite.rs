//! SQLite store
//!
//! `tx_ref` carries a UNIQUE constraint; inserts use `ON CONFLICT DO NOTHING`
//! so concurrent callbacks for one transaction write a single row.

use std::str::FromStr;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::migrate::Migrator;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};

use super::{InsertOutcome, PaymentStore};
use crate::error::{PaymentError, Result};
use crate::record::{PaymentRecord, PaymentStatus};
use crate::tx_ref::TxRef;

static MIGRATOR: Migrator = sqlx::migrate!(); // defaults to "./migrations"

#[derive(Debug, sqlx::FromRow)]
struct PaymentRow {
    name: String,
    phone: String,
    amount: String,
    tx_ref: String,
    status: String,
    created_at: DateTime<Utc>,
}

impl TryFrom<PaymentRow> for PaymentRecord {
    type Error = PaymentError;

    fn try_from(row: PaymentRow) -> Result<Self> {
        let amount = Decimal::from_str(&row.amount)
            .map_err(|e| PaymentError::Storage(format!("bad amount for {}: {e}", row.tx_ref)))?;
        let status = PaymentStatus::parse(&row.status).ok_or_else(|| {
            PaymentError::Storage(format!("bad status for {}: {}", row.tx_ref, row.status))
        })?;

        Ok(Self {
            name: row.name,
            phone: row.phone,
            amount,
            tx_ref: TxRef::from_string(row.tx_ref),
            status,
            created_at: row.created_at,
        })
    }
}

/// SQLite-backed payment store
#[derive(Debug, Clone)]
pub struct SqlitePaymentStore {
    pool: SqlitePool,
}

impl SqlitePaymentStore {
    /// Open (creating if missing) the database at `database_url` and migrate it.
    ///
    /// An in-memory URL (`sqlite::memory:`) gets a single connection that is
    /// never recycled, since the database lives only as long as it does.
    pub async fn connect(database_url: &str) -> Result<Self> {
        let options = SqliteConnectOptions::from_str(database_url)?.create_if_missing(true);
        let mut pool_options = SqlitePoolOptions::new();

        if is_in_memory(database_url) {
            pool_options = pool_options
                .max_connections(1)
                .idle_timeout(None)
                .max_lifetime(None);
        } else if let Some(parent) =
            options.get_filename().parent().filter(|p| !p.as_os_str().is_empty())
        {
            tokio::fs::create_dir_all(parent).await.map_err(|e| {
                PaymentError::Storage(format!("creating {}: {e}", parent.display()))
            })?;
        }

        let pool = pool_options.connect_with(options).await?;
        Self::from_pool(pool).await
    }

    /// Wrap an existing pool and migrate it
    pub async fn from_pool(pool: SqlitePool) -> Result<Self> {
        MIGRATOR.run(&pool).await?;
        Ok(Self { pool })
    }

    async fn fetch(&self, tx_ref: &str) -> Result<Option<PaymentRecord>> {
        let row: Option<PaymentRow> = sqlx::query_as(
            "SELECT name, phone, amount, tx_ref, status, created_at \
             FROM user_payments WHERE tx_ref = ?",
        )
        .bind(tx_ref)
        .fetch_optional(&self.pool)
        .await?;

        row.map(PaymentRecord::try_from).transpose()
    }
}

fn is_in_memory(database_url: &str) -> bool {
    database_url.contains(":memory:") || database_url.contains("mode=memory")
}

#[async_trait]
impl PaymentStore for SqlitePaymentStore {
    async fn insert(&self, record: &PaymentRecord) -> Result<InsertOutcome> {
        let result = sqlx::query(
            "INSERT INTO user_payments (name, phone, amount, tx_ref, status, created_at) \
             VALUES (?, ?, ?, ?, ?, ?) ON CONFLICT(tx_ref) DO NOTHING",
        )
        .bind(&record.name)
        .bind(&record.phone)
        .bind(record.amount.to_string())
        .bind(record.tx_ref.as_str())
        .bind(record.status.as_str())
        .bind(record.created_at)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 1 {
            return Ok(InsertOutcome::Inserted);
        }

        self.fetch(record.tx_ref.as_str())
            .await?
            .map(InsertOutcome::AlreadyRecorded)
            .ok_or_else(|| {
                PaymentError::Storage(format!(
                    "insert of {} conflicted but no row exists",
                    record.tx_ref
                ))
            })
    }

    async fn get(&self, tx_ref: &TxRef) -> Result<Option<PaymentRecord>> {
        self.fetch(tx_ref.as_str()).await
    }

    async fn count(&self) -> Result<u64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM user_payments")
            .fetch_one(&self.pool)
            .await?;
        u64::try_from(count).map_err(|e| PaymentError::Storage(e.to_string()))
    }

    fn backend(&self) -> &str {
        "sqlite"
    }
}
