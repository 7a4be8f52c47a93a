//! Payment Record Storage
//!
//! Records are append-only and keyed by transaction reference. Inserting a
//! reference that is already stored leaves the first record in place and
//! hands it back, so replayed callbacks are detectable instead of duplicated.

mod memory;
#[cfg(feature = "sqlite")]
mod sqlite;

pub use memory::MemoryPaymentStore;
#[cfg(feature = "sqlite")]
pub use sqlite::SqlitePaymentStore;

use async_trait::async_trait;

use crate::error::Result;
use crate::record::PaymentRecord;
use crate::tx_ref::TxRef;

/// Result of an insert
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum InsertOutcome {
    /// The record was stored
    Inserted,

    /// A record with the same reference already exists; nothing was written
    AlreadyRecorded(PaymentRecord),
}

/// Payment record storage trait
#[async_trait]
pub trait PaymentStore: Send + Sync {
    /// Store a record unless its reference is already present
    async fn insert(&self, record: &PaymentRecord) -> Result<InsertOutcome>;

    /// Get a record by reference
    async fn get(&self, tx_ref: &TxRef) -> Result<Option<PaymentRecord>>;

    /// Number of stored records
    async fn count(&self) -> Result<u64>;

    /// Backend name for health output
    fn backend(&self) -> &str;
}
