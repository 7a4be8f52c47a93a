//! In-memory store (for development and tests)

use std::collections::HashMap;
use std::collections::hash_map::Entry;

use async_trait::async_trait;
use tokio::sync::RwLock;

use super::{InsertOutcome, PaymentStore};
use crate::error::Result;
use crate::record::PaymentRecord;
use crate::tx_ref::TxRef;

/// In-memory payment store
#[derive(Default)]
pub struct MemoryPaymentStore {
    records: RwLock<HashMap<TxRef, PaymentRecord>>,
}

impl MemoryPaymentStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl PaymentStore for MemoryPaymentStore {
    async fn insert(&self, record: &PaymentRecord) -> Result<InsertOutcome> {
        let mut records = self.records.write().await;

        match records.entry(record.tx_ref.clone()) {
            Entry::Occupied(existing) => Ok(InsertOutcome::AlreadyRecorded(existing.get().clone())),
            Entry::Vacant(slot) => {
                slot.insert(record.clone());
                Ok(InsertOutcome::Inserted)
            }
        }
    }

    async fn get(&self, tx_ref: &TxRef) -> Result<Option<PaymentRecord>> {
        Ok(self.records.read().await.get(tx_ref).cloned())
    }

    async fn count(&self) -> Result<u64> {
        Ok(self.records.read().await.len() as u64)
    }

    fn backend(&self) -> &str {
        "memory"
    }
}
