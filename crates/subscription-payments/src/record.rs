//! Payment Records

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::tx_ref::TxRef;
use crate::verification::VerifiedPayment;

/// Stored payment status. Only verified payments are ever stored.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentStatus {
    #[default]
    Success,
}

impl PaymentStatus {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Success => "success",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "success" => Some(Self::Success),
            _ => None,
        }
    }
}

/// A verified, successful payment
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentRecord {
    /// Payer first name as reported at verification
    pub name: String,

    /// Payer phone number as reported at verification
    pub phone: String,

    /// Amount confirmed by the gateway
    pub amount: Decimal,

    /// Unique per transaction
    pub tx_ref: TxRef,

    pub status: PaymentStatus,

    pub created_at: DateTime<Utc>,
}

impl PaymentRecord {
    /// Build the record for a gateway-confirmed payment
    pub fn confirmed(tx_ref: TxRef, payment: &VerifiedPayment) -> Self {
        Self {
            name: payment.first_name.clone(),
            phone: payment.phone_number.clone(),
            amount: payment.amount,
            tx_ref,
            status: PaymentStatus::Success,
            created_at: Utc::now(),
        }
    }
}
