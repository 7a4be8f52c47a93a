//! Transaction Verification
//!
//! Classifies a verify response into a single outcome. A payment counts as
//! confirmed only when the envelope status and the transaction status both
//! read `"success"`; shapes we do not recognise land in `Unknown`.

use std::str::FromStr;

use rust_decimal::Decimal;
use serde_json::Value;

use crate::error::{PaymentError, Result};

/// Final state of a transaction as reported by the gateway
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum VerificationOutcome {
    /// Money moved; payer details come from the gateway
    Confirmed(VerifiedPayment),

    /// Gateway says the transaction failed or does not exist
    Declined { reason: String },

    /// Payer has not finished checkout yet
    Pending,

    /// Response shape we do not recognise
    Unknown { detail: String },
}

/// Payer details and amount confirmed by the gateway
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct VerifiedPayment {
    pub first_name: String,
    pub phone_number: String,
    pub amount: Decimal,
    pub currency: Option<String>,
}

impl VerificationOutcome {
    /// Classify a verify response body
    pub fn from_body(body: &Value) -> Result<Self> {
        let envelope = body.as_object().ok_or_else(|| {
            PaymentError::MalformedResponse("verify body is not a JSON object".into())
        })?;

        match envelope.get("status").and_then(Value::as_str) {
            Some("success") => {}
            Some(status @ ("failed" | "error")) => {
                let reason = envelope
                    .get("message")
                    .and_then(Value::as_str)
                    .unwrap_or(status)
                    .to_string();
                return Ok(Self::Declined { reason });
            }
            other => {
                return Ok(Self::Unknown {
                    detail: format!("envelope status {other:?}"),
                });
            }
        }

        let data = envelope.get("data").and_then(Value::as_object).ok_or_else(|| {
            PaymentError::MalformedResponse("verify body has no data object".into())
        })?;

        match data.get("status").and_then(Value::as_str) {
            Some("success") => {
                let payment = VerifiedPayment {
                    first_name: required_str(data, "first_name")?,
                    phone_number: required_str(data, "phone_number")?,
                    amount: required_amount(data)?,
                    currency: data.get("currency").and_then(Value::as_str).map(str::to_string),
                };
                Ok(Self::Confirmed(payment))
            }
            Some("pending") => Ok(Self::Pending),
            Some(status @ ("failed" | "cancelled" | "canceled" | "reversed" | "refunded")) => {
                Ok(Self::Declined {
                    reason: status.to_string(),
                })
            }
            other => Ok(Self::Unknown {
                detail: format!("transaction status {other:?}"),
            }),
        }
    }
}

fn required_str(data: &serde_json::Map<String, Value>, field: &str) -> Result<String> {
    data.get(field)
        .and_then(Value::as_str)
        .map(str::to_string)
        .ok_or_else(|| {
            PaymentError::MalformedResponse(format!("verified transaction has no {field}"))
        })
}

/// Gateway sends the amount as a number or a decimal string
fn required_amount(data: &serde_json::Map<String, Value>) -> Result<Decimal> {
    let parsed = match data.get("amount") {
        Some(Value::Number(n)) => Decimal::from_str(&n.to_string()).ok(),
        Some(Value::String(s)) => Decimal::from_str(s.trim()).ok(),
        _ => None,
    };
    parsed.ok_or_else(|| {
        PaymentError::MalformedResponse("verified transaction has no valid amount".into())
    })
}
