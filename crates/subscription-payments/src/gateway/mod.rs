//! Payment Gateway Integration
//!
//! The gateway is a black box reached over HTTP. [`ChapaClient`] talks to the
//! real API; [`MockGateway`] replays scripted answers for tests.

mod chapa;
mod mock;

pub use chapa::ChapaClient;
pub use mock::MockGateway;

use async_trait::async_trait;
use reqwest::StatusCode;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::tx_ref::TxRef;

/// Payment gateway trait (Strategy pattern)
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    /// Start a hosted-checkout transaction
    async fn initialize(&self, request: &InitializeRequest) -> Result<GatewayReply>;

    /// Ask the gateway for the final state of a transaction
    async fn verify(&self, tx_ref: &TxRef) -> Result<GatewayReply>;

    /// Gateway name
    fn name(&self) -> &str;
}

/// Body of the gateway's initialize call
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct InitializeRequest {
    pub amount: Decimal,
    pub currency: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub phone_number: String,
    pub tx_ref: TxRef,
    pub callback_url: String,
    pub return_url: String,
}

/// HTTP status and JSON body exactly as the gateway sent them
#[derive(Clone, Debug, PartialEq)]
pub struct GatewayReply {
    pub status: StatusCode,
    pub body: serde_json::Value,
}

impl GatewayReply {
    pub const fn new(status: StatusCode, body: serde_json::Value) -> Self {
        Self { status, body }
    }

    /// Shortcut for a `200 OK` reply
    pub const fn ok(body: serde_json::Value) -> Self {
        Self::new(StatusCode::OK, body)
    }

    /// Checkout URL of a successful initialization, if present
    pub fn checkout_url(&self) -> Option<&str> {
        self.body.get("data")?.get("checkout_url")?.as_str()
    }
}
