//! Mock Gateway
//!
//! For testing and local demos. Answers are scripted per call kind and every
//! request is recorded for later inspection.

use std::collections::HashMap;

use async_trait::async_trait;
use reqwest::StatusCode;
use serde_json::json;
use tokio::sync::Mutex;

use super::{GatewayReply, InitializeRequest, PaymentGateway};
use crate::error::{PaymentError, Result};
use crate::tx_ref::TxRef;

#[derive(Clone, Debug)]
enum Scripted {
    Reply(GatewayReply),
    Unreachable(String),
    Malformed(String),
}

impl Scripted {
    fn play(self) -> Result<GatewayReply> {
        match self {
            Self::Reply(reply) => Ok(reply),
            Self::Unreachable(msg) => Err(PaymentError::GatewayUnreachable(msg)),
            Self::Malformed(msg) => Err(PaymentError::MalformedResponse(msg)),
        }
    }
}

/// Scripted in-process gateway
#[derive(Default)]
pub struct MockGateway {
    initialize: Option<Scripted>,
    verify: HashMap<TxRef, Scripted>,
    initialize_requests: Mutex<Vec<InitializeRequest>>,
    verify_calls: Mutex<Vec<TxRef>>,
}

impl MockGateway {
    /// Gateway that accepts every initialization and knows no transactions
    pub fn new() -> Self {
        Self::default()
    }

    /// Answer every initialization with `reply`
    #[must_use]
    pub fn with_initialize_reply(mut self, reply: GatewayReply) -> Self {
        self.initialize = Some(Scripted::Reply(reply));
        self
    }

    /// Fail every initialization as if the network were down
    #[must_use]
    pub fn with_initialize_unreachable(mut self, msg: impl Into<String>) -> Self {
        self.initialize = Some(Scripted::Unreachable(msg.into()));
        self
    }

    /// Answer verification of `tx_ref` with `body` (HTTP 200)
    #[must_use]
    pub fn with_verify_body(self, tx_ref: &TxRef, body: serde_json::Value) -> Self {
        self.with_verify_reply(tx_ref, GatewayReply::ok(body))
    }

    /// Answer verification of `tx_ref` with `reply`
    #[must_use]
    pub fn with_verify_reply(mut self, tx_ref: &TxRef, reply: GatewayReply) -> Self {
        self.verify.insert(tx_ref.clone(), Scripted::Reply(reply));
        self
    }

    /// Fail verification of `tx_ref` as if the network were down
    #[must_use]
    pub fn with_verify_unreachable(mut self, tx_ref: &TxRef, msg: impl Into<String>) -> Self {
        self.verify.insert(tx_ref.clone(), Scripted::Unreachable(msg.into()));
        self
    }

    /// Fail verification of `tx_ref` with an unparseable body
    #[must_use]
    pub fn with_verify_malformed(mut self, tx_ref: &TxRef, msg: impl Into<String>) -> Self {
        self.verify.insert(tx_ref.clone(), Scripted::Malformed(msg.into()));
        self
    }

    /// Initialization bodies received so far
    pub async fn initialize_requests(&self) -> Vec<InitializeRequest> {
        self.initialize_requests.lock().await.clone()
    }

    /// References verified so far, in call order
    pub async fn verify_calls(&self) -> Vec<TxRef> {
        self.verify_calls.lock().await.clone()
    }

    /// Chapa's answer for an unknown reference
    fn not_found() -> GatewayReply {
        GatewayReply::new(
            StatusCode::BAD_REQUEST,
            json!({
                "message": "Invalid transaction or Transaction not found",
                "status": "failed",
                "data": null
            }),
        )
    }
}

#[async_trait]
impl PaymentGateway for MockGateway {
    async fn initialize(&self, request: &InitializeRequest) -> Result<GatewayReply> {
        self.initialize_requests.lock().await.push(request.clone());

        match &self.initialize {
            Some(scripted) => scripted.clone().play(),
            None => Ok(GatewayReply::ok(json!({
                "message": "Hosted Link",
                "status": "success",
                "data": { "checkout_url": format!("https://checkout.mock/{}", request.tx_ref) }
            }))),
        }
    }

    async fn verify(&self, tx_ref: &TxRef) -> Result<GatewayReply> {
        self.verify_calls.lock().await.push(tx_ref.clone());

        self.verify
            .get(tx_ref)
            .map_or_else(|| Ok(Self::not_found()), |scripted| scripted.clone().play())
    }

    fn name(&self) -> &str {
        "Mock"
    }
}
