//! Chapa API Client
//!
//! Implementation of `PaymentGateway` for <https://api.chapa.co>.

use async_trait::async_trait;
use reqwest::{Client, Response, Url};

use super::{GatewayReply, InitializeRequest, PaymentGateway};
use crate::config::{PaymentConfig, SecretKey};
use crate::error::{PaymentError, Result};
use crate::tx_ref::TxRef;

/// Chapa HTTP client
pub struct ChapaClient {
    http: Client,
    base_url: Url,
    secret_key: SecretKey,
}

impl ChapaClient {
    /// Create a client from configuration
    pub fn new(config: &PaymentConfig) -> Result<Self> {
        let base_url = Url::parse(&config.api_base_url)
            .map_err(|e| PaymentError::Config(format!("invalid gateway base URL: {e}")))?;
        if base_url.cannot_be_a_base() {
            return Err(PaymentError::Config(format!(
                "gateway base URL cannot be a base: {}",
                config.api_base_url
            )));
        }

        let http = Client::builder()
            .timeout(config.request_timeout)
            .connect_timeout(config.connect_timeout)
            .build()
            .map_err(|e| PaymentError::Config(format!("HTTP client: {e}")))?;

        Ok(Self {
            http,
            base_url,
            secret_key: config.secret_key.clone(),
        })
    }

    /// Append encoded path segments to the base URL
    fn endpoint(&self, segments: &[&str]) -> Result<Url> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|()| PaymentError::Config("gateway base URL cannot be a base".into()))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    /// Keep the status, require a JSON body
    async fn read_reply(response: Response) -> Result<GatewayReply> {
        let status = response.status();
        let bytes = response.bytes().await?;

        let body = serde_json::from_slice(&bytes).map_err(|e| {
            tracing::warn!(status = %status, len = bytes.len(), "Gateway returned a non-JSON body");
            PaymentError::MalformedResponse(format!("{status}: {e}"))
        })?;

        Ok(GatewayReply::new(status, body))
    }
}

#[async_trait]
impl PaymentGateway for ChapaClient {
    async fn initialize(&self, request: &InitializeRequest) -> Result<GatewayReply> {
        let url = self.endpoint(&["transaction", "initialize"])?;
        tracing::debug!(tx_ref = %request.tx_ref, "POST {}", url.path());

        let response = self
            .http
            .post(url)
            .bearer_auth(self.secret_key.expose())
            .json(request)
            .send()
            .await
            .map_err(|e| PaymentError::GatewayUnreachable(e.to_string()))?;

        Self::read_reply(response).await
    }

    async fn verify(&self, tx_ref: &TxRef) -> Result<GatewayReply> {
        // `.` and `..` segments would be collapsed into a different endpoint
        if !tx_ref.is_well_formed() {
            return Err(PaymentError::InvalidReference(tx_ref.to_string()));
        }
        let url = self.endpoint(&["transaction", "verify", tx_ref.as_str()])?;
        tracing::debug!(tx_ref = %tx_ref, "GET {}", url.path());

        let response = self
            .http
            .get(url)
            .bearer_auth(self.secret_key.expose())
            .send()
            .await
            .map_err(|e| PaymentError::GatewayUnreachable(e.to_string()))?;

        Self::read_reply(response).await
    }

    fn name(&self) -> &str {
        "Chapa"
    }
}
