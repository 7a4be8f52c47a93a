//! HTTP Handlers

use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::Redirect,
    Json,
};
use serde::{Deserialize, Serialize};

use subscription_payments::{Payer, PaymentError, TxRef};

use crate::state::AppState;

// ============================================================================
// Request / Response Types
// ============================================================================

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
    pub gateway: String,
    pub store: String,
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: String,
}

#[derive(Debug, Deserialize)]
pub struct PayRequest {
    pub name: String,
    pub phone: String,
}

/// Query string of the gateway callback. Chapa sends `trx_ref`; our own
/// return links use `tx_ref`.
#[derive(Debug, Default, Deserialize)]
pub struct CallbackQuery {
    #[serde(default)]
    pub tx_ref: Option<String>,
    #[serde(default)]
    pub trx_ref: Option<String>,
}

impl CallbackQuery {
    fn reference(self) -> Option<TxRef> {
        [self.tx_ref, self.trx_ref]
            .into_iter()
            .flatten()
            .map(|r| r.trim().to_string())
            .find(|r| !r.is_empty())
            .map(TxRef::from_string)
    }
}

// ============================================================================
// Handlers
// ============================================================================

/// Health check endpoint
pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        version: env!("CARGO_PKG_VERSION"),
        gateway: state.payments.gateway().name().to_string(),
        store: state.payments.store().backend().to_string(),
    })
}

/// Start a payment; the gateway's answer is forwarded unchanged
pub async fn initialize_payment(
    State(state): State<AppState>,
    Json(payload): Json<PayRequest>,
) -> Result<(StatusCode, Json<serde_json::Value>), (StatusCode, Json<ErrorResponse>)> {
    let payer = Payer {
        name: payload.name,
        phone: payload.phone,
    };

    let init = state.payments.initialize(payer).await.map_err(|e| {
        let code = match e {
            PaymentError::GatewayUnreachable(_) => "GATEWAY_UNREACHABLE",
            PaymentError::MalformedResponse(_) => "GATEWAY_MALFORMED",
            PaymentError::InvalidReference(_)
            | PaymentError::Storage(_)
            | PaymentError::Config(_) => "PAYMENT_ERROR",
        };
        (
            StatusCode::BAD_GATEWAY,
            Json(ErrorResponse {
                error: e.user_message().into(),
                code: code.into(),
            }),
        )
    })?;

    Ok((init.reply.status, Json(init.reply.body)))
}

/// Gateway callback: verify, record, redirect
pub async fn payment_callback(
    State(state): State<AppState>,
    Query(query): Query<CallbackQuery>,
) -> Redirect {
    let config = state.payments.config();

    let Some(tx_ref) = query.reference() else {
        tracing::warn!(failure = "missing_reference", "Callback without a transaction reference");
        return Redirect::to(&config.failure_redirect_url);
    };

    let outcome = state.payments.handle_callback(&tx_ref).await;
    Redirect::to(outcome.redirect_url(config))
}
