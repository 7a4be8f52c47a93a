//! Router

use axum::{
    routing::{get, post},
    Router,
};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use crate::handlers::{health_check, initialize_payment, payment_callback};
use crate::state::AppState;

/// Build the application router.
///
/// Payment routes are served both at the root and under `/api`.
pub fn router(state: AppState) -> Router {
    // The checkout form is served from a different origin
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let payments = Router::new()
        .route("/pay", post(initialize_payment))
        .route("/payment/callback", get(payment_callback));

    Router::new()
        .route("/health", get(health_check))
        .merge(payments.clone())
        .nest("/api", payments)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
