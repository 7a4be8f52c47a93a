//! Application State

use std::sync::Arc;

use subscription_payments::PaymentService;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    /// Payment initiator and callback handler
    pub payments: Arc<PaymentService>,
}

impl AppState {
    pub fn new(payments: PaymentService) -> Self {
        Self {
            payments: Arc::new(payments),
        }
    }
}
