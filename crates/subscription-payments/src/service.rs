//! Payment Service
//!
//! The two-step handshake:
//!
//! 1. [`PaymentService::initialize`] starts a transaction and returns the
//!    gateway's answer (with the checkout URL) untouched.
//! 2. [`PaymentService::handle_callback`] verifies the transaction with the
//!    gateway and stores a record only when the gateway confirms it.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::config::PaymentConfig;
use crate::error::{PaymentError, Result};
use crate::gateway::{GatewayReply, InitializeRequest, PaymentGateway};
use crate::record::PaymentRecord;
use crate::store::{InsertOutcome, PaymentStore};
use crate::tx_ref::TxRef;
use crate::verification::VerificationOutcome;

/// Payer details collected by the checkout form
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Payer {
    pub name: String,
    pub phone: String,
}

/// A started transaction
#[derive(Clone, Debug)]
pub struct Initialization {
    pub tx_ref: TxRef,
    pub reply: GatewayReply,
}

/// Why a callback did not produce a stored payment
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CallbackFailure {
    /// Verify call never got an answer
    GatewayUnreachable(String),

    /// Gateway reported the transaction failed or unknown
    Declined { reason: String },

    /// Payer has not finished yet
    Pending,

    /// Gateway answered with a shape we do not recognise
    Unknown { detail: String },

    /// Gateway answer was missing expected fields
    Malformed(String),

    /// Callback carried a reference that cannot be sent to the gateway
    InvalidReference(String),

    /// Gateway client is misconfigured
    Config(String),

    /// Payment was confirmed but could not be stored
    Persistence(String),
}

impl CallbackFailure {
    /// Stable identifier used as a log field
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::GatewayUnreachable(_) => "gateway_unreachable",
            Self::Declined { .. } => "declined",
            Self::Pending => "pending",
            Self::Unknown { .. } => "unknown",
            Self::Malformed(_) => "malformed_response",
            Self::InvalidReference(_) => "invalid_reference",
            Self::Config(_) => "config",
            Self::Persistence(_) => "persistence",
        }
    }

    fn from_error(err: PaymentError) -> Self {
        match err {
            PaymentError::GatewayUnreachable(msg) => Self::GatewayUnreachable(msg),
            PaymentError::MalformedResponse(msg) => Self::Malformed(msg),
            PaymentError::InvalidReference(tx_ref) => Self::InvalidReference(tx_ref),
            PaymentError::Storage(msg) => Self::Persistence(msg),
            PaymentError::Config(msg) => Self::Config(msg),
        }
    }
}

impl std::fmt::Display for CallbackFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::GatewayUnreachable(msg) => write!(f, "gateway unreachable: {msg}"),
            Self::Declined { reason } => write!(f, "declined: {reason}"),
            Self::Pending => write!(f, "transaction still pending"),
            Self::Unknown { detail } => write!(f, "unrecognised verify response: {detail}"),
            Self::Malformed(msg) => write!(f, "malformed verify response: {msg}"),
            Self::InvalidReference(tx_ref) => write!(f, "invalid transaction reference {tx_ref:?}"),
            Self::Config(msg) => write!(f, "gateway misconfigured: {msg}"),
            Self::Persistence(msg) => write!(f, "could not store payment: {msg}"),
        }
    }
}

/// Result of processing a callback
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CallbackOutcome {
    /// Payment confirmed and stored
    Recorded(PaymentRecord),

    /// Payment confirmed; a record for this reference already existed
    AlreadyRecorded(PaymentRecord),

    /// Nothing stored
    Failed(CallbackFailure),
}

impl CallbackOutcome {
    pub const fn is_success(&self) -> bool {
        matches!(self, Self::Recorded(_) | Self::AlreadyRecorded(_))
    }

    /// Where the browser goes next
    pub fn redirect_url<'a>(&self, config: &'a PaymentConfig) -> &'a str {
        if self.is_success() {
            &config.success_redirect_url
        } else {
            &config.failure_redirect_url
        }
    }
}

/// Payment initiator and callback handler
pub struct PaymentService {
    gateway: Arc<dyn PaymentGateway>,
    store: Arc<dyn PaymentStore>,
    config: PaymentConfig,
}

impl PaymentService {
    pub fn new(
        gateway: Arc<dyn PaymentGateway>,
        store: Arc<dyn PaymentStore>,
        config: PaymentConfig,
    ) -> Self {
        Self { gateway, store, config }
    }

    pub const fn config(&self) -> &PaymentConfig {
        &self.config
    }

    pub fn gateway(&self) -> &dyn PaymentGateway {
        self.gateway.as_ref()
    }

    pub fn store(&self) -> &dyn PaymentStore {
        self.store.as_ref()
    }

    /// Start a transaction for `payer` at the configured fixed charge
    #[tracing::instrument(
        skip_all,
        fields(gateway = self.gateway.name(), tx_ref = tracing::field::Empty)
    )]
    pub async fn initialize(&self, payer: Payer) -> Result<Initialization> {
        let tx_ref = TxRef::generate();
        tracing::Span::current().record("tx_ref", tracing::field::display(&tx_ref));

        let request = InitializeRequest {
            amount: self.config.charge.amount,
            currency: self.config.charge.currency.clone(),
            email: self.config.payer_email.clone(),
            first_name: payer.name,
            last_name: self.config.payer_last_name.clone(),
            phone_number: payer.phone,
            tx_ref: tx_ref.clone(),
            callback_url: self.config.callback_url.clone(),
            return_url: self.config.return_url.clone(),
        };

        let reply = self.gateway.initialize(&request).await.map_err(|e| {
            tracing::error!(failure = e.kind(), error = %e, "Payment initialization failed");
            e
        })?;

        tracing::info!(
            status = %reply.status,
            checkout = reply.checkout_url().is_some(),
            "Payment initialized"
        );

        Ok(Initialization { tx_ref, reply })
    }

    /// Verify `tx_ref` with the gateway and store it if confirmed
    #[tracing::instrument(skip_all, fields(gateway = self.gateway.name(), tx_ref = %tx_ref))]
    pub async fn handle_callback(&self, tx_ref: &TxRef) -> CallbackOutcome {
        let outcome = match self.confirm(tx_ref).await {
            Ok(outcome) => outcome,
            Err(e) => CallbackOutcome::Failed(CallbackFailure::from_error(e)),
        };

        match &outcome {
            CallbackOutcome::Recorded(record) => {
                tracing::info!(amount = %record.amount, "Payment recorded");
            }
            CallbackOutcome::AlreadyRecorded(record) => {
                tracing::warn!(
                    amount = %record.amount,
                    first_seen = %record.created_at,
                    "Duplicate callback for an already recorded payment"
                );
            }
            CallbackOutcome::Failed(
                failure @ (CallbackFailure::Declined { .. } | CallbackFailure::Pending),
            ) => {
                tracing::info!(failure = failure.kind(), "Payment not confirmed: {failure}");
            }
            CallbackOutcome::Failed(failure @ CallbackFailure::InvalidReference(_)) => {
                tracing::warn!(failure = failure.kind(), "Callback rejected: {failure}");
            }
            CallbackOutcome::Failed(failure) => {
                tracing::error!(failure = failure.kind(), "Payment callback failed: {failure}");
            }
        }

        outcome
    }

    async fn confirm(&self, tx_ref: &TxRef) -> Result<CallbackOutcome> {
        if !tx_ref.is_well_formed() {
            return Err(PaymentError::InvalidReference(tx_ref.to_string()));
        }
        let reply = self.gateway.verify(tx_ref).await?;

        let payment = match VerificationOutcome::from_body(&reply.body)? {
            VerificationOutcome::Confirmed(payment) => payment,
            VerificationOutcome::Declined { reason } => {
                return Ok(CallbackOutcome::Failed(CallbackFailure::Declined { reason }));
            }
            VerificationOutcome::Pending => {
                return Ok(CallbackOutcome::Failed(CallbackFailure::Pending));
            }
            VerificationOutcome::Unknown { detail } => {
                return Ok(CallbackOutcome::Failed(CallbackFailure::Unknown {
                    detail: format!("{detail} (HTTP {})", reply.status),
                }));
            }
        };

        let record = PaymentRecord::confirmed(tx_ref.clone(), &payment);
        match self.store.insert(&record).await? {
            InsertOutcome::Inserted => Ok(CallbackOutcome::Recorded(record)),
            InsertOutcome::AlreadyRecorded(existing) => {
                Ok(CallbackOutcome::AlreadyRecorded(existing))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gateway::MockGateway;
    use crate::record::PaymentStatus;
    use crate::store::MemoryPaymentStore;
    use async_trait::async_trait;
    use reqwest::StatusCode;
    use rust_decimal_macros::dec;
    use serde_json::json;

    fn abel() -> Payer {
        Payer {
            name: "Abel".into(),
            phone: "+251911111111".into(),
        }
    }

    fn confirmed_body(amount: serde_json::Value) -> serde_json::Value {
        json!({
            "status": "success",
            "data": {
                "status": "success",
                "first_name": "Abel",
                "phone_number": "+251911111111",
                "amount": amount
            }
        })
    }

    fn service(gateway: Arc<MockGateway>, store: Arc<dyn PaymentStore>) -> PaymentService {
        PaymentService::new(gateway, store, PaymentConfig::with_defaults("CHASECK_TEST-k"))
    }

    #[tokio::test]
    async fn test_initialize_forwards_reply_verbatim() {
        let body = json!({
            "status": "success",
            "data": { "checkout_url": "https://pay.example/abc" }
        });
        let gateway =
            Arc::new(MockGateway::new().with_initialize_reply(GatewayReply::ok(body.clone())));
        let service = service(gateway, Arc::new(MemoryPaymentStore::new()));

        let init = service.initialize(abel()).await.unwrap();
        assert_eq!(init.reply.body, body);
        assert_eq!(init.reply.status, StatusCode::OK);
    }

    #[tokio::test]
    async fn test_initialize_sends_fixed_charge_and_config_fields() {
        let gateway = Arc::new(MockGateway::new());
        let mut config = PaymentConfig::with_defaults("CHASECK_TEST-k");
        config.callback_url = "https://api.example.com/api/payment/callback".into();
        let service =
            PaymentService::new(gateway.clone(), Arc::new(MemoryPaymentStore::new()), config);

        let init = service.initialize(abel()).await.unwrap();

        let sent = gateway.initialize_requests().await;
        assert_eq!(sent.len(), 1);
        let sent = &sent[0];
        assert_eq!(sent.amount, dec!(100));
        assert_eq!(sent.currency, "ETB");
        assert_eq!(sent.email, "test@gmail.com");
        assert_eq!(sent.first_name, "Abel");
        assert_eq!(sent.last_name, "User");
        assert_eq!(sent.phone_number, "+251911111111");
        assert_eq!(sent.tx_ref, init.tx_ref);
        assert_eq!(sent.callback_url, "https://api.example.com/api/payment/callback");
        assert_eq!(sent.return_url, "http://localhost:5173/success");
    }

    #[tokio::test]
    async fn test_each_initialization_gets_a_fresh_reference() {
        let gateway = Arc::new(MockGateway::new());
        let service = Arc::new(service(gateway.clone(), Arc::new(MemoryPaymentStore::new())));

        let tasks: Vec<_> = (0..20)
            .map(|_| {
                let service = service.clone();
                tokio::spawn(async move { service.initialize(abel()).await.unwrap().tx_ref })
            })
            .collect();

        let mut refs = std::collections::HashSet::new();
        for task in tasks {
            refs.insert(task.await.unwrap());
        }
        assert_eq!(refs.len(), 20);
        assert_eq!(gateway.initialize_requests().await.len(), 20);
    }

    #[tokio::test]
    async fn test_initialize_network_error_propagates() {
        let gateway =
            Arc::new(MockGateway::new().with_initialize_unreachable("connection refused"));
        let service = service(gateway, Arc::new(MemoryPaymentStore::new()));

        let err = service.initialize(abel()).await.unwrap_err();
        assert!(matches!(err, PaymentError::GatewayUnreachable(_)));
    }

    #[tokio::test]
    async fn test_confirmed_callback_stores_gateway_values() {
        let tx_ref = TxRef::from_string("txn_1700000000");
        let gateway =
            Arc::new(MockGateway::new().with_verify_body(&tx_ref, confirmed_body(json!(100))));
        let store = Arc::new(MemoryPaymentStore::new());
        let service = service(gateway, store.clone());

        let outcome = service.handle_callback(&tx_ref).await;
        assert!(outcome.is_success());
        assert_eq!(outcome.redirect_url(service.config()), "http://localhost:5173/success");

        let stored = store.get(&tx_ref).await.unwrap().unwrap();
        assert_eq!(stored.name, "Abel");
        assert_eq!(stored.phone, "+251911111111");
        assert_eq!(stored.amount, dec!(100));
        assert_eq!(stored.status, PaymentStatus::Success);
        assert_eq!(outcome, CallbackOutcome::Recorded(stored));
    }

    #[tokio::test]
    async fn test_stored_amount_is_the_gateway_amount() {
        let tx_ref = TxRef::from_string("txn_partial");
        let gateway = Arc::new(
            MockGateway::new().with_verify_body(&tx_ref, confirmed_body(json!("42.75"))),
        );
        let store = Arc::new(MemoryPaymentStore::new());

        service(gateway, store.clone()).handle_callback(&tx_ref).await;

        assert_eq!(store.get(&tx_ref).await.unwrap().unwrap().amount, dec!(42.75));
    }

    #[tokio::test]
    async fn test_inner_failure_stores_nothing() {
        let tx_ref = TxRef::from_string("txn_declined");
        let declined = json!({"status": "success", "data": {"status": "failed"}});
        let gateway = Arc::new(MockGateway::new().with_verify_body(&tx_ref, declined));
        let store = Arc::new(MemoryPaymentStore::new());
        let service = service(gateway, store.clone());

        let outcome = service.handle_callback(&tx_ref).await;
        assert_eq!(
            outcome,
            CallbackOutcome::Failed(CallbackFailure::Declined { reason: "failed".into() })
        );
        assert_eq!(outcome.redirect_url(service.config()), "http://localhost:5173/fail");
        assert_eq!(store.count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_failure_taxonomy() {
        let unreachable = TxRef::from_string("txn_net");
        let malformed = TxRef::from_string("txn_bad_body");
        let missing_fields = TxRef::from_string("txn_no_phone");
        let pending = TxRef::from_string("txn_wait");
        let unknown = TxRef::from_string("txn_nope");

        let gateway = Arc::new(
            MockGateway::new()
                .with_verify_unreachable(&unreachable, "connection reset")
                .with_verify_malformed(&malformed, "expected value at line 1")
                .with_verify_body(
                    &missing_fields,
                    json!({
                        "status": "success",
                        "data": { "status": "success", "first_name": "Abel", "amount": 100 }
                    }),
                )
                .with_verify_body(
                    &pending,
                    json!({"status": "success", "data": {"status": "pending"}}),
                ),
        );
        let store = Arc::new(MemoryPaymentStore::new());
        let service = service(gateway.clone(), store.clone());

        let kind = |outcome: CallbackOutcome| match outcome {
            CallbackOutcome::Failed(failure) => failure.kind(),
            other => panic!("expected failure, got {other:?}"),
        };

        assert_eq!(kind(service.handle_callback(&unreachable).await), "gateway_unreachable");
        assert_eq!(kind(service.handle_callback(&malformed).await), "malformed_response");
        assert_eq!(kind(service.handle_callback(&missing_fields).await), "malformed_response");
        assert_eq!(kind(service.handle_callback(&pending).await), "pending");
        assert_eq!(kind(service.handle_callback(&unknown).await), "declined");

        assert_eq!(store.count().await.unwrap(), 0);
        assert_eq!(gateway.verify_calls().await.len(), 5);
    }

    #[tokio::test]
    async fn test_replayed_callback_is_detected_not_duplicated() {
        let tx_ref = TxRef::from_string("txn_1700000000");
        let gateway =
            Arc::new(MockGateway::new().with_verify_body(&tx_ref, confirmed_body(json!(100))));
        let store = Arc::new(MemoryPaymentStore::new());
        let service = service(gateway, store.clone());

        let first = service.handle_callback(&tx_ref).await;
        let second = service.handle_callback(&tx_ref).await;

        let CallbackOutcome::Recorded(recorded) = first else {
            panic!("first callback should record, got {first:?}");
        };
        assert_eq!(second, CallbackOutcome::AlreadyRecorded(recorded));
        assert!(second.is_success());
        assert_eq!(store.count().await.unwrap(), 1);
    }

    struct BrokenStore;

    #[async_trait]
    impl PaymentStore for BrokenStore {
        async fn insert(&self, _record: &PaymentRecord) -> Result<InsertOutcome> {
            Err(PaymentError::Storage("database is locked".into()))
        }

        async fn get(&self, _tx_ref: &TxRef) -> Result<Option<PaymentRecord>> {
            Ok(None)
        }

        async fn count(&self) -> Result<u64> {
            Ok(0)
        }

        fn backend(&self) -> &str {
            "broken"
        }
    }

    #[tokio::test]
    async fn test_persistence_failure_redirects_to_failure() {
        let tx_ref = TxRef::from_string("txn_1700000000");
        let gateway =
            Arc::new(MockGateway::new().with_verify_body(&tx_ref, confirmed_body(json!(100))));
        let service = service(gateway, Arc::new(BrokenStore));

        let outcome = service.handle_callback(&tx_ref).await;
        assert_eq!(
            outcome,
            CallbackOutcome::Failed(CallbackFailure::Persistence("database is locked".into()))
        );
        assert_eq!(outcome.redirect_url(service.config()), "http://localhost:5173/fail");
    }

    #[tokio::test]
    async fn test_unsafe_reference_never_reaches_gateway() {
        let gateway = Arc::new(MockGateway::new());
        let service = service(gateway.clone(), Arc::new(MemoryPaymentStore::new()));

        for hostile in ["..", ".", "abc/def", "txn 1"] {
            let outcome = service.handle_callback(&TxRef::from_string(hostile)).await;
            assert_eq!(
                outcome,
                CallbackOutcome::Failed(CallbackFailure::InvalidReference(hostile.into()))
            );
            assert_eq!(outcome.redirect_url(service.config()), "http://localhost:5173/fail");
        }
        assert!(gateway.verify_calls().await.is_empty());
    }

    struct MisconfiguredGateway;

    #[async_trait]
    impl PaymentGateway for MisconfiguredGateway {
        async fn initialize(&self, _request: &InitializeRequest) -> Result<GatewayReply> {
            Err(PaymentError::Config("gateway base URL cannot be a base".into()))
        }

        async fn verify(&self, _tx_ref: &TxRef) -> Result<GatewayReply> {
            Err(PaymentError::Config("gateway base URL cannot be a base".into()))
        }

        fn name(&self) -> &str {
            "misconfigured"
        }
    }

    #[tokio::test]
    async fn test_config_fault_is_not_reported_as_network_fault() {
        let service = PaymentService::new(
            Arc::new(MisconfiguredGateway),
            Arc::new(MemoryPaymentStore::new()),
            PaymentConfig::with_defaults("CHASECK_TEST-k"),
        );

        let outcome = service.handle_callback(&TxRef::from_string("txn_1")).await;
        let CallbackOutcome::Failed(failure) = &outcome else {
            panic!("expected failure, got {outcome:?}");
        };
        assert_eq!(failure.kind(), "config");
        assert_ne!(failure.kind(), CallbackFailure::GatewayUnreachable(String::new()).kind());
        assert_eq!(outcome.redirect_url(service.config()), "http://localhost:5173/fail");
    }

    /// Formatted log output shared with the subscriber under test
    #[derive(Clone, Default)]
    struct CapturedLogs(Arc<std::sync::Mutex<Vec<u8>>>);

    impl CapturedLogs {
        fn contents(&self) -> String {
            String::from_utf8_lossy(&self.0.lock().unwrap()).into_owned()
        }
    }

    impl std::io::Write for CapturedLogs {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    impl<'a> tracing_subscriber::fmt::MakeWriter<'a> for CapturedLogs {
        type Writer = Self;

        fn make_writer(&'a self) -> Self::Writer {
            self.clone()
        }
    }

    #[tokio::test]
    async fn test_network_error_is_logged_with_failure_kind() {
        let logs = CapturedLogs::default();
        let subscriber = tracing_subscriber::fmt()
            .with_writer(logs.clone())
            .with_ansi(false)
            .finish();
        let _guard = tracing::subscriber::set_default(subscriber);

        let tx_ref = TxRef::from_string("txn_net");
        let gateway =
            Arc::new(MockGateway::new().with_verify_unreachable(&tx_ref, "connection reset"));
        let service = service(gateway, Arc::new(MemoryPaymentStore::new()));
        service.handle_callback(&tx_ref).await;

        let output = logs.contents();
        let line = output
            .lines()
            .find(|line| line.contains("Payment callback failed"))
            .unwrap_or_else(|| panic!("no callback failure event in:\n{output}"));
        assert!(line.contains("ERROR"), "{line}");
        assert!(line.contains(r#"failure="gateway_unreachable""#), "{line}");
        assert!(line.contains("txn_net"), "{line}");
        assert!(line.contains("connection reset"), "{line}");
    }
}
