//! # subscription-payments
//!
//! Fixed-fee subscription payments through the Chapa hosted checkout.
//!
//! ## Flow
//!
//! ```text
//! ┌──────────┐  initialize  ┌──────────────┐  checkout  ┌──────────────┐
//! │  Client  │─────────────▶│ PaymentSvc   │───────────▶│ Chapa hosted │
//! │ (form)   │◀─────────────│ (tx_ref)     │            │ checkout     │
//! └──────────┘ checkout_url └──────────────┘            └──────┬───────┘
//!       ▲                          ▲  verify                   │ callback
//!       │ redirect success/fail    └───────────────────────────┘
//! ```
//!
//! A record is written only after the gateway independently confirms the
//! transaction, and the stored amount is the one the gateway reports.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use subscription_payments::{
//!     ChapaClient, MemoryPaymentStore, Payer, PaymentConfig, PaymentService,
//! };
//!
//! let config = PaymentConfig::from_env()?;
//! let gateway = Arc::new(ChapaClient::new(&config)?);
//! let service = PaymentService::new(gateway, Arc::new(MemoryPaymentStore::new()), config);
//!
//! let payer = Payer { name: "Abel".into(), phone: "+251911111111".into() };
//! let init = service.initialize(payer).await?;
//! // Send the browser to: init.reply.checkout_url()
//!
//! // Later, when the gateway calls back:
//! let outcome = service.handle_callback(&init.tx_ref).await;
//! let target = outcome.redirect_url(service.config());
//! ```

mod config;
mod error;
pub mod gateway;
mod record;
mod service;
pub mod store;
mod tx_ref;
mod verification;

pub use config::{Charge, PaymentConfig, SecretKey, DEFAULT_API_BASE_URL};
pub use error::{PaymentError, Result};
pub use gateway::{ChapaClient, GatewayReply, InitializeRequest, MockGateway, PaymentGateway};
pub use record::{PaymentRecord, PaymentStatus};
pub use service::{CallbackFailure, CallbackOutcome, Initialization, Payer, PaymentService};
#[cfg(feature = "sqlite")]
pub use store::SqlitePaymentStore;
pub use store::{InsertOutcome, MemoryPaymentStore, PaymentStore};
pub use tx_ref::TxRef;
pub use verification::{VerificationOutcome, VerifiedPayment};

/// Re-exported so callers can match on forwarded gateway statuses
pub use reqwest::StatusCode;
