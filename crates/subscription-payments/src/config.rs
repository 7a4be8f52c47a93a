//! Payment Configuration
//!
//! Everything the payment flow needs from its environment, resolved once at
//! startup and handed to [`PaymentService`](crate::PaymentService).

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use crate::error::{PaymentError, Result};

/// Chapa API base URL
pub const DEFAULT_API_BASE_URL: &str = "https://api.chapa.co/v1";

/// Gateway bearer token. Never printed.
#[derive(Clone, PartialEq, Eq)]
pub struct SecretKey(String);

impl SecretKey {
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    /// Raw token, for the `Authorization` header only
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for SecretKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SecretKey(***)")
    }
}

impl fmt::Display for SecretKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("***")
    }
}

/// The fixed amount charged for a subscription
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Charge {
    pub amount: Decimal,
    pub currency: String,
}

impl Default for Charge {
    fn default() -> Self {
        Self {
            amount: dec!(100),
            currency: "ETB".into(),
        }
    }
}

/// Payment flow configuration
#[derive(Clone, Debug)]
pub struct PaymentConfig {
    /// Gateway secret key (bearer token)
    pub secret_key: SecretKey,

    /// Gateway API base, e.g. `https://api.chapa.co/v1`
    pub api_base_url: String,

    /// Server endpoint the gateway calls when a transaction completes
    pub callback_url: String,

    /// Where the gateway sends the browser after checkout
    pub return_url: String,

    /// Redirect target after a verified payment
    pub success_redirect_url: String,

    /// Redirect target for every other callback outcome
    pub failure_redirect_url: String,

    /// Amount and currency sent on every initialization
    pub charge: Charge,

    /// Email sent to the gateway; the checkout form does not collect one
    pub payer_email: String,

    /// Last name sent to the gateway; the checkout form does not collect one
    pub payer_last_name: String,

    /// Total time allowed for one gateway request
    pub request_timeout: Duration,

    /// Time allowed to establish a gateway connection
    pub connect_timeout: Duration,
}

impl PaymentConfig {
    /// Local development defaults around a given secret key
    pub fn with_defaults(secret_key: impl Into<String>) -> Self {
        let app_url = "http://localhost:8000";
        let frontend_url = "http://localhost:5173";

        Self {
            secret_key: SecretKey::new(secret_key),
            api_base_url: DEFAULT_API_BASE_URL.into(),
            callback_url: format!("{app_url}/api/payment/callback"),
            return_url: format!("{frontend_url}/success"),
            success_redirect_url: format!("{frontend_url}/success"),
            failure_redirect_url: format!("{frontend_url}/fail"),
            charge: Charge::default(),
            payer_email: "test@gmail.com".into(),
            payer_last_name: "User".into(),
            request_timeout: Duration::from_secs(30),
            connect_timeout: Duration::from_secs(10),
        }
    }

    /// Create from environment variables
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Create from an arbitrary key/value source
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let secret_key = get("CHAPA_SECRET_KEY")
            .ok_or_else(|| PaymentError::Config("CHAPA_SECRET_KEY not set".into()))?;
        let mut config = Self::with_defaults(secret_key);

        if let Some(base) = get("CHAPA_BASE_URL") {
            config.api_base_url = trim_slash(&base);
        }

        let app_url =
            get("APP_URL").map_or_else(|| "http://localhost:8000".into(), |v| trim_slash(&v));
        let frontend_url =
            get("FRONTEND_URL").map_or_else(|| "http://localhost:5173".into(), |v| trim_slash(&v));

        config.callback_url =
            get("CHAPA_CALLBACK_URL").unwrap_or_else(|| format!("{app_url}/api/payment/callback"));
        config.return_url =
            get("CHAPA_RETURN_URL").unwrap_or_else(|| format!("{frontend_url}/success"));
        config.success_redirect_url =
            get("SUCCESS_REDIRECT_URL").unwrap_or_else(|| format!("{frontend_url}/success"));
        config.failure_redirect_url =
            get("FAILURE_REDIRECT_URL").unwrap_or_else(|| format!("{frontend_url}/fail"));

        if let Some(amount) = get("SUBSCRIPTION_AMOUNT") {
            let amount = Decimal::from_str(&amount)
                .map_err(|e| PaymentError::Config(format!("SUBSCRIPTION_AMOUNT: {e}")))?;
            if amount <= Decimal::ZERO {
                return Err(PaymentError::Config("SUBSCRIPTION_AMOUNT must be positive".into()));
            }
            config.charge.amount = amount;
        }
        if let Some(currency) = get("SUBSCRIPTION_CURRENCY") {
            config.charge.currency = currency.to_uppercase();
        }
        if let Some(email) = get("CHECKOUT_EMAIL") {
            config.payer_email = email;
        }
        if let Some(last_name) = get("CHECKOUT_LAST_NAME") {
            config.payer_last_name = last_name;
        }
        if let Some(secs) = get("GATEWAY_TIMEOUT_SECS") {
            let secs: u64 = secs
                .parse()
                .map_err(|e| PaymentError::Config(format!("GATEWAY_TIMEOUT_SECS: {e}")))?;
            if secs == 0 {
                return Err(PaymentError::Config("GATEWAY_TIMEOUT_SECS must be at least 1".into()));
            }
            config.request_timeout = Duration::from_secs(secs);
        }

        Ok(config)
    }
}

fn trim_slash(url: &str) -> String {
    url.trim_end_matches('/').to_string()
}
