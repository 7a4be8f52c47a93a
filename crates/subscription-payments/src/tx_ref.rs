//! Transaction References

use serde::{Deserialize, Serialize};

/// Correlates an initialization with its later callback (formatted: `txn_<32 hex>`)
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TxRef(String);

impl TxRef {
    pub const PREFIX: &'static str = "txn_";

    /// Generate a new random reference
    pub fn generate() -> Self {
        let id = uuid::Uuid::new_v4();
        Self(format!("{}{}", Self::PREFIX, id.simple()))
    }

    /// Wrap a reference received from the gateway
    pub fn from_string(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Safe to place in a URL path: ASCII letters, digits, `_`, `.` and `-`,
    /// and not a dot segment
    pub fn is_well_formed(&self) -> bool {
        !matches!(self.0.as_str(), "" | "." | "..")
            && self
                .0
                .bytes()
                .all(|b| b.is_ascii_alphanumeric() || matches!(b, b'_' | b'.' | b'-'))
    }
}

impl std::fmt::Display for TxRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}
