//! Session configuration.

use serde::{Deserialize, Serialize};

/// Configuration applied when a session is created.
///
/// Pooled sessions ignore it: their settings live in the pooled delegate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Whether a second explicit transaction may be started while one is active.
    pub allow_multiple_transactions: bool,
    /// Whether column names are reported in upper case.
    pub uppercase_column_names: bool,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            allow_multiple_transactions: true,
            uppercase_column_names: false,
        }
    }
}

impl SessionConfig {
    /// Create the default configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the multiple-transaction policy (builder pattern).
    #[must_use]
    pub fn allow_multiple_transactions(mut self, allow: bool) -> Self {
        self.allow_multiple_transactions = allow;
        self
    }

    /// Set column-name casing (builder pattern).
    #[must_use]
    pub fn uppercase_column_names(mut self, upper: bool) -> Self {
        self.uppercase_column_names = upper;
        self
    }
}
