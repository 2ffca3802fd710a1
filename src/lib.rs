//! OpenSASE Pricing Engine
//!
//! Plugin adapter pipeline and price calculation core of the OpenSASE
//! commerce backend.
//!
//! ## Features
//! - Per-family adapter registries (payment, delivery, warehousing, filter,
//!   messaging, worker, pricing)
//! - Pricing directors folding ordered adapter chains over a ledger
//! - Append-only pricing sheets with gross/net/tax aggregation
//! - Proportional, tax-aware distribution of order discounts
//! - Checkout workflow pricing positions, delivery, payment and order

pub mod api;
pub mod checkout;
pub mod config;
pub mod domain;
pub mod plugins;
pub mod pricing;
pub mod registry;

use std::time::Duration;
use thiserror::Error;

pub use checkout::{price_order, OrderPricing};
pub use config::EngineConfig;
pub use plugins::Plugins;
pub use pricing::{CalculationRow, PricingDirector, PricingSheet, RowCategory};
pub use registry::{Adapter, AdapterDescriptor, AdapterRegistry, PluginFamily};

// =============================================================================
// Error Types
// =============================================================================

#[derive(Error, Debug, Clone, PartialEq)]
pub enum EngineError {
    #[error("Adapter not found: {family}/{key}")]
    AdapterNotFound { family: PluginFamily, key: String },

    #[error("Adapter {key} is not configured: {message}")]
    Configuration { key: String, message: String },

    #[error("Adapter {key} failed: {message}")]
    AdapterExecution { key: String, message: String },

    #[error("Adapter {key} timed out after {duration:?}")]
    Timeout { key: String, duration: Duration },

    #[error("Currency mismatch: expected {expected}, got {got}")]
    CurrencyMismatch { expected: String, got: String },

    #[error("Invalid currency code: {0}")]
    InvalidCurrency(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl EngineError {
    pub fn configuration(key: &str, message: impl Into<String>) -> Self {
        Self::Configuration { key: key.to_string(), message: message.into() }
    }

    pub fn execution(key: &str, message: impl Into<String>) -> Self {
        Self::AdapterExecution { key: key.to_string(), message: message.into() }
    }

    /// True for the conditions a plugin admin screen reports as "needs setup".
    pub fn is_configuration_issue(&self) -> bool {
        matches!(self, Self::AdapterNotFound { .. } | Self::Configuration { .. })
    }
}

impl From<serde_json::Error> for EngineError {
    fn from(e: serde_json::Error) -> Self {
        EngineError::Serialization(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, EngineError>;
