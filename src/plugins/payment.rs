//! Payment plugins.

use async_trait::async_trait;
use serde::Serialize;
use tracing::info;
use uuid::Uuid;

use super::provider::ProviderAdapter;
use crate::domain::aggregates::Provider;
use crate::domain::value_objects::Money;
use crate::registry::Adapter;
use crate::{EngineError, Result};

pub const INVOICE_KEY: &str = "opensase.payment.invoice";
pub const PREPAYMENT_KEY: &str = "opensase.payment.prepayment";

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "camelCase")]
pub enum ChargeOutcome {
    Paid { transaction_id: String },
    /// Money is expected later, e.g. by bank transfer.
    Pending { reference: String, instructions: Option<String> },
}

#[async_trait]
pub trait PaymentAdapter: ProviderAdapter {
    async fn charge(&self, provider: &Provider, order_id: &str, amount: &Money) -> Result<ChargeOutcome>;
}

/// Pay on invoice. Nothing is collected at checkout.
pub struct Invoice;

impl Adapter for Invoice {
    fn key(&self) -> &str { INVOICE_KEY }
    fn label(&self) -> &str { "Invoice" }
    fn version(&self) -> &str { "1.0.0" }
}

impl ProviderAdapter for Invoice {}

#[async_trait]
impl PaymentAdapter for Invoice {
    async fn charge(&self, _provider: &Provider, order_id: &str, amount: &Money) -> Result<ChargeOutcome> {
        info!(order_id, amount = %amount.amount(), currency = amount.currency(), "invoice issued");
        Ok(ChargeOutcome::Pending { reference: format!("INV-{order_id}"), instructions: None })
    }
}

/// Bank transfer before delivery; needs the shop's IBAN.
pub struct Prepayment;

impl Adapter for Prepayment {
    fn key(&self) -> &str { PREPAYMENT_KEY }
    fn label(&self) -> &str { "Prepayment" }
    fn version(&self) -> &str { "1.0.0" }
}

impl ProviderAdapter for Prepayment {
    fn configuration_error(&self, provider: &Provider) -> Option<EngineError> {
        provider
            .setting_str("iban")
            .is_none()
            .then(|| EngineError::configuration(self.key(), "iban is not set"))
    }
}

#[async_trait]
impl PaymentAdapter for Prepayment {
    async fn charge(&self, provider: &Provider, order_id: &str, amount: &Money) -> Result<ChargeOutcome> {
        let iban = provider
            .setting_str("iban")
            .ok_or_else(|| EngineError::configuration(self.key(), "iban is not set"))?;
        let reference = format!("PRE-{}", Uuid::new_v4().simple());
        info!(order_id, reference = %reference, "awaiting prepayment");
        Ok(ChargeOutcome::Pending {
            instructions: Some(format!("Transfer {} {} to {iban} quoting {reference}", amount.amount(), amount.currency())),
            reference,
        })
    }
}
