//! Plugin families and bootstrap.
//!
//! `Plugins` owns one registry per family. `bootstrap` fills them with the
//! built-in adapters once at startup; afterwards they are only read.

pub mod delivery;
pub mod filter;
pub mod messaging;
pub mod payment;
pub mod provider;
pub mod warehousing;
pub mod worker;

use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tracing::info;

use crate::config::EngineConfig;
use crate::domain::aggregates::Provider;
use crate::pricing::adapters::{
    CatalogPrice, DeliveryFee, OrderDeliveryFee, OrderDiscount, OrderItems, OrderPaymentFee, PaymentFee, VatTax,
};
use crate::pricing::{
    DeliveryPricingContext, OrderPricingContext, PaymentPricingContext, PricingDirector, PricingRegistry,
    ProductPricingContext, RowCategory,
};
use crate::registry::{AdapterDescriptor, AdapterRegistry, PluginFamily};
use crate::{EngineError, Result};

pub use delivery::DeliveryAdapter;
pub use filter::FilterAdapter;
pub use messaging::MessagingAdapter;
pub use payment::PaymentAdapter;
pub use provider::{ProviderActions, ProviderAdapter, ProviderDirector};
pub use warehousing::WarehousingAdapter;
pub use worker::WorkerAdapter;

/// Descriptor of one registered adapter plus what it still needs.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PluginInfo {
    pub family: PluginFamily,
    #[serde(flatten)]
    pub descriptor: AdapterDescriptor,
    /// For provider families this is checked against an unconfigured provider.
    pub configuration_error: Option<String>,
}

pub struct Plugins {
    pub payment: Arc<AdapterRegistry<dyn PaymentAdapter>>,
    pub delivery: Arc<AdapterRegistry<dyn DeliveryAdapter>>,
    pub warehousing: Arc<AdapterRegistry<dyn WarehousingAdapter>>,
    pub filter: Arc<AdapterRegistry<dyn FilterAdapter>>,
    pub messaging: Arc<AdapterRegistry<dyn MessagingAdapter>>,
    pub worker: Arc<AdapterRegistry<dyn WorkerAdapter>>,
    pub product_pricing: Arc<PricingRegistry<ProductPricingContext>>,
    pub delivery_pricing: Arc<PricingRegistry<DeliveryPricingContext>>,
    pub payment_pricing: Arc<PricingRegistry<PaymentPricingContext>>,
    pub order_pricing: Arc<PricingRegistry<OrderPricingContext>>,
    adapter_timeout: Duration,
}

impl Plugins {
    /// Empty registries.
    pub fn new(adapter_timeout: Duration) -> Self {
        Self {
            payment: Arc::new(AdapterRegistry::new(PluginFamily::Payment)),
            delivery: Arc::new(AdapterRegistry::new(PluginFamily::Delivery)),
            warehousing: Arc::new(AdapterRegistry::new(PluginFamily::Warehousing)),
            filter: Arc::new(AdapterRegistry::new(PluginFamily::Filter)),
            messaging: Arc::new(AdapterRegistry::new(PluginFamily::Messaging)),
            worker: Arc::new(AdapterRegistry::new(PluginFamily::Worker)),
            product_pricing: Arc::new(AdapterRegistry::new(PluginFamily::ProductPricing)),
            delivery_pricing: Arc::new(AdapterRegistry::new(PluginFamily::DeliveryPricing)),
            payment_pricing: Arc::new(AdapterRegistry::new(PluginFamily::PaymentPricing)),
            order_pricing: Arc::new(AdapterRegistry::new(PluginFamily::OrderPricing)),
            adapter_timeout,
        }
    }

    /// Registries holding every built-in adapter.
    pub fn bootstrap(config: &EngineConfig) -> Self {
        let plugins = Self::new(config.adapter_timeout);
        let vat_rates = Arc::new(config.vat_rates.clone());

        plugins.payment.register(Arc::new(payment::Invoice));
        plugins.payment.register(Arc::new(payment::Prepayment));

        plugins.delivery.register(Arc::new(delivery::Post));
        plugins.delivery.register(Arc::new(delivery::Pickup));

        plugins.warehousing.register(Arc::new(warehousing::StaticStock::new(config.warehouse_default_stock)));

        plugins.filter.register(Arc::new(filter::ActiveProducts));
        plugins.filter.register(Arc::new(filter::TextSearch));

        plugins.messaging.register(Arc::new(messaging::LogMessaging));
        plugins.messaging.register(Arc::new(messaging::NatsMessaging::new(config.nats_url.clone())));

        plugins.worker.register(Arc::new(worker::Heartbeat));

        plugins.product_pricing.register(Arc::new(CatalogPrice));
        plugins.product_pricing.register(Arc::new(VatTax::new(RowCategory::Item, vat_rates.clone())));

        plugins.delivery_pricing.register(Arc::new(DeliveryFee));
        plugins.delivery_pricing.register(Arc::new(VatTax::new(RowCategory::Delivery, vat_rates.clone())));

        plugins.payment_pricing.register(Arc::new(PaymentFee));
        plugins.payment_pricing.register(Arc::new(VatTax::new(RowCategory::Payment, vat_rates)));

        plugins.order_pricing.register(Arc::new(OrderItems));
        plugins.order_pricing.register(Arc::new(OrderDeliveryFee));
        plugins.order_pricing.register(Arc::new(OrderPaymentFee));
        plugins.order_pricing.register(Arc::new(OrderDiscount));

        let registered: usize = PluginFamily::ALL.iter().map(|family| plugins.descriptors(*family).len()).sum();
        info!(adapters = registered, timeout_ms = config.adapter_timeout.as_millis() as u64, "plugins bootstrapped");
        plugins
    }

    pub fn product_director(&self) -> PricingDirector<ProductPricingContext> {
        PricingDirector::new(self.product_pricing.clone(), self.adapter_timeout)
    }

    pub fn delivery_director(&self) -> PricingDirector<DeliveryPricingContext> {
        PricingDirector::new(self.delivery_pricing.clone(), self.adapter_timeout)
    }

    pub fn payment_director(&self) -> PricingDirector<PaymentPricingContext> {
        PricingDirector::new(self.payment_pricing.clone(), self.adapter_timeout)
    }

    pub fn order_director(&self) -> PricingDirector<OrderPricingContext> {
        PricingDirector::new(self.order_pricing.clone(), self.adapter_timeout)
    }

    pub fn payment_providers(&self) -> ProviderDirector<dyn PaymentAdapter> {
        ProviderDirector::new(self.payment.clone())
    }

    pub fn delivery_providers(&self) -> ProviderDirector<dyn DeliveryAdapter> {
        ProviderDirector::new(self.delivery.clone())
    }

    pub fn warehousing_providers(&self) -> ProviderDirector<dyn WarehousingAdapter> {
        ProviderDirector::new(self.warehousing.clone())
    }

    pub fn descriptors(&self, family: PluginFamily) -> Vec<AdapterDescriptor> {
        match family {
            PluginFamily::Payment => self.payment.descriptors(),
            PluginFamily::Delivery => self.delivery.descriptors(),
            PluginFamily::Warehousing => self.warehousing.descriptors(),
            PluginFamily::Filter => self.filter.descriptors(),
            PluginFamily::Messaging => self.messaging.descriptors(),
            PluginFamily::Worker => self.worker.descriptors(),
            PluginFamily::ProductPricing => self.product_pricing.descriptors(),
            PluginFamily::DeliveryPricing => self.delivery_pricing.descriptors(),
            PluginFamily::PaymentPricing => self.payment_pricing.descriptors(),
            PluginFamily::OrderPricing => self.order_pricing.descriptors(),
        }
    }

    /// Every registered adapter, grouped by family.
    pub fn list(&self) -> Vec<PluginInfo> {
        PluginFamily::ALL
            .into_iter()
            .flat_map(|family| {
                self.descriptors(family)
                    .into_iter()
                    .map(move |descriptor| (family, descriptor))
            })
            .map(|(family, descriptor)| {
                let configuration_error = self.configuration_error(family, &descriptor.key).map(|e| e.to_string());
                PluginInfo { family, descriptor, configuration_error }
            })
            .collect()
    }

    pub fn inspect(&self, family: PluginFamily, key: &str) -> Result<PluginInfo> {
        let descriptor = self
            .descriptors(family)
            .into_iter()
            .find(|descriptor| descriptor.key == key)
            .ok_or_else(|| EngineError::AdapterNotFound { family, key: key.to_string() })?;
        Ok(PluginInfo { family, configuration_error: self.configuration_error(family, key).map(|e| e.to_string()), descriptor })
    }

    fn configuration_error(&self, family: PluginFamily, key: &str) -> Option<EngineError> {
        let unconfigured = Provider::new(key);
        match family {
            PluginFamily::Payment => self.payment_providers().actions(&unconfigured).configuration_error().cloned(),
            PluginFamily::Delivery => self.delivery_providers().actions(&unconfigured).configuration_error().cloned(),
            PluginFamily::Warehousing => self.warehousing_providers().actions(&unconfigured).configuration_error().cloned(),
            PluginFamily::Messaging => self.messaging.get_by_key(key).and_then(|adapter| adapter.configuration_error()),
            _ => None,
        }
    }
}
