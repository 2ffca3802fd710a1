//! Adapter registry shared by every plugin family.
//!
//! Each family (payment, delivery, pricing, ...) owns one `AdapterRegistry`.
//! Registries are filled during plugin bootstrap, before the HTTP listener
//! starts, and are only read afterwards. Lookups never filter by activation;
//! that is left to the directors, which may need request-scoped context.

use std::fmt;
use std::str::FromStr;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::EngineError;

/// Descriptor contract implemented by every adapter.
pub trait Adapter: Send + Sync + 'static {
    /// Unique key within the adapter's family.
    fn key(&self) -> &str;

    fn label(&self) -> &str;

    fn version(&self) -> &str;

    /// Execution priority, ascending.
    fn order_index(&self) -> i32 {
        0
    }
}

/// Serializable snapshot of an adapter's descriptor fields.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdapterDescriptor {
    pub key: String,
    pub label: String,
    pub version: String,
    pub order_index: i32,
}

impl AdapterDescriptor {
    pub fn of<A: Adapter + ?Sized>(adapter: &A) -> Self {
        Self {
            key: adapter.key().to_string(),
            label: adapter.label().to_string(),
            version: adapter.version().to_string(),
            order_index: adapter.order_index(),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PluginFamily {
    Payment,
    Delivery,
    Warehousing,
    Filter,
    Messaging,
    Worker,
    ProductPricing,
    OrderPricing,
    DeliveryPricing,
    PaymentPricing,
}

impl PluginFamily {
    pub const ALL: [PluginFamily; 10] = [
        PluginFamily::Payment,
        PluginFamily::Delivery,
        PluginFamily::Warehousing,
        PluginFamily::Filter,
        PluginFamily::Messaging,
        PluginFamily::Worker,
        PluginFamily::ProductPricing,
        PluginFamily::OrderPricing,
        PluginFamily::DeliveryPricing,
        PluginFamily::PaymentPricing,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            PluginFamily::Payment => "payment",
            PluginFamily::Delivery => "delivery",
            PluginFamily::Warehousing => "warehousing",
            PluginFamily::Filter => "filter",
            PluginFamily::Messaging => "messaging",
            PluginFamily::Worker => "worker",
            PluginFamily::ProductPricing => "product-pricing",
            PluginFamily::OrderPricing => "order-pricing",
            PluginFamily::DeliveryPricing => "delivery-pricing",
            PluginFamily::PaymentPricing => "payment-pricing",
        }
    }
}

impl fmt::Display for PluginFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PluginFamily {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        PluginFamily::ALL
            .into_iter()
            .find(|family| family.as_str() == s)
            .ok_or_else(|| EngineError::Validation(format!("unknown plugin family: {s}")))
    }
}

/// Keyed store of adapters for one plugin family.
///
/// Entries keep their registration order; `list` sorts them by
/// `order_index` with a stable sort so equal priorities run in the order
/// they were registered.
pub struct AdapterRegistry<A: ?Sized> {
    family: PluginFamily,
    adapters: RwLock<Vec<Arc<A>>>,
}

impl<A: Adapter + ?Sized> AdapterRegistry<A> {
    pub fn new(family: PluginFamily) -> Self {
        Self { family, adapters: RwLock::new(Vec::new()) }
    }

    pub fn family(&self) -> PluginFamily {
        self.family
    }

    /// Stores an adapter under its key.
    ///
    /// Registering a key twice replaces the earlier adapter in place (last
    /// write wins) and returns the replaced one.
    pub fn register(&self, adapter: Arc<A>) -> Option<Arc<A>> {
        let mut adapters = self.write();
        if let Some(slot) = adapters.iter_mut().find(|existing| existing.key() == adapter.key()) {
            warn!(
                family = %self.family,
                adapter = adapter.key(),
                "adapter key already registered, replacing previous entry"
            );
            return Some(std::mem::replace(slot, adapter));
        }
        debug!(family = %self.family, adapter = adapter.key(), order_index = adapter.order_index(), "adapter registered");
        adapters.push(adapter);
        None
    }

    /// All adapters sorted ascending by `order_index`.
    pub fn list(&self) -> Vec<Arc<A>> {
        self.list_filtered(|_| true)
    }

    pub fn list_filtered(&self, predicate: impl Fn(&A) -> bool) -> Vec<Arc<A>> {
        let mut adapters: Vec<Arc<A>> = self
            .read()
            .iter()
            .filter(|adapter| predicate(&***adapter))
            .cloned()
            .collect();
        adapters.sort_by_key(|adapter| adapter.order_index());
        adapters
    }

    pub fn get_by_key(&self, key: &str) -> Option<Arc<A>> {
        self.read().iter().find(|adapter| adapter.key() == key).cloned()
    }

    /// Like `get_by_key`, but reports absence as `AdapterNotFound`.
    pub fn require(&self, key: &str) -> crate::Result<Arc<A>> {
        self.get_by_key(key)
            .ok_or_else(|| EngineError::AdapterNotFound { family: self.family, key: key.to_string() })
    }

    pub fn descriptors(&self) -> Vec<AdapterDescriptor> {
        self.list().iter().map(|adapter| AdapterDescriptor::of(&**adapter)).collect()
    }

    pub fn len(&self) -> usize {
        self.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }

    /// Drops every registration. Only meant for test isolation.
    pub fn reset(&self) {
        self.write().clear();
    }

    fn read(&self) -> RwLockReadGuard<'_, Vec<Arc<A>>> {
        self.adapters.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, Vec<Arc<A>>> {
        self.adapters.write().unwrap_or_else(PoisonError::into_inner)
    }
}
