//! Provider backed plugin families (payment, delivery, warehousing).
//!
//! A provider names an adapter by key and carries the settings for it. The
//! provider director resolves that pair and reports what is missing before
//! anything is executed.

use std::sync::Arc;

use crate::domain::aggregates::Provider;
use crate::registry::{Adapter, AdapterRegistry};
use crate::{EngineError, Result};

pub trait ProviderAdapter: Adapter {
    /// Reports settings the adapter needs but `provider` does not carry.
    fn configuration_error(&self, _provider: &Provider) -> Option<EngineError> {
        None
    }
}

pub struct ProviderDirector<A: ProviderAdapter + ?Sized> {
    registry: Arc<AdapterRegistry<A>>,
}

impl<A: ProviderAdapter + ?Sized> ProviderDirector<A> {
    pub fn new(registry: Arc<AdapterRegistry<A>>) -> Self {
        Self { registry }
    }

    pub fn actions(&self, provider: &Provider) -> ProviderActions<A> {
        ProviderActions {
            error: match self.registry.get_by_key(&provider.adapter_key) {
                Some(adapter) => adapter.configuration_error(provider).map_or(Ok(adapter), Err),
                None => Err(EngineError::AdapterNotFound {
                    family: self.registry.family(),
                    key: provider.adapter_key.clone(),
                }),
            },
        }
    }
}

/// A provider resolved against its family's registry.
pub struct ProviderActions<A: ?Sized> {
    error: Result<Arc<A>>,
}

impl<A: ?Sized> ProviderActions<A> {
    pub fn configuration_error(&self) -> Option<&EngineError> {
        self.error.as_ref().err()
    }

    pub fn is_active(&self) -> bool {
        self.error.is_ok()
    }

    /// The adapter, or the reason it cannot be used.
    pub fn adapter(&self) -> Result<Arc<A>> {
        self.error.clone()
    }
}
