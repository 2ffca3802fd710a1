//! Warehousing plugins.

use std::collections::BTreeMap;

use async_trait::async_trait;
use serde::Deserialize;

use super::provider::ProviderAdapter;
use crate::domain::aggregates::Provider;
use crate::domain::value_objects::Sku;
use crate::registry::Adapter;
use crate::Result;

pub const STATIC_STOCK_KEY: &str = "opensase.warehousing.static";

#[async_trait]
pub trait WarehousingAdapter: ProviderAdapter {
    /// Units of `sku` available for sale.
    async fn stock(&self, provider: &Provider, sku: &Sku) -> Result<u32>;
}

#[derive(Debug, Default, Deserialize)]
struct StaticStockSettings {
    #[serde(default)]
    stock: BTreeMap<String, u32>,
}

/// Stock levels maintained by hand in the provider configuration.
pub struct StaticStock {
    default_stock: u32,
}

impl StaticStock {
    pub fn new(default_stock: u32) -> Self {
        Self { default_stock }
    }
}

impl Adapter for StaticStock {
    fn key(&self) -> &str { STATIC_STOCK_KEY }
    fn label(&self) -> &str { "Static Stock" }
    fn version(&self) -> &str { "1.0.0" }
}

impl ProviderAdapter for StaticStock {}

#[async_trait]
impl WarehousingAdapter for StaticStock {
    async fn stock(&self, provider: &Provider, sku: &Sku) -> Result<u32> {
        let settings: StaticStockSettings = provider.settings()?;
        Ok(settings.stock.get(sku.as_str()).copied().unwrap_or(self.default_stock))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_per_sku_override_and_default() {
        let provider = Provider::new(STATIC_STOCK_KEY).with_setting("stock", json!({ "TEA-001": 12 }));
        let adapter = StaticStock::new(3);

        assert_eq!(adapter.stock(&provider, &Sku::new("tea-001").unwrap()).await.unwrap(), 12);
        assert_eq!(adapter.stock(&provider, &Sku::new("COFFEE").unwrap()).await.unwrap(), 3);
    }
}
