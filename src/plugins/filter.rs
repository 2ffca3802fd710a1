//! Product search filters.
//!
//! Filters run as a chain in `order_index` order, each narrowing the list
//! the previous one returned. A failing filter is skipped.

use async_trait::async_trait;
use serde::Deserialize;
use tracing::{debug, error};

use crate::domain::aggregates::Product;
use crate::registry::{Adapter, AdapterRegistry};
use crate::Result;

pub const ACTIVE_PRODUCTS_KEY: &str = "opensase.filter.active-products";
pub const TEXT_SEARCH_KEY: &str = "opensase.filter.text-search";

#[derive(Clone, Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FilterQuery {
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub include_inactive: bool,
}

#[async_trait]
pub trait FilterAdapter: Adapter {
    async fn is_activated_for(&self, _query: &FilterQuery) -> Result<bool> {
        Ok(true)
    }

    async fn apply(&self, query: &FilterQuery, products: Vec<Product>) -> Result<Vec<Product>>;
}

pub struct ActiveProducts;

impl Adapter for ActiveProducts {
    fn key(&self) -> &str { ACTIVE_PRODUCTS_KEY }
    fn label(&self) -> &str { "Active Products" }
    fn version(&self) -> &str { "1.0.0" }
}

#[async_trait]
impl FilterAdapter for ActiveProducts {
    async fn is_activated_for(&self, query: &FilterQuery) -> Result<bool> {
        Ok(!query.include_inactive)
    }

    async fn apply(&self, _query: &FilterQuery, products: Vec<Product>) -> Result<Vec<Product>> {
        Ok(products.into_iter().filter(Product::is_active).collect())
    }
}

/// Case-insensitive match on name and SKU.
pub struct TextSearch;

impl Adapter for TextSearch {
    fn key(&self) -> &str { TEXT_SEARCH_KEY }
    fn label(&self) -> &str { "Text Search" }
    fn version(&self) -> &str { "1.0.0" }
    fn order_index(&self) -> i32 { 10 }
}

#[async_trait]
impl FilterAdapter for TextSearch {
    async fn is_activated_for(&self, query: &FilterQuery) -> Result<bool> {
        Ok(query.text.as_deref().is_some_and(|text| !text.trim().is_empty()))
    }

    async fn apply(&self, query: &FilterQuery, products: Vec<Product>) -> Result<Vec<Product>> {
        let needle = query.text.as_deref().unwrap_or_default().trim().to_lowercase();
        Ok(products
            .into_iter()
            .filter(|p| p.name().to_lowercase().contains(&needle) || p.sku().as_str().to_lowercase().contains(&needle))
            .collect())
    }
}

/// Runs every active filter over `products`.
pub async fn search(registry: &AdapterRegistry<dyn FilterAdapter>, query: &FilterQuery, products: Vec<Product>) -> Vec<Product> {
    let mut products = products;
    for filter in registry.list() {
        match filter.is_activated_for(query).await {
            Ok(true) => {}
            Ok(false) => continue,
            Err(e) => {
                error!(adapter = filter.key(), error = %e, "filter activation failed, skipping");
                continue;
            }
        }
        match filter.apply(query, products.clone()).await {
            Ok(filtered) => {
                debug!(adapter = filter.key(), before = products.len(), after = filtered.len(), "filter applied");
                products = filtered;
            }
            Err(e) => error!(adapter = filter.key(), error = %e, "filter failed, skipping"),
        }
    }
    products
}
