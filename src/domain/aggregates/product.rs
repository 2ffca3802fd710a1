//! Product Aggregate

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use crate::domain::value_objects::Sku;

#[derive(Clone, Debug)]
pub struct Product {
    id: String,
    sku: Sku,
    name: String,
    status: ProductStatus,
    prices: Vec<ProductPrice>,
}

/// One catalog price entry. A product may carry several per currency,
/// country and quantity tier.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductPrice {
    pub amount: Decimal,
    pub currency: String,
    #[serde(default)]
    pub country: Option<String>,
    #[serde(default = "default_true")]
    pub is_taxable: bool,
    #[serde(default)]
    pub is_net_price: bool,
    /// Highest quantity this tier applies to; `None` is open ended.
    #[serde(default)]
    pub max_quantity: Option<u32>,
}

fn default_true() -> bool { true }

impl ProductPrice {
    pub fn gross(amount: Decimal, currency: &str) -> Self {
        Self { amount, currency: currency.to_string(), country: None, is_taxable: true, is_net_price: false, max_quantity: None }
    }
    pub fn net(amount: Decimal, currency: &str) -> Self {
        Self { is_net_price: true, ..Self::gross(amount, currency) }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProductStatus { #[default] Draft, Active, Archived }

impl Product {
    pub fn create(sku: Sku, name: impl Into<String>) -> Self {
        Self { id: Uuid::new_v4().to_string(), sku, name: name.into(), status: ProductStatus::Draft, prices: vec![] }
    }

    pub fn with_price(mut self, price: ProductPrice) -> Self { self.add_price(price); self }

    pub fn id(&self) -> &str { &self.id }
    pub fn sku(&self) -> &Sku { &self.sku }
    pub fn name(&self) -> &str { &self.name }
    pub fn status(&self) -> &ProductStatus { &self.status }
    pub fn prices(&self) -> &[ProductPrice] { &self.prices }
    pub fn is_active(&self) -> bool { self.status == ProductStatus::Active }

    pub fn publish(&mut self) -> Result<(), ProductError> {
        if self.name.is_empty() { return Err(ProductError::MissingName); }
        if self.prices.is_empty() { return Err(ProductError::MissingPrice); }
        self.status = ProductStatus::Active;
        Ok(())
    }

    pub fn add_price(&mut self, price: ProductPrice) {
        self.prices.push(price);
    }

    /// Picks the catalog price for a currency, country and quantity.
    ///
    /// Country specific entries win over country-less ones; within those the
    /// narrowest quantity tier covering `quantity` wins.
    pub fn catalog_price(&self, currency: &str, country: &str, quantity: u32) -> Option<&ProductPrice> {
        self.prices
            .iter()
            .filter(|p| p.currency.eq_ignore_ascii_case(currency))
            .filter(|p| p.country.as_deref().map_or(true, |c| c.eq_ignore_ascii_case(country)))
            .filter(|p| p.max_quantity.map_or(true, |max| quantity <= max))
            .min_by_key(|p| (p.country.is_none(), p.max_quantity.unwrap_or(u32::MAX)))
    }
}

#[derive(Debug, Clone, PartialEq)] pub enum ProductError { MissingName, MissingPrice }
impl std::error::Error for ProductError {}
impl std::fmt::Display for ProductError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self { Self::MissingName => write!(f, "Missing name"), Self::MissingPrice => write!(f, "Missing price") }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tiered_product() -> Product {
        Product::create(Sku::new("TEA-001").unwrap(), "Green Tea")
            .with_price(ProductPrice::gross(Decimal::new(1000, 0), "CHF"))
            .with_price(ProductPrice { max_quantity: Some(9), ..ProductPrice::gross(Decimal::new(1200, 0), "CHF") })
            .with_price(ProductPrice { country: Some("LI".into()), ..ProductPrice::gross(Decimal::new(1100, 0), "CHF") })
            .with_price(ProductPrice::net(Decimal::new(900, 0), "EUR"))
    }

    #[test]
    fn test_publish_requires_price() {
        let mut p = Product::create(Sku::new("TEST").unwrap(), "P");
        assert_eq!(p.publish(), Err(ProductError::MissingPrice));
        p.add_price(ProductPrice::gross(Decimal::new(10, 0), "CHF"));
        p.publish().unwrap();
        assert!(p.is_active());
    }

    #[test]
    fn test_catalog_price_selection() {
        let p = tiered_product();
        assert_eq!(p.catalog_price("CHF", "CH", 1).unwrap().amount, Decimal::new(1200, 0));
        assert_eq!(p.catalog_price("CHF", "CH", 10).unwrap().amount, Decimal::new(1000, 0));
        assert_eq!(p.catalog_price("chf", "LI", 1).unwrap().amount, Decimal::new(1100, 0));
        assert!(p.catalog_price("EUR", "DE", 1).unwrap().is_net_price);
        assert!(p.catalog_price("USD", "US", 1).is_none());
    }
}
