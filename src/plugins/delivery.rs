//! Delivery plugins.

use async_trait::async_trait;
use serde::Serialize;
use tracing::info;
use uuid::Uuid;

use super::provider::ProviderAdapter;
use crate::domain::aggregates::{Order, Provider};
use crate::registry::Adapter;
use crate::{EngineError, Result};

pub const POST_KEY: &str = "opensase.delivery.post";
pub const PICKUP_KEY: &str = "opensase.delivery.pickup";

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Shipment {
    pub reference: String,
    pub pickup_location: Option<String>,
}

#[async_trait]
pub trait DeliveryAdapter: ProviderAdapter {
    async fn send(&self, provider: &Provider, order: &Order) -> Result<Shipment>;
}

pub struct Post;

impl Adapter for Post {
    fn key(&self) -> &str { POST_KEY }
    fn label(&self) -> &str { "Post" }
    fn version(&self) -> &str { "1.0.0" }
}

impl ProviderAdapter for Post {}

#[async_trait]
impl DeliveryAdapter for Post {
    async fn send(&self, _provider: &Provider, order: &Order) -> Result<Shipment> {
        let reference = Uuid::new_v4().simple().to_string().to_uppercase();
        info!(order_id = order.id(), reference = %reference, "parcel registered");
        Ok(Shipment { reference, pickup_location: None })
    }
}

/// Customer collects the order at a configured location.
pub struct Pickup;

impl Adapter for Pickup {
    fn key(&self) -> &str { PICKUP_KEY }
    fn label(&self) -> &str { "Store Pickup" }
    fn version(&self) -> &str { "1.0.0" }
    fn order_index(&self) -> i32 { 10 }
}

impl ProviderAdapter for Pickup {
    fn configuration_error(&self, provider: &Provider) -> Option<EngineError> {
        provider
            .setting_str("location")
            .is_none()
            .then(|| EngineError::configuration(self.key(), "location is not set"))
    }
}

#[async_trait]
impl DeliveryAdapter for Pickup {
    async fn send(&self, provider: &Provider, order: &Order) -> Result<Shipment> {
        let location = provider
            .setting_str("location")
            .ok_or_else(|| EngineError::configuration(self.key(), "location is not set"))?;
        Ok(Shipment { reference: format!("PICKUP-{}", order.id()), pickup_location: Some(location.to_string()) })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_pickup_uses_configured_location() {
        let order = Order::create(None, "CHF", "CH");
        let provider = Provider::new(PICKUP_KEY).with_setting("location", "Zurich HB");

        let shipment = Pickup.send(&provider, &order).await.unwrap();
        assert_eq!(shipment.pickup_location.as_deref(), Some("Zurich HB"));
        assert!(Pickup.send(&Provider::new(PICKUP_KEY), &order).await.is_err());
    }

    #[tokio::test]
    async fn test_post_needs_no_settings() {
        let provider = Provider::new(POST_KEY);
        assert!(Post.configuration_error(&provider).is_none());
        assert!(!Post.send(&provider, &Order::create(None, "CHF", "CH")).await.unwrap().reference.is_empty());
    }
}
