//! HTTP surface over the plugin registries and pricing workflow.

use std::sync::Arc;

use axum::{extract::{Path, State}, http::StatusCode, routing::{get, post}, Json, Router};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use validator::Validate;

use crate::checkout::{self, OrderPricing};
use crate::domain::aggregates::{Order, Product, ProductPrice, Provider};
use crate::domain::events::PricingEvent;
use crate::domain::value_objects::{CurrencyCode, Money, Sku};
use crate::plugins::{PluginInfo, Plugins};
use crate::pricing::{Discount, DiscountPrice, PricingSheet, ProductPricingContext, RequestContext};
use crate::registry::PluginFamily;
use crate::EngineError;

type ApiError = (StatusCode, String);

#[derive(Clone)]
pub struct AppState {
    pub plugins: Arc<Plugins>,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(|| async { Json(serde_json::json!({"status": "healthy", "service": "opensase-pricing"})) }))
        .route("/api/v1/plugins", get(list_plugins))
        .route("/api/v1/plugins/:family/:key", get(get_plugin))
        .route("/api/v1/pricing/products", post(price_product))
        .route("/api/v1/pricing/orders", post(price_order))
        .with_state(state)
}

fn error_response(e: EngineError) -> ApiError {
    let status = match &e {
        EngineError::AdapterNotFound { .. } => StatusCode::NOT_FOUND,
        EngineError::Validation(_) | EngineError::InvalidCurrency(_) | EngineError::Serialization(_) => StatusCode::BAD_REQUEST,
        EngineError::Configuration { .. } => StatusCode::UNPROCESSABLE_ENTITY,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    };
    (status, e.to_string())
}

fn invalid(e: impl std::fmt::Display) -> ApiError {
    (StatusCode::UNPROCESSABLE_ENTITY, e.to_string())
}

async fn list_plugins(State(s): State<AppState>) -> Json<Vec<PluginInfo>> {
    Json(s.plugins.list())
}

async fn get_plugin(State(s): State<AppState>, Path((family, key)): Path<(String, String)>) -> Result<Json<PluginInfo>, ApiError> {
    let family: PluginFamily = family.parse().map_err(error_response)?;
    s.plugins.inspect(family, &key).map(Json).map_err(error_response)
}

#[derive(Debug, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ProductInput {
    #[validate(length(min = 1, max = 50))]
    pub sku: String,
    #[validate(length(min = 1))]
    pub name: String,
    #[serde(default)]
    pub prices: Vec<ProductPrice>,
    #[validate(range(min = 1))]
    pub quantity: u32,
}

impl ProductInput {
    fn into_product(self) -> Result<(Product, u32), ApiError> {
        self.validate().map_err(invalid)?;
        let sku = Sku::new(self.sku).map_err(invalid)?;
        let product = self.prices.into_iter().fold(Product::create(sku, self.name), Product::with_price);
        Ok((product, self.quantity))
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProviderInput {
    pub adapter_key: String,
    #[serde(default)]
    pub configuration: Map<String, Value>,
}

impl From<ProviderInput> for Provider {
    fn from(input: ProviderInput) -> Self {
        Provider { configuration: input.configuration, ..Provider::new(input.adapter_key) }
    }
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ProductPricingRequest {
    pub product: ProductInput,
    #[validate(length(equal = 3))]
    pub currency: String,
    #[validate(length(equal = 2))]
    pub country: String,
    #[serde(default)]
    pub user_id: Option<String>,
    #[serde(default)]
    pub discounts: Vec<Discount>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductPricingResponse {
    pub sheet: PricingSheet,
    pub unit_price: Money,
    pub total: Money,
    pub events: Vec<PricingEvent>,
}

async fn price_product(State(s): State<AppState>, Json(r): Json<ProductPricingRequest>) -> Result<Json<ProductPricingResponse>, ApiError> {
    r.validate().map_err(invalid)?;
    let currency = CurrencyCode::parse(&r.currency).map_err(error_response)?;
    let (product, quantity) = r.product.into_product()?;

    let mut context = ProductPricingContext::new(product, quantity, currency.as_str(), &r.country);
    context.user_id = r.user_id.clone();
    context.discounts = r.discounts;
    let request = RequestContext::for_user(r.user_id);

    let mut director = s.plugins.product_director();
    director.calculate(&context, &request).await;
    let events = director.take_events();
    let sheet = director.into_result_sheet();
    Ok(Json(ProductPricingResponse { unit_price: sheet.unit_price(false), total: sheet.total(false), sheet, events }))
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct OrderPricingRequest {
    #[validate(length(equal = 3))]
    pub currency: String,
    #[validate(length(equal = 2))]
    pub country: String,
    #[serde(default)]
    pub user_id: Option<String>,
    #[validate(length(min = 1))]
    pub positions: Vec<ProductInput>,
    #[serde(default)]
    pub delivery: Option<ProviderInput>,
    #[serde(default)]
    pub payment: Option<ProviderInput>,
    #[serde(default)]
    pub discounts: Vec<Discount>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderPricingResponse {
    #[serde(flatten)]
    pub pricing: OrderPricing,
    pub total: Money,
    pub net_total: Money,
    pub discount_prices: Vec<DiscountPrice>,
}

async fn price_order(State(s): State<AppState>, Json(r): Json<OrderPricingRequest>) -> Result<Json<OrderPricingResponse>, ApiError> {
    r.validate().map_err(invalid)?;
    let currency = CurrencyCode::parse(&r.currency).map_err(error_response)?;

    let mut order = Order::create(r.user_id.clone(), currency.as_str(), &r.country);
    for input in r.positions {
        let (product, quantity) = input.into_product()?;
        order.add_position(product, quantity).map_err(invalid)?;
    }
    if let Some(delivery) = r.delivery {
        order.set_delivery_provider(delivery.into());
    }
    if let Some(payment) = r.payment {
        order.set_payment_provider(payment.into());
    }
    for discount in r.discounts {
        order.add_discount(discount).map_err(invalid)?;
    }

    let request = RequestContext::for_user(r.user_id);
    let pricing = checkout::price_order(&s.plugins, &mut order, &request).await;
    checkout::publish_events(&s.plugins, &mut order).await.map_err(error_response)?;

    Ok(Json(OrderPricingResponse {
        total: pricing.total(false),
        net_total: pricing.total(true),
        discount_prices: pricing.discounts(),
        pricing,
    }))
}
