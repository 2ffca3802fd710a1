//! Provider configuration
//!
//! A provider is a configured instance of a payment, delivery or
//! warehousing adapter: the shop admin picks an adapter key and fills in
//! the settings that adapter needs.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Provider {
    pub id: String,
    pub adapter_key: String,
    #[serde(default)]
    pub configuration: Map<String, Value>,
}

impl Provider {
    pub fn new(adapter_key: impl Into<String>) -> Self {
        Self { id: Uuid::new_v4().to_string(), adapter_key: adapter_key.into(), configuration: Map::new() }
    }

    pub fn with_setting(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.configuration.insert(key.to_string(), value.into());
        self
    }

    pub fn setting(&self, key: &str) -> Option<&Value> {
        self.configuration.get(key)
    }

    /// Non-empty string setting.
    pub fn setting_str(&self, key: &str) -> Option<&str> {
        self.setting(key).and_then(Value::as_str).map(str::trim).filter(|s| !s.is_empty())
    }

    /// Deserializes the whole configuration map into an adapter's settings type.
    pub fn settings<T: DeserializeOwned>(&self) -> crate::Result<T> {
        Ok(serde_json::from_value(Value::Object(self.configuration.clone()))?)
    }
}
