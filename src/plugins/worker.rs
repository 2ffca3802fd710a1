//! Background work plugins, addressed by work type.

use async_trait::async_trait;
use chrono::Utc;
use serde::Serialize;
use serde_json::{json, Value};
use tracing::{error, info};

use crate::registry::{Adapter, AdapterRegistry};
use crate::Result;

pub const HEARTBEAT_KEY: &str = "HEARTBEAT";

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct WorkResult {
    pub success: bool,
    pub result: Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[async_trait]
pub trait WorkerAdapter: Adapter {
    async fn do_work(&self, input: &Value) -> Result<Value>;
}

pub struct Heartbeat;

impl Adapter for Heartbeat {
    fn key(&self) -> &str { HEARTBEAT_KEY }
    fn label(&self) -> &str { "Heartbeat" }
    fn version(&self) -> &str { "1.0.0" }
}

#[async_trait]
impl WorkerAdapter for Heartbeat {
    async fn do_work(&self, input: &Value) -> Result<Value> {
        Ok(json!({ "at": Utc::now().to_rfc3339(), "input": input }))
    }
}

/// Runs one unit of work. Unknown work types are an error; failures inside
/// the worker are reported in the result.
pub async fn run_work(registry: &AdapterRegistry<dyn WorkerAdapter>, work_type: &str, input: &Value) -> Result<WorkResult> {
    let worker = registry.require(work_type)?;
    match worker.do_work(input).await {
        Ok(result) => {
            info!(work_type, "work done");
            Ok(WorkResult { success: true, result, error: None })
        }
        Err(e) => {
            error!(work_type, error = %e, "work failed");
            Ok(WorkResult { success: false, result: Value::Null, error: Some(e.to_string()) })
        }
    }
}
