//! Google Cloud Functions binding.
//!
//! Only the synchronous `call` verb is needed to invoke a deployed function.
//!
//! API base: `https://cloudfunctions.googleapis.com/v1`

use crate::client::ApiHttp;
use crate::error::{GcfError, GcfResult};
use crate::registry::{ApiCall, ApiRequest};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

const SERVICE: &str = "cloudfunctions";
const V1: &str = "/v1";

/// Dispatch path of the call verb.
pub const CALL_PATH: &[&str] = &["cloudfunctions", "projects", "locations", "functions", "call"];

// ── Types ───────────────────────────────────────────────────────────────

/// Fully qualified resource name of a deployed function.
pub fn function_resource_name(project: &str, region: &str, handler: &str) -> String {
    format!("projects/{}/locations/{}/functions/{}", project, region, handler)
}

/// Params of `projects.locations.functions.call`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvocationRequest {
    pub name: String,
    pub resource: InvocationPayload,
}

/// Request body of the call verb.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvocationPayload {
    #[serde(default)]
    pub data: String,
}

impl InvocationRequest {
    /// Build the call for `handler` in `project`/`region`.
    pub fn new(project: &str, region: &str, handler: &str, payload: &str) -> Self {
        Self {
            name: function_resource_name(project, region, handler),
            resource: InvocationPayload {
                data: payload.to_string(),
            },
        }
    }

    /// The raw payload string.
    pub fn payload(&self) -> &str {
        &self.resource.data
    }
}

/// Function invocation result.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CallResult {
    #[serde(default, rename = "executionId")]
    pub execution_id: Option<String>,
    #[serde(default)]
    pub result: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
}

// ── Binding ─────────────────────────────────────────────────────────────

/// `POST /v1/{name}:call`
pub struct CallFunction {
    http: ApiHttp,
}

impl CallFunction {
    /// Create the binding.
    pub fn new(http: ApiHttp) -> Self {
        Self { http }
    }
}

#[async_trait]
impl ApiCall for CallFunction {
    async fn call(&self, request: ApiRequest) -> GcfResult<Value> {
        let params: InvocationRequest = serde_json::from_value(request.params).map_err(|e| {
            GcfError::invalid_request(SERVICE, &format!("Invalid call params: {}", e))
                .with_method("projects.locations.functions.call")
        })?;
        let token = request.auth.access_token().await?;
        let path = format!("{}/{}:call", V1, params.name);
        self.http.post(SERVICE, &path, &token, &params.resource).await
    }
}
