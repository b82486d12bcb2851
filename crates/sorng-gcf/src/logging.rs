//! Google Cloud Logging binding.
//!
//! API base: `https://logging.googleapis.com/v2`

use crate::client::ApiHttp;
use crate::error::{GcfError, GcfResult};
use crate::registry::{ApiCall, ApiRequest};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;

const SERVICE: &str = "logging";
const V2: &str = "/v2";

/// Dispatch path of `entries.list`.
pub const LIST_ENTRIES_PATH: &[&str] = &["logging", "entries", "list"];

pub const ORDER_NEWEST_FIRST: &str = "timestamp desc";

// ── Types ───────────────────────────────────────────────────────────────

/// Params of `entries.list`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogQuery {
    pub filter: String,
    pub order_by: String,
    pub resource_names: Vec<String>,
    pub page_size: u32,
}

impl LogQuery {
    /// Newest `page_size` entries of `project` matching `filter`.
    pub fn newest(filter: impl Into<String>, project: &str, page_size: u32) -> Self {
        Self {
            filter: filter.into(),
            order_by: ORDER_NEWEST_FIRST.to_string(),
            resource_names: vec![format!("projects/{}", project)],
            page_size,
        }
    }
}

/// A single log entry.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LogEntry {
    #[serde(default, rename = "logName")]
    pub log_name: Option<String>,
    #[serde(default)]
    pub timestamp: Option<String>,
    #[serde(default)]
    pub severity: Option<String>,
    #[serde(default, rename = "insertId")]
    pub insert_id: Option<String>,
    #[serde(default, rename = "textPayload")]
    pub text_payload: Option<String>,
    #[serde(default, rename = "jsonPayload")]
    pub json_payload: Option<Value>,
    #[serde(default)]
    pub labels: HashMap<String, String>,
}

impl LogEntry {
    /// An entry carrying only a text payload.
    pub fn with_text(text: impl Into<String>) -> Self {
        Self {
            text_payload: Some(text.into()),
            ..Default::default()
        }
    }

    /// Text payload, else compact JSON payload, else empty.
    pub fn payload_text(&self) -> String {
        match (&self.text_payload, &self.json_payload) {
            (Some(text), _) => text.clone(),
            (None, Some(json)) => json.to_string(),
            (None, None) => String::new(),
        }
    }
}

/// Response of `entries.list`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LogResult {
    #[serde(default)]
    pub entries: Option<Vec<LogEntry>>,
    #[serde(default, rename = "nextPageToken")]
    pub next_page_token: Option<String>,
}

impl LogResult {
    /// Entries in response order, empty when absent.
    pub fn entries(&self) -> &[LogEntry] {
        self.entries.as_deref().unwrap_or(&[])
    }

    /// True when the response holds no entries.
    pub fn is_empty(&self) -> bool {
        self.entries().is_empty()
    }
}

// ── Binding ─────────────────────────────────────────────────────────────

/// `POST /v2/entries:list`
pub struct ListEntries {
    http: ApiHttp,
}

impl ListEntries {
    /// Create the binding.
    pub fn new(http: ApiHttp) -> Self {
        Self { http }
    }
}

#[async_trait]
impl ApiCall for ListEntries {
    async fn call(&self, request: ApiRequest) -> GcfResult<Value> {
        let query: LogQuery = serde_json::from_value(request.params).map_err(|e| {
            GcfError::invalid_request(SERVICE, &format!("Invalid log query: {}", e))
                .with_method("entries.list")
        })?;
        let token = request.auth.access_token().await?;
        let path = format!("{}/entries:list", V2);
        self.http.post(SERVICE, &path, &token, &query).await
    }
}
