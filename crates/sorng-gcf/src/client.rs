//! Base HTTP plumbing shared by the API bindings.
//!
//! All Google REST APIs follow a consistent pattern:
//! - Base URL: `https://{service}.googleapis.com`
//! - Auth: `Authorization: Bearer {access_token}`
//! - Request/Response: JSON
//!
//! No request timeout is set here. Callers that need bounded latency wrap
//! the dispatch in their own timeout.

use crate::error::{GcfError, GcfResult};
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::time::Duration;

pub const USER_AGENT: &str = concat!("sorng-gcf/", env!("CARGO_PKG_VERSION"));

/// Shared HTTP client plus endpoint resolution.
#[derive(Debug, Clone)]
pub struct ApiHttp {
    http: Client,
    endpoint_override: Option<String>,
}

impl ApiHttp {
    /// Create the HTTP client, optionally pointed at an emulator.
    pub fn new(endpoint_override: Option<String>) -> Self {
        let http = Client::builder()
            .connect_timeout(Duration::from_secs(15))
            .pool_max_idle_per_host(10)
            .user_agent(USER_AGENT)
            .build()
            .unwrap_or_else(|_| Client::new());

        Self {
            http,
            endpoint_override,
        }
    }

    /// The underlying reqwest client.
    pub fn client(&self) -> &Client {
        &self.http
    }

    /// Build the base URL for a service.
    pub fn base_url(&self, service: &str) -> String {
        match self.endpoint_override {
            Some(ref url) => url.trim_end_matches('/').to_string(),
            None => format!("https://{}.googleapis.com", service),
        }
    }

    /// POST JSON with a bearer token and deserialize the response.
    pub async fn post<B: Serialize + ?Sized, T: DeserializeOwned>(
        &self,
        service: &str,
        path: &str,
        token: &str,
        body: &B,
    ) -> GcfResult<T> {
        let url = format!("{}{}", self.base_url(service), path);
        log::debug!("POST {}", url);

        let response = self
            .http
            .post(&url)
            .bearer_auth(token)
            .json(body)
            .send()
            .await
            .map_err(|e| GcfError::network(service, &format!("Request failed: {}", e)))?;

        let status = response.status().as_u16();
        if status >= 400 {
            let body_text = response.text().await.unwrap_or_default();
            return Err(GcfError::from_api_response(service, status, &body_text));
        }

        response
            .json()
            .await
            .map_err(|e| GcfError::network(service, &format!("JSON parse error: {}", e)))
    }
}
