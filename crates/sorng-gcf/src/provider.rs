//! The `google` provider: authenticated request dispatch.
//!
//! `request(path, params)` takes a flat path `[service, namespace…, method]`,
//! checks the service is registered, obtains the memoized auth client,
//! resolves the method and awaits it. Failures come back verbatim; there is
//! no retry and no response caching at this layer.

use crate::auth::{AuthClient, AuthClientCache};
use crate::client::ApiHttp;
use crate::config::{ProviderConfig, PROVIDER_NAME};
use crate::credentials::{CredentialSource, FileCredentials};
use crate::error::{GcfError, GcfResult};
use crate::registry::{ApiRequest, ServiceRegistry};
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;

/// Anything that can issue an authenticated API request.
#[async_trait]
pub trait RequestDispatcher: Send + Sync {
    async fn request(&self, path: &[&str], params: Value) -> GcfResult<Value>;
}

/// Serialize typed params, dispatch, and deserialize the typed response.
pub async fn dispatch<D, P, T>(dispatcher: &D, path: &[&str], params: &P) -> GcfResult<T>
where
    D: RequestDispatcher + ?Sized,
    P: Serialize + ?Sized,
    T: DeserializeOwned,
{
    let service = path.first().copied().unwrap_or_default();
    let params = serde_json::to_value(params).map_err(|e| {
        GcfError::invalid_request(service, &format!("Unable to encode params: {}", e))
    })?;
    let response = dispatcher.request(path, params).await?;
    serde_json::from_value(response).map_err(|e| {
        GcfError::network(service, &format!("Unexpected response shape: {}", e))
            .with_method(&path.join("."))
    })
}

/// Split `[service, chain…, method]`.
fn split_path<'a>(path: &'a [&'a str]) -> GcfResult<(&'a str, &'a [&'a str], &'a str)> {
    match path {
        [service, chain @ .., method] => Ok((*service, chain, *method)),
        _ => Err(GcfError::method_not_found(
            path.first().copied().unwrap_or_default(),
            &path.join("."),
        )),
    }
}

pub struct GoogleProvider {
    config: ProviderConfig,
    registry: ServiceRegistry,
    auth: AuthClientCache,
}

impl GoogleProvider {
    /// Provider backed by the live Google APIs and the configured key file.
    pub fn new(config: ProviderConfig) -> Self {
        let http = ApiHttp::new(config.endpoint_override.clone());
        let registry = ServiceRegistry::google(&http);
        let credentials = FileCredentials::new(config.credentials_path.clone());
        Self::from_parts(config, registry, Box::new(credentials), &http)
    }

    /// Provider with an explicit registry and credential source.
    pub fn with_registry(
        config: ProviderConfig,
        registry: ServiceRegistry,
        credentials: Box<dyn CredentialSource>,
    ) -> Self {
        let http = ApiHttp::new(config.endpoint_override.clone());
        Self::from_parts(config, registry, credentials, &http)
    }

    fn from_parts(
        config: ProviderConfig,
        registry: ServiceRegistry,
        credentials: Box<dyn CredentialSource>,
        http: &ApiHttp,
    ) -> Self {
        Self {
            config,
            registry,
            auth: AuthClientCache::new(credentials, http.client().clone()),
        }
    }

    /// Provider name used in manifests.
    pub fn provider_name() -> &'static str {
        PROVIDER_NAME
    }

    /// Configuration this provider was built with.
    pub fn config(&self) -> &ProviderConfig {
        &self.config
    }

    /// Registered API methods.
    pub fn registry(&self) -> &ServiceRegistry {
        &self.registry
    }

    /// Return the shared auth client, building it on first use.
    pub async fn get_auth_client(&self) -> GcfResult<Arc<AuthClient>> {
        self.auth.get().await
    }

    /// Whether the auth client has been built.
    pub fn is_authenticated(&self) -> bool {
        self.auth.is_initialized()
    }
}

#[async_trait]
impl RequestDispatcher for GoogleProvider {
    async fn request(&self, path: &[&str], params: Value) -> GcfResult<Value> {
        let (service, chain, method) = split_path(path)?;
        self.registry.is_service_supported(service)?;
        let auth = self.get_auth_client().await?;
        let call = self.registry.resolve_method(service, chain, method)?;
        log::debug!("Dispatching {}", path.join("."));
        call.call(ApiRequest::new(auth, params)).await
    }
}
