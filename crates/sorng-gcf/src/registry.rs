//! Typed registry of the API methods the provider can call.
//!
//! Google's discovery-style APIs nest methods several levels deep
//! (`cloudfunctions.projects.locations.functions.call`). The registry stores
//! each service as a tree of namespaces so callers can address a method by a
//! flat path without knowing its depth. Lookups fail closed with a typed
//! error.

use crate::auth::AuthClient;
use crate::client::ApiHttp;
use crate::error::{GcfError, GcfResult};
use crate::functions::CallFunction;
use crate::logging::ListEntries;
use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;

/// Arguments handed to an API method.
///
/// The auth handle is its own field, so caller params can never shadow it.
#[derive(Debug, Clone)]
pub struct ApiRequest {
    pub auth: Arc<AuthClient>,
    pub params: Value,
}

impl ApiRequest {
    /// Bundle the auth handle with caller params.
    pub fn new(auth: Arc<AuthClient>, params: Value) -> Self {
        Self { auth, params }
    }
}

/// A single callable API method.
#[async_trait]
pub trait ApiCall: Send + Sync {
    async fn call(&self, request: ApiRequest) -> GcfResult<Value>;
}

pub type ApiMethod = Arc<dyn ApiCall>;

/// One level of a service's API surface.
#[derive(Clone, Default)]
pub struct Namespace {
    namespaces: HashMap<String, Namespace>,
    methods: HashMap<String, ApiMethod>,
}

impl Namespace {
    /// Child namespace by name.
    pub fn namespace(&self, name: &str) -> Option<&Namespace> {
        self.namespaces.get(name)
    }

    /// Method registered at this level.
    pub fn method(&self, name: &str) -> Option<&ApiMethod> {
        self.methods.get(name)
    }
}

/// Service name → namespace tree.
#[derive(Clone, Default)]
pub struct ServiceRegistry {
    services: HashMap<String, Namespace>,
}

impl ServiceRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry backed by the live Google APIs.
    pub fn google(http: &ApiHttp) -> Self {
        Self::new()
            .with_method(
                "cloudfunctions",
                &["projects", "locations", "functions"],
                "call",
                Arc::new(CallFunction::new(http.clone())),
            )
            .with_method(
                "logging",
                &["entries"],
                "list",
                Arc::new(ListEntries::new(http.clone())),
            )
    }

    /// Register `method` under `service.chain…`, creating namespaces as needed.
    pub fn register(&mut self, service: &str, chain: &[&str], method: &str, call: ApiMethod) {
        let mut namespace = self.services.entry(service.to_string()).or_default();
        for name in chain {
            namespace = namespace.namespaces.entry(name.to_string()).or_default();
        }
        namespace.methods.insert(method.to_string(), call);
    }

    /// Builder form of [`register`](Self::register).
    pub fn with_method(mut self, service: &str, chain: &[&str], method: &str, call: ApiMethod) -> Self {
        self.register(service, chain, method, call);
        self
    }

    /// Register a service with no methods yet.
    pub fn with_service(mut self, service: &str) -> Self {
        self.services.entry(service.to_string()).or_default();
        self
    }

    /// Names of all registered services.
    pub fn services(&self) -> impl Iterator<Item = &str> {
        self.services.keys().map(String::as_str)
    }

    /// Fail with `ServiceUnsupported` unless `service` is registered.
    pub fn is_service_supported(&self, service: &str) -> GcfResult<()> {
        if self.services.contains_key(service) {
            Ok(())
        } else {
            Err(GcfError::service_unsupported(service))
        }
    }

    /// Walk `chain` from the service root and return the method at the end.
    pub fn resolve_method(&self, service: &str, chain: &[&str], method: &str) -> GcfResult<ApiMethod> {
        let not_found = || {
            let mut path = vec![service];
            path.extend_from_slice(chain);
            path.push(method);
            GcfError::method_not_found(service, &path.join("."))
        };

        let mut namespace = self
            .services
            .get(service)
            .ok_or_else(|| GcfError::service_unsupported(service))?;
        for name in chain {
            namespace = namespace.namespace(name).ok_or_else(not_found)?;
        }
        namespace.method(method).cloned().ok_or_else(not_found)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::GcfErrorKind;
    use proptest::prelude::*;
    use serde_json::json;

    struct Echo(&'static str);

    #[async_trait]
    impl ApiCall for Echo {
        async fn call(&self, request: ApiRequest) -> GcfResult<Value> {
            Ok(json!({ "method": self.0, "params": request.params }))
        }
    }

    impl std::fmt::Debug for dyn ApiCall {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            f.write_str("ApiCall")
        }
    }

    fn registry() -> ServiceRegistry {
        ServiceRegistry::new()
            .with_method("service", &["a", "b"], "method", Arc::new(Echo("deep")))
            .with_method("service", &["a"], "other", Arc::new(Echo("shallow")))
            .with_service("empty")
    }

    #[test]
    fn supported_services_are_accepted() {
        let reg = registry();
        for name in ["service", "empty"] {
            assert!(reg.is_service_supported(name).is_ok());
        }
    }

    #[test]
    fn unknown_services_are_rejected() {
        let reg = registry();
        for name in ["", "unsupported", "Service", "a", "service.a"] {
            let err = reg.is_service_supported(name).unwrap_err();
            assert_eq!(err.kind, GcfErrorKind::ServiceUnsupported);
        }
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(200))]

        /// Property: membership decides support for any registry and any name.
        #[test]
        fn service_support_matches_membership(
            keys in prop::collection::btree_set("[a-zA-Z][a-zA-Z0-9_]{0,11}", 0..8),
            candidate in "[a-zA-Z0-9._-]{0,16}",
        ) {
            let reg = keys
                .iter()
                .fold(ServiceRegistry::new(), |reg, key| reg.with_service(key));

            for key in &keys {
                prop_assert!(reg.is_service_supported(key).is_ok());
            }

            prop_assume!(!keys.contains(&candidate));
            let err = reg.is_service_supported(&candidate).unwrap_err();
            prop_assert_eq!(err.kind, GcfErrorKind::ServiceUnsupported);
            prop_assert!(err.message.contains(&candidate));
        }
    }

    #[test]
    fn resolves_three_level_path() {
        let reg = registry();
        let deep = reg.resolve_method("service", &["a", "b"], "method").unwrap();
        let again = reg.resolve_method("service", &["a", "b"], "method").unwrap();
        assert!(Arc::ptr_eq(&deep, &again));
        let shallow = reg.resolve_method("service", &["a"], "other").unwrap();
        assert!(!Arc::ptr_eq(&deep, &shallow));
    }

    #[test]
    fn missing_intermediate_level_is_method_not_found() {
        let reg = registry();
        for chain in [&["a"][..], &["b"][..], &["a", "x"][..], &[][..]] {
            let err = reg.resolve_method("service", chain, "method").unwrap_err();
            assert_eq!(err.kind, GcfErrorKind::MethodNotFound);
        }
    }

    #[test]
    fn missing_method_names_full_path() {
        let reg = registry();
        let err = reg.resolve_method("service", &["a", "b"], "nope").unwrap_err();
        assert_eq!(err.kind, GcfErrorKind::MethodNotFound);
        assert!(err.message.contains("service.a.b.nope"));
    }

    #[test]
    fn unknown_service_on_resolve() {
        let err = registry().resolve_method("other", &[], "m").unwrap_err();
        assert_eq!(err.kind, GcfErrorKind::ServiceUnsupported);
    }

    #[test]
    fn google_registry_exposes_invoke_and_log_methods() {
        let reg = ServiceRegistry::google(&ApiHttp::new(None));
        let mut services: Vec<&str> = reg.services().collect();
        services.sort();
        assert_eq!(services, vec!["cloudfunctions", "logging"]);
        assert!(reg
            .resolve_method("cloudfunctions", &["projects", "locations", "functions"], "call")
            .is_ok());
        assert!(reg.resolve_method("logging", &["entries"], "list").is_ok());
    }
}
