//! Error types for the Cloud Functions provider.
//!
//! Google Cloud APIs return errors as `{ "error": { "code", "message", "status" } }`.
//! Local failures (credentials, configuration, registry lookups) share the same
//! type so callers can match on [`GcfErrorKind`] regardless of where the
//! failure originated.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Classification of every failure the provider can surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GcfErrorKind {
    /// The credential file is missing or unreadable.
    CredentialNotFound,
    /// The credential file is not a usable service account key.
    CredentialMalformed,
    /// The service manifest or provider options are invalid.
    InvalidConfig,
    /// The logical function name is absent from the function mapping.
    FunctionNotFound,
    /// The requested API service is not registered.
    ServiceUnsupported,
    /// A namespace or method along the requested path is not registered.
    MethodNotFound,
    /// Request parameters do not match what the API method expects.
    InvalidRequest,
    /// Transport failure or an error status returned by the remote API.
    Network,
}

impl GcfErrorKind {
    /// Credential and configuration failures. Fatal, never retried.
    pub fn is_configuration(self) -> bool {
        matches!(
            self,
            Self::CredentialNotFound | Self::CredentialMalformed | Self::InvalidConfig
        )
    }
}

/// Top-level error type for all provider operations.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GcfError {
    pub kind: GcfErrorKind,
    /// HTTP status code, or the closest equivalent for local failures.
    pub code: u16,
    /// Human-readable error message.
    pub message: String,
    /// gRPC status string (e.g. "NOT_FOUND", "PERMISSION_DENIED").
    pub status: String,
    /// The service or subsystem that produced the error.
    pub service: String,
    /// The API method that failed, when known.
    pub method: Option<String>,
    /// Whether the remote side flagged the failure as transient (429, 500, 503).
    pub retryable: bool,
}

impl fmt::Display for GcfError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} error [{}]: {}", self.service, self.status, self.message)?;
        if self.kind == GcfErrorKind::Network {
            write!(f, " (HTTP {})", self.code)?;
        }
        if let Some(ref method) = self.method {
            write!(f, " [Method: {}]", method)?;
        }
        Ok(())
    }
}

impl std::error::Error for GcfError {}

impl GcfError {
    fn local(kind: GcfErrorKind, service: &str, code: u16, status: &str, message: String) -> Self {
        Self {
            kind,
            code,
            message,
            status: status.to_string(),
            service: service.to_string(),
            method: None,
            retryable: false,
        }
    }

    /// The credential file could not be read.
    pub fn credential_not_found(path: &str, reason: &str) -> Self {
        Self::local(
            GcfErrorKind::CredentialNotFound,
            "credentials",
            404,
            "NOT_FOUND",
            format!("Unable to read credentials file '{}': {}", path, reason),
        )
    }

    /// The credential file was read but is not a usable key.
    pub fn credential_malformed(msg: &str) -> Self {
        Self::local(
            GcfErrorKind::CredentialMalformed,
            "credentials",
            400,
            "INVALID_ARGUMENT",
            msg.to_string(),
        )
    }

    /// Invalid manifest or provider configuration.
    pub fn invalid_config(msg: &str) -> Self {
        Self::local(
            GcfErrorKind::InvalidConfig,
            "config",
            400,
            "FAILED_PRECONDITION",
            msg.to_string(),
        )
    }

    /// The logical function name is not declared in the manifest.
    pub fn function_not_found(function: &str) -> Self {
        Self::local(
            GcfErrorKind::FunctionNotFound,
            "functions",
            404,
            "NOT_FOUND",
            format!(
                "Function \"{}\" not found. Please check your service manifest for the correct function name.",
                function
            ),
        )
    }

    /// The service is not part of the registry.
    pub fn service_unsupported(service: &str) -> Self {
        Self::local(
            GcfErrorKind::ServiceUnsupported,
            service,
            501,
            "UNIMPLEMENTED",
            format!("Unsupported service API \"{}\"", service),
        )
    }

    /// Some namespace or the final method along `path` is not registered.
    pub fn method_not_found(service: &str, path: &str) -> Self {
        Self::local(
            GcfErrorKind::MethodNotFound,
            service,
            501,
            "UNIMPLEMENTED",
            format!("No API method registered at \"{}\"", path),
        )
    }

    /// Params could not be shaped into what the method expects.
    pub fn invalid_request(service: &str, msg: &str) -> Self {
        Self::local(
            GcfErrorKind::InvalidRequest,
            service,
            400,
            "INVALID_ARGUMENT",
            msg.to_string(),
        )
    }

    /// Transport-level failure talking to a service.
    pub fn network(service: &str, msg: &str) -> Self {
        Self {
            kind: GcfErrorKind::Network,
            code: 503,
            message: msg.to_string(),
            status: "UNAVAILABLE".to_string(),
            service: service.to_string(),
            method: None,
            retryable: true,
        }
    }

    /// Parse a Google API error from a response body.
    pub fn from_api_response(service: &str, status_code: u16, body: &str) -> Self {
        #[derive(Deserialize)]
        struct ApiErrorInner {
            code: Option<u16>,
            message: Option<String>,
            status: Option<String>,
        }
        #[derive(Deserialize)]
        struct ApiErrorWrapper {
            error: Option<ApiErrorInner>,
        }

        if let Ok(ApiErrorWrapper { error: Some(err) }) = serde_json::from_str::<ApiErrorWrapper>(body) {
            let code = err.code.unwrap_or(status_code);
            return Self {
                kind: GcfErrorKind::Network,
                code,
                message: err.message.unwrap_or_else(|| "Unknown error".to_string()),
                status: err.status.unwrap_or_else(|| "UNKNOWN".to_string()),
                service: service.to_string(),
                method: None,
                retryable: is_retryable(code),
            };
        }

        Self {
            kind: GcfErrorKind::Network,
            code: status_code,
            message: if body.is_empty() {
                format!("HTTP {}", status_code)
            } else {
                body.chars().take(500).collect()
            },
            status: "UNKNOWN".to_string(),
            service: service.to_string(),
            method: None,
            retryable: is_retryable(status_code),
        }
    }

    /// Set the method that failed.
    pub fn with_method(mut self, method: &str) -> Self {
        self.method = Some(method.to_string());
        self
    }

    /// See [`GcfErrorKind::is_configuration`].
    pub fn is_configuration(&self) -> bool {
        self.kind.is_configuration()
    }
}

fn is_retryable(code: u16) -> bool {
    matches!(code, 429 | 500 | 503)
}

/// Convenience type alias for provider results.
pub type GcfResult<T> = Result<T, GcfError>;
