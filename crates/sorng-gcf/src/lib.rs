//! # sorng-gcf – Google Cloud Functions provider core
//!
//! Invokes a deployed Cloud Function on behalf of a deployment tool, reads the
//! execution result back from Cloud Logging, and prints it.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────┐
//! │  InvokeFunction / RetrieveLogs  (invoke.rs,      │
//! │  logs.rs)                                        │
//! │  └── resolve handler → dispatch → print          │
//! ├──────────────────────────────────────────────────┤
//! │  GoogleProvider  (provider.rs)                   │
//! │  └── RequestDispatcher::request(path, params)    │
//! ├──────────────────────────────────────────────────┤
//! │  ServiceRegistry  (registry.rs)                  │
//! │  └── service → namespace… → ApiCall              │
//! │       CallFunction (functions.rs)                │
//! │       ListEntries  (logging.rs)                  │
//! ├──────────────────────────────────────────────────┤
//! │  AuthClientCache → AuthClient  (auth.rs)         │
//! │  └── JWT → access_token exchange + caching       │
//! ├──────────────────────────────────────────────────┤
//! │  CredentialSource  (credentials.rs)              │
//! └──────────────────────────────────────────────────┘
//! ```
//!
//! | Service         | Registered path                                   | API Base                                   |
//! |-----------------|---------------------------------------------------|--------------------------------------------|
//! | Cloud Functions | `cloudfunctions.projects.locations.functions.call` | `https://cloudfunctions.googleapis.com/v1` |
//! | Cloud Logging   | `logging.entries.list`                            | `https://logging.googleapis.com/v2`        |

pub mod error;
pub mod config;
pub mod credentials;
pub mod auth;
pub mod client;
pub mod registry;

// API bindings
pub mod functions;
pub mod logging;

pub mod provider;
pub mod output;

// Workflows
pub mod invoke;
pub mod logs;

pub use auth::{AuthClient, AuthClientCache, AUTH_SCOPES};
pub use config::{
    CommandOptions, FunctionDefinition, FunctionMap, InvokeOptions, LogsOptions, ProviderConfig,
    ServiceManifest,
};
pub use credentials::{CredentialMaterial, CredentialSource, FileCredentials};
pub use error::{GcfError, GcfErrorKind, GcfResult};
pub use invoke::InvokeFunction;
pub use logs::RetrieveLogs;
pub use output::{BufferedSink, ConsoleSink, OutputSink};
pub use provider::{dispatch, GoogleProvider, RequestDispatcher};
pub use registry::{ApiCall, ApiMethod, ApiRequest, ServiceRegistry};
