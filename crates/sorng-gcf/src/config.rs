//! Service manifest, provider configuration, and command defaults.
//!
//! The manifest is the YAML file describing the deployed service:
//!
//! ```yaml
//! service: my-service
//! provider:
//!   name: google
//!   project: my-project
//!   credentials: ~/.gcloud/keyfile.json
//! functions:
//!   hello:
//!     handler: helloHandler
//! ```

use crate::error::{GcfError, GcfResult};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

// ── Regions ─────────────────────────────────────────────────────────────

/// Regions where Cloud Functions can be deployed.
pub const FUNCTION_REGIONS: &[&str] = &[
    "us-central1",
    "us-east1",
    "us-east4",
    "us-west2",
    "us-west3",
    "us-west4",
    "northamerica-northeast1",
    "southamerica-east1",
    "europe-central2",
    "europe-west1",
    "europe-west2",
    "europe-west3",
    "europe-west6",
    "asia-east1",
    "asia-east2",
    "asia-northeast1",
    "asia-northeast2",
    "asia-northeast3",
    "asia-south1",
    "asia-southeast1",
    "asia-southeast2",
    "australia-southeast1",
];

pub const DEFAULT_REGION: &str = "us-central1";
pub const DEFAULT_STAGE: &str = "dev";

/// The only provider name this crate serves.
pub const PROVIDER_NAME: &str = "google";

/// Whether Cloud Functions serves `region`.
pub fn is_known_region(region: &str) -> bool {
    FUNCTION_REGIONS.contains(&region)
}

// ── Provider config ─────────────────────────────────────────────────────

/// Immutable per-provider configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderConfig {
    pub project_id: String,
    pub region: String,
    pub credentials_path: PathBuf,
    /// Replaces `https://{service}.googleapis.com` (emulators/testing).
    pub endpoint_override: Option<String>,
}

impl ProviderConfig {
    /// Create a config without an endpoint override.
    pub fn new(
        project_id: impl Into<String>,
        region: impl Into<String>,
        credentials_path: impl Into<PathBuf>,
    ) -> Self {
        Self {
            project_id: project_id.into(),
            region: region.into(),
            credentials_path: credentials_path.into(),
            endpoint_override: None,
        }
    }

    /// Send every request to `endpoint` instead of googleapis.com.
    pub fn with_endpoint_override(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint_override = Some(endpoint.into());
        self
    }

    /// Check required fields and the endpoint URL.
    pub fn validate(&self) -> GcfResult<()> {
        if self.project_id.is_empty() {
            return Err(GcfError::invalid_config("provider project is required"));
        }
        if self.region.is_empty() {
            return Err(GcfError::invalid_config("region is required"));
        }
        if self.credentials_path.as_os_str().is_empty() {
            return Err(GcfError::invalid_config("provider credentials path is required"));
        }
        if let Some(ref endpoint) = self.endpoint_override {
            url::Url::parse(endpoint).map_err(|e| {
                GcfError::invalid_config(&format!("Invalid endpoint override '{}': {}", endpoint, e))
            })?;
        }
        Ok(())
    }
}

// ── Functions ───────────────────────────────────────────────────────────

/// A function as declared in the manifest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FunctionDefinition {
    /// Name the platform uses to address the deployed function.
    pub handler: String,
    #[serde(default)]
    pub description: Option<String>,
}

/// Logical function name → definition.
pub type FunctionMap = BTreeMap<String, FunctionDefinition>;

/// Map a logical function name to its deployed handler name.
pub fn resolve_handler<'a>(functions: &'a FunctionMap, function: &str) -> GcfResult<&'a str> {
    functions
        .get(function)
        .map(|def| def.handler.as_str())
        .ok_or_else(|| GcfError::function_not_found(function))
}

// ── Manifest ────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderSection {
    pub name: String,
    pub project: String,
    pub credentials: String,
    #[serde(default)]
    pub region: Option<String>,
    #[serde(default)]
    pub stage: Option<String>,
    #[serde(default, rename = "endpointOverride")]
    pub endpoint_override: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceManifest {
    pub service: String,
    pub provider: ProviderSection,
    #[serde(default)]
    pub functions: FunctionMap,
}

impl ServiceManifest {
    /// Parse and validate a manifest from YAML text.
    pub fn from_yaml(yaml: &str) -> GcfResult<Self> {
        let manifest: Self = serde_yaml::from_str(yaml)
            .map_err(|e| GcfError::invalid_config(&format!("Invalid service manifest: {}", e)))?;
        manifest.validate()?;
        Ok(manifest)
    }

    /// Read and parse a manifest file.
    pub fn from_file(path: &Path) -> GcfResult<Self> {
        let yaml = std::fs::read_to_string(path).map_err(|e| {
            GcfError::invalid_config(&format!(
                "Unable to read service manifest '{}': {}",
                path.display(),
                e
            ))
        })?;
        Self::from_yaml(&yaml)
    }

    /// Check the provider section.
    pub fn validate(&self) -> GcfResult<()> {
        if self.provider.name != PROVIDER_NAME {
            return Err(GcfError::invalid_config(&format!(
                "Expected provider '{}', got '{}'",
                PROVIDER_NAME, self.provider.name
            )));
        }
        if self.provider.project.is_empty() {
            return Err(GcfError::invalid_config("provider.project is required"));
        }
        if self.provider.credentials.is_empty() {
            return Err(GcfError::invalid_config("provider.credentials is required"));
        }
        Ok(())
    }

    /// Build the provider configuration for a resolved region.
    pub fn provider_config(&self, region: &str) -> GcfResult<ProviderConfig> {
        let mut config = ProviderConfig::new(
            self.provider.project.clone(),
            region,
            expand_home(&self.provider.credentials),
        );
        config.endpoint_override = self.provider.endpoint_override.clone();
        config.validate()?;
        Ok(config)
    }
}

/// Expand a leading `~` to the current user's home directory.
pub fn expand_home(path: &str) -> PathBuf {
    let rest = match path.strip_prefix('~') {
        Some(rest) if rest.is_empty() || rest.starts_with('/') || rest.starts_with('\\') => rest,
        _ => return PathBuf::from(path),
    };
    match dirs::home_dir() {
        Some(home) => home.join(rest.trim_start_matches(['/', '\\'])),
        None => PathBuf::from(path),
    }
}

// ── Command options ─────────────────────────────────────────────────────

/// Options as supplied by the caller, before defaults are applied.
#[derive(Debug, Clone, Default)]
pub struct CommandOptions {
    pub function: String,
    pub region: Option<String>,
    pub stage: Option<String>,
    pub data: Option<String>,
    pub count: Option<u32>,
}

/// Resolved options for the invoke workflow.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvokeOptions {
    pub function: String,
    pub region: String,
    pub stage: String,
    pub data: Option<String>,
}

impl InvokeOptions {
    /// Payload sent with the call; empty when none was given.
    pub fn payload(&self) -> &str {
        self.data.as_deref().unwrap_or("")
    }
}

/// Resolved options for the logs workflow.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogsOptions {
    pub function: String,
    pub region: String,
    pub stage: String,
    pub count: Option<u32>,
}

impl CommandOptions {
    fn region(&self, manifest: &ServiceManifest) -> String {
        let region = self
            .region
            .clone()
            .or_else(|| manifest.provider.region.clone())
            .unwrap_or_else(|| DEFAULT_REGION.to_string());
        if !is_known_region(&region) {
            log::warn!("Region '{}' is not a known Cloud Functions region", region);
        }
        region
    }

    fn stage(&self, manifest: &ServiceManifest) -> String {
        self.stage
            .clone()
            .or_else(|| manifest.provider.stage.clone())
            .unwrap_or_else(|| DEFAULT_STAGE.to_string())
    }

    /// Resolve defaults for `invoke`.
    pub fn invoke_options(&self, manifest: &ServiceManifest) -> InvokeOptions {
        InvokeOptions {
            function: self.function.clone(),
            region: self.region(manifest),
            stage: self.stage(manifest),
            data: self.data.clone(),
        }
    }

    /// Resolve defaults for `logs`.
    pub fn logs_options(&self, manifest: &ServiceManifest) -> LogsOptions {
        LogsOptions {
            function: self.function.clone(),
            region: self.region(manifest),
            stage: self.stage(manifest),
            count: self.count,
        }
    }
}
