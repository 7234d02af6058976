//! Wizard configuration
//!
//! Loads backend endpoints and actor settings from YAML, then overlays a few
//! environment variables so deployments can inject the token without writing
//! it to disk.

use serde::{Deserialize, Serialize};
use std::time::Duration;
use url::Url;

use crate::error::{Result, WizardError};

/// Environment variable naming the YAML config file
pub const CONFIG_PATH_ENV: &str = "ORDER_WIZARD_CONFIG";
pub const API_BASE_ENV: &str = "ORDER_WIZARD_API_BASE";
pub const AUTH_TOKEN_ENV: &str = "ORDER_WIZARD_AUTH_TOKEN";
pub const ROLE_ENV: &str = "ORDER_WIZARD_ROLE";

/// Root configuration for a wizard deployment
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct WizardConfig {
    /// Base URL every endpoint path is joined onto
    pub api_base_url: String,
    /// Bearer token of the current actor
    pub auth_token: Option<String>,
    /// Role segment for the role-scoped agency lookup (e.g. "agency", "admin")
    pub actor_role: String,
    pub request_timeout_secs: u64,
    pub endpoints: EndpointConfig,
    /// Choices offered for the DOT agency field
    pub dot_agencies: Vec<String>,
}

/// Endpoint paths relative to `api_base_url`.
///
/// `{role}` in a path is replaced with the configured actor role.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct EndpointConfig {
    pub company_directory: String,
    pub agency_lookup_primary: String,
    pub agency_lookup_fallback: String,
    pub submit_order: String,
}

impl Default for WizardConfig {
    fn default() -> Self {
        Self {
            api_base_url: "http://localhost:8080/api/".to_string(),
            auth_token: None,
            actor_role: "agency".to_string(),
            request_timeout_secs: 30,
            endpoints: EndpointConfig::default(),
            dot_agencies: order_types::DOT_AGENCIES
                .iter()
                .map(|a| a.to_string())
                .collect(),
        }
    }
}

impl Default for EndpointConfig {
    fn default() -> Self {
        Self {
            company_directory: "{role}/companies".to_string(),
            agency_lookup_primary: "{role}/agency-email".to_string(),
            agency_lookup_fallback: "agency-email".to_string(),
            submit_order: "{role}/orders".to_string(),
        }
    }
}

impl WizardConfig {
    /// Load configuration from a YAML file
    pub fn from_file(path: &str) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    /// Load configuration from a YAML string
    pub fn from_yaml(content: &str) -> Result<Self> {
        let config: WizardConfig = serde_yaml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load from `path` (or `ORDER_WIZARD_CONFIG`, or defaults) and apply env overrides.
    pub fn load(path: Option<&str>) -> Result<Self> {
        let _ = dotenvy::dotenv();

        let path = path
            .map(str::to_string)
            .or_else(|| std::env::var(CONFIG_PATH_ENV).ok());

        let mut config = match path {
            Some(path) => {
                tracing::info!(path = %path, "Loading wizard configuration");
                Self::from_file(&path)?
            }
            None => {
                tracing::debug!("No configuration file given, using defaults");
                Self::default()
            }
        };
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    fn apply_env_overrides(&mut self) {
        if let Ok(base) = std::env::var(API_BASE_ENV) {
            self.api_base_url = base;
        }
        if let Ok(token) = std::env::var(AUTH_TOKEN_ENV) {
            self.auth_token = Some(token);
        }
        if let Ok(role) = std::env::var(ROLE_ENV) {
            self.actor_role = role;
        }
    }

    fn validate(&self) -> Result<()> {
        self.base_url()?;
        if self.actor_role.trim().is_empty() {
            return Err(WizardError::Config("actor_role must not be empty".into()));
        }
        if self.request_timeout_secs == 0 {
            return Err(WizardError::Config(
                "request_timeout_secs must be greater than zero".into(),
            ));
        }
        Ok(())
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// Base URL with a guaranteed trailing slash so joins append instead of replace
    pub fn base_url(&self) -> Result<Url> {
        let mut base = self.api_base_url.trim().to_string();
        if !base.ends_with('/') {
            base.push('/');
        }
        Ok(Url::parse(&base)?)
    }

    /// Resolve an endpoint path against the base URL, substituting `{role}`.
    pub fn endpoint_url(&self, path: &str) -> Result<Url> {
        let path = path.replace("{role}", self.actor_role.trim());
        Ok(self.base_url()?.join(path.trim_start_matches('/'))?)
    }
}
