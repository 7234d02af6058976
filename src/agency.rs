//! Managing-agency resolution
//!
//! Resolves the contact email of the agency managing a company by name. The
//! lookups form an ordered chain: each strategy returns a tri-state outcome
//! and the next one is tried until an email is found. Only the last
//! strategy's outcome is visible to the user, and "not found" from it is a
//! normal empty result rather than an error.

use async_trait::async_trait;
use order_types::CompanyId;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use url::Url;

use crate::config::WizardConfig;
use crate::error::Result;

/// Message shown inline when the agency email could not be determined
pub const AGENCY_LOOKUP_WARNING: &str = "Unable to look up the managing agency email";

/// Outcome of a single lookup strategy
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LookupOutcome {
    Found(String),
    NotFound,
    Failed(String),
}

/// One strategy in the resolution chain
#[async_trait]
pub trait AgencyLookup: Send + Sync {
    /// Identifier used in logs (e.g. "primary", "fallback")
    fn lookup_id(&self) -> &str;

    async fn lookup(&self, company_name: &str) -> LookupOutcome;
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct AgencyLookupRequest<'a> {
    company_name: &'a str,
}

#[derive(Debug, Deserialize)]
struct AgencyLookupResponse {
    #[serde(default)]
    data: Option<AgencyLookupData>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AgencyLookupData {
    #[serde(default)]
    agency_email: Option<String>,
}

/// Agency lookup endpoint client
pub struct HttpAgencyLookup {
    id: String,
    http: Client,
    url: Url,
    auth_token: Option<String>,
}

impl HttpAgencyLookup {
    pub fn new(id: impl Into<String>, http: Client, url: Url, auth_token: Option<String>) -> Self {
        Self {
            id: id.into(),
            http,
            url,
            auth_token,
        }
    }
}

#[async_trait]
impl AgencyLookup for HttpAgencyLookup {
    fn lookup_id(&self) -> &str {
        &self.id
    }

    async fn lookup(&self, company_name: &str) -> LookupOutcome {
        let mut request = self
            .http
            .post(self.url.clone())
            .json(&AgencyLookupRequest { company_name });
        if let Some(token) = &self.auth_token {
            request = request.bearer_auth(token);
        }

        let response = match request.send().await {
            Ok(response) => response,
            Err(e) => return LookupOutcome::Failed(format!("request failed: {}", e)),
        };

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return LookupOutcome::NotFound;
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return LookupOutcome::Failed(format!(
                "{} returned {}: {}",
                self.url,
                status,
                body.chars().take(200).collect::<String>()
            ));
        }

        match response.json::<AgencyLookupResponse>().await {
            Ok(body) => body
                .data
                .and_then(|d| d.agency_email)
                .map(|email| email.trim().to_string())
                .filter(|email| !email.is_empty())
                .map(LookupOutcome::Found)
                .unwrap_or(LookupOutcome::NotFound),
            Err(e) => LookupOutcome::Failed(format!("invalid response body: {}", e)),
        }
    }
}

/// Final result of running the chain
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AgencyResolution {
    pub email: String,
    pub error: Option<String>,
}

impl AgencyResolution {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn found(email: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            error: None,
        }
    }

    pub fn failed() -> Self {
        Self {
            email: String::new(),
            error: Some(AGENCY_LOOKUP_WARNING.to_string()),
        }
    }
}

/// Ordered chain of agency lookups
#[derive(Clone)]
pub struct AgencyResolver {
    strategies: Vec<Arc<dyn AgencyLookup>>,
}

impl AgencyResolver {
    pub fn new(strategies: Vec<Arc<dyn AgencyLookup>>) -> Self {
        Self { strategies }
    }

    /// Role-scoped primary endpoint followed by the shared fallback
    pub fn from_config(http: Client, config: &WizardConfig) -> Result<Self> {
        let primary = HttpAgencyLookup::new(
            "primary",
            http.clone(),
            config.endpoint_url(&config.endpoints.agency_lookup_primary)?,
            config.auth_token.clone(),
        );
        let fallback = HttpAgencyLookup::new(
            "fallback",
            http,
            config.endpoint_url(&config.endpoints.agency_lookup_fallback)?,
            config.auth_token.clone(),
        );
        let chain: Vec<Arc<dyn AgencyLookup>> = vec![Arc::new(primary), Arc::new(fallback)];
        Ok(Self::new(chain))
    }

    pub fn strategy_count(&self) -> usize {
        self.strategies.len()
    }

    /// Resolve the managing agency email for a company display name.
    ///
    /// Never fails: earlier failures fall through silently, the last strategy
    /// decides between an empty result and a user-visible warning.
    pub async fn resolve(&self, display_name: &str) -> AgencyResolution {
        let name = display_name.trim();
        if name.is_empty() {
            return AgencyResolution::empty();
        }

        let mut last = LookupOutcome::NotFound;
        for strategy in &self.strategies {
            match strategy.lookup(name).await {
                LookupOutcome::Found(email) => {
                    tracing::debug!(lookup = strategy.lookup_id(), company = %name, "Managing agency found");
                    return AgencyResolution::found(email);
                }
                outcome => {
                    tracing::debug!(lookup = strategy.lookup_id(), company = %name, outcome = ?outcome, "Managing agency lookup fell through");
                    last = outcome;
                }
            }
        }

        match last {
            LookupOutcome::Failed(reason) => {
                tracing::warn!(company = %name, reason = %reason, "Managing agency lookup failed");
                AgencyResolution::failed()
            }
            _ => AgencyResolution::empty(),
        }
    }
}

/// The session's agency display state, tagged with the company it belongs to
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct AgencyStatus {
    pub company_id: Option<CompanyId>,
    pub email: String,
    pub loading: bool,
    pub error: Option<String>,
    /// Resolution this status is waiting on; 0 when none was started
    #[serde(skip)]
    pub request_id: u64,
}

impl AgencyStatus {
    pub(crate) fn start(company_id: CompanyId, request_id: u64) -> Self {
        Self {
            company_id: Some(company_id),
            email: String::new(),
            loading: true,
            error: None,
            request_id,
        }
    }

    pub(crate) fn finish(&mut self, resolution: AgencyResolution) {
        self.email = resolution.email;
        self.error = resolution.error;
        self.loading = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct ScriptedLookup {
        id: &'static str,
        outcome: LookupOutcome,
        calls: AtomicUsize,
    }

    impl ScriptedLookup {
        fn new(id: &'static str, outcome: LookupOutcome) -> Arc<Self> {
            Arc::new(Self {
                id,
                outcome,
                calls: AtomicUsize::new(0),
            })
        }
    }

    #[async_trait]
    impl AgencyLookup for ScriptedLookup {
        fn lookup_id(&self) -> &str {
            self.id
        }

        async fn lookup(&self, _company_name: &str) -> LookupOutcome {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.outcome.clone()
        }
    }

    fn resolver(primary: &Arc<ScriptedLookup>, fallback: &Arc<ScriptedLookup>) -> AgencyResolver {
        let chain: Vec<Arc<dyn AgencyLookup>> = vec![primary.clone(), fallback.clone()];
        AgencyResolver::new(chain)
    }

    #[tokio::test]
    async fn test_primary_hit_skips_fallback() {
        let primary = ScriptedLookup::new("primary", LookupOutcome::Found("ops@agency.test".into()));
        let fallback = ScriptedLookup::new("fallback", LookupOutcome::NotFound);

        let result = resolver(&primary, &fallback).resolve("Acme Corp").await;

        assert_eq!(result, AgencyResolution::found("ops@agency.test"));
        assert_eq!(fallback.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_primary_failure_is_silent_when_fallback_succeeds() {
        let primary = ScriptedLookup::new("primary", LookupOutcome::Failed("timeout".into()));
        let fallback = ScriptedLookup::new("fallback", LookupOutcome::Found("b@agency.test".into()));

        let result = resolver(&primary, &fallback).resolve("Acme Corp").await;

        assert_eq!(result.email, "b@agency.test");
        assert_eq!(result.error, None);
    }

    #[tokio::test]
    async fn test_fallback_not_found_is_not_an_error() {
        let primary = ScriptedLookup::new("primary", LookupOutcome::Failed("connection refused".into()));
        let fallback = ScriptedLookup::new("fallback", LookupOutcome::NotFound);

        let result = resolver(&primary, &fallback).resolve("Acme Corp").await;

        assert_eq!(result, AgencyResolution::empty());
    }

    #[tokio::test]
    async fn test_fallback_failure_is_surfaced() {
        let primary = ScriptedLookup::new("primary", LookupOutcome::NotFound);
        let fallback = ScriptedLookup::new("fallback", LookupOutcome::Failed("500".into()));

        let result = resolver(&primary, &fallback).resolve("Acme Corp").await;

        assert_eq!(result.email, "");
        assert_eq!(result.error.as_deref(), Some(AGENCY_LOOKUP_WARNING));
    }

    #[tokio::test]
    async fn test_empty_name_skips_lookups() {
        let primary = ScriptedLookup::new("primary", LookupOutcome::Found("x@y.test".into()));
        let fallback = ScriptedLookup::new("fallback", LookupOutcome::Found("x@y.test".into()));

        let result = resolver(&primary, &fallback).resolve("   ").await;

        assert_eq!(result, AgencyResolution::empty());
        assert_eq!(primary.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_http_lookup_unreachable_host_fails() {
        let lookup = HttpAgencyLookup::new(
            "primary",
            Client::new(),
            Url::parse("http://127.0.0.1:9/agency-email").unwrap(),
            None,
        );
        assert!(matches!(
            lookup.lookup("Acme Corp").await,
            LookupOutcome::Failed(_)
        ));
    }
}
