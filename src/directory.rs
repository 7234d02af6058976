//! Company Directory
//!
//! The companies visible to the current actor, each with its package and
//! order-reason catalogs. Fetched once per wizard session; a failed fetch
//! degrades to an empty directory instead of failing the session.

use async_trait::async_trait;
use order_types::{normalize_name, CatalogItem, CompanyEntry, CompanyId, CompanyRecord};
use reqwest::Client;
use url::Url;

use crate::config::WizardConfig;
use crate::error::{Result, WizardError};

/// Source of directory entries
#[async_trait]
pub trait DirectorySource: Send + Sync {
    /// Fetch every company visible to the actor holding `auth_token`.
    async fn load(&self, auth_token: Option<&str>) -> Result<Vec<CompanyEntry>>;
}

/// Directory endpoint client
pub struct HttpDirectorySource {
    http: Client,
    url: Url,
}

impl HttpDirectorySource {
    pub fn new(http: Client, url: Url) -> Self {
        Self { http, url }
    }

    pub fn from_config(http: Client, config: &WizardConfig) -> Result<Self> {
        Ok(Self::new(
            http,
            config.endpoint_url(&config.endpoints.company_directory)?,
        ))
    }
}

#[async_trait]
impl DirectorySource for HttpDirectorySource {
    async fn load(&self, auth_token: Option<&str>) -> Result<Vec<CompanyEntry>> {
        let mut request = self
            .http
            .get(self.url.clone())
            .header("Accept", "application/json");
        if let Some(token) = auth_token {
            request = request.bearer_auth(token);
        }

        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(WizardError::Status {
                endpoint: self.url.to_string(),
                status: status.as_u16(),
                body: body.chars().take(200).collect(),
            });
        }

        let records: Vec<CompanyRecord> = response.json().await?;
        Ok(records.into_iter().map(CompanyEntry::from).collect())
    }
}

/// Load state of the directory within one session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DirectoryStatus {
    NotLoaded,
    Loading,
    Loaded,
    /// Load failed; the directory is empty and company selection is unavailable
    Unavailable,
}

/// The session's view of the company directory
#[derive(Debug, Clone)]
pub struct CompanyDirectory {
    entries: Vec<CompanyEntry>,
    status: DirectoryStatus,
}

impl CompanyDirectory {
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
            status: DirectoryStatus::NotLoaded,
        }
    }

    /// Directory with entries already present (tests, CLI)
    pub fn with_entries(entries: Vec<CompanyEntry>) -> Self {
        Self {
            entries,
            status: DirectoryStatus::Loaded,
        }
    }

    pub fn status(&self) -> DirectoryStatus {
        self.status
    }

    pub(crate) fn mark_loading(&mut self) {
        self.status = DirectoryStatus::Loading;
    }

    /// Apply a load outcome. Failures leave the directory empty.
    pub(crate) fn apply(&mut self, outcome: Result<Vec<CompanyEntry>>) {
        match outcome {
            Ok(entries) => {
                tracing::debug!(companies = entries.len(), "Company directory loaded");
                self.entries = entries;
                self.status = DirectoryStatus::Loaded;
            }
            Err(e) => {
                tracing::warn!(error = %e, "Company directory unavailable, continuing with empty list");
                self.entries.clear();
                self.status = DirectoryStatus::Unavailable;
            }
        }
    }

    pub fn entries(&self) -> &[CompanyEntry] {
        &self.entries
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn find(&self, id: &CompanyId) -> Option<&CompanyEntry> {
        self.entries.iter().find(|c| &c.id == id)
    }

    /// Exact match on the normalised (trimmed, lowercased) display name
    pub fn find_by_name(&self, name: &str) -> Option<&CompanyEntry> {
        let wanted = normalize_name(name);
        if wanted.is_empty() {
            return None;
        }
        self.entries
            .iter()
            .find(|c| normalize_name(&c.display_name) == wanted)
    }

    /// Autocomplete filter: case-insensitive substring of the display name
    pub fn search(&self, query: &str) -> Vec<&CompanyEntry> {
        let query = normalize_name(query);
        self.entries
            .iter()
            .filter(|c| query.is_empty() || c.display_name.to_lowercase().contains(&query))
            .collect()
    }

    pub fn packages(&self, id: &CompanyId) -> &[CatalogItem] {
        self.find(id).map(|c| c.packages.as_slice()).unwrap_or(&[])
    }

    pub fn order_reasons(&self, id: &CompanyId) -> &[CatalogItem] {
        self.find(id)
            .map(|c| c.order_reasons.as_slice())
            .unwrap_or(&[])
    }
}

impl Default for CompanyDirectory {
    fn default() -> Self {
        Self::new()
    }
}

/// In-memory source for tests and offline runs
pub struct StaticDirectory {
    entries: Option<Vec<CompanyEntry>>,
}

impl StaticDirectory {
    pub fn new(entries: Vec<CompanyEntry>) -> Self {
        Self {
            entries: Some(entries),
        }
    }

    /// A source whose every load fails
    pub fn failing() -> Self {
        Self { entries: None }
    }
}

#[async_trait]
impl DirectorySource for StaticDirectory {
    async fn load(&self, _auth_token: Option<&str>) -> Result<Vec<CompanyEntry>> {
        self.entries.clone().ok_or_else(|| WizardError::Status {
            endpoint: "static".to_string(),
            status: 503,
            body: "directory unavailable".to_string(),
        })
    }
}
