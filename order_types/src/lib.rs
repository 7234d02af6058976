//! Order Types - Level 1 Foundation Types
//!
//! Pure data structures shared by the order workflow engine and anything that
//! renders it. Nothing in here talks to the network or owns session state.
//!
//! ## Contents
//!
//! - `FormState` / `FormPatch` - the single record every wizard step reads and writes
//! - `CompanyEntry` / `CatalogItem` - the company directory with its package and
//!   order-reason catalogs, plus the wire shape it is decoded from
//! - `RandomTestRecord` - the foreign record a reschedule starts from
//! - The fixed DOT package and DOT agency sets
//!
//! ## Rules
//!
//! 1. **NO BUSINESS LOGIC** beyond normalisation helpers
//! 2. **NO WORKSPACE DEPENDENCIES**
//! 3. **SERIALIZABLE** - all wire-facing types support serde

use serde::{Deserialize, Deserializer, Serialize};

// ============================================================================
// DOT PACKAGES AND AGENCIES
// ============================================================================

/// Packages regulated by the U.S. Department of Transportation.
///
/// Selecting one of these makes the DOT agency field required.
pub const DOT_PACKAGES: [&str; 4] = ["DOT PANEL", "DOT PANEL + BAT", "DOT BAT", "DOT PANEL OBSERVED"];

/// DOT operating administrations offered for the DOT agency field.
pub const DOT_AGENCIES: [&str; 6] = ["FMCSA", "FAA", "FRA", "FTA", "PHMSA", "USCG"];

/// Returns true when `package_name` is a member of the DOT package set.
///
/// Comparison ignores surrounding whitespace and case.
pub fn is_dot_package(package_name: &str) -> bool {
    let needle = package_name.trim();
    DOT_PACKAGES.iter().any(|p| p.eq_ignore_ascii_case(needle))
}

/// Normalise a company name for matching: trimmed and lowercased.
pub fn normalize_name(name: &str) -> String {
    name.trim().to_lowercase()
}

// ============================================================================
// COMPANY DIRECTORY
// ============================================================================

/// Identifier of a company in the directory.
///
/// The backend emits numeric ids for some tenants and string ids for others,
/// so both are accepted and held as text.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct CompanyId(pub String);

impl CompanyId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for CompanyId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for CompanyId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserialize_text_id(deserializer).map(CompanyId)
    }
}

/// Accept a JSON string or number and return it as text.
fn deserialize_text_id<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    match serde_json::Value::deserialize(deserializer)? {
        serde_json::Value::String(s) => Ok(s),
        serde_json::Value::Number(n) => Ok(n.to_string()),
        other => Err(serde::de::Error::custom(format!(
            "expected string or number id, got {}",
            other
        ))),
    }
}

/// One selectable entry of a company's package or order-reason catalog
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogItem {
    pub id: String,
    pub name: String,
}

impl CatalogItem {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
        }
    }
}

/// A company visible to the current actor, with its catalogs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompanyEntry {
    pub id: CompanyId,
    pub display_name: String,
    pub address: String,
    pub city: String,
    pub state: String,
    pub zip: String,
    pub contact_number: String,
    pub contact_email: String,
    pub packages: Vec<CatalogItem>,
    pub order_reasons: Vec<CatalogItem>,
}

impl CompanyEntry {
    /// Minimal entry with only an id, a name and its catalogs
    pub fn new(
        id: impl Into<String>,
        display_name: impl Into<String>,
        packages: Vec<CatalogItem>,
        order_reasons: Vec<CatalogItem>,
    ) -> Self {
        Self {
            id: CompanyId::new(id),
            display_name: display_name.into(),
            address: String::new(),
            city: String::new(),
            state: String::new(),
            zip: String::new(),
            contact_number: String::new(),
            contact_email: String::new(),
            packages,
            order_reasons,
        }
    }

    pub fn offers_package(&self, package_name: &str) -> bool {
        self.packages.iter().any(|p| p.name == package_name)
    }

    pub fn offers_order_reason(&self, reason_name: &str) -> bool {
        self.order_reasons.iter().any(|r| r.name == reason_name)
    }
}

/// Company as returned by the directory endpoint
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompanyRecord {
    pub id: CompanyId,
    pub company_name: String,
    #[serde(default)]
    pub company_email: Option<String>,
    #[serde(default)]
    pub company_details: Option<CompanyDetails>,
    #[serde(default)]
    pub packages: Vec<PackageRecord>,
    #[serde(default)]
    pub order_reasons: Vec<OrderReasonRecord>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CompanyDetails {
    pub address: Option<String>,
    pub city: Option<String>,
    pub zip: Option<String>,
    pub contact_number: Option<String>,
    pub state: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PackageRecord {
    #[serde(deserialize_with = "deserialize_text_id")]
    pub id: String,
    pub package_name: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderReasonRecord {
    #[serde(deserialize_with = "deserialize_text_id")]
    pub id: String,
    pub order_reason_name: String,
}

impl From<CompanyRecord> for CompanyEntry {
    fn from(record: CompanyRecord) -> Self {
        let details = record.company_details.unwrap_or_default();
        Self {
            id: record.id,
            display_name: record.company_name,
            address: details.address.unwrap_or_default(),
            city: details.city.unwrap_or_default(),
            state: details.state.unwrap_or_default(),
            zip: details.zip.unwrap_or_default(),
            contact_number: details.contact_number.unwrap_or_default(),
            contact_email: record.company_email.unwrap_or_default(),
            packages: record
                .packages
                .into_iter()
                .map(|p| CatalogItem::new(p.id, p.package_name))
                .collect(),
            order_reasons: record
                .order_reasons
                .into_iter()
                .map(|r| CatalogItem::new(r.id, r.order_reason_name))
                .collect(),
        }
    }
}

// ============================================================================
// FORM STATE
// ============================================================================

/// Every field the order wizard can produce across all of its steps.
///
/// Free-text fields use the empty string for "unset"; selections use `None`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FormState {
    // identity
    pub first_name: String,
    pub middle_name: String,
    pub last_name: String,
    pub ssn_or_eid: String,
    /// Calendar date, `YYYY-MM-DD`
    pub dob: String,
    pub phone1: String,
    pub phone2: String,

    // address
    pub address: String,
    pub address2: String,
    pub city: String,
    pub state: String,
    pub zip: String,

    // selection
    pub company_id: Option<CompanyId>,
    pub package_name: Option<String>,
    pub order_reason_name: Option<String>,
    pub dot_agency: Option<String>,
    pub observed: bool,

    // communications
    pub email: String,
    pub cc_email: String,
    pub send_scheduling_link: bool,
    pub donor_pass: bool,

    // derived, display only
    pub company_email: String,
    pub managing_agency_email: String,
}

impl FormState {
    /// Shallow merge: every field present in `patch` overwrites the current value.
    pub fn merge(&mut self, patch: FormPatch) {
        macro_rules! apply {
            ($($field:ident),* $(,)?) => {
                $(
                    if let Some(value) = patch.$field {
                        self.$field = value;
                    }
                )*
            };
        }

        apply!(
            first_name,
            middle_name,
            last_name,
            ssn_or_eid,
            dob,
            phone1,
            phone2,
            address,
            address2,
            city,
            state,
            zip,
            company_id,
            package_name,
            order_reason_name,
            dot_agency,
            observed,
            email,
            cc_email,
            send_scheduling_link,
            donor_pass,
            company_email,
            managing_agency_email,
        );
    }

    /// True when the selected package requires a DOT agency.
    pub fn requires_dot_agency(&self) -> bool {
        self.package_name.as_deref().is_some_and(is_dot_package)
    }
}

/// Partial update of a `FormState`.
///
/// `None` leaves a field untouched. Selection fields are doubly optional so a
/// patch can clear them with `Some(None)`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FormPatch {
    pub first_name: Option<String>,
    pub middle_name: Option<String>,
    pub last_name: Option<String>,
    pub ssn_or_eid: Option<String>,
    pub dob: Option<String>,
    pub phone1: Option<String>,
    pub phone2: Option<String>,
    pub address: Option<String>,
    pub address2: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub zip: Option<String>,
    pub company_id: Option<Option<CompanyId>>,
    pub package_name: Option<Option<String>>,
    pub order_reason_name: Option<Option<String>>,
    pub dot_agency: Option<Option<String>>,
    pub observed: Option<bool>,
    pub email: Option<String>,
    pub cc_email: Option<String>,
    pub send_scheduling_link: Option<bool>,
    pub donor_pass: Option<bool>,
    pub company_email: Option<String>,
    pub managing_agency_email: Option<String>,
}

impl FormPatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self == &Self::default()
    }
}

// ============================================================================
// RESCHEDULE RECORD
// ============================================================================

/// A previously scheduled random-test entry, as stored by the random pool.
///
/// Field names follow the pool's wire format, not `FormState`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RandomTestRecord {
    #[serde(deserialize_with = "deserialize_opt_text_id")]
    pub id: Option<String>,
    pub first_name: String,
    pub middle_name: String,
    pub last_name: String,
    pub ssn_eid: String,
    pub dob: String,
    pub phone1: String,
    pub phone2: String,
    pub email: String,
    pub cc_email: String,
    pub addr1: String,
    pub addr2: String,
    pub city: String,
    pub state_short: String,
    pub zip: String,
    pub company_name: String,
    pub package_name: String,
    pub order_reason: String,
    pub dot_agency: String,
    #[serde(deserialize_with = "deserialize_boolish")]
    pub observed: bool,
    #[serde(deserialize_with = "deserialize_boolish")]
    pub send_scheduling_link: bool,
    #[serde(deserialize_with = "deserialize_boolish")]
    pub send_donor_pass: bool,
}

fn deserialize_opt_text_id<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<Option<String>, D::Error> {
    match serde_json::Value::deserialize(deserializer)? {
        serde_json::Value::Null => Ok(None),
        serde_json::Value::String(s) if s.is_empty() => Ok(None),
        serde_json::Value::String(s) => Ok(Some(s)),
        serde_json::Value::Number(n) => Ok(Some(n.to_string())),
        other => Err(serde::de::Error::custom(format!(
            "expected string or number id, got {}",
            other
        ))),
    }
}

/// Coerce the pool's boolean-like encodings into a native bool.
///
/// Accepts `true/false`, `1/0`, `"1"/"0"`, `"true"/"false"`, `"yes"/"no"` and
/// null (false).
pub fn deserialize_boolish<'de, D: Deserializer<'de>>(deserializer: D) -> Result<bool, D::Error> {
    let value = serde_json::Value::deserialize(deserializer)?;
    parse_boolish(&value).ok_or_else(|| {
        serde::de::Error::custom(format!("expected boolean-like value, got {}", value))
    })
}

/// Interpret a JSON value as a boolean flag, `None` when it is not boolean-like.
pub fn parse_boolish(value: &serde_json::Value) -> Option<bool> {
    match value {
        serde_json::Value::Null => Some(false),
        serde_json::Value::Bool(b) => Some(*b),
        serde_json::Value::Number(n) => n.as_i64().map(|n| n != 0),
        serde_json::Value::String(s) => match s.trim().to_ascii_lowercase().as_str() {
            "" | "0" | "false" | "no" | "n" => Some(false),
            "1" | "true" | "yes" | "y" => Some(true),
            _ => None,
        },
        _ => None,
    }
}

/// Normalise a date-ish string to a plain `YYYY-MM-DD` calendar date.
///
/// Handles RFC 3339 timestamps, `YYYY-MM-DD[ T]...` prefixes and US
/// `MM/DD/YYYY`. Anything else is returned trimmed but otherwise untouched.
pub fn normalize_calendar_date(raw: &str) -> String {
    use chrono::{DateTime, NaiveDate};

    let raw = raw.trim();
    if raw.is_empty() {
        return String::new();
    }
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return ts.date_naive().format("%Y-%m-%d").to_string();
    }
    if let Some(prefix) = raw.get(..10) {
        if let Ok(date) = NaiveDate::parse_from_str(prefix, "%Y-%m-%d") {
            return date.format("%Y-%m-%d").to_string();
        }
    }
    if let Ok(date) = NaiveDate::parse_from_str(raw, "%m/%d/%Y") {
        return date.format("%Y-%m-%d").to_string();
    }
    raw.to_string()
}
