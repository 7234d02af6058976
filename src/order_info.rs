//! Order Information step
//!
//! First screen of the wizard: company, package, order reason and (for DOT
//! packages) the DOT agency. The four selections form a dependency chain
//! where each choice constrains and resets the ones after it:
//!
//! ```text
//! NoCompany ──select company──▶ NoPackage ──select package──▶ NoReason ──select reason──▶ ReasonSelected
//!     ▲                             │                            │
//!     └──────clear company──────────┴────────────────────────────┘
//! ```
//!
//! Selecting a company always resets package, reason and agency and asks the
//! session to resolve the managing agency. Selecting a package resets reason
//! and agency. Clearing the company also clears the derived email fields and
//! the CC email, except that CC email survives while donor-pass
//! communications are on.

use order_types::{CatalogItem, CompanyId, FormPatch, FormState};
use serde::Serialize;

use crate::directory::CompanyDirectory;
use crate::error::{Result, WizardError};
use crate::form::FormStore;

/// Why a step cannot be continued
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case", tag = "type")]
pub enum BlockerKind {
    CompanyMissing,
    PackageMissing,
    OrderReasonMissing,
    DotAgencyMissing,
    /// Required participant field is missing or empty
    FieldMissing { field: &'static str },
}

/// A blocker preventing the user from continuing
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Blocker {
    pub kind: BlockerKind,
    /// Human-readable description
    pub description: String,
}

impl Blocker {
    pub fn new(kind: BlockerKind, description: impl Into<String>) -> Self {
        Self {
            kind,
            description: description.into(),
        }
    }
}

/// Where the selection chain currently stands
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StepPhase {
    NoCompany,
    NoPackage,
    NoReason { dot_agency_required: bool },
    ReasonSelected { dot_agency_required: bool },
}

impl StepPhase {
    pub fn of(form: &FormState) -> Self {
        if form.company_id.is_none() {
            return Self::NoCompany;
        }
        if form.package_name.is_none() {
            return Self::NoPackage;
        }
        let dot_agency_required = form.requires_dot_agency();
        if form.order_reason_name.is_none() {
            Self::NoReason {
                dot_agency_required,
            }
        } else {
            Self::ReasonSelected {
                dot_agency_required,
            }
        }
    }

    pub fn package_enabled(self) -> bool {
        !matches!(self, Self::NoCompany)
    }

    pub fn order_reason_enabled(self) -> bool {
        matches!(self, Self::NoReason { .. } | Self::ReasonSelected { .. })
    }

    pub fn dot_agency_visible(self) -> bool {
        matches!(
            self,
            Self::NoReason {
                dot_agency_required: true
            } | Self::ReasonSelected {
                dot_agency_required: true
            }
        )
    }
}

/// What a company selection asks of the session
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CompanySelection {
    /// A company was chosen; its managing agency must be resolved
    Selected {
        company_id: CompanyId,
        display_name: String,
    },
    Cleared,
}

/// Everything that keeps "Continue" disabled on the order information step
pub fn order_information_blockers(form: &FormState) -> Vec<Blocker> {
    let mut blockers = Vec::new();

    if form.company_id.is_none() {
        blockers.push(Blocker::new(BlockerKind::CompanyMissing, "Select a company"));
    }
    if form.package_name.is_none() {
        blockers.push(Blocker::new(BlockerKind::PackageMissing, "Select a package"));
    }
    if form.order_reason_name.is_none() {
        blockers.push(Blocker::new(
            BlockerKind::OrderReasonMissing,
            "Select an order reason",
        ));
    }
    if form.requires_dot_agency() && form.dot_agency.as_deref().map_or(true, str::is_empty) {
        blockers.push(Blocker::new(
            BlockerKind::DotAgencyMissing,
            "Select the DOT agency for a DOT package",
        ));
    }

    blockers
}

/// The order information step bound to one session's form and directory
pub struct OrderInformationStep<'a> {
    form: &'a mut FormStore,
    directory: &'a CompanyDirectory,
    dot_agencies: &'a [String],
}

impl<'a> OrderInformationStep<'a> {
    pub fn new(
        form: &'a mut FormStore,
        directory: &'a CompanyDirectory,
        dot_agencies: &'a [String],
    ) -> Self {
        Self {
            form,
            directory,
            dot_agencies,
        }
    }

    pub fn phase(&self) -> StepPhase {
        self.form.read(StepPhase::of)
    }

    pub fn blockers(&self) -> Vec<Blocker> {
        self.form.read(order_information_blockers)
    }

    pub fn can_continue(&self) -> bool {
        self.blockers().is_empty()
    }

    /// Package choices; empty while no company is selected
    pub fn package_options(&self) -> &'a [CatalogItem] {
        match self.form.read(|f| f.company_id.clone()) {
            Some(id) => self.directory.packages(&id),
            None => &[],
        }
    }

    /// Order reason choices; empty until a package is selected
    pub fn order_reason_options(&self) -> &'a [CatalogItem] {
        if !self.phase().order_reason_enabled() {
            return &[];
        }
        match self.form.read(|f| f.company_id.clone()) {
            Some(id) => self.directory.order_reasons(&id),
            None => &[],
        }
    }

    /// DOT agency choices; empty while the field is hidden
    pub fn dot_agency_options(&self) -> &'a [String] {
        if self.phase().dot_agency_visible() {
            self.dot_agencies
        } else {
            &[]
        }
    }

    /// Select or clear the company.
    pub(crate) fn select_company(&mut self, company: Option<&CompanyId>) -> Result<CompanySelection> {
        let Some(id) = company else {
            let donor_pass = self.form.read(|f| f.donor_pass);
            self.form.merge(FormPatch {
                company_id: Some(None),
                package_name: Some(None),
                order_reason_name: Some(None),
                dot_agency: Some(None),
                company_email: Some(String::new()),
                managing_agency_email: Some(String::new()),
                cc_email: if donor_pass { None } else { Some(String::new()) },
                ..Default::default()
            });
            tracing::debug!("Company cleared");
            return Ok(CompanySelection::Cleared);
        };

        let entry = self
            .directory
            .find(id)
            .ok_or_else(|| WizardError::InvalidSelection {
                field: "company",
                value: id.to_string(),
            })?;

        self.form.merge(FormPatch {
            company_id: Some(Some(entry.id.clone())),
            package_name: Some(None),
            order_reason_name: Some(None),
            dot_agency: Some(None),
            company_email: Some(entry.contact_email.clone()),
            managing_agency_email: Some(String::new()),
            ..Default::default()
        });
        tracing::debug!(company_id = %entry.id, company = %entry.display_name, "Company selected");

        Ok(CompanySelection::Selected {
            company_id: entry.id.clone(),
            display_name: entry.display_name.clone(),
        })
    }

    /// Select or clear the package. Resets order reason and DOT agency.
    pub(crate) fn select_package(&mut self, package: Option<&str>) -> Result<()> {
        let company_id = self.require_company("package", package)?;

        if let Some(name) = package {
            let offered = self
                .directory
                .find(&company_id)
                .is_some_and(|c| c.offers_package(name));
            if !offered {
                return Err(WizardError::InvalidSelection {
                    field: "package",
                    value: name.to_string(),
                });
            }
        }

        self.form.merge(FormPatch {
            package_name: Some(package.map(str::to_string)),
            order_reason_name: Some(None),
            dot_agency: Some(None),
            ..Default::default()
        });
        tracing::debug!(company_id = %company_id, package = ?package, "Package selected");
        Ok(())
    }

    pub(crate) fn select_order_reason(&mut self, reason: Option<&str>) -> Result<()> {
        let company_id = self.require_company("order reason", reason)?;
        if !self.phase().order_reason_enabled() {
            return Err(WizardError::InvalidSelection {
                field: "order reason",
                value: reason.unwrap_or_default().to_string(),
            });
        }

        if let Some(name) = reason {
            let offered = self
                .directory
                .find(&company_id)
                .is_some_and(|c| c.offers_order_reason(name));
            if !offered {
                return Err(WizardError::InvalidSelection {
                    field: "order reason",
                    value: name.to_string(),
                });
            }
        }

        self.form.merge(FormPatch {
            order_reason_name: Some(reason.map(str::to_string)),
            ..Default::default()
        });
        Ok(())
    }

    /// Only allowed while the selected package is a DOT package.
    pub(crate) fn select_dot_agency(&mut self, agency: Option<&str>) -> Result<()> {
        if !self.phase().dot_agency_visible() {
            return Err(WizardError::InvalidSelection {
                field: "DOT agency",
                value: agency.unwrap_or_default().to_string(),
            });
        }
        if let Some(name) = agency {
            if !self.dot_agencies.iter().any(|a| a == name) {
                return Err(WizardError::InvalidSelection {
                    field: "DOT agency",
                    value: name.to_string(),
                });
            }
        }

        self.form.merge(FormPatch {
            dot_agency: Some(agency.map(str::to_string)),
            ..Default::default()
        });
        Ok(())
    }

    fn require_company(&self, field: &'static str, value: Option<&str>) -> Result<CompanyId> {
        self.form
            .read(|f| f.company_id.clone())
            .ok_or_else(|| WizardError::InvalidSelection {
                field,
                value: value.unwrap_or_default().to_string(),
            })
    }
}
