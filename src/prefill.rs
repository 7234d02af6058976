//! Reschedule prefill
//!
//! Rehydrates the wizard from a random-test record. The record and the
//! company directory arrive independently, so prefill runs in two phases:
//!
//! 1. **Fields** - as soon as the record is available, every directly
//!    translatable field is merged into the form.
//! 2. **Company** - whenever the directory is non-empty, the record's company
//!    name is matched (trimmed, lowercased, exact) against the directory. A
//!    match seeds company, package, order reason and DOT agency directly,
//!    without the resets a user selection would trigger.
//!
//! Phase 2 stops for good once it has matched, or once the user has picked a
//! company by hand.

use order_types::{normalize_calendar_date, CompanyId, FormPatch, RandomTestRecord};

use crate::directory::CompanyDirectory;
use crate::form::FormStore;

/// Result of one phase-2 attempt
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CompanyMatch {
    Matched {
        company_id: CompanyId,
        display_name: String,
    },
    /// Directory has entries but none carries the record's company name
    NoMatch,
    /// Directory not loaded yet; try again when it is
    Pending,
    /// Already matched, or the user took over the company field
    Skipped,
}

#[derive(Debug, Clone)]
pub struct PrefillBootstrapper {
    record: RandomTestRecord,
    fields_applied: bool,
    company_seeded: bool,
    released: bool,
}

impl PrefillBootstrapper {
    pub fn new(record: RandomTestRecord) -> Self {
        Self {
            record,
            fields_applied: false,
            company_seeded: false,
            released: false,
        }
    }

    pub fn record(&self) -> &RandomTestRecord {
        &self.record
    }

    pub fn fields_applied(&self) -> bool {
        self.fields_applied
    }

    pub fn company_seeded(&self) -> bool {
        self.company_seeded
    }

    /// Translate the record's participant, address and communication fields.
    pub fn field_patch(&self) -> FormPatch {
        let r = &self.record;
        FormPatch {
            first_name: Some(r.first_name.trim().to_string()),
            middle_name: Some(r.middle_name.trim().to_string()),
            last_name: Some(r.last_name.trim().to_string()),
            ssn_or_eid: Some(r.ssn_eid.trim().to_string()),
            dob: Some(normalize_calendar_date(&r.dob)),
            phone1: Some(r.phone1.trim().to_string()),
            phone2: Some(r.phone2.trim().to_string()),
            address: Some(r.addr1.trim().to_string()),
            address2: Some(r.addr2.trim().to_string()),
            city: Some(r.city.trim().to_string()),
            state: Some(r.state_short.trim().to_string()),
            zip: Some(r.zip.trim().to_string()),
            observed: Some(r.observed),
            email: Some(r.email.trim().to_string()),
            cc_email: Some(r.cc_email.trim().to_string()),
            send_scheduling_link: Some(r.send_scheduling_link),
            donor_pass: Some(r.send_donor_pass),
            ..Default::default()
        }
    }

    /// Phase 1. Re-running merges the same values again.
    pub fn apply_fields(&mut self, form: &mut FormStore) {
        form.merge(self.field_patch());
        self.fields_applied = true;
        tracing::debug!(record_id = ?self.record.id, "Prefill fields applied");
    }

    /// Phase 2. Call whenever the directory changes.
    pub fn apply_company(&mut self, form: &mut FormStore, directory: &CompanyDirectory) -> CompanyMatch {
        if self.company_seeded || self.released {
            return CompanyMatch::Skipped;
        }
        if directory.is_empty() {
            return CompanyMatch::Pending;
        }

        let Some(entry) = directory.find_by_name(&self.record.company_name) else {
            tracing::info!(company = %self.record.company_name, "Prefill company not in directory, leaving unset");
            return CompanyMatch::NoMatch;
        };

        form.merge(FormPatch {
            company_id: Some(Some(entry.id.clone())),
            company_email: Some(entry.contact_email.clone()),
            package_name: non_empty(&self.record.package_name).map(Some),
            order_reason_name: non_empty(&self.record.order_reason).map(Some),
            dot_agency: non_empty(&self.record.dot_agency).map(Some),
            ..Default::default()
        });
        self.company_seeded = true;
        tracing::debug!(company_id = %entry.id, "Prefill company matched");

        CompanyMatch::Matched {
            company_id: entry.id.clone(),
            display_name: entry.display_name.clone(),
        }
    }

    /// Stop phase 2: the user has changed the company by hand.
    pub fn release_company(&mut self) {
        self.released = true;
    }
}

fn non_empty(value: &str) -> Option<String> {
    let value = value.trim();
    (!value.is_empty()).then(|| value.to_string())
}
