//! Participant Information step gate.
//!
//! The participant screen itself is rendered elsewhere; this module only
//! decides whether its fields are complete enough to continue.

use order_types::FormState;

use crate::order_info::{Blocker, BlockerKind};

const REQUIRED_FIELDS: [(&str, &str); 5] = [
    ("first_name", "First name is required"),
    ("last_name", "Last name is required"),
    ("ssn_or_eid", "SSN or employee ID is required"),
    ("dob", "Date of birth is required"),
    ("phone1", "Primary phone is required"),
];

fn field_value<'f>(form: &'f FormState, field: &str) -> &'f str {
    match field {
        "first_name" => &form.first_name,
        "last_name" => &form.last_name,
        "ssn_or_eid" => &form.ssn_or_eid,
        "dob" => &form.dob,
        "phone1" => &form.phone1,
        "email" => &form.email,
        _ => "",
    }
}

pub fn participant_blockers(form: &FormState) -> Vec<Blocker> {
    let mut blockers: Vec<Blocker> = REQUIRED_FIELDS
        .iter()
        .filter(|(field, _)| field_value(form, field).trim().is_empty())
        .map(|&(field, message)| Blocker::new(BlockerKind::FieldMissing { field }, message))
        .collect();

    // scheduling links and donor passes are emailed to the participant
    if (form.send_scheduling_link || form.donor_pass) && form.email.trim().is_empty() {
        blockers.push(Blocker::new(
            BlockerKind::FieldMissing { field: "email" },
            "Participant email is required to send the scheduling link or donor pass",
        ));
    }

    blockers
}
