//! Maps raw upstream states onto an [`EnrollmentOutcome`].

use enrollwatch_common::types::{EnrollmentEvent, EnrollmentOutcome};

use crate::enrichment::extract_error_codes;

/// Classify a single raw state string. Case and separators are ignored.
pub fn classify_state(state: &str) -> EnrollmentOutcome {
    let normalized: String = state
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || *c == '_')
        .collect::<String>()
        .to_ascii_lowercase();

    match normalized.as_str() {
        "success" | "succeeded" | "completed" | "enrolled" => EnrollmentOutcome::Success,
        "successwithtimeout" | "inprogress" | "in_progress" | "pending" | "pendingreset"
        | "notcontacted" | "notattempted" => EnrollmentOutcome::Warning,
        "failure" | "failed" | "error" | "blocked" => EnrollmentOutcome::Failure,
        _ => EnrollmentOutcome::Unknown,
    }
}

/// Classify an event from its deployment status, falling back to the
/// enrollment state only when the status is empty or literally `unknown`.
///
/// An event carrying an error code in its failure details is never reported
/// as Warning or Unknown.
pub fn classify(event: &EnrollmentEvent) -> EnrollmentOutcome {
    let mut outcome = classify_state(&event.status);

    let status = event.status.trim();
    if status.is_empty() || status.eq_ignore_ascii_case("unknown") {
        if let Some(state) = &event.enrollment_state {
            outcome = classify_state(state);
        }
    }

    let has_error_code = event
        .failure_details
        .as_deref()
        .is_some_and(|details| !extract_error_codes(details).is_empty());

    if has_error_code && matches!(outcome, EnrollmentOutcome::Warning | EnrollmentOutcome::Unknown) {
        outcome = EnrollmentOutcome::Failure;
    }

    outcome
}
