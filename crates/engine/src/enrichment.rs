//! Diagnostic enrichment.
//!
//! Adds human-readable hints to an event so the person reading the
//! notification knows where to look: known Autopilot/MDM error codes, failed
//! setup phases, slow deployments and missing user assignment.

use enrollwatch_common::types::{EnrollmentEvent, EnrollmentOutcome};

/// Default threshold for flagging a slow deployment.
const DEFAULT_LONG_DEPLOYMENT_MINUTES: u64 = 60;

/// Known Autopilot / MDM enrollment error codes.
const KNOWN_ERROR_CODES: &[(&str, &str)] = &[
    (
        "0x80180014",
        "Device is blocked by enrollment restrictions or was previously removed from Intune",
    ),
    (
        "0x80180018",
        "User has no Intune license or is not allowed to enroll devices",
    ),
    (
        "0x801c03ed",
        "Entra ID join refused: device object missing, disabled or join not permitted",
    ),
    (
        "0x80070774",
        "Hybrid join could not reach a domain controller (check connector and line of sight)",
    ),
    (
        "0x800705b4",
        "Enrollment Status Page timed out before all apps and policies applied",
    ),
    (
        "0x81036502",
        "An app targeted during the Enrollment Status Page failed to install",
    ),
    (
        "0x80004005",
        "Unspecified failure reported by the device; collect MDM diagnostics from the device",
    ),
];

/// Tunables for enrichment.
#[derive(Debug, Clone)]
pub struct EnrichmentRules {
    pub long_deployment_minutes: u64,
}

impl Default for EnrichmentRules {
    fn default() -> Self {
        Self {
            long_deployment_minutes: DEFAULT_LONG_DEPLOYMENT_MINUTES,
        }
    }
}

/// Append diagnostic lines to `event.diagnostics`. The outcome is not changed.
pub fn enrich(event: &mut EnrollmentEvent, rules: &EnrichmentRules) {
    let mut diagnostics = Vec::new();

    if let Some(details) = event.failure_details.as_deref() {
        for code in extract_error_codes(details) {
            match explain_error_code(&code) {
                Some(explanation) => diagnostics.push(format!("{}: {}", code, explanation)),
                None => diagnostics.push(format!(
                    "{}: unrecognized error code, see the device's MDM diagnostic logs",
                    code
                )),
            }
        }
    }

    if is_failed_phase(event.device_setup_status.as_deref()) {
        diagnostics.push("Device setup phase of the Enrollment Status Page failed".to_string());
    }
    if is_failed_phase(event.account_setup_status.as_deref()) {
        diagnostics.push("Account setup phase of the Enrollment Status Page failed".to_string());
    }

    if let Some(minutes) = event
        .deployment_duration
        .as_deref()
        .and_then(parse_iso8601_duration_secs)
        .map(|secs| secs / 60)
    {
        if minutes > rules.long_deployment_minutes {
            diagnostics.push(format!(
                "Deployment took {} minutes (threshold {} minutes)",
                minutes, rules.long_deployment_minutes
            ));
        }
    }

    let missing_user = event
        .user_principal_name
        .as_deref()
        .is_none_or(|upn| upn.trim().is_empty());
    if missing_user && event.outcome != EnrollmentOutcome::Success {
        diagnostics.push(
            "No user assigned to the device (self-deploying or pre-provisioned)".to_string(),
        );
    }

    for line in diagnostics {
        if !event.diagnostics.contains(&line) {
            event.diagnostics.push(line);
        }
    }
}

/// Look up a known error code (case-insensitive).
pub fn explain_error_code(code: &str) -> Option<&'static str> {
    KNOWN_ERROR_CODES
        .iter()
        .find(|(known, _)| known.eq_ignore_ascii_case(code))
        .map(|(_, explanation)| *explanation)
}

/// Pull every `0x` + 8 hex digit code out of free text, lowercased and deduplicated.
pub fn extract_error_codes(text: &str) -> Vec<String> {
    let bytes = text.as_bytes();
    let mut codes: Vec<String> = Vec::new();
    let mut i = 0;

    while i + 10 <= bytes.len() {
        let prefix = &bytes[i..i + 2];
        let word_start = i == 0 || !bytes[i - 1].is_ascii_alphanumeric();
        if word_start && (prefix == b"0x" || prefix == b"0X") {
            let digits = &bytes[i + 2..i + 10];
            let word_end = bytes.get(i + 10).is_none_or(|b| !b.is_ascii_hexdigit());
            if word_end && digits.iter().all(u8::is_ascii_hexdigit) {
                let code = text[i..i + 10].to_ascii_lowercase();
                if !codes.contains(&code) {
                    codes.push(code);
                }
                i += 10;
                continue;
            }
        }
        i += 1;
    }

    codes
}

fn is_failed_phase(status: Option<&str>) -> bool {
    matches!(
        status.map(|s| s.trim().to_ascii_lowercase()).as_deref(),
        Some("failure") | Some("failed")
    )
}

/// Parse an ISO-8601 duration such as `PT1H12M30S` or `P1DT2H` into seconds.
///
/// Fractional seconds are truncated. Year/month designators are rejected, as
/// is anything that does not fit in a `u64` of seconds.
pub fn parse_iso8601_duration_secs(input: &str) -> Option<u64> {
    let rest = input.trim().strip_prefix('P').or_else(|| input.trim().strip_prefix('p'))?;
    if rest.is_empty() {
        return None;
    }

    let mut total: u64 = 0;
    let mut number = String::new();
    let mut in_time = false;
    let mut saw_component = false;

    for c in rest.chars() {
        match c.to_ascii_uppercase() {
            'T' => {
                if in_time || !number.is_empty() {
                    return None;
                }
                in_time = true;
            }
            d if d.is_ascii_digit() || d == '.' => number.push(d),
            unit => {
                let value: f64 = number.parse().ok()?;
                number.clear();
                let factor = match (unit, in_time) {
                    ('W', false) => 7 * 86_400,
                    ('D', false) => 86_400,
                    ('H', true) => 3_600,
                    ('M', true) => 60,
                    ('S', true) => 1,
                    _ => return None,
                };
                let secs = value * factor as f64;
                if !secs.is_finite() || secs >= u64::MAX as f64 {
                    return None;
                }
                total = total.checked_add(secs as u64)?;
                saw_component = true;
            }
        }
    }

    if !number.is_empty() || !saw_component {
        return None;
    }
    Some(total)
}
