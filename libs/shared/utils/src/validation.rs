use std::sync::OnceLock;

use regex::Regex;
use tracing::debug;

use shared_models::error::AppError;

pub const MISSING_FIELDS: &str = "All fields are required";
pub const INVALID_MOBILE: &str = "Invalid mobile number provided";
pub const INVALID_PATIENT_ID: &str = "Invalid patient ID";

/// Declarative input rules for a request body.
///
/// `required` lists every field the operation needs together with whether it
/// was supplied; `check` holds the format rules that only make sense once all
/// required fields are present.
pub trait Validate {
    fn required(&self) -> Vec<(&'static str, bool)>;

    fn check(&self) -> Result<(), AppError> {
        Ok(())
    }
}

pub fn validate<T: Validate>(value: &T) -> Result<(), AppError> {
    let missing: Vec<&'static str> = value
        .required()
        .into_iter()
        .filter_map(|(field, present)| (!present).then_some(field))
        .collect();

    if !missing.is_empty() {
        debug!("Missing required fields: {:?}", missing);
        return Err(AppError::ValidationError(MISSING_FIELDS.to_string()));
    }

    value.check()
}

/// A field counts as present when it was sent and is not the empty string.
pub fn present(value: &Option<String>) -> bool {
    value.as_deref().is_some_and(|v| !v.is_empty())
}

fn mobile_pattern() -> &'static Regex {
    static MOBILE: OnceLock<Regex> = OnceLock::new();
    // ASCII digits only; `\d` would also accept other Unicode digits.
    MOBILE.get_or_init(|| Regex::new(r"^[0-9]{10}$").expect("mobile pattern is valid"))
}

pub fn is_valid_mobile(mobile: &str) -> bool {
    mobile_pattern().is_match(mobile)
}

pub fn validate_mobile(mobile: &str) -> Result<(), AppError> {
    if is_valid_mobile(mobile) {
        Ok(())
    } else {
        Err(AppError::ValidationError(INVALID_MOBILE.to_string()))
    }
}

/// Parses a path identifier as a strict base-10 integer. Signs, whitespace
/// and trailing garbage are rejected rather than coerced.
pub fn parse_id(raw: &str) -> Result<i64, AppError> {
    if raw.is_empty() || !raw.bytes().all(|b| b.is_ascii_digit()) {
        return Err(AppError::BadRequest(INVALID_PATIENT_ID.to_string()));
    }

    raw.parse::<i64>()
        .map_err(|_| AppError::BadRequest(INVALID_PATIENT_ID.to_string()))
}
