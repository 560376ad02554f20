//! Field validation rules.
//!
//! These functions check the raw form values against the roster's rules
//! before anything is serialized towards the store. Each returns the first
//! violated rule for its field.

use crate::error::FieldError;
use once_cell::sync::Lazy;
use padron_types::EmailAddress;
use regex::Regex;

/// Minimum length shared by the name fields.
pub const NAME_MIN_LEN: usize = 3;
/// Maximum length of the given name.
pub const NOMBRE_MAX_LEN: usize = 80;
/// Maximum length of the surname.
pub const APELLIDOS_MAX_LEN: usize = 200;

static SOLO_LETRAS_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[a-zA-ZáéíóúÁÉÍÓÚñÑ\s]+$").expect("valid letters regex"));

/// Validates a name field: required, bounded length, letters and spaces only
/// (accented Latin letters included).
///
/// # Errors
///
/// Returns the first violated rule as a `FieldError`.
pub fn validate_name(value: &str, max_len: usize) -> Result<(), FieldError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(FieldError::Required);
    }
    let length = trimmed.chars().count();
    if length < NAME_MIN_LEN {
        return Err(FieldError::TooShort { min: NAME_MIN_LEN });
    }
    if length > max_len {
        return Err(FieldError::TooLong { max: max_len });
    }
    if !SOLO_LETRAS_RE.is_match(trimmed) {
        return Err(FieldError::InvalidCharacters);
    }
    Ok(())
}

/// Validates the address field: required, no further constraint.
///
/// # Errors
///
/// Returns `FieldError::Required` for blank input.
pub fn validate_domicilio(value: &str) -> Result<(), FieldError> {
    if value.trim().is_empty() {
        return Err(FieldError::Required);
    }
    Ok(())
}

/// Validates the email field: required and syntactically valid.
///
/// # Errors
///
/// Returns `FieldError::Required` for blank input and
/// `FieldError::InvalidEmail` when the syntax check fails.
pub fn validate_correo(value: &str) -> Result<EmailAddress, FieldError> {
    if value.trim().is_empty() {
        return Err(FieldError::Required);
    }
    EmailAddress::parse(value).map_err(|_| FieldError::InvalidEmail)
}
