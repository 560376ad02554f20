//! The patient data model.
//!
//! A patient has an id exactly when it has been persisted, so the model is
//! split into [`NewPatient`] (no id, the only input to a create) and
//! [`PersistedPatient`] (store-assigned id, the only element of a subscribed
//! list). Both carry the same validated [`PatientFields`].

use crate::error::FieldError;
use crate::validation::{validate_name, APELLIDOS_MAX_LEN, NOMBRE_MAX_LEN};
use chrono::NaiveDate;
use padron_store::DocumentId;
use padron_types::{EmailAddress, NonEmptyText};

/// A person-name field: 3 characters up to a per-field maximum, letters and
/// spaces only (accented Latin letters included).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PersonName(String);

impl PersonName {
    /// Parses a given name (3–80 characters).
    ///
    /// # Errors
    ///
    /// Returns the first violated rule as a `FieldError`.
    pub fn parse_nombre(input: impl AsRef<str>) -> Result<Self, FieldError> {
        Self::parse(input, NOMBRE_MAX_LEN)
    }

    /// Parses a surname (3–200 characters).
    ///
    /// # Errors
    ///
    /// Returns the first violated rule as a `FieldError`.
    pub fn parse_apellidos(input: impl AsRef<str>) -> Result<Self, FieldError> {
        Self::parse(input, APELLIDOS_MAX_LEN)
    }

    fn parse(input: impl AsRef<str>, max_len: usize) -> Result<Self, FieldError> {
        let value = input.as_ref().trim();
        validate_name(value, max_len)?;
        Ok(Self(value.to_owned()))
    }

    /// Returns the name as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for PersonName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl AsRef<str> for PersonName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// The validated demographic fields of a patient.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PatientFields {
    /// Given name.
    pub nombre: PersonName,
    /// Surname(s).
    pub apellidos: PersonName,
    /// Birth date (calendar date, no time of day).
    pub fecha_nacimiento: NaiveDate,
    /// Address.
    pub domicilio: NonEmptyText,
    /// Email address.
    pub correo_electronico: EmailAddress,
}

/// A patient that has not been persisted yet. Has no id by construction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewPatient {
    pub fields: PatientFields,
}

impl NewPatient {
    pub fn new(fields: PatientFields) -> Self {
        Self { fields }
    }
}

/// A patient as read back from the store: the fields plus the immutable,
/// store-assigned id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PersistedPatient {
    pub id: DocumentId,
    pub fields: PatientFields,
}
