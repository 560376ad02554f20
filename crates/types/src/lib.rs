//! Validated text types shared across the Padrón crates.
//!
//! These wrappers guarantee their invariant at construction time, so code
//! holding one never needs to re-check it.

/// Errors that can occur when creating validated text types.
#[derive(Debug, thiserror::Error)]
pub enum TextError {
    /// The input text was empty or contained only whitespace
    #[error("text cannot be empty")]
    Empty,
    /// The input text was not a syntactically valid email address
    #[error("`{0}` is not a valid email address")]
    InvalidEmail(String),
}

/// A string type that guarantees non-empty content.
///
/// Wraps a `String` and ensures it contains at least one non-whitespace
/// character. Input is trimmed of leading and trailing whitespace during
/// construction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NonEmptyText(String);

impl NonEmptyText {
    /// Creates a new `NonEmptyText` from the given input.
    ///
    /// The input is trimmed of leading and trailing whitespace. If the trimmed
    /// result is empty, an error is returned.
    ///
    /// # Errors
    ///
    /// Returns `TextError::Empty` if the trimmed input is empty.
    pub fn new(input: impl AsRef<str>) -> Result<Self, TextError> {
        let trimmed = input.as_ref().trim();
        if trimmed.is_empty() {
            return Err(TextError::Empty);
        }
        Ok(Self(trimmed.to_owned()))
    }

    /// Returns the inner string as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for NonEmptyText {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl AsRef<str> for NonEmptyText {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl serde::Serialize for NonEmptyText {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.0)
    }
}

impl<'de> serde::Deserialize<'de> for NonEmptyText {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        NonEmptyText::new(&s).map_err(serde::de::Error::custom)
    }
}

/// A syntactically valid email address.
///
/// Validation is deliberately conservative: exactly one `@`, a non-empty
/// local part, a dotted non-empty domain, and no whitespace anywhere. It does
/// not attempt full RFC 5321 coverage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmailAddress(String);

impl EmailAddress {
    /// Parses an email address from the given input.
    ///
    /// The input is trimmed before validation.
    ///
    /// # Errors
    ///
    /// Returns `TextError::Empty` for blank input and
    /// `TextError::InvalidEmail` when the syntax check fails.
    pub fn parse(input: impl AsRef<str>) -> Result<Self, TextError> {
        let trimmed = input.as_ref().trim();
        if trimmed.is_empty() {
            return Err(TextError::Empty);
        }
        if !Self::is_valid(trimmed) {
            return Err(TextError::InvalidEmail(trimmed.to_owned()));
        }
        Ok(Self(trimmed.to_owned()))
    }

    fn is_valid(candidate: &str) -> bool {
        if candidate.chars().any(char::is_whitespace) {
            return false;
        }
        let Some((local, domain)) = candidate.split_once('@') else {
            return false;
        };
        if local.is_empty() || domain.contains('@') {
            return false;
        }
        // Domain must have at least one dot with non-empty labels around it.
        domain.contains('.') && domain.split('.').all(|label| !label.is_empty())
    }

    /// Returns the inner string as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for EmailAddress {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl AsRef<str> for EmailAddress {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl serde::Serialize for EmailAddress {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.0)
    }
}

impl<'de> serde::Deserialize<'de> for EmailAddress {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        EmailAddress::parse(&s).map_err(serde::de::Error::custom)
    }
}
