//! Core runtime configuration.
//!
//! Configuration is resolved once at process startup and passed into the
//! components, rather than read from the environment at call time. This
//! keeps behaviour consistent across threads and test harnesses.

use crate::error::ConfigError;

/// Name of the patient collection when none is configured.
pub const DEFAULT_COLLECTION: &str = "pacientes";

/// Core configuration resolved at startup.
#[derive(Clone, Debug)]
pub struct CoreConfig {
    collection: String,
}

impl CoreConfig {
    /// Create a new `CoreConfig` for the given patient collection.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::EmptyCollection` if the name is empty or
    /// whitespace-only.
    pub fn new(collection: impl Into<String>) -> Result<Self, ConfigError> {
        let collection = collection.into();
        if collection.trim().is_empty() {
            return Err(ConfigError::EmptyCollection);
        }
        Ok(Self { collection })
    }

    /// Name of the collection holding patient documents.
    pub fn collection(&self) -> &str {
        &self.collection
    }
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self {
            collection: DEFAULT_COLLECTION.to_owned(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_uses_pacientes_collection() {
        assert_eq!(CoreConfig::default().collection(), "pacientes");
    }

    #[test]
    fn new_rejects_blank_collection() {
        let err = CoreConfig::new("   ").expect_err("blank collection should fail");
        assert!(matches!(err, ConfigError::EmptyCollection));
    }
}
