//! # Padrón Core
//!
//! Core logic for the Padrón patient roster.
//!
//! This crate contains the patient data model and the two components that
//! sit between a UI and the document store:
//! - [`PatientDirectory`]: bridges a live collection in the store to a
//!   decoded, continuously updated patient list, and performs the
//!   create/update/delete writes.
//! - [`PatientForm`]: owns the editable form, its validation state and the
//!   create/edit mode switch, and drives the directory.
//!
//! **No UI concerns**: rendering, routing and styling belong to the host
//! application; alerts, confirmations and authentication are consumed
//! through the capability traits in [`surface`] and [`auth`].

pub mod adapter;
pub mod auth;
pub mod config;
pub mod dates;
pub mod error;
pub mod form;
pub mod patient;
pub mod surface;
pub mod validation;

pub use adapter::{PatientDirectory, PatientPatch};
pub use auth::{AuthError, AuthService, StaticAuth, UserProfile};
pub use config::CoreConfig;
pub use error::{ConfigError, FieldError, PersistenceError};
pub use form::{
    DeleteOutcome, Field, FieldState, FieldStates, FormFields, FormOutcome, PatientForm,
};
pub use patient::{NewPatient, PatientFields, PersistedPatient, PersonName};
pub use surface::{Confirmer, Notifier, NoopSurface, UiSurface};

pub use padron_types::{EmailAddress, NonEmptyText, TextError};
