//! Patient form controller.
//!
//! [`PatientForm`] owns one editable form that represents either a new
//! patient (create mode) or an existing one (edit mode), validates it, and
//! drives the [`PatientDirectory`]. The displayed list is a read-only
//! projection of the live subscription; nothing here ever splices the result
//! of a mutating call into it.
//!
//! State machine: create mode ⇄ edit mode via `begin_edit`, a successful
//! submit, or `cancel_edit`. Deletion is orthogonal to the mode.

use crate::adapter::{PatientDirectory, PatientPatch};
use crate::auth::{AuthError, AuthService, UserProfile};
use crate::dates::{date_from_form_string, form_string_from_date};
use crate::error::{FieldError, PersistenceError};
use crate::patient::{NewPatient, PatientFields, PersistedPatient, PersonName};
use crate::surface::{Confirmer, Notifier, UiSurface};
use crate::validation::{
    validate_correo, validate_domicilio, validate_name, APELLIDOS_MAX_LEN, NOMBRE_MAX_LEN,
};
use padron_store::{DocumentId, DocumentStore, WatchHandle};
use padron_types::NonEmptyText;
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, PoisonError};

/// The form's fields, for addressing per-field state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Field {
    Nombre,
    Apellidos,
    FechaNacimiento,
    Domicilio,
    CorreoElectronico,
}

impl Field {
    /// All form fields, in display order.
    pub const ALL: [Field; 5] = [
        Field::Nombre,
        Field::Apellidos,
        Field::FechaNacimiento,
        Field::Domicilio,
        Field::CorreoElectronico,
    ];
}

/// Raw form values, exactly as the user typed them. The birth date is the
/// `YYYY-MM-DD` form representation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FormFields {
    pub nombre: String,
    pub apellidos: String,
    pub fecha_nacimiento: String,
    pub domicilio: String,
    pub correo_electronico: String,
}

impl FormFields {
    /// The raw value of one field.
    pub fn value(&self, field: Field) -> &str {
        match field {
            Field::Nombre => &self.nombre,
            Field::Apellidos => &self.apellidos,
            Field::FechaNacimiento => &self.fecha_nacimiento,
            Field::Domicilio => &self.domicilio,
            Field::CorreoElectronico => &self.correo_electronico,
        }
    }

    fn value_mut(&mut self, field: Field) -> &mut String {
        match field {
            Field::Nombre => &mut self.nombre,
            Field::Apellidos => &mut self.apellidos,
            Field::FechaNacimiento => &mut self.fecha_nacimiento,
            Field::Domicilio => &mut self.domicilio,
            Field::CorreoElectronico => &mut self.correo_electronico,
        }
    }

    /// Checks one field against its rule.
    ///
    /// # Errors
    ///
    /// Returns the first violated rule for that field.
    pub fn check(&self, field: Field) -> Result<(), FieldError> {
        match field {
            Field::Nombre => validate_name(&self.nombre, NOMBRE_MAX_LEN),
            Field::Apellidos => validate_name(&self.apellidos, APELLIDOS_MAX_LEN),
            Field::FechaNacimiento => date_from_form_string(&self.fecha_nacimiento).map(|_| ()),
            Field::Domicilio => validate_domicilio(&self.domicilio),
            Field::CorreoElectronico => validate_correo(&self.correo_electronico).map(|_| ()),
        }
    }

    /// Validates every field and builds the patient value to persist.
    ///
    /// # Errors
    ///
    /// Returns the violated rule per failing field.
    pub fn validate(&self) -> Result<NewPatient, BTreeMap<Field, FieldError>> {
        fn keep<T>(
            errors: &mut BTreeMap<Field, FieldError>,
            field: Field,
            result: Result<T, FieldError>,
        ) -> Option<T> {
            match result {
                Ok(value) => Some(value),
                Err(error) => {
                    errors.insert(field, error);
                    None
                }
            }
        }

        let mut errors = BTreeMap::new();
        let nombre = keep(
            &mut errors,
            Field::Nombre,
            PersonName::parse_nombre(&self.nombre),
        );
        let apellidos = keep(
            &mut errors,
            Field::Apellidos,
            PersonName::parse_apellidos(&self.apellidos),
        );
        let fecha = keep(
            &mut errors,
            Field::FechaNacimiento,
            date_from_form_string(&self.fecha_nacimiento),
        );
        let domicilio = keep(
            &mut errors,
            Field::Domicilio,
            NonEmptyText::new(&self.domicilio).map_err(|_| FieldError::Required),
        );
        let correo = keep(
            &mut errors,
            Field::CorreoElectronico,
            validate_correo(&self.correo_electronico),
        );

        match (nombre, apellidos, fecha, domicilio, correo) {
            (
                Some(nombre),
                Some(apellidos),
                Some(fecha_nacimiento),
                Some(domicilio),
                Some(correo_electronico),
            ) => Ok(NewPatient::new(PatientFields {
                nombre,
                apellidos,
                fecha_nacimiento,
                domicilio,
                correo_electronico,
            })),
            _ => Err(errors),
        }
    }
}

/// Visual validation state of one field.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum FieldState {
    /// Not interacted with yet; no validation message shown.
    #[default]
    Untouched,
    TouchedValid,
    TouchedInvalid(FieldError),
}

/// Per-field visual state for the whole form. Default is all untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldStates(BTreeMap<Field, FieldState>);

impl FieldStates {
    /// The current state of one field.
    pub fn get(&self, field: Field) -> FieldState {
        self.0.get(&field).cloned().unwrap_or_default()
    }

    fn set(&mut self, field: Field, state: FieldState) {
        self.0.insert(field, state);
    }

    /// Whether every field is back to untouched.
    pub fn is_pristine(&self) -> bool {
        Field::ALL
            .iter()
            .all(|field| self.get(*field) == FieldState::Untouched)
    }
}

/// What a submit attempt resulted in.
#[derive(Debug)]
pub enum FormOutcome {
    /// A new patient was persisted under the given id.
    Created(DocumentId),
    /// The edited patient was merged under its existing id.
    Updated(DocumentId),
    /// At least one field failed validation; nothing was persisted.
    Invalid,
    /// The store rejected the write; the form keeps its state for retry.
    Rejected(PersistenceError),
}

/// What a delete request resulted in.
#[derive(Debug)]
pub enum DeleteOutcome {
    /// The user declined the confirmation; nothing happened.
    Declined,
    Deleted,
    Rejected(PersistenceError),
}

/// The form controller.
///
/// Generic over the store backend `S` and the authentication seam `A`; the
/// notification, confirmation and scrolling capabilities are injected as
/// trait objects so tests can substitute recording fakes.
pub struct PatientForm<S, A> {
    directory: PatientDirectory<S>,
    auth: A,
    notifier: Arc<dyn Notifier>,
    confirmer: Arc<dyn Confirmer>,
    surface: Arc<dyn UiSurface>,
    fields: FormFields,
    states: FieldStates,
    editing_id: Option<DocumentId>,
    patients: Arc<Mutex<Vec<PersistedPatient>>>,
    watch: Option<WatchHandle>,
}

impl<S: DocumentStore, A: AuthService> PatientForm<S, A> {
    /// Creates a controller in create mode with empty, untouched fields.
    pub fn new(
        directory: PatientDirectory<S>,
        auth: A,
        notifier: Arc<dyn Notifier>,
        confirmer: Arc<dyn Confirmer>,
        surface: Arc<dyn UiSurface>,
    ) -> Self {
        Self {
            directory,
            auth,
            notifier,
            confirmer,
            surface,
            fields: FormFields::default(),
            states: FieldStates::default(),
            editing_id: None,
            patients: Arc::new(Mutex::new(Vec::new())),
            watch: None,
        }
    }

    /// Subscribes to the patient collection and keeps the displayed list in
    /// sync with every push.
    ///
    /// On a subscription error a non-fatal notice is surfaced and the
    /// last-known list stays displayed; the subscription is not restarted
    /// here. Calling `load_all` again replaces any previous subscription.
    pub fn load_all(&mut self) {
        if let Some(previous) = self.watch.take() {
            previous.cancel();
        }

        let list = Arc::clone(&self.patients);
        let notifier = Arc::clone(&self.notifier);
        let handle = self.directory.subscribe(
            move |patients| {
                *list.lock().unwrap_or_else(PoisonError::into_inner) = patients;
            },
            move |error| {
                tracing::warn!(%error, "patient subscription failed");
                notifier.warning("No se pudo actualizar la lista de pacientes");
            },
        );
        self.watch = Some(handle);
    }

    /// Cancels the live subscription, if any. Safe to call repeatedly.
    pub fn detach(&mut self) {
        if let Some(handle) = self.watch.take() {
            handle.cancel();
        }
    }

    /// The displayed patient list: the latest push from the subscription.
    pub fn patients(&self) -> Vec<PersistedPatient> {
        self.patients
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Current raw form values.
    pub fn fields(&self) -> &FormFields {
        &self.fields
    }

    /// Visual state of one field.
    pub fn field_state(&self, field: Field) -> FieldState {
        self.states.get(field)
    }

    /// The id being edited, or `None` in create mode.
    pub fn editing_id(&self) -> Option<&DocumentId> {
        self.editing_id.as_ref()
    }

    pub fn is_editing(&self) -> bool {
        self.editing_id.is_some()
    }

    /// The signed-in user, for display.
    pub fn current_user(&self) -> Option<UserProfile> {
        self.auth.user()
    }

    /// Sets one field's raw value, marking it touched and re-checking its
    /// rule so validation feedback tracks the input.
    pub fn set_field(&mut self, field: Field, value: impl Into<String>) {
        *self.fields.value_mut(field) = value.into();
        let state = match self.fields.check(field) {
            Ok(()) => FieldState::TouchedValid,
            Err(error) => FieldState::TouchedInvalid(error),
        };
        self.states.set(field, state);
    }

    /// Validates the form and persists it.
    ///
    /// Invalid forms mark every field touched, surface a blocking warning
    /// and never reach the store. Valid forms are created (create mode) or
    /// merge-updated (edit mode); success resets to create mode, a store
    /// rejection preserves the whole form state for retry.
    pub async fn submit(&mut self) -> FormOutcome {
        let patient = match self.fields.validate() {
            Ok(patient) => patient,
            Err(errors) => {
                self.mark_all_touched(&errors);
                self.notifier
                    .warning("Por favor, completa todos los campos correctamente");
                return FormOutcome::Invalid;
            }
        };

        match self.editing_id.clone() {
            None => match self.directory.create(&patient).await {
                Ok(id) => {
                    self.notifier.success("Paciente agregado exitosamente");
                    self.reset_form();
                    FormOutcome::Created(id)
                }
                Err(error) => {
                    tracing::error!(%error, "patient create rejected");
                    self.notifier.failure("Error al agregar el paciente");
                    FormOutcome::Rejected(error)
                }
            },
            Some(id) => {
                match self
                    .directory
                    .update(&id, &PatientPatch::from(&patient))
                    .await
                {
                    Ok(()) => {
                        self.notifier.success("Paciente actualizado exitosamente");
                        self.reset_form();
                        FormOutcome::Updated(id)
                    }
                    Err(error) => {
                        tracing::error!(%error, id = %id, "patient update rejected");
                        self.notifier.failure("Error al actualizar");
                        FormOutcome::Rejected(error)
                    }
                }
            }
        }
    }

    /// Enters edit mode for the given patient, filling the form from its
    /// persisted fields and bringing the form into view.
    pub fn begin_edit(&mut self, patient: &PersistedPatient) {
        self.editing_id = Some(patient.id.clone());
        self.fields = FormFields {
            nombre: patient.fields.nombre.as_str().to_owned(),
            apellidos: patient.fields.apellidos.as_str().to_owned(),
            fecha_nacimiento: form_string_from_date(patient.fields.fecha_nacimiento),
            domicilio: patient.fields.domicilio.as_str().to_owned(),
            correo_electronico: patient.fields.correo_electronico.as_str().to_owned(),
        };
        self.states = FieldStates::default();
        self.surface.scroll_to_form();
    }

    /// Leaves edit mode and clears the form back to empty and untouched.
    pub fn cancel_edit(&mut self) {
        self.reset_form();
    }

    /// Clears every field and returns to create mode.
    pub fn reset_form(&mut self) {
        self.fields = FormFields::default();
        self.states = FieldStates::default();
        self.editing_id = None;
    }

    /// Asks for confirmation and, if granted, deletes the patient.
    ///
    /// The form state is unaffected either way; the list catches up through
    /// the subscription.
    pub async fn request_delete(&self, id: &DocumentId) -> DeleteOutcome {
        if !self
            .confirmer
            .confirm("¿Estás seguro de eliminar este paciente?")
        {
            return DeleteOutcome::Declined;
        }

        match self.directory.delete(id).await {
            Ok(()) => {
                self.notifier.success("Paciente eliminado exitosamente");
                DeleteOutcome::Deleted
            }
            Err(error) => {
                tracing::error!(%error, id = %id, "patient delete rejected");
                self.notifier.failure("Error al eliminar");
                DeleteOutcome::Rejected(error)
            }
        }
    }

    /// Ends the session via the auth seam. Navigation afterwards is the
    /// host's concern.
    ///
    /// # Errors
    ///
    /// Returns an `AuthError` if the auth service rejects the logout.
    pub async fn logout(&self) -> Result<(), AuthError> {
        self.auth.logout().await
    }

    fn mark_all_touched(&mut self, errors: &BTreeMap<Field, FieldError>) {
        for field in Field::ALL {
            let state = match errors.get(&field) {
                Some(error) => FieldState::TouchedInvalid(error.clone()),
                None => FieldState::TouchedValid,
            };
            self.states.set(field, state);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CoreConfig;
    use crate::surface::NoopSurface;
    use crate::StaticAuth;
    use padron_store::{MemoryStore, StoreError};
    use padron_types::EmailAddress;

    /// Notifier that records every message per channel.
    #[derive(Default)]
    struct RecordingNotifier {
        successes: Mutex<Vec<String>>,
        failures: Mutex<Vec<String>>,
        warnings: Mutex<Vec<String>>,
    }

    impl Notifier for RecordingNotifier {
        fn success(&self, message: &str) {
            self.successes.lock().unwrap().push(message.to_owned());
        }

        fn failure(&self, message: &str) {
            self.failures.lock().unwrap().push(message.to_owned());
        }

        fn warning(&self, message: &str) {
            self.warnings.lock().unwrap().push(message.to_owned());
        }
    }

    impl RecordingNotifier {
        fn counts(&self) -> (usize, usize, usize) {
            (
                self.successes.lock().unwrap().len(),
                self.failures.lock().unwrap().len(),
                self.warnings.lock().unwrap().len(),
            )
        }
    }

    /// Confirmer with a fixed answer.
    struct FixedConfirmer(bool);

    impl Confirmer for FixedConfirmer {
        fn confirm(&self, _question: &str) -> bool {
            self.0
        }
    }

    fn build_form(
        store: &MemoryStore,
        confirm: bool,
    ) -> (
        PatientForm<MemoryStore, StaticAuth>,
        Arc<RecordingNotifier>,
    ) {
        let notifier = Arc::new(RecordingNotifier::default());
        let form = PatientForm::new(
            PatientDirectory::new(store.clone(), CoreConfig::default()),
            StaticAuth::signed_in(EmailAddress::parse("admin@example.com").unwrap()),
            Arc::clone(&notifier) as Arc<dyn Notifier>,
            Arc::new(FixedConfirmer(confirm)),
            Arc::new(NoopSurface),
        );
        (form, notifier)
    }

    fn fill_valid(form: &mut PatientForm<MemoryStore, StaticAuth>) {
        form.set_field(Field::Nombre, "Ana");
        form.set_field(Field::Apellidos, "García López");
        form.set_field(Field::FechaNacimiento, "1990-05-02");
        form.set_field(Field::Domicilio, "Calle Mayor 1");
        form.set_field(Field::CorreoElectronico, "ana@example.com");
    }

    #[tokio::test]
    async fn valid_submit_creates_once_and_resets() {
        let store = MemoryStore::new();
        let (mut form, notifier) = build_form(&store, true);
        fill_valid(&mut form);

        let outcome = form.submit().await;
        assert!(matches!(outcome, FormOutcome::Created(_)));
        assert_eq!(store.len("pacientes"), 1, "exactly one create reached the store");
        assert_eq!(notifier.counts(), (1, 0, 0));

        assert_eq!(form.fields(), &FormFields::default(), "fields cleared");
        assert!(form.editing_id().is_none(), "back in create mode");
        assert!(
            form.field_state(Field::Nombre) == FieldState::Untouched,
            "states cleared"
        );
    }

    #[tokio::test]
    async fn invalid_submit_touches_everything_and_skips_the_store() {
        let store = MemoryStore::new();
        let (mut form, notifier) = build_form(&store, true);
        form.set_field(Field::Nombre, "Ana");
        // Everything else left blank.

        let outcome = form.submit().await;
        assert!(matches!(outcome, FormOutcome::Invalid));
        assert!(store.is_empty("pacientes"), "no write may reach the store");
        assert_eq!(notifier.counts(), (0, 0, 1), "one blocking warning");

        for field in Field::ALL {
            assert_ne!(
                form.field_state(field),
                FieldState::Untouched,
                "{field:?} must be marked touched"
            );
        }
        assert_eq!(form.field_state(Field::Nombre), FieldState::TouchedValid);
        assert_eq!(
            form.field_state(Field::Domicilio),
            FieldState::TouchedInvalid(FieldError::Required)
        );
    }

    #[tokio::test]
    async fn displayed_list_tracks_subscription_pushes() {
        let store = MemoryStore::new();
        let (mut form, _notifier) = build_form(&store, true);
        form.load_all();
        assert!(form.patients().is_empty());

        fill_valid(&mut form);
        let outcome = form.submit().await;
        let FormOutcome::Created(id) = outcome else {
            panic!("expected Created, got {outcome:?}");
        };

        let patients = form.patients();
        assert_eq!(patients.len(), 1);
        assert_eq!(patients[0].id, id);
        assert_eq!(patients[0].fields.nombre.as_str(), "Ana");
    }

    #[tokio::test]
    async fn begin_edit_fills_the_form_and_scrolls() {
        let store = MemoryStore::new();
        let (mut form, _notifier) = build_form(&store, true);
        form.load_all();
        fill_valid(&mut form);
        form.submit().await;

        let patient = form.patients().remove(0);
        form.begin_edit(&patient);

        assert_eq!(form.editing_id(), Some(&patient.id));
        assert_eq!(form.fields().fecha_nacimiento, "1990-05-02");
        assert_eq!(form.fields().nombre, "Ana");
        assert!(form.field_state(Field::Nombre) == FieldState::Untouched);
    }

    #[tokio::test]
    async fn cancel_edit_restores_the_pristine_form() {
        let store = MemoryStore::new();
        let (mut form, _notifier) = build_form(&store, true);
        form.load_all();
        fill_valid(&mut form);
        form.submit().await;

        let patient = form.patients().remove(0);
        form.begin_edit(&patient);
        form.cancel_edit();

        assert_eq!(form.fields(), &FormFields::default());
        assert!(form.editing_id().is_none());
        for field in Field::ALL {
            assert_eq!(form.field_state(field), FieldState::Untouched);
        }
    }

    #[tokio::test]
    async fn edit_submit_merges_under_the_same_id() {
        let store = MemoryStore::new();
        let (mut form, notifier) = build_form(&store, true);
        form.load_all();
        fill_valid(&mut form);
        form.submit().await;

        let patient = form.patients().remove(0);
        form.begin_edit(&patient);
        form.set_field(Field::Domicilio, "Calle X");

        let outcome = form.submit().await;
        assert!(matches!(outcome, FormOutcome::Updated(ref id) if *id == patient.id));
        assert_eq!(store.len("pacientes"), 1, "no second document created");
        assert_eq!(notifier.counts(), (2, 0, 0));
        assert!(form.editing_id().is_none(), "back in create mode");

        let body = store
            .get("pacientes", &patient.id)
            .expect("document should exist");
        assert_eq!(body["domicilio"], serde_json::json!("Calle X"));
        assert!(!body.contains_key("id"));
    }

    #[tokio::test]
    async fn rejected_create_preserves_the_form_for_retry() {
        let store = MemoryStore::new();
        let (mut form, notifier) = build_form(&store, true);
        fill_valid(&mut form);
        let before = form.fields().clone();

        store.fail_next_write(StoreError::Unavailable("offline".into()));
        let outcome = form.submit().await;

        assert!(matches!(outcome, FormOutcome::Rejected(_)));
        assert_eq!(form.fields(), &before, "field values unchanged");
        assert!(form.editing_id().is_none(), "mode unchanged");
        assert_eq!(notifier.counts(), (0, 1, 0), "one failure notification");

        // Same submission succeeds once the store recovers.
        let outcome = form.submit().await;
        assert!(matches!(outcome, FormOutcome::Created(_)));
    }

    #[tokio::test]
    async fn declined_confirmation_never_reaches_the_store() {
        let store = MemoryStore::new();
        let (mut form, notifier) = build_form(&store, false);
        form.load_all();
        fill_valid(&mut form);
        form.submit().await;
        let patient = form.patients().remove(0);

        let outcome = form.request_delete(&patient.id).await;
        assert!(matches!(outcome, DeleteOutcome::Declined));
        assert_eq!(store.len("pacientes"), 1, "patient still present");
        assert_eq!(notifier.counts(), (1, 0, 0), "only the earlier create notified");
    }

    #[tokio::test]
    async fn confirmed_delete_removes_and_notifies() {
        let store = MemoryStore::new();
        let (mut form, notifier) = build_form(&store, true);
        form.load_all();
        fill_valid(&mut form);
        form.submit().await;
        let patient = form.patients().remove(0);

        let outcome = form.request_delete(&patient.id).await;
        assert!(matches!(outcome, DeleteOutcome::Deleted));
        assert!(store.is_empty("pacientes"));
        assert!(form.patients().is_empty(), "list caught up via subscription");
        assert_eq!(notifier.counts(), (2, 0, 0));
    }

    #[tokio::test]
    async fn subscription_failure_keeps_last_known_list() {
        let store = MemoryStore::new();
        let (mut form, notifier) = build_form(&store, true);
        form.load_all();
        fill_valid(&mut form);
        form.submit().await;
        assert_eq!(form.patients().len(), 1);

        store.fail_subscriptions(StoreError::PermissionDenied);

        assert_eq!(form.patients().len(), 1, "stale list stays displayed");
        let (_successes, _failures, warnings) = notifier.counts();
        assert_eq!(warnings, 1, "non-fatal notice surfaced");
    }

    #[tokio::test]
    async fn set_field_tracks_per_field_validity() {
        let store = MemoryStore::new();
        let (mut form, _notifier) = build_form(&store, true);

        form.set_field(Field::Nombre, "Al");
        assert_eq!(
            form.field_state(Field::Nombre),
            FieldState::TouchedInvalid(FieldError::TooShort { min: 3 })
        );

        form.set_field(Field::Nombre, "Alba");
        assert_eq!(form.field_state(Field::Nombre), FieldState::TouchedValid);
    }

    #[tokio::test]
    async fn logout_ends_the_session() {
        let store = MemoryStore::new();
        let (form, _notifier) = build_form(&store, true);
        assert!(form.current_user().is_some());

        form.logout().await.expect("logout should succeed");
        assert!(form.current_user().is_none());
    }
}
