//! Patient store adapter.
//!
//! [`PatientDirectory`] bridges the patient collection in the document store
//! and the application's in-memory patient list. It owns the document
//! encoding (camelCase keys, birth date as a UTC-midnight timestamp, never
//! an `id` key in the body) so that the rest of the system only ever sees
//! [`PersistedPatient`] values and form-ready dates, never store wrapper
//! shapes.
//!
//! List updates propagate exclusively through the live subscription; the
//! mutating calls do not touch the list themselves.

use crate::config::CoreConfig;
use crate::dates::{date_from_store_timestamp, store_timestamp_from_date};
use crate::error::PersistenceError;
use crate::patient::{NewPatient, PatientFields, PersistedPatient, PersonName};
use chrono::{DateTime, NaiveDate, Utc};
use padron_store::{
    Document, DocumentId, DocumentStore, Snapshot, SnapshotListener, StoreError, WatchHandle,
};
use padron_types::{EmailAddress, NonEmptyText};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Wire shape of a patient document body.
///
/// The id is deliberately absent: it lives beside the body, assigned by the
/// store, and must never be written back into it.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StoredPatient {
    nombre: String,
    apellidos: String,
    fecha_nacimiento: DateTime<Utc>,
    domicilio: String,
    correo_electronico: String,
}

impl From<&PatientFields> for StoredPatient {
    fn from(fields: &PatientFields) -> Self {
        Self {
            nombre: fields.nombre.as_str().to_owned(),
            apellidos: fields.apellidos.as_str().to_owned(),
            fecha_nacimiento: store_timestamp_from_date(fields.fecha_nacimiento),
            domicilio: fields.domicilio.as_str().to_owned(),
            correo_electronico: fields.correo_electronico.as_str().to_owned(),
        }
    }
}

impl StoredPatient {
    fn into_fields(self) -> Result<PatientFields, crate::error::FieldError> {
        Ok(PatientFields {
            nombre: PersonName::parse_nombre(&self.nombre)?,
            apellidos: PersonName::parse_apellidos(&self.apellidos)?,
            fecha_nacimiento: date_from_store_timestamp(self.fecha_nacimiento),
            domicilio: NonEmptyText::new(&self.domicilio)
                .map_err(|_| crate::error::FieldError::Required)?,
            correo_electronico: EmailAddress::parse(&self.correo_electronico)
                .map_err(|_| crate::error::FieldError::InvalidEmail)?,
        })
    }
}

fn encode_document(value: impl Serialize) -> Result<Document, PersistenceError> {
    match serde_json::to_value(value).map_err(PersistenceError::Serialization)? {
        Value::Object(map) => Ok(map),
        // StoredPatient and PatientPatch always serialize to objects.
        other => Err(PersistenceError::Serialization(serde::ser::Error::custom(
            format!("patient document must be an object, got {other}"),
        ))),
    }
}

fn decode_document(id: &DocumentId, body: Document) -> Option<PersistedPatient> {
    let stored: StoredPatient = match serde_json::from_value(Value::Object(body)) {
        Ok(stored) => stored,
        Err(error) => {
            tracing::warn!(id = %id, %error, "skipping undecodable patient document");
            return None;
        }
    };
    match stored.into_fields() {
        Ok(fields) => Some(PersistedPatient {
            id: id.clone(),
            fields,
        }),
        Err(error) => {
            tracing::warn!(id = %id, %error, "skipping patient document with invalid fields");
            None
        }
    }
}

/// A merge-update payload: only the present fields are written.
///
/// Built either field by field or from a whole [`NewPatient`] when the form
/// re-submits every field in edit mode.
#[derive(Debug, Default, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PatientPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    nombre: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    apellidos: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    fecha_nacimiento: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    domicilio: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    correo_electronico: Option<String>,
}

impl PatientPatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn nombre(mut self, value: &PersonName) -> Self {
        self.nombre = Some(value.as_str().to_owned());
        self
    }

    pub fn apellidos(mut self, value: &PersonName) -> Self {
        self.apellidos = Some(value.as_str().to_owned());
        self
    }

    pub fn fecha_nacimiento(mut self, value: NaiveDate) -> Self {
        self.fecha_nacimiento = Some(store_timestamp_from_date(value));
        self
    }

    pub fn domicilio(mut self, value: &NonEmptyText) -> Self {
        self.domicilio = Some(value.as_str().to_owned());
        self
    }

    pub fn correo_electronico(mut self, value: &EmailAddress) -> Self {
        self.correo_electronico = Some(value.as_str().to_owned());
        self
    }

    /// Reports whether the patch carries no fields at all.
    pub fn is_empty(&self) -> bool {
        self.nombre.is_none()
            && self.apellidos.is_none()
            && self.fecha_nacimiento.is_none()
            && self.domicilio.is_none()
            && self.correo_electronico.is_none()
    }
}

impl From<&NewPatient> for PatientPatch {
    /// A full-field patch, as submitted when editing an existing patient.
    fn from(patient: &NewPatient) -> Self {
        let fields = &patient.fields;
        Self::new()
            .nombre(&fields.nombre)
            .apellidos(&fields.apellidos)
            .fecha_nacimiento(fields.fecha_nacimiento)
            .domicilio(&fields.domicilio)
            .correo_electronico(&fields.correo_electronico)
    }
}

/// Listener that decodes raw snapshots into patient lists before forwarding
/// them.
struct DecodingListener<C, E> {
    on_change: C,
    on_error: Option<E>,
}

impl<C, E> SnapshotListener for DecodingListener<C, E>
where
    C: FnMut(Vec<PersistedPatient>) + Send,
    E: FnOnce(StoreError) + Send,
{
    fn on_snapshot(&mut self, snapshot: Snapshot) {
        let patients = snapshot
            .into_iter()
            .filter_map(|(id, body)| decode_document(&id, body))
            .collect();
        (self.on_change)(patients);
    }

    fn on_error(&mut self, error: StoreError) {
        if let Some(on_error) = self.on_error.take() {
            on_error(error);
        }
    }
}

/// Bridge between the live patient collection and the in-memory list, plus
/// the three persistence writes.
#[derive(Clone, Debug)]
pub struct PatientDirectory<S> {
    store: S,
    cfg: CoreConfig,
}

impl<S: DocumentStore> PatientDirectory<S> {
    /// Creates a directory over the configured patient collection.
    pub fn new(store: S, cfg: CoreConfig) -> Self {
        Self { store, cfg }
    }

    /// Establishes a live subscription to the full patient collection.
    ///
    /// `on_change` receives the complete, decoded, ordered patient list on
    /// the initial snapshot and on every subsequent change, by anyone.
    /// Documents that fail to decode are logged and skipped. `on_error` is
    /// called at most once and terminates the subscription.
    ///
    /// The returned handle is the only way to detach: cancellation is
    /// synchronous and idempotent, and after it returns neither callback
    /// runs again.
    pub fn subscribe<C, E>(&self, on_change: C, on_error: E) -> WatchHandle
    where
        C: FnMut(Vec<PersistedPatient>) + Send + 'static,
        E: FnOnce(StoreError) + Send + 'static,
    {
        self.store.watch(
            self.cfg.collection(),
            Box::new(DecodingListener {
                on_change,
                on_error: Some(on_error),
            }),
        )
    }

    /// Persists a new patient and returns the assigned id.
    ///
    /// The written body never contains an `id` key. The subscribed list is
    /// not updated here; the change arrives through the subscription.
    ///
    /// # Errors
    ///
    /// Returns a `PersistenceError` if the store rejects the write.
    pub async fn create(&self, patient: &NewPatient) -> Result<DocumentId, PersistenceError> {
        let body = encode_document(StoredPatient::from(&patient.fields))?;
        let id = self.store.add(self.cfg.collection(), body).await?;
        Ok(id)
    }

    /// Merges the patch's present fields into the patient identified by
    /// `id`. The id itself is never part of the written payload.
    ///
    /// # Errors
    ///
    /// Returns a `PersistenceError` if the id does not exist or the store
    /// rejects the write.
    pub async fn update(&self, id: &DocumentId, patch: &PatientPatch) -> Result<(), PersistenceError> {
        let body = encode_document(patch)?;
        self.store.merge(self.cfg.collection(), id, body).await?;
        Ok(())
    }

    /// Removes the patient identified by `id`.
    ///
    /// Deleting an unknown id is a no-op success; that is the store's
    /// semantics, documented rather than enforced here.
    ///
    /// # Errors
    ///
    /// Returns a `PersistenceError` if the store rejects the write.
    pub async fn delete(&self, id: &DocumentId) -> Result<(), PersistenceError> {
        self.store.remove(self.cfg.collection(), id).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dates::date_from_form_string;
    use padron_store::MemoryStore;
    use serde_json::json;
    use std::sync::{Arc, Mutex};

    fn fields(nombre: &str, fecha: &str) -> PatientFields {
        PatientFields {
            nombre: PersonName::parse_nombre(nombre).expect("valid nombre"),
            apellidos: PersonName::parse_apellidos("García López").expect("valid apellidos"),
            fecha_nacimiento: date_from_form_string(fecha).expect("valid date"),
            domicilio: NonEmptyText::new("Calle Mayor 1").expect("valid domicilio"),
            correo_electronico: EmailAddress::parse("ana@example.com").expect("valid email"),
        }
    }

    fn directory(store: &MemoryStore) -> PatientDirectory<MemoryStore> {
        PatientDirectory::new(store.clone(), CoreConfig::default())
    }

    fn subscribe_recording(
        directory: &PatientDirectory<MemoryStore>,
    ) -> (WatchHandle, Arc<Mutex<Vec<Vec<PersistedPatient>>>>) {
        let pushes = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&pushes);
        let handle = directory.subscribe(
            move |patients| sink.lock().unwrap().push(patients),
            |_error| {},
        );
        (handle, pushes)
    }

    #[tokio::test]
    async fn create_writes_body_without_id_key() {
        let store = MemoryStore::new();
        let directory = directory(&store);

        let id = directory
            .create(&NewPatient::new(fields("Ana", "1990-05-02")))
            .await
            .expect("create should succeed");

        let body = store.get("pacientes", &id).expect("document should exist");
        assert!(!body.contains_key("id"), "body must not carry an id key");
        assert_eq!(body["nombre"], json!("Ana"));
        assert_eq!(body["apellidos"], json!("García López"));
        assert_eq!(body["domicilio"], json!("Calle Mayor 1"));
        assert_eq!(body["correoElectronico"], json!("ana@example.com"));
        assert_eq!(
            body["fechaNacimiento"],
            json!("1990-05-02T00:00:00Z"),
            "birth date stored as UTC-midnight timestamp"
        );
    }

    #[tokio::test]
    async fn subscription_decodes_store_dates_for_the_caller() {
        let store = MemoryStore::new();
        let directory = directory(&store);
        directory
            .create(&NewPatient::new(fields("Ana", "1990-05-02")))
            .await
            .expect("create");

        let (_handle, pushes) = subscribe_recording(&directory);
        let pushes = pushes.lock().unwrap();
        assert_eq!(pushes.len(), 1, "initial snapshot only");
        assert_eq!(pushes[0].len(), 1);
        assert_eq!(
            pushes[0][0].fields.fecha_nacimiento,
            date_from_form_string("1990-05-02").unwrap()
        );
    }

    #[tokio::test]
    async fn subscription_pushes_on_every_change() {
        let store = MemoryStore::new();
        let directory = directory(&store);
        let (_handle, pushes) = subscribe_recording(&directory);

        let id = directory
            .create(&NewPatient::new(fields("Ana", "1990-05-02")))
            .await
            .expect("create");
        directory.delete(&id).await.expect("delete");

        let pushes = pushes.lock().unwrap();
        assert_eq!(pushes.len(), 3, "initial, after create, after delete");
        assert!(pushes[0].is_empty());
        assert_eq!(pushes[1].len(), 1);
        assert!(pushes[2].is_empty());
    }

    #[tokio::test]
    async fn subscription_skips_undecodable_documents() {
        let store = MemoryStore::new();
        let mut junk = Document::new();
        junk.insert("nombre".into(), json!(42));
        store.add("pacientes", junk).await.expect("add junk");

        let directory = directory(&store);
        directory
            .create(&NewPatient::new(fields("Ana", "1990-05-02")))
            .await
            .expect("create");

        let (_handle, pushes) = subscribe_recording(&directory);
        let pushes = pushes.lock().unwrap();
        assert_eq!(
            pushes[0].len(),
            1,
            "the undecodable document is skipped, the valid one delivered"
        );
        assert_eq!(pushes[0][0].fields.nombre.as_str(), "Ana");
    }

    #[tokio::test]
    async fn update_merges_only_patch_fields_and_never_the_id() {
        let store = MemoryStore::new();
        let directory = directory(&store);
        let id = directory
            .create(&NewPatient::new(fields("Ana", "1990-05-02")))
            .await
            .expect("create");

        let nuevo_domicilio = NonEmptyText::new("Calle X").unwrap();
        directory
            .update(&id, &PatientPatch::new().domicilio(&nuevo_domicilio))
            .await
            .expect("update should succeed");

        let body = store.get("pacientes", &id).expect("document should exist");
        assert_eq!(body["domicilio"], json!("Calle X"));
        assert_eq!(body["nombre"], json!("Ana"), "other fields untouched");
        assert!(!body.contains_key("id"), "id never written into the body");
    }

    #[tokio::test]
    async fn update_unknown_id_fails() {
        let store = MemoryStore::new();
        let directory = directory(&store);

        let nuevo_domicilio = NonEmptyText::new("Calle X").unwrap();
        let err = directory
            .update(
                &DocumentId::new("missing"),
                &PatientPatch::new().domicilio(&nuevo_domicilio),
            )
            .await
            .expect_err("update of unknown id should fail");
        assert!(matches!(
            err,
            PersistenceError::Store(StoreError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn full_patch_from_new_patient_covers_every_field() {
        let patient = NewPatient::new(fields("Ana", "1990-05-02"));
        let patch = PatientPatch::from(&patient);
        let body = encode_document(&patch).expect("patch should encode");
        assert_eq!(body.len(), 5, "all five fields present, no id");
        assert!(!body.contains_key("id"));
    }

    #[tokio::test]
    async fn cancelled_subscription_stops_receiving() {
        let store = MemoryStore::new();
        let directory = directory(&store);
        let (handle, pushes) = subscribe_recording(&directory);

        handle.cancel();
        directory
            .create(&NewPatient::new(fields("Ana", "1990-05-02")))
            .await
            .expect("create");

        assert_eq!(pushes.lock().unwrap().len(), 1, "initial snapshot only");
    }

    #[tokio::test]
    async fn subscription_error_reaches_on_error_once() {
        let store = MemoryStore::new();
        let directory = directory(&store);

        let errors = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&errors);
        let _handle = directory.subscribe(
            |_patients| {},
            move |error| sink.lock().unwrap().push(error),
        );

        store.fail_subscriptions(StoreError::PermissionDenied);
        assert_eq!(errors.lock().unwrap().len(), 1);
    }
}
