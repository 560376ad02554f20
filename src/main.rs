use std::sync::Arc;

use padron_core::{
    Confirmer, CoreConfig, Field, FormOutcome, NoopSurface, Notifier, PatientDirectory,
    PatientForm, StaticAuth,
};
use padron_store::MemoryStore;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Notifier that prints through the tracing pipeline.
struct LogNotifier;

impl Notifier for LogNotifier {
    fn success(&self, message: &str) {
        tracing::info!("✅ {message}");
    }

    fn failure(&self, message: &str) {
        tracing::error!("❌ {message}");
    }

    fn warning(&self, message: &str) {
        tracing::warn!("{message}");
    }
}

/// Confirmer that always accepts; the demo has no interactive prompt.
struct AutoConfirmer;

impl Confirmer for AutoConfirmer {
    fn confirm(&self, question: &str) -> bool {
        tracing::info!("{question} -> sí");
        true
    }
}

/// Walks one full roster session against the embedded store: subscribe,
/// create two patients, edit one, delete the other, log out.
///
/// # Environment Variables
/// - `PADRON_COLLECTION`: patient collection name (default: "pacientes")
///
/// # Returns
/// * `Ok(())` - If the session runs to completion
/// * `Err(anyhow::Error)` - If configuration or any store operation fails
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("padron=info".parse()?),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let collection =
        std::env::var("PADRON_COLLECTION").unwrap_or_else(|_| "pacientes".to_owned());
    let cfg = CoreConfig::new(collection)?;
    tracing::info!("++ Padrón starting on collection {:?}", cfg.collection());

    let store = MemoryStore::new();
    let directory = PatientDirectory::new(store.clone(), cfg);
    let auth = StaticAuth::signed_in(padron_core::EmailAddress::parse("admin@example.com")?);

    let mut form = PatientForm::new(
        directory,
        auth,
        Arc::new(LogNotifier),
        Arc::new(AutoConfirmer),
        Arc::new(NoopSurface),
    );
    form.load_all();

    if let Some(user) = form.current_user() {
        tracing::info!("sesión iniciada como {}", user.email);
    }

    // Create two patients through the form.
    form.set_field(Field::Nombre, "Ana");
    form.set_field(Field::Apellidos, "García López");
    form.set_field(Field::FechaNacimiento, "1990-05-02");
    form.set_field(Field::Domicilio, "Calle Mayor 1");
    form.set_field(Field::CorreoElectronico, "ana@example.com");
    form.submit().await;

    form.set_field(Field::Nombre, "Luis");
    form.set_field(Field::Apellidos, "Pérez Ruiz");
    form.set_field(Field::FechaNacimiento, "1985-11-23");
    form.set_field(Field::Domicilio, "Avenida del Sol 9");
    form.set_field(Field::CorreoElectronico, "luis@example.com");
    let luis = match form.submit().await {
        FormOutcome::Created(id) => id,
        other => anyhow::bail!("expected a created patient, got {other:?}"),
    };

    log_roster(&form);

    // Edit Ana's address; the list catches up through the subscription.
    let ana = form
        .patients()
        .into_iter()
        .find(|p| p.fields.nombre.as_str() == "Ana")
        .ok_or_else(|| anyhow::anyhow!("Ana should be in the roster"))?;
    form.begin_edit(&ana);
    form.set_field(Field::Domicilio, "Calle X");
    form.submit().await;

    // Delete Luis.
    form.request_delete(&luis).await;
    log_roster(&form);

    form.logout().await?;
    tracing::info!("sesión cerrada");
    form.detach();

    Ok(())
}

fn log_roster(form: &PatientForm<MemoryStore, StaticAuth>) {
    let patients = form.patients();
    tracing::info!("roster: {} paciente(s)", patients.len());
    for patient in patients {
        tracing::info!(
            "  {} {} — nacido {} — {} — {}",
            patient.fields.nombre,
            patient.fields.apellidos,
            patient.fields.fecha_nacimiento,
            patient.fields.domicilio,
            patient.fields.correo_electronico
        );
    }
}
