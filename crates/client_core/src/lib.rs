use std::sync::Arc;

use anyhow::Result;
use tracing::debug;

pub mod config;
pub mod credential;
pub mod error;
pub mod gateway;
pub mod guard;
pub mod registration;
pub mod session;
pub mod translation;
pub mod view;
pub mod vocabulary;

pub use config::{load_settings, ClientSettings, ServiceAddressing, ServiceEndpoints};
pub use credential::{
    Credential, CredentialBackend, CredentialStore, FileCredentialBackend, MemoryCredentialBackend,
};
pub use error::{RequestOutcome, ServiceError};
pub use gateway::{Auth, ServiceCall, ServiceGateway, ServiceResponse};
pub use registration::RegistrationController;
pub use session::Session;
pub use translation::TranslationController;
pub use view::{render_vocabulary, Screen, UserPrompt, View, VocabularyRow, VocabularyTable};
pub use vocabulary::{DeleteOutcome, VocabularyController};

/// Session, gateway and the three controllers wired over one view.
pub struct LingoClient {
    pub view: Arc<View>,
    pub session: Arc<Session>,
    pub gateway: Arc<ServiceGateway>,
    pub registration: RegistrationController,
    pub vocabulary: Arc<VocabularyController>,
    pub translation: TranslationController,
}

impl LingoClient {
    /// Restores the session and wires the controllers. Issues no requests.
    pub async fn new(
        settings: &ClientSettings,
        backend: Arc<dyn CredentialBackend>,
        prompt: Arc<dyn UserPrompt>,
    ) -> Result<Self> {
        let gateway = Arc::new(ServiceGateway::new(settings.endpoints()?));
        let view = View::new(prompt);
        let session = Session::restore(backend, &settings.storage_key, Arc::clone(&view)).await?;

        let vocabulary = Arc::new(VocabularyController::new(
            Arc::clone(&gateway),
            Arc::clone(&session),
            Arc::clone(&view),
        ));
        let registration = RegistrationController::new(
            Arc::clone(&gateway),
            Arc::clone(&session),
            Arc::clone(&view),
            Some(Arc::clone(&vocabulary)),
        );
        let translation = TranslationController::new(
            Arc::clone(&gateway),
            Arc::clone(&session),
            Arc::clone(&view),
            settings.translation_placeholder.clone(),
        );

        Ok(Self {
            view,
            session,
            gateway,
            registration,
            vocabulary,
            translation,
        })
    }

    /// [`LingoClient::new`], then loads the vocabulary when a persisted key
    /// was restored.
    pub async fn start(
        settings: &ClientSettings,
        backend: Arc<dyn CredentialBackend>,
        prompt: Arc<dyn UserPrompt>,
    ) -> Result<Self> {
        let client = Self::new(settings, backend, prompt).await?;
        if client.session.is_authenticated().await {
            debug!("restored credential, loading vocabulary");
            client.vocabulary.reload().await;
        }
        Ok(client)
    }
}

#[cfg(test)]
#[path = "tests/support.rs"]
pub(crate) mod test_support;

#[cfg(test)]
#[path = "tests/lib_tests.rs"]
mod tests;
