use std::sync::Arc;

use anyhow::Result;

use crate::{
    credential::{Credential, CredentialBackend, CredentialStore},
    error::{RequestOutcome, ServiceError},
    view::View,
};

/// Credential lifecycle shared by every controller.
pub struct Session {
    store: CredentialStore,
    view: Arc<View>,
}

impl Session {
    /// Opens the store and shows the credential indicator when a persisted
    /// key was found.
    pub async fn restore(
        backend: Arc<dyn CredentialBackend>,
        storage_key: &str,
        view: Arc<View>,
    ) -> Result<Arc<Self>> {
        let store = CredentialStore::open(backend, storage_key).await?;
        if let Some(credential) = store.get().await {
            show_indicator(&view, &credential).await;
        }
        Ok(Arc::new(Self { store, view }))
    }

    pub async fn credential(&self) -> Option<Credential> {
        self.store.get().await
    }

    pub async fn is_authenticated(&self) -> bool {
        self.store.get().await.is_some()
    }

    /// Returns the live credential, or alerts and fails without touching the network.
    pub async fn require_credential(&self) -> RequestOutcome<Credential> {
        match self.store.get().await {
            Some(credential) => Ok(credential),
            None => {
                let err = ServiceError::missing_credential();
                self.view.alert(&err.alert_text()).await;
                Err(err)
            }
        }
    }

    /// Makes `credential` live for every controller, shows it, and persists it.
    pub async fn set_credential(&self, credential: Credential) -> Result<()> {
        let persisted = self.store.set(credential.clone()).await;
        show_indicator(&self.view, &credential).await;
        persisted
    }
}

async fn show_indicator(view: &View, credential: &Credential) {
    let key = credential.expose().to_string();
    view.update(|screen| screen.credential_indicator = Some(key))
        .await;
}
