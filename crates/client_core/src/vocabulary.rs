use std::sync::Arc;

use shared::{
    domain::{EntryId, Service, VocabularyEntry},
    protocol::{routes, NewVocabularyEntry, VocabularyPatch},
};
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, info};

use crate::{
    error::{RequestOutcome, ServiceError},
    gateway::{ServiceCall, ServiceGateway},
    guard::InFlight,
    session::Session,
    view::{render_vocabulary, View},
};

pub const DELETE_CONFIRMATION: &str = "Are you sure you want to delete this vocabulary item?";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeleteOutcome {
    Deleted,
    /// The user declined the confirmation; nothing was sent.
    Declined,
}

/// List/add/update/delete against the vocabulary service. Every mutation is
/// followed by a full reload; the cached snapshot is only ever replaced whole.
pub struct VocabularyController {
    gateway: Arc<ServiceGateway>,
    session: Arc<Session>,
    view: Arc<View>,
    snapshot: RwLock<Vec<VocabularyEntry>>,
    load_queue: Mutex<()>,
    adding: InFlight,
    updating: InFlight,
    deleting: InFlight,
}

impl VocabularyController {
    pub fn new(gateway: Arc<ServiceGateway>, session: Arc<Session>, view: Arc<View>) -> Self {
        Self {
            gateway,
            session,
            view,
            snapshot: RwLock::new(Vec::new()),
            load_queue: Mutex::new(()),
            adding: InFlight::new("Adding vocabulary"),
            updating: InFlight::new("Updating vocabulary"),
            deleting: InFlight::new("Deleting vocabulary"),
        }
    }

    /// Last list the backend returned.
    pub async fn snapshot(&self) -> Vec<VocabularyEntry> {
        self.snapshot.read().await.clone()
    }

    /// Fetches the full list and re-renders it. Concurrent loads run one
    /// after another. A failed load leaves the rendered table untouched.
    pub async fn load(&self) -> RequestOutcome<Vec<VocabularyEntry>> {
        let credential = self.session.require_credential().await?;
        let _queued = self.load_queue.lock().await;

        let entries = self
            .surface(
                self.gateway
                    .call_authenticated(
                        &credential,
                        ServiceCall::get(
                            Service::Vocabulary,
                            routes::TRANSLATIONS,
                            "Failed to load vocabulary",
                        ),
                    )
                    .await
                    .and_then(|response| response.json::<Vec<VocabularyEntry>>()),
            )
            .await?;

        debug!(count = entries.len(), "vocabulary loaded");
        *self.snapshot.write().await = entries.clone();
        let table = render_vocabulary(&entries);
        self.view.update(|screen| screen.vocabulary = table).await;
        Ok(entries)
    }

    /// Sends the pair as-is; on success clears the form and reloads.
    pub async fn add(&self, english: &str, spanish: &str) -> RequestOutcome<()> {
        let credential = self.session.require_credential().await?;
        let _flight = self.surface(self.adding.try_begin()).await?;

        let call = ServiceCall::post(
            Service::Vocabulary,
            routes::TRANSLATIONS,
            "Failed to add vocabulary",
        )
        .json(&NewVocabularyEntry {
            english: english.to_string(),
            spanish: spanish.to_string(),
        });
        let outcome = match call {
            Ok(call) => self.gateway.call_authenticated(&credential, call).await,
            Err(err) => Err(err),
        };
        self.surface(outcome).await?;

        info!("vocabulary entry added");
        self.view
            .update(|screen| {
                screen.english_term.clear();
                screen.spanish_term.clear();
            })
            .await;
        self.reload().await;
        Ok(())
    }

    /// Partial update of one entry followed by a reload.
    pub async fn update(&self, id: EntryId, patch: VocabularyPatch) -> RequestOutcome<VocabularyEntry> {
        let credential = self.session.require_credential().await?;
        if patch.is_empty() {
            return self
                .surface(Err(ServiceError::validation("Nothing to update")))
                .await;
        }
        let _flight = self.surface(self.updating.try_begin()).await?;

        let outcome = match ServiceCall::put(
            Service::Vocabulary,
            routes::translation(id),
            "Failed to update vocabulary",
        )
        .json(&patch)
        {
            Ok(call) => self
                .gateway
                .call_authenticated(&credential, call)
                .await
                .and_then(|response| response.json::<VocabularyEntry>()),
            Err(err) => Err(err),
        };
        let entry = self.surface(outcome).await?;

        info!(id = id.0, "vocabulary entry updated");
        self.reload().await;
        Ok(entry)
    }

    /// Asks for confirmation, deletes by id, then reloads.
    pub async fn delete(&self, id: EntryId) -> RequestOutcome<DeleteOutcome> {
        let credential = self.session.require_credential().await?;
        let _flight = self.surface(self.deleting.try_begin()).await?;

        if !self.view.confirm(DELETE_CONFIRMATION).await {
            debug!(id = id.0, "vocabulary delete declined");
            return Ok(DeleteOutcome::Declined);
        }

        self.surface(
            self.gateway
                .call_authenticated(
                    &credential,
                    ServiceCall::delete(
                        Service::Vocabulary,
                        routes::translation(id),
                        "Failed to delete vocabulary",
                    ),
                )
                .await,
        )
        .await?;

        info!(id = id.0, "vocabulary entry deleted");
        self.reload().await;
        Ok(DeleteOutcome::Deleted)
    }

    /// Fetches one entry without touching the snapshot.
    pub async fn get(&self, id: EntryId) -> RequestOutcome<VocabularyEntry> {
        let credential = self.session.require_credential().await?;
        self.surface(
            self.gateway
                .call_authenticated(
                    &credential,
                    ServiceCall::get(
                        Service::Vocabulary,
                        routes::translation(id),
                        "Failed to fetch vocabulary",
                    ),
                )
                .await
                .and_then(|response| response.json::<VocabularyEntry>()),
        )
        .await
    }

    /// Loads for a follow-up refresh; failures are already alerted by
    /// [`Self::load`].
    pub(crate) async fn reload(&self) {
        if let Err(err) = self.load().await {
            debug!(error = %err, "vocabulary refresh failed");
        }
    }

    async fn surface<T>(&self, outcome: RequestOutcome<T>) -> RequestOutcome<T> {
        if let Err(err) = &outcome {
            self.view.alert(&err.alert_text()).await;
        }
        outcome
    }
}

#[cfg(test)]
#[path = "tests/vocabulary_tests.rs"]
mod tests;
