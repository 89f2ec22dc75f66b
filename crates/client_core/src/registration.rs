use std::sync::Arc;

use shared::{
    domain::Service,
    protocol::{routes, KeyValidation, RegisterRequest, RegisteredUser},
};
use tracing::{info, warn};

use crate::{
    credential::Credential,
    error::{RequestOutcome, ServiceError},
    gateway::{ServiceCall, ServiceGateway},
    guard::InFlight,
    session::Session,
    view::View,
    vocabulary::VocabularyController,
};

/// One-shot registration that seeds the session credential.
pub struct RegistrationController {
    gateway: Arc<ServiceGateway>,
    session: Arc<Session>,
    view: Arc<View>,
    vocabulary: Option<Arc<VocabularyController>>,
    registering: InFlight,
}

impl RegistrationController {
    pub fn new(
        gateway: Arc<ServiceGateway>,
        session: Arc<Session>,
        view: Arc<View>,
        vocabulary: Option<Arc<VocabularyController>>,
    ) -> Self {
        Self {
            gateway,
            session,
            view,
            vocabulary,
            registering: InFlight::new("Registration"),
        }
    }

    /// Registers and stores the issued key. Username and password are sent
    /// as given; the user service is the only validator.
    pub async fn register(&self, username: &str, password: &str) -> RequestOutcome<RegisteredUser> {
        let _flight = self.surface(self.registering.try_begin()).await?;

        let outcome = match ServiceCall::post(Service::User, routes::REGISTER, "Registration failed")
            .json(&RegisterRequest {
                username: username.to_string(),
                password: password.to_string(),
            }) {
            Ok(call) => self
                .gateway
                .call_anonymous(call)
                .await
                .and_then(|response| response.json::<RegisteredUser>()),
            Err(err) => Err(err),
        };
        let user = self.surface(outcome).await?;

        let Some(credential) = Credential::new(user.api_key.clone()) else {
            return self
                .surface(Err(ServiceError::Decode(
                    "registration response did not include an API key".to_string(),
                )))
                .await;
        };

        info!(username = user.username.as_deref().unwrap_or(username), "registered");
        if let Err(err) = self.session.set_credential(credential).await {
            // the key stays live for this session even though it was not saved
            warn!(error = %format!("{err:#}"), "failed to persist API key");
            self.view.alert(&format!("Error: {err:#}")).await;
        }

        if let Some(vocabulary) = &self.vocabulary {
            vocabulary.reload().await;
        }

        Ok(user)
    }

    /// Asks the user service whether the live key is still recognised.
    pub async fn validate_key(&self) -> RequestOutcome<KeyValidation> {
        let credential = self.session.require_credential().await?;
        self.surface(
            self.gateway
                .call_authenticated(
                    &credential,
                    ServiceCall::get(Service::User, routes::VALIDATE_KEY, "Key validation failed"),
                )
                .await
                .and_then(|response| response.json::<KeyValidation>()),
        )
        .await
    }

    async fn surface<T>(&self, outcome: RequestOutcome<T>) -> RequestOutcome<T> {
        if let Err(err) = &outcome {
            self.view.alert(&err.alert_text()).await;
        }
        outcome
    }
}

#[cfg(test)]
#[path = "tests/registration_tests.rs"]
mod tests;
