use std::sync::Arc;

use shared::{
    domain::Service,
    protocol::{routes, TranslateRequest, TranslationResult},
};
use tracing::{debug, info};

use crate::{
    error::{RequestOutcome, ServiceError},
    gateway::{ServiceCall, ServiceGateway},
    guard::InFlight,
    session::Session,
    view::View,
};

pub const EMPTY_TEXT: &str = "Please enter some text to translate";

pub struct TranslationController {
    gateway: Arc<ServiceGateway>,
    session: Arc<Session>,
    view: Arc<View>,
    placeholder: Option<String>,
    translating: InFlight,
}

impl TranslationController {
    pub fn new(
        gateway: Arc<ServiceGateway>,
        session: Arc<Session>,
        view: Arc<View>,
        placeholder: Option<String>,
    ) -> Self {
        Self {
            gateway,
            session,
            view,
            placeholder,
            translating: InFlight::new("Translation"),
        }
    }

    /// Translates the trimmed `text`. Failures are written into the output
    /// field and raised as an alert, and hide the preprocessing panel.
    pub async fn translate(&self, text: &str) -> RequestOutcome<TranslationResult> {
        let credential = self.session.require_credential().await?;

        let text = text.trim();
        if text.is_empty() {
            let err = ServiceError::validation(EMPTY_TEXT);
            self.view.alert(&err.alert_text()).await;
            return Err(err);
        }

        let _flight = match self.translating.try_begin() {
            Ok(flight) => flight,
            Err(err) => {
                self.view.alert(&err.alert_text()).await;
                return Err(err);
            }
        };

        let input = text.to_string();
        let placeholder = self.placeholder.clone();
        self.view
            .update(|screen| {
                screen.translation_input = input;
                if let Some(placeholder) = placeholder {
                    screen.translation_output = placeholder;
                }
            })
            .await;

        let outcome = match ServiceCall::post(Service::Translation, routes::TRANSLATE, "Translation failed")
            .json(&TranslateRequest {
                text: text.to_string(),
            }) {
            Ok(call) => self
                .gateway
                .call_authenticated(&credential, call)
                .await
                .and_then(|response| response.json::<TranslationResult>()),
            Err(err) => Err(err),
        };

        match outcome {
            Ok(result) => {
                let output = result.translation.clone();
                let panel = result.visible_preprocessing().map(str::to_string);
                info!(
                    chars = text.chars().count(),
                    preprocessed = panel.is_some(),
                    "translation received"
                );
                if let Some(note) = &result.note {
                    debug!(note = %note, "translation service note");
                }
                self.view
                    .update(|screen| {
                        screen.translation_output = output;
                        screen.preprocessing_panel = panel;
                    })
                    .await;
                Ok(result)
            }
            Err(err) => {
                let output = err.output_text();
                self.view
                    .update(|screen| {
                        screen.translation_output = output;
                        screen.preprocessing_panel = None;
                    })
                    .await;
                self.view.alert(&err.alert_text()).await;
                Err(err)
            }
        }
    }
}

#[cfg(test)]
#[path = "tests/translation_tests.rs"]
mod tests;
