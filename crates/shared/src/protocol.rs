use serde::{Deserialize, Serialize};

use crate::domain::{EntryId, UserId};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegisterRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegisteredUser {
    pub api_key: String,
    #[serde(default)]
    pub id: Option<UserId>,
    #[serde(default)]
    pub username: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyValidation {
    pub valid: bool,
    #[serde(default)]
    pub user_id: Option<UserId>,
    #[serde(default)]
    pub username: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewVocabularyEntry {
    #[serde(rename = "English")]
    pub english: String,
    #[serde(rename = "Spanish")]
    pub spanish: String,
}

/// Partial update; absent fields are left untouched by the service.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct VocabularyPatch {
    #[serde(rename = "English", skip_serializing_if = "Option::is_none")]
    pub english: Option<String>,
    #[serde(rename = "Spanish", skip_serializing_if = "Option::is_none")]
    pub spanish: Option<String>,
}

impl VocabularyPatch {
    pub fn is_empty(&self) -> bool {
        self.english.is_none() && self.spanish.is_none()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranslateRequest {
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TranslationResult {
    pub translation: String,
    #[serde(default)]
    pub preprocessed: bool,
    #[serde(default)]
    pub preprocessed_text: Option<String>,
    #[serde(default)]
    pub note: Option<String>,
}

impl TranslationResult {
    /// Preprocessing output worth showing: only when the service flagged the
    /// text as preprocessed and actually returned it.
    pub fn visible_preprocessing(&self) -> Option<&str> {
        if !self.preprocessed {
            return None;
        }
        self.preprocessed_text
            .as_deref()
            .filter(|text| !text.is_empty())
    }
}

/// Route helpers shared by the client and test doubles.
pub mod routes {
    use super::EntryId;

    pub const REGISTER: &str = "/register";
    pub const VALIDATE_KEY: &str = "/validate-key";
    pub const TRANSLATIONS: &str = "/translations";
    pub const TRANSLATE: &str = "/translate";
    pub const HEALTH: &str = "/api";
    pub const API_KEY_HEADER: &str = "X-API-Key";

    pub fn translation(id: EntryId) -> String {
        format!("{TRANSLATIONS}/{}", id.0)
    }
}
