use std::{
    collections::HashMap,
    fs,
    path::{Path, PathBuf},
};

use anyhow::{anyhow, Context, Result};
use shared::domain::Service;
use url::Url;

pub const DEFAULT_SETTINGS_FILE: &str = "client.toml";
pub const DEFAULT_STORAGE_KEY: &str = "apiKey";
pub const DEFAULT_ORIGIN: &str = "http://localhost:8080";
pub const DEFAULT_SINGLE_BASE_URL: &str = "http://localhost:5000";
pub const DEFAULT_TRANSLATION_PLACEHOLDER: &str = "Translating...";

/// Where the three backend services live.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServiceAddressing {
    /// One combined service answers every route.
    SingleOrigin { base_url: String },
    /// Each service sits behind its own path prefix on a shared origin.
    PerService {
        origin: String,
        user_prefix: String,
        vocabulary_prefix: String,
        translation_prefix: String,
    },
}

impl ServiceAddressing {
    pub fn single(base_url: impl Into<String>) -> Self {
        Self::SingleOrigin {
            base_url: base_url.into(),
        }
    }

    pub fn split(origin: impl Into<String>) -> Self {
        Self::PerService {
            origin: origin.into(),
            user_prefix: "/user-service".into(),
            vocabulary_prefix: "/vocab-service".into(),
            translation_prefix: "/translation-service".into(),
        }
    }
}

impl Default for ServiceAddressing {
    fn default() -> Self {
        Self::split(DEFAULT_ORIGIN)
    }
}

/// Validated per-service base addresses.
#[derive(Debug, Clone)]
pub struct ServiceEndpoints {
    user: String,
    vocabulary: String,
    translation: String,
}

impl ServiceEndpoints {
    pub fn new(addressing: &ServiceAddressing) -> Result<Self> {
        let endpoints = match addressing {
            ServiceAddressing::SingleOrigin { base_url } => {
                let base = trim_base(base_url);
                Self {
                    user: base.clone(),
                    vocabulary: base.clone(),
                    translation: base,
                }
            }
            ServiceAddressing::PerService {
                origin,
                user_prefix,
                vocabulary_prefix,
                translation_prefix,
            } => {
                let origin = trim_base(origin);
                Self {
                    user: join(&origin, user_prefix),
                    vocabulary: join(&origin, vocabulary_prefix),
                    translation: join(&origin, translation_prefix),
                }
            }
        };

        for service in Service::ALL {
            let base = endpoints.base(service);
            let parsed = Url::parse(base)
                .with_context(|| format!("invalid {service} service address '{base}'"))?;
            if parsed.cannot_be_a_base() {
                return Err(anyhow!("{service} service address '{base}' is not a base url"));
            }
        }

        Ok(endpoints)
    }

    pub fn base(&self, service: Service) -> &str {
        match service {
            Service::User => &self.user,
            Service::Vocabulary => &self.vocabulary,
            Service::Translation => &self.translation,
        }
    }

    pub fn resolve(&self, service: Service, path: &str) -> Result<Url, url::ParseError> {
        Url::parse(&join(self.base(service), path))
    }
}

fn trim_base(raw: &str) -> String {
    raw.trim().trim_end_matches('/').to_string()
}

fn join(base: &str, path: &str) -> String {
    let path = path.trim();
    let path = path.trim_start_matches('/');
    if path.is_empty() {
        return base.trim_end_matches('/').to_string();
    }
    format!("{}/{path}", base.trim_end_matches('/'))
}

#[derive(Debug, Clone)]
pub struct ClientSettings {
    pub addressing: ServiceAddressing,
    /// `None` resolves to the per-user data directory at startup.
    pub credential_path: Option<PathBuf>,
    pub storage_key: String,
    pub translation_placeholder: Option<String>,
}

impl Default for ClientSettings {
    fn default() -> Self {
        Self {
            addressing: ServiceAddressing::default(),
            credential_path: None,
            storage_key: DEFAULT_STORAGE_KEY.into(),
            translation_placeholder: Some(DEFAULT_TRANSLATION_PLACEHOLDER.into()),
        }
    }
}

impl ClientSettings {
    pub fn endpoints(&self) -> Result<ServiceEndpoints> {
        ServiceEndpoints::new(&self.addressing)
    }

    pub fn resolved_credential_path(&self) -> Result<PathBuf> {
        if let Some(path) = &self.credential_path {
            return Ok(path.clone());
        }
        let base = dirs::data_local_dir()
            .ok_or_else(|| anyhow!("unable to resolve local app data dir"))?;
        Ok(base.join("lingo").join("credentials.json"))
    }
}

/// Loads settings from `path` (or `client.toml` in the working directory when
/// present) and applies `APP__*` environment overrides.
pub fn load_settings(path: Option<&Path>) -> Result<ClientSettings> {
    let mut settings = ClientSettings::default();

    let file = path.unwrap_or_else(|| Path::new(DEFAULT_SETTINGS_FILE));
    match fs::read_to_string(file) {
        Ok(raw) => {
            let values = toml::from_str::<HashMap<String, String>>(&raw)
                .with_context(|| format!("failed to parse settings file '{}'", file.display()))?;
            apply_values(&mut settings, |key| values.get(key).cloned())?;
        }
        Err(err) if path.is_none() && err.kind() == std::io::ErrorKind::NotFound => {}
        Err(err) => {
            return Err(err)
                .with_context(|| format!("failed to read settings file '{}'", file.display()));
        }
    }

    apply_values(&mut settings, |key| {
        std::env::var(format!("APP__{}", key.to_ascii_uppercase())).ok()
    })?;

    Ok(settings)
}

/// Applies flat key/value overrides. `mode` picks the addressing variant;
/// address keys for the other variant are ignored.
pub(crate) fn apply_values<F>(settings: &mut ClientSettings, lookup: F) -> Result<()>
where
    F: Fn(&str) -> Option<String>,
{
    match lookup("mode").as_deref().map(str::trim) {
        Some("single") => {
            if !matches!(settings.addressing, ServiceAddressing::SingleOrigin { .. }) {
                settings.addressing = ServiceAddressing::single(DEFAULT_SINGLE_BASE_URL);
            }
        }
        Some("split") => {
            if !matches!(settings.addressing, ServiceAddressing::PerService { .. }) {
                settings.addressing = ServiceAddressing::split(DEFAULT_ORIGIN);
            }
        }
        Some(other) => {
            return Err(anyhow!(
                "unknown service mode '{other}', expected 'single' or 'split'"
            ))
        }
        None => {}
    }

    match &mut settings.addressing {
        ServiceAddressing::SingleOrigin { base_url } => {
            if let Some(v) = lookup("base_url") {
                *base_url = v;
            }
        }
        ServiceAddressing::PerService {
            origin,
            user_prefix,
            vocabulary_prefix,
            translation_prefix,
        } => {
            if let Some(v) = lookup("origin") {
                *origin = v;
            }
            if let Some(v) = lookup("user_service_prefix") {
                *user_prefix = v;
            }
            if let Some(v) = lookup("vocab_service_prefix") {
                *vocabulary_prefix = v;
            }
            if let Some(v) = lookup("translation_service_prefix") {
                *translation_prefix = v;
            }
        }
    }

    if let Some(v) = lookup("credential_path") {
        settings.credential_path = Some(PathBuf::from(v));
    }
    if let Some(v) = lookup("storage_key") {
        if v.trim().is_empty() {
            return Err(anyhow!("storage_key must not be empty"));
        }
        settings.storage_key = v;
    }
    if let Some(v) = lookup("translation_placeholder") {
        settings.translation_placeholder = if v.is_empty() { None } else { Some(v) };
    }

    Ok(())
}

#[cfg(test)]
#[path = "tests/config_tests.rs"]
mod tests;
