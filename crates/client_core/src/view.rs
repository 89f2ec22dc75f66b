//! View state the controllers drive, the prompt port, and the vocabulary renderer.

use std::sync::Arc;

use async_trait::async_trait;
use shared::domain::{EntryId, VocabularyEntry};
use tokio::sync::Mutex;
use tracing::debug;

pub const EMPTY_VOCABULARY: &str = "No vocabulary items found";

/// Interactive channels owned by the front-end.
#[async_trait]
pub trait UserPrompt: Send + Sync {
    async fn alert(&self, message: &str);
    async fn confirm(&self, message: &str) -> bool;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VocabularyRow {
    pub id: EntryId,
    pub english: String,
    pub spanish: String,
    /// Entry the row's delete control acts on.
    pub delete_target: EntryId,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum VocabularyTable {
    /// Nothing loaded yet.
    #[default]
    Unloaded,
    Empty,
    Rows(Vec<VocabularyRow>),
}

impl VocabularyTable {
    pub fn rows(&self) -> &[VocabularyRow] {
        match self {
            VocabularyTable::Rows(rows) => rows,
            _ => &[],
        }
    }

    pub fn to_lines(&self) -> Vec<String> {
        match self {
            VocabularyTable::Unloaded => Vec::new(),
            VocabularyTable::Empty => vec![EMPTY_VOCABULARY.to_string()],
            VocabularyTable::Rows(rows) => {
                let id_width = rows
                    .iter()
                    .map(|row| row.id.to_string().len())
                    .max()
                    .unwrap_or(2)
                    .max(2);
                let english_width = rows
                    .iter()
                    .map(|row| row.english.chars().count())
                    .max()
                    .unwrap_or(7)
                    .max(7);
                let mut lines = Vec::with_capacity(rows.len() + 1);
                lines.push(format!(
                    "{:>id_width$}  {:<english_width$}  Spanish",
                    "ID", "English"
                ));
                for row in rows {
                    lines.push(format!(
                        "{:>id_width$}  {:<english_width$}  {}",
                        row.id.to_string(),
                        row.english,
                        row.spanish
                    ));
                }
                lines
            }
        }
    }
}

/// Pure projection of a vocabulary snapshot; keeps backend order.
pub fn render_vocabulary(entries: &[VocabularyEntry]) -> VocabularyTable {
    if entries.is_empty() {
        return VocabularyTable::Empty;
    }
    VocabularyTable::Rows(
        entries
            .iter()
            .map(|entry| VocabularyRow {
                id: entry.id,
                english: entry.english.clone(),
                spanish: entry.spanish.clone(),
                delete_target: entry.id,
            })
            .collect(),
    )
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Screen {
    /// `Some(key)` while the "API key is set" panel is shown.
    pub credential_indicator: Option<String>,
    pub vocabulary: VocabularyTable,
    pub english_term: String,
    pub spanish_term: String,
    pub translation_input: String,
    pub translation_output: String,
    /// `None` while the preprocessing panel is hidden.
    pub preprocessing_panel: Option<String>,
}

pub struct View {
    screen: Mutex<Screen>,
    prompt: Arc<dyn UserPrompt>,
}

impl View {
    pub fn new(prompt: Arc<dyn UserPrompt>) -> Arc<Self> {
        Arc::new(Self {
            screen: Mutex::new(Screen::default()),
            prompt,
        })
    }

    pub async fn update<R>(&self, f: impl FnOnce(&mut Screen) -> R) -> R {
        let mut guard = self.screen.lock().await;
        f(&mut guard)
    }

    pub async fn snapshot(&self) -> Screen {
        self.screen.lock().await.clone()
    }

    pub async fn alert(&self, message: &str) {
        debug!(message, "raising user alert");
        self.prompt.alert(message).await;
    }

    pub async fn confirm(&self, message: &str) -> bool {
        self.prompt.confirm(message).await
    }
}
