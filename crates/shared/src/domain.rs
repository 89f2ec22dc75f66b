use std::fmt;

use serde::{Deserialize, Serialize};

macro_rules! id_newtype {
    ($name:ident) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub i64);

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

id_newtype!(UserId);
id_newtype!(EntryId);

/// Backend service a request is addressed to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Service {
    User,
    Vocabulary,
    Translation,
}

impl Service {
    pub const ALL: [Service; 3] = [Service::User, Service::Vocabulary, Service::Translation];

    pub fn name(self) -> &'static str {
        match self {
            Service::User => "user",
            Service::Vocabulary => "vocabulary",
            Service::Translation => "translation",
        }
    }
}

impl fmt::Display for Service {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A stored English/Spanish term pair. The field names follow the
/// vocabulary service's column names on the wire.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VocabularyEntry {
    pub id: EntryId,
    #[serde(rename = "English")]
    pub english: String,
    #[serde(rename = "Spanish")]
    pub spanish: String,
}
