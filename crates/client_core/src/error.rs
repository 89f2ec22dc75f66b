use thiserror::Error;

/// Tagged result every gateway call and controller operation resolves to.
pub type RequestOutcome<T> = std::result::Result<T, ServiceError>;

pub const REGISTER_FIRST: &str = "Please register to get an API key first";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ServiceError {
    /// Rejected locally; no request was issued.
    #[error("{0}")]
    Validation(String),
    /// Non-2xx response whose body carried a JSON error object.
    #[error("{message}")]
    Service { status: u16, message: String },
    /// Non-2xx response whose body was not JSON.
    #[error("{label}: {status_text}")]
    ServiceUnparseable {
        label: &'static str,
        status: u16,
        status_text: String,
    },
    /// The request never completed.
    #[error("{0}")]
    Transport(String),
    /// A body could not be encoded or a 2xx body did not have the expected shape.
    #[error("{0}")]
    Decode(String),
}

impl ServiceError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    pub fn missing_credential() -> Self {
        Self::Validation(REGISTER_FIRST.to_string())
    }

    pub fn is_validation(&self) -> bool {
        matches!(self, Self::Validation(_))
    }

    /// HTTP status of the failed response, if the backend answered at all.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Service { status, .. } | Self::ServiceUnparseable { status, .. } => {
                Some(*status)
            }
            _ => None,
        }
    }

    /// Text raised through the alert channel.
    pub fn alert_text(&self) -> String {
        match self {
            Self::Transport(description) | Self::Decode(description) => {
                format!("Error: {description}")
            }
            other => other.to_string(),
        }
    }

    /// Text written into an output field in place of a result.
    pub fn output_text(&self) -> String {
        format!("Error: {self}")
    }
}
