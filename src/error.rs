//! Error types for the catalog reply bot.

/// Configuration-related errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("Missing required configuration: {key}. {hint}")]
    MissingRequired { key: String, hint: String },

    #[error("Invalid configuration value for {key}: {message}")]
    InvalidValue { key: String, message: String },
}

/// Catalog source errors.
#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    #[error("Catalog request failed: {0}")]
    Request(String),

    #[error("Catalog source returned HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Catalog source denied access (HTTP {status})")]
    AuthFailed { status: u16 },

    #[error("Could not obtain catalog credentials: {0}")]
    Credential(String),

    #[error("Invalid catalog payload: {0}")]
    InvalidPayload(String),
}

/// LLM provider errors.
#[derive(Debug, thiserror::Error)]
pub enum LlmError {
    #[error("Provider {provider} request failed: {reason}")]
    RequestFailed { provider: String, reason: String },

    #[error("Invalid response from {provider}: {reason}")]
    InvalidResponse { provider: String, reason: String },
}

/// Chat transport errors.
#[derive(Debug, thiserror::Error)]
pub enum ChannelError {
    #[error("Failed to send response on channel {name}: {reason}")]
    SendFailed { name: String, reason: String },

    #[error("Invalid message format: {0}")]
    InvalidMessage(String),
}

/// Per-request failure kinds.
///
/// Each kind maps to one fixed chat reply; none of them carry text that
/// reaches the end user apart from `GenerationUnavailable`, whose fallback
/// is the rule-based reply produced before the LLM was consulted.
#[derive(Debug, thiserror::Error)]
pub enum ReplyError {
    #[error("No message text in request")]
    InputMissing,

    #[error("Catalog unavailable: {0}")]
    CatalogUnavailable(#[from] CatalogError),

    #[error("Text generation unavailable: {source}")]
    GenerationUnavailable {
        fallback: String,
        #[source]
        source: LlmError,
    },

    #[error("Internal error: {0}")]
    Internal(String),
}

impl ReplyError {
    /// The fixed user-facing text for this failure. Never includes the
    /// underlying error.
    pub fn user_reply(&self) -> String {
        use crate::responder::templates;

        match self {
            Self::InputMissing => templates::NO_MESSAGE.to_string(),
            Self::CatalogUnavailable(_) => templates::CATALOG_UNAVAILABLE.to_string(),
            Self::GenerationUnavailable { fallback, .. } if !fallback.trim().is_empty() => {
                fallback.clone()
            }
            Self::GenerationUnavailable { .. } | Self::Internal(_) => {
                templates::APOLOGY.to_string()
            }
        }
    }
}
