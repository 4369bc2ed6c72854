//! Configuration types.
//!
//! Everything comes from the process environment. `from_env()` is a thin
//! wrapper over `from_lookup()` so parsing can be tested without touching
//! the real environment.

use std::net::SocketAddr;
use std::path::PathBuf;

use secrecy::SecretString;

use crate::error::ConfigError;
use crate::llm::{LlmBackend, LlmConfig};
use crate::matcher::SimilarityStrategy;

/// Default sheet header for the product name column.
pub const DEFAULT_NAME_COLUMN: &str = "ชื่อสินค้า";
/// Default sheet header for the reply/link column.
pub const DEFAULT_REPLY_COLUMN: &str = "คำตอบ";
/// Default sheet header for the keyword column.
pub const DEFAULT_KEYWORDS_COLUMN: &str = "คีย์เวิร์ด";

/// Credential used to read the catalog spreadsheet.
#[derive(Debug, Clone)]
pub enum SheetCredential {
    /// Google API key, sent as the `key` query parameter.
    ApiKey(SecretString),
    /// OAuth access token, sent as a bearer token.
    AccessToken(SecretString),
    /// Service account key file; bearer tokens are minted and refreshed from it.
    ServiceAccount(PathBuf),
}

/// Where the catalog lives and how its header row maps onto entry fields.
#[derive(Debug, Clone)]
pub struct CatalogConfig {
    pub sheet_id: String,
    pub sheet_name: String,
    pub credential: SheetCredential,
    pub name_column: String,
    pub reply_column: String,
    pub keywords_column: String,
}

/// Messenger webhook settings.
#[derive(Debug, Clone, Default)]
pub struct MessengerConfig {
    /// Token the platform echoes during the GET verification handshake.
    pub verify_token: Option<String>,
    /// Page token for the Send API. Without it Messenger events are only logged.
    pub page_access_token: Option<SecretString>,
}

/// Matching and reply-shaping knobs.
#[derive(Debug, Clone)]
pub struct ReplyConfig {
    pub threshold: f64,
    pub similarity: SimilarityStrategy,
    pub max_list: usize,
    pub llm_followup: bool,
    pub llm_rewrite: bool,
    pub restricted_filter: bool,
    pub polite_particle: String,
}

impl Default for ReplyConfig {
    fn default() -> Self {
        Self {
            threshold: 0.72,
            similarity: SimilarityStrategy::default(),
            max_list: 5,
            llm_followup: false,
            llm_rewrite: false,
            restricted_filter: true,
            polite_particle: "ครับ".to_string(),
        }
    }
}

/// Full service configuration.
#[derive(Debug, Clone)]
pub struct BotConfig {
    pub port: u16,
    pub catalog: CatalogConfig,
    pub reply: ReplyConfig,
    /// `None` when no API key is set; LLM features are then disabled.
    pub llm: Option<LlmConfig>,
    pub messenger: MessengerConfig,
}

impl BotConfig {
    /// Read configuration from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Read configuration through an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let sheet_id =
            get("GOOGLE_SHEET_ID").ok_or_else(|| ConfigError::MissingEnvVar("GOOGLE_SHEET_ID".into()))?;

        let credential = if let Some(path) = get("GOOGLE_APPLICATION_CREDENTIALS") {
            let path = PathBuf::from(path);
            if !path.is_file() {
                return Err(ConfigError::InvalidValue {
                    key: "GOOGLE_APPLICATION_CREDENTIALS".into(),
                    message: format!("'{}' is not a readable file", path.display()),
                });
            }
            SheetCredential::ServiceAccount(path)
        } else if let Some(key) = get("GOOGLE_API_KEY") {
            SheetCredential::ApiKey(SecretString::from(key))
        } else if let Some(token) = get("GOOGLE_ACCESS_TOKEN") {
            SheetCredential::AccessToken(SecretString::from(token))
        } else {
            return Err(ConfigError::MissingRequired {
                key: "GOOGLE_API_KEY".into(),
                hint: "Set GOOGLE_APPLICATION_CREDENTIALS, GOOGLE_API_KEY or GOOGLE_ACCESS_TOKEN \
                       to read the catalog sheet"
                    .into(),
            });
        };

        let catalog = CatalogConfig {
            sheet_id,
            sheet_name: get("GOOGLE_SHEET_NAME").unwrap_or_else(|| "FAQ".to_string()),
            credential,
            name_column: get("CATALOG_NAME_COLUMN").unwrap_or_else(|| DEFAULT_NAME_COLUMN.to_string()),
            reply_column: get("CATALOG_REPLY_COLUMN")
                .unwrap_or_else(|| DEFAULT_REPLY_COLUMN.to_string()),
            keywords_column: get("CATALOG_KEYWORDS_COLUMN")
                .unwrap_or_else(|| DEFAULT_KEYWORDS_COLUMN.to_string()),
        };

        let defaults = ReplyConfig::default();

        let threshold = match get("FUZZY_THRESHOLD") {
            Some(raw) => {
                let value: f64 = parse_value("FUZZY_THRESHOLD", &raw)?;
                if !(0.0..=1.0).contains(&value) {
                    return Err(ConfigError::InvalidValue {
                        key: "FUZZY_THRESHOLD".into(),
                        message: format!("{value} is outside 0.0..=1.0"),
                    });
                }
                value
            }
            None => defaults.threshold,
        };

        let similarity = match get("SIMILARITY") {
            Some(raw) => raw.parse().map_err(|message| ConfigError::InvalidValue {
                key: "SIMILARITY".into(),
                message,
            })?,
            None => defaults.similarity,
        };

        let max_list = match get("MAX_LIST") {
            Some(raw) => {
                let value: usize = parse_value("MAX_LIST", &raw)?;
                if value == 0 {
                    return Err(ConfigError::InvalidValue {
                        key: "MAX_LIST".into(),
                        message: "must be at least 1".into(),
                    });
                }
                value
            }
            None => defaults.max_list,
        };

        let reply = ReplyConfig {
            threshold,
            similarity,
            max_list,
            llm_followup: parse_flag(&get, "LLM_FOLLOWUP", defaults.llm_followup)?,
            llm_rewrite: parse_flag(&get, "LLM_REWRITE", defaults.llm_rewrite)?,
            restricted_filter: parse_flag(&get, "RESTRICTED_FILTER", defaults.restricted_filter)?,
            polite_particle: get("POLITE_PARTICLE").unwrap_or(defaults.polite_particle),
        };

        let port = match get("PORT") {
            Some(raw) => parse_value("PORT", &raw)?,
            None => 5000,
        };

        let backend = match get("LLM_BACKEND").as_deref() {
            None | Some("openai") => LlmBackend::OpenAi,
            Some("anthropic") => LlmBackend::Anthropic,
            Some(other) => {
                return Err(ConfigError::InvalidValue {
                    key: "LLM_BACKEND".into(),
                    message: format!("unknown backend '{other}' (expected openai or anthropic)"),
                });
            }
        };
        let key_var = match backend {
            LlmBackend::OpenAi => "OPENAI_API_KEY",
            LlmBackend::Anthropic => "ANTHROPIC_API_KEY",
        };
        let llm = get(key_var).map(|api_key| LlmConfig {
            backend,
            api_key: SecretString::from(api_key),
            model: get("LLM_MODEL").unwrap_or_else(|| backend.default_model().to_string()),
        });

        if llm.is_none() && (reply.llm_followup || reply.llm_rewrite) {
            return Err(ConfigError::MissingRequired {
                key: key_var.into(),
                hint: "LLM_FOLLOWUP / LLM_REWRITE need an API key for the selected LLM_BACKEND".into(),
            });
        }

        let messenger = MessengerConfig {
            verify_token: get("FB_VERIFY_TOKEN"),
            page_access_token: get("FB_PAGE_ACCESS_TOKEN").map(SecretString::from),
        };

        Ok(Self {
            port,
            catalog,
            reply,
            llm,
            messenger,
        })
    }

    /// Address the HTTP server binds to.
    pub fn listen_addr(&self) -> SocketAddr {
        SocketAddr::from(([0, 0, 0, 0], self.port))
    }
}

fn parse_value<T>(key: &str, raw: &str) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    raw.parse().map_err(|e: T::Err| ConfigError::InvalidValue {
        key: key.to_string(),
        message: format!("'{raw}': {e}"),
    })
}

fn parse_flag<G>(get: &G, key: &str, default: bool) -> Result<bool, ConfigError>
where
    G: Fn(&str) -> Option<String>,
{
    match get(key).map(|v| v.to_ascii_lowercase()).as_deref() {
        None => Ok(default),
        Some("1" | "true" | "yes" | "on") => Ok(true),
        Some("0" | "false" | "no" | "off") => Ok(false),
        Some(other) => Err(ConfigError::InvalidValue {
            key: key.to_string(),
            message: format!("'{other}' is not a boolean"),
        }),
    }
}
