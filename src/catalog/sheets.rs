//! Google Sheets catalog source.
//!
//! Reads the whole worksheet through the Sheets v4 `values` endpoint on
//! every call. The first row is the header row; the rest are products.

use std::path::Path;

use async_trait::async_trait;
use reqwest::{StatusCode, Url};
use secrecy::ExposeSecret;
use serde::Deserialize;
use tokio::sync::OnceCell;
use tracing::{debug, info, warn};
use yup_oauth2::ServiceAccountAuthenticator;
use yup_oauth2::authenticator::DefaultAuthenticator;

use super::model::{CatalogEntry, ColumnMapping};
use super::source::CatalogSource;
use crate::config::{CatalogConfig, SheetCredential};
use crate::error::CatalogError;

const SHEETS_API_BASE: &str = "https://sheets.googleapis.com";
const SHEETS_READONLY_SCOPE: &str = "https://www.googleapis.com/auth/spreadsheets.readonly";

/// Body of a `spreadsheets.values.get` response.
#[derive(Debug, Deserialize)]
struct ValueRange {
    #[serde(default)]
    values: Vec<Vec<serde_json::Value>>,
}

/// Catalog backed by one Google Sheets worksheet.
pub struct SheetsCatalog {
    client: reqwest::Client,
    base_url: String,
    sheet_id: String,
    sheet_name: String,
    credential: SheetCredential,
    columns: ColumnMapping,
    /// Built on first use from the service account key; caches and refreshes tokens.
    authenticator: OnceCell<DefaultAuthenticator>,
}

impl SheetsCatalog {
    pub fn new(config: &CatalogConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: SHEETS_API_BASE.to_string(),
            sheet_id: config.sheet_id.clone(),
            sheet_name: config.sheet_name.clone(),
            credential: config.credential.clone(),
            columns: ColumnMapping {
                name: config.name_column.clone(),
                reply: config.reply_column.clone(),
                keywords: config.keywords_column.clone(),
            },
            authenticator: OnceCell::new(),
        }
    }

    /// Point at a different API host (used by tests).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    fn values_url(&self) -> Result<Url, CatalogError> {
        let mut url = Url::parse(&self.base_url)
            .map_err(|e| CatalogError::Request(format!("bad base url: {e}")))?;
        url.path_segments_mut()
            .map_err(|_| CatalogError::Request("base url cannot have a path".into()))?
            .pop_if_empty()
            .extend([
                "v4",
                "spreadsheets",
                self.sheet_id.as_str(),
                "values",
                self.sheet_name.as_str(),
            ]);
        url.query_pairs_mut()
            .append_pair("majorDimension", "ROWS")
            .append_pair("valueRenderOption", "FORMATTED_VALUE");
        if let SheetCredential::ApiKey(key) = &self.credential {
            url.query_pairs_mut().append_pair("key", key.expose_secret());
        }
        Ok(url)
    }

    async fn service_account_token(&self, key_path: &Path) -> Result<String, CatalogError> {
        let authenticator = self
            .authenticator
            .get_or_try_init(|| async {
                let key = yup_oauth2::read_service_account_key(key_path)
                    .await
                    .map_err(|e| {
                        CatalogError::Credential(format!("reading {}: {e}", key_path.display()))
                    })?;
                info!(client_email = %key.client_email, "Using service account for catalog sheet");
                ServiceAccountAuthenticator::builder(key)
                    .build()
                    .await
                    .map_err(|e| CatalogError::Credential(e.to_string()))
            })
            .await?;

        let token = authenticator
            .token(&[SHEETS_READONLY_SCOPE])
            .await
            .map_err(|e| CatalogError::Credential(e.to_string()))?;
        token
            .token()
            .map(str::to_string)
            .ok_or_else(|| CatalogError::Credential("token response had no access token".into()))
    }
}

#[async_trait]
impl CatalogSource for SheetsCatalog {
    fn name(&self) -> &str {
        "google-sheets"
    }

    async fn fetch_entries(&self) -> Result<Vec<CatalogEntry>, CatalogError> {
        let mut request = self.client.get(self.values_url()?);
        match &self.credential {
            SheetCredential::ApiKey(_) => {}
            SheetCredential::AccessToken(token) => {
                request = request.bearer_auth(token.expose_secret());
            }
            SheetCredential::ServiceAccount(key_path) => {
                request = request.bearer_auth(self.service_account_token(key_path).await?);
            }
        }

        let resp = request
            .send()
            .await
            .map_err(|e| CatalogError::Request(e.without_url().to_string()))?;

        let status = resp.status();
        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            return Err(CatalogError::AuthFailed {
                status: status.as_u16(),
            });
        }
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(CatalogError::Status {
                status: status.as_u16(),
                body: body.chars().take(200).collect(),
            });
        }

        let range: ValueRange = resp
            .json()
            .await
            .map_err(|e| CatalogError::InvalidPayload(e.to_string()))?;

        let entries = rows_to_entries(&self.columns, range.values);
        debug!(
            sheet = %self.sheet_name,
            entries = entries.len(),
            "Fetched catalog"
        );
        Ok(entries)
    }
}

/// Split off the header row and map the rest. Cells may arrive as numbers
/// or booleans; they are stringified.
fn rows_to_entries(columns: &ColumnMapping, values: Vec<Vec<serde_json::Value>>) -> Vec<CatalogEntry> {
    let mut rows = values.into_iter().map(|row| {
        row.into_iter()
            .map(|cell| match cell {
                serde_json::Value::String(s) => s,
                serde_json::Value::Null => String::new(),
                other => other.to_string(),
            })
            .collect::<Vec<String>>()
    });

    let Some(header) = rows.next() else {
        return Vec::new();
    };

    let missing = columns.missing_columns(&header);
    if !missing.is_empty() {
        warn!(missing = ?missing, "Catalog sheet is missing columns; treating them as empty");
    }

    let body: Vec<Vec<String>> = rows.collect();
    columns.map_rows(&header, &body)
}
