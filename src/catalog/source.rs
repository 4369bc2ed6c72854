//! The catalog collaborator seam.

use async_trait::async_trait;

use super::model::CatalogEntry;
use crate::error::CatalogError;

/// Read-only row source, queried once per inbound message.
#[async_trait]
pub trait CatalogSource: Send + Sync {
    /// Short name for logs.
    fn name(&self) -> &str;

    /// Fetch every catalog row.
    async fn fetch_entries(&self) -> Result<Vec<CatalogEntry>, CatalogError>;
}

/// A fixed in-memory catalog.
#[derive(Debug, Clone, Default)]
pub struct StaticCatalog {
    entries: Vec<CatalogEntry>,
}

impl StaticCatalog {
    pub fn new(entries: Vec<CatalogEntry>) -> Self {
        Self { entries }
    }
}

#[async_trait]
impl CatalogSource for StaticCatalog {
    fn name(&self) -> &str {
        "static"
    }

    async fn fetch_entries(&self) -> Result<Vec<CatalogEntry>, CatalogError> {
        Ok(self.entries.clone())
    }
}
