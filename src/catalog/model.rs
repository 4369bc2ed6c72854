//! Typed catalog rows and the header → field mapping.

use std::collections::HashSet;

use crate::matcher::norm;

/// Label shown when a row has neither a name nor keywords.
pub const PLACEHOLDER_NAME: &str = "สินค้านี้";

/// One product row.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CatalogEntry {
    pub name: String,
    /// Opaque display text: a purchase link or a free-form answer.
    pub reply: String,
    /// Keywords in sheet order, deduplicated by normalized form.
    pub keywords: Vec<String>,
}

impl CatalogEntry {
    /// Build an entry from raw cell values; `keywords` is comma-separated.
    pub fn new(name: impl Into<String>, reply: impl Into<String>, keywords: &str) -> Self {
        let name = name.into().trim().to_string();
        let reply = reply.into().trim().to_string();

        let mut seen: HashSet<String> = HashSet::new();
        let keywords = keywords
            .split(',')
            .map(str::trim)
            .filter(|k| !k.is_empty())
            .filter(|k| seen.insert(norm(k)))
            .map(String::from)
            .collect();

        Self {
            name,
            reply,
            keywords,
        }
    }

    /// Keywords plus the product name, without empties or normalized duplicates.
    pub fn search_terms(&self) -> impl Iterator<Item = &str> {
        let name_is_new = !self.name.is_empty()
            && !self.keywords.iter().any(|k| norm(k) == norm(&self.name));
        self.keywords
            .iter()
            .map(String::as_str)
            .chain(name_is_new.then_some(self.name.as_str()))
    }

    /// Name for display: the product name, else the first keyword, else a placeholder.
    pub fn display_name(&self) -> &str {
        if !self.name.is_empty() {
            &self.name
        } else {
            self.keywords
                .first()
                .map(String::as_str)
                .unwrap_or(PLACEHOLDER_NAME)
        }
    }
}

/// Which sheet headers feed which entry fields.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnMapping {
    pub name: String,
    pub reply: String,
    pub keywords: String,
}

impl Default for ColumnMapping {
    fn default() -> Self {
        Self {
            name: crate::config::DEFAULT_NAME_COLUMN.to_string(),
            reply: crate::config::DEFAULT_REPLY_COLUMN.to_string(),
            keywords: crate::config::DEFAULT_KEYWORDS_COLUMN.to_string(),
        }
    }
}

impl ColumnMapping {
    /// Turn a header row plus data rows into entries.
    ///
    /// Headers are matched after trimming. A missing column yields empty
    /// strings for that field; short rows are padded the same way. Rows
    /// with every mapped cell blank are dropped.
    pub fn map_rows(&self, header: &[String], rows: &[Vec<String>]) -> Vec<CatalogEntry> {
        let position = |wanted: &str| header.iter().position(|h| h.trim() == wanted.trim());
        let name_idx = position(self.name.as_str());
        let reply_idx = position(self.reply.as_str());
        let keywords_idx = position(self.keywords.as_str());

        let cell = |row: &Vec<String>, idx: Option<usize>| -> String {
            idx.and_then(|i| row.get(i)).cloned().unwrap_or_default()
        };

        rows.iter()
            .map(|row| {
                CatalogEntry::new(
                    cell(row, name_idx),
                    cell(row, reply_idx),
                    &cell(row, keywords_idx),
                )
            })
            .filter(|e| !(e.name.is_empty() && e.reply.is_empty() && e.keywords.is_empty()))
            .collect()
    }

    /// Headers from this mapping that the sheet does not have.
    pub fn missing_columns<'a>(&'a self, header: &[String]) -> Vec<&'a str> {
        [&self.name, &self.reply, &self.keywords]
            .into_iter()
            .filter(|wanted| !header.iter().any(|h| h.trim() == wanted.trim()))
            .map(String::as_str)
            .collect()
    }
}
