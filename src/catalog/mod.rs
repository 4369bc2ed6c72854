//! Product catalog: typed rows and the sources they are read from.

pub mod model;
pub mod sheets;
pub mod source;

pub use model::{CatalogEntry, ColumnMapping};
pub use sheets::SheetsCatalog;
pub use source::{CatalogSource, StaticCatalog};
