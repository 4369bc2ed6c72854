//! Catalog reply bot: answers customer chat messages with products from a
//! spreadsheet catalog.

pub mod catalog;
pub mod channels;
pub mod config;
pub mod error;
pub mod llm;
pub mod matcher;
pub mod pipeline;
pub mod responder;
