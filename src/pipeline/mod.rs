//! Per-request reply pipeline.
//!
//! Every webhook message flows through:
//! 1. `RulesEngine::check_restricted()`: redirect price/COD/order questions
//! 2. `CatalogSource::fetch_entries()`: fresh catalog snapshot
//! 3. `Matcher::find()` then `Responder::compose()`
//! 4. Optional LLM follow-up or rewrite via `ReplyGenerator`
//!
//! Failures map to fixed replies; callers always get text back.

pub mod processor;
pub mod rules;
pub mod types;

pub use processor::ReplyPipeline;
pub use rules::RulesEngine;
pub use types::{InboundMessage, Reply, ReplySource};
