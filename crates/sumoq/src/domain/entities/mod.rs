//! Domain Entities
//!
//! - SearchJobRequest / SearchJobHandle / SearchJobStatus: one remote search job
//! - ResultEntry: a single record or message
//! - QueryDocument: query text with its comment directives

mod query_document;
mod search_job;

pub use query_document::*;
pub use search_job::*;
