//! Application Services (Use Cases)
//!
//! Orchestrates the ports to drive search jobs and keep completion metadata.

mod metadata_cache;
mod search_job_service;

pub use metadata_cache::*;
pub use search_job_service::*;
