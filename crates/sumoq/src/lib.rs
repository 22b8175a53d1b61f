//! Sumoq Domain Library
//!
//! Core types and the search job protocol for the Sumo Logic search API.
//!
//! # Architecture
//!
//! - **Domain Layer** (`domain/`): Pure types and logic
//!   - `entities/`: Search job request/handle/status, result entries, query documents
//!   - `value_objects/`: JobState, ResultMode, OutputFormat, time expressions
//!   - `errors/`: SearchError taxonomy
//!
//! - **Ports** (`ports/`): Abstract interfaces (traits)
//!   - `transport`: authenticated HTTP request in, structured response out
//!   - `progress`: poll progress callback
//!
//! - **Application** (`application/`): Use cases built on the ports
//!   - `SearchJobService`: submit → poll → fetch → delete
//!   - `MetadataCache`: completion metadata persisted to disk
//!
//! # Usage
//!
//! ```rust,ignore
//! use sumoq::{SearchJobService, SearchJobConfig, SearchJobRequest};
//!
//! let service = SearchJobService::new(transport, SearchJobConfig::default());
//! let rows = service.execute_search(&request, None).await?;
//! ```

pub mod application;
pub mod domain;
pub mod ports;

// Re-export commonly used types
pub use application::{
    MetadataCache, MetadataCacheError, SearchJobConfig, SearchJobService, DEFAULT_MAX_POLL_ATTEMPTS,
    DEFAULT_PAGE_LIMIT, DEFAULT_POLL_INTERVAL,
};
pub use domain::{
    resolve_time, resolve_time_at, JobState, OutputFormat, QueryDocument, QueryMetadata,
    ResultEntry, ResultMode, SearchError, SearchJobHandle, SearchJobRequest, SearchJobStatus,
};
pub use ports::{ApiRequest, ApiResponse, ApiTransport, HttpMethod, ProgressSink};
