//! Ports (Interfaces)
//!
//! Abstract interfaces that define how the application layer
//! reaches the search API and reports progress.
//!
//! Implementations of these traits live with the host (CLI, tests).

mod progress;
mod transport;

// Re-exports
pub use progress::*;
pub use transport::*;
