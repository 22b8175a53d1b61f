//! Value Objects
//!
//! Immutable objects defined by their attributes rather than identity.

mod job_state;
mod output_format;
mod result_mode;
mod time_expression;

pub use job_state::*;
pub use output_format::*;
pub use result_mode::*;
pub use time_expression::*;
