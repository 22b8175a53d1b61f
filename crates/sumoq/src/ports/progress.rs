//! Progress Port
//!
//! Receives every successful status poll while a job runs.

use crate::domain::SearchJobStatus;

pub trait ProgressSink: Send + Sync {
    fn on_progress(&self, status: &SearchJobStatus);
}

impl<F> ProgressSink for F
where
    F: Fn(&SearchJobStatus) + Send + Sync,
{
    fn on_progress(&self, status: &SearchJobStatus) {
        self(status)
    }
}
