//! JobState - Remote search job lifecycle state

use serde::{Deserialize, Serialize};

/// State reported by `GET /search/jobs/{id}`
///
/// States the protocol does not act on are kept verbatim in `Other`
/// and treated as still in progress.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum JobState {
    #[default]
    NotStarted,
    GatheringResults,
    DoneGatheringResults,
    Cancelled,
    Other(String),
}

impl JobState {
    pub fn as_str(&self) -> &str {
        match self {
            JobState::NotStarted => "NOT STARTED",
            JobState::GatheringResults => "GATHERING RESULTS",
            JobState::DoneGatheringResults => "DONE GATHERING RESULTS",
            JobState::Cancelled => "CANCELLED",
            JobState::Other(state) => state,
        }
    }

    pub fn is_done(&self) -> bool {
        matches!(self, JobState::DoneGatheringResults)
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, JobState::Cancelled)
    }
}

impl From<String> for JobState {
    fn from(s: String) -> Self {
        match s.as_str() {
            "NOT STARTED" => JobState::NotStarted,
            "GATHERING RESULTS" => JobState::GatheringResults,
            "DONE GATHERING RESULTS" => JobState::DoneGatheringResults,
            "CANCELLED" => JobState::Cancelled,
            _ => JobState::Other(s),
        }
    }
}

impl From<&str> for JobState {
    fn from(s: &str) -> Self {
        JobState::from(s.to_string())
    }
}

impl From<JobState> for String {
    fn from(state: JobState) -> Self {
        state.as_str().to_string()
    }
}

impl std::fmt::Display for JobState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
