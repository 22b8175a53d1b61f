//! ResultMode - Whether a job's results are read as records or messages

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::OnceLock;

/// Aggregation operators that turn a query into a records query when used
/// as a pipeline stage.
pub const AGGREGATION_OPERATORS: &[&str] = &[
    "count",
    "sum",
    "avg",
    "min",
    "max",
    "stddev",
    "pct",
    "first",
    "last",
    "most_recent",
    "least_recent",
    "count_distinct",
    "count_frequent",
    "fillmissing",
    "transpose",
    "timeslice",
    "rollingstd",
];

#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ResultMode {
    #[default]
    Records,
    Messages,
}

fn aggregation_stage() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        let alternation = AGGREGATION_OPERATORS.join("|");
        Regex::new(&format!(r"(?i)\|\s*({})\b", alternation))
            .expect("aggregation operator pattern is valid")
    })
}

impl ResultMode {
    /// Advisory guess from the query text. Not validated against the job's
    /// actual result shape.
    pub fn infer(query: &str) -> Self {
        if aggregation_stage().is_match(query) {
            ResultMode::Records
        } else {
            ResultMode::Messages
        }
    }

    /// Path segment under `/search/jobs/{id}/`
    pub fn path_segment(&self) -> &'static str {
        match self {
            ResultMode::Records => "records",
            ResultMode::Messages => "messages",
        }
    }
}

impl std::fmt::Display for ResultMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.path_segment())
    }
}

impl std::str::FromStr for ResultMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "records" | "record" => Ok(ResultMode::Records),
            "messages" | "message" | "raw" => Ok(ResultMode::Messages),
            _ => Err(format!("Unknown result mode: {}", s)),
        }
    }
}
