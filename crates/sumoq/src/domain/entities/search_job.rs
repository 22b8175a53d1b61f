//! Search Job - One remote asynchronous search
//!
//! Wire shapes for `/search/jobs`. Field names follow the API's camelCase.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::domain::value_objects::JobState;

fn default_time_zone() -> String {
    "UTC".to_string()
}

/// Body of `POST /search/jobs`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct SearchJobRequest {
    pub query: String,
    /// Epoch millis or ISO-8601, already resolved by the caller
    pub from: String,
    pub to: String,
    #[serde(default = "default_time_zone")]
    pub time_zone: String,
    #[serde(default)]
    pub by_receipt_time: bool,
}

impl SearchJobRequest {
    pub fn new(query: impl Into<String>, from: impl Into<String>, to: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            from: from.into(),
            to: to.into(),
            time_zone: default_time_zone(),
            by_receipt_time: false,
        }
    }

    pub fn with_time_zone(mut self, time_zone: impl Into<String>) -> Self {
        self.time_zone = time_zone.into();
        self
    }

    pub fn with_receipt_time(mut self, by_receipt_time: bool) -> Self {
        self.by_receipt_time = by_receipt_time;
        self
    }
}

/// Reference to a created search job
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SearchJobHandle {
    id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    link: Option<serde_json::Value>,
}

impl SearchJobHandle {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            link: None,
        }
    }

    pub fn with_link(mut self, link: serde_json::Value) -> Self {
        self.link = Some(link);
        self
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn link(&self) -> Option<&serde_json::Value> {
        self.link.as_ref()
    }
}

impl std::fmt::Display for SearchJobHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.id)
    }
}

/// Body of `GET /search/jobs/{id}`
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct SearchJobStatus {
    pub state: JobState,
    #[serde(default)]
    pub message_count: u64,
    #[serde(default)]
    pub record_count: u64,
    #[serde(default)]
    pub pending_errors: Vec<String>,
    #[serde(default)]
    pub pending_warnings: Vec<String>,
}

impl SearchJobStatus {
    pub fn new(state: JobState) -> Self {
        Self {
            state,
            ..Default::default()
        }
    }
}

/// One record or message; keys vary per entry and keep the server's order
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ResultEntry {
    #[serde(default)]
    pub map: IndexMap<String, String>,
}

impl ResultEntry {
    pub fn get(&self, field: &str) -> Option<&str> {
        self.map.get(field).map(String::as_str)
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for ResultEntry {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            map: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}
