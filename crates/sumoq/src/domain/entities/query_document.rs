//! QueryDocument - Query text annotated with comment directives
//!
//! A query file may carry its own search settings in `//` comments:
//!
//! ```text
//! // @name errors by host
//! // @from -1h
//! // @to now
//! // @mode records
//! _sourceCategory=prod/api error | count by _sourceHost
//! ```

use std::collections::BTreeMap;

use crate::domain::value_objects::{OutputFormat, ResultMode};

/// Settings parsed from `// @key value` directives
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryMetadata {
    pub name: Option<String>,
    pub from: Option<String>,
    pub to: Option<String>,
    pub time_zone: Option<String>,
    pub mode: Option<ResultMode>,
    pub output: Option<OutputFormat>,
    pub by_receipt_time: Option<bool>,
    pub limit: Option<u32>,
    /// Directives with keys this tool does not interpret
    pub extra: BTreeMap<String, String>,
}

/// A query with its directives split out
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryDocument {
    pub metadata: QueryMetadata,
    /// Query text with directive lines removed
    pub query: String,
}

impl QueryDocument {
    pub fn parse(text: &str) -> Self {
        let mut metadata = QueryMetadata::default();
        let mut body = Vec::new();

        for line in text.lines() {
            match parse_directive(line) {
                Some((key, value)) => metadata.apply(&key, value),
                None => body.push(line),
            }
        }

        Self {
            metadata,
            query: body.join("\n").trim().to_string(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.query.is_empty()
    }
}

/// `// @key value` → (lowercased key, trimmed value)
fn parse_directive(line: &str) -> Option<(String, String)> {
    let rest = line.trim_start().strip_prefix("//")?.trim_start();
    let rest = rest.strip_prefix('@')?;

    let (key, value) = match rest.find(char::is_whitespace) {
        Some(idx) => (&rest[..idx], rest[idx..].trim()),
        None => (rest.trim_end(), ""),
    };

    if key.is_empty() {
        return None;
    }

    Some((key.to_lowercase(), value.to_string()))
}

impl QueryMetadata {
    fn apply(&mut self, key: &str, value: String) {
        match key {
            "name" => self.name = Some(value),
            "from" => self.from = Some(value),
            "to" => self.to = Some(value),
            "timezone" | "tz" => self.time_zone = Some(value),
            "mode" => match value.parse() {
                Ok(mode) => self.mode = Some(mode),
                Err(e) => tracing::warn!("Ignoring @mode directive: {}", e),
            },
            "output" => match value.parse() {
                Ok(output) => self.output = Some(output),
                Err(e) => tracing::warn!("Ignoring @output directive: {}", e),
            },
            "byreceipttime" => match value.to_lowercase().as_str() {
                "true" | "yes" | "" => self.by_receipt_time = Some(true),
                "false" | "no" => self.by_receipt_time = Some(false),
                other => tracing::warn!("Ignoring @byReceiptTime directive: {}", other),
            },
            "limit" => match value.parse() {
                Ok(limit) => self.limit = Some(limit),
                Err(_) => tracing::warn!("Ignoring @limit directive: {}", value),
            },
            _ => {
                self.extra.insert(key.to_string(), value);
            }
        }
    }
}
