//! Task configuration handed to the node by the surrounding engine.

use crate::rulestream::task::error::{TaskError, TaskResult};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::collections::HashMap;

/// Configuration key holding the query text.
pub const SQL_KEY: &str = "sql";

/// String-keyed task configuration.
///
/// Supplied externally and read once per (re)start cycle. Only the `sql`
/// entry is consumed; unrecognized keys are ignored for forward
/// compatibility.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TaskConfiguration {
    #[serde(flatten)]
    entries: HashMap<String, JsonValue>,
}

impl TaskConfiguration {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_entries(entries: HashMap<String, JsonValue>) -> Self {
        Self { entries }
    }

    /// Set a configuration entry, replacing any existing value.
    pub fn insert(&mut self, key: impl Into<String>, value: JsonValue) -> &mut Self {
        self.entries.insert(key.into(), value);
        self
    }

    pub fn get(&self, key: &str) -> Option<&JsonValue> {
        self.entries.get(key)
    }

    /// Read the configured query text.
    ///
    /// Fails when the `sql` entry is absent, not a string, or blank.
    pub fn sql(&self) -> TaskResult<String> {
        match self.entries.get(SQL_KEY) {
            Some(JsonValue::String(sql)) if !sql.trim().is_empty() => Ok(sql.clone()),
            _ => Err(TaskError::configuration("missing or invalid sql")),
        }
    }
}
