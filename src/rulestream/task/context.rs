//! Per-task execution context contract.
//!
//! The surrounding engine binds each task node to one [`ExecutionContext`]:
//! the node's declared wiring, its upstream reader, its downstream sink,
//! a channel for non-fatal errors, and lifecycle event emission. The node
//! never talks to the graph except through this trait.

use crate::rulestream::sql::types::RowMap;
use crate::rulestream::task::config::TaskConfiguration;
use crate::rulestream::task::error::TaskError;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures::stream::BoxStream;
use serde::{Deserialize, Serialize};
use std::error::Error;

/// Name of the lifecycle event fired for every delivered result.
pub const EVENT_RESULT: &str = "result";

/// Lazy sequence of upstream records.
pub type RecordStream = BoxStream<'static, RuleRecord>;

/// The node's declared wiring inside the rule graph.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct JobDefinition {
    /// Job name, unique within the graph
    pub name: String,
    /// Upstream nodes wired into this one
    pub inputs: Vec<String>,
    /// Downstream nodes this one feeds
    pub outputs: Vec<String>,
    /// Task configuration (consumed key: `sql`)
    pub configuration: TaskConfiguration,
}

impl JobDefinition {
    /// Whether at least one upstream input is declared.
    ///
    /// Drives stream source selection: with inputs the query consumes
    /// upstream rows, without them it pulls from resolved tables.
    pub fn has_inputs(&self) -> bool {
        !self.inputs.is_empty()
    }
}

/// One result record flowing through the rule graph.
///
/// Ephemeral: created per emitted result, handed to the context's output
/// sink, never retained afterwards.
#[derive(Debug, Clone)]
pub struct RuleRecord {
    /// Instance id of the task that produced this record
    pub node: String,
    /// The result row
    pub payload: RowMap,
    /// Creation timestamp
    pub created_at: DateTime<Utc>,
}

impl RuleRecord {
    pub fn new(node: impl Into<String>, payload: RowMap) -> Self {
        Self {
            node: node.into(),
            payload,
            created_at: Utc::now(),
        }
    }

    /// Consume the record into the row shape the query engine expects.
    pub fn into_row_map(self) -> RowMap {
        self.payload
    }
}

/// Surface the surrounding engine exposes to a running task.
#[async_trait]
pub trait ExecutionContext: Send + Sync {
    /// The node's declared wiring and configuration.
    fn job(&self) -> &JobDefinition;

    /// Unique id of this task instantiation; namespaces the node's
    /// subscriber identity on the bus.
    fn instance_id(&self) -> &str;

    /// Open the upstream record sequence.
    ///
    /// Each call returns a fresh lazy stream; a restarted run re-attaches
    /// to the upstream here.
    fn accept(&self) -> RecordStream;

    /// Write one record to the output sink.
    ///
    /// Suspends until the record is delivered or delivery fails.
    async fn write_output(&self, record: RuleRecord) -> Result<(), Box<dyn Error + Send + Sync>>;

    /// Fire a named lifecycle event carrying a record, for graph-level
    /// observers. Distinct from the data write itself.
    async fn fire_event(
        &self,
        event: &str,
        record: RuleRecord,
    ) -> Result<(), Box<dyn Error + Send + Sync>>;

    /// Report a non-fatal node error to the graph.
    async fn on_error(&self, error: TaskError);

    /// Wrap a raw result row into the record type the graph expects,
    /// stamping this task as its provenance.
    fn new_rule_data(&self, payload: RowMap) -> RuleRecord {
        RuleRecord::new(self.instance_id(), payload)
    }
}
