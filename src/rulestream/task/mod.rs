//! The continuous-SQL task node.
//!
//! This module carries the node's stream-sourcing and lifecycle contract:
//! configuration, the execution-context seam, stream source selection, the
//! node state machine with its disposal handle, and the factory the
//! surrounding registry routes task kinds through.

pub mod config;
pub mod context;
pub mod error;
pub mod factory;
pub mod node;
pub mod source;

// Re-exports
pub use config::{TaskConfiguration, SQL_KEY};
pub use context::{ExecutionContext, JobDefinition, RecordStream, RuleRecord, EVENT_RESULT};
pub use error::{TaskError, TaskResult};
pub use factory::{SqlTaskNodeFactory, TaskNodeFactory, TASK_KIND};
pub use node::{LifecycleState, SqlTaskNode, TaskHandle, TaskNode};
pub use source::{SelectedSource, StreamSourceSelector, TopicTableResolver};
