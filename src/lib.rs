//! # rulestream
//!
//! The continuous-SQL task node of a rule-engine execution graph: a node
//! that runs a SQL-like query over a data stream and forwards every result
//! to the next node, with safe hot-reload and pre-flight validation.
//!
//! ## Features
//!
//! - **Stream sourcing**: consumes upstream rows when the node has declared
//!   inputs, or resolves the query's named tables: `dual` and unknown
//!   names to a synthetic single row, `/`-prefixed names to a live topic
//!   subscription.
//! - **Ordered delivery**: every result is written downstream and then
//!   fires a `result` lifecycle event, in that order, before the next
//!   result is processed.
//! - **One handle per run**: start/reload/stop dispose the prior run's
//!   resources atomically before creating new ones; disposal is idempotent
//!   and no late result can be delivered after it returns.
//! - **External collaborators behind traits**: the query engine, the topic
//!   bus, and the per-task execution context are consumed through
//!   `async-trait` contracts and never implemented here.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use rulestream::rulestream::task::{SqlTaskNodeFactory, TaskNode, TaskNodeFactory};
//! use rulestream::rulestream::bus::TopicBus;
//! use rulestream::rulestream::sql::QueryEngine;
//! use rulestream::rulestream::task::ExecutionContext;
//! use std::sync::Arc;
//!
//! # async fn example(
//! #     bus: Arc<dyn TopicBus>,
//! #     engine: Arc<dyn QueryEngine>,
//! #     context: Arc<dyn ExecutionContext>,
//! # ) -> Result<(), Box<dyn std::error::Error>> {
//! let factory = SqlTaskNodeFactory::new(bus, engine);
//! assert!(factory.handles("stream-sql"));
//!
//! let mut node = factory.create_task(context).await?;
//! node.validate()?;
//! node.start().await?;
//! // ... later: hot-reconfigure without leaking the old subscription
//! node.reload().await?;
//! node.stop().await;
//! # Ok(())
//! # }
//! ```

pub mod rulestream;

// Re-export main API at crate root for easy access
pub use rulestream::bus::{MessageStream, Subscription, TopicBus, TopicMessage};
pub use rulestream::sql::{
    ContinuousQuery, FieldValue, QueryEngine, QueryResultStream, RowMap, RowStream, TableResolver,
};
pub use rulestream::task::{
    ExecutionContext, JobDefinition, LifecycleState, RuleRecord, SqlTaskNode, SqlTaskNodeFactory,
    TaskConfiguration, TaskError, TaskHandle, TaskNode, TaskNodeFactory, TaskResult, EVENT_RESULT,
    TASK_KIND,
};
