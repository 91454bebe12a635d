//! Task node factory.
//!
//! The surrounding registry routes job definitions to factories by task
//! kind. A factory binds a new node to an execution context and nothing
//! more; query compilation and subscription happen in the node's own
//! validate/start path, so construction failures surface to the correct
//! caller.

use crate::rulestream::bus::TopicBus;
use crate::rulestream::sql::QueryEngine;
use crate::rulestream::task::context::ExecutionContext;
use crate::rulestream::task::error::TaskResult;
use crate::rulestream::task::node::{SqlTaskNode, TaskNode};
use async_trait::async_trait;
use std::sync::Arc;

/// Task kind identifier the registry routes to [`SqlTaskNodeFactory`].
pub const TASK_KIND: &str = "stream-sql";

/// Resolves a task kind to node instances bound to execution contexts.
#[async_trait]
pub trait TaskNodeFactory: Send + Sync {
    /// The task kind this factory produces.
    fn task_kind(&self) -> &str;

    /// Whether this factory handles the given task kind.
    fn handles(&self, kind: &str) -> bool {
        kind == self.task_kind()
    }

    /// Create a new node bound to `context`.
    ///
    /// Trivial construction only: no I/O, no compilation, no
    /// subscription.
    async fn create_task(
        &self,
        context: Arc<dyn ExecutionContext>,
    ) -> TaskResult<Box<dyn TaskNode>>;
}

/// Factory for the continuous-SQL task node.
///
/// Stateless beyond the shared bus and engine services it hands to every
/// node it creates.
pub struct SqlTaskNodeFactory {
    bus: Arc<dyn TopicBus>,
    engine: Arc<dyn QueryEngine>,
}

impl SqlTaskNodeFactory {
    pub fn new(bus: Arc<dyn TopicBus>, engine: Arc<dyn QueryEngine>) -> Self {
        Self { bus, engine }
    }
}

#[async_trait]
impl TaskNodeFactory for SqlTaskNodeFactory {
    fn task_kind(&self) -> &str {
        TASK_KIND
    }

    async fn create_task(
        &self,
        context: Arc<dyn ExecutionContext>,
    ) -> TaskResult<Box<dyn TaskNode>> {
        Ok(Box::new(SqlTaskNode::new(
            context,
            Arc::clone(&self.bus),
            Arc::clone(&self.engine),
        )))
    }
}
