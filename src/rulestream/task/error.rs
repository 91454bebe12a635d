//! Error taxonomy for the continuous-SQL task node.
//!
//! Two classes of failure cross the node boundary:
//!
//! - **Fatal to a start/validate attempt**: bad configuration, a query that
//!   does not compile, or a topic subscription that cannot be established.
//!   These return synchronously from the lifecycle call and leave the node
//!   without an active handle, in a re-startable state.
//! - **Non-fatal, per-result**: a single row failing evaluation, or a
//!   write/event delivery failing. These are logged, reported through the
//!   execution context's error channel, and never abort the stream.

use std::fmt;

/// Errors raised by the task node lifecycle and result pipeline.
#[derive(Debug, Clone, PartialEq)]
pub enum TaskError {
    /// Task configuration is unusable (missing or invalid `sql` entry).
    Configuration {
        /// Description of the configuration problem
        message: String,
    },

    /// The query engine rejected the configured query text.
    QueryCompilation {
        /// Compilation failure reported by the engine
        message: String,
        /// The query text that failed to compile, if it was readable
        sql: Option<String>,
    },

    /// A single upstream row failed query evaluation.
    RowEvaluation {
        /// Evaluation failure reported by the engine
        message: String,
    },

    /// Writing a result downstream or firing its lifecycle event failed.
    Delivery {
        /// Description of the delivery failure
        message: String,
        /// The lifecycle event being fired when the failure occurred
        event: Option<String>,
    },

    /// The topic bus refused to establish a subscription.
    Subscription {
        /// Failure reported by the bus client
        message: String,
        /// The topic pattern being subscribed, if known
        topic: Option<String>,
    },
}

impl fmt::Display for TaskError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TaskError::Configuration { message } => {
                write!(f, "Configuration error: {}", message)
            }
            TaskError::QueryCompilation { message, sql } => {
                if let Some(sql) = sql {
                    write!(f, "Query compilation error in '{}': {}", sql, message)
                } else {
                    write!(f, "Query compilation error: {}", message)
                }
            }
            TaskError::RowEvaluation { message } => {
                write!(f, "Row evaluation error: {}", message)
            }
            TaskError::Delivery { message, event } => {
                if let Some(event) = event {
                    write!(f, "Delivery error firing '{}': {}", event, message)
                } else {
                    write!(f, "Delivery error: {}", message)
                }
            }
            TaskError::Subscription { message, topic } => {
                if let Some(topic) = topic {
                    write!(f, "Subscription error for '{}': {}", topic, message)
                } else {
                    write!(f, "Subscription error: {}", message)
                }
            }
        }
    }
}

impl std::error::Error for TaskError {}

impl TaskError {
    /// Create a configuration error
    pub fn configuration(message: impl Into<String>) -> Self {
        TaskError::Configuration {
            message: message.into(),
        }
    }

    /// Create a query compilation error
    pub fn query_compilation(message: impl Into<String>, sql: Option<String>) -> Self {
        TaskError::QueryCompilation {
            message: message.into(),
            sql,
        }
    }

    /// Create a row evaluation error
    pub fn row_evaluation(message: impl Into<String>) -> Self {
        TaskError::RowEvaluation {
            message: message.into(),
        }
    }

    /// Create a delivery error
    pub fn delivery(message: impl Into<String>, event: Option<String>) -> Self {
        TaskError::Delivery {
            message: message.into(),
            event,
        }
    }

    /// Create a subscription error
    pub fn subscription(message: impl Into<String>, topic: Option<String>) -> Self {
        TaskError::Subscription {
            message: message.into(),
            topic,
        }
    }

    /// Whether this error aborts the enclosing `validate`/`start` attempt.
    ///
    /// Non-fatal errors are reported through the execution context and the
    /// pipeline continues with the next row/result.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            TaskError::Configuration { .. }
                | TaskError::QueryCompilation { .. }
                | TaskError::Subscription { .. }
        )
    }
}

/// Result type for task node operations
pub type TaskResult<T> = Result<T, TaskError>;
