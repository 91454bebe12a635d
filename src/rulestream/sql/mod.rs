//! Streaming query engine contract.
//!
//! SQL parsing and execution semantics live in an external engine; the node
//! consumes it through two calls: compile a query text into a reusable
//! [`ContinuousQuery`], then evaluate it either over an explicit row
//! sequence (the upstream branch) or by letting the engine pull its named
//! tables through a caller-supplied [`TableResolver`] (the subscription
//! branch).
//!
//! Table binding is async and fallible so that a resolver failure (most
//! importantly a topic subscription that cannot be established) surfaces
//! to the caller before any result stream exists, leaving nothing to tear
//! down.

pub mod types;

use async_trait::async_trait;
use futures::stream::BoxStream;
use std::error::Error;
use std::sync::Arc;

pub use types::{row_from_json, FieldValue, RowMap};

/// Lazy, possibly unbounded sequence of input rows.
pub type RowStream = BoxStream<'static, RowMap>;

/// Lazy, possibly unbounded sequence of query results.
///
/// Per-item errors (one row failing evaluation) surface as `Err` items;
/// they do not terminate the stream.
pub type QueryResultStream =
    BoxStream<'static, Result<RowMap, Box<dyn Error + Send + Sync>>>;

/// Resolves a named table reference to its row source.
///
/// Supplied by the caller of [`ContinuousQuery::evaluate_with_tables`];
/// `table` is `None` when the query has no FROM clause.
#[async_trait]
pub trait TableResolver: Send + Sync {
    async fn resolve(
        &self,
        table: Option<&str>,
    ) -> Result<RowStream, Box<dyn Error + Send + Sync>>;
}

/// A compiled, reusable continuous query.
#[async_trait]
pub trait ContinuousQuery: Send + Sync {
    /// Evaluate over an explicit row sequence.
    ///
    /// The result stream completes when the input completes. Each `Err`
    /// item reports one failed evaluation; subsequent rows still evaluate.
    fn evaluate(&self, rows: RowStream) -> QueryResultStream;

    /// Bind the query's named table references through `resolver`, then
    /// evaluate against the resolved sources.
    ///
    /// Errors returned here are binding failures (an unresolvable source,
    /// a failed subscription); no partial stream is created.
    async fn evaluate_with_tables(
        &self,
        resolver: Arc<dyn TableResolver>,
    ) -> Result<QueryResultStream, Box<dyn Error + Send + Sync>>;
}

/// Compiler surface of the streaming query engine.
///
/// Shared process-wide; compilation is read-only with respect to engine
/// state and performs no I/O.
pub trait QueryEngine: Send + Sync {
    /// Compile a query text into a reusable continuous query.
    fn compile(&self, sql: &str) -> Result<Arc<dyn ContinuousQuery>, Box<dyn Error + Send + Sync>>;
}
