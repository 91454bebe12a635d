//! Stream source selection.
//!
//! Decided once per task (re)start: a node with declared upstream inputs
//! feeds each upstream row to the query as an independent single-row
//! evaluation; a node without inputs lets the query pull its named tables,
//! resolved against the topic bus.
//!
//! Table resolution is a deliberately narrow heuristic, not a catalog:
//! `dual` (or no table) is a single synthetic row, a leading `/` is a topic
//! pattern, and anything else falls back to the synthetic row. Surrounding
//! tooling depends on the exact fallback behavior; do not generalize it.

use crate::rulestream::bus::{Subscription, TopicBus};
use crate::rulestream::sql::types::{FieldValue, RowMap};
use crate::rulestream::sql::{ContinuousQuery, QueryResultStream, RowStream, TableResolver};
use crate::rulestream::task::context::{ExecutionContext, RecordStream};
use crate::rulestream::task::error::{TaskError, TaskResult};
use async_trait::async_trait;
use futures::stream::{self, StreamExt};
use log::debug;
use std::error::Error;
use std::sync::Arc;

/// Prefix namespacing this node's subscriber identity on the bus.
const SUBSCRIBER_PREFIX: &str = "rule-engine:";

/// The source a (re)started run consumes from.
pub enum SelectedSource {
    /// Upstream rows; each triggers one single-row query evaluation.
    Upstream(RecordStream),
    /// Engine-pulled results with tables resolved against the bus.
    Resolved(QueryResultStream),
}

/// Decides where a run's input rows come from and wires the query to them.
pub struct StreamSourceSelector;

impl StreamSourceSelector {
    /// Select the source for one run of `query` under `context`.
    ///
    /// A bus subscription that cannot be established surfaces here as a
    /// fatal [`TaskError::Subscription`]; nothing has been spawned yet, so
    /// the caller is left with no partial state to tear down.
    pub async fn select(
        context: &Arc<dyn ExecutionContext>,
        bus: &Arc<dyn TopicBus>,
        query: &Arc<dyn ContinuousQuery>,
    ) -> TaskResult<SelectedSource> {
        if context.job().has_inputs() {
            debug!(
                "task '{}': consuming upstream rows from {} input(s)",
                context.instance_id(),
                context.job().inputs.len()
            );
            return Ok(SelectedSource::Upstream(context.accept()));
        }

        let resolver = Arc::new(TopicTableResolver::new(
            Arc::clone(bus),
            format!("{}{}", SUBSCRIBER_PREFIX, context.instance_id()),
        ));
        let results = query
            .evaluate_with_tables(resolver)
            .await
            .map_err(|err| TaskError::subscription(err.to_string(), None))?;
        Ok(SelectedSource::Resolved(results))
    }
}

/// Resolves the query's named tables against the topic bus.
///
/// Holds the subscriber identity for the owning task so every subscription
/// this run creates is attributable to it.
pub struct TopicTableResolver {
    bus: Arc<dyn TopicBus>,
    subscriber_id: String,
}

impl TopicTableResolver {
    pub fn new(bus: Arc<dyn TopicBus>, subscriber_id: String) -> Self {
        Self { bus, subscriber_id }
    }

    pub fn subscriber_id(&self) -> &str {
        &self.subscriber_id
    }

    /// The single synthetic row backing constant/scalar queries.
    fn synthetic_row() -> RowStream {
        let mut row = RowMap::new();
        row.insert("dual".to_string(), FieldValue::Integer(1));
        stream::iter(std::iter::once(row)).boxed()
    }
}

#[async_trait]
impl TableResolver for TopicTableResolver {
    async fn resolve(
        &self,
        table: Option<&str>,
    ) -> Result<RowStream, Box<dyn Error + Send + Sync>> {
        let table = match table {
            None => return Ok(Self::synthetic_row()),
            Some(t) => t,
        };
        if table.eq_ignore_ascii_case("dual") {
            return Ok(Self::synthetic_row());
        }
        if table.starts_with('/') {
            // One non-acknowledged subscription per run; messages become rows.
            let messages = self
                .bus
                .subscribe(vec![Subscription::new(table)], &self.subscriber_id, false)
                .await?;
            return Ok(messages.map(|message| message.convert()).boxed());
        }
        // No table catalog: unknown names get the same synthetic row as dual.
        debug!(
            "no table catalog entry for '{}', resolving to single-row source",
            table
        );
        Ok(Self::synthetic_row())
    }
}
