//! The continuous-SQL task node and its run lifecycle.
//!
//! One node owns one continuous-query execution at a time. `start` compiles
//! the configured query, wires it to the selected source, and spawns a
//! delivery loop whose cancellable resources are collected into a single
//! [`TaskHandle`]. `reload` and `stop` dispose that handle before anything
//! else (dispose-then-replace, never replace-then-dispose), so no result
//! from a previous run can be delivered once disposal begins.
//!
//! Error policy: setup failures (configuration, compilation, subscription)
//! abort the attempt and leave the node re-startable with no partial
//! handle; per-result failures (evaluation, write, event) are logged,
//! reported through the context, and never abort the stream.

use crate::rulestream::bus::TopicBus;
use crate::rulestream::sql::types::RowMap;
use crate::rulestream::sql::{ContinuousQuery, QueryEngine, QueryResultStream};
use crate::rulestream::task::context::{ExecutionContext, RecordStream, EVENT_RESULT};
use crate::rulestream::task::error::{TaskError, TaskResult};
use crate::rulestream::task::source::{SelectedSource, StreamSourceSelector};
use async_trait::async_trait;
use futures::stream::{self, StreamExt};
use log::{debug, error, info};
use std::fmt;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

/// Task node lifecycle states.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleState {
    /// Node constructed, no run started yet
    Created,
    /// Pre-flight query compilation in progress
    Validating,
    /// Delivery loop active
    Running,
    /// Current run being disposed before a restart
    Reloading,
    /// Node stopped, no active run
    Stopped,
}

impl LifecycleState {
    pub fn as_str(&self) -> &str {
        match self {
            LifecycleState::Created => "created",
            LifecycleState::Validating => "validating",
            LifecycleState::Running => "running",
            LifecycleState::Reloading => "reloading",
            LifecycleState::Stopped => "stopped",
        }
    }
}

impl fmt::Display for LifecycleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Lifecycle surface the surrounding engine drives.
///
/// The engine guarantees lifecycle calls are never invoked concurrently on
/// the same node instance, so implementations need no internal locking.
#[async_trait]
pub trait TaskNode: Send {
    /// Display name of this node type.
    fn name(&self) -> &str;

    /// Current lifecycle state.
    fn state(&self) -> LifecycleState;

    /// Pre-flight the configuration: compile the query and discard it.
    ///
    /// No side effects: no subscription is created and no run is touched.
    fn validate(&mut self) -> TaskResult<()>;

    /// Compile the query, wire it to its source, and begin delivering
    /// results. Disposes any prior run first.
    async fn start(&mut self) -> TaskResult<()>;

    /// Dispose the current run, recompile from the current configuration,
    /// and start again. Safe to call while running.
    async fn reload(&mut self) -> TaskResult<()>;

    /// Dispose the current run. Idempotent.
    async fn stop(&mut self);
}

/// The live, cancellable resources of one task run.
///
/// Composes the shutdown signal and the delivery loop's join handle into a
/// single disposal unit: disposing signals the loop, aborts it, and awaits
/// termination, so no result can be delivered after `dispose` returns.
/// A future per-query timeout must route through this same unit.
pub struct TaskHandle {
    shutdown: mpsc::Sender<()>,
    join: JoinHandle<()>,
    disposed: bool,
}

impl TaskHandle {
    fn new(shutdown: mpsc::Sender<()>, join: JoinHandle<()>) -> Self {
        Self {
            shutdown,
            join,
            disposed: false,
        }
    }

    pub fn is_disposed(&self) -> bool {
        self.disposed
    }

    /// Release this run's resources. Disposing twice is a no-op.
    pub async fn dispose(&mut self) {
        if self.disposed {
            return;
        }
        self.disposed = true;
        if self.shutdown.try_send(()).is_err() {
            // Loop already gone or signal pending; abort covers both.
            debug!("shutdown signal not delivered, aborting delivery loop");
        }
        self.join.abort();
        // Wait out the abort so no in-flight result lands after we return.
        let _ = (&mut self.join).await;
    }
}

impl Drop for TaskHandle {
    fn drop(&mut self) {
        if !self.disposed {
            self.join.abort();
        }
    }
}

/// A task node running one continuous SQL query.
pub struct SqlTaskNode {
    context: Arc<dyn ExecutionContext>,
    bus: Arc<dyn TopicBus>,
    engine: Arc<dyn QueryEngine>,
    query: Option<Arc<dyn ContinuousQuery>>,
    handle: Option<TaskHandle>,
    state: LifecycleState,
}

impl SqlTaskNode {
    pub fn new(
        context: Arc<dyn ExecutionContext>,
        bus: Arc<dyn TopicBus>,
        engine: Arc<dyn QueryEngine>,
    ) -> Self {
        Self {
            context,
            bus,
            engine,
            query: None,
            handle: None,
            state: LifecycleState::Created,
        }
    }

    /// Read the `sql` entry from the current configuration and compile it.
    fn compile(&self) -> TaskResult<Arc<dyn ContinuousQuery>> {
        let sql = self.context.job().configuration.sql()?;
        self.engine
            .compile(&sql)
            .map_err(|err| TaskError::query_compilation(err.to_string(), Some(sql)))
    }

    /// The query compiled by the most recent `start`, if any.
    ///
    /// `validate` compiles and discards; only `start` retains the query.
    pub fn query(&self) -> Option<&Arc<dyn ContinuousQuery>> {
        self.query.as_ref()
    }

    async fn dispose_current(&mut self) {
        if let Some(mut handle) = self.handle.take() {
            handle.dispose().await;
        }
    }
}

#[async_trait]
impl TaskNode for SqlTaskNode {
    fn name(&self) -> &str {
        "StreamSQL"
    }

    fn state(&self) -> LifecycleState {
        self.state
    }

    fn validate(&mut self) -> TaskResult<()> {
        let prior = self.state;
        self.state = LifecycleState::Validating;
        let result = self.compile().map(|_| ());
        self.state = prior;
        result
    }

    async fn start(&mut self) -> TaskResult<()> {
        self.dispose_current().await;

        let query = self.compile()?;
        self.query = Some(Arc::clone(&query));

        // Source selection may subscribe; failures here leave no handle.
        let source = StreamSourceSelector::select(&self.context, &self.bus, &query).await?;

        let (shutdown_tx, shutdown_rx) = mpsc::channel(1);
        let context = Arc::clone(&self.context);
        let join = match source {
            SelectedSource::Upstream(rows) => {
                tokio::spawn(run_upstream(context, query, rows, shutdown_rx))
            }
            SelectedSource::Resolved(results) => {
                tokio::spawn(run_resolved(context, results, shutdown_rx))
            }
        };

        self.handle = Some(TaskHandle::new(shutdown_tx, join));
        self.state = LifecycleState::Running;
        info!("task '{}' started", self.context.instance_id());
        Ok(())
    }

    async fn reload(&mut self) -> TaskResult<()> {
        info!("task '{}' reloading", self.context.instance_id());
        self.state = LifecycleState::Reloading;
        self.dispose_current().await;
        self.start().await
    }

    async fn stop(&mut self) {
        self.dispose_current().await;
        if self.state != LifecycleState::Stopped {
            info!("task '{}' stopped", self.context.instance_id());
        }
        self.state = LifecycleState::Stopped;
    }
}

/// Deliver one result: write to the output sink, then fire the `result`
/// event. Failures are reported as non-fatal delivery errors; the result
/// is dropped and the caller moves on.
async fn deliver(context: &Arc<dyn ExecutionContext>, row: RowMap) {
    let record = context.new_rule_data(row);
    if let Err(err) = context.write_output(record.clone()).await {
        error!("output write failed: {}", err);
        context
            .on_error(TaskError::delivery(err.to_string(), None))
            .await;
        return;
    }
    if let Err(err) = context.fire_event(EVENT_RESULT, record).await {
        error!("event '{}' failed: {}", EVENT_RESULT, err);
        context
            .on_error(TaskError::delivery(
                err.to_string(),
                Some(EVENT_RESULT.to_string()),
            ))
            .await;
    }
}

/// Delivery loop for the upstream branch: every input row triggers one
/// independent single-row evaluation. A failed evaluation is reported and
/// skipped; subsequent rows keep flowing.
async fn run_upstream(
    context: Arc<dyn ExecutionContext>,
    query: Arc<dyn ContinuousQuery>,
    mut rows: RecordStream,
    mut shutdown_rx: mpsc::Receiver<()>,
) {
    loop {
        tokio::select! {
            _ = shutdown_rx.recv() => {
                debug!("task '{}': shutdown signal received", context.instance_id());
                break;
            }
            next = rows.next() => {
                let Some(record) = next else {
                    debug!("task '{}': upstream completed", context.instance_id());
                    break;
                };
                let row = record.into_row_map();
                let mut results = query.evaluate(stream::iter(std::iter::once(row)).boxed());
                while let Some(item) = results.next().await {
                    match item {
                        Ok(result) => deliver(&context, result).await,
                        Err(err) => {
                            error!("query evaluation failed: {}", err);
                            context
                                .on_error(TaskError::row_evaluation(err.to_string()))
                                .await;
                        }
                    }
                }
            }
        }
    }
}

/// Delivery loop for the resolved-table branch: drain the engine's result
/// stream until it completes or the run is disposed.
async fn run_resolved(
    context: Arc<dyn ExecutionContext>,
    mut results: QueryResultStream,
    mut shutdown_rx: mpsc::Receiver<()>,
) {
    loop {
        tokio::select! {
            _ = shutdown_rx.recv() => {
                debug!("task '{}': shutdown signal received", context.instance_id());
                break;
            }
            next = results.next() => {
                let Some(item) = next else {
                    debug!("task '{}': result stream completed", context.instance_id());
                    break;
                };
                match item {
                    Ok(result) => deliver(&context, result).await,
                    Err(err) => {
                        error!("query pipeline error: {}", err);
                        context
                            .on_error(TaskError::row_evaluation(err.to_string()))
                            .await;
                    }
                }
            }
        }
    }
}
