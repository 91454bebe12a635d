//! Task node lifecycle tests.
//!
//! Drives `SqlTaskNode` through validate/start/reload/stop against the
//! contract doubles and verifies the disposal and error-propagation rules:
//! setup failures abort cleanly, per-result failures never kill the
//! pipeline, and no result from a disposed run is ever delivered.

use serde_json::json;
use std::sync::Arc;
use std::time::Duration;

use rulestream::rulestream::bus::TopicBus;
use rulestream::rulestream::sql::types::FieldValue;
use rulestream::rulestream::sql::QueryEngine;
use rulestream::rulestream::task::{
    ExecutionContext, JobDefinition, LifecycleState, SqlTaskNode, TaskError, TaskNode,
};

use crate::unit::test_utils::{
    init_logging, job_with_input, job_without_inputs, row, sql_config, wait_until,
    MockExecutionContext, MockTopicBus, ScriptedQueryEngine,
};

fn node_for(
    job: JobDefinition,
) -> (SqlTaskNode, Arc<MockExecutionContext>, Arc<MockTopicBus>) {
    init_logging();
    let context = MockExecutionContext::new(job);
    let bus = MockTopicBus::new();
    let node = SqlTaskNode::new(
        Arc::clone(&context) as Arc<dyn ExecutionContext>,
        Arc::clone(&bus) as Arc<dyn TopicBus>,
        Arc::new(ScriptedQueryEngine) as Arc<dyn QueryEngine>,
    );
    (node, context, bus)
}

#[tokio::test]
async fn test_validate_accepts_good_configuration() {
    let (mut node, _context, bus) = node_for(job_without_inputs("select 1 c"));
    assert_eq!(node.state(), LifecycleState::Created);
    node.validate().unwrap();
    assert_eq!(node.state(), LifecycleState::Created);
    // Pre-flight must be side-effect free: no subscription, no retained query.
    assert_eq!(bus.subscribe_count(), 0);
    assert!(node.query().is_none());
}

#[tokio::test]
async fn test_missing_sql_fails_validate_and_start_without_subscribing() {
    let mut job = job_without_inputs("select 1 c");
    job.configuration = sql_config("ignored");
    job.configuration.insert("sql", json!(42));
    let (mut node, _context, bus) = node_for(job);

    let err = node.validate().unwrap_err();
    assert_eq!(err, TaskError::configuration("missing or invalid sql"));

    let err = node.start().await.unwrap_err();
    assert_eq!(err, TaskError::configuration("missing or invalid sql"));
    assert_ne!(node.state(), LifecycleState::Running);
    assert_eq!(bus.subscribe_count(), 0);
}

#[tokio::test]
async fn test_uncompilable_sql_fails_without_subscribing() {
    let (mut node, _context, bus) = node_for(job_without_inputs("definitely not sql"));

    let err = node.validate().unwrap_err();
    assert!(matches!(err, TaskError::QueryCompilation { .. }));
    assert!(err.is_fatal());

    assert!(node.start().await.is_err());
    assert_eq!(bus.subscribe_count(), 0);
}

#[tokio::test]
async fn test_constant_query_delivers_one_row_and_one_event() {
    let (mut node, context, _bus) = node_for(job_without_inputs("select 1 c"));
    node.start().await.unwrap();
    assert_eq!(node.state(), LifecycleState::Running);
    assert!(node.query().is_some());

    let ctx = Arc::clone(&context);
    wait_until(move || ctx.write_count() == 1, "one delivered result").await;
    // The synthetic source is a single row; nothing further may arrive.
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(context.write_count(), 1);
    assert_eq!(
        context.written_payloads(),
        vec![row(vec![("c", FieldValue::Integer(1))])]
    );
    assert_eq!(context.event_names(), vec!["result".to_string()]);
    node.stop().await;
}

#[tokio::test]
async fn test_upstream_rows_each_yield_one_write_event_pair() {
    let (mut node, context, _bus) = node_for(job_with_input("select value*2 v"));
    context.set_input_rows(vec![
        row(vec![("value", FieldValue::Integer(5))]),
        row(vec![("value", FieldValue::Integer(7))]),
    ]);
    node.start().await.unwrap();

    let ctx = Arc::clone(&context);
    wait_until(move || ctx.write_count() == 2, "two delivered results").await;
    assert_eq!(
        context.written_payloads(),
        vec![
            row(vec![("v", FieldValue::Integer(10))]),
            row(vec![("v", FieldValue::Integer(14))]),
        ]
    );
    assert_eq!(context.event_count(), 2);
    assert!(context.reported_errors().is_empty());
    node.stop().await;
}

#[tokio::test]
async fn test_failing_row_is_reported_and_pipeline_continues() {
    let (mut node, context, _bus) = node_for(job_with_input("select value*2 v"));
    context.set_input_rows(vec![
        row(vec![("value", FieldValue::Integer(5))]),
        row(vec![("value", FieldValue::String("oops".to_string()))]),
        row(vec![("value", FieldValue::Integer(7))]),
    ]);
    node.start().await.unwrap();

    let ctx = Arc::clone(&context);
    wait_until(move || ctx.write_count() == 2, "two delivered results").await;
    assert_eq!(
        context.written_payloads(),
        vec![
            row(vec![("v", FieldValue::Integer(10))]),
            row(vec![("v", FieldValue::Integer(14))]),
        ]
    );
    let errors = context.reported_errors();
    assert_eq!(errors.len(), 1);
    assert!(matches!(errors[0], TaskError::RowEvaluation { .. }));
    assert!(!errors[0].is_fatal());
    node.stop().await;
}

#[tokio::test]
async fn test_failed_write_drops_result_and_continues() {
    let (mut node, context, bus) =
        node_for(job_without_inputs("select * from \"/device/+/event\""));
    context.fail_next_writes(1);
    node.start().await.unwrap();

    assert!(bus.publish(0, "/device/d-1/event", json!({"value": 1})));
    assert!(bus.publish(0, "/device/d-1/event", json!({"value": 2})));

    let ctx = Arc::clone(&context);
    wait_until(move || ctx.write_attempts() == 2, "two write attempts").await;
    let ctx = Arc::clone(&context);
    wait_until(move || ctx.write_count() == 1, "the surviving result").await;

    // The dropped result produced no event and one delivery error.
    assert_eq!(context.event_count(), 1);
    let errors = context.reported_errors();
    assert_eq!(errors.len(), 1);
    assert!(matches!(errors[0], TaskError::Delivery { .. }));
    node.stop().await;
}

#[tokio::test]
async fn test_failed_event_is_reported_after_successful_write() {
    let (mut node, context, bus) =
        node_for(job_without_inputs("select * from \"/device/+/event\""));
    context.fail_next_events(1);
    node.start().await.unwrap();

    assert!(bus.publish(0, "/device/d-1/event", json!({"value": 1})));

    let ctx = Arc::clone(&context);
    wait_until(move || !ctx.reported_errors().is_empty(), "delivery error").await;
    // Write landed; only the event fire failed.
    assert_eq!(context.write_count(), 1);
    assert_eq!(context.event_count(), 0);
    assert_eq!(
        context.reported_errors(),
        vec![TaskError::delivery(
            "event channel closed",
            Some("result".to_string())
        )]
    );
    node.stop().await;
}

#[tokio::test]
async fn test_subscription_failure_leaves_node_restartable() {
    let (mut node, _context, bus) =
        node_for(job_without_inputs("select * from \"/device/+/event\""));
    bus.set_fail_subscribe(true);

    let err = node.start().await.unwrap_err();
    assert!(matches!(err, TaskError::Subscription { .. }));
    assert_ne!(node.state(), LifecycleState::Running);

    // No internal retry: the surrounding engine restarts explicitly.
    bus.set_fail_subscribe(false);
    node.start().await.unwrap();
    assert_eq!(node.state(), LifecycleState::Running);
    assert_eq!(bus.subscribe_count(), 1);
    node.stop().await;
}

#[tokio::test]
async fn test_reload_disposes_old_run_before_creating_new_subscription() {
    // The slow variant holds each pulled result for 50ms before delivery,
    // modelling an in-flight result at reload time.
    let (mut node, context, bus) =
        node_for(job_without_inputs("select slow v from \"/device/+/event\""));
    node.start().await.unwrap();
    assert_eq!(bus.subscribe_count(), 1);

    // m1 enters the old pipeline and is still in flight when we reload.
    assert!(bus.publish(0, "/device/d-1/event", json!({"seq": 1})));
    tokio::time::sleep(Duration::from_millis(10)).await;

    node.reload().await.unwrap();
    assert_eq!(node.state(), LifecycleState::Running);
    assert_eq!(bus.subscribe_count(), 2);

    // Nothing from the pre-reload run may land, even after its delay.
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(context.write_count(), 0);

    // The old stream has no consumer anymore; the new one delivers.
    assert!(!bus.publish(0, "/device/d-1/event", json!({"seq": 2})));
    assert!(bus.publish(1, "/device/d-1/event", json!({"seq": 3})));
    let ctx = Arc::clone(&context);
    wait_until(move || ctx.write_count() == 1, "post-reload delivery").await;
    let payloads = context.written_payloads();
    assert_eq!(payloads[0].get("seq"), Some(&FieldValue::Integer(3)));
    node.stop().await;
}

#[tokio::test]
async fn test_reload_recompiles_and_restarts() {
    let (mut node, context, _bus) = node_for(job_without_inputs("select 1 c"));
    node.start().await.unwrap();
    let ctx = Arc::clone(&context);
    wait_until(move || ctx.write_count() == 1, "first run's result").await;

    // Configuration is reread and recompiled; the new run delivers again.
    node.reload().await.unwrap();
    let ctx = Arc::clone(&context);
    wait_until(move || ctx.write_count() == 2, "second run's result").await;
    node.stop().await;
}

#[tokio::test]
async fn test_stop_then_stop_is_a_noop() {
    let (mut node, context, bus) =
        node_for(job_without_inputs("select * from \"/device/+/event\""));
    node.start().await.unwrap();
    node.stop().await;
    assert_eq!(node.state(), LifecycleState::Stopped);
    node.stop().await;
    assert_eq!(node.state(), LifecycleState::Stopped);

    // Disposed run delivers nothing.
    assert!(!bus.publish(0, "/device/d-1/event", json!({"value": 1})));
    tokio::time::sleep(Duration::from_millis(20)).await;
    assert_eq!(context.write_count(), 0);
}

#[tokio::test]
async fn test_stop_before_start_is_a_noop() {
    let (mut node, _context, _bus) = node_for(job_without_inputs("select 1 c"));
    node.stop().await;
    assert_eq!(node.state(), LifecycleState::Stopped);
}
