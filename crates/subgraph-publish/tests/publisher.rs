//! State machine tests for the schema publisher.

use std::sync::Arc;

use subgraph_config::ResolvedConfiguration;
use subgraph_publish::{
    ConfigMissing, ProcessExecutionError, ProcessOutput, PublishOutcome, PublisherSettings,
    RecordingRunner, SchemaPublisher, SkipReason,
};

fn config(pairs: &[(&str, &str)]) -> ResolvedConfiguration {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

fn valid_config() -> ResolvedConfiguration {
    config(&[
        ("APOLLO_KEY", "k1"),
        ("APOLLO_GRAPH_REF", "g@v1"),
        ("OPENFAAS_SERVICE_NAME", "svc"),
        ("OPENFAAS_FUNCTION_NAME", "fn"),
    ])
}

fn publisher(runner: Arc<RecordingRunner>) -> SchemaPublisher {
    SchemaPublisher::new(runner, PublisherSettings::for_port(3000))
}

#[tokio::test]
async fn test_no_key_skips_without_running() {
    let runner = Arc::new(RecordingRunner::new(ProcessOutput::success("unused")));
    let outcome = publisher(runner.clone())
        .publish(&config(&[("APOLLO_GRAPH_REF", "g@v1"), ("OPENFAAS_SERVICE_NAME", "svc")]))
        .await;

    assert!(matches!(outcome, PublishOutcome::Skipped(SkipReason::NoRegistryKey)));
    assert_eq!(runner.call_count(), 0);
}

#[tokio::test]
async fn test_missing_fields_skip_lists_both() {
    let runner = Arc::new(RecordingRunner::new(ProcessOutput::success("unused")));
    let outcome = publisher(runner.clone())
        .publish(&config(&[("APOLLO_KEY", "k1")]))
        .await;

    match outcome {
        PublishOutcome::Skipped(SkipReason::MissingFields(ConfigMissing { fields })) => {
            assert_eq!(fields, vec!["APOLLO_GRAPH_REF", "OPENFAAS_SERVICE_NAME"]);
        }
        other => panic!("expected missing fields, got {other:?}"),
    }
    assert_eq!(runner.call_count(), 0);
}

#[tokio::test]
async fn test_valid_config_runs_once_and_succeeds() {
    let runner = Arc::new(RecordingRunner::new(ProcessOutput::success("Published!\n")));
    let outcome = publisher(runner.clone()).publish(&valid_config()).await;

    match outcome {
        PublishOutcome::Succeeded(stdout) => assert_eq!(stdout, "Published!\n"),
        other => panic!("expected success, got {other:?}"),
    }

    let calls = runner.calls();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].routing_url, "http://gateway.openfaas:8080/function/fn");
    assert_eq!(calls[0].graph_ref(), "g@v1");
    assert_eq!(calls[0].subgraph_name, "svc");
    assert_eq!(calls[0].registry_key, "k1");
    assert_eq!(calls[0].introspection_endpoint, "http://localhost:3000/graphql");
}

#[tokio::test]
async fn test_non_zero_exit_is_failed_with_stderr() {
    let runner = Arc::new(RecordingRunner::new(ProcessOutput::failure(1, "error: invalid key")));
    let outcome = publisher(runner.clone()).publish(&valid_config()).await;

    match outcome {
        PublishOutcome::Failed(ProcessExecutionError::NonZeroExit { code, stderr }) => {
            assert_eq!(code, Some(1));
            assert_eq!(stderr, "error: invalid key");
        }
        other => panic!("expected failure, got {other:?}"),
    }
    assert_eq!(runner.call_count(), 1);
}

#[tokio::test]
async fn test_spawn_error_is_failed() {
    let error = ProcessExecutionError::spawn(
        "rover",
        std::io::Error::new(std::io::ErrorKind::NotFound, "not found"),
    );
    let runner = Arc::new(RecordingRunner::failing(error));
    let outcome = publisher(runner.clone()).publish(&valid_config()).await;

    assert!(matches!(outcome, PublishOutcome::Failed(ProcessExecutionError::Spawn { .. })));
}

#[tokio::test]
async fn test_spawn_runs_detached() {
    let runner = Arc::new(RecordingRunner::new(ProcessOutput::success("ok")));
    let handle = publisher(runner.clone()).spawn(Arc::new(valid_config()));

    let outcome = handle.await.unwrap();
    assert!(outcome.is_success());
    assert_eq!(runner.call_count(), 1);
}

#[test]
fn test_plan_uses_legacy_trio() {
    let runner = Arc::new(RecordingRunner::default());
    let command = publisher(runner)
        .plan(&config(&[
            ("APOLLO_KEY", "k1"),
            ("APOLLO_GRAPH_ID", "users"),
            ("APOLLO_GRAPH_VARIANT", "current"),
            ("APOLLO_SUPERGRAPH_NAME", "shop"),
            ("OPENFAAS_SERVICE_NAME", "svc"),
        ]))
        .unwrap();

    assert_eq!(command.graph_ref(), "users@current");
    assert_eq!(command.routing_url, "http://gateway.openfaas:8080/function/svc");
}
