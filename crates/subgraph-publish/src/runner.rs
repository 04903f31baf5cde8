//! Execution of publish commands.
//!
//! [`RoverCli`] shells out to the Apollo `rover` binary. [`RecordingRunner`]
//! records commands in memory and replays a scripted result.

use std::process::Stdio;
use std::sync::Mutex;

use async_trait::async_trait;
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tokio::process::Command;
use tracing::debug;

use crate::command::{APOLLO_KEY, PublishCommand};
use crate::error::ProcessExecutionError;

/// Captured result of a finished process.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProcessOutput {
    /// Exit code, `None` when terminated by a signal.
    pub code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl ProcessOutput {
    pub fn success(stdout: impl Into<String>) -> Self {
        Self {
            code: Some(0),
            stdout: stdout.into(),
            stderr: String::new(),
        }
    }

    pub fn failure(code: i32, stderr: impl Into<String>) -> Self {
        Self {
            code: Some(code),
            stdout: String::new(),
            stderr: stderr.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        self.code == Some(0)
    }
}

impl From<std::process::Output> for ProcessOutput {
    fn from(output: std::process::Output) -> Self {
        Self {
            code: output.status.code(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        }
    }
}

/// Runs a publish command to completion.
#[async_trait]
pub trait PublishRunner: Send + Sync {
    /// Runs `command` once.
    ///
    /// A process that ran but failed is `Ok` with a non-zero code; `Err` is
    /// reserved for processes that could not be run at all.
    async fn run(&self, command: &PublishCommand) -> Result<ProcessOutput, ProcessExecutionError>;
}

/// Publishes with `rover subgraph introspect | rover subgraph publish`.
#[derive(Debug, Clone)]
pub struct RoverCli {
    program: String,
}

impl Default for RoverCli {
    fn default() -> Self {
        Self::new("rover")
    }
}

impl RoverCli {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }

    fn command(&self, command: &PublishCommand) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.env(APOLLO_KEY, &command.registry_key)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        cmd
    }

    async fn introspect(&self, command: &PublishCommand) -> Result<ProcessOutput, ProcessExecutionError> {
        let output = self
            .command(command)
            .args(["subgraph", "introspect", command.introspection_endpoint.as_str()])
            .stdin(Stdio::null())
            .output()
            .await
            .map_err(|e| ProcessExecutionError::spawn(&self.program, e))?;
        Ok(output.into())
    }

    async fn publish(&self, command: &PublishCommand, schema: &str) -> Result<ProcessOutput, ProcessExecutionError> {
        let graph_ref = command.graph_ref();
        let mut child = self
            .command(command)
            .args([
                "subgraph",
                "publish",
                graph_ref.as_str(),
                "--name",
                command.subgraph_name.as_str(),
                "--routing-url",
                command.routing_url.as_str(),
                "--schema",
                "-",
            ])
            .stdin(Stdio::piped())
            .spawn()
            .map_err(|e| ProcessExecutionError::spawn(&self.program, e))?;

        if let Some(stdin) = child.stdin.take() {
            pipe_schema(&self.program, stdin, schema).await?;
        }

        let output = child
            .wait_with_output()
            .await
            .map_err(|e| ProcessExecutionError::io(&self.program, "collecting its output", e))?;
        Ok(output.into())
    }
}

/// Writes `schema` to the child's stdin and closes it.
async fn pipe_schema<W>(program: &str, mut stdin: W, schema: &str) -> Result<(), ProcessExecutionError>
where
    W: AsyncWrite + Unpin,
{
    stdin
        .write_all(schema.as_bytes())
        .await
        .map_err(|e| ProcessExecutionError::io(program, "writing the schema to stdin", e))?;
    stdin
        .shutdown()
        .await
        .map_err(|e| ProcessExecutionError::io(program, "writing the schema to stdin", e))
}

#[async_trait]
impl PublishRunner for RoverCli {
    async fn run(&self, command: &PublishCommand) -> Result<ProcessOutput, ProcessExecutionError> {
        debug!(endpoint = %command.introspection_endpoint, "Introspecting served schema");
        let introspection = self.introspect(command).await?;
        if !introspection.is_success() {
            return Ok(introspection);
        }

        debug!(
            graph_ref = %command.graph_ref(),
            subgraph = %command.subgraph_name,
            bytes = introspection.stdout.len(),
            "Publishing subgraph schema"
        );
        self.publish(command, &introspection.stdout).await
    }
}

/// In-memory runner for tests.
#[derive(Debug, Default)]
pub struct RecordingRunner {
    output: ProcessOutput,
    failure: Mutex<Option<ProcessExecutionError>>,
    calls: Mutex<Vec<PublishCommand>>,
}

impl RecordingRunner {
    /// Every run returns `output`.
    pub fn new(output: ProcessOutput) -> Self {
        Self {
            output,
            ..Default::default()
        }
    }

    /// The first run fails with `error`.
    pub fn failing(error: ProcessExecutionError) -> Self {
        Self {
            failure: Mutex::new(Some(error)),
            ..Default::default()
        }
    }

    /// Commands received so far.
    pub fn calls(&self) -> Vec<PublishCommand> {
        self.calls.lock().map(|c| c.clone()).unwrap_or_default()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().map(|c| c.len()).unwrap_or_default()
    }
}

#[async_trait]
impl PublishRunner for RecordingRunner {
    async fn run(&self, command: &PublishCommand) -> Result<ProcessOutput, ProcessExecutionError> {
        if let Ok(mut calls) = self.calls.lock() {
            calls.push(command.clone());
        }
        let failure = self.failure.lock().ok().and_then(|mut f| f.take());
        match failure {
            Some(error) => Err(error),
            None => Ok(self.output.clone()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::GraphTarget;

    fn command() -> PublishCommand {
        PublishCommand {
            registry_key: "k1".into(),
            target: GraphTarget::GraphRef("g@v1".into()),
            subgraph_name: "svc".into(),
            routing_url: "http://gateway.openfaas:8080/function/fn".into(),
            introspection_endpoint: "http://localhost:3000/graphql".into(),
        }
    }

    #[tokio::test]
    async fn test_recording_runner_records_and_replays() {
        let runner = RecordingRunner::new(ProcessOutput::success("published"));
        let output = runner.run(&command()).await.unwrap();

        assert_eq!(output.stdout, "published");
        assert_eq!(runner.call_count(), 1);
        assert_eq!(runner.calls()[0], command());
    }

    #[tokio::test]
    async fn test_missing_binary_is_a_spawn_error() {
        let runner = RoverCli::new("/nonexistent/rover-binary");
        let err = runner.run(&command()).await.unwrap_err();
        assert!(matches!(err, ProcessExecutionError::Spawn { .. }));
    }

    #[tokio::test]
    async fn test_pipe_schema_writes_and_closes() {
        let (writer, mut reader) = tokio::io::duplex(1024);
        pipe_schema("rover", writer, "type Query { ping: String }").await.unwrap();

        let mut received = String::new();
        tokio::io::AsyncReadExt::read_to_string(&mut reader, &mut received).await.unwrap();
        assert_eq!(received, "type Query { ping: String }");
    }

    #[tokio::test]
    async fn test_closed_stdin_is_not_a_spawn_error() {
        let (writer, reader) = tokio::io::duplex(16);
        drop(reader);

        let err = pipe_schema("rover", writer, "type Query { ping: String }")
            .await
            .unwrap_err();
        assert!(
            matches!(err, ProcessExecutionError::Io { ref program, stage, .. } if program == "rover" && stage == "writing the schema to stdin")
        );
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_failed_introspection_stops_before_publish() {
        // `false` ignores its arguments and exits with status 1.
        let runner = RoverCli::new("false");
        let output = runner.run(&command()).await.unwrap();
        assert_eq!(output.code, Some(1));
    }
}
