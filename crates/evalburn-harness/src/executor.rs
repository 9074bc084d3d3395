use std::collections::BTreeMap;
use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use evalburn_core::{ExecutionConfig, ProblemSpec, TestCase, Value};
use serde::Deserialize;
use serde_json::json;
use tempfile::TempDir;
use thiserror::Error;
use tokio::fs;
use tokio::process::Command;
use tracing::{debug, instrument};

use crate::wire::{from_wire, to_wire, WireError};

/// Driver script run by the interpreter. It defines `TreeNode` and
/// `build_tree` in the submission's namespace before executing it.
const DRIVER_SOURCE: &str = include_str!("driver.py");

#[derive(Debug, Error)]
pub enum ExecutorError {
    #[error("Interpreter unavailable: {0}")]
    Unavailable(String),
    #[error("Timeout after {0}ms")]
    Timeout(u64),
    #[error("Interpreter exited without a report: {0}")]
    Crashed(String),
    #[error("Malformed driver report: {0}")]
    Protocol(String),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl ExecutorError {
    /// Short kind used in `Execution Error: <kind>` status messages.
    pub fn kind(&self) -> &'static str {
        match self {
            ExecutorError::Unavailable(_) => "ExecutorUnavailable",
            ExecutorError::Timeout(_) => "Timeout",
            ExecutorError::Crashed(_) => "InterpreterCrashed",
            ExecutorError::Protocol(_) => "ProtocolError",
            ExecutorError::Io(_) => "IOError",
        }
    }
}

impl From<WireError> for ExecutorError {
    fn from(e: WireError) -> Self {
        ExecutorError::Protocol(e.to_string())
    }
}

impl From<serde_json::Error> for ExecutorError {
    fn from(e: serde_json::Error) -> Self {
        ExecutorError::Protocol(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, ExecutorError>;

/// Everything the backend needs to run one submission.
#[derive(Debug, Clone)]
pub struct ExecutionRequest {
    pub code: String,
    pub method_name: String,
    pub inplace_modification: bool,
    pub output_is_tree: bool,
    /// Keyword arguments per test case, tree parameters already decoded.
    pub cases: Vec<BTreeMap<String, Value>>,
}

impl ExecutionRequest {
    pub fn for_problem(code: &str, problem: &ProblemSpec) -> Self {
        Self {
            code: code.to_string(),
            method_name: problem.method_name.clone(),
            inplace_modification: problem.inplace_modification,
            output_is_tree: problem.output_is_tree,
            cases: problem.test_cases.iter().map(TestCase::prepared_input).collect(),
        }
    }

    fn to_json(&self) -> serde_json::Value {
        let cases: Vec<serde_json::Value> = self
            .cases
            .iter()
            .map(|args| {
                serde_json::Value::Object(
                    args.iter()
                        .map(|(name, value)| (name.clone(), to_wire(value)))
                        .collect(),
                )
            })
            .collect();

        json!({
            "code": self.code,
            "method_name": self.method_name,
            "inplace_modification": self.inplace_modification,
            "output_is_tree": self.output_is_tree,
            "cases": cases,
        })
    }
}

/// What happened when the submission was defined and driven.
#[derive(Debug, Clone, PartialEq)]
pub enum ExecutionReport {
    /// Defining the code produced no callable `Solution`.
    ClassNotFound,
    /// An exception escaped while defining the code or inside the test loop.
    Raised {
        kind: String,
        message: String,
        case_index: Option<usize>,
    },
    /// Every case ran. One raw output per case, in order.
    Completed { outputs: Vec<Value>, elapsed_ms: f64 },
}

#[derive(Debug, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
enum DriverReport {
    Ok {
        outputs: Vec<serde_json::Value>,
        elapsed_ms: f64,
    },
    ClassNotFound,
    Error {
        kind: String,
        #[serde(default)]
        message: String,
        #[serde(default)]
        case: Option<usize>,
    },
}

impl TryFrom<DriverReport> for ExecutionReport {
    type Error = ExecutorError;

    fn try_from(report: DriverReport) -> Result<Self> {
        Ok(match report {
            DriverReport::Ok { outputs, elapsed_ms } => ExecutionReport::Completed {
                outputs: outputs
                    .into_iter()
                    .map(from_wire)
                    .collect::<std::result::Result<_, _>>()?,
                elapsed_ms,
            },
            DriverReport::ClassNotFound => ExecutionReport::ClassNotFound,
            DriverReport::Error {
                kind,
                message,
                case,
            } => ExecutionReport::Raised {
                kind,
                message,
                case_index: case,
            },
        })
    }
}

/// Capability to define a submission and drive its `Solution` class.
#[async_trait]
pub trait ExecutionBackend: Send + Sync {
    async fn execute(&self, request: &ExecutionRequest) -> Result<ExecutionReport>;
}

/// Runs each submission in a fresh Python interpreter process.
pub struct PythonBackend {
    interpreter: PathBuf,
    timeout: Duration,
}

impl PythonBackend {
    pub fn new(interpreter: impl Into<PathBuf>, timeout: Duration) -> Self {
        Self {
            interpreter: interpreter.into(),
            timeout,
        }
    }

    pub fn from_config(config: &ExecutionConfig) -> Self {
        Self::new(&config.python, config.timeout())
    }

    async fn run_driver(&self, workdir: &TempDir) -> Result<()> {
        let driver = workdir.path().join("driver.py");
        let request = workdir.path().join("request.json");
        let report = workdir.path().join("report.json");

        let mut cmd = Command::new(&self.interpreter);
        cmd.arg(&driver)
            .arg(&request)
            .arg(&report)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .current_dir(workdir.path());

        let child = cmd
            .spawn()
            .map_err(|e| ExecutorError::Unavailable(format!("{}: {}", self.interpreter.display(), e)))?;

        let output = match tokio::time::timeout(self.timeout, child.wait_with_output()).await {
            Ok(output) => output?,
            Err(_) => return Err(ExecutorError::Timeout(self.timeout.as_millis() as u64)),
        };

        let stdout = String::from_utf8_lossy(&output.stdout);
        if !stdout.trim().is_empty() {
            debug!("Submission stdout: {}", truncate(&stdout, 2000));
        }

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(ExecutorError::Crashed(format!(
                "{}: {}",
                output.status,
                truncate(stderr.trim(), 2000)
            )));
        }

        Ok(())
    }
}

#[async_trait]
impl ExecutionBackend for PythonBackend {
    #[instrument(skip_all, fields(method = %request.method_name, cases = request.cases.len()))]
    async fn execute(&self, request: &ExecutionRequest) -> Result<ExecutionReport> {
        let workdir = TempDir::new()?;
        fs::write(workdir.path().join("driver.py"), DRIVER_SOURCE).await?;
        fs::write(
            workdir.path().join("request.json"),
            serde_json::to_vec(&request.to_json())?,
        )
        .await?;

        self.run_driver(&workdir).await?;

        let raw = fs::read(workdir.path().join("report.json"))
            .await
            .map_err(|e| ExecutorError::Crashed(format!("no report written: {}", e)))?;
        let report: DriverReport = serde_json::from_slice(&raw)?;
        debug!("Driver report: {:?}", report);

        report.try_into()
    }
}

fn truncate(s: &str, max_chars: usize) -> &str {
    match s.char_indices().nth(max_chars) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_request_carries_decoded_trees() {
        let problem: ProblemSpec = serde_json::from_value(json!({
            "title": "Same Tree",
            "prompt": "",
            "method_name": "isSameTree",
            "test_cases": [{"input": {"p": [1, 2], "q": [1, null, 2]}, "output": false}]
        }))
        .unwrap();

        let request = ExecutionRequest::for_problem("class Solution: pass", &problem);
        let wire = request.to_json();
        assert_eq!(wire["method_name"], "isSameTree");
        assert_eq!(wire["inplace_modification"], false);
        assert_eq!(wire["cases"][0]["p"], json!({"__tree__": [[1, 1, null], [2, null, null]]}));
        assert_eq!(wire["cases"][0]["q"], json!({"__tree__": [[1, null, 1], [2, null, null]]}));
    }

    #[test]
    fn test_driver_reports_decode() {
        let ok: DriverReport =
            serde_json::from_value(json!({"status": "ok", "outputs": [[0, 1], null], "elapsed_ms": 0.25}))
                .unwrap();
        assert_eq!(
            ExecutionReport::try_from(ok).unwrap(),
            ExecutionReport::Completed {
                outputs: vec![Value::from(json!([0, 1])), Value::Null],
                elapsed_ms: 0.25,
            }
        );

        let missing: DriverReport =
            serde_json::from_value(json!({"status": "class_not_found"})).unwrap();
        assert_eq!(
            ExecutionReport::try_from(missing).unwrap(),
            ExecutionReport::ClassNotFound
        );

        let raised: DriverReport = serde_json::from_value(
            json!({"status": "error", "kind": "ZeroDivisionError", "message": "division by zero", "case": 1}),
        )
        .unwrap();
        assert_eq!(
            ExecutionReport::try_from(raised).unwrap(),
            ExecutionReport::Raised {
                kind: "ZeroDivisionError".into(),
                message: "division by zero".into(),
                case_index: Some(1),
            }
        );
    }

    #[test]
    fn test_error_kinds() {
        assert_eq!(ExecutorError::Timeout(10).kind(), "Timeout");
        assert_eq!(ExecutorError::Unavailable("x".into()).kind(), "ExecutorUnavailable");
        assert_eq!(ExecutorError::Protocol("x".into()).kind(), "ProtocolError");
    }

    #[test]
    fn test_truncate_respects_char_boundaries() {
        assert_eq!(truncate("héllo", 2), "hé");
        assert_eq!(truncate("abc", 10), "abc");
    }

    #[tokio::test]
    async fn test_missing_interpreter_is_unavailable() {
        let backend = PythonBackend::new("/nonexistent/python-evalburn", Duration::from_secs(5));
        let request = ExecutionRequest {
            code: "class Solution: pass".into(),
            method_name: "f".into(),
            inplace_modification: false,
            output_is_tree: false,
            cases: vec![BTreeMap::new()],
        };
        let err = backend.execute(&request).await.unwrap_err();
        assert!(matches!(err, ExecutorError::Unavailable(_)));
    }
}
