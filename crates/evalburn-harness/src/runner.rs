use evalburn_core::{tree_to_list, EvalMetrics, EvalOutcome, ProblemSpec, Value};
use tracing::{debug, info, instrument, warn};

use crate::executor::{ExecutionBackend, ExecutionReport, ExecutionRequest};

/// Scores one submission against one problem.
///
/// Every failure mode ends up in the returned [`EvalMetrics`]; nothing is
/// propagated to the caller.
pub struct ProblemRunner<B> {
    backend: B,
}

impl<B: ExecutionBackend> ProblemRunner<B> {
    pub fn new(backend: B) -> Self {
        Self { backend }
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    #[instrument(skip_all, fields(problem = %problem.title))]
    pub async fn run(&self, code: Option<&str>, problem: &ProblemSpec) -> EvalMetrics {
        let total = problem.test_cases.len() as u32;

        // A blank submission counts as nothing extracted.
        let Some(code) = code.filter(|c| !c.trim().is_empty()) else {
            return EvalMetrics::parsing_failure(total);
        };
        let code_lines = code.lines().count() as u32;

        if problem.test_cases.is_empty() {
            return EvalMetrics::no_test_cases(code_lines);
        }

        let request = ExecutionRequest::for_problem(code, problem);
        let report = match self.backend.execute(&request).await {
            Ok(report) => report,
            Err(e) => {
                warn!("Execution backend failed: {}", e);
                let kind = e.kind().to_string();
                return EvalMetrics::aborted(total, code_lines, EvalOutcome::RuntimeError { kind });
            }
        };

        match report {
            ExecutionReport::ClassNotFound => {
                EvalMetrics::aborted(total, code_lines, EvalOutcome::ClassNotFound)
            }
            ExecutionReport::Raised {
                kind,
                message,
                case_index,
            } => {
                debug!("Submission raised {} at case {:?}: {}", kind, case_index, message);
                EvalMetrics::aborted(total, code_lines, EvalOutcome::RuntimeError { kind })
            }
            ExecutionReport::Completed {
                outputs,
                elapsed_ms,
            } => {
                if outputs.len() != problem.test_cases.len() {
                    warn!(
                        "Driver returned {} outputs for {} cases",
                        outputs.len(),
                        problem.test_cases.len()
                    );
                    let kind = "ProtocolError".to_string();
                    return EvalMetrics::aborted(total, code_lines, EvalOutcome::RuntimeError { kind });
                }

                let mut passed = 0u32;
                for (index, (case, actual)) in problem.test_cases.iter().zip(outputs).enumerate() {
                    let actual = match problem.output_is_tree {
                        true => normalize_tree_output(actual),
                        false => actual,
                    };
                    if actual == case.output {
                        passed += 1;
                    } else {
                        debug!(
                            "Case {} mismatch: expected {}, got {}",
                            index + 1,
                            case.output,
                            actual
                        );
                    }
                }

                info!("{}: {}/{} in {:.4} ms", problem.title, passed, total, elapsed_ms);
                EvalMetrics::completed(passed, total, elapsed_ms, code_lines)
            }
        }
    }
}

/// Level-order form of a returned tree; an absent tree encodes as `[]`.
fn normalize_tree_output(actual: Value) -> Value {
    match actual {
        Value::Tree(root) => Value::List(tree_to_list(root.as_deref())),
        Value::Null => Value::List(Vec::new()),
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::executor::{ExecutorError, Result};
    use async_trait::async_trait;
    use evalburn_core::build_tree;
    use serde_json::json;
    use std::sync::Mutex;

    /// Backend that replays a canned report and keeps the last request.
    struct ScriptedBackend {
        report: fn() -> Result<ExecutionReport>,
        seen: Mutex<Option<ExecutionRequest>>,
    }

    impl ScriptedBackend {
        fn new(report: fn() -> Result<ExecutionReport>) -> Self {
            Self {
                report,
                seen: Mutex::new(None),
            }
        }
    }

    #[async_trait]
    impl ExecutionBackend for ScriptedBackend {
        async fn execute(&self, request: &ExecutionRequest) -> Result<ExecutionReport> {
            *self.seen.lock().unwrap() = Some(request.clone());
            (self.report)()
        }
    }

    fn problem(value: serde_json::Value) -> ProblemSpec {
        serde_json::from_value(value).unwrap()
    }

    fn three_case_problem() -> ProblemSpec {
        problem(json!({
            "title": "Add One",
            "prompt": "",
            "method_name": "addOne",
            "test_cases": [
                {"input": {"x": 1}, "output": 2},
                {"input": {"x": 2}, "output": 3},
                {"input": {"x": 3}, "output": 4}
            ]
        }))
    }

    const CODE: &str = "class Solution:\n    def addOne(self, x):\n        return x + 1";

    #[tokio::test]
    async fn test_missing_code_is_parsing_failure() {
        let runner = ProblemRunner::new(ScriptedBackend::new(|| unreachable!()));
        let metrics = runner.run(None, &three_case_problem()).await;
        assert_eq!(metrics, EvalMetrics::parsing_failure(3));
        assert_eq!(metrics.status_message(), "Code Parsing Failed");
        assert!(runner.backend().seen.lock().unwrap().is_none());
    }

    #[tokio::test]
    async fn test_blank_fenced_block_is_parsing_failure() {
        let runner = ProblemRunner::new(ScriptedBackend::new(|| unreachable!()));
        let code = crate::extractor::extract_code("Here:\n```python\n   \n```");
        assert_eq!(code.as_deref(), Some(""));

        let metrics = runner.run(code.as_deref(), &three_case_problem()).await;
        assert_eq!(metrics.status_message(), "Code Parsing Failed");
        assert_eq!((metrics.passed_count, metrics.total_tests), (0, 3));
        assert_eq!(metrics.code_lines, 0);

        let metrics = runner.run(Some(" \n\t\n"), &three_case_problem()).await;
        assert_eq!(metrics.outcome, EvalOutcome::ParsingFailure);
        assert!(runner.backend().seen.lock().unwrap().is_none());
    }

    #[tokio::test]
    async fn test_no_test_cases_keeps_line_count() {
        let runner = ProblemRunner::new(ScriptedBackend::new(|| unreachable!()));
        let empty = problem(json!({"title": "E", "prompt": "", "method_name": "f"}));
        let metrics = runner.run(Some(CODE), &empty).await;
        assert_eq!(metrics.status_message(), "No Test Cases");
        assert_eq!((metrics.passed_count, metrics.total_tests), (0, 0));
        assert_eq!(metrics.code_lines, 3);
        assert_eq!(metrics.execution_time_ms, -1.0);
    }

    #[tokio::test]
    async fn test_full_pass() {
        let runner = ProblemRunner::new(ScriptedBackend::new(|| {
            Ok(ExecutionReport::Completed {
                outputs: vec![Value::Int(2), Value::Int(3), Value::Float(4.0)],
                elapsed_ms: 0.75,
            })
        }));
        let metrics = runner.run(Some(CODE), &three_case_problem()).await;
        assert_eq!(metrics.passed_count, 3);
        assert_eq!(metrics.total_tests, 3);
        assert!(metrics.status_message().contains("Passed 3/3"));
        assert!(metrics.execution_time_ms >= 0.0);
        assert_eq!(metrics.code_lines, 3);
    }

    #[tokio::test]
    async fn test_partial_pass() {
        let runner = ProblemRunner::new(ScriptedBackend::new(|| {
            Ok(ExecutionReport::Completed {
                outputs: vec![Value::Int(2), Value::Int(0), Value::Null],
                elapsed_ms: 0.5,
            })
        }));
        let metrics = runner.run(Some(CODE), &three_case_problem()).await;
        assert_eq!(metrics.passed_count, 1);
        assert_eq!(metrics.status_message(), "Failed 1/3");
        assert_eq!(metrics.execution_time(), Some(0.5));
    }

    #[tokio::test]
    async fn test_class_not_found() {
        let runner = ProblemRunner::new(ScriptedBackend::new(|| Ok(ExecutionReport::ClassNotFound)));
        let metrics = runner.run(Some("def addOne(x): return x + 1"), &three_case_problem()).await;
        assert_eq!(metrics.passed_count, 0);
        assert_eq!(metrics.status_message(), "Execution Error: 'Solution' class not found");
        assert_eq!(metrics.execution_time_ms, -1.0);
        assert_eq!(metrics.code_lines, 1);
    }

    #[tokio::test]
    async fn test_raised_error_discards_progress() {
        let runner = ProblemRunner::new(ScriptedBackend::new(|| {
            Ok(ExecutionReport::Raised {
                kind: "IndexError".into(),
                message: "list index out of range".into(),
                case_index: Some(1),
            })
        }));
        let metrics = runner.run(Some(CODE), &three_case_problem()).await;
        assert_eq!(metrics.passed_count, 0);
        assert_eq!(metrics.total_tests, 3);
        assert_eq!(metrics.status_message(), "Execution Error: IndexError");
        assert_eq!(metrics.execution_time_ms, -1.0);
    }

    #[tokio::test]
    async fn test_backend_failure_becomes_runtime_error() {
        let runner = ProblemRunner::new(ScriptedBackend::new(|| Err(ExecutorError::Timeout(10_000))));
        let metrics = runner.run(Some(CODE), &three_case_problem()).await;
        assert_eq!(metrics.status_message(), "Execution Error: Timeout");
        assert_eq!(metrics.passed_count, 0);
    }

    #[tokio::test]
    async fn test_output_count_mismatch_is_protocol_error() {
        let runner = ProblemRunner::new(ScriptedBackend::new(|| {
            Ok(ExecutionReport::Completed {
                outputs: vec![Value::Int(2)],
                elapsed_ms: 0.1,
            })
        }));
        let metrics = runner.run(Some(CODE), &three_case_problem()).await;
        assert_eq!(metrics.status_message(), "Execution Error: ProtocolError");
    }

    #[tokio::test]
    async fn test_tree_inputs_decoded_and_tree_output_reencoded() {
        let runner = ProblemRunner::new(ScriptedBackend::new(|| {
            let returned = Value::from(json!([1, null, 2]));
            Ok(ExecutionReport::Completed {
                outputs: vec![Value::Tree(build_tree(returned.as_list().unwrap())), Value::Null],
                elapsed_ms: 0.2,
            })
        }));
        let tree_problem = problem(json!({
            "title": "Increasing Order",
            "prompt": "",
            "method_name": "increasingBST",
            "output_is_tree": true,
            "test_cases": [
                {"input": {"root": [2, 1]}, "output": [1, null, 2]},
                {"input": {"root": []}, "output": []}
            ]
        }));

        let metrics = runner.run(Some(CODE), &tree_problem).await;
        assert_eq!(metrics.status_message(), "Passed 2/2");

        let seen = runner.backend().seen.lock().unwrap().clone().unwrap();
        assert!(matches!(&seen.cases[0]["root"], Value::Tree(Some(root)) if root.node_count() == 2));
        assert!(matches!(seen.cases[1]["root"], Value::Tree(None)));
        assert!(seen.output_is_tree);
    }

    #[tokio::test]
    async fn test_inplace_flag_reaches_backend() {
        let runner = ProblemRunner::new(ScriptedBackend::new(|| {
            Ok(ExecutionReport::Completed {
                outputs: vec![Value::from(json!([1, 2, 3]))],
                elapsed_ms: 0.1,
            })
        }));
        let sort_problem = problem(json!({
            "title": "Sort In Place",
            "prompt": "",
            "method_name": "sortNums",
            "inplace_modification": true,
            "test_cases": [{"input": {"nums": [3, 1, 2]}, "output": [1, 2, 3]}]
        }));

        let metrics = runner.run(Some(CODE), &sort_problem).await;
        assert_eq!(metrics.status_message(), "Passed 1/1");
        let seen = runner.backend().seen.lock().unwrap().clone().unwrap();
        assert!(seen.inplace_modification);
        assert_eq!(seen.cases[0]["nums"], Value::from(json!([3, 1, 2])));
    }
}
