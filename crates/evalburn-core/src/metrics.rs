use std::fmt;

use serde::{Deserialize, Serialize};

/// Sentinel for `execution_time_ms` when the test loop never completed.
pub const NOT_MEASURED: f64 = -1.0;

/// Classified result of evaluating one submission against one problem.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EvalOutcome {
    ParsingFailure,
    NoTestCases,
    ClassNotFound,
    RuntimeError { kind: String },
    PartialPass { passed: u32, total: u32 },
    FullPass { total: u32 },
}

impl EvalOutcome {
    pub fn is_pass(&self) -> bool {
        matches!(self, EvalOutcome::FullPass { .. })
    }

    pub fn is_error(&self) -> bool {
        !matches!(
            self,
            EvalOutcome::FullPass { .. } | EvalOutcome::PartialPass { .. }
        )
    }
}

impl fmt::Display for EvalOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EvalOutcome::ParsingFailure => write!(f, "Code Parsing Failed"),
            EvalOutcome::NoTestCases => write!(f, "No Test Cases"),
            EvalOutcome::ClassNotFound => write!(f, "Execution Error: 'Solution' class not found"),
            EvalOutcome::RuntimeError { kind } => write!(f, "Execution Error: {}", kind),
            EvalOutcome::PartialPass { passed, total } => write!(f, "Failed {}/{}", passed, total),
            EvalOutcome::FullPass { total } => write!(f, "Passed {}/{}", total, total),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct EvalMetrics {
    pub passed_count: u32,
    pub total_tests: u32,
    pub execution_time_ms: f64,
    pub code_lines: u32,
    pub outcome: EvalOutcome,
}

impl EvalMetrics {
    pub fn parsing_failure(total_tests: u32) -> Self {
        Self {
            passed_count: 0,
            total_tests,
            execution_time_ms: NOT_MEASURED,
            code_lines: 0,
            outcome: EvalOutcome::ParsingFailure,
        }
    }

    pub fn no_test_cases(code_lines: u32) -> Self {
        Self {
            passed_count: 0,
            total_tests: 0,
            execution_time_ms: NOT_MEASURED,
            code_lines,
            outcome: EvalOutcome::NoTestCases,
        }
    }

    /// A submission that never finished its test loop. Partial progress is
    /// not carried over.
    pub fn aborted(total_tests: u32, code_lines: u32, outcome: EvalOutcome) -> Self {
        Self {
            passed_count: 0,
            total_tests,
            execution_time_ms: NOT_MEASURED,
            code_lines,
            outcome,
        }
    }

    pub fn completed(passed: u32, total: u32, execution_time_ms: f64, code_lines: u32) -> Self {
        let outcome = match passed == total {
            true => EvalOutcome::FullPass { total },
            false => EvalOutcome::PartialPass { passed, total },
        };
        Self {
            passed_count: passed,
            total_tests: total,
            execution_time_ms,
            code_lines,
            outcome,
        }
    }

    pub fn status_message(&self) -> String {
        self.outcome.to_string()
    }

    pub fn execution_time(&self) -> Option<f64> {
        (self.execution_time_ms >= 0.0).then_some(self.execution_time_ms)
    }
}
