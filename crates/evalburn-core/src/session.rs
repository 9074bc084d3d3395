use serde::{Deserialize, Serialize};

use crate::{EvalMetrics, EvalOutcome};

/// Token and latency figures reported by the model backend.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct GenerationStats {
    pub elapsed_seconds: f64,
    pub prompt_tokens: u64,
    pub completion_tokens: u64,
}

/// One evaluated (problem, model, style) run, flattened for reporting.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SessionLogEntry {
    pub problem: String,
    pub model: String,
    pub style: String,
    pub test_result: String,
    pub outcome: EvalOutcome,
    pub passed_count: u32,
    pub total_tests: u32,
    pub exec_time_ms: Option<f64>,
    pub code_lines: Option<u32>,
    /// `None` when the model call failed.
    pub generation: Option<GenerationStats>,
    pub full_prompt: String,
    pub full_response: String,
}

impl SessionLogEntry {
    pub fn new(
        problem: &str,
        model: &str,
        style: &str,
        metrics: &EvalMetrics,
        generation: Option<GenerationStats>,
        full_prompt: String,
        full_response: String,
    ) -> Self {
        Self {
            problem: problem.to_string(),
            model: model.to_string(),
            style: style.to_string(),
            test_result: metrics.status_message(),
            outcome: metrics.outcome.clone(),
            passed_count: metrics.passed_count,
            total_tests: metrics.total_tests,
            exec_time_ms: metrics.execution_time(),
            code_lines: (metrics.code_lines > 0).then_some(metrics.code_lines),
            generation,
            full_prompt,
            full_response,
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct SessionSummary {
    pub runs: u32,
    pub fully_passed: u32,
    pub errored: u32,
    pub tests_passed: u32,
    pub tests_total: u32,
    pub pass_rate: f64,
    pub avg_exec_time_ms: Option<f64>,
}

/// Append-only record of every run in one session.
#[derive(Clone, Debug, Default)]
pub struct SessionLog {
    entries: Vec<SessionLogEntry>,
}

impl SessionLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn append(&mut self, entry: SessionLogEntry) {
        self.entries.push(entry);
    }

    pub fn entries(&self) -> &[SessionLogEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn summary(&self) -> SessionSummary {
        let runs = self.entries.len() as u32;
        let fully_passed = self.entries.iter().filter(|e| e.outcome.is_pass()).count() as u32;
        let errored = self.entries.iter().filter(|e| e.outcome.is_error()).count() as u32;
        let tests_passed = self.entries.iter().map(|e| e.passed_count).sum();
        let tests_total = self.entries.iter().map(|e| e.total_tests).sum();

        let pass_rate = match runs {
            0 => 0.0,
            _ => fully_passed as f64 / runs as f64,
        };

        let timed: Vec<f64> = self.entries.iter().filter_map(|e| e.exec_time_ms).collect();
        let avg_exec_time_ms = match timed.is_empty() {
            true => None,
            false => Some(timed.iter().sum::<f64>() / timed.len() as f64),
        };

        SessionSummary {
            runs,
            fully_passed,
            errored,
            tests_passed,
            tests_total,
            pass_rate,
            avg_exec_time_ms,
        }
    }
}
