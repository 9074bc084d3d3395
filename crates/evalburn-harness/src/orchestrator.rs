use std::time::Duration;

use evalburn_core::{OutputStyle, ProblemSpec, SessionLog, SessionLogEntry, SessionSummary};
use serde::Serialize;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::executor::ExecutionBackend;
use crate::extractor::extract_code;
use crate::model::ModelInvoker;
use crate::runner::ProblemRunner;

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EvaluationEvent {
    Problem { current: u32, total: u32, title: String },
    ProblemComplete { entry: Box<SessionLogEntry> },
    Cancelled,
    Done { summary: SessionSummary },
}

/// Drives prompt -> model -> extraction -> test run for each problem.
pub struct Evaluator<M, B> {
    invoker: M,
    runner: ProblemRunner<B>,
    problem_delay: Duration,
}

impl<M: ModelInvoker, B: ExecutionBackend> Evaluator<M, B> {
    pub fn new(invoker: M, runner: ProblemRunner<B>) -> Self {
        Self {
            invoker,
            runner,
            problem_delay: Duration::ZERO,
        }
    }

    /// Pause between consecutive problems in a batch.
    pub fn with_problem_delay(mut self, delay: Duration) -> Self {
        self.problem_delay = delay;
        self
    }

    pub fn invoker(&self) -> &M {
        &self.invoker
    }

    pub fn compose_prompt(problem: &ProblemSpec, style: &OutputStyle) -> String {
        format!("{}\n\n{}", problem.prompt, style.template)
            .trim()
            .to_string()
    }

    /// Evaluate one problem. Never fails: model and execution problems are
    /// recorded in the returned entry.
    pub async fn run_one(
        &self,
        problem: &ProblemSpec,
        model: &str,
        style: &OutputStyle,
    ) -> SessionLogEntry {
        let prompt = Self::compose_prompt(problem, style);
        let generation = self.invoker.generate(&prompt, model).await;

        let code = extract_code(&generation.response_text);
        let metrics = self.runner.run(code.as_deref(), problem).await;

        SessionLogEntry::new(
            &problem.title,
            model,
            &style.name,
            &metrics,
            generation.stats,
            prompt,
            generation.response_text,
        )
    }

    /// Evaluate problems in order, appending one entry per problem to `log`.
    /// Returns how many problems were evaluated before finishing or being
    /// cancelled.
    pub async fn run_batch(
        &self,
        problems: &[ProblemSpec],
        model: &str,
        style: &OutputStyle,
        log: &mut SessionLog,
        cancel_token: &CancellationToken,
        tx: Option<&mpsc::Sender<EvaluationEvent>>,
    ) -> usize {
        info!(
            "Starting run of {} problems for model '{}' with style '{}'",
            problems.len(),
            model,
            style.name
        );

        for (idx, problem) in problems.iter().enumerate() {
            if idx > 0 && !self.problem_delay.is_zero() {
                tokio::select! {
                    _ = cancel_token.cancelled() => {}
                    _ = tokio::time::sleep(self.problem_delay) => {}
                }
            }
            if cancel_token.is_cancelled() {
                emit(tx, EvaluationEvent::Cancelled).await;
                return idx;
            }

            emit(
                tx,
                EvaluationEvent::Problem {
                    current: idx as u32 + 1,
                    total: problems.len() as u32,
                    title: problem.title.clone(),
                },
            )
            .await;

            let entry = self.run_one(problem, model, style).await;
            info!("{}: {}", entry.problem, entry.test_result);

            emit(
                tx,
                EvaluationEvent::ProblemComplete {
                    entry: Box::new(entry.clone()),
                },
            )
            .await;
            log.append(entry);
        }

        emit(
            tx,
            EvaluationEvent::Done {
                summary: log.summary(),
            },
        )
        .await;
        problems.len()
    }
}

async fn emit(tx: Option<&mpsc::Sender<EvaluationEvent>>, event: EvaluationEvent) {
    if let Some(tx) = tx {
        let _ = tx.send(event).await;
    }
}
