pub mod executor;
pub mod extractor;
pub mod model;
pub mod ollama;
pub mod orchestrator;
pub mod runner;
pub mod wire;

pub use executor::{ExecutionBackend, ExecutionReport, ExecutionRequest, ExecutorError, PythonBackend};
pub use extractor::extract_code;
pub use model::{Generation, ModelInvoker};
pub use ollama::{ModelSummary, OllamaClient};
pub use orchestrator::{EvaluationEvent, Evaluator};
pub use runner::ProblemRunner;
