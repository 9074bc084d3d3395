use thiserror::Error;

#[derive(Error, Debug)]
pub enum EvalBurnError {
    #[error("Problem not found: {0}")]
    ProblemNotFound(String),

    #[error("Ollama error: {0}")]
    OllamaError(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("HTTP error: {0}")]
    Http(String),

    #[error("Config error: {0}")]
    Config(String),
}

pub type Result<T> = std::result::Result<T, EvalBurnError>;
