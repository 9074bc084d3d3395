use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::{EvalBurnError, Result};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EvalConfig {
    #[serde(default)]
    pub ollama: OllamaConfig,
    #[serde(default)]
    pub execution: ExecutionConfig,
    #[serde(default)]
    pub session: SessionConfig,
}

impl EvalConfig {
    /// Defaults overridden by `OLLAMA_HOST` and `EVALBURN_*` variables.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let mut config = Self::default();

        if let Some(host) = lookup("OLLAMA_HOST") {
            config.ollama.host = host;
        }
        if let Some(secs) = parse_var(&lookup, "EVALBURN_REQUEST_TIMEOUT_SECS")? {
            config.ollama.request_timeout_secs = secs;
        }
        if let Some(python) = lookup("EVALBURN_PYTHON") {
            config.execution.python = python;
        }
        if let Some(ms) = parse_var(&lookup, "EVALBURN_EXEC_TIMEOUT_MS")? {
            config.execution.timeout_ms = ms;
        }
        if let Some(dir) = lookup("EVALBURN_LOG_DIR") {
            config.session.log_dir = PathBuf::from(dir);
        }
        if let Some(path) = lookup("EVALBURN_PROBLEMS") {
            config.session.problems_path = PathBuf::from(path);
        }
        if let Some(ms) = parse_var(&lookup, "EVALBURN_PROBLEM_DELAY_MS")? {
            config.session.problem_delay_ms = ms;
        }

        Ok(config)
    }
}

fn parse_var(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Result<Option<u64>> {
    lookup(key)
        .map(|raw| {
            raw.trim()
                .parse::<u64>()
                .map_err(|e| EvalBurnError::Config(format!("{}={:?}: {}", key, raw, e)))
        })
        .transpose()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OllamaConfig {
    pub host: String,
    pub request_timeout_secs: u64,
}

impl OllamaConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

impl Default for OllamaConfig {
    fn default() -> Self {
        Self {
            host: "http://127.0.0.1:11434".to_string(),
            request_timeout_secs: 300,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionConfig {
    pub python: String,
    /// Wall-clock budget for one submission, covering all of its test cases.
    pub timeout_ms: u64,
}

impl ExecutionConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

impl Default for ExecutionConfig {
    fn default() -> Self {
        Self {
            python: "python3".to_string(),
            timeout_ms: 10_000,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    pub log_dir: PathBuf,
    pub problems_path: PathBuf,
    pub problem_delay_ms: u64,
}

impl SessionConfig {
    pub fn problem_delay(&self) -> Duration {
        Duration::from_millis(self.problem_delay_ms)
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            log_dir: PathBuf::from("logs"),
            problems_path: PathBuf::from("problems.json"),
            problem_delay_ms: 1000,
        }
    }
}
