use std::fmt::Display;

use async_trait::async_trait;
use evalburn_core::GenerationStats;

/// Raw model output plus generation stats, if the call succeeded.
#[derive(Debug, Clone, PartialEq)]
pub struct Generation {
    pub response_text: String,
    pub stats: Option<GenerationStats>,
}

impl Generation {
    /// A failed call. The error text stands in for the response so the
    /// extractor reports a parsing failure downstream.
    pub fn failed(reason: impl Display) -> Self {
        Self {
            response_text: format!("An error occurred: {}", reason),
            stats: None,
        }
    }
}

/// Source of model responses. Implementations never fail past this boundary.
#[async_trait]
pub trait ModelInvoker: Send + Sync {
    async fn generate(&self, prompt: &str, model: &str) -> Generation;
}
