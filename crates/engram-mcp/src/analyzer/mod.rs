//! Analyzer Providers
//!
//! Language-model implementations of the core's `Analyzer` contract.

mod ollama;

pub use ollama::{OllamaAnalyzer, DEFAULT_BASE_URL, DEFAULT_MODEL};
