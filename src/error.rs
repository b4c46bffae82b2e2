//! Search-level failures
//!
//! Only failures that abort a whole search live here. Per-file read and
//! parse problems are logged by the searcher and never surface as errors.

use serde_json::json;
use thiserror::Error;

use crate::models::Language;

/// Failure of a structural search
#[derive(Error, Debug)]
pub enum SearchError {
    /// The grammar for a language needed by the search could not be loaded
    #[error("Failed to load {language} grammar: {reason}")]
    GrammarLoad { language: Language, reason: String },

    /// The search did not finish before its deadline; partial results are discarded
    #[error("Search timed out after {elapsed_ms}ms")]
    Timeout { elapsed_ms: u64 },

    /// The request was rejected before any file system work
    #[error("Invalid search request: {reason}")]
    InvalidInput { reason: String },

    #[error("Search failed: {message}")]
    Execution { message: String },
}

impl SearchError {
    pub fn invalid_input(reason: impl Into<String>) -> Self {
        SearchError::InvalidInput { reason: reason.into() }
    }

    pub fn execution(message: impl Into<String>) -> Self {
        SearchError::Execution { message: message.into() }
    }

    /// Machine-checkable type tag
    pub fn kind(&self) -> &'static str {
        match self {
            SearchError::GrammarLoad { .. } => "grammar_load_error",
            SearchError::Timeout { .. } => "timeout",
            SearchError::InvalidInput { .. } => "invalid_input",
            SearchError::Execution { .. } => "execution_error",
        }
    }

    /// Error object for JSON consumers
    pub fn to_json(&self) -> serde_json::Value {
        let mut error = json!({
            "type": self.kind(),
            "message": self.to_string(),
        });

        match self {
            SearchError::GrammarLoad { language, .. } => {
                error["language"] = json!(language);
            }
            SearchError::Timeout { elapsed_ms } => {
                error["elapsedMs"] = json!(elapsed_ms);
            }
            _ => {}
        }

        json!({ "error": error })
    }
}

impl From<tokio::task::JoinError> for SearchError {
    fn from(e: tokio::task::JoinError) -> Self {
        SearchError::execution(format!("worker task failed: {}", e))
    }
}
