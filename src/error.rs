//! Error types for the estimation service

use crate::pricing::models::MethodFailure;
use thiserror::Error;

/// Errors raised by the pricing engine, the request store and configuration
#[derive(Debug, Error)]
pub enum EstimationError {
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Unknown estimation method: {0}")]
    UnknownMethod(String),

    #[error("Category not found: {0}")]
    CategoryNotFound(String),

    #[error("No historical data for category {0}")]
    NoHistoricalData(String),

    #[error("No estimation methods requested")]
    NoMethodsRequested,

    #[error("All estimation methods failed: {}", summarize_failures(.0))]
    AllMethodsFailed(Vec<MethodFailure>),

    #[error("Procurement request not found: {0}")]
    RequestNotFound(u64),

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

fn summarize_failures(failures: &[MethodFailure]) -> String {
    failures
        .iter()
        .map(|f| format!("{} ({})", f.method, f.reason))
        .collect::<Vec<_>>()
        .join(", ")
}

impl From<config::ConfigError> for EstimationError {
    fn from(err: config::ConfigError) -> Self {
        EstimationError::Configuration(err.to_string())
    }
}

impl From<serde_json::Error> for EstimationError {
    fn from(err: serde_json::Error) -> Self {
        EstimationError::Internal(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, EstimationError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_all_methods_failed_message() {
        let err = EstimationError::AllMethodsFailed(vec![
            MethodFailure::new("analogous", "No historical data for category SW001"),
            MethodFailure::new("magic", "Unknown estimation method: magic"),
        ]);

        let message = err.to_string();
        assert!(message.starts_with("All estimation methods failed"));
        assert!(message.contains("analogous (No historical data for category SW001)"));
        assert!(message.contains("magic"));
    }

    #[test]
    fn test_request_not_found_message() {
        let err = EstimationError::RequestNotFound(42);
        assert_eq!(err.to_string(), "Procurement request not found: 42");
    }
}
