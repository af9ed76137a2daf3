// file: src/error.rs
// description: Custom error types and result type aliases
// reference: https://docs.rs/thiserror

use thiserror::Error;

pub type Result<T> = std::result::Result<T, SearchError>;

#[derive(Error, Debug)]
pub enum SearchError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Record of type '{table}' has no value for primary key '{field}'")]
    MissingPrimaryKey { table: String, field: String },

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Document '{id}' not found in index '{index}'")]
    NotFound { index: String, id: String },

    #[error("Transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Engine returned {status}: {body}")]
    Engine { status: u16, body: String },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Invalid engine response: {0}")]
    InvalidResponse(String),
}

impl SearchError {
    /// True for a missing document on update or delete, which callers may treat as a no-op
    pub fn is_not_found(&self) -> bool {
        matches!(self, SearchError::NotFound { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = SearchError::MissingPrimaryKey {
            table: "posts".to_string(),
            field: "id".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Record of type 'posts' has no value for primary key 'id'"
        );

        let err = SearchError::Engine {
            status: 500,
            body: "boom".to_string(),
        };
        assert_eq!(err.to_string(), "Engine returned 500: boom");
    }

    #[test]
    fn test_not_found_classification() {
        let err = SearchError::NotFound {
            index: "posts".to_string(),
            id: "1".to_string(),
        };
        assert!(err.is_not_found());
        assert!(!SearchError::Config("x".to_string()).is_not_found());
    }
}
