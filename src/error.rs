// Error kinds for the ingestion pipeline
//
// Field-level errors are collected per row and never abort processing.
// Only UnparseableFile and StoreFailure are exceptional control flow.

use thiserror::Error;

/// Failure to coerce one raw cell into its typed value
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FieldError {
    #[error("invalid number: {0:?}")]
    InvalidNumber(String),

    #[error("invalid integer: {0:?}")]
    InvalidInteger(String),

    #[error("invalid date (expected YYYY-MM-DD): {0:?}")]
    InvalidDate(String),
}

/// Errors that cross the importer boundary
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ImportError {
    /// Malformed or undecodable input; nothing was parsed
    #[error("unparseable file: {0}")]
    UnparseableFile(String),

    /// The file parsed but at least one row failed validation; nothing was committed
    #[error("validation failed with {error_count} error(s); nothing was imported")]
    ValidationFailed { error_count: usize },

    /// The bulk insert or the audit write failed
    #[error("store failure: {0}")]
    StoreFailure(String),
}

impl ImportError {
    /// Wrap a store-side error, keeping the whole context chain in the message
    pub fn store(err: anyhow::Error) -> Self {
        ImportError::StoreFailure(format!("{:#}", err))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_store_failure_keeps_context_chain() {
        let err = anyhow::anyhow!("connection refused").context("bulk insert failed");
        let import_err = ImportError::store(err);

        assert_eq!(
            import_err,
            ImportError::StoreFailure("bulk insert failed: connection refused".to_string())
        );
    }

    #[test]
    fn test_display_messages() {
        let err = ImportError::ValidationFailed { error_count: 3 };
        assert_eq!(
            err.to_string(),
            "validation failed with 3 error(s); nothing was imported"
        );

        let field = FieldError::InvalidDate("31/12/2024".to_string());
        assert!(field.to_string().contains("YYYY-MM-DD"));
    }
}
