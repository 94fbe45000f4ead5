//! Error handling for ASCII point cloud reads.
//!
//! Every failure the reader can hit maps to one variant here, and every
//! variant maps to a distinct negative status code for hosts that speak the
//! integer-status convention of classic file readers.

use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CloudError {
    #[error("File not found: {path}")]
    FileNotFound { path: PathBuf },

    #[error("File unreadable: {path} - {reason}")]
    FileUnreadable { path: PathBuf, reason: String },

    #[error("File {path} does not have the required extension '{expected}'")]
    ExtensionMismatch { path: PathBuf, expected: String },

    #[error("No input fields set; a schema must be supplied before reading")]
    EmptySchema,

    #[error("Unknown datatype tag: {tag}")]
    UnknownDatatype { tag: u8 },

    #[error("Invalid schema: {reason}")]
    InvalidSchema { reason: String },

    #[error("Line {line}: cannot parse '{token}' as {datatype} for field '{field}'")]
    TokenParse {
        line: usize,
        field: String,
        token: String,
        datatype: &'static str,
    },

    #[error("Line {line}: '{token}' is out of range for {datatype} field '{field}'")]
    TokenOverflow {
        line: usize,
        field: String,
        token: String,
        datatype: &'static str,
    },

    #[error("Line {line}: expected {expected} tokens, found {found}")]
    FieldCountMismatch {
        line: usize,
        expected: usize,
        found: usize,
    },

    #[error("Row count mismatch in {path}: header scan counted {scanned}, fill pass parsed {parsed}")]
    RowCountMismatch {
        path: PathBuf,
        scanned: usize,
        parsed: usize,
    },

    #[error("Configuration error: {message}")]
    Configuration { message: String },
}

impl CloudError {
    /// Negative status code for this error, distinct per variant.
    pub fn status(&self) -> i32 {
        match self {
            CloudError::FileNotFound { .. } => -1,
            CloudError::FileUnreadable { .. } => -2,
            CloudError::ExtensionMismatch { .. } => -3,
            CloudError::EmptySchema => -4,
            CloudError::UnknownDatatype { .. } => -5,
            CloudError::InvalidSchema { .. } => -6,
            CloudError::TokenParse { .. } => -7,
            CloudError::TokenOverflow { .. } => -8,
            CloudError::FieldCountMismatch { .. } => -9,
            CloudError::RowCountMismatch { .. } => -10,
            CloudError::Configuration { .. } => -11,
        }
    }

    /// Classify a failure to open `path`.
    pub(crate) fn open_failed(path: &std::path::Path, error: std::io::Error) -> Self {
        if error.kind() == std::io::ErrorKind::NotFound {
            CloudError::FileNotFound {
                path: path.to_path_buf(),
            }
        } else {
            CloudError::FileUnreadable {
                path: path.to_path_buf(),
                reason: error.to_string(),
            }
        }
    }
}

pub type Result<T> = std::result::Result<T, CloudError>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_status_codes_are_negative_and_distinct() {
        let errors = vec![
            CloudError::FileNotFound {
                path: PathBuf::from("a.txt"),
            },
            CloudError::FileUnreadable {
                path: PathBuf::from("a.txt"),
                reason: "denied".to_string(),
            },
            CloudError::ExtensionMismatch {
                path: PathBuf::from("a.txt"),
                expected: ".xyz".to_string(),
            },
            CloudError::EmptySchema,
            CloudError::UnknownDatatype { tag: 42 },
            CloudError::InvalidSchema {
                reason: "gap".to_string(),
            },
            CloudError::TokenParse {
                line: 1,
                field: "x".to_string(),
                token: "abc".to_string(),
                datatype: "int32",
            },
            CloudError::TokenOverflow {
                line: 1,
                field: "x".to_string(),
                token: "99999999999".to_string(),
                datatype: "int16",
            },
            CloudError::FieldCountMismatch {
                line: 1,
                expected: 3,
                found: 2,
            },
            CloudError::RowCountMismatch {
                path: PathBuf::from("a.txt"),
                scanned: 3,
                parsed: 2,
            },
            CloudError::Configuration {
                message: "bad".to_string(),
            },
        ];

        let codes: HashSet<i32> = errors.iter().map(|e| e.status()).collect();
        assert_eq!(codes.len(), errors.len());
        assert!(codes.iter().all(|&c| c < 0));
    }

    #[test]
    fn test_open_failed_classification() {
        let not_found = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
        let denied = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied");
        let path = std::path::Path::new("cloud.txt");

        assert!(matches!(
            CloudError::open_failed(path, not_found),
            CloudError::FileNotFound { .. }
        ));
        assert!(matches!(
            CloudError::open_failed(path, denied),
            CloudError::FileUnreadable { .. }
        ));
    }
}
