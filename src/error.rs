//! Error types shared by every compilation stage.

use std::path::PathBuf;
use thiserror::Error;

/// Errors raised while compiling a resource graph into a script.
#[derive(Debug, Error)]
pub enum Error {
    /// An input path is missing, not a regular file, or unreadable
    #[error("invalid input {}: {reason}", .path.display())]
    InvalidInput { path: PathBuf, reason: String },

    /// The compiled spec cannot be parsed or violates a graph invariant
    #[error("malformed spec: {0}")]
    MalformedSpec(String),

    /// A placeholder token is malformed, or a variable is missing under strict policy
    #[error("variable resolution failed: {0}")]
    VariableResolution(String),

    /// A subset request names a resource the graph does not contain
    #[error("unknown resource '{0}' in resource subset")]
    UnknownResource(String),

    /// Script generation failed; nothing emitted is usable
    #[error("{backend} generation failed")]
    Generation {
        backend: &'static str,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// The generated script could not be written
    #[error("cannot write {}", .path.display())]
    Output {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl Error {
    /// Create a malformed-spec error with the given message
    pub fn malformed(msg: impl Into<String>) -> Self {
        Self::MalformedSpec(msg.into())
    }

    /// Create a variable-resolution error with the given message
    pub fn variable(msg: impl Into<String>) -> Self {
        Self::VariableResolution(msg.into())
    }

    /// Wrap an underlying cause as a generation failure of `backend`
    pub fn generation(
        backend: &'static str,
        source: impl Into<Box<dyn std::error::Error + Send + Sync>>,
    ) -> Self {
        Self::Generation {
            backend,
            source: source.into(),
        }
    }
}

/// Result alias for hagen operations
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error as _;

    #[test]
    fn test_error_generation_keeps_source() {
        let err = Error::generation("pcs", "timeout 'abc' is not a number");
        assert_eq!(err.to_string(), "pcs generation failed");
        let source = err.source().unwrap();
        assert!(source.to_string().contains("abc"));
    }

    #[test]
    fn test_error_invalid_input_display() {
        let err = Error::InvalidInput {
            path: PathBuf::from("/tmp/missing.json"),
            reason: "not a file".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "invalid input /tmp/missing.json: not a file"
        );
    }

    #[test]
    fn test_error_unknown_resource_names_offender() {
        let err = Error::UnknownResource("ghost".to_string());
        assert!(err.to_string().contains("'ghost'"));
    }
}
