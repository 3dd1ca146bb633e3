use std::path::PathBuf;
use thiserror::Error;

/// Errors surfaced by the editor, the converter and the document I/O layer
#[derive(Debug, Error)]
pub enum CollectionError {
    #[error("File not found: {}", .0.display())]
    NotFound(PathBuf),

    #[error("Format error: {0}")]
    Format(String),

    #[error("Conversion error: {0}")]
    Conversion(#[source] Box<CollectionError>),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl CollectionError {
    /// Wrap an inner failure as a conversion error, keeping an already
    /// wrapped error as is.
    pub fn conversion(inner: CollectionError) -> Self {
        match inner {
            CollectionError::Conversion(_) => inner,
            other => CollectionError::Conversion(Box::new(other)),
        }
    }
}

pub type Result<T> = std::result::Result<T, CollectionError>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error as _;

    #[test]
    fn test_conversion_keeps_inner_cause() {
        let err = CollectionError::conversion(CollectionError::Format("missing log.entries".into()));
        assert_eq!(
            err.to_string(),
            "Conversion error: Format error: missing log.entries"
        );
        assert!(err.source().is_some());
    }

    #[test]
    fn test_conversion_is_not_double_wrapped() {
        let once = CollectionError::conversion(CollectionError::Format("x".into()));
        let twice = CollectionError::conversion(once);
        match twice {
            CollectionError::Conversion(inner) => {
                assert!(matches!(*inner, CollectionError::Format(_)))
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_not_found_display() {
        let err = CollectionError::NotFound(PathBuf::from("missing.json"));
        assert_eq!(err.to_string(), "File not found: missing.json");
    }
}
