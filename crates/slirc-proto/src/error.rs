//! Error types for the IRC line codec.

use thiserror::Error;

/// Convenience type alias for Results using [`ProtocolError`].
pub type Result<T, E = ProtocolError> = std::result::Result<T, E>;

/// Protocol-level errors.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ProtocolError {
    /// I/O error during reading or writing.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// The line contained nothing to parse.
    #[error("empty line")]
    EmptyLine,

    /// A prefix was present but no command followed it.
    #[error("missing command in line: {0:?}")]
    MissingCommand(String),

    /// The requested fallback encoding label is not known.
    #[error("unknown encoding: {0}")]
    UnknownEncoding(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display() {
        assert_eq!(ProtocolError::EmptyLine.to_string(), "empty line");
        assert_eq!(
            ProtocolError::MissingCommand(":srv".to_string()).to_string(),
            "missing command in line: \":srv\""
        );
        assert_eq!(
            ProtocolError::UnknownEncoding("klingon".to_string()).to_string(),
            "unknown encoding: klingon"
        );
    }
}
