use thiserror::Error;

/// Application-wide result type alias.
pub type Result<T> = std::result::Result<T, AppError>;

/// Application error types.
#[derive(Debug, Error)]
pub enum AppError {
    /// I/O errors from filesystem or pipe operations.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Invalid path provided by the user.
    #[error("Invalid path: {0}")]
    InvalidPath(String),

    /// The flattened browse array violates its span invariant.
    /// This is a fatal construction error; the catalog cannot be navigated.
    #[error("Malformed browse tree: {0}")]
    MalformedTree(String),

    /// Configuration file could not be read or parsed.
    #[error("Config error: {0}")]
    Config(String),

    /// Command-line parse errors (unterminated quote, empty command).
    #[error("Parse error: {0}")]
    Parse(String),

    /// An operation that requires a directory was given a song.
    #[error("Not a directory: {0}")]
    NotADirectory(String),

    /// Playback control errors (no active cycle, spawn failure).
    #[error("Playback error: {0}")]
    Playback(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn io_error_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let app_err: AppError = io_err.into();
        assert!(matches!(app_err, AppError::Io(_)));
        assert!(app_err.to_string().contains("file not found"));
    }

    #[test]
    fn malformed_tree_display() {
        let err = AppError::MalformedTree("span exceeds array length".into());
        assert_eq!(
            err.to_string(),
            "Malformed browse tree: span exceeds array length"
        );
    }

    #[test]
    fn parse_error_display() {
        let err = AppError::Parse("unterminated quoted argument".into());
        assert_eq!(err.to_string(), "Parse error: unterminated quoted argument");
    }

    #[test]
    fn not_a_directory_display() {
        let err = AppError::NotADirectory("song.mp3".into());
        assert_eq!(err.to_string(), "Not a directory: song.mp3");
    }
}
