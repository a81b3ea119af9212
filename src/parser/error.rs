/// Error type for parsing operations
#[derive(Debug, thiserror::Error)]
pub enum ParseError {
    /// Failed to parse the file structure
    #[error("Failed to parse file: {0}")]
    ParseFailed(String),

    /// Invalid syntax on a specific line (1-based)
    #[error("line {line}: {message}")]
    InvalidSyntax { line: usize, message: String },
}
