use thiserror::Error;

#[derive(Error, Debug)]
/// Codec error
pub enum CsvError {
    /// Invalid or colliding dialect characters.
    #[error("invalid dialect: {0}")]
    Config(String),

    /// Byte-order mark or charset does not match the declared encoding.
    #[error("encoding error: {0}")]
    Encoding(String),

    /// Record content violates the dialect (column count, embedded quote or linebreak).
    #[error("line {line}: {message}")]
    Data { line: usize, message: String },

    /// Malformed input the grammar cannot recover from.
    #[error("parse error: {0}")]
    Parse(String),

    /// The reader or writer API was used out of contract.
    #[error("usage error: {0}")]
    Usage(String),

    #[error("stream is closed")]
    Closed,

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl CsvError {
    pub(crate) fn data(line: usize, message: impl Into<String>) -> Self {
        CsvError::Data {
            line,
            message: message.into(),
        }
    }

    /// Returns the line (reader) or record number (writer) a data error refers to.
    pub fn line(&self) -> Option<usize> {
        match self {
            CsvError::Data { line, .. } => Some(*line),
            _ => None,
        }
    }
}

pub type CsvResult<T> = Result<T, CsvError>;
