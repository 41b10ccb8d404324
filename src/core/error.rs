use thiserror::Error;

#[derive(Error, Debug)]
pub enum QueryError {
    /// Input collection is not a JSON array of flat objects
    #[error("Data error: {0}")]
    Data(String),
    #[error("Parse error at position {position}: {message}")]
    Parse { position: usize, message: String },
    /// Unknown aggregate, bad direction, misplaced clause
    #[error("Config error: {0}")]
    Config(String),
    #[error("Evaluation error: {0}")]
    Evaluation(String),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl QueryError {
    pub fn parse(position: usize, message: impl Into<String>) -> Self {
        Self::Parse {
            position,
            message: message.into(),
        }
    }

    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    pub fn evaluation(message: impl Into<String>) -> Self {
        Self::Evaluation(message.into())
    }

    pub fn data(message: impl Into<String>) -> Self {
        Self::Data(message.into())
    }
}

pub type QueryResult<T> = Result<T, QueryError>;
