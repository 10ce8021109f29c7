use thiserror::Error;

#[derive(Debug, Error)]
pub enum DashError {
    #[error("validation: {reason}")]
    Validation { reason: String },

    #[error("connection: {message}")]
    Connection { message: String },

    #[error("query: {message}")]
    Query { message: String },

    #[error("config: {message}")]
    Config { message: String },

    #[error("io: {0}")]
    Io(#[from] std::io::Error),

    #[error("format: {message}")]
    Format { message: String },
}
