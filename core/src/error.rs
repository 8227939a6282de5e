use thiserror::Error;

#[derive(Error, Debug)]
pub enum DeskError {
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Transaction '{transaction_id}' has risk score {score} outside [0, 100]")]
    OutOfRangeScore { transaction_id: String, score: i64 },

    #[error("Transaction '{transaction_id}' has invalid amount {amount}")]
    InvalidAmount { transaction_id: String, amount: f64 },

    #[error("Unsupported file type: '{file_name}' (only .csv is accepted)")]
    UnsupportedFileType { file_name: String },

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub type DeskResult<T> = Result<T, DeskError>;
