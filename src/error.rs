use thiserror::Error;

/// Everything that can abort a run. Any of these stops the pipeline before a
/// result bundle is assembled.
#[derive(Error, Debug)]
pub enum ReportError {
    #[error("missing required column(s): {}", .missing.join(", "))]
    Schema { missing: Vec<String> },

    #[error("line {line}: column {column} holds a non-numeric value {value:?}")]
    InvalidNumber {
        line: u64,
        column: String,
        value: String,
    },

    #[error("line {line}: PARTIDA {value:?} does not start with a digit")]
    InvalidPartida { line: u64, value: String },

    #[error("reporting month {0} is outside 1..=12")]
    InvalidMonth(u32),

    #[error("{0} total does not fit in a decimal amount")]
    Overflow(String),

    #[error("cannot resolve reporting period: {0}")]
    Period(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, ReportError>;
