use thiserror::Error;

/// Rejected inputs to the analytics engine.
#[derive(Debug, Error, PartialEq)]
pub enum AnalysisError {
    #[error("{name} threshold must be greater than 0 and at most 100, got {value}")]
    InvalidThreshold { name: &'static str, value: f64 },
}

/// Failures while reading a participant file.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("missing required columns: {}", .0.join(", "))]
    MissingColumns(Vec<String>),

    #[error("line {line}: participant {participant_id} has invalid {field} ({value}); values must be finite and non-negative")]
    InvalidValue {
        line: u64,
        participant_id: String,
        field: &'static str,
        value: f64,
    },

    #[error("line {line}: {field} cell {cell:?} is not usable")]
    InvalidCell {
        line: u64,
        field: &'static str,
        cell: String,
    },

    #[error("participant {0} appears more than once")]
    DuplicateParticipant(String),

    #[error("workbook has no worksheets")]
    EmptyWorkbook,

    #[error(transparent)]
    Csv(#[from] csv::Error),

    #[error(transparent)]
    Spreadsheet(#[from] calamine::Error),
}
