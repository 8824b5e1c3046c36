use crate::types::RollNumber;

/// Error type that can be returned by fallible operations in this crate
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Error reading or writing CSV files; could wrap IO or parsing errors
    #[error("Error processing CSV: {0}")]
    Load(#[from] csv::Error),
    /// Error creating the output directory or opening a table file
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    /// One of the roll range, date or subject was not supplied.
    /// Nothing is written when this is returned, so the caller may simply retry.
    #[error("Please enter a valid roll number range, select a date, and choose a subject (missing {0})")]
    MissingInput(&'static str),
    /// The roll range was not of the form `start-end` with `start <= end`
    #[error("Invalid roll number range format: {0:?}")]
    RangeFormat(String),
    /// The date was not a `YYYY-MM-DD` calendar date
    #[error("Invalid date {0:?}, expected YYYY-MM-DD")]
    DateFormat(String),
    /// The subject is empty or cannot be used as part of a file name
    #[error("Invalid subject name {0:?}")]
    InvalidSubject(String),
    /// A roll was marked that is not part of the current checklist
    #[error("Roll {0} is not on the checklist")]
    UnknownRoll(RollNumber),
    /// The requested date has no column in the table
    #[error("No such date {0} in the attendance table")]
    NoSuchDate(String),
    /// The persisted table does not have the expected shape
    #[error("Malformed attendance table: {0}")]
    MalformedTable(String),
    /// A percentage was requested for a table without any date columns
    #[error("Cannot compute attendance percentage for roll {0}: the table has no date columns")]
    NoDateColumns(RollNumber),
}
