use std::{fmt, io, path::PathBuf};

use thiserror::Error;

use crate::item::csv::record::HeaderKey;

/// Which side of a ragged row the column count missed on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnCountKind {
    TooFew,
    TooMany,
}

impl fmt::Display for ColumnCountKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ColumnCountKind::TooFew => f.write_str("too few"),
            ColumnCountKind::TooMany => f.write_str("too many"),
        }
    }
}

/// Coarse grouping of [`CsvError`] variants, for callers that only branch on kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Config,
    Io,
    Binding,
    Header,
    ColumnCount,
    FieldMapping,
    EmptyRow,
}

#[derive(Error, Debug)]
/// Csv reader / writer error
pub enum CsvError {
    #[error("Unknown CSV option '{0}'")]
    UnknownOption(String),

    #[error("The `{0}' option not set")]
    OptionNotSet(&'static str),

    #[error("Invalid value {value:?} for the `{option}' option (expected a single ASCII character)")]
    InvalidOption { option: &'static str, value: String },

    #[error("Failed to open CSV file \"{}\" for {mode}", .path.display())]
    Open {
        path: PathBuf,
        mode: &'static str,
        #[source]
        source: io::Error,
    },

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("CSV source does not support seeking")]
    NotSeekable,

    #[error("Failed to write CSV row at line {line}")]
    Write {
        line: usize,
        #[source]
        source: io::Error,
    },

    #[error("Failed to parse CSV record at line {line}: {message}")]
    Parse { line: usize, message: String },

    #[error("CSV reader/writer not associated with any file or stream")]
    UnboundSource,

    #[error("CSV reader/writer associated with not valid file handle")]
    InvalidHandle,

    #[error("Can't read headers from CSV file")]
    MissingHeaderRow,

    #[error("The headers must be defined for CSV file with headers")]
    MissingHeaderDefinition,

    #[error("Invalid amount of columns in line {line} ({kind}: expected {expected}, got {actual})")]
    ColumnCount {
        kind: ColumnCountKind,
        line: usize,
        expected: usize,
        actual: usize,
    },

    #[error(
        "Passed data for CSV contains unexpected field(s): {} (expected: {})",
        quoted(.fields),
        quoted(.expected)
    )]
    UnexpectedFields {
        fields: Vec<HeaderKey>,
        expected: Vec<HeaderKey>,
    },

    #[error("Passed data for CSV missing field(s): {}", quoted(.fields))]
    MissingFields { fields: Vec<HeaderKey> },

    #[error("Attempt to write empty row in CSV file")]
    EmptyRow,
}

impl CsvError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            CsvError::UnknownOption(_)
            | CsvError::OptionNotSet(_)
            | CsvError::InvalidOption { .. } => ErrorCategory::Config,
            CsvError::Open { .. }
            | CsvError::Io(_)
            | CsvError::NotSeekable
            | CsvError::Write { .. }
            | CsvError::Parse { .. } => ErrorCategory::Io,
            CsvError::UnboundSource | CsvError::InvalidHandle => ErrorCategory::Binding,
            CsvError::MissingHeaderRow | CsvError::MissingHeaderDefinition => {
                ErrorCategory::Header
            }
            CsvError::ColumnCount { .. } => ErrorCategory::ColumnCount,
            CsvError::UnexpectedFields { .. } | CsvError::MissingFields { .. } => {
                ErrorCategory::FieldMapping
            }
            CsvError::EmptyRow => ErrorCategory::EmptyRow,
        }
    }
}

fn quoted(keys: &[HeaderKey]) -> String {
    keys.iter()
        .map(|key| format!("\"{}\"", key))
        .collect::<Vec<_>>()
        .join(", ")
}

pub type Result<T> = std::result::Result<T, CsvError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn column_count_message_carries_counts() {
        let error = CsvError::ColumnCount {
            kind: ColumnCountKind::TooFew,
            line: 3,
            expected: 3,
            actual: 2,
        };
        assert_eq!(
            error.to_string(),
            "Invalid amount of columns in line 3 (too few: expected 3, got 2)"
        );
        assert_eq!(error.category(), ErrorCategory::ColumnCount);
    }

    #[test]
    fn field_lists_are_quoted() {
        let error = CsvError::UnexpectedFields {
            fields: vec![HeaderKey::from("x")],
            expected: vec![HeaderKey::from("a"), HeaderKey::from(1usize)],
        };
        assert_eq!(
            error.to_string(),
            "Passed data for CSV contains unexpected field(s): \"x\" (expected: \"a\", \"1\")"
        );
        assert_eq!(error.category(), ErrorCategory::FieldMapping);
    }
}
