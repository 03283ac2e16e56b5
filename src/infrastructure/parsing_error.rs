//! Parsing error types for the chart page and the Danawa API responses
//!
//! Field-level problems that can be recovered from are reported as warnings
//! instead; these errors abort the parse of the current page.

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ParsingError {
    #[error("Results table not found (noise={noise}, power={power})")]
    TableNotFound { noise: i64, power: i64 },

    #[error("No table rows found (noise={noise}, power={power})")]
    NoRows { noise: i64, power: i64 },

    #[error("Required field '{field}' not found in HTML")]
    RequiredFieldMissing {
        field: String,
        context: Option<String>,
    },

    #[error("Invalid number in {field}: {text:?}")]
    InvalidNumber { field: String, text: String },

    #[error("{field} range is inverted: {min} > {max}")]
    RangeInverted {
        field: String,
        min: String,
        max: String,
    },

    #[error("Expected {expected} {what}, found {found}")]
    UnexpectedCellCount {
        what: String,
        expected: usize,
        found: usize,
    },

    #[error("Invalid CSS selector: {selector} - {reason}")]
    InvalidSelector { selector: String, reason: String },

    #[error("Row {row} (noise={noise}, power={power}) could not be parsed: {source}")]
    Row {
        noise: i64,
        power: i64,
        row: usize,
        #[source]
        source: Box<ParsingError>,
    },
}

impl ParsingError {
    /// Create a required field missing error with context
    pub fn required_field_missing(field: &str, context: Option<&str>) -> Self {
        Self::RequiredFieldMissing {
            field: field.to_string(),
            context: context.map(|s| s.to_string()),
        }
    }

    pub fn invalid_number(field: &str, text: &str) -> Self {
        Self::InvalidNumber {
            field: field.to_string(),
            text: text.to_string(),
        }
    }

    pub fn range_inverted(field: &str, min: impl ToString, max: impl ToString) -> Self {
        Self::RangeInverted {
            field: field.to_string(),
            min: min.to_string(),
            max: max.to_string(),
        }
    }

    pub fn unexpected_count(what: &str, expected: usize, found: usize) -> Self {
        Self::UnexpectedCellCount {
            what: what.to_string(),
            expected,
            found,
        }
    }

    /// Wrap a field error with the location of the row it came from
    pub fn in_row(self, noise: i64, power: i64, row: usize) -> Self {
        Self::Row {
            noise,
            power,
            row,
            source: Box::new(self),
        }
    }
}

pub type ParsingResult<T> = Result<T, ParsingError>;
