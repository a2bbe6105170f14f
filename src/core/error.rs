//! Error types for biotable
//!
//! Defines all error types used throughout the library.

use crate::core::schema::ScalarType;
use thiserror::Error;

/// Coarse classification of every failure the engine can report.
///
/// All classes are data-correctness errors and therefore fatal for the
/// current load; nothing is retried internally.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorClass {
    /// Malformed structure: bad declared header, unknown CIGAR/MD character
    Structural,
    /// Row width disagrees with the locked schema
    SchemaViolation,
    /// Non-numeric token in a numeric column
    TypeCoercion,
    /// Cross-field consistency failure (MD vs CIGAR, missing tag)
    SemanticAssertion,
    /// Failure of the underlying line source
    Io,
}

/// Main error type for table loading, typing and expansion
#[derive(Debug, Error)]
pub enum BioTableError {
    /// Structural problem in the input (header names, ordering, field syntax)
    #[error("Invalid {format} structure at line {line}: {message}")]
    Structural {
        format: &'static str,
        line: usize,
        message: String,
    },

    /// Data row width disagrees with the locked schema
    #[error("Schema violation at line {line}: expected {expected} fields, found {found}")]
    SchemaViolation {
        line: usize,
        expected: usize,
        found: usize,
    },

    /// Appended record width disagrees with the locked schema
    #[error("Record {row} has {found} values but the schema has {expected} columns")]
    WidthMismatch {
        row: usize,
        expected: usize,
        found: usize,
    },

    /// Appending before any schema was detected
    #[error("Cannot append records before the schema is locked")]
    SchemaNotLocked,

    /// Token cannot be converted to the declared column type
    #[error("Cannot convert '{value}' in column {column} to {expected} at line {line}")]
    TypeCoercion {
        line: usize,
        column: String,
        value: String,
        expected: ScalarType,
    },

    /// Requested SAM optional tag is absent from every record
    #[error("Tag {0} not found in any record")]
    MissingTag(String),

    /// Requested column does not exist in the schema
    #[error("Column not found: {0}")]
    MissingColumn(String),

    /// CIGAR/MD decoding errors
    #[error("Alignment string error: {0}")]
    Cigar(#[from] CigarError),

    /// Input path does not carry an extension accepted for the format
    #[error("Invalid file extension for {format}: {path}")]
    InvalidExtension { format: &'static str, path: String },

    /// External converter (samtools, bcftools) exited unsuccessfully
    #[error("{program} failed with {status}: {stderr}")]
    ToolFailed {
        program: String,
        status: String,
        stderr: String,
    },

    /// I/O errors from the line source
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl BioTableError {
    /// Map this error onto the engine's error taxonomy
    pub fn class(&self) -> ErrorClass {
        match self {
            BioTableError::Structural { .. } => ErrorClass::Structural,
            BioTableError::SchemaViolation { .. }
            | BioTableError::WidthMismatch { .. }
            | BioTableError::SchemaNotLocked => ErrorClass::SchemaViolation,
            BioTableError::TypeCoercion { .. } => ErrorClass::TypeCoercion,
            BioTableError::MissingTag(_) | BioTableError::MissingColumn(_) => {
                ErrorClass::SemanticAssertion
            }
            BioTableError::Cigar(e) => e.class(),
            BioTableError::InvalidExtension { .. }
            | BioTableError::ToolFailed { .. }
            | BioTableError::Io(_) => ErrorClass::Io,
        }
    }

    pub(crate) fn structural(format: &'static str, line: usize, message: impl Into<String>) -> Self {
        BioTableError::Structural {
            format,
            line,
            message: message.into(),
        }
    }
}

/// Errors that can occur while decoding CIGAR and MD strings
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CigarError {
    /// Unknown operation character or missing run length
    #[error("Invalid CIGAR '{cigar}': {message}")]
    InvalidCigar { cigar: String, message: String },

    /// Unknown character or dangling deletion marker in an MD tag
    #[error("Invalid MD tag '{md}': {message}")]
    InvalidMd { md: String, message: String },

    /// CIGAR and MD consume different numbers of reference symbols
    #[error("MD tag '{md}' does not match CIGAR '{cigar}': CIGAR consumes {cigar_consumed} symbols, MD provides {md_len}")]
    MdMismatch {
        cigar: String,
        md: String,
        cigar_consumed: usize,
        md_len: usize,
    },
}

impl CigarError {
    pub fn class(&self) -> ErrorClass {
        match self {
            CigarError::InvalidCigar { .. } | CigarError::InvalidMd { .. } => ErrorClass::Structural,
            CigarError::MdMismatch { .. } => ErrorClass::SemanticAssertion,
        }
    }
}

/// Result type alias for table operations
pub type TableResult<T> = std::result::Result<T, BioTableError>;

/// Result type alias for CIGAR/MD decoding
pub type CigarResult<T> = std::result::Result<T, CigarError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_classes() {
        let e = BioTableError::structural("VCF", 3, "bad header");
        assert_eq!(e.class(), ErrorClass::Structural);
        assert_eq!(e.to_string(), "Invalid VCF structure at line 3: bad header");

        let e = BioTableError::SchemaViolation { line: 5, expected: 11, found: 9 };
        assert_eq!(e.class(), ErrorClass::SchemaViolation);

        let e = BioTableError::MissingTag("MD".to_string());
        assert_eq!(e.class(), ErrorClass::SemanticAssertion);
    }

    #[test]
    fn test_cigar_error_class_passthrough() {
        let e: BioTableError = CigarError::MdMismatch {
            cigar: "10M".to_string(),
            md: "9".to_string(),
            cigar_consumed: 10,
            md_len: 9,
        }
        .into();
        assert_eq!(e.class(), ErrorClass::SemanticAssertion);

        let e: BioTableError = CigarError::InvalidCigar {
            cigar: "10Q".to_string(),
            message: "unknown operation 'Q'".to_string(),
        }
        .into();
        assert_eq!(e.class(), ErrorClass::Structural);
    }
}
