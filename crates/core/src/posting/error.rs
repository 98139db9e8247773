//! Posting error types.
//!
//! Every failure of the create and edit flows is one of these variants.
//! `ErrorKind` groups them into the four categories callers act on:
//! show the message, show "not found", retry, or give up.

use std::fmt;

use rust_decimal::Decimal;
use thiserror::Error;

/// Category of a posting error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Bad or missing input. Surfaced to the user, never retried.
    Validation,
    /// The document being edited does not exist.
    NotFound,
    /// Concurrent creators collided on a document number.
    NumberingConflict,
    /// The store failed.
    Persistence,
}

/// Field of a submitted line that failed validation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineField {
    /// Inventory reference.
    Inventory,
    /// Number of sale units.
    PackCount,
    /// Sale unit label.
    Unit,
    /// Price of one sale unit.
    UnitPrice,
    /// Items per sale unit.
    PackSize,
}

impl fmt::Display for LineField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Inventory => "inventory",
            Self::PackCount => "pack count",
            Self::Unit => "unit",
            Self::UnitPrice => "unit price",
            Self::PackSize => "pack size",
        })
    }
}

/// What is wrong with a line field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineProblem {
    /// The field was left empty.
    Missing,
    /// The value is below zero.
    Negative,
    /// The value must be greater than zero.
    NotPositive,
    /// The value is larger than a line can store.
    OutOfRange,
    /// The value has more decimal places than a line can store.
    TooPrecise,
}

impl fmt::Display for LineProblem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Missing => "is required",
            Self::Negative => "must not be negative",
            Self::NotPositive => "must be greater than zero",
            Self::OutOfRange => "is too large",
            Self::TooPrecise => "has too many decimal places",
        })
    }
}

/// Errors that can occur while posting or numbering a document.
#[derive(Debug, Error)]
pub enum PostingError {
    // ========== Validation Errors ==========
    /// No customer or supplier was selected.
    #[error("A customer or supplier must be selected")]
    MissingCounterparty,

    /// A submitted line is incomplete or malformed.
    #[error("Line {row}: {field} {problem}")]
    InvalidLine {
        /// 1-based row index.
        row: usize,
        /// The offending field.
        field: LineField,
        /// What is wrong with it.
        problem: LineProblem,
    },

    /// A submitted line is entirely empty.
    #[error("Line {row} is empty")]
    BlankLine {
        /// 1-based row index.
        row: usize,
    },

    /// Balanced lines do not balance. Indicates lines built outside the normalizer.
    #[error("Posting is not balanced. Debit: {debit}, Credit: {credit}")]
    Unbalanced {
        /// Total debit amount.
        debit: Decimal,
        /// Total credit amount.
        credit: Decimal,
    },

    /// The lines add up to more than a balancing line can store.
    #[error("Document total exceeds {max} at line {row}")]
    TotalOutOfRange {
        /// 1-based row at which the running total overflowed.
        row: usize,
        /// Largest storable amount.
        max: Decimal,
    },

    /// A user-edited document number does not follow `<PREFIX><YYYYMMDD><NNN>`.
    #[error("Invalid document number: {0}")]
    InvalidDocumentNumber(String),

    /// A user-edited document number is already taken.
    #[error("Document number {0} is already in use")]
    DuplicateDocumentNumber(String),

    /// All 999 sequence numbers of a prefix and day are used.
    #[error("No document numbers left for {scan_key}")]
    SequenceExhausted {
        /// Prefix plus date that ran out.
        scan_key: String,
    },

    // ========== Not Found ==========
    /// The document to edit does not exist.
    #[error("Transaction not found: {0}")]
    TransactionNotFound(String),

    // ========== Concurrency Errors ==========
    /// Number allocation kept colliding with concurrent creators.
    #[error("Could not allocate a document number for {scan_key} after {attempts} attempts")]
    NumberingConflict {
        /// Prefix plus date being allocated.
        scan_key: String,
        /// Attempts made before giving up.
        attempts: u32,
    },

    // ========== Persistence Errors ==========
    /// The latest stored number of a day does not end in three digits.
    #[error("Stored document number {document_number} has no numeric sequence")]
    CorruptSequence {
        /// The offending stored number.
        document_number: String,
    },

    /// Store failure.
    #[error("Database error: {0}")]
    Persistence(String),
}

impl PostingError {
    /// Shorthand for a failed line field.
    #[must_use]
    pub const fn invalid_line(row: usize, field: LineField, problem: LineProblem) -> Self {
        Self::InvalidLine {
            row,
            field,
            problem,
        }
    }

    /// Returns the category of this error.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::MissingCounterparty
            | Self::InvalidLine { .. }
            | Self::BlankLine { .. }
            | Self::Unbalanced { .. }
            | Self::TotalOutOfRange { .. }
            | Self::InvalidDocumentNumber(_)
            | Self::DuplicateDocumentNumber(_)
            | Self::SequenceExhausted { .. } => ErrorKind::Validation,
            Self::TransactionNotFound(_) => ErrorKind::NotFound,
            Self::NumberingConflict { .. } => ErrorKind::NumberingConflict,
            Self::CorruptSequence { .. } | Self::Persistence(_) => ErrorKind::Persistence,
        }
    }

    /// Returns the error code for API responses.
    #[must_use]
    pub const fn error_code(&self) -> &'static str {
        match self {
            Self::MissingCounterparty => "MISSING_COUNTERPARTY",
            Self::InvalidLine { .. } => "INVALID_LINE",
            Self::BlankLine { .. } => "BLANK_LINE",
            Self::Unbalanced { .. } => "UNBALANCED_POSTING",
            Self::TotalOutOfRange { .. } => "TOTAL_OUT_OF_RANGE",
            Self::InvalidDocumentNumber(_) => "INVALID_DOCUMENT_NUMBER",
            Self::DuplicateDocumentNumber(_) => "DUPLICATE_DOCUMENT_NUMBER",
            Self::SequenceExhausted { .. } => "SEQUENCE_EXHAUSTED",
            Self::TransactionNotFound(_) => "TRANSACTION_NOT_FOUND",
            Self::NumberingConflict { .. } => "NUMBERING_CONFLICT",
            Self::CorruptSequence { .. } => "CORRUPT_SEQUENCE",
            Self::Persistence(_) => "DATABASE_ERROR",
        }
    }

    /// Returns the HTTP status code for this error.
    #[must_use]
    pub const fn http_status_code(&self) -> u16 {
        match self {
            Self::DuplicateDocumentNumber(_) => 409,
            Self::SequenceExhausted { .. } => 422,
            _ => match self.kind() {
                ErrorKind::Validation => 400,
                ErrorKind::NotFound => 404,
                ErrorKind::NumberingConflict => 409,
                ErrorKind::Persistence => 500,
            },
        }
    }

    /// Returns true if the caller may retry the whole request.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(self.kind(), ErrorKind::NumberingConflict)
    }
}
