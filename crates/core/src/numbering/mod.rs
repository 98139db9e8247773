//! Document number rules.
//!
//! A document number is `<PREFIX><YYYYMMDD><NNN>`: the document kind prefix,
//! the document date and a 3-digit daily sequence starting at `001`. The
//! sequence is recomputed from the highest stored number on every call;
//! nothing is counted in memory.

use chrono::NaiveDate;

use crate::posting::{DocumentKind, PostingError};

/// Width of the zero-padded daily sequence.
pub const SEQUENCE_WIDTH: usize = 3;

/// Highest sequence number a prefix can reach on one day.
pub const MAX_SEQUENCE: u32 = 999;

/// Returns the scan key (prefix plus date) shared by all numbers of a day.
#[must_use]
pub fn scan_key(prefix: &str, date: NaiveDate) -> String {
    format!("{prefix}{}", date.format("%Y%m%d"))
}

/// Appends a zero-padded sequence to a scan key.
#[must_use]
pub fn format_number(scan_key: &str, sequence: u32) -> String {
    format!("{scan_key}{sequence:0width$}", width = SEQUENCE_WIDTH)
}

/// Computes the number following `last` within `scan_key`.
///
/// `last` is the highest stored number starting with `scan_key`, if any.
///
/// # Errors
///
/// - `CorruptSequence` if `last` does not end in three digits
/// - `SequenceExhausted` if `last` already used sequence 999
pub fn next_after(scan_key: &str, last: Option<&str>) -> Result<String, PostingError> {
    let Some(last) = last else {
        return Ok(format_number(scan_key, 1));
    };

    let current = sequence_of(last).ok_or_else(|| PostingError::CorruptSequence {
        document_number: last.to_string(),
    })?;

    if current >= MAX_SEQUENCE {
        return Err(PostingError::SequenceExhausted {
            scan_key: scan_key.to_string(),
        });
    }

    Ok(format_number(scan_key, current + 1))
}

/// Returns the trailing daily sequence of a document number.
#[must_use]
pub fn sequence_of(document_number: &str) -> Option<u32> {
    let start = document_number.len().checked_sub(SEQUENCE_WIDTH)?;
    let suffix = document_number.get(start..)?;
    if !suffix.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    suffix.parse().ok()
}

/// Returns true if `document_number` is a well-formed number for `kind`.
///
/// Used to vet user-edited numbers so the allocator never meets a number
/// it cannot continue.
#[must_use]
pub fn is_well_formed(kind: DocumentKind, document_number: &str) -> bool {
    let Some(rest) = document_number.strip_prefix(kind.prefix()) else {
        return false;
    };
    let Some((date, sequence)) = rest.split_at_checked(8) else {
        return false;
    };

    NaiveDate::parse_from_str(date, "%Y%m%d").is_ok()
        && sequence.len() == SEQUENCE_WIDTH
        && sequence_of(sequence).is_some_and(|s| s >= 1)
}
