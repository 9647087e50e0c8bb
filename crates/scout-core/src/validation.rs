//! # Input Validation
//!
//! Checks applied before a scan is recorded or queued. An ISBN that fails
//! here never reaches the store.
//!
//! ## ISBN Check Digits
//! ```text
//! ISBN-13: Σ dᵢ × (1 if i even else 3)          ≡ 0 (mod 10)
//! ISBN-10: Σ dᵢ × (10 − i), 'X' = 10 last only  ≡ 0 (mod 11)
//! ```

use crate::error::ValidationError;
use crate::types::NewScan;

/// Result type for validation checks.
pub type ValidationResult<T> = Result<T, ValidationError>;

/// Titles and authors are cut to this many characters.
pub const MAX_TEXT_LEN: usize = 500;

/// Strips separators and checks length, characters and check digit.
///
/// Returns the canonical form (digits, plus an upper-case `X` for ISBN-10).
///
/// ## Example
/// ```rust
/// use scout_core::validation::normalize_isbn;
///
/// assert_eq!(normalize_isbn("978-0-14-044913-6").unwrap(), "9780140449136");
/// assert_eq!(normalize_isbn("0-8044-2957-x").unwrap(), "080442957X");
/// assert!(normalize_isbn("9780140449137").is_err());
/// ```
pub fn normalize_isbn(raw: &str) -> ValidationResult<String> {
    let isbn: String = raw
        .chars()
        .filter(|c| !c.is_whitespace() && *c != '-')
        .map(|c| c.to_ascii_uppercase())
        .collect();

    if isbn.is_empty() {
        return Err(ValidationError::Required {
            field: "isbn".to_string(),
        });
    }

    // Byte offsets below assume one byte per character.
    if !isbn.is_ascii() {
        return Err(invalid_format("ISBN must contain only ASCII digits and X"));
    }

    let valid = match isbn.len() {
        13 => {
            if !isbn.chars().all(|c| c.is_ascii_digit()) {
                return Err(invalid_format("ISBN-13 must contain only digits"));
            }
            isbn13_checksum_ok(&isbn)
        }
        10 => {
            let (body, check) = isbn.split_at(9);
            if !body.chars().all(|c| c.is_ascii_digit())
                || !check.chars().all(|c| c.is_ascii_digit() || c == 'X')
            {
                return Err(invalid_format(
                    "ISBN-10 must be nine digits followed by a digit or X",
                ));
            }
            isbn10_checksum_ok(&isbn)
        }
        n => {
            return Err(invalid_format(&format!(
                "expected 10 or 13 characters, got {}",
                n
            )))
        }
    };

    if !valid {
        return Err(ValidationError::InvalidChecksum {
            field: "isbn".to_string(),
            value: isbn,
        });
    }

    Ok(isbn)
}

fn invalid_format(reason: &str) -> ValidationError {
    ValidationError::InvalidFormat {
        field: "isbn".to_string(),
        reason: reason.to_string(),
    }
}

fn isbn13_checksum_ok(isbn: &str) -> bool {
    let sum: u32 = isbn
        .bytes()
        .enumerate()
        .map(|(i, b)| {
            let digit = (b - b'0') as u32;
            if i % 2 == 0 {
                digit
            } else {
                digit * 3
            }
        })
        .sum();
    sum % 10 == 0
}

fn isbn10_checksum_ok(isbn: &str) -> bool {
    let sum: u32 = isbn
        .bytes()
        .enumerate()
        .map(|(i, b)| {
            let value = if b == b'X' { 10 } else { (b - b'0') as u32 };
            value * (10 - i as u32)
        })
        .sum();
    sum % 11 == 0
}

/// Trims free text and cuts it to [`MAX_TEXT_LEN`] characters.
///
/// Never fails: an oversized title must not cost the user the scan.
pub fn normalize_text(value: &str) -> String {
    let trimmed = value.trim();
    match trimmed.char_indices().nth(MAX_TEXT_LEN) {
        Some((end, _)) => trimmed[..end].trim_end().to_string(),
        None => trimmed.to_string(),
    }
}

/// Canonicalizes a scan before it is recorded or queued.
pub fn validate_scan(scan: &NewScan) -> ValidationResult<NewScan> {
    Ok(NewScan {
        isbn: normalize_isbn(&scan.isbn)?,
        title: normalize_text(&scan.title),
        author: normalize_text(&scan.author),
    })
}
