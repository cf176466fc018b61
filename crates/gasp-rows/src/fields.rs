//! Parsers for the structured row columns.
//!
//! Each parser is total over its input: it either yields the typed value or a
//! [`FieldError`] naming the offending raw text. No floating point anywhere.

use serde::Serialize;
use std::fmt;

// ---------------------------------------------------------------------------
// Error type
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldError {
    /// Required value is empty after trimming.
    Empty,
    /// `WxH` size (or a `WxH,WxH` list) could not be parsed.
    InvalidSize { raw: String },
    /// Amount is not a non-negative decimal.
    InvalidAmount { raw: String },
    /// Amount has more than 6 fractional digits (micro conversion would round).
    TooManyDecimalPlaces { raw: String },
    /// Comma-separated id list has an empty element.
    InvalidIdList { raw: String },
    /// Targeting token is neither `key=value` nor `key!=value`.
    InvalidToken { raw: String },
}

impl fmt::Display for FieldError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldError::Empty => write!(f, "value is empty"),
            FieldError::InvalidSize { raw } => {
                write!(f, "expected 'WxH' or 'WxH,WxH,...', got '{raw}'")
            }
            FieldError::InvalidAmount { raw } => {
                write!(f, "expected a non-negative decimal amount, got '{raw}'")
            }
            FieldError::TooManyDecimalPlaces { raw } => {
                write!(
                    f,
                    "amount has more than 6 decimal places (ambiguous micro conversion): '{raw}'"
                )
            }
            FieldError::InvalidIdList { raw } => {
                write!(f, "expected comma-separated ids without blanks, got '{raw}'")
            }
            FieldError::InvalidToken { raw } => {
                write!(f, "expected 'key=value' or 'key!=value', got '{raw}'")
            }
        }
    }
}

impl std::error::Error for FieldError {}

// ---------------------------------------------------------------------------
// Sizes
// ---------------------------------------------------------------------------

/// Creative size in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct Size {
    pub width: u32,
    pub height: u32,
}

impl Size {
    /// Parse a single `WxH` (case-insensitive `x`). Both sides must be > 0.
    pub fn parse(raw: &str) -> Result<Self, FieldError> {
        let invalid = || FieldError::InvalidSize {
            raw: raw.to_string(),
        };
        let t = raw.trim();
        let (w, h) = t
            .split_once('x')
            .or_else(|| t.split_once('X'))
            .ok_or_else(invalid)?;
        let width: u32 = w.trim().parse().map_err(|_| invalid())?;
        let height: u32 = h.trim().parse().map_err(|_| invalid())?;
        if width == 0 || height == 0 {
            return Err(invalid());
        }
        Ok(Size { width, height })
    }
}

impl fmt::Display for Size {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

/// Parse a `WxH,WxH,...` list. At least one size is required.
pub fn parse_sizes(raw: &str) -> Result<Vec<Size>, FieldError> {
    if raw.trim().is_empty() {
        return Err(FieldError::Empty);
    }
    raw.split(',')
        .map(|part| {
            if part.trim().is_empty() {
                Err(FieldError::InvalidSize {
                    raw: raw.to_string(),
                })
            } else {
                Size::parse(part)
            }
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Amounts
// ---------------------------------------------------------------------------

/// Convert a non-negative decimal amount string to integer micros.
///
/// - Accepts an optional leading `+`, rejects `-`.
/// - At most 6 fractional digits (never rounds).
/// - No floating point at any stage.
pub fn amount_to_micros(raw: &str) -> Result<i64, FieldError> {
    let s = raw.trim();
    if s.is_empty() {
        return Err(FieldError::Empty);
    }
    let invalid = || FieldError::InvalidAmount {
        raw: s.to_string(),
    };

    let digits = s.strip_prefix('+').unwrap_or(s);
    let (int_part, frac_part) = digits.split_once('.').unwrap_or((digits, ""));

    let all_digits = |p: &str| p.chars().all(|c| c.is_ascii_digit());
    if (int_part.is_empty() && frac_part.is_empty()) || !all_digits(int_part) || !all_digits(frac_part)
    {
        return Err(invalid());
    }
    if frac_part.len() > 6 {
        return Err(FieldError::TooManyDecimalPlaces {
            raw: s.to_string(),
        });
    }

    let int_val: i64 = if int_part.is_empty() {
        0
    } else {
        int_part.parse().map_err(|_| invalid())?
    };

    let mut frac_padded = frac_part.to_string();
    while frac_padded.len() < 6 {
        frac_padded.push('0');
    }
    let frac_val: i64 = frac_padded.parse().map_err(|_| invalid())?;

    int_val
        .checked_mul(1_000_000)
        .and_then(|v| v.checked_add(frac_val))
        .ok_or_else(invalid)
}

// ---------------------------------------------------------------------------
// Ad unit ids
// ---------------------------------------------------------------------------

/// Parse a comma-separated id list (`"123,456"`). At least one id.
pub fn parse_ad_unit_ids(raw: &str) -> Result<Vec<String>, FieldError> {
    if raw.trim().is_empty() {
        return Err(FieldError::Empty);
    }
    raw.split(',')
        .map(|part| {
            let id = part.trim();
            if id.is_empty() {
                Err(FieldError::InvalidIdList {
                    raw: raw.to_string(),
                })
            } else {
                Ok(id.to_string())
            }
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Key/value targeting tokens
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum TargetingOperator {
    Is,
    IsNot,
}

impl TargetingOperator {
    /// Remote enum spelling.
    pub fn as_str(&self) -> &'static str {
        match self {
            TargetingOperator::Is => "IS",
            TargetingOperator::IsNot => "IS_NOT",
        }
    }
}

/// A `key=value` / `key!=value` custom-targeting token.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct KeyValueToken {
    pub key: String,
    pub value: String,
    pub operator: TargetingOperator,
}

impl KeyValueToken {
    pub fn parse(raw: &str) -> Result<Self, FieldError> {
        let invalid = || FieldError::InvalidToken {
            raw: raw.to_string(),
        };
        let t = raw.trim();

        // `!=` must be tried first: `a!=b` also contains `=`.
        let (key, value, operator) = if let Some((k, v)) = t.split_once("!=") {
            (k, v, TargetingOperator::IsNot)
        } else if let Some((k, v)) = t.split_once('=') {
            (k, v, TargetingOperator::Is)
        } else {
            return Err(invalid());
        };

        let key = key.trim();
        let value = value.trim();
        if key.is_empty() || value.is_empty() || key.contains('=') || value.contains('=') {
            return Err(invalid());
        }
        if key.ends_with('!') {
            return Err(invalid());
        }

        Ok(KeyValueToken {
            key: key.to_string(),
            value: value.to_string(),
            operator,
        })
    }
}
