//! PICTURE clause interpretation.
//!
//! A picture string such as `S9(5)V99` is reduced to two facts: the
//! [`SemanticType`] the field decodes to, and its character width. Both are
//! pure functions of the raw text; the raw text itself is kept verbatim on
//! [`Picture`] for output metadata.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Indicators that make a picture alphanumeric.
const ALPHA_INDICATORS: &[char] = &['X', 'A'];
/// Indicators for an explicit or implied decimal point, or a scaling factor.
const DECIMAL_INDICATORS: &[char] = &['.', 'V', 'P'];
/// Operational sign indicator.
const SIGN_INDICATORS: &[char] = &['S'];
/// Digit position indicator.
const DIGIT_INDICATORS: &[char] = &['9'];

/// Semantic type of a leaf field, derived from its picture string.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum SemanticType {
    /// No recognised indicator (e.g. an empty or exotic picture).
    #[default]
    Unknown,
    /// Unsigned integer, e.g. `9(5)`.
    Unsigned,
    /// Signed integer, e.g. `S9(5)`.
    Signed,
    /// Decimal number, e.g. `9(5)V99` or `9.99`.
    Decimal,
    /// Alphanumeric text, e.g. `X(5)` or `A(10)`.
    Alphanumeric,
}

impl SemanticType {
    /// Every semantic type, in declaration order.
    pub const ALL: [SemanticType; 5] = [
        SemanticType::Unknown,
        SemanticType::Unsigned,
        SemanticType::Signed,
        SemanticType::Decimal,
        SemanticType::Alphanumeric,
    ];

    /// Lowercase name used in profiles and JSON output.
    pub fn as_str(self) -> &'static str {
        match self {
            SemanticType::Unknown => "unknown",
            SemanticType::Unsigned => "unsigned",
            SemanticType::Signed => "signed",
            SemanticType::Decimal => "decimal",
            SemanticType::Alphanumeric => "alphanumeric",
        }
    }
}

impl fmt::Display for SemanticType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when a string does not name a [`SemanticType`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown semantic type {0:?} (expected one of: unknown, unsigned, signed, decimal, alpha)")]
pub struct ParseSemanticTypeError(pub String);

impl FromStr for SemanticType {
    type Err = ParseSemanticTypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "unknown" => Ok(SemanticType::Unknown),
            "unsigned" => Ok(SemanticType::Unsigned),
            "signed" => Ok(SemanticType::Signed),
            "decimal" => Ok(SemanticType::Decimal),
            "alpha" | "alphanumeric" => Ok(SemanticType::Alphanumeric),
            _ => Err(ParseSemanticTypeError(s.to_string())),
        }
    }
}

/// A parenthesised repeat count in a picture string could not be read, or
/// the counts add up to more than `usize` can hold.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("malformed or oversized repeat count {fragment:?} in PICTURE {picture:?}")]
pub struct PictureError {
    /// The full picture string as written.
    pub picture: String,
    /// The offending `token(count)` substring.
    pub fragment: String,
}

/// An interpreted PICTURE clause.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Picture {
    /// The clause text exactly as written in the copybook.
    pub raw: String,
    /// The semantic type the field decodes to.
    pub semantic_type: SemanticType,
    /// Characters occupied by one occurrence of the field.
    pub width: usize,
}

impl Picture {
    /// Classify and measure `raw`.
    pub fn parse(raw: impl Into<String>) -> Result<Self, PictureError> {
        let raw = raw.into();
        let width = measure(&raw)?;
        Ok(Self {
            semantic_type: classify(&raw),
            width,
            raw,
        })
    }
}

/// Classify a picture string. First match wins:
/// alphanumeric, decimal, signed, unsigned, otherwise [`SemanticType::Unknown`].
///
/// Matching ignores ASCII case.
pub fn classify(raw: &str) -> SemanticType {
    let upper = raw.to_ascii_uppercase();
    if upper.contains(ALPHA_INDICATORS) {
        SemanticType::Alphanumeric
    } else if upper.contains(DECIMAL_INDICATORS) {
        SemanticType::Decimal
    } else if upper.contains(SIGN_INDICATORS) {
        SemanticType::Signed
    } else if upper.contains(DIGIT_INDICATORS) {
        SemanticType::Unsigned
    } else {
        SemanticType::Unknown
    }
}

/// Compute the character width of one occurrence of a picture string.
///
/// `V` and `P` (optionally `P(n)`) take no storage and are removed first.
/// Each `token(n)` then contributes `n`, and every remaining character
/// contributes one:
///
/// - `S9(5)V9(7)` → `S` + 5 + 7 = 13
/// - `9(03).9(4)-` → 3 + `.` + 4 + `-` = 9
/// - `PPP9(5)` → 5
pub fn measure(raw: &str) -> Result<usize, PictureError> {
    let mut rest = strip_zero_width(&raw.to_ascii_uppercase());
    let mut width = 0usize;

    while let Some(open) = rest.find('(') {
        // The token is the single character in front of the parenthesis.
        let token_start = rest[..open]
            .char_indices()
            .next_back()
            .map_or(open, |(i, _)| i);
        let Some(close) = rest[open..].find(')').map(|i| open + i) else {
            return Err(PictureError {
                picture: raw.to_string(),
                fragment: rest[token_start..].to_string(),
            });
        };
        let count: usize = rest[open + 1..close]
            .trim()
            .parse()
            .map_err(|_| PictureError {
                picture: raw.to_string(),
                fragment: rest[token_start..=close].to_string(),
            })?;
        width = width.checked_add(count).ok_or_else(|| PictureError {
            picture: raw.to_string(),
            fragment: rest[token_start..=close].to_string(),
        })?;
        rest.replace_range(token_start..=close, "");
    }

    width.checked_add(rest.chars().count()).ok_or_else(|| PictureError {
        picture: raw.to_string(),
        fragment: rest,
    })
}

/// Remove `V` and `P` / `P(n)` from an uppercased picture string.
fn strip_zero_width(upper: &str) -> String {
    let mut out = String::with_capacity(upper.len());
    let mut chars = upper.char_indices().peekable();
    while let Some((i, ch)) = chars.next() {
        match ch {
            'V' => {}
            'P' => {
                if let Some(len) = numeric_repeat_len(&upper[i + 1..]) {
                    for _ in 0..len {
                        chars.next();
                    }
                }
            }
            other => out.push(other),
        }
    }
    out
}

/// Length of a leading `(digits)` group, if `s` starts with one.
fn numeric_repeat_len(s: &str) -> Option<usize> {
    let inner = s.strip_prefix('(')?;
    let digits = inner.bytes().take_while(u8::is_ascii_digit).count();
    (digits > 0 && inner[digits..].starts_with(')')).then_some(digits + 2)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classify_precedence() {
        let cases = [
            ("X", SemanticType::Alphanumeric),
            ("X(5)", SemanticType::Alphanumeric),
            ("A(10)", SemanticType::Alphanumeric),
            ("9V99", SemanticType::Decimal),
            ("9.99", SemanticType::Decimal),
            ("9(03).9(4)-", SemanticType::Decimal),
            ("S9(5)V99", SemanticType::Decimal),
            ("S9(5)", SemanticType::Signed),
            ("9(9)", SemanticType::Unsigned),
            ("?", SemanticType::Unknown),
            ("", SemanticType::Unknown),
        ];
        for (raw, expected) in cases {
            assert_eq!(classify(raw), expected, "classify({raw:?})");
        }
    }

    #[test]
    fn classify_ignores_case() {
        assert_eq!(classify("x(3)"), SemanticType::Alphanumeric);
        assert_eq!(classify("s9(3)"), SemanticType::Signed);
    }

    #[test]
    fn classify_is_stable() {
        for raw in ["S9(5)V99", "X(2)9(3)", "", "PPP9"] {
            assert_eq!(classify(raw), classify(raw));
        }
    }

    #[test]
    fn measure_widths() {
        let cases = [
            ("X", 1),
            ("XXX", 3),
            ("X(5)", 5),
            ("X(2)9(3)", 5),
            ("9(15)V99", 17),
            ("PPP9", 1),
            ("P(3)9", 1),
            ("9PPP", 1),
            ("S9(5)V99", 8),
            ("S9(5)V9(2)", 8),
            ("S9(5)V9(7)", 13),
            ("9(03).9(4)-", 9),
            ("S9(5).9(7)", 14),
            ("9(9)", 9),
            ("S9(5)", 6),
            ("", 0),
        ];
        for (raw, expected) in cases {
            assert_eq!(measure(raw).unwrap(), expected, "measure({raw:?})");
        }
    }

    #[test]
    fn measure_rejects_non_numeric_count() {
        let err = measure("X(A)").unwrap_err();
        assert_eq!(err.picture, "X(A)");
        assert_eq!(err.fragment, "X(A)");
    }

    #[test]
    fn measure_rejects_counts_that_overflow() {
        let max = usize::MAX;
        let err = measure(&format!("X({max})X(2)")).unwrap_err();
        assert_eq!(err.fragment, "X(2)");
        let err = measure(&format!("X({max})9")).unwrap_err();
        assert_eq!(err.fragment, "9");
        assert!(Picture::parse("9(18446744073709551616)").is_err());
    }

    #[test]
    fn measure_rejects_unterminated_count() {
        let err = measure("9(5").unwrap_err();
        assert_eq!(err.fragment, "9(5");
    }

    #[test]
    fn picture_parse_bundles_type_and_width() {
        let pic = Picture::parse("S9(5)V99").unwrap();
        assert_eq!(pic.raw, "S9(5)V99");
        assert_eq!(pic.semantic_type, SemanticType::Decimal);
        assert_eq!(pic.width, 8);
    }

    #[test]
    fn semantic_type_from_str_accepts_alpha_alias() {
        assert_eq!("alpha".parse::<SemanticType>(), Ok(SemanticType::Alphanumeric));
        assert_eq!("Decimal".parse::<SemanticType>(), Ok(SemanticType::Decimal));
        assert!("float".parse::<SemanticType>().is_err());
    }
}
