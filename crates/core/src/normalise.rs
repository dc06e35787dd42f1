//! Reference-format normaliser.
//!
//! Copybooks arrive with or without the sequence-number area (columns 1-6)
//! and with trailing text past column 72. [`normalise`] locates the first
//! level-01 entry to learn where the indicator column sits, then rewrites
//! every line so that columns 1-6 are blank and columns 7-72 hold the
//! indicator area plus areas A and B.

use thiserror::Error;

use copybook_toolchain_diagnostics::{Diagnostic, codes};

/// Width of the sequence-number area.
const SEQUENCE_AREA: usize = 6;
/// Width of columns 7 through 72.
const DATA_BLOCK: usize = 66;

/// Failure to locate the reference-format columns.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[non_exhaustive]
pub enum NormaliseError {
    /// No line looks like a level-01 entry.
    #[error("no level 01 entry found; cannot determine the indicator column")]
    MissingRootLevel,
}

impl NormaliseError {
    /// Convert into a [`Diagnostic`].
    pub fn to_diagnostic(&self) -> Diagnostic {
        match self {
            NormaliseError::MissingRootLevel => {
                Diagnostic::for_code(codes::NORMALISE_MISSING_ROOT, self.to_string(), None)
            }
        }
    }
}

/// Rewrite `text` into fixed reference format.
///
/// Empty input yields empty output. Every line is right-trimmed, padded to
/// the full data block and cut to it, then prefixed with six blanks.
pub fn normalise(text: &str) -> Result<String, NormaliseError> {
    if text.is_empty() {
        return Ok(String::new());
    }
    let indentation = text
        .split('\n')
        .find_map(data_block_start)
        .ok_or(NormaliseError::MissingRootLevel)?;
    tracing::debug!(indentation, "normalising copybook");

    let lines: Vec<String> = text
        .split('\n')
        .map(|line| normalise_line(line, indentation))
        .collect();
    Ok(lines.join("\n"))
}

/// Column (0-based, in characters) of the indicator area, if `line` is a
/// level-01 entry.
///
/// The indicator is preceded either by nothing or by any run of blanks
/// followed by exactly six characters of sequence area. It must be one of
/// `/`, `D`, `d` or a blank, and is followed by optional blanks and `01`
/// plus a blank. Longer prefixes are preferred.
fn data_block_start(line: &str) -> Option<usize> {
    let chars: Vec<char> = line.chars().collect();
    let leading = chars.iter().take_while(|&&c| is_blank(c)).count();
    (0..=leading)
        .rev()
        .map(|blanks| blanks + SEQUENCE_AREA)
        .find(|&at| is_root_entry_at(&chars, at))
        .or_else(|| is_root_entry_at(&chars, 0).then_some(0))
}

fn is_root_entry_at(chars: &[char], at: usize) -> bool {
    let Some(&indicator) = chars.get(at) else {
        return false;
    };
    if !matches!(indicator, '/' | 'D' | 'd') && !is_blank(indicator) {
        return false;
    }
    let mut i = at + 1;
    while chars.get(i).is_some_and(|&c| is_blank(c)) {
        i += 1;
    }
    chars.get(i) == Some(&'0')
        && chars.get(i + 1) == Some(&'1')
        && chars.get(i + 2).is_some_and(|&c| is_blank(c))
}

fn is_blank(c: char) -> bool {
    matches!(c, ' ' | '\t' | '\n' | '\x0C' | '\r')
}

fn normalise_line(line: &str, indentation: usize) -> String {
    let mut out = " ".repeat(SEQUENCE_AREA);
    let kept: String = line
        .trim_end()
        .chars()
        .skip(indentation)
        .take(DATA_BLOCK)
        .collect();
    let width = kept.chars().count();
    out.push_str(&kept);
    out.extend(std::iter::repeat_n(' ', DATA_BLOCK - width));
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pad(line: &str) -> String {
        format!("{line:<72}")
    }

    #[test]
    fn empty_input_is_empty_output() {
        assert_eq!(normalise("").unwrap(), "");
    }

    #[test]
    fn indents_bare_copybook() {
        let input = " 01  RECORD-1.\n     05  FIELD-A    PIC X(10).";
        let expected = [
            pad("       01  RECORD-1."),
            pad("           05  FIELD-A    PIC X(10)."),
        ]
        .join("\n");
        assert_eq!(normalise(input).unwrap(), expected);
    }

    #[test]
    fn strips_sequence_numbers_and_trailing_text() {
        let input = format!(
            "{}extra\n{}extra",
            pad("000100 01  RECORD-1."),
            pad("000200     05  FIELD-A    PIC X(10).")
        );
        let expected = [
            pad("       01  RECORD-1."),
            pad("           05  FIELD-A    PIC X(10)."),
        ]
        .join("\n");
        assert_eq!(normalise(&input).unwrap(), expected);
    }

    #[test]
    fn keeps_indicator_column() {
        let input = "000100/01  RECORD-1.\n000200*    05  FIELD-A    PIC X(10).\n000300d    05  B PIC 9.";
        let out = normalise(input).unwrap();
        let lines: Vec<&str> = out.lines().collect();
        assert_eq!(lines[0], pad("      /01  RECORD-1."));
        assert_eq!(lines[1], pad("      *    05  FIELD-A    PIC X(10)."));
        assert_eq!(lines[2], pad("      d    05  B PIC 9."));
    }

    #[test]
    fn preformatted_is_unchanged() {
        let input = [
            pad("       01  RECORD-1."),
            pad("           05  FIELD-A    PIC X(10)."),
        ]
        .join("\n");
        assert_eq!(normalise(&input).unwrap(), input);
    }

    #[test]
    fn trailing_carriage_return_is_trimmed() {
        assert_eq!(
            normalise("       01  RECORD-1.\r").unwrap(),
            pad("       01  RECORD-1.")
        );
    }

    #[test]
    fn indicator_column_detection() {
        let cases = [
            (" 01 RECORD.", Some(0)),
            ("012345 01 RECORD.", Some(6)),
            ("012345   01 RECORD.", Some(6)),
            ("012345d01 RECORD.", Some(6)),
            ("2345 01 RECORD.", None),
            ("01 RECORD.", None),
            ("05 FIELD PIC X(10).", None),
        ];
        for (line, expected) in cases {
            assert_eq!(data_block_start(line), expected, "{line:?}");
        }
    }

    #[test]
    fn missing_root_level_is_an_error() {
        let input = "000100 05  RECORD-1.\n000200     05  FIELD-A    PIC X(10).";
        assert_eq!(normalise(input), Err(NormaliseError::MissingRootLevel));
        let input = "01  RECORD-1.\n    05  FIELD-A    PIC X(10).";
        assert_eq!(normalise(input), Err(NormaliseError::MissingRootLevel));
    }

    #[test]
    fn error_maps_to_diagnostic() {
        let diag = NormaliseError::MissingRootLevel.to_diagnostic();
        assert_eq!(diag.id, codes::NORMALISE_MISSING_ROOT);
    }
}
