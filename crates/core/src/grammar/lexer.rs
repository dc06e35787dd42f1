//! Copybook lexer over reference-format text.
//!
//! Columns 1-6 (sequence area) and column 7 (indicator area) are never
//! tokenised. A line whose indicator is `*` or `/` is a comment and yields
//! no tokens.

/// Classification of a lexer token.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokKind {
    /// A run of non-blank characters: level numbers, names, keywords and
    /// picture strings alike.
    Word,
    /// A quoted literal, quotes included.
    Literal,
    /// The period that terminates an entry.
    Period,
}

/// A token that borrows its text from the source input.
#[derive(Debug, Clone, Copy)]
pub struct Token<'a> {
    /// The classification of this token.
    pub kind: TokKind,
    /// Borrowed slice of the source input for this token.
    pub text: &'a str,
    /// Byte offset of the first character.
    pub start: usize,
    /// Byte offset one past the last character.
    pub end: usize,
    /// Whether this is the first token on its source line.
    pub first_on_line: bool,
}

impl Token<'_> {
    /// Whether this is a word equal to `keyword`, ignoring ASCII case.
    pub fn is_keyword(&self, keyword: &str) -> bool {
        self.kind == TokKind::Word && self.text.eq_ignore_ascii_case(keyword)
    }
}

/// Column (0-based) of the indicator area.
const INDICATOR_COLUMN: usize = 6;

/// Tokenize reference-format copybook text.
pub fn tokenize(input: &str) -> Vec<Token<'_>> {
    let mut toks = Vec::new();
    let mut line_start = 0usize;
    for raw_line in input.split_inclusive('\n') {
        let line = raw_line.trim_end_matches(['\n', '\r']);
        tokenize_line(line, line_start, &mut toks);
        line_start += raw_line.len();
    }
    toks
}

fn tokenize_line<'a>(line: &'a str, offset: usize, toks: &mut Vec<Token<'a>>) {
    let mut chars = line.char_indices().skip(INDICATOR_COLUMN);
    let body_start = match chars.next() {
        Some((_, '*' | '/')) => return,
        Some((i, c)) => i + c.len_utf8(),
        None => return,
    };

    let b = line.as_bytes();
    let mut i = body_start;
    let mut first = true;
    let mut push = |kind, start: usize, end: usize, first: &mut bool| {
        toks.push(Token {
            kind,
            text: &line[start..end],
            start: offset + start,
            end: offset + end,
            first_on_line: *first,
        });
        *first = false;
    };

    // Delimiters are ASCII, so byte-wise scanning never splits a UTF-8
    // sequence at a token boundary.
    while i < b.len() {
        let c = b[i];
        if c.is_ascii_whitespace() {
            i += 1;
        } else if c == b'\'' || c == b'"' {
            let start = i;
            i += 1;
            while i < b.len() && b[i] != c {
                i += 1;
            }
            i = (i + 1).min(b.len());
            push(TokKind::Literal, start, i, &mut first);
        } else {
            let start = i;
            while i < b.len() && !b[i].is_ascii_whitespace() {
                i += 1;
            }
            if b[i - 1] == b'.' {
                if i - 1 > start {
                    push(TokKind::Word, start, i - 1, &mut first);
                }
                push(TokKind::Period, i - 1, i, &mut first);
            } else {
                push(TokKind::Word, start, i, &mut first);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds_and_text(input: &str) -> Vec<(TokKind, &str)> {
        tokenize(input).iter().map(|t| (t.kind, t.text)).collect()
    }

    #[test]
    fn entry_with_trailing_period() {
        assert_eq!(
            kinds_and_text("       05  FIELD-A    PIC X(10)."),
            [
                (TokKind::Word, "05"),
                (TokKind::Word, "FIELD-A"),
                (TokKind::Word, "PIC"),
                (TokKind::Word, "X(10)"),
                (TokKind::Period, "."),
            ]
        );
    }

    #[test]
    fn decimal_point_inside_picture_is_kept() {
        let toks = kinds_and_text("       10  R  PIC  9(03).9(4)-.");
        assert_eq!(toks[3], (TokKind::Word, "9(03).9(4)-"));
        assert_eq!(toks[4], (TokKind::Period, "."));
    }

    #[test]
    fn comment_lines_are_skipped() {
        let input = "      ******************\n      /  page\n       01  R.";
        assert_eq!(
            kinds_and_text(input),
            [(TokKind::Word, "01"), (TokKind::Word, "R"), (TokKind::Period, ".")]
        );
    }

    #[test]
    fn sequence_area_is_ignored() {
        let toks = kinds_and_text("000100 01  R.");
        assert_eq!(toks[0], (TokKind::Word, "01"));
    }

    #[test]
    fn quoted_literal_is_one_token() {
        let toks = kinds_and_text("               88  FLAG  VALUE 'A B'.");
        assert_eq!(toks[3], (TokKind::Literal, "'A B'"));
        assert_eq!(toks[4], (TokKind::Period, "."));
    }

    #[test]
    fn spans_and_line_starts() {
        let input = "       01  R\n           PIC X.";
        let toks = tokenize(input);
        assert!(toks[0].first_on_line);
        assert!(!toks[1].first_on_line);
        assert!(toks[2].first_on_line);
        assert_eq!(&input[toks[2].start..toks[2].end], "PIC");
    }

    #[test]
    fn crlf_line_endings() {
        let toks = kinds_and_text("       01  R.\r\n       01  S.\r\n");
        assert_eq!(toks.len(), 6);
        assert_eq!(toks[4], (TokKind::Word, "S"));
    }
}
