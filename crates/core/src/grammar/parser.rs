use super::lexer::{TokKind, Token, tokenize};
use crate::model::{Clause, Declaration, FILLER};
use copybook_toolchain_diagnostics::{Diagnostic, Span, codes};

/// Shorthand for building a `BTreeMap<String, String>` context from key-value pairs.
macro_rules! ctx {
    ($($k:expr => $v:expr),+ $(,)?) => {
        std::collections::BTreeMap::from([$(($k.into(), $v.into())),+])
    };
}

/// Result of parsing copybook text.
#[derive(Debug, serde::Serialize)]
pub struct ParseResult {
    /// Data description entries in source order.
    pub declarations: Vec<Declaration>,
    /// Diagnostics produced during parsing.
    pub diagnostics: Vec<Diagnostic>,
}

impl ParseResult {
    /// Whether any diagnostic is an error.
    pub fn has_errors(&self) -> bool {
        self.diagnostics.iter().any(Diagnostic::is_error)
    }
}

// ─── Keyword tables ─────────────────────────────────────────────────────────

/// Stand-alone USAGE words with no operand.
const USAGE_WORDS: &[&str] = &[
    "BINARY",
    "COMP",
    "COMP-1",
    "COMP-2",
    "COMP-3",
    "COMP-4",
    "COMP-5",
    "COMPUTATIONAL",
    "COMPUTATIONAL-1",
    "COMPUTATIONAL-2",
    "COMPUTATIONAL-3",
    "COMPUTATIONAL-4",
    "COMPUTATIONAL-5",
    "DISPLAY",
    "INDEX",
    "PACKED-DECIMAL",
    "POINTER",
    "GLOBAL",
    "EXTERNAL",
];

/// Words that start a clause. Name lists stop at any of these.
const CLAUSE_WORDS: &[&str] = &[
    "PIC",
    "PICTURE",
    "REDEFINES",
    "OCCURS",
    "USAGE",
    "VALUE",
    "VALUES",
    "SIGN",
    "LEADING",
    "TRAILING",
    "JUST",
    "JUSTIFIED",
    "SYNC",
    "SYNCHRONIZED",
    "BLANK",
    "INDEXED",
    "ASCENDING",
    "DESCENDING",
    "DEPENDING",
];

fn is_clause_start(tok: &Token<'_>) -> bool {
    tok.kind == TokKind::Word
        && CLAUSE_WORDS
            .iter()
            .chain(USAGE_WORDS)
            .any(|w| tok.text.eq_ignore_ascii_case(w))
}

/// Parse a level-number word. `None` if the word is not one or two digits.
fn level_number(tok: &Token<'_>) -> Option<u32> {
    if tok.kind != TokKind::Word || tok.text.len() > 2 || !tok.text.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    tok.text.parse().ok()
}

// ─── Public API ─────────────────────────────────────────────────────────────

/// Parse reference-format copybook text into declarations.
///
/// Lines that do not open with a level number are ignored. Level-66 and
/// level-88 entries are skipped whole, as are clauses with no layout
/// meaning (USAGE, VALUE, SIGN, JUSTIFIED, SYNCHRONIZED, BLANK WHEN ZERO,
/// INDEXED BY, key and DEPENDING ON phrases).
pub fn parse_str(input: &str) -> ParseResult {
    Parser::new(input).parse()
}

// ─── Parser Implementation ─────────────────────────────────────────────────

struct Parser<'a> {
    toks: Vec<Token<'a>>,
    pos: usize,
    diags: Vec<Diagnostic>,
    decls: Vec<Declaration>,
}

/// Outcome of parsing a single entry's clause list.
enum EntryEnd {
    /// The terminating period was consumed.
    Period,
    /// A new entry (or end of input) began before a period was seen.
    Unterminated,
}

impl<'a> Parser<'a> {
    fn new(input: &'a str) -> Self {
        Self {
            toks: tokenize(input),
            pos: 0,
            diags: Vec::new(),
            decls: Vec::new(),
        }
    }

    // ── Token navigation ────────────────────────────────────────────────

    fn peek(&self) -> Option<&Token<'a>> {
        self.toks.get(self.pos)
    }

    fn next(&mut self) -> Option<Token<'a>> {
        let tok = self.toks.get(self.pos).copied();
        if tok.is_some() {
            self.pos += 1;
        }
        tok
    }

    fn eat_keyword(&mut self, keyword: &str) -> bool {
        if self.peek().is_some_and(|t| t.is_keyword(keyword)) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn at_period(&self) -> bool {
        self.peek().is_some_and(|t| t.kind == TokKind::Period)
    }

    /// Whether the next token starts a new entry rather than continuing
    /// the current one.
    fn at_entry_start(&self) -> bool {
        self.peek()
            .is_some_and(|t| t.first_on_line && level_number(t).is_some())
    }

    /// Skip to just past the next period.
    fn skip_entry(&mut self) {
        while let Some(tok) = self.next() {
            if tok.kind == TokKind::Period {
                break;
            }
        }
    }

    // ── Main parse loop ─────────────────────────────────────────────────

    fn parse(mut self) -> ParseResult {
        while let Some(tok) = self.peek().copied() {
            if tok.first_on_line && level_number(&tok).is_some() {
                self.parse_entry();
            } else {
                // Not a data description entry; ignore the rest of the line.
                self.pos += 1;
                while self.peek().is_some_and(|t| !t.first_on_line) {
                    self.pos += 1;
                }
            }
        }
        ParseResult {
            declarations: self.decls,
            diagnostics: self.diags,
        }
    }

    // ── Entries ─────────────────────────────────────────────────────────

    fn parse_entry(&mut self) {
        let Some(level_tok) = self.next() else {
            return;
        };
        let level = level_number(&level_tok).unwrap_or_default();
        let entry_start = level_tok.start;

        match level {
            66 | 88 => {
                self.skip_entry();
                return;
            }
            1..=49 => {}
            _ => {
                self.diags.push(
                    Diagnostic::for_code(
                        codes::PARSER_INVALID_LEVEL,
                        format!("level number {} is not a data description level", level_tok.text),
                        Some(Span::new(level_tok.start, level_tok.end)),
                    )
                    .with_context(ctx!("level" => level_tok.text)),
                );
                self.skip_entry();
                return;
            }
        }

        // The data name is optional; without one the entry is a filler.
        let name = match self.peek().copied() {
            Some(tok)
                if tok.kind == TokKind::Word
                    && !is_clause_start(&tok)
                    && !self.at_entry_start() =>
            {
                self.pos += 1;
                tok.text.to_string()
            }
            _ => FILLER.to_string(),
        };

        let mut clauses = Vec::new();
        let end = self.parse_clauses(&mut clauses);
        let entry_end = self.toks[..self.pos]
            .last()
            .map_or(level_tok.end, |t| t.end);

        if let EntryEnd::Unterminated = end {
            self.diags.push(
                Diagnostic::for_code(
                    codes::PARSER_MISSING_PERIOD,
                    format!("entry {name} is not terminated by a period"),
                    Some(Span::empty(entry_end)),
                )
                .with_context(ctx!("field" => name.clone(), "expected" => ".")),
            );
        }

        tracing::trace!(level, name = %name, clauses = clauses.len(), "parsed entry");
        self.decls.push(
            Declaration::new(level, name, clauses).with_span(Span::new(entry_start, entry_end)),
        );
    }

    fn parse_clauses(&mut self, clauses: &mut Vec<Clause>) -> EntryEnd {
        loop {
            if self.at_period() {
                self.pos += 1;
                return EntryEnd::Period;
            }
            if self.at_entry_start() {
                return EntryEnd::Unterminated;
            }
            let Some(tok) = self.next() else {
                return EntryEnd::Unterminated;
            };
            let word = tok.text.to_ascii_uppercase();
            match word.as_str() {
                "PIC" | "PICTURE" => {
                    self.eat_keyword("IS");
                    self.clause_operand(&tok, "PIC", clauses);
                }
                "REDEFINES" => self.clause_operand(&tok, "REDEFINES", clauses),
                "OCCURS" => self.parse_occurs(&tok, clauses),
                "USAGE" => {
                    self.eat_keyword("IS");
                    self.next_operand();
                }
                "VALUE" | "VALUES" => {
                    let _ = self.eat_keyword("IS") || self.eat_keyword("ARE");
                    self.eat_keyword("ALL");
                    self.next_operand();
                }
                "SIGN" => {
                    self.eat_keyword("IS");
                    let _ = self.eat_keyword("LEADING") || self.eat_keyword("TRAILING");
                    self.skip_separate();
                }
                "LEADING" | "TRAILING" => self.skip_separate(),
                "JUST" | "JUSTIFIED" => {
                    self.eat_keyword("RIGHT");
                }
                "SYNC" | "SYNCHRONIZED" => {
                    let _ = self.eat_keyword("LEFT") || self.eat_keyword("RIGHT");
                }
                "BLANK" => {
                    self.eat_keyword("WHEN");
                    let _ = self.eat_keyword("ZERO") || self.eat_keyword("ZEROS") || self.eat_keyword("ZEROES");
                }
                "INDEXED" => {
                    self.eat_keyword("BY");
                    self.skip_names();
                }
                "ASCENDING" | "DESCENDING" => {
                    self.eat_keyword("KEY");
                    self.eat_keyword("IS");
                    self.skip_names();
                }
                "DEPENDING" => {
                    self.eat_keyword("ON");
                    self.next_operand();
                }
                w if USAGE_WORDS.contains(&w) => {}
                _ => {
                    self.diags.push(
                        Diagnostic::for_code(
                            codes::PARSER_UNEXPECTED_TOKEN,
                            format!("unexpected {:?} in data description entry", tok.text),
                            Some(Span::new(tok.start, tok.end)),
                        )
                        .with_context(ctx!("found" => tok.text)),
                    );
                }
            }
        }
    }

    // ── Clause helpers ──────────────────────────────────────────────────

    /// Take the next word or literal, if the entry continues.
    fn next_operand(&mut self) -> Option<Token<'a>> {
        let continues = self.peek().is_some_and(|t| t.kind != TokKind::Period);
        if continues && !self.at_entry_start() {
            self.next()
        } else {
            None
        }
    }

    fn clause_operand(&mut self, keyword: &Token<'a>, kind: &str, clauses: &mut Vec<Clause>) {
        let Some(operand) = self.next_operand() else {
            self.diags.push(
                Diagnostic::for_code(
                    codes::PARSER_UNEXPECTED_TOKEN,
                    format!("{kind} clause has no operand"),
                    Some(Span::new(keyword.start, keyword.end)),
                )
                .with_context(ctx!("kind" => kind)),
            );
            return;
        };
        self.push_clause(kind, operand.text, Span::new(keyword.start, operand.end), clauses);
    }

    /// Take an OCCURS count. A count wrapped to the start of the next line
    /// looks like a level number; it is read as the count when `TIMES`,
    /// `TO` or a period follows it.
    fn next_count(&mut self) -> Option<Token<'a>> {
        let wrapped = self.at_entry_start()
            && self.toks.get(self.pos + 1).is_some_and(|t| {
                t.kind == TokKind::Period || t.is_keyword("TIMES") || t.is_keyword("TO")
            });
        if wrapped { self.next() } else { self.next_operand() }
    }

    fn parse_occurs(&mut self, keyword: &Token<'a>, clauses: &mut Vec<Clause>) {
        let Some(mut count) = self.next_count() else {
            self.clause_operand(keyword, "OCCURS", clauses);
            return;
        };
        let mut end = count.end;
        // `OCCURS n TO m`: the layout reserves the maximum.
        if self.eat_keyword("TO")
            && let Some(max) = self.next_count()
        {
            end = max.end;
            count = max;
        }
        if let Some(times) = self.peek().copied().filter(|t| t.is_keyword("TIMES")) {
            end = times.end;
            self.pos += 1;
        }
        self.push_clause("OCCURS", count.text, Span::new(keyword.start, end), clauses);
    }

    fn push_clause(&mut self, kind: &str, value: &str, span: Span, clauses: &mut Vec<Clause>) {
        match Clause::from_raw(kind, value) {
            Ok(clause) => clauses.push(clause),
            Err(err) => self.diags.push(err.to_diagnostic(Some(span))),
        }
    }

    fn skip_separate(&mut self) {
        if self.eat_keyword("SEPARATE") {
            self.eat_keyword("CHARACTER");
        }
    }

    /// Skip a list of data names, up to the next clause word or period.
    fn skip_names(&mut self) {
        while let Some(tok) = self.peek().copied() {
            if tok.kind == TokKind::Period || is_clause_start(&tok) || self.at_entry_start() {
                break;
            }
            self.pos += 1;
        }
    }
}
