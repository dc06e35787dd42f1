/// Copybook lexer: tokenizes reference-format text into borrowed tokens.
pub mod lexer;
/// Copybook parser: converts tokens into declarations.
pub mod parser;
