//! Copybook toolchain core library.
//!
//! Turns a COBOL copybook into typed structure definitions annotated with
//! byte-layout metadata. The pipeline runs leaves first:
//!
//! 1. [`picture`] classifies and measures PICTURE strings.
//! 2. [`model`] builds fields from declarations and their clauses.
//! 3. [`builder`] nests fields into a forest using level numbers.
//! 4. [`layout`] computes every field's size and 1-based positions.
//! 5. [`emit`] maps the laid-out forest onto [`TypeDef`]s.
//!
//! [`normalise`](normalise::normalise) and [`grammar`] form the text front
//! end; [`compile`] runs everything; [`render`] turns types into Rust.

#![warn(missing_docs)]

/// Tree builder.
pub mod builder;
/// End-to-end pipeline.
pub mod compile;
/// Type emitter.
pub mod emit;
/// Build errors.
pub mod error;
/// Copybook grammar: lexer and parser.
pub mod grammar;
/// Layout engine.
pub mod layout;
/// Fields, clauses and the field arena.
pub mod model;
/// Reference-format normaliser.
pub mod normalise;
/// PICTURE interpretation.
pub mod picture;
/// Rust and JSON renderers.
pub mod render;

// ── Convenience re-exports ──────────────────────────────────────────────────

// Pipeline
pub use compile::{CompileError, CompileOptions, Compiled, compile, compile_normalised};

// Parser
pub use grammar::parser::{ParseResult, parse_str};

// Model
pub use builder::{TreeBuilder, build_forest};
pub use error::BuildError;
pub use model::{Clause, ClauseKind, Declaration, FILLER, Field, FieldId, Forest};
pub use picture::{Picture, PictureError, SemanticType, classify, measure};

// Layout
pub use layout::{Layout, LayoutRow, Placement, compute_layout, layout_rows};

// Emission
pub use emit::{Member, MemberType, TypeDef, TypeMapping, emit_types};
pub use render::{RenderConfig, render_rust, to_pretty_json};

// Diagnostics (re-exported from the diagnostics crate)
pub use copybook_toolchain_diagnostics::{Diagnostic, LineIndex, Severity, Span, codes};
