//! End-to-end pipeline: normalise, parse, build, lay out, emit.

use thiserror::Error;
use tracing::debug;

use crate::builder::TreeBuilder;
use crate::emit::{TypeDef, TypeMapping, emit_types};
use crate::error::BuildError;
use crate::grammar::parser::parse_str;
use crate::layout::{Layout, compute_layout};
use crate::model::Forest;
use crate::normalise::{NormaliseError, normalise};
use copybook_toolchain_diagnostics::{Diagnostic, Span};

/// Inputs to [`compile`] besides the source text.
#[derive(Debug, Clone)]
pub struct CompileOptions {
    /// Copybook name: names the container type and prefixes root fillers.
    pub name: String,
    /// Semantic type → target type table.
    pub mapping: TypeMapping,
}

impl CompileOptions {
    /// Options with the default type mapping.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            mapping: TypeMapping::default(),
        }
    }

    /// Replace the type mapping (builder pattern).
    pub fn with_mapping(mut self, mapping: TypeMapping) -> Self {
        self.mapping = mapping;
        self
    }
}

/// Everything the pipeline produced.
#[derive(Debug, Clone)]
pub struct Compiled {
    /// The record forest.
    pub forest: Forest,
    /// Placements for every field in `forest`.
    pub layout: Layout,
    /// Emitted type definitions, container first.
    pub types: Vec<TypeDef>,
}

/// Why a compile stopped.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CompileError {
    /// The reference-format columns could not be located.
    #[error(transparent)]
    Normalise(#[from] NormaliseError),
    /// The parser reported errors.
    #[error("copybook has {} syntax error(s)", count_errors(.0))]
    Syntax(Vec<Diagnostic>),
    /// The tree builder, layout engine or emitter failed.
    #[error("{error}")]
    Build {
        /// The underlying failure.
        #[source]
        error: BuildError,
        /// Span of the offending declaration in the normalised text, if known.
        span: Option<Span>,
    },
}

fn count_errors(diags: &[Diagnostic]) -> usize {
    diags.iter().filter(|d| d.is_error()).count()
}

impl CompileError {
    /// Diagnostics describing this failure.
    pub fn diagnostics(&self) -> Vec<Diagnostic> {
        match self {
            CompileError::Normalise(err) => vec![err.to_diagnostic()],
            CompileError::Syntax(diags) => diags.clone(),
            CompileError::Build { error, span } => vec![error.to_diagnostic(*span)],
        }
    }
}

impl From<BuildError> for CompileError {
    fn from(error: BuildError) -> Self {
        CompileError::Build { error, span: None }
    }
}

/// Run the whole pipeline on raw copybook text.
///
/// Diagnostic spans refer to the normalised text; callers that render them
/// against the source should call [`normalise`] themselves and use
/// [`compile_normalised`].
pub fn compile(source: &str, options: &CompileOptions) -> Result<Compiled, CompileError> {
    let normalised = normalise(source)?;
    compile_normalised(&normalised, options)
}

/// Run the pipeline on text that is already in reference format.
pub fn compile_normalised(text: &str, options: &CompileOptions) -> Result<Compiled, CompileError> {
    let parsed = parse_str(text);
    if parsed.has_errors() {
        return Err(CompileError::Syntax(parsed.diagnostics));
    }
    debug!(
        name = %options.name,
        declarations = parsed.declarations.len(),
        "building record forest"
    );

    let mut builder = TreeBuilder::new(options.name.as_str());
    for decl in parsed.declarations {
        let span = decl.span;
        builder
            .add(decl)
            .map_err(|error| CompileError::Build { error, span })?;
    }
    let forest = builder.finish();
    let layout = compute_layout(&forest)?;
    let types = emit_types(&forest, &layout, &options.name, &options.mapping)?;

    Ok(Compiled {
        forest,
        layout,
        types,
    })
}
