//! Errors raised while building and laying out a record forest.

use std::collections::BTreeMap;

use thiserror::Error;

use crate::model::ClauseKind;
use crate::picture::PictureError;
use copybook_toolchain_diagnostics::{Diagnostic, Span, codes};

/// A fatal error from the record model, tree builder, layout engine or
/// type emitter.
///
/// Every variant except [`BuildError::Internal`] is attributable to the
/// copybook being processed. `Internal` means the toolchain itself produced
/// an inconsistent tree; see [`BuildError::is_internal`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[non_exhaustive]
pub enum BuildError {
    /// A PICTURE clause could not be measured.
    #[error("field {field}: {source}")]
    MalformedPicture {
        /// Identifier of the field carrying the clause.
        field: String,
        /// The underlying measurement failure.
        #[source]
        source: PictureError,
    },

    /// The same clause kind was given twice on one field.
    #[error("field {field}: duplicate {kind} clause")]
    DuplicateClause {
        /// Identifier of the offending field.
        field: String,
        /// The repeated clause kind.
        kind: ClauseKind,
    },

    /// A clause kind is unrecognised or its value cannot be interpreted.
    #[error("malformed {kind} clause {value:?}: {reason}")]
    MalformedClause {
        /// Clause keyword as given by the front end.
        kind: String,
        /// Clause value as given by the front end.
        value: String,
        /// Why the clause was rejected.
        reason: String,
    },

    /// A level number below 1.
    #[error("field {field}: level {level} is below 01")]
    InvalidLevel {
        /// Identifier of the offending field.
        field: String,
        /// The level as declared.
        level: u32,
    },

    /// A non-root field was declared with no open group above it.
    #[error("field {field} (level {level:02}) has no enclosing group")]
    OrphanField {
        /// Identifier of the offending field.
        field: String,
        /// The level as declared.
        level: u32,
    },

    /// REDEFINES names something other than an earlier same-level sibling.
    #[error("field {field} redefines {target}, which is not an earlier sibling at the same level")]
    UnknownRedefinesTarget {
        /// Identifier of the redefining field.
        field: String,
        /// The identifier named by the REDEFINES clause.
        target: String,
    },

    /// A size or position does not fit in `usize`.
    #[error("field {field}: size or position overflows")]
    SizeOverflow {
        /// Identifier of the field whose size or end position overflowed.
        field: String,
    },

    /// There were no records to emit.
    #[error("copybook declares no level 01 records")]
    EmptyForest,

    /// A size or position the layout engine recorded earlier is missing.
    ///
    /// This is a defect in the toolchain, not in the input.
    #[error("internal consistency violation: {0}")]
    Internal(String),
}

impl BuildError {
    /// Whether this error indicates a toolchain defect rather than bad input.
    pub fn is_internal(&self) -> bool {
        matches!(self, BuildError::Internal(_))
    }

    /// Diagnostic code for this error.
    pub fn code(&self) -> &'static str {
        match self {
            BuildError::MalformedPicture { .. } => codes::MALFORMED_PICTURE,
            BuildError::DuplicateClause { .. } => codes::DUPLICATE_CLAUSE,
            BuildError::MalformedClause { .. } => codes::MALFORMED_CLAUSE,
            BuildError::InvalidLevel { .. } => codes::INVALID_LEVEL,
            BuildError::OrphanField { .. } => codes::ORPHAN_FIELD,
            BuildError::UnknownRedefinesTarget { .. } => codes::UNKNOWN_REDEFINES_TARGET,
            BuildError::SizeOverflow { .. } => codes::FIELD_SIZE_OVERFLOW,
            BuildError::EmptyForest => codes::EMPTY_FOREST,
            BuildError::Internal(_) => codes::INTERNAL,
        }
    }

    /// Convert into a [`Diagnostic`], optionally anchored at `span`.
    pub fn to_diagnostic(&self, span: Option<Span>) -> Diagnostic {
        let diag = Diagnostic::for_code(self.code(), self.to_string(), span);
        let ctx: BTreeMap<String, String> = match self {
            BuildError::MalformedPicture { field, source } => BTreeMap::from([
                ("field".into(), field.clone()),
                ("picture".into(), source.picture.clone()),
                ("fragment".into(), source.fragment.clone()),
            ]),
            BuildError::DuplicateClause { field, kind } => BTreeMap::from([
                ("field".into(), field.clone()),
                ("kind".into(), kind.to_string()),
            ]),
            BuildError::MalformedClause { kind, value, .. } => BTreeMap::from([
                ("kind".into(), kind.clone()),
                ("value".into(), value.clone()),
            ]),
            BuildError::InvalidLevel { field, level } | BuildError::OrphanField { field, level } => {
                BTreeMap::from([
                    ("field".into(), field.clone()),
                    ("level".into(), level.to_string()),
                ])
            }
            BuildError::UnknownRedefinesTarget { field, target } => BTreeMap::from([
                ("field".into(), field.clone()),
                ("target".into(), target.clone()),
            ]),
            BuildError::SizeOverflow { field } => BTreeMap::from([("field".into(), field.clone())]),
            BuildError::EmptyForest | BuildError::Internal(_) => BTreeMap::new(),
        };
        if ctx.is_empty() {
            diag
        } else {
            diag.with_context(ctx)
        }
    }

    pub(crate) fn internal(message: impl Into<String>) -> Self {
        BuildError::Internal(message.into())
    }
}
