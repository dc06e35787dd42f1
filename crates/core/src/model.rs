//! Record/clause model: declarations, clauses, fields and the field arena.

use std::fmt;
use std::ops::Index;

use serde::{Deserialize, Serialize};

use crate::error::BuildError;
use crate::picture::Picture;
use copybook_toolchain_diagnostics::Span;

/// Reserved identifier for unnamed storage. May repeat within a scope.
pub const FILLER: &str = "FILLER";

/// Stable handle to a [`Field`] inside a [`Forest`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FieldId(usize);

impl FieldId {
    /// Position of the field in its forest's arena.
    pub fn index(self) -> usize {
        self.0
    }
}

/// The kinds of clause that carry layout meaning.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ClauseKind {
    /// `REDEFINES <identifier>`
    Redefines,
    /// `PIC <string>` / `PICTURE <string>`
    Picture,
    /// `OCCURS <n> [TIMES]`
    Occurs,
}

impl fmt::Display for ClauseKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ClauseKind::Redefines => "REDEFINES",
            ClauseKind::Picture => "PICTURE",
            ClauseKind::Occurs => "OCCURS",
        })
    }
}

/// A parsed clause attached to a declaration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "lowercase")]
pub enum Clause {
    /// Identifier of the sibling whose storage is aliased.
    Redefines(String),
    /// Raw picture string.
    Picture(String),
    /// Repetition count.
    Occurs(u32),
}

impl Clause {
    /// The kind of this clause.
    pub fn kind(&self) -> ClauseKind {
        match self {
            Clause::Redefines(_) => ClauseKind::Redefines,
            Clause::Picture(_) => ClauseKind::Picture,
            Clause::Occurs(_) => ClauseKind::Occurs,
        }
    }

    /// Build a clause from the keyword and value text a front end saw.
    ///
    /// `kind` is matched case-insensitively against `REDEFINES`, `PIC`,
    /// `PICTURE` and `OCCURS`.
    pub fn from_raw(kind: &str, value: &str) -> Result<Self, BuildError> {
        let malformed = |reason: &str| BuildError::MalformedClause {
            kind: kind.to_string(),
            value: value.to_string(),
            reason: reason.to_string(),
        };
        let value = value.trim();
        match kind.to_ascii_uppercase().as_str() {
            "REDEFINES" => {
                if value.is_empty() || value.contains(char::is_whitespace) {
                    Err(malformed("expected a single identifier"))
                } else {
                    Ok(Clause::Redefines(value.to_string()))
                }
            }
            "PIC" | "PICTURE" => {
                if value.is_empty() {
                    Err(malformed("expected a picture string"))
                } else {
                    Ok(Clause::Picture(value.to_string()))
                }
            }
            "OCCURS" => match value.parse::<u32>() {
                Ok(0) => Err(malformed("repetition count must be at least 1")),
                Ok(n) => Ok(Clause::Occurs(n)),
                Err(_) => Err(malformed("expected an unsigned integer")),
            },
            _ => Err(malformed("unrecognised clause")),
        }
    }
}

/// One `(level, identifier, clauses)` entry as produced by a front end.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Declaration {
    /// Level number as written.
    pub level: u32,
    /// Identifier as written (may be [`FILLER`]).
    pub name: String,
    /// Clauses in source order.
    pub clauses: Vec<Clause>,
    /// Source span of the whole entry, when known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub span: Option<Span>,
}

impl Declaration {
    /// Create a declaration without source position.
    pub fn new(level: u32, name: impl Into<String>, clauses: Vec<Clause>) -> Self {
        Self {
            level,
            name: name.into(),
            clauses,
            span: None,
        }
    }

    /// Attach a source span (builder pattern).
    pub fn with_span(mut self, span: Span) -> Self {
        self.span = Some(span);
        self
    }
}

/// A node of the record tree: a group (no picture) or a leaf (picture).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Field {
    /// Level number as declared.
    pub level: u32,
    /// Identifier; fillers are rewritten to a unique name when attached.
    pub name: String,
    /// Identifier named by the REDEFINES clause, as written.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub redefines: Option<String>,
    /// Interpreted picture; present iff the field is a leaf.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub picture: Option<Picture>,
    /// OCCURS count, if given.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub occurs: Option<u32>,
    /// Children in declaration order. Always empty for leaves.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<FieldId>,
    #[serde(skip)]
    pub(crate) redefines_target: Option<FieldId>,
}

impl Field {
    /// Construct a field from a level, identifier and clause list.
    ///
    /// Each clause kind may appear once. No cross-field checks happen here;
    /// REDEFINES resolution belongs to the tree builder.
    pub fn new(level: u32, name: impl Into<String>, clauses: Vec<Clause>) -> Result<Self, BuildError> {
        let mut field = Field {
            level,
            name: name.into(),
            redefines: None,
            picture: None,
            occurs: None,
            children: Vec::new(),
            redefines_target: None,
        };
        for clause in clauses {
            field.apply(clause)?;
        }
        Ok(field)
    }

    /// Construct a field from a front-end declaration.
    pub fn from_declaration(decl: Declaration) -> Result<Self, BuildError> {
        Self::new(decl.level, decl.name, decl.clauses)
    }

    fn apply(&mut self, clause: Clause) -> Result<(), BuildError> {
        let duplicate = |field: &Field, kind| BuildError::DuplicateClause {
            field: field.name.clone(),
            kind,
        };
        match clause {
            Clause::Redefines(target) => {
                if self.redefines.is_some() {
                    return Err(duplicate(self, ClauseKind::Redefines));
                }
                self.redefines = Some(target);
            }
            Clause::Picture(raw) => {
                if self.picture.is_some() {
                    return Err(duplicate(self, ClauseKind::Picture));
                }
                let picture = Picture::parse(raw).map_err(|source| BuildError::MalformedPicture {
                    field: self.name.clone(),
                    source,
                })?;
                self.picture = Some(picture);
            }
            Clause::Occurs(count) => {
                if self.occurs.is_some() {
                    return Err(duplicate(self, ClauseKind::Occurs));
                }
                if count == 0 {
                    return Err(BuildError::MalformedClause {
                        kind: ClauseKind::Occurs.to_string(),
                        value: count.to_string(),
                        reason: "repetition count must be at least 1".into(),
                    });
                }
                self.occurs = Some(count);
            }
        }
        Ok(())
    }

    /// Whether this field has a picture (and therefore no children).
    pub fn is_leaf(&self) -> bool {
        self.picture.is_some()
    }

    /// Whether this field is a group (no picture).
    pub fn is_group(&self) -> bool {
        self.picture.is_none()
    }

    /// Whether the identifier is the reserved filler marker.
    pub fn is_filler(&self) -> bool {
        self.name == FILLER
    }

    /// Repetition count, treating an absent OCCURS as 1.
    pub fn occurs_count(&self) -> usize {
        self.occurs.map_or(1, |n| n.max(1) as usize)
    }

    /// The sibling this field aliases, once resolved by the tree builder.
    pub fn redefines_target(&self) -> Option<FieldId> {
        self.redefines_target
    }
}

/// Arena of fields plus the ordered list of root records.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Forest {
    fields: Vec<Field>,
    roots: Vec<FieldId>,
}

impl Forest {
    /// Root records (`level == 1`) in declaration order.
    pub fn roots(&self) -> &[FieldId] {
        &self.roots
    }

    /// Whether the forest has no roots.
    pub fn is_empty(&self) -> bool {
        self.roots.is_empty()
    }

    /// Total number of fields across all records.
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Look up a field by handle.
    pub fn get(&self, id: FieldId) -> Option<&Field> {
        self.fields.get(id.0)
    }

    /// Children of `id` with their handles.
    pub fn children(&self, id: FieldId) -> impl Iterator<Item = (FieldId, &Field)> {
        self[id].children.iter().map(move |&child| (child, &self[child]))
    }

    /// Every field in pre-order: each root, then its descendants, parents
    /// before children and siblings in declaration order.
    pub fn preorder(&self) -> Vec<FieldId> {
        let mut out = Vec::with_capacity(self.fields.len());
        let mut stack: Vec<FieldId> = self.roots.iter().rev().copied().collect();
        while let Some(id) = stack.pop() {
            out.push(id);
            stack.extend(self[id].children.iter().rev().copied());
        }
        out
    }

    /// First field in pre-order with the given identifier.
    pub fn find(&self, name: &str) -> Option<FieldId> {
        self.preorder().into_iter().find(|&id| self[id].name == name)
    }

    pub(crate) fn push(&mut self, field: Field) -> FieldId {
        let id = FieldId(self.fields.len());
        self.fields.push(field);
        id
    }

    pub(crate) fn push_root(&mut self, id: FieldId) {
        self.roots.push(id);
    }

    pub(crate) fn rename(&mut self, id: FieldId, name: String) {
        self.fields[id.0].name = name;
    }

    pub(crate) fn attach(&mut self, parent: FieldId, child: FieldId) {
        self.fields[parent.0].children.push(child);
    }
}

impl Index<FieldId> for Forest {
    type Output = Field;

    fn index(&self, id: FieldId) -> &Field {
        &self.fields[id.0]
    }
}
