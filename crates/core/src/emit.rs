//! Type emitter: maps a laid-out forest onto target type definitions.
//!
//! The output is a flat, ordered list of [`TypeDef`]s. The first one is the
//! container for the whole copybook with one member per record; every group
//! that has children then gets its own type, parent before children.

use std::collections::{HashMap, HashSet};
use std::fmt;

use serde::Serialize;
use tracing::debug;

use crate::error::BuildError;
use crate::layout::Layout;
use crate::model::{FieldId, Forest};
use crate::picture::{ParseSemanticTypeError, SemanticType};
use copybook_toolchain_profile::Profile;

// ── Type mapping ────────────────────────────────────────────────────────────

/// Semantic type → target type table.
///
/// Starts from the defaults below; each override replaces the default for
/// its own key and leaves the others alone.
///
/// | Semantic type | Default target |
/// |---|---|
/// | unsigned | `u64` |
/// | signed | `i64` |
/// | decimal | `rust_decimal::Decimal` |
/// | alphanumeric | `String` |
/// | unknown | `String` |
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeMapping {
    targets: HashMap<SemanticType, String>,
}

impl Default for TypeMapping {
    fn default() -> Self {
        let targets = HashMap::from([
            (SemanticType::Unsigned, "u64".to_string()),
            (SemanticType::Signed, "i64".to_string()),
            (SemanticType::Decimal, "rust_decimal::Decimal".to_string()),
            (SemanticType::Alphanumeric, "String".to_string()),
            (SemanticType::Unknown, "String".to_string()),
        ]);
        Self { targets }
    }
}

impl TypeMapping {
    /// Replace the target for one semantic type (builder pattern).
    pub fn with_override(mut self, ty: SemanticType, target: impl Into<String>) -> Self {
        self.targets.insert(ty, target.into());
        self
    }

    /// Default mapping plus the profile's `type_overrides`.
    pub fn from_profile(profile: &Profile) -> Result<Self, ParseSemanticTypeError> {
        let mut mapping = Self::default();
        for (key, target) in &profile.type_overrides {
            mapping = mapping.with_override(key.parse()?, target.clone());
        }
        Ok(mapping)
    }

    /// Target type for `ty`.
    pub fn target(&self, ty: SemanticType) -> &str {
        self.targets.get(&ty).map_or("String", String::as_str)
    }
}

// ── Output model ────────────────────────────────────────────────────────────

/// Target type of one member, array-wrapped when it repeats.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MemberType {
    /// Element type.
    pub base: String,
    /// Array length, present only when OCCURS is greater than one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub occurs: Option<u32>,
}

impl fmt::Display for MemberType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.occurs {
            Some(n) => write!(f, "[{}; {n}]", self.base),
            None => f.write_str(&self.base),
        }
    }
}

/// One member of a generated type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Member {
    /// Source identifier (after filler rewriting).
    pub name: String,
    /// Generated member name.
    pub identifier: String,
    /// Generated member type.
    #[serde(rename = "type")]
    pub ty: MemberType,
    /// Layout tag: `<local_start>,<local_end>[,<occurs>],clause=<text>`.
    pub pic: String,
    /// 1-based first position within the record.
    pub global_start: usize,
    /// 1-based last position within the record (inclusive).
    pub global_end: usize,
    /// Generated name of the member this one redefines.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub redefines: Option<String>,
}

/// One generated type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TypeDef {
    /// Source identifier of the group (or the copybook name).
    pub name: String,
    /// Generated type name.
    pub identifier: String,
    /// Members in declaration order.
    pub members: Vec<Member>,
}

// ── Emitter ─────────────────────────────────────────────────────────────────

/// Produce the type definitions for a laid-out forest.
///
/// Fails with [`BuildError::EmptyForest`] when there are no records, and
/// with [`BuildError::Internal`] if `layout` is missing a field.
pub fn emit_types(
    forest: &Forest,
    layout: &Layout,
    copybook_name: &str,
    mapping: &TypeMapping,
) -> Result<Vec<TypeDef>, BuildError> {
    if forest.is_empty() {
        return Err(BuildError::EmptyForest);
    }
    let mut naming = Naming {
        forest,
        taken: HashSet::new(),
        identifiers: HashMap::new(),
    };
    let container = naming.claim(copybook_name, "");
    naming.assign(forest.roots(), &container);

    let emitter = Emitter {
        forest,
        layout,
        mapping,
        identifiers: naming.identifiers,
    };
    let mut out = Vec::new();
    emitter.emit_scope(copybook_name, container, forest.roots(), &mut out)?;
    Ok(out)
}

/// Hands out type identifiers in emission order, so that every generated
/// type has a distinct name.
struct Naming<'a> {
    forest: &'a Forest,
    taken: HashSet<String>,
    identifiers: HashMap<FieldId, String>,
}

impl Naming<'_> {
    /// `ADDR` → `Addr`; if taken, `<qualifier>Addr`; then a numeric suffix.
    fn claim(&mut self, name: &str, qualifier: &str) -> String {
        let plain = type_name(name);
        let mut candidate = plain.clone();
        if self.taken.contains(&candidate) {
            candidate = format!("{qualifier}{plain}");
        }
        let base = candidate.clone();
        let mut n = 2;
        while self.taken.contains(&candidate) {
            candidate = format!("{base}{n}");
            n += 1;
        }
        self.taken.insert(candidate.clone());
        candidate
    }

    fn assign(&mut self, ids: &[FieldId], parent: &str) {
        let forest = self.forest;
        for &id in ids {
            let field = &forest[id];
            if field.children.is_empty() {
                continue;
            }
            let identifier = self.claim(&field.name, parent);
            self.assign(&field.children, &identifier);
            self.identifiers.insert(id, identifier);
        }
    }
}

struct Emitter<'a> {
    forest: &'a Forest,
    layout: &'a Layout,
    mapping: &'a TypeMapping,
    identifiers: HashMap<FieldId, String>,
}

impl Emitter<'_> {
    fn emit_scope(
        &self,
        name: &str,
        identifier: String,
        ids: &[FieldId],
        out: &mut Vec<TypeDef>,
    ) -> Result<(), BuildError> {
        let members = ids
            .iter()
            .map(|&id| self.member(id))
            .collect::<Result<Vec<_>, _>>()?;
        debug!(name, %identifier, members = members.len(), "emit type");
        out.push(TypeDef {
            name: name.to_string(),
            identifier,
            members,
        });
        for &id in ids {
            let field = &self.forest[id];
            if !field.children.is_empty() {
                self.emit_scope(&field.name, self.group_type(id)?, &field.children, out)?;
            }
        }
        Ok(())
    }

    fn group_type(&self, id: FieldId) -> Result<String, BuildError> {
        self.identifiers.get(&id).cloned().ok_or_else(|| {
            BuildError::internal(format!(
                "no type identifier assigned to group {}",
                self.forest[id].name
            ))
        })
    }

    fn member(&self, id: FieldId) -> Result<Member, BuildError> {
        let field = &self.forest[id];
        let placement = self.layout.placement(id)?;

        let base = match &field.picture {
            Some(picture) => self.mapping.target(picture.semantic_type).to_string(),
            None if field.children.is_empty() => self.mapping.target(SemanticType::Unknown).to_string(),
            None => self.group_type(id)?,
        };
        let occurs = field.occurs.filter(|&n| n > 1);

        let mut pic = format!("{},{}", placement.local_start, placement.local_end());
        if let Some(n) = occurs {
            pic.push_str(&format!(",{n}"));
        }
        match &field.picture {
            Some(picture) => pic.push_str(&format!(",clause={}", picture.raw)),
            None if field.children.is_empty() => pic.push_str(",clause="),
            None => {
                let single = placement.size / field.occurs_count();
                pic.push_str(&format!(",clause=X({single:02})"));
            }
        }

        Ok(Member {
            name: field.name.clone(),
            identifier: field_name(&field.name),
            ty: MemberType { base, occurs },
            pic,
            global_start: placement.global_start,
            global_end: placement.global_end(),
            redefines: field
                .redefines_target()
                .map(|target| field_name(&self.forest[target].name)),
        })
    }
}

// ── Naming ──────────────────────────────────────────────────────────────────

const KEYWORDS: &[&str] = &[
    "abstract", "as", "async", "await", "become", "box", "break", "const", "continue", "do", "dyn",
    "else", "enum", "extern", "false", "final", "fn", "for", "gen", "if", "impl", "in", "let",
    "loop", "macro", "match", "mod", "move", "mut", "override", "priv", "pub", "ref", "return",
    "static", "struct", "trait", "true", "try", "type", "typeof", "unsafe", "unsized", "use",
    "virtual", "where", "while", "yield",
];

/// Keywords that cannot be raw identifiers.
const RESERVED: &[&str] = &["self", "Self", "crate", "super", "_"];

fn words(ident: &str) -> impl Iterator<Item = &str> {
    ident
        .split(|c: char| c == '-' || c == '_' || c.is_whitespace())
        .filter(|w| !w.is_empty())
}

fn escape(mut name: String) -> String {
    if name.is_empty() {
        return "_".to_string();
    }
    if name.starts_with(|c: char| c.is_ascii_digit()) {
        name.insert(0, '_');
    }
    if RESERVED.contains(&name.as_str()) {
        name.push('_');
        name
    } else if KEYWORDS.contains(&name.as_str()) {
        format!("r#{name}")
    } else {
        name
    }
}

/// Generated type name: `CUSTOMER-RECORD` → `CustomerRecord`.
pub fn type_name(ident: &str) -> String {
    let mut out = String::with_capacity(ident.len());
    for word in words(ident) {
        let mut chars = word.chars();
        if let Some(first) = chars.next() {
            out.push(first.to_ascii_uppercase());
            out.extend(chars.map(|c| c.to_ascii_lowercase()));
        }
    }
    escape(out)
}

/// Generated member name: `CUST-ID` → `cust_id`.
pub fn field_name(ident: &str) -> String {
    let joined = words(ident)
        .map(str::to_ascii_lowercase)
        .collect::<Vec<_>>()
        .join("_");
    escape(joined)
}
