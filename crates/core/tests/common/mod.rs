//! Shared test helpers for `copybook_toolchain_core` integration tests.

#![allow(unreachable_pub, dead_code)]

use copybook_toolchain_core::{
    BuildError, Clause, CompileOptions, Compiled, Declaration, FieldId, Forest, Layout, Member,
    Placement, TypeDef, build_forest, compile, compute_layout,
};

/// Two records in reference format: fillers, an 88-level, an OCCURS group
/// with INDEXED BY, a COMP-3 leaf and a REDEFINES.
pub const SAMPLE: &str = "      ******************************************************************
      *
       01  RECORD-1.
           03  FILLER              PIC X(31).
           03  RECORD-2
                                   PIC X(01).
               88  RECORD-3                        VALUE 'S'.
               88  RECORD-4                         VALUE 'P'.
           03  RECORD-5.
               05  RECORD-6                        OCCURS 10 TIMES
                                                   INDEXED BY
                                                   X-:XXXX:-DBT.
                   07  RECORD-7
                                   PIC S9(07)      COMP-3.
           03  FILLER              PIC X(190).
       01  RECORD-8.
           05  RECORD-9                           PIC  X(02).
           05  RECORD-10       REDEFINES
               RECORD-9        PIC  X(02).
";

// ─── Declaration helpers ─────────────────────────────────────────────────────

/// A group declaration (no clauses).
pub fn group(level: u32, name: &str) -> Declaration {
    Declaration::new(level, name, Vec::new())
}

/// A leaf declaration with a picture.
pub fn leaf(level: u32, name: &str, picture: &str) -> Declaration {
    Declaration::new(level, name, vec![Clause::Picture(picture.into())])
}

/// A leaf declaration that redefines `target`.
pub fn redefining(level: u32, name: &str, target: &str, picture: &str) -> Declaration {
    Declaration::new(
        level,
        name,
        vec![
            Clause::Redefines(target.into()),
            Clause::Picture(picture.into()),
        ],
    )
}

/// Build and lay out a declaration stream, panicking on failure.
pub fn laid_out(decls: Vec<Declaration>) -> (Forest, Layout) {
    let forest = build_forest("BOOK", decls).unwrap_or_else(|e| panic!("build failed: {e}"));
    let layout = compute_layout(&forest).unwrap_or_else(|e| panic!("layout failed: {e}"));
    (forest, layout)
}

/// Build a declaration stream, expecting failure.
pub fn build_err(decls: Vec<Declaration>) -> BuildError {
    build_forest("BOOK", decls).expect_err("build should fail")
}

// ─── Lookup helpers ──────────────────────────────────────────────────────────

/// Find a field by identifier, panicking with the known names when missing.
pub fn field_id(forest: &Forest, name: &str) -> FieldId {
    forest.find(name).unwrap_or_else(|| {
        let names: Vec<&str> = forest.preorder().into_iter().map(|id| forest[id].name.as_str()).collect();
        panic!("no field {name:?}; have {names:?}")
    })
}

/// Placement of the named field.
pub fn placement(forest: &Forest, layout: &Layout, name: &str) -> Placement {
    *layout
        .get(field_id(forest, name))
        .unwrap_or_else(|| panic!("no placement for {name}"))
}

/// Compile source text under the name `BOOK`.
pub fn compile_book(source: &str) -> Compiled {
    compile(source, &CompileOptions::new("BOOK")).unwrap_or_else(|e| panic!("compile failed: {e:?}"))
}

/// The generated type with this identifier.
pub fn type_def<'a>(types: &'a [TypeDef], identifier: &str) -> &'a TypeDef {
    types
        .iter()
        .find(|t| t.identifier == identifier)
        .unwrap_or_else(|| panic!("no type {identifier}"))
}

/// The member with this identifier in the given type.
pub fn member<'a>(types: &'a [TypeDef], ty: &str, identifier: &str) -> &'a Member {
    type_def(types, ty)
        .members
        .iter()
        .find(|m| m.identifier == identifier)
        .unwrap_or_else(|| panic!("no member {identifier} in {ty}"))
}
