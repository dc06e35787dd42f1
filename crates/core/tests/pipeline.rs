//! End-to-end tests: copybook text through normalise, parse, build, layout
//! and emission.

mod common;

use common::{SAMPLE, compile_book, field_id, member, placement, type_def};
use copybook_toolchain_core::{
    BuildError, CompileError, CompileOptions, RenderConfig, SemanticType, TypeMapping, codes,
    compile, layout_rows, render_rust,
};

#[test]
fn sample_forest_shape() {
    let compiled = compile_book(SAMPLE);
    let forest = &compiled.forest;

    let roots: Vec<&str> = forest.roots().iter().map(|&id| forest[id].name.as_str()).collect();
    assert_eq!(roots, ["RECORD-1", "RECORD-8"]);

    let record_1 = field_id(forest, "RECORD-1");
    let children: Vec<&str> = forest.children(record_1).map(|(_, f)| f.name.as_str()).collect();
    assert_eq!(
        children,
        ["RECORD-1-FILLER1", "RECORD-2", "RECORD-5", "RECORD-1-FILLER2"]
    );

    // Level-88 condition names never become fields.
    assert!(forest.find("RECORD-3").is_none());
    assert!(forest.find("RECORD-4").is_none());

    let record_6 = &forest[field_id(forest, "RECORD-6")];
    assert_eq!(record_6.occurs, Some(10));
    assert!(record_6.is_group());

    let record_7 = forest[field_id(forest, "RECORD-7")].picture.as_ref().unwrap();
    assert_eq!(record_7.raw, "S9(07)");
    assert_eq!(record_7.semantic_type, SemanticType::Signed);
    assert_eq!(record_7.width, 8);

    let filler = forest[field_id(forest, "RECORD-1-FILLER2")].picture.as_ref().unwrap();
    assert_eq!(filler.width, 190);

    let record_10 = &forest[field_id(forest, "RECORD-10")];
    assert_eq!(record_10.redefines.as_deref(), Some("RECORD-9"));
    assert_eq!(record_10.redefines_target(), forest.find("RECORD-9"));
}

#[test]
fn sample_layout() {
    let compiled = compile_book(SAMPLE);
    let (forest, layout) = (&compiled.forest, &compiled.layout);

    let record_1 = placement(forest, layout, "RECORD-1");
    assert_eq!(record_1.size, 31 + 1 + 80 + 190);

    let record_5 = placement(forest, layout, "RECORD-5");
    assert_eq!((record_5.local_start, record_5.local_end()), (33, 112));

    let record_6 = placement(forest, layout, "RECORD-6");
    assert_eq!((record_6.local_start, record_6.global_start), (1, 33));
    assert_eq!(record_6.size, 80);

    let record_7 = placement(forest, layout, "RECORD-7");
    assert_eq!((record_7.local_start, record_7.local_end()), (1, 8));
    assert_eq!((record_7.global_start, record_7.global_end()), (33, 40));

    let filler = placement(forest, layout, "RECORD-1-FILLER2");
    assert_eq!((filler.global_start, filler.global_end()), (113, 302));

    // The second record continues the local scan but starts again at
    // global position 1.
    let record_8 = placement(forest, layout, "RECORD-8");
    assert_eq!((record_8.local_start, record_8.local_end()), (303, 304));
    assert_eq!((record_8.global_start, record_8.size), (1, 2));
    let record_9 = placement(forest, layout, "RECORD-9");
    let record_10 = placement(forest, layout, "RECORD-10");
    assert_eq!(
        (record_10.local_start, record_10.global_start),
        (record_9.local_start, record_9.global_start)
    );
}

#[test]
fn sample_types_are_emitted_container_first_then_depth_first() {
    let compiled = compile_book(SAMPLE);
    let order: Vec<&str> = compiled.types.iter().map(|t| t.identifier.as_str()).collect();
    assert_eq!(
        order,
        ["Book", "Record1", "Record5", "Record6", "Record8"]
    );

    let book = type_def(&compiled.types, "Book");
    assert_eq!(book.members.len(), 2);
    assert_eq!(book.members[0].pic, "1,302,clause=X(302)");
    assert_eq!(book.members[1].pic, "303,304,clause=X(02)");
    assert_eq!(book.members[1].global_start, 1);

    let record_6 = member(&compiled.types, "Record5", "record_6");
    assert_eq!(record_6.ty.to_string(), "[Record6; 10]");
    assert_eq!(record_6.pic, "1,80,10,clause=X(08)");

    let record_7 = member(&compiled.types, "Record6", "record_7");
    assert_eq!(record_7.ty.to_string(), "i64");
    assert_eq!(record_7.pic, "1,8,clause=S9(07)");
    assert_eq!((record_7.global_start, record_7.global_end), (33, 40));

    let filler = member(&compiled.types, "Record1", "record_1_filler1");
    assert_eq!(filler.ty.to_string(), "String");

    let record_10 = member(&compiled.types, "Record8", "record_10");
    assert_eq!(record_10.redefines.as_deref(), Some("record_9"));
    assert_eq!(record_10.pic, "1,2,clause=X(02)");
}

#[test]
fn sample_renders_rust() {
    let compiled = compile_book(SAMPLE);
    let source = render_rust(&compiled.types, &RenderConfig::default());
    assert!(source.contains("pub struct Record6 {"));
    assert!(source.contains("    pub record_6: [Record6; 10],\n"));
    assert!(source.contains("    /// start:1 end:2 REDEFINES record_9\n"));
    assert!(source.contains("    #[copybook(pic = \"113,302,clause=X(190)\")]\n"));
}

#[test]
fn layout_report_matches_placements() {
    let compiled = compile_book(SAMPLE);
    let rows = layout_rows(&compiled.forest, &compiled.layout).unwrap();
    assert_eq!(rows.len(), compiled.forest.len());
    let record_7 = rows.iter().find(|r| r.name == "RECORD-7").unwrap();
    assert_eq!(record_7.depth, 3);
    assert_eq!(record_7.picture.as_deref(), Some("S9(07)"));
    assert_eq!(rows[0].name, "RECORD-1");
    assert_eq!(rows.last().unwrap().name, "RECORD-10");
}

#[test]
fn type_overrides_replace_only_their_key() {
    let src = "       01  R.\n           05  A  PIC 9(3).\n           05  B  PIC S9(3).";
    let mapping = TypeMapping::default().with_override(SemanticType::Unsigned, "u16");
    let compiled = compile(src, &CompileOptions::new("BOOK").with_mapping(mapping)).unwrap();
    assert_eq!(member(&compiled.types, "R", "a").ty.to_string(), "u16");
    assert_eq!(member(&compiled.types, "R", "b").ty.to_string(), "i64");

    // A later build with default options is unaffected.
    let plain = compile_book(src);
    assert_eq!(member(&plain.types, "R", "a").ty.to_string(), "u64");
}

#[test]
fn copybook_without_root_fails_to_normalise() {
    let src = "       05  RECORD-1.\n           10  FILLER   PIC X(31).\n";
    let err = compile(src, &CompileOptions::new("BOOK")).unwrap_err();
    assert!(matches!(err, CompileError::Normalise(_)));
}

#[test]
fn level_zero_is_a_syntax_error() {
    let src = "       01  OK.\n       00  RECORD-1.\n           10  FILLER   PIC X(31).\n";
    let err = compile(src, &CompileOptions::new("BOOK")).unwrap_err();
    let diags = err.diagnostics();
    assert!(matches!(err, CompileError::Syntax(_)), "{err:?}");
    assert_eq!(diags[0].id, codes::PARSER_INVALID_LEVEL);
}

#[test]
fn malformed_picture_is_reported_with_field() {
    let src = "       01  R.\n           05  A  PIC X(3.\n";
    let err = compile(src, &CompileOptions::new("BOOK")).unwrap_err();
    let CompileError::Build { error, span } = &err else {
        panic!("unexpected error: {err:?}");
    };
    assert!(matches!(error, BuildError::MalformedPicture { field, .. } if field == "A"));
    assert!(span.is_some());
    assert!(!error.is_internal());
}
