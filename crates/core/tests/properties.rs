//! Structural properties of built and laid-out forests.

mod common;

use common::{build_err, group, laid_out, leaf, placement, redefining};
use copybook_toolchain_core::{
    BuildError, Clause, Declaration, SemanticType, TypeMapping, emit_types,
};

#[test]
fn roots_match_level_one_declarations_in_order() {
    let decls = vec![
        group(1, "A"),
        leaf(5, "A1", "X"),
        leaf(1, "B", "9(2)"),
        group(1, "C"),
        group(5, "C1"),
        leaf(10, "C2", "X"),
    ];
    let (forest, _) = laid_out(decls);
    let roots: Vec<&str> = forest.roots().iter().map(|&id| forest[id].name.as_str()).collect();
    assert_eq!(roots, ["A", "B", "C"]);
}

#[test]
fn leaves_have_pictures_and_groups_have_children() {
    let decls = vec![
        group(1, "R"),
        group(5, "G"),
        leaf(10, "L1", "X(2)"),
        leaf(10, "L2", "9"),
        leaf(5, "L3", "S9(3)"),
    ];
    let (forest, _) = laid_out(decls);
    for id in forest.preorder() {
        let field = &forest[id];
        assert_ne!(
            field.children.is_empty(),
            field.picture.is_none(),
            "{} breaks the leaf/group partition",
            field.name
        );
    }
}

#[test]
fn end_to_end_declarations() {
    let (forest, layout) = laid_out(vec![group(1, "R"), leaf(5, "A", "X(10)"), leaf(5, "B", "9(5)")]);

    let a = placement(&forest, &layout, "A");
    assert_eq!((a.local_start, a.local_end()), (1, 10));
    assert_eq!((a.global_start, a.global_end()), (1, 10));
    let b = placement(&forest, &layout, "B");
    assert_eq!((b.local_start, b.local_end()), (11, 15));
    assert_eq!((b.global_start, b.global_end()), (11, 15));
    assert_eq!(placement(&forest, &layout, "R").size, 15);

    let a_pic = forest[forest.find("A").unwrap()].picture.as_ref().unwrap();
    assert_eq!(a_pic.semantic_type, SemanticType::Alphanumeric);
    let b_pic = forest[forest.find("B").unwrap()].picture.as_ref().unwrap();
    assert_eq!(b_pic.semantic_type, SemanticType::Unsigned);
}

#[test]
fn group_size_is_occurs_times_children() {
    let decls = vec![
        group(1, "R"),
        Declaration::new(5, "G", vec![Clause::Occurs(4)]),
        leaf(10, "X1", "X(3)"),
        leaf(10, "X2", "9(2)"),
    ];
    let (forest, layout) = laid_out(decls);
    assert_eq!(placement(&forest, &layout, "G").size, 4 * (3 + 2));
    assert_eq!(placement(&forest, &layout, "R").size, 20);
}

#[test]
fn redefines_overlaps_its_target() {
    let decls = vec![
        group(1, "R"),
        leaf(5, "A", "X(5)"),
        redefining(5, "B", "A", "X(3)"),
    ];
    let (forest, layout) = laid_out(decls);
    let a = placement(&forest, &layout, "A");
    let b = placement(&forest, &layout, "B");
    assert_eq!(placement(&forest, &layout, "R").size, 3);
    assert_eq!((b.local_start, b.global_start), (a.local_start, a.global_start));
}

#[test]
fn fillers_are_numbered_per_parent() {
    let decls = vec![
        group(1, "P"),
        leaf(5, "FILLER", "X"),
        leaf(5, "NAME", "X"),
        leaf(5, "FILLER", "X"),
        group(5, "Q"),
        leaf(10, "FILLER", "X"),
        leaf(5, "FILLER", "X"),
    ];
    let (forest, _) = laid_out(decls);
    let p = forest.find("P").unwrap();
    let names: Vec<&str> = forest.children(p).map(|(_, f)| f.name.as_str()).collect();
    assert_eq!(names, ["P-FILLER1", "NAME", "P-FILLER2", "Q", "P-FILLER3"]);
    let q = forest.find("Q").unwrap();
    let names: Vec<&str> = forest.children(q).map(|(_, f)| f.name.as_str()).collect();
    assert_eq!(names, ["Q-FILLER1"]);
}

#[test]
fn stream_starting_below_level_one_is_an_orphan() {
    let err = build_err(vec![leaf(5, "A", "X"), group(1, "R")]);
    assert!(matches!(err, BuildError::OrphanField { ref field, level: 5 } if field == "A"));
}

#[test]
fn empty_forest_cannot_be_emitted() {
    let (forest, layout) = laid_out(Vec::new());
    let err = emit_types(&forest, &layout, "BOOK", &TypeMapping::default()).unwrap_err();
    assert_eq!(err, BuildError::EmptyForest);
}
