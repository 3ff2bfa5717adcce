mod common;

use canopy::{EditError, Parser, Point, TextSize, Tree};

/// Kind and byte extent of every node, in pre-order. Two trees over the
/// same text must agree on this exactly, however they were produced.
fn shape(tree: &Tree) -> Vec<(String, u32, u32)> {
    tree.root_node()
        .descendants()
        .map(|node| {
            (
                node.kind_name().to_owned(),
                node.start_byte().into(),
                node.end_byte().into(),
            )
        })
        .collect()
}

#[test]
fn edited_reparse_matches_scratch_parse() {
    let base = "1 + 2 * 3";
    let batteries = [
        (4usize, 5usize, "42"),     // replace an operand
        (0, 0, "7 + "),             // insert at the start
        (5, 9, ""),                 // delete the trailing product
        (4, 5, "(8 + 9)"),          // replace an operand with a group
        (9, 9, " * (4 + 5)"),       // append
    ];

    let mut parser = Parser::new();
    parser.set_language(common::arithmetic());
    for (start, old_end, replacement) in batteries {
        let old_tree = parser.parse(base, None).unwrap();
        let (new_text, edit) = common::splice(base, start, old_end, replacement);
        let edited = old_tree.edit(&edit).unwrap();

        let incremental = parser.parse(&new_text, Some(&edited)).unwrap();
        let scratch = parser.parse(&new_text, None).unwrap();
        assert_eq!(
            incremental.root_node().to_sexp(),
            scratch.root_node().to_sexp(),
            "sexp diverged for edit {start}..{old_end} -> {replacement:?}"
        );
        assert_eq!(
            shape(&incremental),
            shape(&scratch),
            "node extents diverged for edit {start}..{old_end} -> {replacement:?}"
        );
    }
}

#[test]
fn untouched_subtrees_are_reused() {
    let mut parser = Parser::new();
    parser.set_language(common::arithmetic());
    let old_tree = parser.parse("1 + 2 * 3", None).unwrap();

    let (new_text, edit) = common::splice("1 + 2 * 3", 8, 9, "9");
    let edited = old_tree.edit(&edit).unwrap();
    let tree = parser.parse(&new_text, Some(&edited)).unwrap();
    assert!(!tree.has_error());
    assert!(parser.last_metrics().nodes_reused > 0);
}

#[test]
fn stacked_edits_compose() {
    let mut parser = Parser::new();
    parser.set_language(common::arithmetic());
    let old_tree = parser.parse("1 + 2", None).unwrap();

    // Second edit is expressed in the coordinates left by the first.
    let (text_one, first) = common::splice("1 + 2", 4, 5, "34");
    let (text_two, second) = common::splice(&text_one, 6, 6, " * 5");
    let edited = old_tree.edit(&first).unwrap().edit(&second).unwrap();

    let incremental = parser.parse(&text_two, Some(&edited)).unwrap();
    let scratch = parser.parse(&text_two, None).unwrap();
    assert_eq!(text_two, "1 + 34 * 5");
    assert_eq!(
        incremental.root_node().to_sexp(),
        scratch.root_node().to_sexp()
    );
    assert_eq!(shape(&incremental), shape(&scratch));
}

#[test]
fn multiline_edit_remaps_points() {
    let base = "1 +\n2 * 3";
    let mut parser = Parser::new();
    parser.set_language(common::arithmetic());
    let old_tree = parser.parse(base, None).unwrap();

    let (new_text, edit) = common::splice(base, 5, 5, "0");
    assert_eq!(new_text, "1 +\n20 * 3");
    let edited = old_tree.edit(&edit).unwrap();
    let tree = parser.parse(&new_text, Some(&edited)).unwrap();
    assert!(!tree.has_error());

    let number = tree
        .root_node()
        .descendants()
        .find(|node| node.kind_name() == "number" && node.text() == Some("20"))
        .unwrap();
    assert_eq!(number.start_point(), Point::new(1, 0));
    assert_eq!(number.end_point(), Point::new(1, 2));
    assert_eq!(tree.root_node().end_point(), Point::new(1, 6));
}

#[test]
fn invalid_edits_are_rejected() {
    let mut parser = Parser::new();
    parser.set_language(common::arithmetic());
    let tree = parser.parse("1 + 2", None).unwrap();

    let (_, mut edit) = common::splice("1 + 2", 2, 4, "");
    edit.old_end_byte = TextSize::from(9);
    assert!(matches!(
        tree.edit(&edit),
        Err(EditError::OutOfBounds { len, .. }) if len == TextSize::from(5)
    ));

    let (_, mut edit) = common::splice("1 + 2", 3, 4, "");
    edit.start_byte = TextSize::from(4);
    edit.old_end_byte = TextSize::from(3);
    assert!(matches!(tree.edit(&edit), Err(EditError::Inverted { .. })));

    let (_, mut edit) = common::splice("1 + 2", 2, 4, "x");
    edit.new_end_byte = TextSize::from(1);
    assert!(matches!(tree.edit(&edit), Err(EditError::InconsistentPoints)));

    // A rejected edit leaves the tree untouched and usable.
    assert_eq!(tree.len(), TextSize::from(5));
    assert!(!tree.has_error());
}

#[test]
fn old_tree_from_another_language_is_ignored() {
    let mut arith = Parser::new();
    arith.set_language(common::arithmetic());
    let arith_tree = arith.parse("1 + 2", None).unwrap();

    let mut parser = Parser::new();
    parser.set_language(common::statements());
    let tree = parser.parse("let a = 1;", None).unwrap();
    assert!(!tree.has_error());

    // Reuse from a tree of a different language would be unsound; it is
    // silently declined.
    let tree = parser.parse("let a = 1;", Some(&arith_tree)).unwrap();
    assert!(!tree.has_error());
    assert_eq!(parser.last_metrics().nodes_reused, 0);
}

#[test]
fn editing_returns_a_new_tree_and_keeps_the_old() {
    let mut parser = Parser::new();
    parser.set_language(common::arithmetic());
    let tree = parser.parse("1 + 2", None).unwrap();

    let (_, edit) = common::splice("1 + 2", 4, 5, "34");
    let edited = tree.edit(&edit).unwrap();
    // The original still answers in its own coordinates.
    assert_eq!(tree.len(), TextSize::from(5));
    assert_eq!(edited.len(), TextSize::from(6));
    assert_eq!(
        tree.root_node().to_sexp(),
        "(expr left: (expr (number)) right: (expr (number)))"
    );
}
