mod common;

use canopy::{Parser, Point, TextSize};

#[test]
fn preorder_traversal_is_complete() {
    let mut parser = Parser::new();
    parser.set_language(common::arithmetic());
    let tree = parser.parse("1 + 2 * 3", None).unwrap();
    let root = tree.root_node();

    let visited: Vec<_> = root.descendants().collect();
    assert_eq!(visited.len(), root.descendant_count());
    assert_eq!(visited.len(), 14);
    assert_eq!(visited[0], root);

    // Pre-order: every node appears after its parent and extents nest.
    for node in &visited {
        if let Some(parent) = node.parent() {
            assert!(parent.start_byte() <= node.start_byte());
            assert!(node.end_byte() <= parent.end_byte());
        }
    }
}

#[test]
fn descendants_of_an_inner_node_stay_inside_it() {
    let mut parser = Parser::new();
    parser.set_language(common::arithmetic());
    let tree = parser.parse("1 + 2 * 3", None).unwrap();
    let product = tree.root_node().child_by_field_name("right").unwrap();
    assert_eq!(product.descendants().count(), product.descendant_count());
    assert_eq!(product.descendant_count(), 9);
    for node in product.descendants() {
        assert!(product.start_byte() <= node.start_byte());
        assert!(node.end_byte() <= product.end_byte());
    }
}

#[test]
fn descend_to_byte_finds_the_leaf() {
    let mut parser = Parser::new();
    parser.set_language(common::arithmetic());
    let tree = parser.parse("1 + 2 * 3", None).unwrap();

    let mut cursor = tree.walk();
    while cursor.goto_first_child_for_byte(TextSize::from(4)).is_some() {}
    let node = cursor.node();
    assert_eq!(node.kind_name(), "number");
    assert_eq!(node.text(), Some("2"));
    assert_eq!(node.start_byte(), TextSize::from(4));
}

#[test]
fn descend_to_point_finds_the_leaf() {
    let mut parser = Parser::new();
    parser.set_language(common::arithmetic());
    let tree = parser.parse("1 +\n2", None).unwrap();

    let mut cursor = tree.walk();
    while cursor
        .goto_first_child_for_point(Point::new(1, 0))
        .is_some()
    {}
    let node = cursor.node();
    assert_eq!(node.kind_name(), "number");
    assert_eq!(node.text(), Some("2"));
    assert_eq!(node.start_point(), Point::new(1, 0));
}

#[test]
fn cursor_navigation_tracks_positions() {
    let mut parser = Parser::new();
    parser.set_language(common::arithmetic());
    let tree = parser.parse("1 + 2", None).unwrap();

    let mut cursor = tree.walk();
    assert_eq!(cursor.depth(), 0);
    assert!(cursor.goto_first_child());
    assert_eq!(cursor.depth(), 1);
    assert_eq!(cursor.node().start_byte(), TextSize::from(0));

    assert!(cursor.goto_next_sibling());
    assert_eq!(cursor.node().kind_name(), "whitespace");
    assert_eq!(cursor.node().start_byte(), TextSize::from(1));

    assert!(cursor.goto_next_sibling());
    assert_eq!(cursor.node().kind_name(), "+");
    assert!(cursor.goto_next_sibling());
    assert!(!cursor.goto_next_sibling());

    assert!(cursor.goto_parent());
    assert_eq!(cursor.depth(), 0);
    assert!(!cursor.goto_parent());
}

#[test]
fn cursor_positions_follow_edits() {
    let mut parser = Parser::new();
    parser.set_language(common::arithmetic());
    let tree = parser.parse("1 + 2", None).unwrap();
    let (_, edit) = common::splice("1 + 2", 0, 0, "100 + ");
    let edited = tree.edit(&edit).unwrap();

    // The old "2" leaf now answers with shifted coordinates.
    let number = edited
        .root_node()
        .descendants()
        .find(|node| node.text() == Some("2"))
        .unwrap();
    assert_eq!(number.start_byte(), TextSize::from(10));
    assert_eq!(number.end_byte(), TextSize::from(11));
}
