mod common;

use canopy::{CharSet, LanguageBuilder, Parser, Pattern, TextSize};

#[test]
fn parses_with_precedence() {
    let mut parser = Parser::new();
    parser.set_language(common::arithmetic());
    let tree = parser.parse("1+2*3", None).unwrap();
    assert!(!tree.has_error());
    assert_eq!(
        tree.root_node().to_sexp(),
        "(expr left: (expr (number)) right: (expr left: (expr (number)) right: (expr (number))))"
    );
}

#[test]
fn equal_precedence_associates_left() {
    let mut parser = Parser::new();
    parser.set_language(common::arithmetic());
    let tree = parser.parse("1+2+3", None).unwrap();
    assert_eq!(
        tree.root_node().to_sexp(),
        "(expr left: (expr left: (expr (number)) right: (expr (number))) right: (expr (number)))"
    );
}

#[test]
fn parentheses_override_precedence() {
    let mut parser = Parser::new();
    parser.set_language(common::arithmetic());
    let tree = parser.parse("(1+2)*3", None).unwrap();
    assert!(!tree.has_error());
    assert_eq!(
        tree.root_node().to_sexp(),
        "(expr left: (expr (expr left: (expr (number)) right: (expr (number)))) right: (expr (number)))"
    );
}

#[test]
fn whitespace_attaches_as_extra_nodes() {
    let mut parser = Parser::new();
    parser.set_language(common::arithmetic());
    let tree = parser.parse("1 + 2", None).unwrap();
    assert!(!tree.has_error());
    // Extras stay out of the s-expression but remain real children.
    assert_eq!(
        tree.root_node().to_sexp(),
        "(expr left: (expr (number)) right: (expr (number)))"
    );
    let root = tree.root_node();
    assert_eq!(root.child_count(), 4);
    let space = root.child(1).unwrap();
    assert!(space.is_extra());
    assert_eq!(space.kind_name(), "whitespace");
    assert_eq!(space.text(), Some(" "));
}

#[test]
fn fields_name_operands() {
    let mut parser = Parser::new();
    parser.set_language(common::arithmetic());
    let tree = parser.parse("1 + 2", None).unwrap();
    let root = tree.root_node();

    let left = root.child_by_field_name("left").unwrap();
    assert_eq!(left.kind_name(), "expr");
    assert_eq!(left.field_name(), Some("left"));
    assert_eq!(left.start_byte(), TextSize::from(0));

    let right = root.child_by_field_name("right").unwrap();
    assert_eq!(right.kind_name(), "expr");
    let number = right
        .children()
        .find(|child| child.kind_name() == "number")
        .unwrap();
    assert_eq!(number.text(), Some("2"));
    assert_eq!(number.start_byte(), TextSize::from(4));
    assert_eq!(number.end_byte(), TextSize::from(5));
}

#[test]
fn navigation_round_trips() {
    let mut parser = Parser::new();
    parser.set_language(common::arithmetic());
    let tree = parser.parse("1 + 2", None).unwrap();
    let root = tree.root_node();

    let left = root.child(0).unwrap();
    assert_eq!(left.parent().unwrap(), root);
    let space = left.next_sibling().unwrap();
    assert_eq!(space.prev_sibling().unwrap(), left);
    assert!(root.parent().is_none());
    assert!(root.child(4).is_none());
    // Named children include the whitespace extra between the operands.
    assert_eq!(root.named_child_count(), 3);
}

#[test]
fn ambiguous_grammar_parses_deterministically() {
    // No precedence on the binary rule: the table keeps the conflict and
    // the engine forks. The winning interpretation must be stable across
    // runs and across parser instances.
    fn build() -> std::sync::Arc<canopy::Language> {
        let mut builder = LanguageBuilder::new("amb");
        builder.token("id", Pattern::repeat1(CharSet::alpha()));
        builder.literal("-");
        builder.prod("expr", &["expr", "-", "expr"]);
        builder.prod("expr", &["id"]);
        builder.finish("expr").unwrap()
    }

    let mut parser = Parser::new();
    parser.set_language(build());
    let first = parser.parse("a-b-c", None).unwrap();
    assert!(!first.has_error());

    let second = parser.parse("a-b-c", None).unwrap();
    assert_eq!(first.root_node().to_sexp(), second.root_node().to_sexp());

    let mut other = Parser::new();
    other.set_language(build());
    let third = other.parse("a-b-c", None).unwrap();
    assert_eq!(first.root_node().to_sexp(), third.root_node().to_sexp());
}

#[test]
fn aliases_rename_children() {
    let mut builder = LanguageBuilder::new("aliased");
    builder.token("number", Pattern::repeat1(CharSet::digits()));
    builder.prod("expr", &["number"]).alias(0, "literal", true);
    let language = builder.finish("expr").unwrap();

    let mut parser = Parser::new();
    parser.set_language(language);
    let tree = parser.parse("5", None).unwrap();
    assert_eq!(tree.root_node().to_sexp(), "(expr (literal))");
    let child = tree.root_node().child(0).unwrap();
    assert_eq!(child.kind_name(), "literal");
    assert!(child.is_named());
    assert_eq!(child.text(), Some("5"));
}

#[test]
fn parse_metrics_are_recorded() {
    let mut parser = Parser::new();
    parser.set_language(common::arithmetic());
    let tree = parser.parse("1 + 2", None).unwrap();
    assert!(!tree.has_error());
    let metrics = parser.last_metrics();
    assert!(metrics.tokens_lexed >= 5);
    assert!(metrics.nodes_created >= 7);
    assert_eq!(metrics.recoveries, 0);
    assert_eq!(metrics.nodes_reused, 0);
}
