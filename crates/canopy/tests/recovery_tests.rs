mod common;

use canopy::{Parser, TextSize};

#[test]
fn missing_token_is_synthesized_at_end() {
    let mut parser = Parser::new();
    parser.set_language(common::arithmetic());
    let tree = parser.parse("1+", None).unwrap();
    assert!(tree.has_error());
    // Synthesizing the absent operand is cheaper than discarding the
    // operator, so the partial expression keeps its shape.
    assert_eq!(
        tree.root_node().to_sexp(),
        "(expr left: (expr (number)) right: (expr (MISSING number)))"
    );
    assert!(parser.last_metrics().recoveries >= 1);
}

#[test]
fn missing_token_sits_at_the_gap() {
    let mut parser = Parser::new();
    parser.set_language(common::arithmetic());
    let tree = parser.parse("1 + ", None).unwrap();
    assert!(tree.has_error());
    let missing = tree
        .root_node()
        .descendants()
        .find(|node| node.is_missing())
        .unwrap();
    assert_eq!(missing.kind_name(), "number");
    assert_eq!(missing.start_byte(), TextSize::from(4));
    assert_eq!(missing.end_byte(), TextSize::from(4));
}

#[test]
fn errors_stay_local() {
    let mut parser = Parser::new();
    parser.set_language(common::arithmetic());
    let tree = parser.parse("1 + $ + 2", None).unwrap();
    assert!(tree.has_error());

    // The malformed byte is wrapped on its own; both numbers survive in
    // clean expression nodes around it.
    let root = tree.root_node();
    let error = root
        .descendants()
        .find(|node| node.is_error() && node.child_count() > 0)
        .unwrap();
    assert_eq!(error.start_byte(), TextSize::from(4));
    assert_eq!(error.end_byte(), TextSize::from(5));

    let numbers: Vec<_> = root
        .descendants()
        .filter(|node| node.kind_name() == "number")
        .collect();
    assert_eq!(numbers.len(), 2);
    assert_eq!(numbers[0].text(), Some("1"));
    assert!(!numbers[0].parent().unwrap().has_error());
    assert_eq!(numbers[1].text(), Some("2"));
    assert_eq!(numbers[1].start_byte(), TextSize::from(8));
}

#[test]
fn all_garbage_still_yields_a_full_tree() {
    let mut parser = Parser::new();
    parser.set_language(common::arithmetic());
    let tree = parser.parse("@#%^&", None).unwrap();
    assert!(tree.has_error());
    // Progress invariant: every byte of input ends up covered by the tree.
    assert_eq!(tree.root_node().end_byte(), TextSize::from(5));

    let consumed: String = tree
        .root_node()
        .descendants()
        .filter(|node| node.child_count() == 0 && !node.is_missing())
        .filter_map(|node| node.text().map(str::to_owned))
        .collect();
    assert_eq!(consumed, "@#%^&");
}

#[test]
fn unlexable_bytes_between_tokens_are_skipped() {
    let mut parser = Parser::new();
    parser.set_language(common::arithmetic());
    let tree = parser.parse("12@34", None).unwrap();
    assert!(tree.has_error());
    assert_eq!(tree.root_node().end_byte(), TextSize::from(5));
    // One of the numbers parses normally; the rest is error material but
    // no input is lost.
    let consumed: String = tree
        .root_node()
        .descendants()
        .filter(|node| node.child_count() == 0 && !node.is_missing())
        .filter_map(|node| node.text().map(str::to_owned))
        .collect();
    assert_eq!(consumed, "12@34");
    assert!(tree
        .root_node()
        .descendants()
        .any(|node| node.kind_name() == "number" && !node.is_error()));
}

#[test]
fn recovery_never_fails_the_parse_call() {
    let mut parser = Parser::new();
    parser.set_language(common::arithmetic());
    for text in ["", "+", "((((", "1+*2", ")(", "1 2 3"] {
        let tree = parser.parse(text, None).unwrap();
        assert_eq!(
            tree.root_node().end_byte(),
            TextSize::from(u32::try_from(text.len()).unwrap()),
            "input {text:?} was not fully covered"
        );
    }
}
