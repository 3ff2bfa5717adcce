#![no_main]
//! Parses arbitrary text, records an insertion at an arbitrary position,
//! and checks that reparsing the edited tree is indistinguishable from
//! parsing the new text from scratch.

use canopy::{
    CharSet, InputEdit, Language, LanguageBuilder, Parser, Pattern, Point, TextSize,
};
use libfuzzer_sys::fuzz_target;
use std::sync::{Arc, OnceLock};

fn language() -> Arc<Language> {
    static LANGUAGE: OnceLock<Arc<Language>> = OnceLock::new();
    LANGUAGE
        .get_or_init(|| {
            let mut builder = LanguageBuilder::new("fuzz-arith");
            builder.token("number", Pattern::repeat1(CharSet::digits()));
            builder.literal("+");
            builder.literal("*");
            builder.literal("(");
            builder.literal(")");
            builder.extra("whitespace", Pattern::repeat1(CharSet::whitespace()));
            builder.prod("expr", &["expr", "+", "expr"]).left(1);
            builder.prod("expr", &["expr", "*", "expr"]).left(2);
            builder.prod("expr", &["(", "expr", ")"]);
            builder.prod("expr", &["number"]);
            builder.finish("expr").expect("fuzz grammar compiles")
        })
        .clone()
}

fn point_at(text: &str, offset: usize) -> Point {
    let prefix = &text.as_bytes()[..offset];
    let row = u32::try_from(prefix.iter().filter(|&&b| b == b'\n').count()).unwrap();
    let column = match prefix.iter().rposition(|&b| b == b'\n') {
        Some(i) => u32::try_from(offset - i - 1).unwrap(),
        None => u32::try_from(offset).unwrap(),
    };
    Point::new(row, column)
}

fuzz_target!(|data: &[u8]| {
    let Some((&selector, rest)) = data.split_first() else {
        return;
    };
    let Ok(input) = std::str::from_utf8(rest) else {
        return;
    };
    let at = selector as usize % (input.len() + 1);
    if !input.is_char_boundary(at) {
        return;
    }

    let mut parser = Parser::new();
    parser.set_language(language());
    let old_tree = parser.parse(input, None).expect("parse never fails");

    let mut new_text = String::with_capacity(input.len() + 1);
    new_text.push_str(&input[..at]);
    new_text.push('1');
    new_text.push_str(&input[at..]);
    let edit = InputEdit {
        start_byte: TextSize::from(u32::try_from(at).unwrap()),
        old_end_byte: TextSize::from(u32::try_from(at).unwrap()),
        new_end_byte: TextSize::from(u32::try_from(at + 1).unwrap()),
        start_point: point_at(input, at),
        old_end_point: point_at(input, at),
        new_end_point: point_at(&new_text, at + 1),
    };
    let edited = old_tree.edit(&edit).expect("insertion is always in range");

    let incremental = parser
        .parse(&new_text, Some(&edited))
        .expect("parse never fails");
    let scratch = parser.parse(&new_text, None).expect("parse never fails");

    assert_eq!(
        incremental.root_node().to_sexp(),
        scratch.root_node().to_sexp(),
        "incremental parse diverged from scratch parse"
    );
    assert_eq!(incremental.root_node().end_byte(), scratch.root_node().end_byte());
});
