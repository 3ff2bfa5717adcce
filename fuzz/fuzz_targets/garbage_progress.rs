#![no_main]
//! Feeds arbitrary text to the parser and checks the progress guarantee:
//! every parse terminates, returns a tree, and covers all of the input.

use canopy::{CharSet, Language, LanguageBuilder, Parser, Pattern, TextSize};
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

fuzz_target!(|data: &[u8]| {
    let Ok(input) = std::str::from_utf8(data) else {
        return;
    };
    let mut parser = Parser::new();
    parser.set_language(language());

    let tree = parser.parse(input, None).expect("parse never fails");
    assert_eq!(
        tree.root_node().end_byte(),
        TextSize::from(u32::try_from(input.len()).unwrap()),
        "tree does not cover the whole input"
    );
});
