//! Grammar fixtures and edit helpers shared by the integration tests.

#![allow(dead_code)]

use canopy::{CharSet, InputEdit, Language, LanguageBuilder, Pattern, Point, TextSize};
use std::sync::Arc;

/// Infix arithmetic: `+` and `*` with the usual precedence, parentheses,
/// whitespace as an extra.
pub fn arithmetic() -> Arc<Language> {
    let mut builder = LanguageBuilder::new("arithmetic");
    builder.token("number", Pattern::repeat1(CharSet::digits()));
    builder.literal("+");
    builder.literal("*");
    builder.literal("(");
    builder.literal(")");
    builder.extra("whitespace", Pattern::repeat1(CharSet::whitespace()));
    builder
        .prod("expr", &["expr", "+", "expr"])
        .left(1)
        .field(0, "left")
        .field(2, "right");
    builder
        .prod("expr", &["expr", "*", "expr"])
        .left(2)
        .field(0, "left")
        .field(2, "right");
    builder.prod("expr", &["(", "expr", ")"]);
    builder.prod("expr", &["number"]);
    builder.finish("expr").unwrap()
}

/// A statement language exercising the word token, keyword correction,
/// fields, and a hidden left-recursive repetition helper.
pub fn statements() -> Arc<Language> {
    let mut builder = LanguageBuilder::new("statements");
    builder.word_token(
        "identifier",
        Pattern::Seq(vec![
            Pattern::CharClass(CharSet::alpha()),
            Pattern::repeat0(CharSet::word()),
        ]),
    );
    builder.token("number", Pattern::repeat1(CharSet::digits()));
    builder.keyword("let");
    builder.literal("=");
    builder.literal(";");
    builder.extra("whitespace", Pattern::repeat1(CharSet::whitespace()));
    builder.prod("program", &["_statements"]);
    builder.prod("_statements", &["statement"]);
    builder.prod("_statements", &["_statements", "statement"]);
    builder
        .prod("statement", &["let", "identifier", "=", "expr", ";"])
        .field(1, "name")
        .field(3, "value");
    builder.prod("expr", &["number"]);
    builder.prod("expr", &["identifier"]);
    builder.finish("program").unwrap()
}

/// Row/column of a byte offset within `text`.
pub fn point_at(text: &str, offset: usize) -> Point {
    let prefix = &text.as_bytes()[..offset];
    let row = u32::try_from(prefix.iter().filter(|&&b| b == b'\n').count()).unwrap();
    let column = match prefix.iter().rposition(|&b| b == b'\n') {
        Some(i) => u32::try_from(offset - i - 1).unwrap(),
        None => u32::try_from(offset).unwrap(),
    };
    Point::new(row, column)
}

/// Replace `text[start..old_end]` with `replacement`, returning the new
/// text and the matching [`InputEdit`].
pub fn splice(text: &str, start: usize, old_end: usize, replacement: &str) -> (String, InputEdit) {
    let mut new_text = String::with_capacity(text.len() + replacement.len());
    new_text.push_str(&text[..start]);
    new_text.push_str(replacement);
    new_text.push_str(&text[old_end..]);
    let new_end = start + replacement.len();
    let edit = InputEdit {
        start_byte: TextSize::from(u32::try_from(start).unwrap()),
        old_end_byte: TextSize::from(u32::try_from(old_end).unwrap()),
        new_end_byte: TextSize::from(u32::try_from(new_end).unwrap()),
        start_point: point_at(text, start),
        old_end_point: point_at(text, old_end),
        new_end_point: point_at(&new_text, new_end),
    };
    (new_text, edit)
}
