//! Crate error types.
//!
//! Lexical and syntactic errors are never surfaced here: they are recovered
//! in place and embedded in the tree as ERROR/MISSING nodes, so callers
//! inspect [`Tree::has_error`](crate::syntax::Tree::has_error) instead of
//! handling parse-time failures as control flow. The types below cover
//! programming-contract violations and cooperative cancellation only.

use crate::syntax::{TextSize, Tree};
use thiserror::Error;

#[cfg(feature = "diagnostics")]
use miette::Diagnostic;

/// Errors returned by [`Parser::parse`](crate::parser::Parser::parse).
#[derive(Debug, Error)]
#[cfg_attr(feature = "diagnostics", derive(Diagnostic))]
pub enum ParseError {
    /// The deadline or cancellation flag tripped. Not fatal: the partial
    /// tree covers everything consumed so far under an ERROR root.
    #[error("parse cancelled before completion")]
    #[cfg_attr(feature = "diagnostics", diagnostic(code(parser::cancelled)))]
    Cancelled { partial: Box<Tree> },

    /// `parse` was called before `set_language`.
    #[error("no language set on parser")]
    #[cfg_attr(feature = "diagnostics", diagnostic(code(parser::no_language)))]
    NoLanguage,
}

/// Rejected edit coordinates. Raised before any shared state is touched.
#[derive(Debug, Clone, Copy, Error, PartialEq, Eq)]
#[cfg_attr(feature = "diagnostics", derive(Diagnostic))]
pub enum EditError {
    #[error("edit range {start}..{old_end} extends past tree length {len}")]
    #[cfg_attr(feature = "diagnostics", diagnostic(code(edit::out_of_bounds)))]
    OutOfBounds {
        start: TextSize,
        old_end: TextSize,
        len: TextSize,
    },

    #[error("edit start {start} is after old end {old_end}")]
    #[cfg_attr(feature = "diagnostics", diagnostic(code(edit::inverted)))]
    Inverted { start: TextSize, old_end: TextSize },

    #[error("edit points are inconsistent with edit bytes")]
    #[cfg_attr(feature = "diagnostics", diagnostic(code(edit::bad_points)))]
    InconsistentPoints,
}

/// Errors loading or constructing a language artifact. A load either fully
/// succeeds or is fully rejected.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[cfg_attr(feature = "diagnostics", derive(Diagnostic))]
pub enum LanguageError {
    #[error("unsupported language format version {found} (engine expects {expected})")]
    #[cfg_attr(feature = "diagnostics", diagnostic(code(language::unsupported_version)))]
    UnsupportedVersion { found: u32, expected: u32 },

    #[error("symbol table is malformed or references out-of-range symbols")]
    #[cfg_attr(feature = "diagnostics", diagnostic(code(language::malformed_symbols)))]
    MalformedSymbolTable,

    #[error("entry point is missing or is not a nonterminal")]
    #[cfg_attr(feature = "diagnostics", diagnostic(code(language::invalid_entry)))]
    InvalidEntryPoint,

    #[error("parse table has no states")]
    #[cfg_attr(feature = "diagnostics", diagnostic(code(language::empty_table)))]
    EmptyTable,

    #[error("duplicate symbol name: {name}")]
    #[cfg_attr(feature = "diagnostics", diagnostic(code(language::duplicate_symbol)))]
    DuplicateSymbol { name: String },

    #[error("nonterminal {name} has no productions")]
    #[cfg_attr(feature = "diagnostics", diagnostic(code(language::missing_rules)))]
    MissingProductions { name: String },
}
