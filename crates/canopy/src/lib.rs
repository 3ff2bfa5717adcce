//! # Canopy
//!
//! An incremental, error-tolerant parsing engine producing concrete syntax
//! trees.
//!
//! The engine interprets a compiled [`Language`] artifact with a
//! generalized LR loop: where the action table is ambiguous the parse
//! forks, and the cheapest surviving interpretation wins deterministically.
//! Malformed input never fails a parse; it is repaired in place and
//! surfaced as ERROR and MISSING nodes in the tree. Trees are immutable
//! and share their subtrees, so recording an edit and reparsing reuses
//! everything the edit did not touch.
//!
//! The main entry points are [`LanguageBuilder`] to compile a language,
//! [`Parser`] to parse, and [`syntax::Node`] to read the result.

pub mod error;
pub mod input;
pub mod language;
pub mod lexer;
pub mod parser;
pub mod syntax;

pub use error::{EditError, LanguageError, ParseError};
pub use input::{ChunkedInput, TextInput};
pub use language::{FieldId, Language, LanguageBuilder, Symbol, LANGUAGE_VERSION};
pub use lexer::{CharSet, ExternalScanner, ExternalToken, Pattern, ScanContext};
pub use parser::{CancellationToken, ParseMetrics, Parser, ParserConfig};
pub use syntax::{InputEdit, Node, Point, TextRange, TextSize, Tree, TreeCursor};
