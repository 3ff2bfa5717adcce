//! # Language artifacts
//!
//! A [`Language`] is the compiled, immutable description of one grammar:
//! symbol metadata, the parse action/goto table, lexical rules, the keyword
//! table, field names, and any registered external scanners. It is loaded
//! once, wrapped in an `Arc`, and shared read-only across every parser and
//! tree that uses it.
//!
//! Languages are produced offline by a grammar compiler; this crate only
//! consumes the artifact. [`LanguageBuilder`] is the programmatic producer
//! used by that compiler's output path and by tests.

mod builder;
mod table;

pub use builder::{LanguageBuilder, ProductionRule};
pub use table::{
    Assoc, ParseAction, ParseTable, Production, StateId, StateRow, TerminalSet, START_STATE,
};

use crate::error::LanguageError;
use crate::lexer::{ExternalScanner, Pattern};
use compact_str::CompactString;
use std::fmt;
use std::sync::Arc;

/// Version stamp of the language artifact format this engine understands.
/// Loading rejects any other version outright.
pub const LANGUAGE_VERSION: u32 = 1;

/// Identifier of a terminal or nonterminal symbol within one language.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize, serde::Deserialize))]
pub struct Symbol(u16);

impl Symbol {
    /// The synthetic end-of-input terminal, present in every language.
    pub const END: Self = Self(0);
    /// The ERROR node symbol, present in every language.
    pub const ERROR: Self = Self(1);

    #[must_use]
    pub const fn new(raw: u16) -> Self {
        Self(raw)
    }

    #[must_use]
    pub const fn raw(self) -> u16 {
        self.0
    }

    #[must_use]
    pub const fn index(self) -> usize {
        self.0 as usize
    }
}

/// Identifier of a field name within one language.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize, serde::Deserialize))]
pub struct FieldId(u16);

impl FieldId {
    #[must_use]
    pub const fn new(raw: u16) -> Self {
        Self(raw)
    }

    #[must_use]
    pub const fn index(self) -> usize {
        self.0 as usize
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SymbolKind {
    Terminal,
    NonTerminal,
}

/// Metadata for one symbol in the language's symbol table.
#[derive(Debug, Clone)]
pub struct SymbolInfo {
    pub name: CompactString,
    pub kind: SymbolKind,
    /// Named symbols appear in queries and named-child iteration;
    /// anonymous ones (punctuation literals) do not.
    pub named: bool,
    /// Extras may appear anywhere outside normal derivation slots.
    pub extra: bool,
    /// Hidden nonterminals (repetition helpers) splice their children
    /// into the visible parent instead of producing a node.
    pub hidden: bool,
    pub keyword: bool,
}

/// The raw, producer-facing form of a language artifact. [`Language::from_raw`]
/// validates it and freezes it into the shared form.
pub struct RawLanguage {
    pub name: CompactString,
    pub version: u32,
    pub symbols: Vec<SymbolInfo>,
    pub table: ParseTable,
    /// Lexical rule per symbol index; `None` for nonterminals, keywords,
    /// and externally scanned terminals.
    pub patterns: Vec<Option<Pattern>>,
    /// Keyword text to keyword symbol, sorted by text.
    pub keywords: Vec<(CompactString, Symbol)>,
    /// The terminal whose matches are re-checked against the keyword table.
    pub word_token: Option<Symbol>,
    pub extras: Vec<Symbol>,
    pub fields: Vec<CompactString>,
    pub externals: Vec<Arc<dyn ExternalScanner>>,
    pub entry: Symbol,
}

/// An immutable, shareable compiled language.
pub struct Language {
    name: CompactString,
    symbols: Vec<SymbolInfo>,
    table: ParseTable,
    patterns: Vec<Option<Pattern>>,
    keywords: Vec<(CompactString, Symbol)>,
    word_token: Option<Symbol>,
    extras: Vec<Symbol>,
    fields: Vec<CompactString>,
    externals: Vec<Arc<dyn ExternalScanner>>,
    entry: Symbol,
}

impl Language {
    /// Validate and freeze a raw artifact. Either the whole load succeeds
    /// or it is rejected; a `Language` is never partially constructed.
    pub fn from_raw(raw: RawLanguage) -> Result<Arc<Self>, LanguageError> {
        if raw.version != LANGUAGE_VERSION {
            return Err(LanguageError::UnsupportedVersion {
                found: raw.version,
                expected: LANGUAGE_VERSION,
            });
        }
        if raw.symbols.len() < 2
            || raw.symbols[Symbol::END.index()].kind != SymbolKind::Terminal
            || raw.symbols[Symbol::ERROR.index()].kind != SymbolKind::NonTerminal
        {
            return Err(LanguageError::MalformedSymbolTable);
        }
        if raw.patterns.len() != raw.symbols.len() {
            return Err(LanguageError::MalformedSymbolTable);
        }
        let in_bounds = |s: Symbol| s.index() < raw.symbols.len();
        if !in_bounds(raw.entry)
            || raw.symbols[raw.entry.index()].kind != SymbolKind::NonTerminal
        {
            return Err(LanguageError::InvalidEntryPoint);
        }
        for production in &raw.table.productions {
            if !in_bounds(production.lhs) || !production.rhs.iter().copied().all(in_bounds) {
                return Err(LanguageError::MalformedSymbolTable);
            }
        }
        if raw.table.states.is_empty() {
            return Err(LanguageError::EmptyTable);
        }

        Ok(Arc::new(Self {
            name: raw.name,
            symbols: raw.symbols,
            table: raw.table,
            patterns: raw.patterns,
            keywords: raw.keywords,
            word_token: raw.word_token,
            extras: raw.extras,
            fields: raw.fields,
            externals: raw.externals,
            entry: raw.entry,
        }))
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn symbol_count(&self) -> usize {
        self.symbols.len()
    }

    #[must_use]
    pub fn symbol_name(&self, symbol: Symbol) -> &str {
        self.symbols
            .get(symbol.index())
            .map_or("", |info| info.name.as_str())
    }

    #[must_use]
    pub fn symbol_for_name(&self, name: &str) -> Option<Symbol> {
        self.symbols
            .iter()
            .position(|info| info.name == name)
            .map(|i| Symbol::new(u16::try_from(i).unwrap_or(u16::MAX)))
    }

    #[must_use]
    pub fn symbol_info(&self, symbol: Symbol) -> Option<&SymbolInfo> {
        self.symbols.get(symbol.index())
    }

    #[must_use]
    pub fn is_terminal(&self, symbol: Symbol) -> bool {
        self.symbols
            .get(symbol.index())
            .is_some_and(|info| info.kind == SymbolKind::Terminal)
    }

    #[must_use]
    pub fn is_named(&self, symbol: Symbol) -> bool {
        self.symbols
            .get(symbol.index())
            .is_some_and(|info| info.named)
    }

    #[must_use]
    pub fn is_extra(&self, symbol: Symbol) -> bool {
        self.symbols
            .get(symbol.index())
            .is_some_and(|info| info.extra)
    }

    #[must_use]
    pub fn is_hidden(&self, symbol: Symbol) -> bool {
        self.symbols
            .get(symbol.index())
            .is_some_and(|info| info.hidden)
    }

    #[must_use]
    pub fn field_count(&self) -> usize {
        self.fields.len()
    }

    #[must_use]
    pub fn field_name(&self, field: FieldId) -> &str {
        self.fields
            .get(field.index())
            .map_or("", |name| name.as_str())
    }

    #[must_use]
    pub fn field_id(&self, name: &str) -> Option<FieldId> {
        self.fields
            .iter()
            .position(|f| f == name)
            .map(|i| FieldId::new(u16::try_from(i).unwrap_or(u16::MAX)))
    }

    #[must_use]
    pub fn entry(&self) -> Symbol {
        self.entry
    }

    #[must_use]
    pub fn table(&self) -> &ParseTable {
        &self.table
    }

    #[must_use]
    pub fn pattern(&self, symbol: Symbol) -> Option<&Pattern> {
        self.patterns.get(symbol.index()).and_then(Option::as_ref)
    }

    #[must_use]
    pub fn extras(&self) -> &[Symbol] {
        &self.extras
    }

    #[must_use]
    pub fn word_token(&self) -> Option<Symbol> {
        self.word_token
    }

    /// The keyword table, sorted by keyword text.
    #[must_use]
    pub fn keywords(&self) -> &[(CompactString, Symbol)] {
        &self.keywords
    }

    #[must_use]
    pub fn keyword_for_text(&self, text: &str) -> Option<Symbol> {
        self.keywords
            .binary_search_by(|(kw, _)| kw.as_str().cmp(text))
            .ok()
            .map(|i| self.keywords[i].1)
    }

    #[must_use]
    pub fn external_scanners(&self) -> &[Arc<dyn ExternalScanner>] {
        &self.externals
    }

    /// All terminal symbols, for relaxed lexing during error recovery.
    pub(crate) fn all_terminals(&self) -> TerminalSet {
        let mut set = TerminalSet::new();
        for (i, info) in self.symbols.iter().enumerate() {
            if info.kind == SymbolKind::Terminal && i != Symbol::END.index() {
                set.insert(Symbol::new(u16::try_from(i).unwrap_or(u16::MAX)));
            }
        }
        set
    }
}

impl fmt::Debug for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Language")
            .field("name", &self.name)
            .field("symbols", &self.symbols.len())
            .field("states", &self.table.state_count())
            .finish_non_exhaustive()
    }
}
