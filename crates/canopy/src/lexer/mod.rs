//! # Lexing
//!
//! The default scanner matches the language's [`Pattern`]s against the
//! input, steered by the set of terminals the parser can currently accept.
//! Scanning has no side effects: the engine re-invokes it at the same
//! position with a different valid set whenever heads fork or recovery
//! relaxes the expectation.
//!
//! External scanners run first and may claim a token before any default
//! rule is tried; keyword correction runs last, reclassifying word-token
//! matches whose text is a declared keyword.

mod pattern;

pub use pattern::{CharSet, Pattern};

use crate::language::{Language, Symbol, TerminalSet};
use crate::syntax::{Point, TextSize};
use smallvec::SmallVec;

/// What an external scanner sees: the unconsumed input and its position.
pub struct ScanContext<'a> {
    rest: &'a [u8],
    start_byte: TextSize,
    start_point: Point,
}

impl<'a> ScanContext<'a> {
    #[must_use]
    pub fn rest(&self) -> &'a [u8] {
        self.rest
    }

    #[must_use]
    pub fn start_byte(&self) -> TextSize {
        self.start_byte
    }

    #[must_use]
    pub fn start_point(&self) -> Point {
        self.start_point
    }
}

/// A token claimed by an external scanner.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExternalToken {
    pub symbol: Symbol,
    pub byte_len: usize,
}

/// Hook for token kinds the pattern language cannot express (indentation,
/// heredocs, nesting comments). Scanners must be side-effect free with
/// respect to observable parse state: a scan at the same position with the
/// same valid set must return the same answer.
pub trait ExternalScanner: Send + Sync {
    /// Try to recognize a token at the context position. Return `None` to
    /// decline and let the default rules run.
    fn scan(&self, context: &ScanContext<'_>, valid: &TerminalSet) -> Option<ExternalToken>;
}

/// One recognized token, positionless: the caller knows where it scanned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct ScannedToken {
    pub symbol: Symbol,
    pub byte_len: usize,
    /// Set when keyword correction reclassified a word-token match.
    pub keyword_corrected: bool,
}

/// Scan one token at the start of `rest`.
///
/// `valid` is the hint from the parse table: only terminals in it (plus
/// extras, which are always permitted) are considered. Longest match wins;
/// equal lengths break to the lowest symbol id. Returns `None` when nothing
/// matches, which the engine treats as a lex failure to recover from, never
/// as a fatal error.
pub(crate) fn scan(
    language: &Language,
    rest: &[u8],
    start_byte: TextSize,
    start_point: Point,
    valid: &TerminalSet,
) -> Option<ScannedToken> {
    if rest.is_empty() {
        return None;
    }

    let context = ScanContext {
        rest,
        start_byte,
        start_point,
    };
    for scanner in language.external_scanners() {
        if let Some(token) = scanner.scan(&context, valid) {
            if token.byte_len > 0
                && (valid.contains(token.symbol) || language.is_extra(token.symbol))
            {
                return Some(ScannedToken {
                    symbol: token.symbol,
                    byte_len: token.byte_len,
                    keyword_corrected: false,
                });
            }
        }
    }

    // The word token joins the candidates whenever a keyword it could
    // correct into is valid, even if the word token itself is not.
    let word = language.word_token();
    let keyword_possible = word.is_some()
        && language
            .keywords()
            .iter()
            .any(|(_, symbol)| valid.contains(*symbol));

    let mut matches: SmallVec<[(usize, Symbol); 8]> = SmallVec::new();
    for index in 0..language.symbol_count() {
        let symbol = Symbol::new(u16::try_from(index).unwrap_or(u16::MAX));
        let considered = valid.contains(symbol)
            || language.is_extra(symbol)
            || (keyword_possible && Some(symbol) == word);
        if !considered {
            continue;
        }
        if let Some(pattern) = language.pattern(symbol) {
            if let Some(len) = pattern.match_len(rest) {
                if len > 0 {
                    matches.push((len, symbol));
                }
            }
        }
    }
    matches.sort_unstable_by(|a, b| b.0.cmp(&a.0).then(a.1.cmp(&b.1)));

    for (len, symbol) in matches {
        if Some(symbol) == word {
            let text = std::str::from_utf8(&rest[..len]).ok()?;
            if let Some(keyword) = language.keyword_for_text(text) {
                if valid.contains(keyword) {
                    return Some(ScannedToken {
                        symbol: keyword,
                        byte_len: len,
                        keyword_corrected: true,
                    });
                }
            }
            if !valid.contains(symbol) {
                continue;
            }
        }
        return Some(ScannedToken {
            symbol,
            byte_len: len,
            keyword_corrected: false,
        });
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::language::LanguageBuilder;

    fn tiny_language() -> std::sync::Arc<Language> {
        let mut builder = LanguageBuilder::new("tiny");
        builder.word_token(
            "identifier",
            Pattern::Seq(vec![
                Pattern::CharClass(CharSet::alpha()),
                Pattern::repeat0(CharSet::word()),
            ]),
        );
        builder.token("number", Pattern::repeat1(CharSet::digits()));
        builder.literal("+");
        builder.extra("whitespace", Pattern::repeat1(CharSet::whitespace()));
        builder.keyword("let");
        builder.prod("expr", &["number"]);
        builder.prod("expr", &["identifier"]);
        builder.prod("expr", &["let", "identifier"]);
        builder.prod("expr", &["expr", "+", "expr"]);
        builder.finish("expr").unwrap()
    }

    fn set_of(language: &Language, names: &[&str]) -> TerminalSet {
        let mut set = TerminalSet::new();
        for name in names {
            set.insert(language.symbol_for_name(name).unwrap());
        }
        set
    }

    #[test]
    fn longest_match_wins() {
        let language = tiny_language();
        let valid = set_of(&language, &["number", "identifier"]);
        let token = scan(
            &language,
            b"1234+",
            TextSize::zero(),
            Point::zero(),
            &valid,
        )
        .unwrap();
        assert_eq!(token.symbol, language.symbol_for_name("number").unwrap());
        assert_eq!(token.byte_len, 4);
    }

    #[test]
    fn equal_length_match_breaks_to_lowest_symbol_id() {
        let mut builder = LanguageBuilder::new("tie");
        let first = builder.token("alpha_run", Pattern::repeat1(CharSet::alpha()));
        let second = builder.token("word_run", Pattern::repeat1(CharSet::word()));
        builder.prod("expr", &["alpha_run"]);
        builder.prod("expr", &["word_run"]);
        let language = builder.finish("expr").unwrap();

        let mut valid = TerminalSet::new();
        valid.insert(first);
        valid.insert(second);
        // Both rules match "abc" at length 3; the earlier declaration wins.
        let token = scan(&language, b"abc", TextSize::zero(), Point::zero(), &valid).unwrap();
        assert_eq!(token.symbol, first);
        assert_eq!(token.byte_len, 3);
    }

    #[test]
    fn extras_always_permitted() {
        let language = tiny_language();
        let valid = set_of(&language, &["number"]);
        let token = scan(&language, b"  12", TextSize::zero(), Point::zero(), &valid).unwrap();
        assert_eq!(
            token.symbol,
            language.symbol_for_name("whitespace").unwrap()
        );
        assert_eq!(token.byte_len, 2);
    }

    #[test]
    fn keyword_correction_applies_when_keyword_valid() {
        let language = tiny_language();
        let valid = set_of(&language, &["let", "number"]);
        let token = scan(&language, b"let x", TextSize::zero(), Point::zero(), &valid).unwrap();
        assert_eq!(token.symbol, language.symbol_for_name("let").unwrap());
        assert!(token.keyword_corrected);
        assert_eq!(token.byte_len, 3);
    }

    #[test]
    fn keyword_text_stays_word_when_keyword_invalid() {
        let language = tiny_language();
        let valid = set_of(&language, &["identifier"]);
        let token = scan(&language, b"let x", TextSize::zero(), Point::zero(), &valid).unwrap();
        assert_eq!(
            token.symbol,
            language.symbol_for_name("identifier").unwrap()
        );
        assert!(!token.keyword_corrected);
    }

    #[test]
    fn no_match_is_none() {
        let language = tiny_language();
        let valid = set_of(&language, &["number"]);
        assert!(scan(&language, b"#", TextSize::zero(), Point::zero(), &valid).is_none());
        assert!(scan(&language, b"", TextSize::zero(), Point::zero(), &valid).is_none());
    }

    struct PercentScanner {
        symbol: Symbol,
    }

    impl ExternalScanner for PercentScanner {
        fn scan(&self, context: &ScanContext<'_>, valid: &TerminalSet) -> Option<ExternalToken> {
            if !valid.contains(self.symbol) {
                return None;
            }
            let len = context.rest().iter().take_while(|&&b| b == b'%').count();
            (len > 0).then_some(ExternalToken {
                symbol: self.symbol,
                byte_len: len,
            })
        }
    }

    #[test]
    fn external_scanner_runs_before_default_rules() {
        let mut builder = LanguageBuilder::new("ext");
        builder.token("number", Pattern::repeat1(CharSet::digits()));
        let percent = builder.external_token("percents");
        builder.prod("expr", &["percents"]);
        builder.prod("expr", &["number"]);
        builder.external_scanner(std::sync::Arc::new(PercentScanner { symbol: percent }));
        let language = builder.finish("expr").unwrap();

        let mut valid = TerminalSet::new();
        valid.insert(language.symbol_for_name("percents").unwrap());
        let token = scan(&language, b"%%%4", TextSize::zero(), Point::zero(), &valid).unwrap();
        assert_eq!(token.symbol, language.symbol_for_name("percents").unwrap());
        assert_eq!(token.byte_len, 3);
    }
}
