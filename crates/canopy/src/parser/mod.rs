//! # Parsing
//!
//! [`Parser`] drives the GLR engine over a [`TextInput`], optionally
//! reusing subtrees from an edited previous [`Tree`]. A parser is cheap to
//! keep around and reuse; the language it parses is set once and shared.

mod engine;
mod recovery;
mod reuse;
mod stack;

use crate::error::ParseError;
use crate::input::TextInput;
use crate::language::Language;
use crate::syntax::Tree;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// A flag that can stop an in-flight parse from another thread.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    flag: Arc<AtomicBool>,
}

impl CancellationToken {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.flag.store(true, Ordering::Relaxed);
    }

    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::Relaxed)
    }
}

/// Engine tuning knobs.
#[derive(Debug, Clone)]
pub struct ParserConfig {
    /// Upper bound on simultaneously live parse heads. Beyond it the
    /// cheapest heads are retained; the drop is lossy and surfaced in
    /// [`ParseMetrics::heads_pruned`], never an error.
    pub max_heads: usize,
    /// Cap on consecutive reductions without consuming input, against
    /// cyclic grammars.
    pub max_reduce_depth: u32,
    /// Wall-clock budget for one parse call.
    pub timeout: Option<Duration>,
    /// External cancellation flag, polled periodically.
    pub cancellation: Option<CancellationToken>,
}

impl Default for ParserConfig {
    fn default() -> Self {
        Self {
            max_heads: 64,
            max_reduce_depth: 256,
            timeout: None,
            cancellation: None,
        }
    }
}

/// Counters from the most recent parse call.
#[derive(Debug, Clone, Default)]
pub struct ParseMetrics {
    pub tokens_lexed: usize,
    pub nodes_created: usize,
    /// Nodes spliced verbatim from the previous tree.
    pub nodes_reused: usize,
    /// Leaf tokens served from the per-parse dedup pool.
    pub leaf_cache_hits: usize,
    pub heads_pruned: usize,
    pub recoveries: usize,
    pub elapsed: Duration,
}

/// A reusable parser for one [`Language`].
#[derive(Default)]
pub struct Parser {
    language: Option<Arc<Language>>,
    config: ParserConfig,
    metrics: ParseMetrics,
}

impl Parser {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_config(config: ParserConfig) -> Self {
        Self {
            config,
            ..Self::default()
        }
    }

    pub fn set_language(&mut self, language: Arc<Language>) {
        self.language = Some(language);
    }

    #[must_use]
    pub fn language(&self) -> Option<&Arc<Language>> {
        self.language.as_ref()
    }

    pub fn set_config(&mut self, config: ParserConfig) {
        self.config = config;
    }

    #[must_use]
    pub fn config(&self) -> &ParserConfig {
        &self.config
    }

    /// Parse a string. Pass the edited previous tree to parse
    /// incrementally; pass `None` for a from-scratch parse. The result is
    /// structurally identical either way.
    pub fn parse(&mut self, text: &str, old_tree: Option<&Tree>) -> Result<Tree, ParseError> {
        let mut input = text;
        self.parse_with(&mut input, old_tree)
    }

    /// Parse from a chunked input source.
    pub fn parse_with(
        &mut self,
        input: &mut dyn TextInput,
        old_tree: Option<&Tree>,
    ) -> Result<Tree, ParseError> {
        let language = self.language.clone().ok_or(ParseError::NoLanguage)?;
        // A tree from another language cannot seed reuse.
        let old_tree = old_tree.filter(|tree| Arc::ptr_eq(tree.language(), &language));
        self.metrics = ParseMetrics::default();
        let started = Instant::now();
        let result =
            engine::Engine::new(language, &self.config, &mut self.metrics, input, old_tree).run();
        self.metrics.elapsed = started.elapsed();
        result
    }

    /// Counters from the most recent [`Self::parse`] call.
    #[must_use]
    pub fn last_metrics(&self) -> &ParseMetrics {
        &self.metrics
    }
}
