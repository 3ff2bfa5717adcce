//! # Programmatic language construction
//!
//! [`LanguageBuilder`] is the producer side of the language artifact: it
//! declares symbols and productions, then compiles an SLR(1) action/goto
//! table. Conflicting actions are *kept* in their cell after precedence and
//! associativity pruning; those cells are where the engine forks parse
//! heads.
//!
//! State numbering, cell ordering, and item-set exploration all iterate in
//! sorted order so the same declarations always compile to the same table.

use crate::error::LanguageError;
use crate::language::table::{
    Assoc, ParseAction, ParseTable, Production, StateRow, TerminalSet,
};
use crate::language::{
    FieldId, Language, RawLanguage, StateId, Symbol, SymbolInfo, SymbolKind, LANGUAGE_VERSION,
};
use crate::lexer::{ExternalScanner, Pattern};
use ahash::RandomState;
use compact_str::CompactString;
use hashbrown::{HashMap, HashSet};
use smallvec::SmallVec;
use std::sync::Arc;

/// One declared production, with names left unresolved until
/// [`LanguageBuilder::finish`].
pub struct ProductionRule {
    lhs: Symbol,
    rhs: Vec<Symbol>,
    precedence: i32,
    associativity: Assoc,
    field_names: SmallVec<[(u16, CompactString); 2]>,
    alias_names: SmallVec<[(u16, CompactString, bool); 1]>,
}

impl ProductionRule {
    pub fn prec(&mut self, precedence: i32) -> &mut Self {
        self.precedence = precedence;
        self
    }

    /// Left-associative at the given precedence.
    pub fn left(&mut self, precedence: i32) -> &mut Self {
        self.precedence = precedence;
        self.associativity = Assoc::Left;
        self
    }

    /// Right-associative at the given precedence.
    pub fn right(&mut self, precedence: i32) -> &mut Self {
        self.precedence = precedence;
        self.associativity = Assoc::Right;
        self
    }

    /// Assign a field name to the child at `slot`.
    pub fn field(&mut self, slot: usize, name: &str) -> &mut Self {
        self.field_names
            .push((u16::try_from(slot).unwrap_or(u16::MAX), name.into()));
        self
    }

    /// Surface the child at `slot` under a different kind name.
    pub fn alias(&mut self, slot: usize, name: &str, named: bool) -> &mut Self {
        self.alias_names
            .push((u16::try_from(slot).unwrap_or(u16::MAX), name.into(), named));
        self
    }
}

/// Builds a [`Language`] from declarations. Symbols get their ids in
/// declaration order; nonterminals whose names start with `_` are hidden
/// and splice their children into the parent.
pub struct LanguageBuilder {
    name: CompactString,
    symbols: Vec<SymbolInfo>,
    patterns: Vec<Option<Pattern>>,
    by_name: HashMap<CompactString, Symbol, RandomState>,
    keywords: Vec<(CompactString, Symbol)>,
    word_token: Option<Symbol>,
    extras: Vec<Symbol>,
    externals: Vec<Arc<dyn ExternalScanner>>,
    rules: Vec<ProductionRule>,
    duplicate: Option<String>,
}

impl LanguageBuilder {
    #[must_use]
    pub fn new(name: &str) -> Self {
        let mut builder = Self {
            name: name.into(),
            symbols: Vec::new(),
            patterns: Vec::new(),
            by_name: HashMap::default(),
            keywords: Vec::new(),
            word_token: None,
            extras: Vec::new(),
            externals: Vec::new(),
            rules: Vec::new(),
            duplicate: None,
        };
        builder.push_symbol(
            SymbolInfo {
                name: "end".into(),
                kind: SymbolKind::Terminal,
                named: false,
                extra: false,
                hidden: false,
                keyword: false,
            },
            None,
        );
        builder.push_symbol(
            SymbolInfo {
                name: "ERROR".into(),
                kind: SymbolKind::NonTerminal,
                named: true,
                extra: false,
                hidden: false,
                keyword: false,
            },
            None,
        );
        builder
    }

    fn push_symbol(&mut self, info: SymbolInfo, pattern: Option<Pattern>) -> Symbol {
        let symbol = Symbol::new(u16::try_from(self.symbols.len()).unwrap_or(u16::MAX));
        self.by_name.insert(info.name.clone(), symbol);
        self.symbols.push(info);
        self.patterns.push(pattern);
        symbol
    }

    fn declare_terminal(&mut self, name: &str, pattern: Option<Pattern>, named: bool) -> Symbol {
        if let Some(&existing) = self.by_name.get(name) {
            if self.symbols[existing.index()].kind != SymbolKind::Terminal {
                self.duplicate = Some(name.to_owned());
            }
            return existing;
        }
        self.push_symbol(
            SymbolInfo {
                name: name.into(),
                kind: SymbolKind::Terminal,
                named,
                extra: false,
                hidden: false,
                keyword: false,
            },
            pattern,
        )
    }

    fn intern_nonterminal(&mut self, name: &str) -> Symbol {
        if let Some(&existing) = self.by_name.get(name) {
            return existing;
        }
        let hidden = name.starts_with('_');
        self.push_symbol(
            SymbolInfo {
                name: name.into(),
                kind: SymbolKind::NonTerminal,
                named: !hidden,
                extra: false,
                hidden,
                keyword: false,
            },
            None,
        )
    }

    /// A named terminal with a lexical rule.
    pub fn token(&mut self, name: &str, pattern: Pattern) -> Symbol {
        self.declare_terminal(name, Some(pattern), true)
    }

    /// An anonymous terminal matching exactly its own spelling.
    pub fn literal(&mut self, text: &str) -> Symbol {
        self.declare_terminal(text, Some(Pattern::literal(text)), false)
    }

    /// A named terminal the lexer may produce anywhere, outside the
    /// derivation (whitespace, comments).
    pub fn extra(&mut self, name: &str, pattern: Pattern) -> Symbol {
        let symbol = self.declare_terminal(name, Some(pattern), true);
        self.symbols[symbol.index()].extra = true;
        self.extras.push(symbol);
        symbol
    }

    /// The word token: its matches are re-checked against the keyword
    /// table.
    pub fn word_token(&mut self, name: &str, pattern: Pattern) -> Symbol {
        let symbol = self.declare_terminal(name, Some(pattern), true);
        self.word_token = Some(symbol);
        symbol
    }

    /// A keyword, reachable only through keyword correction of the word
    /// token. It has no lexical rule of its own.
    pub fn keyword(&mut self, text: &str) -> Symbol {
        let symbol = self.declare_terminal(text, None, false);
        self.symbols[symbol.index()].keyword = true;
        self.keywords.push((text.into(), symbol));
        symbol
    }

    /// A terminal produced only by an external scanner.
    pub fn external_token(&mut self, name: &str) -> Symbol {
        self.declare_terminal(name, None, true)
    }

    pub fn external_scanner(&mut self, scanner: Arc<dyn ExternalScanner>) {
        self.externals.push(scanner);
    }

    /// Declare a production `lhs -> rhs`. Unknown rhs names become
    /// nonterminals; a nonterminal left without productions fails `finish`.
    pub fn prod(&mut self, lhs: &str, rhs: &[&str]) -> &mut ProductionRule {
        let lhs = self.intern_nonterminal(lhs);
        let rhs = rhs
            .iter()
            .copied()
            .map(|name| match self.by_name.get(name) {
                Some(&symbol) => symbol,
                None => self.intern_nonterminal(name),
            })
            .collect();
        self.rules.push(ProductionRule {
            lhs,
            rhs,
            precedence: 0,
            associativity: Assoc::None,
            field_names: SmallVec::new(),
            alias_names: SmallVec::new(),
        });
        let index = self.rules.len() - 1;
        &mut self.rules[index]
    }

    /// Compile the declarations into a frozen [`Language`].
    pub fn finish(mut self, entry: &str) -> Result<Arc<Language>, LanguageError> {
        if let Some(name) = self.duplicate.take() {
            return Err(LanguageError::DuplicateSymbol { name });
        }
        let entry = *self
            .by_name
            .get(entry)
            .ok_or(LanguageError::InvalidEntryPoint)?;
        if self.symbols[entry.index()].kind != SymbolKind::NonTerminal {
            return Err(LanguageError::InvalidEntryPoint);
        }
        for (index, info) in self.symbols.iter().enumerate() {
            let symbol = Symbol::new(u16::try_from(index).unwrap_or(u16::MAX));
            if info.kind == SymbolKind::NonTerminal
                && symbol != Symbol::ERROR
                && !self.rules.iter().any(|rule| rule.lhs == symbol)
            {
                return Err(LanguageError::MissingProductions {
                    name: info.name.to_string(),
                });
            }
        }

        // Resolve field names in first-appearance order.
        let mut fields: Vec<CompactString> = Vec::new();
        let field_id = |name: &CompactString, fields: &mut Vec<CompactString>| {
            let index = match fields.iter().position(|f| f == name) {
                Some(i) => i,
                None => {
                    fields.push(name.clone());
                    fields.len() - 1
                }
            };
            FieldId::new(u16::try_from(index).unwrap_or(u16::MAX))
        };

        // Resolve alias names to (possibly fresh) symbols.
        let alias_symbol = |name: &CompactString, named: bool, this: &mut Self| {
            match this.by_name.get(name.as_str()) {
                Some(&symbol) => symbol,
                None => this.push_symbol(
                    SymbolInfo {
                        name: name.clone(),
                        kind: SymbolKind::Terminal,
                        named,
                        extra: false,
                        hidden: false,
                        keyword: false,
                    },
                    None,
                ),
            }
        };

        let mut productions = Vec::with_capacity(self.rules.len() + 1);
        let rules = std::mem::take(&mut self.rules);
        for rule in rules {
            let mut prod_fields: SmallVec<[(u16, FieldId); 2]> = SmallVec::new();
            for (slot, name) in &rule.field_names {
                if *slot as usize >= rule.rhs.len() {
                    return Err(LanguageError::MalformedSymbolTable);
                }
                prod_fields.push((*slot, field_id(name, &mut fields)));
            }
            let mut prod_aliases: SmallVec<[(u16, Symbol); 1]> = SmallVec::new();
            for (slot, name, named) in &rule.alias_names {
                if *slot as usize >= rule.rhs.len() {
                    return Err(LanguageError::MalformedSymbolTable);
                }
                prod_aliases.push((*slot, alias_symbol(name, *named, &mut self)));
            }
            prod_fields.sort_unstable_by_key(|(slot, _)| *slot);
            prod_aliases.sort_unstable_by_key(|(slot, _)| *slot);
            productions.push(Production {
                lhs: rule.lhs,
                rhs: rule.rhs,
                precedence: rule.precedence,
                associativity: rule.associativity,
                fields: prod_fields,
                aliases: prod_aliases,
            });
        }

        // Augmented start production, appended last so declared production
        // ids stay stable. Its completion becomes the Accept action.
        let start_symbol = self.push_symbol(
            SymbolInfo {
                name: "__start".into(),
                kind: SymbolKind::NonTerminal,
                named: false,
                extra: false,
                hidden: true,
                keyword: false,
            },
            None,
        );
        let augmented = productions.len();
        productions.push(Production {
            lhs: start_symbol,
            rhs: vec![entry],
            precedence: 0,
            associativity: Assoc::None,
            fields: SmallVec::new(),
            aliases: SmallVec::new(),
        });

        let states = build_states(&self.symbols, &productions, augmented)?;

        let mut keywords = std::mem::take(&mut self.keywords);
        keywords.sort_unstable_by(|a, b| a.0.cmp(&b.0));

        Language::from_raw(RawLanguage {
            name: self.name,
            version: LANGUAGE_VERSION,
            symbols: self.symbols,
            table: ParseTable {
                states,
                productions,
            },
            patterns: self.patterns,
            keywords,
            word_token: self.word_token,
            extras: self.extras,
            fields,
            externals: self.externals,
            entry,
        })
    }
}

/// An LR(0) item: a production with a dot position.
type Item = (usize, usize);

fn build_states(
    symbols: &[SymbolInfo],
    productions: &[Production],
    augmented: usize,
) -> Result<Vec<StateRow>, LanguageError> {
    let is_terminal =
        |symbol: Symbol| symbols[symbol.index()].kind == SymbolKind::Terminal;

    let mut by_lhs: HashMap<Symbol, Vec<usize>, RandomState> = HashMap::default();
    for (id, production) in productions.iter().enumerate() {
        by_lhs.entry(production.lhs).or_default().push(id);
    }

    let closure = |kernel: &[Item]| -> Vec<Item> {
        let mut items: Vec<Item> = kernel.to_vec();
        let mut seen: HashSet<Item, RandomState> = items.iter().copied().collect();
        let mut queue: Vec<Item> = items.clone();
        while let Some((prod, dot)) = queue.pop() {
            let rhs = &productions[prod].rhs;
            if let Some(&next) = rhs.get(dot) {
                if !is_terminal(next) {
                    if let Some(prods) = by_lhs.get(&next) {
                        for &p in prods {
                            let item = (p, 0);
                            if seen.insert(item) {
                                items.push(item);
                                queue.push(item);
                            }
                        }
                    }
                }
            }
        }
        items.sort_unstable();
        items
    };

    // Canonical LR(0) collection, states numbered in BFS discovery order
    // over sorted transition symbols.
    let start = closure(&[(augmented, 0)]);
    let mut state_ids: HashMap<Vec<Item>, StateId, RandomState> = HashMap::default();
    let mut item_sets: Vec<Vec<Item>> = vec![start.clone()];
    state_ids.insert(start, 0);
    let mut transitions: Vec<Vec<(Symbol, StateId)>> = Vec::new();
    let mut cursor = 0;
    while cursor < item_sets.len() {
        let items = item_sets[cursor].clone();
        let mut moves: Vec<Symbol> = items
            .iter()
            .filter_map(|&(prod, dot)| productions[prod].rhs.get(dot).copied())
            .collect();
        moves.sort_unstable();
        moves.dedup();
        let mut outgoing = Vec::with_capacity(moves.len());
        for symbol in moves {
            let kernel: Vec<Item> = items
                .iter()
                .filter(|&&(prod, dot)| productions[prod].rhs.get(dot) == Some(&symbol))
                .map(|&(prod, dot)| (prod, dot + 1))
                .collect();
            let next = closure(&kernel);
            let id = match state_ids.get(&next) {
                Some(&id) => id,
                None => {
                    let id = item_sets.len();
                    state_ids.insert(next.clone(), id);
                    item_sets.push(next);
                    id
                }
            };
            outgoing.push((symbol, id));
        }
        transitions.push(outgoing);
        cursor += 1;
    }

    let (first, nullable) = first_sets(symbols, productions);
    let follow = follow_sets(symbols, productions, augmented, &first, &nullable);

    let mut states = Vec::with_capacity(item_sets.len());
    for (items, outgoing) in item_sets.iter().zip(&transitions) {
        let mut actions: HashMap<Symbol, SmallVec<[ParseAction; 2]>, RandomState> =
            HashMap::default();
        let mut gotos: Vec<(Symbol, StateId)> = Vec::new();
        let mut shift_prec: HashMap<Symbol, i32, RandomState> = HashMap::default();

        for &(prod, dot) in items {
            if let Some(&next) = productions[prod].rhs.get(dot) {
                if is_terminal(next) {
                    let entry = shift_prec.entry(next).or_insert(i32::MIN);
                    *entry = (*entry).max(productions[prod].precedence);
                }
            }
        }
        for &(symbol, target) in outgoing {
            if is_terminal(symbol) {
                actions
                    .entry(symbol)
                    .or_default()
                    .push(ParseAction::Shift { state: target });
            } else {
                gotos.push((symbol, target));
            }
        }
        for &(prod, dot) in items {
            if dot != productions[prod].rhs.len() {
                continue;
            }
            if prod == augmented {
                actions
                    .entry(Symbol::END)
                    .or_default()
                    .push(ParseAction::Accept);
                continue;
            }
            let production = &productions[prod];
            let reduce = ParseAction::Reduce {
                production: u16::try_from(prod).map_err(|_| LanguageError::MalformedSymbolTable)?,
                child_count: production.child_count(),
                precedence: production.precedence,
                associativity: production.associativity,
            };
            for terminal in follow[production.lhs.index()].iter() {
                actions.entry(terminal).or_default().push(reduce);
            }
        }

        // Precedence/associativity pruning; surviving multi-action cells
        // are fork points.
        let mut cells: Vec<(Symbol, SmallVec<[ParseAction; 2]>)> = actions
            .into_iter()
            .map(|(symbol, cell)| {
                (
                    symbol,
                    resolve_cell(cell, shift_prec.get(&symbol).copied()),
                )
            })
            .collect();
        cells.sort_unstable_by_key(|(symbol, _)| *symbol);
        gotos.sort_unstable_by_key(|(symbol, _)| *symbol);

        let mut valid = TerminalSet::new();
        for (symbol, _) in &cells {
            valid.insert(*symbol);
        }
        states.push(StateRow {
            actions: cells,
            gotos,
            valid,
        });
    }
    Ok(states)
}

/// Apply precedence/associativity to one cell, keeping whatever genuinely
/// conflicts.
fn resolve_cell(
    mut cell: SmallVec<[ParseAction; 2]>,
    shift_prec: Option<i32>,
) -> SmallVec<[ParseAction; 2]> {
    cell.sort_unstable_by_key(|action| action.order_key());
    cell.dedup();
    let has_shift = matches!(cell.first(), Some(ParseAction::Shift { .. }));
    if !has_shift {
        // Reduce/reduce: a strictly higher precedence wins; equal
        // precedences stay and fork.
        let best = cell
            .iter()
            .filter_map(|action| match action {
                ParseAction::Reduce { precedence, .. } => Some(*precedence),
                _ => None,
            })
            .max();
        if let Some(best) = best {
            cell.retain(|action| match action {
                ParseAction::Reduce { precedence, .. } => *precedence == best,
                _ => true,
            });
        }
        return cell;
    }
    let Some(shift_prec) = shift_prec else {
        return cell;
    };
    let mut keep_shift = true;
    cell.retain(|action| match *action {
        ParseAction::Reduce {
            precedence,
            associativity,
            ..
        } => {
            if precedence > shift_prec {
                keep_shift = false;
                true
            } else if precedence < shift_prec {
                false
            } else {
                match associativity {
                    Assoc::Left => {
                        keep_shift = false;
                        true
                    }
                    Assoc::Right => false,
                    Assoc::None => true,
                }
            }
        }
        _ => true,
    });
    if !keep_shift {
        cell.retain(|action| !matches!(action, ParseAction::Shift { .. }));
    }
    cell
}

fn first_sets(
    symbols: &[SymbolInfo],
    productions: &[Production],
) -> (Vec<TerminalSet>, Vec<bool>) {
    let mut first = vec![TerminalSet::new(); symbols.len()];
    let mut nullable = vec![false; symbols.len()];
    for (index, info) in symbols.iter().enumerate() {
        if info.kind == SymbolKind::Terminal {
            first[index].insert(Symbol::new(u16::try_from(index).unwrap_or(u16::MAX)));
        }
    }
    loop {
        let mut changed = false;
        for production in productions {
            let lhs = production.lhs.index();
            let mut all_nullable = true;
            for &symbol in &production.rhs {
                let before = first[lhs].clone();
                let addition = first[symbol.index()].clone();
                first[lhs].extend(&addition);
                if first[lhs] != before {
                    changed = true;
                }
                if !nullable[symbol.index()] {
                    all_nullable = false;
                    break;
                }
            }
            if all_nullable && !nullable[lhs] {
                nullable[lhs] = true;
                changed = true;
            }
        }
        if !changed {
            break;
        }
    }
    (first, nullable)
}

fn follow_sets(
    symbols: &[SymbolInfo],
    productions: &[Production],
    augmented: usize,
    first: &[TerminalSet],
    nullable: &[bool],
) -> Vec<TerminalSet> {
    let mut follow = vec![TerminalSet::new(); symbols.len()];
    follow[productions[augmented].lhs.index()].insert(Symbol::END);
    loop {
        let mut changed = false;
        for production in productions {
            for (i, &symbol) in production.rhs.iter().enumerate() {
                if symbols[symbol.index()].kind == SymbolKind::Terminal {
                    continue;
                }
                let target = symbol.index();
                let mut rest_nullable = true;
                for &after in &production.rhs[i + 1..] {
                    let before = follow[target].clone();
                    let addition = first[after.index()].clone();
                    follow[target].extend(&addition);
                    if follow[target] != before {
                        changed = true;
                    }
                    if !nullable[after.index()] {
                        rest_nullable = false;
                        break;
                    }
                }
                if rest_nullable {
                    let before = follow[target].clone();
                    let addition = follow[production.lhs.index()].clone();
                    follow[target].extend(&addition);
                    if follow[target] != before {
                        changed = true;
                    }
                }
            }
        }
        if !changed {
            break;
        }
    }
    follow
}
