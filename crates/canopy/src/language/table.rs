//! Action and goto tables consumed by the parse engine.
//!
//! A cell may hold more than one action: those are the points where the
//! engine forks parse heads. Cells are kept sorted (shifts first, then
//! reduces by production id) so fork order is stable.

use crate::language::{FieldId, Symbol};
use smallvec::SmallVec;

/// Parser state identifier.
pub type StateId = usize;

/// The state every parse starts in.
pub const START_STATE: StateId = 0;

/// Operator associativity attached to productions and terminals.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum Assoc {
    Left,
    Right,
    #[default]
    None,
}

/// One action in a parse table cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseAction {
    Shift {
        state: StateId,
    },
    /// Reduce carries its disambiguation metadata so conflicting reduces
    /// can be ranked at reduce time without a separate pass.
    Reduce {
        production: u16,
        child_count: u16,
        precedence: i32,
        associativity: Assoc,
    },
    Accept,
}

impl ParseAction {
    /// Sort key: shifts ahead of reduces, reduces by production id,
    /// accept last. Keeps fork order deterministic.
    #[must_use]
    pub(crate) const fn order_key(self) -> u32 {
        match self {
            Self::Shift { .. } => 0,
            Self::Reduce { production, .. } => 1 + production as u32,
            Self::Accept => u32::MAX,
        }
    }
}

/// A production of the grammar, as recorded in the language artifact.
#[derive(Debug, Clone)]
pub struct Production {
    pub lhs: Symbol,
    pub rhs: Vec<Symbol>,
    pub precedence: i32,
    pub associativity: Assoc,
    /// Field assignments: (rhs slot, field id).
    pub fields: SmallVec<[(u16, FieldId); 2]>,
    /// Alias assignments: (rhs slot, alias symbol).
    pub aliases: SmallVec<[(u16, Symbol); 1]>,
}

impl Production {
    #[must_use]
    pub fn child_count(&self) -> u16 {
        u16::try_from(self.rhs.len()).unwrap_or(u16::MAX)
    }
}

/// A fixed-size bitset over terminal symbol ids.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TerminalSet {
    blocks: SmallVec<[u64; 2]>,
}

impl TerminalSet {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, symbol: Symbol) {
        let index = symbol.index();
        let block = index / 64;
        if block >= self.blocks.len() {
            self.blocks.resize(block + 1, 0);
        }
        self.blocks[block] |= 1 << (index % 64);
    }

    #[must_use]
    pub fn contains(&self, symbol: Symbol) -> bool {
        let index = symbol.index();
        self.blocks
            .get(index / 64)
            .is_some_and(|block| block & (1 << (index % 64)) != 0)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.blocks.iter().all(|b| *b == 0)
    }

    /// Iterate members in ascending symbol order.
    pub fn iter(&self) -> impl Iterator<Item = Symbol> + '_ {
        self.blocks.iter().enumerate().flat_map(|(i, block)| {
            (0..64).filter_map(move |bit| {
                if block & (1 << bit) != 0 {
                    Some(Symbol::new(u16::try_from(i * 64 + bit).unwrap_or(u16::MAX)))
                } else {
                    None
                }
            })
        })
    }

    pub fn extend(&mut self, other: &Self) {
        if other.blocks.len() > self.blocks.len() {
            self.blocks.resize(other.blocks.len(), 0);
        }
        for (dst, src) in self.blocks.iter_mut().zip(other.blocks.iter()) {
            *dst |= *src;
        }
    }
}

/// Per-state row: terminal actions, nonterminal gotos, and the set of
/// terminals the lexer may produce in this state.
#[derive(Debug, Clone, Default)]
pub struct StateRow {
    /// Sorted by terminal symbol id.
    pub(crate) actions: Vec<(Symbol, SmallVec<[ParseAction; 2]>)>,
    /// Sorted by nonterminal symbol id.
    pub(crate) gotos: Vec<(Symbol, StateId)>,
    pub(crate) valid: TerminalSet,
}

impl StateRow {
    #[must_use]
    pub fn actions_for(&self, terminal: Symbol) -> &[ParseAction] {
        match self.actions.binary_search_by_key(&terminal, |(s, _)| *s) {
            Ok(i) => &self.actions[i].1,
            Err(_) => &[],
        }
    }

    #[must_use]
    pub fn goto(&self, nonterminal: Symbol) -> Option<StateId> {
        self.gotos
            .binary_search_by_key(&nonterminal, |(s, _)| *s)
            .ok()
            .map(|i| self.gotos[i].1)
    }
}

/// The complete action/goto table.
#[derive(Debug, Clone, Default)]
pub struct ParseTable {
    pub(crate) states: Vec<StateRow>,
    pub(crate) productions: Vec<Production>,
}

impl ParseTable {
    #[must_use]
    pub fn state_count(&self) -> usize {
        self.states.len()
    }

    #[must_use]
    pub fn actions(&self, state: StateId, terminal: Symbol) -> &[ParseAction] {
        self.states
            .get(state)
            .map_or(&[][..], |row| row.actions_for(terminal))
    }

    #[must_use]
    pub fn goto(&self, state: StateId, nonterminal: Symbol) -> Option<StateId> {
        self.states.get(state).and_then(|row| row.goto(nonterminal))
    }

    #[must_use]
    pub fn valid_terminals(&self, state: StateId) -> &TerminalSet {
        static EMPTY: TerminalSet = TerminalSet {
            blocks: SmallVec::new_const(),
        };
        self.states.get(state).map_or(&EMPTY, |row| &row.valid)
    }

    #[must_use]
    pub fn production(&self, id: u16) -> Option<&Production> {
        self.productions.get(id as usize)
    }
}
