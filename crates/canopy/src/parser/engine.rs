//! # The GLR step loop
//!
//! The engine advances a set of parse heads over the input, always stepping
//! the head with the least consumed position so heads stay comparable. One
//! action advances a head directly; a multi-action cell forks it; an empty
//! cell hands it to recovery, which forks repair candidates instead of
//! failing. Heads that converge on the same (position, state, top symbol)
//! merge, keeping the cheaper interpretation, and the set is pruned to a
//! configured bound.
//!
//! Ordering is deliberate everywhere: heads step in (position, cost,
//! sequence) order, forks inherit the sorted action order of their cell,
//! and merges break ties toward the older head. The same input therefore
//! always yields the same tree.

use crate::error::ParseError;
use crate::input::{InputBuffer, TextInput};
use crate::language::{FieldId, Language, ParseAction, StateId, Symbol};
use crate::lexer::{self, ScannedToken};
use crate::parser::recovery::{self, PendingItem};
use crate::parser::reuse::ReuseCursor;
use crate::parser::stack::ParseStack;
use crate::parser::{ParseMetrics, ParserConfig};
use crate::syntax::pool::SubtreePool;
use crate::syntax::{Point, PointDelta, Subtree, SubtreeFlags, TextSize, Tree};
use smallvec::SmallVec;
use std::sync::Arc;
use std::time::Instant;

const CANCELLATION_POLL_INTERVAL: u64 = 64;

/// One parse thread: a stack, a position, unattached pending nodes, and
/// the accumulated recovery cost.
#[derive(Clone)]
pub(crate) struct Head {
    pub(crate) stack: ParseStack,
    pub(crate) byte: usize,
    pub(crate) point: Point,
    pub(crate) pending: Vec<PendingItem>,
    pub(crate) cost: u32,
    /// Consecutive reductions since input was last consumed.
    pub(crate) reductions: u32,
    /// States at the current position where a MISSING leaf was already
    /// inserted. Cleared whenever the position advances.
    missing_log: SmallVec<[StateId; 4]>,
    /// Creation order, the final determinism tie-break.
    pub(crate) seq: u64,
}

impl Head {
    fn new() -> Self {
        Self {
            stack: ParseStack::new(),
            byte: 0,
            point: Point::zero(),
            pending: Vec::new(),
            cost: 0,
            reductions: 0,
            missing_log: SmallVec::new(),
            seq: 0,
        }
    }

    pub(crate) fn missing_tried(&self, state: StateId) -> bool {
        self.missing_log.contains(&state)
    }

    pub(crate) fn log_missing(&mut self, state: StateId) {
        self.missing_log.push(state);
    }

    /// Consume the given raw input bytes.
    pub(crate) fn advance(&mut self, raw: &[u8]) {
        self.byte += raw.len();
        self.point += PointDelta::of_bytes(raw);
        self.reductions = 0;
        self.missing_log.clear();
    }

    fn advance_by(&mut self, len: TextSize, delta: PointDelta) {
        self.byte += len.into() as usize;
        self.point += delta;
        self.reductions = 0;
        self.missing_log.clear();
    }
}

enum Lookahead {
    Token { token: ScannedToken, raw: Vec<u8> },
    End,
    /// Nothing lexes here even with more input pulled; recovery consumes
    /// a character.
    Fail,
}

enum ApplyOutcome {
    Alive,
    Dead,
    Accepted { root: Subtree, cost: u32 },
}

pub(crate) struct Engine<'a> {
    language: Arc<Language>,
    config: &'a ParserConfig,
    input: &'a mut dyn TextInput,
    metrics: &'a mut ParseMetrics,
    buffer: InputBuffer,
    pool: SubtreePool,
    reuse: Option<ReuseCursor<'a>>,
    heads: Vec<Head>,
    accepted: Option<(Subtree, u32)>,
    /// The furthest-progressed dead head, for the wrap-everything
    /// fallback and for cancellation snapshots.
    stalled: Option<Head>,
    next_seq: u64,
    started: Instant,
}

impl<'a> Engine<'a> {
    pub(crate) fn new(
        language: Arc<Language>,
        config: &'a ParserConfig,
        metrics: &'a mut ParseMetrics,
        input: &'a mut dyn TextInput,
        old_tree: Option<&'a Tree>,
    ) -> Self {
        Self {
            language,
            config,
            input,
            metrics,
            buffer: InputBuffer::new(),
            pool: SubtreePool::new(),
            reuse: old_tree.map(ReuseCursor::new),
            heads: vec![Head::new()],
            accepted: None,
            stalled: None,
            next_seq: 1,
            started: Instant::now(),
        }
    }

    pub(crate) fn run(mut self) -> Result<Tree, ParseError> {
        let mut iterations: u64 = 0;
        while !self.heads.is_empty() {
            if iterations % CANCELLATION_POLL_INTERVAL == 0 && self.cancelled() {
                let root = self.snapshot_root();
                return Err(ParseError::Cancelled {
                    partial: Box::new(Tree::new(self.language.clone(), root)),
                });
            }
            iterations += 1;
            let index = self.next_head_index();
            if let Some((_, accepted_cost)) = &self.accepted {
                if self.heads[index].cost >= *accepted_cost {
                    self.heads.swap_remove(index);
                    continue;
                }
            }
            self.step(index);
            self.merge_heads();
            self.prune_heads();
        }

        self.metrics.leaf_cache_hits = self.pool.hits();
        let root = match self.accepted.take() {
            Some((root, _)) => root,
            // No head reached an acceptance; wrap whatever the best
            // attempt consumed so the caller still gets a tree.
            None => self.snapshot_root(),
        };
        Ok(Tree::new(self.language.clone(), root))
    }

    fn cancelled(&self) -> bool {
        if let Some(flag) = &self.config.cancellation {
            if flag.is_cancelled() {
                return true;
            }
        }
        if let Some(timeout) = self.config.timeout {
            if self.started.elapsed() >= timeout {
                return true;
            }
        }
        false
    }

    /// The head to advance: least position, then cheapest, then oldest.
    fn next_head_index(&self) -> usize {
        let mut best = 0;
        for (index, head) in self.heads.iter().enumerate().skip(1) {
            let challenger = (head.byte, head.cost, head.seq);
            let incumbent = (
                self.heads[best].byte,
                self.heads[best].cost,
                self.heads[best].seq,
            );
            if challenger < incumbent {
                best = index;
            }
        }
        best
    }

    fn next_seq(&mut self) -> u64 {
        let seq = self.next_seq;
        self.next_seq += 1;
        seq
    }

    fn step(&mut self, index: usize) {
        let mut head = self.heads.swap_remove(index);

        // Incremental splice, attempted only on a deterministic stretch.
        if self.heads.is_empty() && self.try_reuse(&mut head) {
            self.heads.push(head);
            return;
        }

        let lookahead = self.next_token(&mut head);
        let state = head.stack.state();
        let symbol = match &lookahead {
            Lookahead::Token { token, .. } => Some(token.symbol),
            Lookahead::End => Some(Symbol::END),
            Lookahead::Fail => None,
        };
        let actions: SmallVec<[ParseAction; 2]> = symbol
            .map(|symbol| self.language.table().actions(state, symbol).into())
            .unwrap_or_default();

        if actions.is_empty() {
            self.metrics.recoveries += 1;
            let mut candidates =
                recovery::candidates(&self.language, &head, self.buffer.slice_from(head.byte));
            if candidates.is_empty() {
                self.note_stalled(head);
                return;
            }
            for candidate in &mut candidates {
                candidate.seq = self.next_seq();
            }
            self.heads.extend(candidates);
            return;
        }

        // Fork for every action beyond the first; the original head takes
        // the first (the cell is sorted: shifts, then reduces by id).
        for action in actions.iter().skip(1).copied() {
            let mut fork = head.clone();
            fork.seq = self.next_seq();
            match self.apply(&mut fork, action, &lookahead) {
                ApplyOutcome::Alive => self.heads.push(fork),
                ApplyOutcome::Dead => self.note_stalled(fork),
                ApplyOutcome::Accepted { root, cost } => self.note_accepted(root, cost),
            }
        }
        match self.apply(&mut head, actions[0], &lookahead) {
            ApplyOutcome::Alive => self.heads.push(head),
            ApplyOutcome::Dead => self.note_stalled(head),
            ApplyOutcome::Accepted { root, cost } => self.note_accepted(root, cost),
        }
    }

    fn try_reuse(&mut self, head: &mut Head) -> bool {
        let Some(reuse) = self.reuse.as_mut() else {
            return false;
        };
        let target = TextSize::from(u32::try_from(head.byte).unwrap_or(u32::MAX));
        let Some((subtree, next)) = reuse.find(target, head.stack.state(), &self.language) else {
            return false;
        };
        self.metrics.nodes_reused += subtree.descendant_count();
        let len = subtree.byte_len();
        let delta = subtree.point_len();
        let mut nodes = recovery::flush_pending(&mut head.pending);
        nodes.push(subtree);
        head.stack.push(next, nodes.into());
        head.advance_by(len, delta);
        true
    }

    /// Lex the next non-extra token at the head's position. Extras are
    /// attached to the head's pending list on the way.
    fn next_token(&mut self, head: &mut Head) -> Lookahead {
        loop {
            self.buffer.fill_past(self.input, head.byte);
            if self.buffer.slice_from(head.byte).is_empty() {
                return Lookahead::End;
            }
            let state = head.stack.state();
            let valid = self.language.table().valid_terminals(state);
            let token = lexer::scan(
                &self.language,
                self.buffer.slice_from(head.byte),
                TextSize::from(u32::try_from(head.byte).unwrap_or(u32::MAX)),
                head.point,
                valid,
            );
            // A match reaching the end of the buffered bytes (or no match
            // at all) may change with more input.
            if !self.buffer.at_end() {
                let buffered = self.buffer.len() - head.byte;
                let needs_more = match &token {
                    Some(token) => token.byte_len == buffered,
                    None => true,
                };
                if needs_more {
                    self.buffer.pull(self.input);
                    continue;
                }
            }
            let Some(token) = token else {
                return Lookahead::Fail;
            };
            self.metrics.tokens_lexed += 1;
            let raw = self.buffer.slice_from(head.byte)[..token.byte_len].to_vec();
            let acts_in_state = !self
                .language
                .table()
                .actions(state, token.symbol)
                .is_empty();
            if self.language.is_extra(token.symbol) && !acts_in_state {
                let flags = SubtreeFlags::IS_EXTRA
                    .union(SubtreeFlags::IS_NAMED.when(self.language.is_named(token.symbol)));
                let leaf = self.pool.leaf(token.symbol, &raw, state, flags);
                head.pending.push(PendingItem::Extra(leaf));
                head.advance(&raw);
                continue;
            }
            return Lookahead::Token { token, raw };
        }
    }

    fn apply(&mut self, head: &mut Head, action: ParseAction, lookahead: &Lookahead) -> ApplyOutcome {
        match action {
            ParseAction::Shift { state: next } => {
                let Lookahead::Token { token, raw } = lookahead else {
                    return ApplyOutcome::Dead;
                };
                let state = head.stack.state();
                let flags = SubtreeFlags::IS_NAMED
                    .when(self.language.is_named(token.symbol))
                    .union(SubtreeFlags::IS_KEYWORD.when(token.keyword_corrected));
                let leaf = self.pool.leaf(token.symbol, raw, state, flags);
                self.metrics.nodes_created += 1;
                let mut nodes = recovery::flush_pending(&mut head.pending);
                nodes.push(leaf);
                head.stack.push(next, nodes.into());
                head.advance(raw);
                ApplyOutcome::Alive
            }
            ParseAction::Reduce {
                production,
                child_count,
                ..
            } => {
                if head.reductions >= self.config.max_reduce_depth {
                    return ApplyOutcome::Dead;
                }
                self.apply_reduce(head, production, child_count)
            }
            ParseAction::Accept => {
                let mut nodes = head.stack.all_nodes();
                nodes.extend(recovery::flush_pending(&mut head.pending));
                let root = self.assemble_root(nodes);
                ApplyOutcome::Accepted {
                    root,
                    cost: head.cost,
                }
            }
        }
    }

    fn apply_reduce(&mut self, head: &mut Head, production: u16, child_count: u16) -> ApplyOutcome {
        let entries = head.stack.pop_entries(child_count as usize);
        if entries.len() < child_count as usize {
            return ApplyOutcome::Dead;
        }
        let Some(rule) = self.language.table().production(production) else {
            return ApplyOutcome::Dead;
        };

        let mut children: Vec<Subtree> = Vec::new();
        let mut fields: SmallVec<[(u16, FieldId); 2]> = SmallVec::new();
        let mut aliases: SmallVec<[(u16, Symbol); 1]> = SmallVec::new();
        for (slot, nodes) in entries.iter().enumerate() {
            let slot_key = u16::try_from(slot).unwrap_or(u16::MAX);
            for (offset, node) in nodes.iter().enumerate() {
                let is_slot_node = offset + 1 == nodes.len();
                if !is_slot_node {
                    // Leading extras and error material popped with the
                    // entry stay ordinary children.
                    children.push(node.clone());
                    continue;
                }
                let slot_field = rule
                    .fields
                    .iter()
                    .find(|(s, _)| *s == slot_key)
                    .map(|(_, field)| *field);
                let slot_alias = rule
                    .aliases
                    .iter()
                    .find(|(s, _)| *s == slot_key)
                    .map(|(_, alias)| *alias);
                if self.language.is_hidden(node.symbol())
                    && !node.is_error()
                    && slot_alias.is_none()
                {
                    // Hidden helpers dissolve: their children become ours,
                    // carrying their field and alias tags along.
                    let base = u16::try_from(children.len()).unwrap_or(u16::MAX);
                    for (grand_index, grand) in node.children().iter().enumerate() {
                        let key = base + u16::try_from(grand_index).unwrap_or(u16::MAX);
                        if let Some(field) = node.field_for_child(grand_index) {
                            fields.push((key, field));
                        }
                        if let Some(alias) = node.alias_for_child(grand_index) {
                            aliases.push((key, alias));
                        }
                        children.push(grand.clone());
                    }
                } else {
                    let key = u16::try_from(children.len()).unwrap_or(u16::MAX);
                    if let Some(field) = slot_field {
                        fields.push((key, field));
                    }
                    if let Some(alias) = slot_alias {
                        aliases.push((key, alias));
                    }
                    children.push(node.clone());
                }
            }
        }

        let state_after_pop = head.stack.state();
        let Some(next) = self.language.table().goto(state_after_pop, rule.lhs) else {
            return ApplyOutcome::Dead;
        };
        let flags = SubtreeFlags::IS_NAMED.when(self.language.is_named(rule.lhs));
        let node = Subtree::interior(
            rule.lhs,
            children,
            state_after_pop,
            production,
            fields,
            aliases,
            flags,
        );
        self.metrics.nodes_created += 1;
        let mut entry = SmallVec::new();
        entry.push(node);
        head.stack.push(next, entry);
        head.reductions += 1;
        ApplyOutcome::Alive
    }

    /// Build the final root from the accepted head's nodes: extras and
    /// error material surrounding a single derivation node fold into it;
    /// anything else is wrapped in an ERROR root.
    fn assemble_root(&mut self, nodes: Vec<Subtree>) -> Subtree {
        let derivations: Vec<usize> = nodes
            .iter()
            .enumerate()
            .filter(|(_, node)| !node.is_extra() && !node.is_error())
            .map(|(index, _)| index)
            .collect();
        match derivations.as_slice() {
            [index] if !nodes[*index].is_leaf() => {
                let index = *index;
                let mut nodes = nodes;
                let trailing = nodes.split_off(index + 1);
                let Some(main) = nodes.pop() else {
                    return recovery::error_node(nodes);
                };
                if nodes.is_empty() && trailing.is_empty() {
                    return main;
                }
                self.metrics.nodes_created += 1;
                main.with_surrounding(nodes, trailing)
            }
            _ => {
                self.metrics.nodes_created += 1;
                recovery::error_node(nodes)
            }
        }
    }

    /// Keep one head per (position, state, top symbol) among heads with
    /// nothing pending, preferring lower cost then age.
    fn merge_heads(&mut self) {
        if self.heads.len() < 2 {
            return;
        }
        self.heads.sort_by_key(|head| (head.byte, head.cost, head.seq));
        let mut kept: Vec<Head> = Vec::with_capacity(self.heads.len());
        'candidates: for head in self.heads.drain(..) {
            if head.pending.is_empty() {
                for existing in &kept {
                    if existing.pending.is_empty()
                        && existing.byte == head.byte
                        && existing.stack.state() == head.stack.state()
                        && existing.stack.top_symbol() == head.stack.top_symbol()
                    {
                        continue 'candidates;
                    }
                }
            }
            kept.push(head);
        }
        self.heads = kept;
    }

    fn prune_heads(&mut self) {
        if self.heads.len() <= self.config.max_heads {
            return;
        }
        self.heads.sort_by_key(|head| (head.cost, head.seq));
        let pruned = self.heads.len() - self.config.max_heads;
        self.heads.truncate(self.config.max_heads);
        self.metrics.heads_pruned += pruned;
    }

    fn note_accepted(&mut self, root: Subtree, cost: u32) {
        let better = match &self.accepted {
            Some((_, existing)) => cost < *existing,
            None => true,
        };
        if better {
            self.accepted = Some((root, cost));
        }
        let Some((_, accepted_cost)) = &self.accepted else {
            return;
        };
        let accepted_cost = *accepted_cost;
        self.heads.retain(|head| head.cost < accepted_cost);
    }

    fn note_stalled(&mut self, head: Head) {
        let better = match &self.stalled {
            Some(existing) => (head.byte, std::cmp::Reverse(head.cost))
                > (existing.byte, std::cmp::Reverse(existing.cost)),
            None => true,
        };
        if better {
            self.stalled = Some(head);
        }
    }

    /// An ERROR root over the best attempt so far, for cancellation and
    /// for the all-garbage fallback.
    fn snapshot_root(&mut self) -> Subtree {
        let best_live = self
            .heads
            .iter()
            .enumerate()
            .max_by_key(|(_, head)| (head.byte, std::cmp::Reverse(head.cost)))
            .map(|(index, _)| index);
        let mut head = match best_live {
            Some(index) => self.heads.swap_remove(index),
            None => match self.stalled.take() {
                Some(head) => head,
                None => Head::new(),
            },
        };
        let mut nodes = head.stack.all_nodes();
        nodes.extend(recovery::flush_pending(&mut head.pending));
        recovery::error_node(nodes)
    }
}
