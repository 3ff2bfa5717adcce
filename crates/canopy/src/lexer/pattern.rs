//! Lexical patterns for the default scanner.
//!
//! Patterns are deliberately small: literals, byte classes, sequences,
//! choices, and bounded repetition. Matching is greedy longest-first with
//! backtracking inside sequences.

use compact_str::CompactString;
use smallvec::SmallVec;

/// A set of byte values, stored as inclusive ranges.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CharSet {
    ranges: SmallVec<[(u8, u8); 4]>,
    negated: bool,
}

impl CharSet {
    #[must_use]
    pub fn empty() -> Self {
        Self {
            ranges: SmallVec::new(),
            negated: false,
        }
    }

    #[must_use]
    pub fn range(low: char, high: char) -> Self {
        let mut set = Self::empty();
        set.add_range(low, high);
        set
    }

    #[must_use]
    pub fn of(chars: &str) -> Self {
        let mut set = Self::empty();
        for c in chars.chars() {
            set.add_range(c, c);
        }
        set
    }

    #[must_use]
    pub fn digits() -> Self {
        Self::range('0', '9')
    }

    #[must_use]
    pub fn whitespace() -> Self {
        Self::of(" \t\r\n")
    }

    #[must_use]
    pub fn alpha() -> Self {
        let mut set = Self::range('a', 'z');
        set.add_range('A', 'Z');
        set
    }

    #[must_use]
    pub fn word() -> Self {
        let mut set = Self::alpha();
        set.add_range('0', '9');
        set.add_range('_', '_');
        set
    }

    /// Everything except the given characters. Matches any byte, so it also
    /// accepts non-ASCII input one byte at a time.
    #[must_use]
    pub fn none_of(chars: &str) -> Self {
        let mut set = Self::of(chars);
        set.negated = true;
        set
    }

    pub fn add_range(&mut self, low: char, high: char) {
        debug_assert!(low.is_ascii() && high.is_ascii());
        self.ranges.push((low as u8, high as u8));
    }

    #[must_use]
    pub fn matches(&self, byte: u8) -> bool {
        let hit = self
            .ranges
            .iter()
            .any(|&(low, high)| byte >= low && byte <= high);
        hit != self.negated
    }
}

/// A lexical rule for one terminal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Pattern {
    /// Exact text.
    Literal(CompactString),
    /// One byte from a class.
    CharClass(CharSet),
    /// All patterns in order.
    Seq(Vec<Pattern>),
    /// First alternative that lets the remainder match; longer matches
    /// are preferred.
    Choice(Vec<Pattern>),
    /// `min..=max` repetitions (greedy).
    Repeat {
        pattern: Box<Pattern>,
        min: usize,
        max: Option<usize>,
    },
}

impl Pattern {
    #[must_use]
    pub fn literal(text: &str) -> Self {
        Self::Literal(text.into())
    }

    #[must_use]
    pub fn repeat1(set: CharSet) -> Self {
        Self::Repeat {
            pattern: Box::new(Self::CharClass(set)),
            min: 1,
            max: None,
        }
    }

    #[must_use]
    pub fn repeat0(set: CharSet) -> Self {
        Self::Repeat {
            pattern: Box::new(Self::CharClass(set)),
            min: 0,
            max: None,
        }
    }

    /// Length of the longest match at the start of `text`, if any.
    #[must_use]
    pub fn match_len(&self, text: &[u8]) -> Option<usize> {
        let items = std::slice::from_ref(self);
        match_seq(items, text)
    }

    /// Candidate match lengths at the start of `text`, longest first.
    fn candidate_lens(&self, text: &[u8]) -> SmallVec<[usize; 8]> {
        match self {
            Self::Literal(lit) => {
                if text.starts_with(lit.as_bytes()) {
                    smallvec::smallvec![lit.len()]
                } else {
                    SmallVec::new()
                }
            }
            Self::CharClass(set) => match text.first() {
                Some(&byte) if set.matches(byte) => smallvec::smallvec![1],
                _ => SmallVec::new(),
            },
            Self::Seq(items) => match match_seq(items, text) {
                Some(len) => smallvec::smallvec![len],
                None => SmallVec::new(),
            },
            Self::Choice(alternatives) => {
                let mut lens: SmallVec<[usize; 8]> = SmallVec::new();
                for alt in alternatives {
                    for len in alt.candidate_lens(text) {
                        if !lens.contains(&len) {
                            lens.push(len);
                        }
                    }
                }
                lens.sort_unstable_by(|a, b| b.cmp(a));
                lens
            }
            Self::Repeat { pattern, min, max } => {
                // Greedy: record the prefix length after each repetition,
                // then offer counts from most to fewest.
                let mut prefix_lens: SmallVec<[usize; 8]> = smallvec::smallvec![0];
                let mut offset = 0;
                loop {
                    if let Some(limit) = max {
                        if prefix_lens.len() - 1 >= *limit {
                            break;
                        }
                    }
                    let step = pattern
                        .candidate_lens(&text[offset..])
                        .first()
                        .copied()
                        .filter(|len| *len > 0);
                    match step {
                        Some(len) => {
                            offset += len;
                            prefix_lens.push(offset);
                        }
                        None => break,
                    }
                }
                let mut lens: SmallVec<[usize; 8]> = SmallVec::new();
                for (count, len) in prefix_lens.iter().enumerate().rev() {
                    if count >= *min {
                        lens.push(*len);
                    }
                }
                lens
            }
        }
    }
}

/// Match a sequence of patterns with backtracking, returning the overall
/// length of the first (greediest) complete match.
fn match_seq(items: &[Pattern], text: &[u8]) -> Option<usize> {
    let (first, rest) = match items.split_first() {
        Some(split) => split,
        None => return Some(0),
    };
    for len in first.candidate_lens(text) {
        if let Some(rest_len) = match_seq(rest, &text[len..]) {
            return Some(len + rest_len);
        }
    }
    None
}
