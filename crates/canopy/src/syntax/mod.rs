//! # Syntax trees
//!
//! Concrete syntax trees and everything needed to read them: byte/point
//! coordinates, immutable `Arc`-shared subtrees, the [`Tree`] value with
//! its lazy edit view, and the cursor/node read surface.

mod cursor;
mod node;
pub(crate) mod pool;
mod subtree;
mod text;
mod tree;

pub(crate) use subtree::NO_PRODUCTION;

pub use cursor::TreeCursor;
pub use node::{Descendants, Node};
pub use subtree::{Subtree, SubtreeFlags};
pub use text::{InputEdit, Point, PointDelta, TextRange, TextSize};
pub use tree::Tree;
