// model = "claude-opus-4-5"
// created = "2026-10-19"
// modified = "2026-10-19"
// driver = "Isaac Clayton"

//! Canonical change descriptions for ordered collections.
//!
//! A [`Delta`] is the net effect of one transaction on a list. It is
//! either a run of [`Operation`]s or a single reordering, never both.
//!
//! Operations are expressed in *sequential* coordinates: each block's
//! indices refer to the list as it stands after every earlier block has
//! been applied. Replaying the blocks from first to last against the
//! pre-transaction contents therefore yields the post-transaction
//! contents. Within one delta:
//!
//! - blocks are ordered by start index,
//! - no block reaches back over a region an earlier block already covered,
//! - adjacent blocks of the same kind are merged into one.
//!
//! A delete block `[s, e]` removes `e - s + 1` elements starting at `s`.
//! Insert and update blocks name the post-change positions `s..=e`.

pub mod assembler;
pub mod run_tree;

use std::fmt;

/// The kind of a single change.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ChangeKind {
    Insert,
    Update,
    Delete,
}

/// A block of same-kind changes over an inclusive index range.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Operation {
    pub kind: ChangeKind,
    pub start: usize,
    /// Inclusive.
    pub end: usize,
}

impl Operation {
    pub fn new(kind: ChangeKind, start: usize, end: usize) -> Operation {
        debug_assert!(start <= end, "empty operation {}..={}", start, end);
        return Operation { kind, start, end };
    }

    pub fn single(kind: ChangeKind, index: usize) -> Operation {
        return Operation::new(kind, index, index);
    }

    /// Number of elements covered by this block.
    pub fn len(&self) -> usize {
        return self.end - self.start + 1;
    }

    /// First index not yet touched once this block has been applied.
    fn frontier(&self) -> usize {
        return match self.kind {
            ChangeKind::Delete => self.start,
            ChangeKind::Insert | ChangeKind::Update => self.end + 1,
        };
    }

    /// Extend this block by `len` elements if `start` continues it.
    fn try_extend(&mut self, kind: ChangeKind, start: usize, len: usize) -> bool {
        if kind != self.kind || start != self.frontier() {
            return false;
        }
        self.end += len;
        return true;
    }
}

/// A single per-index change, as produced by [`Delta::changes`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Change {
    pub kind: ChangeKind,
    pub index: usize,
}

/// The canonical net effect of one transaction.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Delta {
    ops: Vec<Operation>,
    /// `reorder[old] = new`.
    reorder: Option<Vec<usize>>,
}

impl Delta {
    pub fn new() -> Delta {
        return Delta { ops: Vec::new(), reorder: None };
    }

    /// Build a delta from operations, merging adjacent blocks as needed.
    pub fn from_operations<I>(ops: I) -> Delta
    where
        I: IntoIterator<Item = Operation>,
    {
        let mut delta = Delta::new();
        for op in ops {
            delta.push(op.kind, op.start, op.len());
        }
        return delta;
    }

    /// Build a pure reordering. `permutation[old] = new`.
    pub fn from_reorder(permutation: Vec<usize>) -> Delta {
        return Delta { ops: Vec::new(), reorder: Some(permutation) };
    }

    /// True when the delta neither changes nor reorders anything.
    pub fn is_empty(&self) -> bool {
        return self.ops.is_empty() && self.reorder.is_none();
    }

    pub fn is_reorder(&self) -> bool {
        return self.reorder.is_some();
    }

    /// The permutation of a pure reordering, as `permutation[old] = new`.
    pub fn reorder(&self) -> Option<&[usize]> {
        return self.reorder.as_deref();
    }

    /// The canonical blocks. Empty for a reordering; see [`Delta::blocks`].
    pub fn operations(&self) -> &[Operation] {
        return &self.ops;
    }

    /// Iterate over blocks. A reordering is expanded into a delete of every
    /// element followed by an insert of every element.
    pub fn blocks(&self) -> Blocks<'_> {
        return Blocks { delta: self, position: 0 };
    }

    /// Iterate over per-index changes, in replay order.
    pub fn changes(&self) -> Changes<'_> {
        return Changes { blocks: self.blocks(), current: None, offset: 0 };
    }

    /// Number of elements inserted minus number deleted.
    pub fn size_change(&self) -> isize {
        let mut change = 0isize;
        for op in &self.ops {
            match op.kind {
                ChangeKind::Insert => change += op.len() as isize,
                ChangeKind::Delete => change -= op.len() as isize,
                ChangeKind::Update => {}
            }
        }
        return change;
    }

    /// Check the ordering and merging rules described at the module level.
    pub fn is_canonical(&self) -> bool {
        if let Some(permutation) = &self.reorder {
            return self.ops.is_empty() && is_permutation(permutation, permutation.len());
        }
        for pair in self.ops.windows(2) {
            let (prev, next) = (pair[0], pair[1]);
            let frontier = prev.frontier();
            if next.start < frontier {
                return false;
            }
            if next.kind == prev.kind && next.start == frontier {
                return false;
            }
        }
        return true;
    }

    /// Replay this delta against `target`, the pre-transaction contents.
    /// `make(i)` produces the element at post-transaction index `i`.
    pub fn replay<U, F>(&self, target: &mut Vec<U>, mut make: F)
    where
        F: FnMut(usize) -> U,
    {
        if let Some(permutation) = &self.reorder {
            permute(target, permutation);
            return;
        }

        for op in &self.ops {
            match op.kind {
                ChangeKind::Insert => {
                    target.splice(op.start..op.start, (op.start..=op.end).map(&mut make));
                }
                ChangeKind::Update => {
                    for i in op.start..=op.end {
                        target[i] = make(i);
                    }
                }
                ChangeKind::Delete => {
                    target.drain(op.start..=op.end);
                }
            }
        }
    }

    /// Replay against `old`, pulling inserted and updated values from `new`.
    pub fn apply_to<T: Clone>(&self, old: &mut Vec<T>, new: &[T]) {
        self.replay(old, |i| new[i].clone());
    }

    /// Append a block, merging with the previous one when it continues it.
    pub(crate) fn push(&mut self, kind: ChangeKind, start: usize, len: usize) {
        debug_assert!(self.reorder.is_none());
        if len == 0 {
            return;
        }
        if let Some(last) = self.ops.last_mut() {
            if last.try_extend(kind, start, len) {
                return;
            }
        }
        self.ops.push(Operation::new(kind, start, start + len - 1));
    }

    pub(crate) fn last(&self) -> Option<&Operation> {
        return self.ops.last();
    }

    /// Forget the contents but keep the allocation.
    pub(crate) fn clear(&mut self) {
        self.ops.clear();
        self.reorder = None;
    }
}

impl fmt::Display for Delta {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(permutation) = &self.reorder {
            return write!(f, "reorder{:?}", permutation);
        }
        write!(f, "[")?;
        for (i, op) in self.ops.iter().enumerate() {
            if i > 0 {
                write!(f, " ")?;
            }
            let tag = match op.kind {
                ChangeKind::Insert => "I",
                ChangeKind::Update => "U",
                ChangeKind::Delete => "D",
            };
            if op.start == op.end {
                write!(f, "{}{}", tag, op.start)?;
            } else {
                write!(f, "{}{}-{}", tag, op.start, op.end)?;
            }
        }
        return write!(f, "]");
    }
}

/// Move `items[old]` to `items[permutation[old]]`.
pub(crate) fn permute<U>(items: &mut Vec<U>, permutation: &[usize]) {
    let mut slots: Vec<Option<U>> = Vec::with_capacity(items.len());
    slots.resize_with(items.len(), || None);
    for (old, item) in items.drain(..).enumerate() {
        slots[permutation[old]] = Some(item);
    }
    items.extend(slots.into_iter().flatten());
}

/// True if `permutation` maps `0..expected` onto itself bijectively.
pub(crate) fn is_permutation(permutation: &[usize], expected: usize) -> bool {
    if permutation.len() != expected {
        return false;
    }
    let mut seen = vec![false; expected];
    for &target in permutation {
        if target >= expected || seen[target] {
            return false;
        }
        seen[target] = true;
    }
    return true;
}

/// Block iterator returned by [`Delta::blocks`].
pub struct Blocks<'a> {
    delta: &'a Delta,
    position: usize,
}

impl<'a> Iterator for Blocks<'a> {
    type Item = Operation;

    fn next(&mut self) -> Option<Operation> {
        let position = self.position;
        if let Some(permutation) = &self.delta.reorder {
            let last = permutation.len().checked_sub(1)?;
            self.position += 1;
            return match position {
                0 => Some(Operation::new(ChangeKind::Delete, 0, last)),
                1 => Some(Operation::new(ChangeKind::Insert, 0, last)),
                _ => None,
            };
        }
        let op = self.delta.ops.get(position).copied()?;
        self.position += 1;
        return Some(op);
    }
}

/// Per-index iterator returned by [`Delta::changes`].
pub struct Changes<'a> {
    blocks: Blocks<'a>,
    current: Option<Operation>,
    offset: usize,
}

impl<'a> Iterator for Changes<'a> {
    type Item = Change;

    fn next(&mut self) -> Option<Change> {
        loop {
            if let Some(op) = self.current {
                if self.offset < op.len() {
                    let index = match op.kind {
                        ChangeKind::Delete => op.start,
                        ChangeKind::Insert | ChangeKind::Update => op.start + self.offset,
                    };
                    self.offset += 1;
                    return Some(Change { kind: op.kind, index });
                }
            }
            self.current = Some(self.blocks.next()?);
            self.offset = 0;
        }
    }
}
