// model = "claude-opus-4-5"
// created = "2026-10-19"
// modified = "2026-10-19"
// driver = "Isaac Clayton"

//! Delta Assembler
//!
//! Accumulates per-index changes made inside a (possibly nested)
//! transaction and folds them into one canonical [`Delta`].
//!
//! Two working representations share one assembler:
//!
//! - `Linear`: the canonical block list itself. Changes that land at or past
//!   the frontier of the last block are appended or merged in O(1).
//! - `Tree`: a [`RunTree`] of slot states with tombstones for deletions.
//!   Changes may land anywhere in O(log n), including on top of earlier
//!   changes in the same transaction.
//!
//! Under [`Strategy::Adaptive`] every transaction starts linear and moves to
//! the tree once, the first time a change lands behind the frontier. Under
//! [`Strategy::OrderStatisticsTree`] the tree is used from the start. The
//! resulting delta does not depend on the strategy.
//!
//! Per-slot folding rules on the tree:
//!
//! - update of an inserted slot stays inserted,
//! - update of an updated slot stays updated,
//! - delete of an inserted slot removes it entirely (contradictions only),
//! - insert directly after a fresh tombstone turns the tombstone into an
//!   update (contradictions only).

use tracing::debug;
use tracing::trace;

use super::ChangeKind;
use super::Delta;
use super::is_permutation;
use super::run_tree::Dim;
use super::run_tree::Run;
use super::run_tree::RunState;
use super::run_tree::RunTree;
use crate::config::Config;
use crate::config::Strategy;
use crate::error::Error;
use crate::error::Result;

/// Outcome of [`DeltaAssembler::commit`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Commit {
    /// An inner level closed; the transaction is still open.
    Nested,
    /// The outermost level closed and nothing changed.
    Empty,
    /// The outermost level closed with changes ready to be published.
    Ready,
    /// The outermost level closed while an earlier commit is still waiting
    /// to be published; the new changes were folded into it.
    Merged,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Mode {
    Linear,
    Tree,
}

pub struct DeltaAssembler {
    strategy: Strategy,
    depth: usize,
    /// Whether the innermost open level permits nesting.
    allow_nested: bool,
    allow_contradictions: bool,
    /// A committed delta is waiting to be taken.
    pending: bool,
    /// Length of the list when the transaction started.
    base_len: usize,
    /// Current length of the list.
    len: usize,
    mode: Mode,
    linear: Delta,
    tree: RunTree,
    reorder: Option<Vec<usize>>,
}

impl DeltaAssembler {
    pub fn new() -> DeltaAssembler {
        return DeltaAssembler::with_strategy(Strategy::default());
    }

    pub fn with_config(config: &Config) -> DeltaAssembler {
        return DeltaAssembler::with_strategy(config.strategy);
    }

    pub fn with_strategy(strategy: Strategy) -> DeltaAssembler {
        return DeltaAssembler {
            strategy,
            depth: 0,
            allow_nested: true,
            allow_contradictions: false,
            pending: false,
            base_len: 0,
            len: 0,
            mode: Mode::Linear,
            linear: Delta::new(),
            tree: RunTree::new(),
            reorder: None,
        };
    }

    pub fn strategy(&self) -> Strategy {
        return self.strategy;
    }

    /// Open a transaction level on a list currently holding `len` elements.
    ///
    /// With `allow_nested` false no further level may be opened inside this
    /// one. Opening a nestable level, or reopening while an earlier commit
    /// is still pending, permits contradicting changes for the rest of the
    /// transaction.
    pub fn begin(&mut self, allow_nested: bool, len: usize) -> Result<()> {
        if self.depth > 0 && !self.allow_nested {
            return Err(Error::NestingViolation);
        }

        if self.depth == 0 {
            if self.pending {
                debug_assert_eq!(self.len, len, "list changed behind the assembler's back");
                self.allow_contradictions = true;
            } else {
                self.prepare(len);
            }
        }

        self.allow_nested = allow_nested;
        if allow_nested {
            self.allow_contradictions = true;
        }
        self.depth += 1;
        return Ok(());
    }

    /// Close the innermost open level.
    pub fn commit(&mut self) -> Result<Commit> {
        if self.depth == 0 {
            return Err(Error::CommitWithoutBegin);
        }
        self.depth -= 1;
        self.allow_nested = true;

        if self.depth > 0 {
            return Ok(Commit::Nested);
        }
        if self.pending {
            return Ok(Commit::Merged);
        }
        if self.is_empty() {
            self.reset();
            return Ok(Commit::Empty);
        }
        self.pending = true;
        return Ok(Commit::Ready);
    }

    /// Depth of open levels. Zero when no transaction is open.
    pub fn depth(&self) -> usize {
        return self.depth;
    }

    pub fn is_open(&self) -> bool {
        return self.depth > 0;
    }

    /// A committed delta is waiting to be taken.
    pub fn is_pending(&self) -> bool {
        return self.pending;
    }

    /// Current length of the list, as tracked through recorded changes.
    pub fn len(&self) -> usize {
        return self.len;
    }

    /// True when nothing recorded so far has any net effect.
    pub fn is_empty(&self) -> bool {
        if self.reorder.is_some() {
            return false;
        }
        return match self.mode {
            Mode::Linear => self.linear.is_empty(),
            Mode::Tree => self.tree.is_unchanged(),
        };
    }

    /// Record an element inserted at `index`.
    pub fn insert(&mut self, index: usize) -> Result<()> {
        self.check_change()?;
        if index > self.len {
            return Err(Error::IndexOutOfBounds { index, len: self.len });
        }
        self.record(ChangeKind::Insert, index)?;
        self.len += 1;
        return Ok(());
    }

    /// Record the element at `index` replaced in place.
    pub fn update(&mut self, index: usize) -> Result<()> {
        self.check_change()?;
        if index >= self.len {
            return Err(Error::IndexOutOfBounds { index, len: self.len });
        }
        return self.record(ChangeKind::Update, index);
    }

    /// Record the element at `index` removed.
    pub fn delete(&mut self, index: usize) -> Result<()> {
        self.check_change()?;
        if index >= self.len {
            return Err(Error::IndexOutOfBounds { index, len: self.len });
        }
        self.record(ChangeKind::Delete, index)?;
        self.len -= 1;
        return Ok(());
    }

    /// Record elements inserted at `start..=end`.
    pub fn insert_range(&mut self, start: usize, end: usize) -> Result<()> {
        for index in start..=end {
            self.insert(index)?;
        }
        return Ok(());
    }

    /// Record elements at `start..=end` replaced in place.
    pub fn update_range(&mut self, start: usize, end: usize) -> Result<()> {
        for index in start..=end {
            self.update(index)?;
        }
        return Ok(());
    }

    /// Record elements at `start..=end` removed.
    pub fn delete_range(&mut self, start: usize, end: usize) -> Result<()> {
        for _ in start..=end {
            self.delete(start)?;
        }
        return Ok(());
    }

    /// Record a pure reordering, `permutation[old] = new`.
    ///
    /// Only allowed while nothing else has been recorded. An empty or
    /// identity permutation records nothing.
    pub fn reorder(&mut self, permutation: Vec<usize>) -> Result<()> {
        if self.depth == 0 {
            return Err(Error::NoTransaction);
        }
        if !self.is_empty() {
            return Err(Error::ReorderCombination);
        }
        if !is_permutation(&permutation, self.len) {
            return Err(Error::InvalidPermutation {
                len: permutation.len(),
                expected: self.len,
            });
        }
        if permutation.iter().enumerate().all(|(old, &new)| old == new) {
            return Ok(());
        }
        self.reorder = Some(permutation);
        return Ok(());
    }

    /// Replay the changes of another delta into this transaction.
    pub fn forward(&mut self, delta: &Delta) -> Result<()> {
        if let Some(permutation) = delta.reorder() {
            return self.reorder(permutation.to_vec());
        }
        for op in delta.operations() {
            match op.kind {
                ChangeKind::Insert => self.insert_range(op.start, op.end)?,
                ChangeKind::Update => self.update_range(op.start, op.end)?,
                ChangeKind::Delete => self.delete_range(op.start, op.end)?,
            }
        }
        return Ok(());
    }

    /// Position before the transaction of the element now at `index`.
    /// `None` for elements inserted by this transaction.
    pub fn current_to_original(&self, index: usize) -> Option<usize> {
        if let Some(permutation) = &self.reorder {
            return permutation.iter().position(|&new| new == index);
        }
        if self.mode == Mode::Tree {
            let located = self.tree.locate(Dim::Current, index)?;
            let run = self.tree.get(located.item)?;
            if run.state == RunState::Inserted {
                return None;
            }
            return Some(located.before.original + located.offset);
        }

        let (mut current, mut original) = (0usize, 0usize);
        for op in self.linear.operations() {
            let gap = op.start - current;
            if index < current + gap {
                return Some(original + index - current);
            }
            current += gap;
            original += gap;
            match op.kind {
                ChangeKind::Insert => {
                    if index < current + op.len() {
                        return None;
                    }
                    current += op.len();
                }
                ChangeKind::Update => {
                    if index < current + op.len() {
                        return Some(original + index - current);
                    }
                    current += op.len();
                    original += op.len();
                }
                ChangeKind::Delete => original += op.len(),
            }
        }
        if index < self.len {
            return Some(original + index - current);
        }
        return None;
    }

    /// Position now of the element at `index` before the transaction.
    /// `None` for elements deleted by this transaction.
    pub fn original_to_current(&self, index: usize) -> Option<usize> {
        if let Some(permutation) = &self.reorder {
            return permutation.get(index).copied();
        }
        if self.mode == Mode::Tree {
            let located = self.tree.locate(Dim::Original, index)?;
            let run = self.tree.get(located.item)?;
            if run.state == RunState::Deleted {
                return None;
            }
            return Some(located.before.current + located.offset);
        }

        let (mut current, mut original) = (0usize, 0usize);
        for op in self.linear.operations() {
            let gap = op.start - current;
            if index < original + gap {
                return Some(current + index - original);
            }
            current += gap;
            original += gap;
            match op.kind {
                ChangeKind::Insert => current += op.len(),
                ChangeKind::Update => {
                    if index < original + op.len() {
                        return Some(current + index - original);
                    }
                    current += op.len();
                    original += op.len();
                }
                ChangeKind::Delete => {
                    if index < original + op.len() {
                        return None;
                    }
                    original += op.len();
                }
            }
        }
        if index < self.base_len {
            return Some(current + index - original);
        }
        return None;
    }

    /// Take the committed delta, leaving the assembler ready for the next
    /// transaction. Returns `None` when nothing is pending, when a level is
    /// still open, or when the changes cancelled out.
    pub fn take(&mut self) -> Option<Delta> {
        if !self.pending || self.depth > 0 {
            return None;
        }
        let delta = match self.reorder.take() {
            Some(permutation) => Some(Delta::from_reorder(permutation)),
            None => {
                if self.mode == Mode::Tree {
                    self.flatten();
                }
                if self.linear.is_empty() {
                    None
                } else {
                    Some(std::mem::take(&mut self.linear))
                }
            }
        };
        self.reset();
        return delta;
    }

    /// Hand back a delta returned by [`DeltaAssembler::take`] so its
    /// allocation can be reused.
    pub fn recycle(&mut self, mut delta: Delta) {
        if self.depth == 0 && !self.pending && delta.ops.capacity() > self.linear.ops.capacity() {
            delta.clear();
            self.linear = delta;
        }
    }

    fn check_change(&self) -> Result<()> {
        if self.depth == 0 {
            return Err(Error::NoTransaction);
        }
        if self.reorder.is_some() {
            return Err(Error::ReorderCombination);
        }
        return Ok(());
    }

    fn prepare(&mut self, len: usize) {
        self.base_len = len;
        self.len = len;
        self.linear.clear();
        self.reorder = None;
        self.allow_contradictions = false;
        self.mode = match self.strategy {
            Strategy::Adaptive => Mode::Linear,
            Strategy::OrderStatisticsTree => {
                self.tree.reset(len);
                Mode::Tree
            }
        };
    }

    fn reset(&mut self) {
        self.pending = false;
        self.allow_contradictions = false;
        self.base_len = self.len;
        self.linear.clear();
        self.reorder = None;
        if self.mode == Mode::Tree {
            self.tree.clear();
        }
        self.mode = Mode::Linear;
    }

    fn record(&mut self, kind: ChangeKind, index: usize) -> Result<()> {
        trace!(?kind, index, "recording change");
        if self.mode == Mode::Linear {
            if self.linear_accepts(kind, index) {
                self.linear.push(kind, index, 1);
                return Ok(());
            }
            self.switch_to_tree(kind, index);
        }
        return self.record_in_tree(kind, index);
    }

    /// Whether the change can be appended to the block list as is.
    fn linear_accepts(&self, kind: ChangeKind, index: usize) -> bool {
        let Some(last) = self.linear.last() else {
            return true;
        };
        let frontier = last.frontier();
        if index != frontier {
            return index > frontier;
        }
        if kind == last.kind {
            return true;
        }
        // Inserting onto a fresh tombstone folds into an update.
        return !(last.kind == ChangeKind::Delete && kind == ChangeKind::Insert && self.allow_contradictions);
    }

    /// Rebuild the recorded blocks as runs.
    fn switch_to_tree(&mut self, kind: ChangeKind, index: usize) {
        debug!(?kind, index, blocks = self.linear.operations().len(), "change behind frontier, switching to tree");
        self.tree.clear();
        let (mut current, mut original) = (0usize, 0usize);
        for op in self.linear.operations() {
            let gap = op.start - current;
            let len = op.len();
            self.tree.insert_run(self.tree.total().all, Run::new(RunState::Unchanged, gap));
            current += gap;
            original += gap;
            let state = match op.kind {
                ChangeKind::Insert => {
                    current += len;
                    RunState::Inserted
                }
                ChangeKind::Update => {
                    current += len;
                    original += len;
                    RunState::Updated
                }
                ChangeKind::Delete => {
                    original += len;
                    RunState::Deleted
                }
            };
            self.tree.insert_run(self.tree.total().all, Run::new(state, len));
        }
        let rest = self.base_len - original;
        self.tree.insert_run(self.tree.total().all, Run::new(RunState::Unchanged, rest));
        self.linear.clear();
        self.mode = Mode::Tree;
    }

    fn record_in_tree(&mut self, kind: ChangeKind, index: usize) -> Result<()> {
        match kind {
            ChangeKind::Insert => {
                // After every tombstone in front of the element now at `index`.
                let slot = match self.tree.locate(Dim::Current, index) {
                    Some(located) => located.before.all + located.offset,
                    None => self.tree.total().all,
                };
                if self.allow_contradictions && slot > 0 && self.tree.state_at(slot - 1) == Some(RunState::Deleted) {
                    self.tree.set_slot(slot - 1, RunState::Updated);
                } else {
                    self.tree.insert_slot(slot, RunState::Inserted);
                }
            }
            ChangeKind::Update | ChangeKind::Delete => {
                let located = self
                    .tree
                    .locate(Dim::Current, index)
                    .ok_or(Error::IndexOutOfBounds { index, len: self.len })?;
                let slot = located.before.all + located.offset;
                let state = self.tree.state_at(slot).unwrap_or(RunState::Unchanged);
                match (kind, state) {
                    (ChangeKind::Update, RunState::Unchanged) => self.tree.set_slot(slot, RunState::Updated),
                    (ChangeKind::Update, _) => {}
                    (_, RunState::Inserted) => {
                        if !self.allow_contradictions {
                            return Err(Error::Contradiction { kind, index });
                        }
                        self.tree.remove_slot(slot);
                    }
                    _ => self.tree.set_slot(slot, RunState::Deleted),
                }
            }
        }
        return Ok(());
    }

    /// Write the tree's runs into the linear buffer as canonical blocks.
    fn flatten(&mut self) {
        self.linear.clear();
        let mut current = 0usize;
        for run in self.tree.iter() {
            match run.state {
                RunState::Unchanged => current += run.len,
                RunState::Inserted => {
                    self.linear.push(ChangeKind::Insert, current, run.len);
                    current += run.len;
                }
                RunState::Updated => {
                    self.linear.push(ChangeKind::Update, current, run.len);
                    current += run.len;
                }
                RunState::Deleted => self.linear.push(ChangeKind::Delete, current, run.len),
            }
        }
    }
}

impl Default for DeltaAssembler {
    fn default() -> Self {
        return Self::new();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::delta::Operation;

    use ChangeKind::*;

    fn both() -> [DeltaAssembler; 2] {
        return [
            DeltaAssembler::with_strategy(Strategy::Adaptive),
            DeltaAssembler::with_strategy(Strategy::OrderStatisticsTree),
        ];
    }

    fn committed(assembler: &mut DeltaAssembler) -> Option<Delta> {
        assert_eq!(assembler.commit().unwrap(), Commit::Ready);
        return assembler.take();
    }

    // ==== Transactions ====

    #[test]
    fn commit_without_begin_fails() {
        let mut assembler = DeltaAssembler::new();
        assert!(matches!(assembler.commit(), Err(Error::CommitWithoutBegin)));
    }

    #[test]
    fn change_without_begin_fails() {
        let mut assembler = DeltaAssembler::new();
        assert!(matches!(assembler.insert(0), Err(Error::NoTransaction)));
    }

    #[test]
    fn nesting_violation() {
        let mut assembler = DeltaAssembler::new();
        assembler.begin(false, 0).unwrap();
        assert!(matches!(assembler.begin(true, 0), Err(Error::NestingViolation)));
        assert_eq!(assembler.depth(), 1);
    }

    #[test]
    fn nested_levels_publish_once() {
        let mut assembler = DeltaAssembler::new();
        assembler.begin(true, 3).unwrap();
        assembler.insert(0).unwrap();
        assembler.begin(false, 4).unwrap();
        assembler.update(2).unwrap();
        assert_eq!(assembler.commit().unwrap(), Commit::Nested);
        assert_eq!(assembler.commit().unwrap(), Commit::Ready);
        let delta = assembler.take().unwrap();
        assert_eq!(delta.to_string(), "[I0 U2]");
    }

    #[test]
    fn empty_transaction_is_a_noop() {
        for mut assembler in both() {
            assembler.begin(true, 5).unwrap();
            assert_eq!(assembler.commit().unwrap(), Commit::Empty);
            assert!(!assembler.is_pending());
            assert_eq!(assembler.take(), None);
        }
    }

    #[test]
    fn reopening_while_pending_merges() {
        let mut assembler = DeltaAssembler::new();
        assembler.begin(false, 2).unwrap();
        assembler.insert(2).unwrap();
        assert_eq!(assembler.commit().unwrap(), Commit::Ready);

        assembler.begin(false, 3).unwrap();
        // contradictions are now allowed even though the level is strict
        assembler.delete(2).unwrap();
        assert_eq!(assembler.commit().unwrap(), Commit::Merged);
        assert_eq!(assembler.take(), None);
        assert!(!assembler.is_pending());
    }

    // ==== Folding ====

    #[test]
    fn insert_then_delete_cancels() {
        for mut assembler in both() {
            assembler.begin(true, 3).unwrap();
            assembler.insert(1).unwrap();
            assembler.delete(1).unwrap();
            assert_eq!(assembler.commit().unwrap(), Commit::Empty);
        }
    }

    #[test]
    fn insert_then_delete_is_contradiction_when_strict() {
        for mut assembler in both() {
            assembler.begin(false, 3).unwrap();
            assembler.insert(1).unwrap();
            let result = assembler.delete(1);
            assert!(matches!(result, Err(Error::Contradiction { kind: Delete, index: 1 })));
        }
    }

    #[test]
    fn delete_then_insert_folds_into_update() {
        for mut assembler in both() {
            assembler.begin(true, 3).unwrap();
            assembler.delete(1).unwrap();
            assembler.insert(1).unwrap();
            let delta = committed(&mut assembler).unwrap();
            assert_eq!(delta.operations(), &[Operation::single(Update, 1)]);
        }
    }

    #[test]
    fn delete_then_insert_stays_apart_when_strict() {
        for mut assembler in both() {
            assembler.begin(false, 3).unwrap();
            assembler.delete(1).unwrap();
            assembler.insert(1).unwrap();
            let delta = committed(&mut assembler).unwrap();
            assert_eq!(delta.to_string(), "[D1 I1]");
        }
    }

    #[test]
    fn update_of_inserted_stays_inserted() {
        for mut assembler in both() {
            assembler.begin(true, 2).unwrap();
            assembler.insert(0).unwrap();
            assembler.update(0).unwrap();
            assembler.update(0).unwrap();
            let delta = committed(&mut assembler).unwrap();
            assert_eq!(delta.to_string(), "[I0]");
        }
    }

    #[test]
    fn update_then_delete_is_delete() {
        for mut assembler in both() {
            assembler.begin(true, 4).unwrap();
            assembler.update(2).unwrap();
            assembler.delete(2).unwrap();
            let delta = committed(&mut assembler).unwrap();
            assert_eq!(delta.to_string(), "[D2]");
        }
    }

    #[test]
    fn out_of_order_changes_come_out_sorted() {
        for mut assembler in both() {
            assembler.begin(true, 10).unwrap();
            assembler.update(8).unwrap();
            assembler.insert(2).unwrap();
            assembler.delete(5).unwrap();
            let delta = committed(&mut assembler).unwrap();
            assert!(delta.is_canonical());
            // after the insert the old 8 sits at 9, after the delete at 8
            assert_eq!(delta.to_string(), "[I2 D5 U8]");
        }
    }

    #[test]
    fn range_deletes_merge() {
        for mut assembler in both() {
            assembler.begin(true, 10).unwrap();
            assembler.delete_range(3, 5).unwrap();
            assembler.delete_range(3, 4).unwrap();
            let delta = committed(&mut assembler).unwrap();
            assert_eq!(delta.to_string(), "[D3-7]");
        }
    }

    #[test]
    fn index_bounds_are_checked() {
        let mut assembler = DeltaAssembler::new();
        assembler.begin(true, 2).unwrap();
        assert!(matches!(assembler.insert(3), Err(Error::IndexOutOfBounds { index: 3, len: 2 })));
        assert!(matches!(assembler.update(2), Err(Error::IndexOutOfBounds { index: 2, len: 2 })));
        assert!(matches!(assembler.delete(2), Err(Error::IndexOutOfBounds { index: 2, len: 2 })));
        assembler.insert(2).unwrap();
        assert_eq!(assembler.len(), 3);
    }

    // ==== Reorder ====

    #[test]
    fn reorder_requires_empty_delta() {
        let mut assembler = DeltaAssembler::new();
        assembler.begin(true, 3).unwrap();
        assembler.update(0).unwrap();
        assert!(matches!(assembler.reorder(vec![1, 0, 2]), Err(Error::ReorderCombination)));
    }

    #[test]
    fn change_after_reorder_fails() {
        let mut assembler = DeltaAssembler::new();
        assembler.begin(true, 3).unwrap();
        assembler.reorder(vec![1, 0, 2]).unwrap();
        assert!(matches!(assembler.update(0), Err(Error::ReorderCombination)));
        let delta = committed(&mut assembler).unwrap();
        assert_eq!(delta.reorder(), Some(&[1, 0, 2][..]));
    }

    #[test]
    fn reorder_validates_permutation() {
        let mut assembler = DeltaAssembler::new();
        assembler.begin(true, 3).unwrap();
        let result = assembler.reorder(vec![0, 0, 1]);
        assert!(matches!(result, Err(Error::InvalidPermutation { len: 3, expected: 3 })));
        let result = assembler.reorder(vec![1, 0]);
        assert!(matches!(result, Err(Error::InvalidPermutation { len: 2, expected: 3 })));
    }

    #[test]
    fn empty_and_identity_reorders_are_noops() {
        let mut assembler = DeltaAssembler::new();
        assembler.begin(true, 0).unwrap();
        assembler.reorder(Vec::new()).unwrap();
        assert_eq!(assembler.commit().unwrap(), Commit::Empty);

        assembler.begin(true, 3).unwrap();
        assembler.reorder(vec![0, 1, 2]).unwrap();
        assert_eq!(assembler.commit().unwrap(), Commit::Empty);
    }

    // ==== Translation ====

    #[test]
    fn index_translation_matches_between_modes() {
        for mut assembler in both() {
            assembler.begin(true, 6).unwrap();
            assembler.insert(1).unwrap();
            assembler.delete(3).unwrap();
            assembler.update(4).unwrap();

            // current: o0 new o1 o3 o4 o5
            assert_eq!(assembler.current_to_original(0), Some(0));
            assert_eq!(assembler.current_to_original(1), None);
            assert_eq!(assembler.current_to_original(2), Some(1));
            assert_eq!(assembler.current_to_original(3), Some(3));
            assert_eq!(assembler.current_to_original(5), Some(5));
            assert_eq!(assembler.current_to_original(6), None);

            assert_eq!(assembler.original_to_current(0), Some(0));
            assert_eq!(assembler.original_to_current(2), None);
            assert_eq!(assembler.original_to_current(3), Some(3));
            assert_eq!(assembler.original_to_current(5), Some(5));
            assert_eq!(assembler.original_to_current(6), None);
        }
    }

    #[test]
    fn translation_through_reorder() {
        let mut assembler = DeltaAssembler::new();
        assembler.begin(true, 3).unwrap();
        assembler.reorder(vec![2, 0, 1]).unwrap();
        assert_eq!(assembler.original_to_current(0), Some(2));
        assert_eq!(assembler.current_to_original(2), Some(0));
    }

    // ==== Forwarding ====

    #[test]
    fn forward_replays_blocks() {
        let source = Delta::from_operations([
            Operation::new(Insert, 0, 1),
            Operation::new(Delete, 4, 5),
            Operation::single(Update, 6),
        ]);
        for mut assembler in both() {
            assembler.begin(true, 8).unwrap();
            assembler.forward(&source).unwrap();
            let delta = committed(&mut assembler).unwrap();
            assert_eq!(delta, source);
        }
    }

    #[test]
    fn recycle_reuses_buffer() {
        let mut assembler = DeltaAssembler::new();
        assembler.begin(true, 0).unwrap();
        assembler.insert_range(0, 9).unwrap();
        let delta = committed(&mut assembler).unwrap();
        assembler.recycle(delta);

        assembler.begin(true, 10).unwrap();
        assembler.delete(0).unwrap();
        let delta = committed(&mut assembler).unwrap();
        assert_eq!(delta.to_string(), "[D0]");
    }
}
