// model = "claude-opus-4-5"
// created = "2026-10-19"
// modified = "2026-10-19"
// driver = "Isaac Clayton"

//! Run Tree
//!
//! An order-statistics B-tree over runs of list slots, each run tagged with
//! what happened to its slots during the current transaction. Deleted slots
//! stay in the tree as tombstones so that every slot can be addressed in
//! three coordinate spaces at once:
//!
//! - `All`: every slot, tombstones included.
//! - `Current`: the list as it stands now (tombstones have no width).
//! - `Original`: the list before the transaction (inserted slots have no width).
//!
//! Structure:
//! - Leaf nodes store up to LEAF_SIZE runs
//! - Internal nodes store up to NODE_SIZE children with per-child measures
//! - All nodes are stored in Vecs (no raw pointers)
//!
//! Operations:
//! - locate: O(log n) - descend by any coordinate space
//! - insert/remove/set: O(log n) amortized - may trigger splits
//! - split_at/coalesce: O(log n) - keep runs maximal after each edit

use std::ops::Add;
use std::ops::AddAssign;
use std::ops::Sub;

const LEAF_SIZE: usize = 64;
const NODE_SIZE: usize = 32;

/// Index into the leaf array.
type LeafIdx = u32;
/// Index into the node array.
type NodeIdx = u32;
/// Sentinel value for no parent / no child.
const NONE: u32 = u32::MAX;

/// What happened to a slot during the transaction.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RunState {
    Unchanged,
    Inserted,
    Updated,
    Deleted,
}

/// A coordinate space of the tree.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Dim {
    All,
    Current,
    Original,
}

/// Widths of a run or subtree in each coordinate space.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Measure {
    pub all: usize,
    pub current: usize,
    pub original: usize,
}

impl Measure {
    #[inline(always)]
    pub fn get(&self, dim: Dim) -> usize {
        return match dim {
            Dim::All => self.all,
            Dim::Current => self.current,
            Dim::Original => self.original,
        };
    }
}

impl Add for Measure {
    type Output = Measure;

    fn add(self, other: Measure) -> Measure {
        return Measure {
            all: self.all + other.all,
            current: self.current + other.current,
            original: self.original + other.original,
        };
    }
}

impl AddAssign for Measure {
    fn add_assign(&mut self, other: Measure) {
        *self = *self + other;
    }
}

impl Sub for Measure {
    type Output = Measure;

    fn sub(self, other: Measure) -> Measure {
        return Measure {
            all: self.all - other.all,
            current: self.current - other.current,
            original: self.original - other.original,
        };
    }
}

/// A maximal stretch of consecutive slots sharing one state.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Run {
    pub state: RunState,
    pub len: usize,
}

impl Run {
    pub fn new(state: RunState, len: usize) -> Run {
        return Run { state, len };
    }

    #[inline]
    pub fn measure(&self) -> Measure {
        return Measure {
            all: self.len,
            current: if self.state == RunState::Deleted { 0 } else { self.len },
            original: if self.state == RunState::Inserted { 0 } else { self.len },
        };
    }
}

/// Result of [`RunTree::locate`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Located {
    /// Index of the run.
    pub item: usize,
    /// Offset of the position within the run.
    pub offset: usize,
    /// Combined measure of every run before this one.
    pub before: Measure,
}

/// A leaf node containing runs.
#[derive(Clone, Debug)]
struct Leaf {
    items: Vec<Run>,
    total: Measure,
    /// Parent node index (NONE for root leaf).
    parent: NodeIdx,
    /// Index of this leaf in the parent's children array.
    index_in_parent: u8,
}

impl Leaf {
    fn new() -> Leaf {
        return Leaf {
            items: Vec::with_capacity(LEAF_SIZE),
            total: Measure::default(),
            parent: NONE,
            index_in_parent: 0,
        };
    }

    #[inline(always)]
    fn len(&self) -> usize {
        return self.items.len();
    }

    #[inline(always)]
    fn is_full(&self) -> bool {
        return self.items.len() >= LEAF_SIZE;
    }

    /// Find the run containing `pos` in the given space.
    /// Returns (index, offset_within_run, measure_before).
    #[inline]
    fn find(&self, dim: Dim, pos: usize) -> Option<(usize, usize, Measure)> {
        let mut cumulative = Measure::default();
        for (i, run) in self.items.iter().enumerate() {
            let measure = run.measure();
            let start = cumulative.get(dim);
            if start + measure.get(dim) > pos {
                return Some((i, pos - start, cumulative));
            }
            cumulative += measure;
        }
        return None;
    }

    /// Split this leaf, returning the right half.
    fn split(&mut self) -> Leaf {
        let mid = self.items.len() / 2;
        let right_items: Vec<_> = self.items.drain(mid..).collect();
        let mut right_total = Measure::default();
        for run in &right_items {
            right_total += run.measure();
        }
        self.total = self.total - right_total;
        return Leaf {
            items: right_items,
            total: right_total,
            parent: NONE,
            index_in_parent: 0,
        };
    }
}

/// An internal node containing child indices and per-child measures.
#[derive(Clone, Debug)]
struct Node {
    /// Child indices. For height > 1, these are NodeIdx into nodes array.
    /// For height == 1, these are LeafIdx into leaves array.
    children: Vec<u32>,
    child_measures: Vec<Measure>,
    /// Run count of each child's subtree.
    child_counts: Vec<usize>,
    total: Measure,
    total_count: usize,
    parent: NodeIdx,
    index_in_parent: u8,
}

impl Node {
    fn new() -> Node {
        return Node {
            children: Vec::with_capacity(NODE_SIZE),
            child_measures: Vec::with_capacity(NODE_SIZE),
            child_counts: Vec::with_capacity(NODE_SIZE),
            total: Measure::default(),
            total_count: 0,
            parent: NONE,
            index_in_parent: 0,
        };
    }

    #[inline(always)]
    fn is_full(&self) -> bool {
        return self.children.len() >= NODE_SIZE;
    }

    /// Find the child containing `pos` in the given space.
    /// Returns (child_index, offset_in_child, measure_before, runs_before).
    #[inline]
    fn find_child(&self, dim: Dim, pos: usize) -> Option<(usize, usize, Measure, usize)> {
        let mut cumulative = Measure::default();
        let mut count_cumulative = 0usize;
        for i in 0..self.child_measures.len() {
            let measure = self.child_measures[i];
            let start = cumulative.get(dim);
            if start + measure.get(dim) > pos {
                return Some((i, pos - start, cumulative, count_cumulative));
            }
            cumulative += measure;
            count_cumulative += self.child_counts[i];
        }
        return None;
    }

    /// Find the child containing the given run index.
    /// Returns (child_index, offset_in_child).
    #[inline]
    fn find_child_by_index(&self, index: usize) -> (usize, usize) {
        let mut cumulative = 0usize;
        for (i, &count) in self.child_counts.iter().enumerate() {
            let next = cumulative + count;
            if next > index {
                return (i, index - cumulative);
            }
            cumulative = next;
        }
        // Return last child with the excess
        let last = self.children.len().saturating_sub(1);
        return (last, index - cumulative + self.child_counts[last]);
    }

    /// Split this node, returning the right half.
    fn split(&mut self) -> Node {
        let mid = self.children.len() / 2;
        let right_children: Vec<_> = self.children.drain(mid..).collect();
        let right_measures: Vec<_> = self.child_measures.drain(mid..).collect();
        let right_counts: Vec<_> = self.child_counts.drain(mid..).collect();
        let mut right_total = Measure::default();
        for measure in &right_measures {
            right_total += *measure;
        }
        let right_count: usize = right_counts.iter().sum();
        self.total = self.total - right_total;
        self.total_count -= right_count;

        return Node {
            children: right_children,
            child_measures: right_measures,
            child_counts: right_counts,
            total: right_total,
            total_count: right_count,
            parent: NONE,
            index_in_parent: 0,
        };
    }
}

/// Runs of slot states, kept maximal: no two neighbouring runs share a state.
pub struct RunTree {
    leaves: Vec<Leaf>,
    nodes: Vec<Node>,
    /// Root index. If height == 0, this is a LeafIdx. Otherwise NodeIdx.
    root: u32,
    /// Tree height. 0 means root is a leaf.
    height: usize,
    total: Measure,
    /// Total number of runs.
    len: usize,
    free_leaves: Vec<LeafIdx>,
    free_nodes: Vec<NodeIdx>,
}

impl RunTree {
    pub fn new() -> RunTree {
        let mut leaves = Vec::new();
        leaves.push(Leaf::new());
        return RunTree {
            leaves,
            nodes: Vec::new(),
            root: 0,
            height: 0,
            total: Measure::default(),
            len: 0,
            free_leaves: Vec::new(),
            free_nodes: Vec::new(),
        };
    }

    /// Drop every run, keeping the arenas' capacity.
    pub fn clear(&mut self) {
        self.leaves.truncate(1);
        self.leaves[0].items.clear();
        self.leaves[0].total = Measure::default();
        self.leaves[0].parent = NONE;
        self.leaves[0].index_in_parent = 0;
        self.nodes.clear();
        self.root = 0;
        self.height = 0;
        self.total = Measure::default();
        self.len = 0;
        self.free_leaves.clear();
        self.free_nodes.clear();
    }

    /// Start over with `len` untouched slots.
    pub fn reset(&mut self, len: usize) {
        self.clear();
        if len > 0 {
            self.insert(0, Run::new(RunState::Unchanged, len));
        }
    }

    /// Number of runs.
    #[inline(always)]
    pub fn len(&self) -> usize {
        return self.len;
    }

    #[inline(always)]
    pub fn is_empty(&self) -> bool {
        return self.len == 0;
    }

    #[inline(always)]
    pub fn total(&self) -> Measure {
        return self.total;
    }

    /// True when no slot has changed.
    pub fn is_unchanged(&self) -> bool {
        return match self.len {
            0 => true,
            1 => self.get(0).map(|run| run.state) == Some(RunState::Unchanged),
            _ => false,
        };
    }

    fn alloc_leaf(&mut self) -> LeafIdx {
        if let Some(idx) = self.free_leaves.pop() {
            self.leaves[idx as usize] = Leaf::new();
            return idx;
        }
        let idx = self.leaves.len() as LeafIdx;
        self.leaves.push(Leaf::new());
        return idx;
    }

    fn alloc_node(&mut self) -> NodeIdx {
        if let Some(idx) = self.free_nodes.pop() {
            self.nodes[idx as usize] = Node::new();
            return idx;
        }
        let idx = self.nodes.len() as NodeIdx;
        self.nodes.push(Node::new());
        return idx;
    }

    /// Find the leaf containing `pos` in the given space.
    /// Returns (leaf_idx, offset_in_leaf, measure_before_leaf, runs_before_leaf).
    #[inline]
    fn find_leaf(&self, dim: Dim, pos: usize) -> Option<(LeafIdx, usize, Measure, usize)> {
        if pos >= self.total.get(dim) {
            return None;
        }

        if self.height == 0 {
            return Some((self.root, pos, Measure::default(), 0));
        }

        let mut node_idx = self.root;
        let mut offset = pos;
        let mut before = Measure::default();
        let mut items_before = 0usize;
        let mut current_height = self.height;

        while current_height > 1 {
            let node = &self.nodes[node_idx as usize];
            let (child_idx, new_offset, measure_before, count_before) = node.find_child(dim, offset)?;
            before += measure_before;
            items_before += count_before;
            node_idx = node.children[child_idx];
            offset = new_offset;
            current_height -= 1;
        }

        // At height 1, children are leaves
        let node = &self.nodes[node_idx as usize];
        let (child_idx, new_offset, measure_before, count_before) = node.find_child(dim, offset)?;
        before += measure_before;
        items_before += count_before;

        return Some((node.children[child_idx], new_offset, before, items_before));
    }

    /// Find the leaf holding the given run index.
    /// Returns (leaf_idx, index_in_leaf).
    #[inline]
    fn find_leaf_by_index(&self, index: usize) -> (LeafIdx, usize) {
        if index >= self.len {
            // For insert at end
            if self.height == 0 {
                return (self.root, self.leaves[self.root as usize].len());
            }
            let mut node_idx = self.root;
            let mut current_height = self.height;
            while current_height > 0 {
                let node = &self.nodes[node_idx as usize];
                node_idx = node.children[node.children.len() - 1];
                current_height -= 1;
            }
            return (node_idx, self.leaves[node_idx as usize].len());
        }

        if self.height == 0 {
            return (self.root, index);
        }

        let mut node_idx = self.root;
        let mut offset = index;
        let mut current_height = self.height;

        while current_height > 1 {
            let node = &self.nodes[node_idx as usize];
            let (child_idx, new_offset) = node.find_child_by_index(offset);
            node_idx = node.children[child_idx];
            offset = new_offset;
            current_height -= 1;
        }

        let node = &self.nodes[node_idx as usize];
        let (child_idx, new_offset) = node.find_child_by_index(offset);
        return (node.children[child_idx], new_offset);
    }

    /// Locate the run containing position `pos` of the given space.
    /// Runs with zero width in that space are skipped.
    pub fn locate(&self, dim: Dim, pos: usize) -> Option<Located> {
        let (leaf_idx, offset_in_leaf, before_leaf, items_before) = self.find_leaf(dim, pos)?;
        let leaf = &self.leaves[leaf_idx as usize];
        let (idx_in_leaf, offset, before_in_leaf) = leaf.find(dim, offset_in_leaf)?;
        return Some(Located {
            item: items_before + idx_in_leaf,
            offset,
            before: before_leaf + before_in_leaf,
        });
    }

    /// Propagate a change of one leaf's measure and run count to the root.
    #[inline]
    fn update_ancestors(&mut self, leaf_idx: LeafIdx, old: Measure, new: Measure, count_delta: isize) {
        let leaf = &self.leaves[leaf_idx as usize];
        let mut parent = leaf.parent;
        let mut child_index = leaf.index_in_parent as usize;

        while parent != NONE {
            let node = &mut self.nodes[parent as usize];
            node.child_measures[child_index] = (node.child_measures[child_index] + new) - old;
            node.total = (node.total + new) - old;
            node.child_counts[child_index] = (node.child_counts[child_index] as isize + count_delta) as usize;
            node.total_count = (node.total_count as isize + count_delta) as usize;
            child_index = node.index_in_parent as usize;
            parent = node.parent;
        }
    }

    pub fn get(&self, index: usize) -> Option<Run> {
        if index >= self.len {
            return None;
        }
        let (leaf_idx, idx_in_leaf) = self.find_leaf_by_index(index);
        return self.leaves[leaf_idx as usize].items.get(idx_in_leaf).copied();
    }

    /// Replace the run at `index`, returning the old one.
    pub fn set(&mut self, index: usize, run: Run) -> Run {
        let (leaf_idx, idx_in_leaf) = self.find_leaf_by_index(index);
        let leaf = &mut self.leaves[leaf_idx as usize];
        let old = std::mem::replace(&mut leaf.items[idx_in_leaf], run);
        let (old_measure, new_measure) = (old.measure(), run.measure());
        leaf.total = (leaf.total + new_measure) - old_measure;
        self.total = (self.total + new_measure) - old_measure;

        if self.height > 0 {
            self.update_ancestors(leaf_idx, old_measure, new_measure, 0);
        }
        return old;
    }

    /// Insert a run before the run at `index`.
    pub fn insert(&mut self, index: usize, run: Run) {
        let (leaf_idx, idx_in_leaf) = self.find_leaf_by_index(index);
        let measure = run.measure();

        let leaf = &mut self.leaves[leaf_idx as usize];
        leaf.items.insert(idx_in_leaf, run);
        leaf.total += measure;

        self.total += measure;
        self.len += 1;

        if self.height > 0 {
            self.update_ancestors(leaf_idx, Measure::default(), measure, 1);
        }

        if self.leaves[leaf_idx as usize].is_full() {
            self.split_leaf(leaf_idx);
        }
    }

    /// Remove the run at `index`.
    pub fn remove(&mut self, index: usize) -> Run {
        let (leaf_idx, idx_in_leaf) = self.find_leaf_by_index(index);
        let leaf = &mut self.leaves[leaf_idx as usize];
        let run = leaf.items.remove(idx_in_leaf);
        let measure = run.measure();
        leaf.total = leaf.total - measure;

        self.total = self.total - measure;
        self.len -= 1;

        if self.height > 0 {
            self.update_ancestors(leaf_idx, measure, Measure::default(), -1);
        }

        // Underflowed leaves are not merged; empty leaves are skipped by lookups
        // and the arenas are cleared at the end of every transaction.
        return run;
    }

    fn split_leaf(&mut self, leaf_idx: LeafIdx) {
        let right = self.leaves[leaf_idx as usize].split();
        let right_measure = right.total;
        let right_count = right.items.len();
        let right_idx = self.alloc_leaf();
        self.leaves[right_idx as usize] = right;

        if self.height == 0 {
            // Root is a leaf, need to create a new root node
            let new_root = self.alloc_node();
            let left_measure = self.leaves[leaf_idx as usize].total;
            let left_count = self.leaves[leaf_idx as usize].len();

            let root = &mut self.nodes[new_root as usize];
            root.children.push(leaf_idx);
            root.children.push(right_idx);
            root.child_measures.push(left_measure);
            root.child_measures.push(right_measure);
            root.child_counts.push(left_count);
            root.child_counts.push(right_count);
            root.total = left_measure + right_measure;
            root.total_count = left_count + right_count;

            self.leaves[leaf_idx as usize].parent = new_root;
            self.leaves[leaf_idx as usize].index_in_parent = 0;
            self.leaves[right_idx as usize].parent = new_root;
            self.leaves[right_idx as usize].index_in_parent = 1;

            self.root = new_root;
            self.height = 1;
        } else {
            let parent = self.leaves[leaf_idx as usize].parent;
            let idx_in_parent = self.leaves[leaf_idx as usize].index_in_parent as usize;

            let left_measure = self.leaves[leaf_idx as usize].total;
            let left_count = self.leaves[leaf_idx as usize].len();
            let node = &mut self.nodes[parent as usize];
            node.child_measures[idx_in_parent] = left_measure;
            node.child_counts[idx_in_parent] = left_count;
            node.children.insert(idx_in_parent + 1, right_idx);
            node.child_measures.insert(idx_in_parent + 1, right_measure);
            node.child_counts.insert(idx_in_parent + 1, right_count);

            // Update indices for siblings after the insertion
            for i in (idx_in_parent + 2)..self.nodes[parent as usize].children.len() {
                let child_idx = self.nodes[parent as usize].children[i];
                self.leaves[child_idx as usize].index_in_parent = i as u8;
            }

            self.leaves[right_idx as usize].parent = parent;
            self.leaves[right_idx as usize].index_in_parent = (idx_in_parent + 1) as u8;

            if self.nodes[parent as usize].is_full() {
                self.split_node(parent, 1);
            }
        }
    }

    /// Split a full internal node at the given height.
    fn split_node(&mut self, node_idx: NodeIdx, height: usize) {
        let right = self.nodes[node_idx as usize].split();
        let right_measure = right.total;
        let right_count = right.total_count;
        let left_count = self.nodes[node_idx as usize].total_count;

        let right_idx = self.alloc_node();
        self.nodes[right_idx as usize] = right;

        let right_children: Vec<u32> = self.nodes[right_idx as usize].children.clone();
        if height == 1 {
            for (i, &child_idx) in right_children.iter().enumerate() {
                self.leaves[child_idx as usize].parent = right_idx;
                self.leaves[child_idx as usize].index_in_parent = i as u8;
            }
        } else {
            for (i, &child_idx) in right_children.iter().enumerate() {
                self.nodes[child_idx as usize].parent = right_idx;
                self.nodes[child_idx as usize].index_in_parent = i as u8;
            }
        }

        if self.nodes[node_idx as usize].parent == NONE {
            let new_root = self.alloc_node();
            let left_measure = self.nodes[node_idx as usize].total;

            let root = &mut self.nodes[new_root as usize];
            root.children.push(node_idx);
            root.children.push(right_idx);
            root.child_measures.push(left_measure);
            root.child_measures.push(right_measure);
            root.child_counts.push(left_count);
            root.child_counts.push(right_count);
            root.total = left_measure + right_measure;
            root.total_count = left_count + right_count;

            self.nodes[node_idx as usize].parent = new_root;
            self.nodes[node_idx as usize].index_in_parent = 0;
            self.nodes[right_idx as usize].parent = new_root;
            self.nodes[right_idx as usize].index_in_parent = 1;

            self.root = new_root;
            self.height += 1;
        } else {
            let parent = self.nodes[node_idx as usize].parent;
            let idx_in_parent = self.nodes[node_idx as usize].index_in_parent as usize;

            let left_measure = self.nodes[node_idx as usize].total;
            let node = &mut self.nodes[parent as usize];
            node.child_measures[idx_in_parent] = left_measure;
            node.child_counts[idx_in_parent] = left_count;
            node.children.insert(idx_in_parent + 1, right_idx);
            node.child_measures.insert(idx_in_parent + 1, right_measure);
            node.child_counts.insert(idx_in_parent + 1, right_count);

            for i in (idx_in_parent + 2)..self.nodes[parent as usize].children.len() {
                let child_idx = self.nodes[parent as usize].children[i];
                self.nodes[child_idx as usize].index_in_parent = i as u8;
            }

            self.nodes[right_idx as usize].parent = parent;
            self.nodes[right_idx as usize].index_in_parent = (idx_in_parent + 1) as u8;

            if self.nodes[parent as usize].is_full() {
                self.split_node(parent, height + 1);
            }
        }
    }

    /// Make sure a run starts at slot `pos` (in `All` space) and return its
    /// index. Returns `len()` when `pos` is past the last slot.
    pub fn split_at(&mut self, pos: usize) -> usize {
        let Some(located) = self.locate(Dim::All, pos) else {
            return self.len;
        };
        if located.offset == 0 {
            return located.item;
        }
        let Some(run) = self.get(located.item) else {
            return self.len;
        };
        self.set(located.item, Run::new(run.state, located.offset));
        self.insert(located.item + 1, Run::new(run.state, run.len - located.offset));
        return located.item + 1;
    }

    /// Merge the run at `index` with equal-state neighbours.
    pub fn coalesce(&mut self, index: usize) {
        let Some(run) = self.get(index) else {
            return;
        };
        let mut run = run;
        if let Some(next) = self.get(index + 1) {
            if next.state == run.state {
                self.remove(index + 1);
                run.len += next.len;
                self.set(index, run);
            }
        }
        if index > 0 {
            if let Some(prev) = self.get(index - 1) {
                if prev.state == run.state {
                    self.remove(index);
                    self.set(index - 1, Run::new(run.state, prev.len + run.len));
                }
            }
        }
    }

    /// Give the single slot at `pos` (in `All` space) a new state.
    pub fn set_slot(&mut self, pos: usize, state: RunState) {
        let index = self.split_at(pos);
        self.split_at(pos + 1);
        self.set(index, Run::new(state, 1));
        self.coalesce(index);
    }

    /// Drop the single slot at `pos` (in `All` space) from the tree.
    pub fn remove_slot(&mut self, pos: usize) {
        let index = self.split_at(pos);
        self.split_at(pos + 1);
        self.remove(index);
        if index > 0 {
            self.coalesce(index - 1);
        }
    }

    /// Insert a single slot so that it lands at `pos` (in `All` space).
    pub fn insert_slot(&mut self, pos: usize, state: RunState) {
        self.insert_run(pos, Run::new(state, 1));
    }

    /// Insert a whole run so that it starts at `pos` (in `All` space).
    pub fn insert_run(&mut self, pos: usize, run: Run) {
        if run.len == 0 {
            return;
        }
        let index = self.split_at(pos);
        self.insert(index, run);
        self.coalesce(index);
    }

    /// State of the slot at `pos` (in `All` space).
    pub fn state_at(&self, pos: usize) -> Option<RunState> {
        let located = self.locate(Dim::All, pos)?;
        return self.get(located.item).map(|run| run.state);
    }

    pub fn iter(&self) -> impl Iterator<Item = &Run> {
        let leaf_order = self.collect_leaves_in_order();
        return RunTreeIter {
            tree: self,
            leaf_order,
            leaf_pos: 0,
            item_idx: 0,
        };
    }

    /// Collect leaf indices in list order by traversing the tree.
    fn collect_leaves_in_order(&self) -> Vec<LeafIdx> {
        let mut result = Vec::new();
        if self.height == 0 {
            result.push(self.root);
        } else {
            self.collect_leaves_recursive(self.root, self.height, &mut result);
        }
        return result;
    }

    fn collect_leaves_recursive(&self, node_idx: NodeIdx, height: usize, result: &mut Vec<LeafIdx>) {
        let node = &self.nodes[node_idx as usize];
        if height == 1 {
            for &child_idx in &node.children {
                result.push(child_idx);
            }
        } else {
            for &child_idx in &node.children {
                self.collect_leaves_recursive(child_idx, height - 1, result);
            }
        }
    }
}

impl Default for RunTree {
    fn default() -> Self {
        return Self::new();
    }
}

struct RunTreeIter<'a> {
    tree: &'a RunTree,
    leaf_order: Vec<LeafIdx>,
    leaf_pos: usize,
    item_idx: usize,
}

impl<'a> Iterator for RunTreeIter<'a> {
    type Item = &'a Run;

    fn next(&mut self) -> Option<Self::Item> {
        while self.leaf_pos < self.leaf_order.len() {
            let leaf_idx = self.leaf_order[self.leaf_pos] as usize;
            let leaf = &self.tree.leaves[leaf_idx];
            if self.item_idx < leaf.items.len() {
                let item = &leaf.items[self.item_idx];
                self.item_idx += 1;
                return Some(item);
            }
            self.leaf_pos += 1;
            self.item_idx = 0;
        }
        return None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use RunState::*;

    fn runs(tree: &RunTree) -> Vec<(RunState, usize)> {
        return tree.iter().map(|run| (run.state, run.len)).collect();
    }

    #[test]
    fn empty_tree() {
        let tree = RunTree::new();
        assert_eq!(tree.len(), 0);
        assert!(tree.is_empty());
        assert!(tree.is_unchanged());
        assert_eq!(tree.locate(Dim::All, 0), None);
    }

    #[test]
    fn reset_creates_one_unchanged_run() {
        let mut tree = RunTree::new();
        tree.reset(10);
        assert_eq!(runs(&tree), vec![(Unchanged, 10)]);
        assert!(tree.is_unchanged());
        assert_eq!(tree.total(), Measure { all: 10, current: 10, original: 10 });
    }

    #[test]
    fn set_slot_splits_and_coalesces() {
        let mut tree = RunTree::new();
        tree.reset(5);
        tree.set_slot(2, Updated);
        assert_eq!(runs(&tree), vec![(Unchanged, 2), (Updated, 1), (Unchanged, 2)]);
        tree.set_slot(3, Updated);
        assert_eq!(runs(&tree), vec![(Unchanged, 2), (Updated, 2), (Unchanged, 1)]);
        tree.set_slot(2, Unchanged);
        tree.set_slot(3, Unchanged);
        assert_eq!(runs(&tree), vec![(Unchanged, 5)]);
    }

    #[test]
    fn tombstones_have_no_current_width() {
        let mut tree = RunTree::new();
        tree.reset(4);
        tree.set_slot(1, Deleted);
        assert_eq!(tree.total(), Measure { all: 4, current: 3, original: 4 });

        // current index 1 skips the tombstone and lands on slot 2
        let located = tree.locate(Dim::Current, 1).unwrap();
        assert_eq!(located.item, 2);
        assert_eq!(located.before.all + located.offset, 2);
    }

    #[test]
    fn inserted_slots_have_no_original_width() {
        let mut tree = RunTree::new();
        tree.reset(2);
        tree.insert_slot(1, Inserted);
        assert_eq!(runs(&tree), vec![(Unchanged, 1), (Inserted, 1), (Unchanged, 1)]);
        assert_eq!(tree.total(), Measure { all: 3, current: 3, original: 2 });

        let located = tree.locate(Dim::Original, 1).unwrap();
        assert_eq!(located.before.current + located.offset, 2);
    }

    #[test]
    fn remove_slot_merges_neighbours() {
        let mut tree = RunTree::new();
        tree.reset(2);
        tree.insert_slot(1, Inserted);
        tree.remove_slot(1);
        assert_eq!(runs(&tree), vec![(Unchanged, 2)]);
    }

    #[test]
    fn insert_at_end() {
        let mut tree = RunTree::new();
        tree.reset(3);
        tree.insert_slot(3, Inserted);
        tree.insert_slot(4, Inserted);
        assert_eq!(runs(&tree), vec![(Unchanged, 3), (Inserted, 2)]);
        assert_eq!(tree.state_at(4), Some(Inserted));
        assert_eq!(tree.state_at(5), None);
    }

    #[test]
    fn clear_keeps_working() {
        let mut tree = RunTree::new();
        tree.reset(100);
        for i in 0..50 {
            tree.set_slot(i * 2, Updated);
        }
        tree.reset(3);
        assert_eq!(runs(&tree), vec![(Unchanged, 3)]);
        tree.set_slot(0, Deleted);
        assert_eq!(runs(&tree), vec![(Deleted, 1), (Unchanged, 2)]);
    }

    #[test]
    fn triggers_splits() {
        // alternating states defeat coalescing and force a deep tree
        let mut tree = RunTree::new();
        tree.reset(10_000);
        for i in 0..5_000 {
            tree.set_slot(i * 2, Updated);
        }
        assert_eq!(tree.len(), 10_000);
        assert!(tree.height >= 2);
        assert_eq!(tree.total(), Measure { all: 10_000, current: 10_000, original: 10_000 });

        for i in 0..10_000 {
            let expected = if i % 2 == 0 { Updated } else { Unchanged };
            assert_eq!(tree.state_at(i), Some(expected), "slot {}", i);
        }

        let collected: usize = tree.iter().map(|run| run.len).sum();
        assert_eq!(collected, 10_000);
    }

    #[test]
    fn many_removals_leave_empty_leaves_navigable() {
        let mut tree = RunTree::new();
        tree.reset(4_000);
        for i in 0..2_000 {
            tree.set_slot(i * 2, Deleted);
        }
        // undelete everything by turning tombstones back into untouched slots
        for i in 0..2_000 {
            tree.set_slot(i * 2, Unchanged);
        }
        assert_eq!(runs(&tree), vec![(Unchanged, 4_000)]);
        assert_eq!(tree.locate(Dim::Current, 3_999).map(|l| l.offset), Some(3_999));
    }
}
