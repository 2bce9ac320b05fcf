// model = "claude-opus-4-5"
// created = "2026-10-19"
// modified = "2026-10-19"
// driver = "Isaac Clayton"

//! Bulk Diff Synthesizer
//!
//! Computes a shortest edit script between two snapshots of a list with
//! Myers' O(ND) difference algorithm, after trimming the common prefix and
//! suffix. The linear-space variant is used: each window is split where the
//! forward and reverse searches meet, so unrelated inputs cost time but not
//! quadratic memory. The script is expressed in the same sequential coordinates as a
//! [`Delta`], so it can be replayed edit by edit against a list (see
//! `ListWriter::replace_all`) or packed directly into a canonical delta.
//!
//! Within each stretch between two kept elements, deletions come before
//! insertions.

use std::ops::Range;

use crate::delta::ChangeKind;
use crate::delta::Delta;

/// One step of an edit script. `index` is the position in the list as it
/// stands after every earlier step; `source` indexes the target snapshot.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Edit {
    Delete { index: usize },
    Insert { index: usize, source: usize },
    Update { index: usize, source: usize },
}

/// Minimal delete/insert script turning `current` into `target`.
pub fn edit_script<T: PartialEq>(current: &[T], target: &[T]) -> Vec<Edit> {
    return script(current, target, |a, b| a == b, |_, _| false);
}

/// Canonical delta turning `current` into `target`.
///
/// With `treat_equal_as_update`, every element kept by the script is
/// reported as updated in place, for listeners that care about element
/// replacement even when the new value compares equal.
pub fn synthesize<T: PartialEq>(current: &[T], target: &[T], treat_equal_as_update: bool) -> Delta {
    if current.is_empty() && target.is_empty() {
        return Delta::new();
    }
    let edits = script(current, target, |a, b| a == b, |_, _| treat_equal_as_update);
    return pack(&edits);
}

/// Canonical delta turning `current` into `target`, aligning elements by
/// `same` (an identity) instead of full equality. Aligned pairs that differ
/// by value are reported as updates instead of a delete and an insert.
pub fn synthesize_by<T, F>(current: &[T], target: &[T], same: F) -> Delta
where
    T: PartialEq,
    F: Fn(&T, &T) -> bool,
{
    if current.is_empty() && target.is_empty() {
        return Delta::new();
    }
    let edits = script(current, target, same, |a, b| a != b);
    return pack(&edits);
}

/// Edit script aligning elements with `same`; kept pairs for which `update`
/// holds are emitted as updates.
pub(crate) fn script<T, S, U>(current: &[T], target: &[T], same: S, update: U) -> Vec<Edit>
where
    S: Fn(&T, &T) -> bool,
    U: Fn(&T, &T) -> bool,
{
    let prefix = current
        .iter()
        .zip(target.iter())
        .take_while(|(a, b)| same(a, b))
        .count();
    let suffix = current[prefix..]
        .iter()
        .rev()
        .zip(target[prefix..].iter().rev())
        .take_while(|(a, b)| same(a, b))
        .count();

    let middle_current = &current[prefix..current.len() - suffix];
    let middle_target = &target[prefix..target.len() - suffix];

    let mut steps = Vec::with_capacity(current.len().max(target.len()));
    steps.extend(std::iter::repeat_n(Step::Keep, prefix));
    let align = |x: usize, y: usize| same(&middle_current[x], &middle_target[y]);
    divide(&align, 0..middle_current.len(), 0..middle_target.len(), &mut steps);
    steps.extend(std::iter::repeat_n(Step::Keep, suffix));

    return into_edits(&steps, current, target, update);
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Step {
    Keep,
    Delete,
    Insert,
}

/// Append a shortest path through `current[xs]` against `target[ys]` as
/// steps, splitting the window at the middle snake and recursing on both
/// halves. Memory stays linear in the window size.
fn divide<F>(same: &F, xs: Range<usize>, ys: Range<usize>, steps: &mut Vec<Step>)
where
    F: Fn(usize, usize) -> bool,
{
    let (mut xs, mut ys) = (xs, ys);
    let mut prefix = 0;
    while !xs.is_empty() && !ys.is_empty() && same(xs.start, ys.start) {
        xs.start += 1;
        ys.start += 1;
        prefix += 1;
    }
    let mut suffix = 0;
    while !xs.is_empty() && !ys.is_empty() && same(xs.end - 1, ys.end - 1) {
        xs.end -= 1;
        ys.end -= 1;
        suffix += 1;
    }

    steps.extend(std::iter::repeat_n(Step::Keep, prefix));
    let split = if xs.is_empty() || ys.is_empty() {
        None
    } else {
        middle_snake(same, xs.clone(), ys.clone())
    };
    match split {
        Some((x, y)) => {
            divide(same, xs.start..x, ys.start..y, steps);
            divide(same, x..xs.end, y..ys.end, steps);
        }
        None => {
            steps.extend(std::iter::repeat_n(Step::Delete, xs.len()));
            steps.extend(std::iter::repeat_n(Step::Insert, ys.len()));
        }
    }
    steps.extend(std::iter::repeat_n(Step::Keep, suffix));
}

/// Run the forward and reverse searches towards each other and return the
/// absolute point where they meet. `None` means nothing in the window
/// matches.
fn middle_snake<F>(same: &F, xs: Range<usize>, ys: Range<usize>) -> Option<(usize, usize)>
where
    F: Fn(usize, usize) -> bool,
{
    let n = xs.len() as isize;
    let m = ys.len() as isize;
    let max_d = (n + m + 1) / 2;
    let offset = max_d;
    let width = 2 * max_d + 2;
    let mut forward = vec![-1isize; width as usize];
    let mut reverse = vec![-1isize; width as usize];
    forward[(offset + 1) as usize] = 0;
    reverse[(offset + 1) as usize] = 0;

    let delta = n - m;
    // With an odd delta the searches meet on a forward step.
    let front = delta % 2 != 0;
    // Diagonals that ran off the edge of the grid are skipped.
    let (mut k1_start, mut k1_end, mut k2_start, mut k2_end) = (0isize, 0isize, 0isize, 0isize);

    for d in 0..max_d {
        let mut k1 = -d + k1_start;
        while k1 <= d - k1_end {
            let slot = (offset + k1) as usize;
            let mut x1 = if k1 == -d || (k1 != d && forward[slot - 1] < forward[slot + 1]) {
                forward[slot + 1]
            } else {
                forward[slot - 1] + 1
            };
            let mut y1 = x1 - k1;
            while x1 < n && y1 < m && same(xs.start + x1 as usize, ys.start + y1 as usize) {
                x1 += 1;
                y1 += 1;
            }
            forward[slot] = x1;
            if x1 > n {
                k1_end += 2;
            } else if y1 > m {
                k1_start += 2;
            } else if front {
                let mirror = offset + delta - k1;
                if (0..width).contains(&mirror) && reverse[mirror as usize] != -1 && x1 >= n - reverse[mirror as usize] {
                    return Some((xs.start + x1 as usize, ys.start + y1 as usize));
                }
            }
            k1 += 2;
        }

        let mut k2 = -d + k2_start;
        while k2 <= d - k2_end {
            let slot = (offset + k2) as usize;
            let mut x2 = if k2 == -d || (k2 != d && reverse[slot - 1] < reverse[slot + 1]) {
                reverse[slot + 1]
            } else {
                reverse[slot - 1] + 1
            };
            let mut y2 = x2 - k2;
            while x2 < n && y2 < m && same(xs.end - 1 - x2 as usize, ys.end - 1 - y2 as usize) {
                x2 += 1;
                y2 += 1;
            }
            reverse[slot] = x2;
            if x2 > n {
                k2_end += 2;
            } else if y2 > m {
                k2_start += 2;
            } else if !front {
                let mirror = offset + delta - k2;
                if (0..width).contains(&mirror) && forward[mirror as usize] != -1 {
                    let x1 = forward[mirror as usize];
                    let y1 = x1 - (mirror - offset);
                    if x1 >= n - x2 {
                        return Some((xs.start + x1 as usize, ys.start + y1 as usize));
                    }
                }
            }
            k2 += 2;
        }
    }
    return None;
}

/// Turn steps into positioned edits, putting each stretch's deletions
/// before its insertions.
fn into_edits<T, U>(steps: &[Step], current: &[T], target: &[T], update: U) -> Vec<Edit>
where
    U: Fn(&T, &T) -> bool,
{
    let mut edits = Vec::new();
    // Position in the working list equals the number of target elements done.
    let (mut i, mut j) = (0usize, 0usize);
    let mut cursor = 0usize;
    while cursor < steps.len() {
        if steps[cursor] == Step::Keep {
            if update(&current[i], &target[j]) {
                edits.push(Edit::Update { index: j, source: j });
            }
            i += 1;
            j += 1;
            cursor += 1;
            continue;
        }

        let stretch_end = steps[cursor..]
            .iter()
            .position(|&step| step == Step::Keep)
            .map_or(steps.len(), |p| cursor + p);
        let stretch = &steps[cursor..stretch_end];
        let deletes = stretch.iter().filter(|&&step| step == Step::Delete).count();
        let inserts = stretch.len() - deletes;
        for _ in 0..deletes {
            edits.push(Edit::Delete { index: j });
        }
        i += deletes;
        for _ in 0..inserts {
            edits.push(Edit::Insert { index: j, source: j });
            j += 1;
        }
        cursor = stretch_end;
    }
    debug_assert_eq!((i, j), (current.len(), target.len()));
    return edits;
}

/// Pack an edit script into a canonical delta.
fn pack(edits: &[Edit]) -> Delta {
    let mut delta = Delta::new();
    for edit in edits {
        match *edit {
            Edit::Delete { index } => delta.push(ChangeKind::Delete, index, 1),
            Edit::Insert { index, .. } => delta.push(ChangeKind::Insert, index, 1),
            Edit::Update { index, .. } => delta.push(ChangeKind::Update, index, 1),
        }
    }
    return delta;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::delta::Operation;

    fn cost(edits: &[Edit]) -> usize {
        return edits.iter().filter(|edit| !matches!(edit, Edit::Update { .. })).count();
    }

    fn apply<T: Clone>(current: &[T], target: &[T], edits: &[Edit]) -> Vec<T> {
        let mut list = current.to_vec();
        for edit in edits {
            match *edit {
                Edit::Delete { index } => {
                    list.remove(index);
                }
                Edit::Insert { index, source } => list.insert(index, target[source].clone()),
                Edit::Update { index, source } => list[index] = target[source].clone(),
            }
        }
        return list;
    }

    #[test]
    fn swap_costs_two() {
        let current = [1, 2, 3];
        let target = [1, 3, 2];
        let edits = edit_script(&current, &target);
        assert_eq!(cost(&edits), 2);
        assert_eq!(apply(&current, &target, &edits), target);

        let delta = synthesize(&current, &target, false);
        assert_eq!(
            delta.operations(),
            &[Operation::single(ChangeKind::Delete, 1), Operation::single(ChangeKind::Insert, 2)]
        );
    }

    #[test]
    fn empty_to_empty_is_empty() {
        let delta = synthesize::<u8>(&[], &[], true);
        assert!(delta.is_empty());
    }

    #[test]
    fn from_and_to_empty() {
        let delta = synthesize(&[], &[1, 2, 3], false);
        assert_eq!(delta.to_string(), "[I0-2]");
        let delta = synthesize(&[1, 2, 3], &[], false);
        assert_eq!(delta.to_string(), "[D0-2]");
    }

    #[test]
    fn deletes_precede_inserts() {
        let edits = edit_script(&['a', 'b'], &['c', 'd']);
        assert_eq!(
            edits,
            vec![
                Edit::Delete { index: 0 },
                Edit::Delete { index: 0 },
                Edit::Insert { index: 0, source: 0 },
                Edit::Insert { index: 1, source: 1 },
            ]
        );
        assert_eq!(synthesize(&['a', 'b'], &['c', 'd'], false).to_string(), "[D0-1 I0-1]");
    }

    #[test]
    fn equal_as_update_reports_kept_elements() {
        let delta = synthesize(&[1, 2, 3], &[1, 2, 4], true);
        assert_eq!(delta.to_string(), "[U0-1 D2 I2]");
    }

    #[test]
    fn identity_alignment_emits_updates() {
        let current = [(1, "a"), (2, "b"), (3, "c")];
        let target = [(1, "a"), (2, "B"), (4, "d")];
        let delta = synthesize_by(&current, &target, |x, y| x.0 == y.0);
        assert_eq!(delta.to_string(), "[U1 D2 I2]");

        let mut replayed = current.to_vec();
        delta.apply_to(&mut replayed, &target);
        assert_eq!(replayed, target);
    }

    #[test]
    fn unrelated_large_lists_replace_everything() {
        let current: Vec<u32> = (0..4000).collect();
        let target: Vec<u32> = (10_000..13_000).collect();
        let delta = synthesize(&current, &target, false);
        assert_eq!(delta.to_string(), "[D0-3999 I0-2999]");

        let mut replayed = current.clone();
        delta.apply_to(&mut replayed, &target);
        assert_eq!(replayed, target);
    }

    #[test]
    fn reversed_large_list_keeps_one() {
        let current: Vec<u32> = (0..1500).collect();
        let target: Vec<u32> = (0..1500).rev().collect();
        let edits = edit_script(&current, &target);
        assert_eq!(cost(&edits), 2 * 1499);
        assert_eq!(apply(&current, &target, &edits), target);
    }

    #[test]
    fn sparse_edits_in_a_long_list() {
        let current: Vec<u32> = (0..3000).collect();
        let mut target = current.clone();
        target.remove(2000);
        target.insert(1000, 99_999);
        target[500] = 77_777;
        let edits = edit_script(&current, &target);
        assert_eq!(cost(&edits), 4);
        assert_eq!(apply(&current, &target, &edits), target);
    }

    #[test]
    fn classic_example() {
        let current: Vec<char> = "ABCABBA".chars().collect();
        let target: Vec<char> = "CBABAC".chars().collect();
        let edits = edit_script(&current, &target);
        assert_eq!(cost(&edits), 5);
        assert_eq!(apply(&current, &target, &edits), target);

        let delta = synthesize(&current, &target, false);
        assert!(delta.is_canonical());
        let mut replayed = current.clone();
        delta.apply_to(&mut replayed, &target);
        assert_eq!(replayed, target);
    }
}
