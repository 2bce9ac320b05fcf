//! AFL Fuzz harness for the delta assembler
//!
//! This harness tests the properties every published delta must have:
//! 1. Canonical form: blocks are ordered, never reach back, and are merged
//! 2. Replay: applying the delta to the old contents yields the new contents
//! 3. Strategy independence: the adaptive and tree-only assemblers agree
//!
//! Model: one list of tagged values receives a transaction of raw edits,
//! recorded in two assemblers side by side.

use afl::fuzz;
use deltalist::Delta;
use deltalist::DeltaAssembler;
use deltalist::Strategy;

/// Operation types the fuzzer can generate
#[derive(Debug, Clone, Copy)]
enum FuzzOp {
    Insert { pos_frac: u8 },
    Update { pos_frac: u8 },
    Delete { pos_frac: u8 },
    /// Close the transaction and start a new one
    Commit,
}

impl FuzzOp {
    fn from_bytes(bytes: &[u8]) -> Option<(FuzzOp, &[u8])> {
        if bytes.is_empty() {
            return None;
        }

        let op_type = bytes[0] % 4;
        let rest = &bytes[1..];

        match op_type {
            0 if !rest.is_empty() => Some((FuzzOp::Insert { pos_frac: rest[0] }, &rest[1..])),
            1 if !rest.is_empty() => Some((FuzzOp::Update { pos_frac: rest[0] }, &rest[1..])),
            2 if !rest.is_empty() => Some((FuzzOp::Delete { pos_frac: rest[0] }, &rest[1..])),
            3 => Some((FuzzOp::Commit, rest)),
            _ => None,
        }
    }
}

fn check(delta: Option<Delta>, other: Option<Delta>, before: &[u32], after: &[u32]) {
    assert_eq!(delta, other, "strategies disagree");
    let Some(delta) = delta else {
        assert_eq!(before, after, "empty delta for a changed list");
        return;
    };
    assert!(delta.is_canonical(), "not canonical: {}", delta);
    let mut replayed = before.to_vec();
    delta.apply_to(&mut replayed, after);
    assert_eq!(replayed, after, "replay of {} diverged", delta);
}

fn main() {
    fuzz!(|data: &[u8]| {
        let mut adaptive = DeltaAssembler::with_strategy(Strategy::Adaptive);
        let mut tree = DeltaAssembler::with_strategy(Strategy::OrderStatisticsTree);
        let mut list: Vec<u32> = (0..16).collect();
        let mut before = list.clone();
        let mut next = 1000u32;
        let mut remaining = data;

        adaptive.begin(true, list.len()).unwrap();
        tree.begin(true, list.len()).unwrap();

        while let Some((op, rest)) = FuzzOp::from_bytes(remaining) {
            remaining = rest;
            let len = list.len();

            match op {
                FuzzOp::Insert { pos_frac } => {
                    let pos = (pos_frac as usize * (len + 1)) / 256;
                    adaptive.insert(pos).unwrap();
                    tree.insert(pos).unwrap();
                    list.insert(pos, next);
                    next += 1;
                }
                FuzzOp::Update { pos_frac } if len > 0 => {
                    let pos = (pos_frac as usize * len) / 256;
                    adaptive.update(pos).unwrap();
                    tree.update(pos).unwrap();
                    list[pos] = next;
                    next += 1;
                }
                FuzzOp::Delete { pos_frac } if len > 0 => {
                    let pos = (pos_frac as usize * len) / 256;
                    adaptive.delete(pos).unwrap();
                    tree.delete(pos).unwrap();
                    list.remove(pos);
                }
                FuzzOp::Commit => {
                    adaptive.commit().unwrap();
                    tree.commit().unwrap();
                    check(adaptive.take(), tree.take(), &before, &list);
                    before = list.clone();
                    adaptive.begin(true, list.len()).unwrap();
                    tree.begin(true, list.len()).unwrap();
                }
                _ => {}
            }
        }

        adaptive.commit().unwrap();
        tree.commit().unwrap();
        check(adaptive.take(), tree.take(), &before, &list);
    });
}
