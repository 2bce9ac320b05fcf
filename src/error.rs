// model = "claude-opus-4-5"
// created = "2026-10-19"
// modified = "2026-10-19"
// driver = "Isaac Clayton"

//! Errors raised by the assembler, the publisher and observable lists.
//!
//! Every variant except [`Error::Listener`] is a local programming error:
//! it is reported synchronously to the caller and never retried.

use thiserror::Error;

use crate::delta::ChangeKind;
use crate::publisher::ListenerId;
use crate::publisher::SubjectId;

#[derive(Debug, Error)]
pub enum Error {
    /// A transaction was begun while a non-nestable one is open.
    #[error("cannot begin a new transaction while a non-nestable transaction is in progress")]
    NestingViolation,

    /// `commit` was called with no matching `begin`.
    #[error("cannot commit without a transaction in progress")]
    CommitWithoutBegin,

    /// A raw mutation was issued outside of any transaction.
    #[error("cannot record a change without a transaction in progress")]
    NoTransaction,

    /// A reorder was requested on a non-empty delta, or a change followed a reorder.
    #[error("cannot combine a reorder with other changes in the same transaction")]
    ReorderCombination,

    /// The permutation handed to `reorder` is not a bijection on `0..expected`.
    #[error("permutation of length {len} is not a reordering of {expected} elements")]
    InvalidPermutation { len: usize, expected: usize },

    #[error("index {index} is out of bounds for a list of length {len}")]
    IndexOutOfBounds { index: usize, len: usize },

    /// Two changes to the same slot conflict and contradictions are not allowed.
    #[error("{kind:?} at index {index} contradicts an earlier change in the same transaction")]
    Contradiction { kind: ChangeKind, index: usize },

    #[error("cannot remove nonexistent listener {0:?}")]
    UnknownListener(ListenerId),

    #[error("no dependency recorded from {upstream:?} to {dependent:?}")]
    UnknownDependency { upstream: SubjectId, dependent: SubjectId },

    /// Adding the edge would make a topological firing order impossible.
    #[error("dependency from {upstream:?} to {dependent:?} would form a cycle")]
    DependencyCycle { upstream: SubjectId, dependent: SubjectId },

    /// The calling thread is delivering this subject and still holds its lock.
    #[error("cannot write to {0:?} while it is publishing a change")]
    ReentrantWrite(SubjectId),

    #[error("gave up after {0} publication passes; listeners keep re-triggering each other")]
    RunawayPasses(usize),

    /// A live listener failed while handling a change.
    #[error("listener failed: {0}")]
    Listener(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl Error {
    /// Wrap an arbitrary listener failure.
    pub fn listener<E>(error: E) -> Error
    where
        E: Into<Box<dyn std::error::Error + Send + Sync>>,
    {
        return Error::Listener(error.into());
    }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
