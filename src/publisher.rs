// model = "claude-opus-4-5"
// created = "2026-10-19"
// modified = "2026-10-19"
// driver = "Isaac Clayton"

//! Dependency-Ordered Publisher
//!
//! Subjects (observable collections) register with a publisher, and edges
//! record that one subject derives from another. Committing a transaction
//! on a subject starts a *publication pass* on the committing thread:
//!
//! 1. The root subject delivers its delta inline, while its writer still
//!    holds the collection lock.
//! 2. Any subject whose transaction commits during the pass (typically a
//!    derived collection updated by one of the root's listeners) is queued
//!    instead of firing recursively.
//! 3. The queue is drained in dependency order: a queued subject is only
//!    delivered once no other queued subject can reach it through the graph.
//!    A subject is delivered at most once per pass.
//! 4. A subject that commits again after it was already delivered is
//!    deferred to a follow-up pass, up to [`Config::max_passes`] passes.
//!
//! Listener failures do not stop the pass. The first failure is returned to
//! the committer that started the pass and later ones are logged.

use std::collections::hash_map::Entry;
use std::sync::Arc;
use std::sync::Weak;
use std::sync::atomic::AtomicU64;
use std::sync::atomic::Ordering;
use std::thread;
use std::thread::ThreadId;

use parking_lot::Mutex;
use rustc_hash::FxHashMap;
use rustc_hash::FxHashSet;
use smallvec::SmallVec;
use tracing::debug;
use tracing::trace;
use tracing::warn;

use crate::config::Config;
use crate::error::Error;
use crate::error::Result;

static NEXT_SUBJECT: AtomicU64 = AtomicU64::new(0);
static NEXT_LISTENER: AtomicU64 = AtomicU64::new(0);

/// Identity of an observable collection.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubjectId(u64);

impl SubjectId {
    pub(crate) fn next() -> SubjectId {
        return SubjectId(NEXT_SUBJECT.fetch_add(1, Ordering::Relaxed));
    }
}

/// Identity of a listener registration.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ListenerId(u64);

impl ListenerId {
    pub(crate) fn next() -> ListenerId {
        return ListenerId(NEXT_LISTENER.fetch_add(1, Ordering::Relaxed));
    }
}

/// A collection the publisher can deliver on behalf of.
pub(crate) trait Subject: Send + Sync {
    /// Take the pending delta, if any, and hand it to every live listener.
    fn deliver(&self) -> Result<()>;

    /// Drop the pending delta without delivering it.
    fn discard(&self);
}

/// Collects listener failures during a pass: keeps the first, logs the rest.
#[derive(Default)]
pub(crate) struct Failures {
    first: Option<Error>,
}

impl Failures {
    pub(crate) fn record(&mut self, result: Result<()>) {
        let Err(error) = result else {
            return;
        };
        if self.first.is_none() {
            self.first = Some(error);
        } else {
            warn!(%error, "additional listener failure in the same pass");
        }
    }

    pub(crate) fn finish(self) -> Result<()> {
        return match self.first {
            Some(error) => Err(error),
            None => Ok(()),
        };
    }
}

#[derive(Default)]
struct DependencyGraph {
    subjects: FxHashMap<SubjectId, Weak<dyn Subject>>,
    /// `downstream[upstream][dependent]` counts how many times the edge was added.
    downstream: FxHashMap<SubjectId, FxHashMap<SubjectId, usize>>,
}

impl DependencyGraph {
    /// True if `to` can be reached from `from` by following edges.
    fn reaches(&self, from: SubjectId, to: SubjectId) -> bool {
        let mut stack: SmallVec<[SubjectId; 16]> = SmallVec::new();
        let mut seen = FxHashSet::default();
        stack.push(from);
        while let Some(id) = stack.pop() {
            if id == to {
                return true;
            }
            if !seen.insert(id) {
                continue;
            }
            if let Some(dependents) = self.downstream.get(&id) {
                stack.extend(dependents.keys().copied());
            }
        }
        return false;
    }

    fn remove_subject(&mut self, id: SubjectId) {
        self.subjects.remove(&id);
        self.downstream.remove(&id);
        self.downstream.retain(|_, dependents| {
            dependents.remove(&id);
            return !dependents.is_empty();
        });
    }
}

/// Work of one publication pass on one thread.
struct PassState {
    /// The subject whose writer started the pass. Its lock is held until the
    /// last follow-up pass ends.
    root: SubjectId,
    /// Subject currently being delivered from the queue.
    delivering: Option<SubjectId>,
    queue: SmallVec<[SubjectId; 8]>,
    fired: FxHashSet<SubjectId>,
    deferred: SmallVec<[SubjectId; 4]>,
}

impl PassState {
    fn new(root: SubjectId) -> PassState {
        let mut fired = FxHashSet::default();
        fired.insert(root);
        return PassState {
            root,
            delivering: None,
            queue: SmallVec::new(),
            fired,
            deferred: SmallVec::new(),
        };
    }

    fn enqueue(&mut self, subject: SubjectId) {
        if self.fired.contains(&subject) || self.delivering == Some(subject) {
            if !self.deferred.contains(&subject) {
                debug!(?subject, "subject already delivered in this pass, deferring");
                self.deferred.push(subject);
            }
            return;
        }
        if !self.queue.contains(&subject) {
            self.queue.push(subject);
        }
    }

    /// Pop the first queued subject that no other queued subject leads to.
    fn next_ready(&mut self, graph: &DependencyGraph) -> Option<SubjectId> {
        if self.queue.is_empty() {
            return None;
        }
        let position = (0..self.queue.len())
            .find(|&i| {
                let candidate = self.queue[i];
                return self
                    .queue
                    .iter()
                    .all(|&other| other == candidate || !graph.reaches(other, candidate));
            })
            .unwrap_or(0);
        return Some(self.queue.remove(position));
    }

    /// Subjects whose locks the pass's thread currently holds.
    fn holds(&self, subject: SubjectId) -> bool {
        return self.root == subject || self.delivering == Some(subject);
    }
}

/// Ends the calling thread's pass when dropped, including on unwind, so a
/// panicking listener does not leave the thread marked as publishing.
struct PassGuard<'a> {
    publisher: &'a Publisher,
    thread: ThreadId,
}

impl Drop for PassGuard<'_> {
    fn drop(&mut self) {
        let Some(pass) = self.publisher.passes.lock().remove(&self.thread) else {
            return;
        };
        if thread::panicking() {
            warn!(root = ?pass.root, "listener panicked, abandoning publication pass");
            self.publisher.discard_all(pass.queue.into_iter().chain(pass.deferred));
        }
    }
}

/// Registry of subjects and their dependencies, and driver of publication
/// passes. Shared by every collection that can depend on one another.
pub struct Publisher {
    config: Config,
    graph: Mutex<DependencyGraph>,
    passes: Mutex<FxHashMap<ThreadId, PassState>>,
}

impl Publisher {
    pub fn new() -> Arc<Publisher> {
        return Publisher::with_config(Config::default());
    }

    pub fn with_config(config: Config) -> Arc<Publisher> {
        return Arc::new(Publisher {
            config,
            graph: Mutex::new(DependencyGraph::default()),
            passes: Mutex::new(FxHashMap::default()),
        });
    }

    pub fn config(&self) -> &Config {
        return &self.config;
    }

    /// Record that `dependent` derives from `upstream`. Edges are counted:
    /// each call must be matched by one [`Publisher::remove_dependency`].
    pub fn add_dependency(&self, upstream: SubjectId, dependent: SubjectId) -> Result<()> {
        let mut graph = self.graph.lock();
        if graph.reaches(dependent, upstream) {
            return Err(Error::DependencyCycle { upstream, dependent });
        }
        *graph.downstream.entry(upstream).or_default().entry(dependent).or_insert(0) += 1;
        return Ok(());
    }

    pub fn remove_dependency(&self, upstream: SubjectId, dependent: SubjectId) -> Result<()> {
        let mut graph = self.graph.lock();
        let Entry::Occupied(mut dependents) = graph.downstream.entry(upstream) else {
            return Err(Error::UnknownDependency { upstream, dependent });
        };
        let Entry::Occupied(mut count) = dependents.get_mut().entry(dependent) else {
            return Err(Error::UnknownDependency { upstream, dependent });
        };
        *count.get_mut() -= 1;
        if *count.get() == 0 {
            count.remove();
        }
        if dependents.get().is_empty() {
            dependents.remove();
        }
        return Ok(());
    }

    /// True if `dependent` derives from `upstream`, directly or transitively.
    pub fn depends_on(&self, dependent: SubjectId, upstream: SubjectId) -> bool {
        return dependent != upstream && self.graph.lock().reaches(upstream, dependent);
    }

    /// True while the calling thread is running a publication pass.
    pub fn is_publishing(&self) -> bool {
        return self.passes.lock().contains_key(&thread::current().id());
    }

    pub(crate) fn register(&self, id: SubjectId, subject: Weak<dyn Subject>) {
        self.graph.lock().subjects.insert(id, subject);
    }

    pub(crate) fn unregister(&self, id: SubjectId) {
        self.graph.lock().remove_subject(id);
    }

    /// Fail if the calling thread already holds `id`'s lock for delivery.
    pub(crate) fn check_writable(&self, id: SubjectId) -> Result<()> {
        let passes = self.passes.lock();
        if let Some(pass) = passes.get(&thread::current().id()) {
            if pass.holds(id) {
                return Err(Error::ReentrantWrite(id));
            }
        }
        return Ok(());
    }

    /// Publish a committed transaction of `subject`.
    ///
    /// If the calling thread is already running a pass, the subject is queued
    /// and delivered later in dependency order. Otherwise a new pass starts:
    /// `deliver` runs immediately for the root, then queued work is drained.
    pub(crate) fn fire<F>(&self, subject: SubjectId, deliver: F) -> Result<()>
    where
        F: FnOnce() -> Result<()>,
    {
        let thread = thread::current().id();
        {
            let mut passes = self.passes.lock();
            if let Some(pass) = passes.get_mut(&thread) {
                trace!(?subject, "queueing subject in running pass");
                pass.enqueue(subject);
                return Ok(());
            }
            passes.insert(thread, PassState::new(subject));
        }

        let _guard = PassGuard { publisher: self, thread };
        trace!(?subject, "starting publication pass");
        let mut failures = Failures::default();
        failures.record(deliver());
        self.drain(thread, &mut failures);
        return failures.finish();
    }

    fn drain(&self, thread: ThreadId, failures: &mut Failures) {
        let mut pass_count = 1usize;
        loop {
            while let Some(subject) = self.next_ready(thread) {
                let handle = self.graph.lock().subjects.get(&subject).and_then(Weak::upgrade);
                let Some(handle) = handle else {
                    self.finish_delivery(thread, subject);
                    continue;
                };
                trace!(?subject, "delivering queued subject");
                failures.record(handle.deliver());
                self.finish_delivery(thread, subject);
            }

            let deferred = {
                let mut passes = self.passes.lock();
                let Some(pass) = passes.get_mut(&thread) else {
                    return;
                };
                if pass.deferred.is_empty() {
                    return;
                }
                let deferred = std::mem::take(&mut pass.deferred);
                if pass_count < self.config.max_passes {
                    pass.fired.clear();
                    pass.queue.extend(deferred);
                    pass_count += 1;
                    debug!(pass = pass_count, queued = pass.queue.len(), "starting follow-up pass");
                    continue;
                }
                deferred
            };

            // Out of passes: drop what is left so later writes can publish.
            self.discard_all(deferred);
            warn!(passes = pass_count, "listeners keep re-triggering each other, giving up");
            failures.record(Err(Error::RunawayPasses(pass_count)));
            return;
        }
    }

    fn discard_all(&self, subjects: impl IntoIterator<Item = SubjectId>) {
        for subject in subjects {
            let handle = self.graph.lock().subjects.get(&subject).and_then(Weak::upgrade);
            if let Some(handle) = handle {
                handle.discard();
            }
        }
    }

    fn next_ready(&self, thread: ThreadId) -> Option<SubjectId> {
        let graph = self.graph.lock();
        let mut passes = self.passes.lock();
        let pass = passes.get_mut(&thread)?;
        let subject = pass.next_ready(&graph)?;
        pass.delivering = Some(subject);
        return Some(subject);
    }

    fn finish_delivery(&self, thread: ThreadId, subject: SubjectId) {
        let mut passes = self.passes.lock();
        if let Some(pass) = passes.get_mut(&thread) {
            pass.delivering = None;
            pass.fired.insert(subject);
        }
    }
}
