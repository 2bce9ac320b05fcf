// model = "claude-opus-4-5"
// created = "2026-10-19"
// modified = "2026-10-19"
// driver = "Isaac Clayton"

//! Observable List
//!
//! A `Vec`-backed list that records every mutation through a
//! [`DeltaAssembler`] and publishes one canonical [`Delta`] per outermost
//! transaction.
//!
//! All writes go through a [`ListWriter`], which holds the list's write lock
//! from the first change until the commit has been published. Listeners are
//! therefore invoked with the lock held: they receive the post-commit
//! contents in the event and must not lock the publishing list themselves.
//! Writing to *another* list from a listener is fine; that list's commit is
//! queued by the [`Publisher`] and delivered after the current one, in
//! dependency order.
//!
//! # Example
//!
//! ```
//! use deltalist::list::ObservableList;
//! use deltalist::publisher::Publisher;
//!
//! let publisher = Publisher::new();
//! let names = ObservableList::from_vec(&publisher, vec!["ada", "grace"]);
//! let lengths = names.map(|name| name.len()).unwrap();
//!
//! let mut writer = names.write().unwrap();
//! writer.push("barbara").unwrap();
//! writer.commit().unwrap();
//!
//! assert_eq!(&*lengths.read(), &[3, 5, 7]);
//! ```

use std::cmp::Ordering;
use std::sync::Arc;
use std::sync::Weak;

use parking_lot::MappedRwLockReadGuard;
use parking_lot::Mutex;
use parking_lot::RwLock;
use parking_lot::RwLockReadGuard;
use parking_lot::RwLockWriteGuard;
use tracing::debug;
use tracing::trace;
use tracing::warn;

use crate::delta::ChangeKind;
use crate::delta::Delta;
use crate::delta::assembler::Commit;
use crate::delta::assembler::DeltaAssembler;
use crate::delta::permute;
use crate::diff;
use crate::diff::Edit;
use crate::error::Error;
use crate::error::Result;
use crate::publisher::Failures;
use crate::publisher::ListenerId;
use crate::publisher::Publisher;
use crate::publisher::Subject;
use crate::publisher::SubjectId;

/// What a listener receives for one published transaction.
pub struct ListEvent<'a, T> {
    pub subject: SubjectId,
    /// Contents of the list after the transaction.
    pub source: &'a [T],
    /// Only valid for the duration of the callback.
    pub delta: &'a Delta,
}

pub trait ListListener<T>: Send + Sync {
    fn list_changed(&self, event: &ListEvent<'_, T>) -> Result<()>;
}

impl<T, F> ListListener<T> for F
where
    F: Fn(&ListEvent<'_, T>) -> Result<()> + Send + Sync,
{
    fn list_changed(&self, event: &ListEvent<'_, T>) -> Result<()> {
        return self(event);
    }
}

type StalePredicate = Box<dyn Fn() -> bool + Send + Sync>;

struct Registration<T> {
    id: ListenerId,
    listener: Arc<dyn ListListener<T>>,
    is_stale: Option<StalePredicate>,
    /// Set when the listener feeds a derived list.
    dependent: Option<SubjectId>,
}

impl<T> Registration<T> {
    fn is_stale(&self) -> bool {
        return self.is_stale.as_ref().is_some_and(|is_stale| is_stale());
    }
}

struct ListState<T> {
    elements: Vec<T>,
    assembler: DeltaAssembler,
}

pub struct ObservableList<T> {
    id: SubjectId,
    publisher: Arc<Publisher>,
    state: RwLock<ListState<T>>,
    listeners: Mutex<Vec<Arc<Registration<T>>>>,
}

impl<T: Send + Sync + 'static> ObservableList<T> {
    pub fn new(publisher: &Arc<Publisher>) -> Arc<ObservableList<T>> {
        return ObservableList::from_vec(publisher, Vec::new());
    }

    pub fn from_vec(publisher: &Arc<Publisher>, elements: Vec<T>) -> Arc<ObservableList<T>> {
        let list = Arc::new(ObservableList {
            id: SubjectId::next(),
            publisher: Arc::clone(publisher),
            state: RwLock::new(ListState {
                elements,
                assembler: DeltaAssembler::with_config(publisher.config()),
            }),
            listeners: Mutex::new(Vec::new()),
        });
        let subject: Weak<dyn Subject> = Arc::downgrade(&list) as Weak<dyn Subject>;
        publisher.register(list.id, subject);
        return list;
    }

    pub fn id(&self) -> SubjectId {
        return self.id;
    }

    pub fn publisher(&self) -> &Arc<Publisher> {
        return &self.publisher;
    }

    pub fn len(&self) -> usize {
        return self.state.read().elements.len();
    }

    pub fn is_empty(&self) -> bool {
        return self.len() == 0;
    }

    pub fn get(&self, index: usize) -> Option<T>
    where
        T: Clone,
    {
        return self.state.read().elements.get(index).cloned();
    }

    /// Shared access to the contents. Blocks while a writer is open.
    pub fn read(&self) -> MappedRwLockReadGuard<'_, [T]> {
        return RwLockReadGuard::map(self.state.read(), |state| state.elements.as_slice());
    }

    pub fn to_vec(&self) -> Vec<T>
    where
        T: Clone,
    {
        return self.read().to_vec();
    }

    /// Open a transaction. Nested transactions are allowed inside it, and
    /// contradicting changes fold into their net effect.
    pub fn write(&self) -> Result<ListWriter<'_, T>> {
        return self.begin_write(true);
    }

    /// Open a transaction in which nesting and contradicting changes are
    /// errors.
    pub fn write_exclusive(&self) -> Result<ListWriter<'_, T>> {
        return self.begin_write(false);
    }

    fn begin_write(&self, allow_nested: bool) -> Result<ListWriter<'_, T>> {
        // The calling thread may be delivering this very list.
        self.publisher.check_writable(self.id)?;
        let mut state = self.state.write();
        let len = state.elements.len();
        state.assembler.begin(allow_nested, len)?;
        return Ok(ListWriter {
            list: self,
            state,
            finished: false,
        });
    }

    pub fn add_listener<L>(&self, listener: L) -> ListenerId
    where
        L: ListListener<T> + 'static,
    {
        return self.register(Arc::new(listener), None, None);
    }

    /// Register a listener that is dropped, unannounced, the first time
    /// `is_stale` returns true before a delivery.
    pub fn add_listener_with_liveness<L, S>(&self, listener: L, is_stale: S) -> ListenerId
    where
        L: ListListener<T> + 'static,
        S: Fn() -> bool + Send + Sync + 'static,
    {
        return self.register(Arc::new(listener), Some(Box::new(is_stale)), None);
    }

    /// Register a listener without keeping it alive. It is pruned once every
    /// other reference to it is gone.
    pub fn add_weak_listener<L>(&self, listener: &Arc<L>) -> ListenerId
    where
        L: ListListener<T> + 'static,
    {
        let target = Arc::downgrade(listener);
        let liveness = target.clone();
        let proxy = move |event: &ListEvent<'_, T>| -> Result<()> {
            return match target.upgrade() {
                Some(listener) => listener.list_changed(event),
                None => Ok(()),
            };
        };
        return self.register(Arc::new(proxy), Some(Box::new(move || liveness.strong_count() == 0)), None);
    }

    pub fn remove_listener(&self, id: ListenerId) -> Result<()> {
        let removed = {
            let mut registrations = self.listeners.lock();
            let position = registrations
                .iter()
                .position(|registration| registration.id == id)
                .ok_or(Error::UnknownListener(id))?;
            registrations.remove(position)
        };
        if let Some(dependent) = removed.dependent {
            self.drop_dependency(dependent);
        }
        return Ok(());
    }

    pub fn listener_count(&self) -> usize {
        return self.listeners.lock().len();
    }

    /// Ids of the registered listeners, in delivery order.
    pub fn listener_ids(&self) -> Vec<ListenerId> {
        return self.listeners.lock().iter().map(|registration| registration.id).collect();
    }

    /// A derived list holding `f` of every element, kept in sync through
    /// this list's deltas. The derived list stops listening once dropped.
    pub fn map<U, F>(self: &Arc<Self>, f: F) -> Result<Arc<ObservableList<U>>>
    where
        U: Send + Sync + 'static,
        F: Fn(&T) -> U + Send + Sync + 'static,
    {
        let initial: Vec<U> = self.read().iter().map(&f).collect();
        let derived = ObservableList::from_vec(&self.publisher, initial);
        self.publisher.add_dependency(self.id, derived.id)?;

        let target = Arc::downgrade(&derived);
        let liveness = target.clone();
        let forward = move |event: &ListEvent<'_, T>| -> Result<()> {
            let Some(derived) = target.upgrade() else {
                return Ok(());
            };
            let mut writer = derived.write()?;
            writer.forward(event.delta, |i| f(&event.source[i]))?;
            return writer.commit();
        };
        self.register(
            Arc::new(forward),
            Some(Box::new(move || liveness.strong_count() == 0)),
            Some(derived.id),
        );
        return Ok(derived);
    }

    fn register(
        &self,
        listener: Arc<dyn ListListener<T>>,
        is_stale: Option<StalePredicate>,
        dependent: Option<SubjectId>,
    ) -> ListenerId {
        let id = ListenerId::next();
        self.listeners.lock().push(Arc::new(Registration {
            id,
            listener,
            is_stale,
            dependent,
        }));
        return id;
    }

    fn drop_dependency(&self, dependent: SubjectId) {
        // The dependent may have been dropped already, taking its edges along.
        if let Err(error) = self.publisher.remove_dependency(self.id, dependent) {
            trace!(%error, "dependency already gone");
        }
    }

    /// Unregister a listener found stale at delivery time.
    fn prune(&self, registration: &Registration<T>) {
        debug!(subject = ?self.id, listener = ?registration.id, "pruning stale listener");
        self.listeners.lock().retain(|entry| entry.id != registration.id);
        if let Some(dependent) = registration.dependent {
            self.drop_dependency(dependent);
        }
    }

    /// Publish the pending delta to every live listener. The caller holds
    /// the write lock.
    fn deliver_locked(&self, state: &mut ListState<T>) -> Result<()> {
        let Some(delta) = state.assembler.take() else {
            return Ok(());
        };
        let listeners = self.listeners.lock().clone();
        trace!(subject = ?self.id, listeners = listeners.len(), %delta, "delivering");

        let mut failures = Failures::default();
        {
            let event = ListEvent {
                subject: self.id,
                source: &state.elements,
                delta: &delta,
            };
            // an earlier listener may have retired a later one
            for registration in &listeners {
                if registration.is_stale() {
                    self.prune(registration);
                    continue;
                }
                failures.record(registration.listener.list_changed(&event));
            }
        }
        state.assembler.recycle(delta);
        return failures.finish();
    }
}

impl<T: Send + Sync + 'static> Subject for ObservableList<T> {
    fn deliver(&self) -> Result<()> {
        let mut state = self.state.write();
        return self.deliver_locked(&mut state);
    }

    fn discard(&self) {
        let mut state = self.state.write();
        if let Some(delta) = state.assembler.take() {
            debug!(subject = ?self.id, %delta, "discarding undelivered delta");
            state.assembler.recycle(delta);
        }
    }
}

impl<T> Drop for ObservableList<T> {
    fn drop(&mut self) {
        self.publisher.unregister(self.id);
    }
}

/// An open transaction on an [`ObservableList`].
///
/// Dropping a writer without calling [`ListWriter::commit`] commits it
/// anyway and logs a warning; errors from that commit are only logged.
pub struct ListWriter<'a, T: Send + Sync + 'static> {
    list: &'a ObservableList<T>,
    state: RwLockWriteGuard<'a, ListState<T>>,
    finished: bool,
}

impl<'a, T: Send + Sync + 'static> ListWriter<'a, T> {
    pub fn len(&self) -> usize {
        return self.state.elements.len();
    }

    pub fn is_empty(&self) -> bool {
        return self.state.elements.is_empty();
    }

    pub fn get(&self, index: usize) -> Option<&T> {
        return self.state.elements.get(index);
    }

    pub fn as_slice(&self) -> &[T] {
        return &self.state.elements;
    }

    pub fn insert(&mut self, index: usize, value: T) -> Result<()> {
        self.state.assembler.insert(index)?;
        self.state.elements.insert(index, value);
        return Ok(());
    }

    pub fn push(&mut self, value: T) -> Result<()> {
        let len = self.state.elements.len();
        return self.insert(len, value);
    }

    /// Replace the element at `index`, returning the old one.
    pub fn set(&mut self, index: usize, value: T) -> Result<T> {
        self.state.assembler.update(index)?;
        return Ok(std::mem::replace(&mut self.state.elements[index], value));
    }

    pub fn remove(&mut self, index: usize) -> Result<T> {
        self.state.assembler.delete(index)?;
        return Ok(self.state.elements.remove(index));
    }

    pub fn clear(&mut self) -> Result<()> {
        let len = self.state.elements.len();
        if len == 0 {
            return Ok(());
        }
        self.state.assembler.delete_range(0, len - 1)?;
        self.state.elements.clear();
        return Ok(());
    }

    /// Move `element[old]` to `permutation[old]`. Only allowed before any
    /// other change in the transaction.
    pub fn reorder(&mut self, permutation: Vec<usize>) -> Result<()> {
        let state = &mut *self.state;
        state.assembler.reorder(permutation.clone())?;
        permute(&mut state.elements, &permutation);
        return Ok(());
    }

    /// Stable sort, published as a reorder.
    pub fn sort_by<F>(&mut self, mut compare: F) -> Result<()>
    where
        F: FnMut(&T, &T) -> Ordering,
    {
        let elements = &self.state.elements;
        let mut order: Vec<usize> = (0..elements.len()).collect();
        order.sort_by(|&a, &b| compare(&elements[a], &elements[b]));
        let mut permutation = vec![0; order.len()];
        for (new, &old) in order.iter().enumerate() {
            permutation[old] = new;
        }
        return self.reorder(permutation);
    }

    /// Turn the contents into `target` with a shortest edit script.
    pub fn replace_all(&mut self, target: &[T], treat_equal_as_update: bool) -> Result<()>
    where
        T: Clone + PartialEq,
    {
        let edits = diff::script(&self.state.elements, target, |a, b| a == b, |_, _| treat_equal_as_update);
        return self.apply_edits(&edits, target);
    }

    /// Like [`ListWriter::replace_all`], aligning elements by `same` and
    /// updating aligned elements whose value changed.
    pub fn replace_all_by<F>(&mut self, target: &[T], same: F) -> Result<()>
    where
        T: Clone + PartialEq,
        F: Fn(&T, &T) -> bool,
    {
        let edits = diff::script(&self.state.elements, target, same, |a, b| a != b);
        return self.apply_edits(&edits, target);
    }

    fn apply_edits(&mut self, edits: &[Edit], target: &[T]) -> Result<()>
    where
        T: Clone,
    {
        for edit in edits {
            match *edit {
                Edit::Delete { index } => {
                    self.remove(index)?;
                }
                Edit::Insert { index, source } => self.insert(index, target[source].clone())?,
                Edit::Update { index, source } => {
                    self.set(index, target[source].clone())?;
                }
            }
        }
        return Ok(());
    }

    /// Replay a delta from another list. `make(i)` builds the element for
    /// post-transaction index `i`.
    pub fn forward<F>(&mut self, delta: &Delta, mut make: F) -> Result<()>
    where
        F: FnMut(usize) -> T,
    {
        if let Some(permutation) = delta.reorder() {
            return self.reorder(permutation.to_vec());
        }
        for op in delta.operations() {
            match op.kind {
                ChangeKind::Insert => {
                    for index in op.start..=op.end {
                        self.insert(index, make(index))?;
                    }
                }
                ChangeKind::Update => {
                    for index in op.start..=op.end {
                        self.set(index, make(index))?;
                    }
                }
                ChangeKind::Delete => {
                    for _ in op.start..=op.end {
                        self.remove(op.start)?;
                    }
                }
            }
        }
        return Ok(());
    }

    /// Run `f` inside a nested transaction level.
    pub fn nested<R, F>(&mut self, allow_nested: bool, f: F) -> Result<R>
    where
        F: FnOnce(&mut Self) -> Result<R>,
    {
        let len = self.state.elements.len();
        self.state.assembler.begin(allow_nested, len)?;
        let result = f(self);
        self.state.assembler.commit()?;
        return result;
    }

    /// Close the transaction and publish its delta. Returns the first
    /// listener failure, if any, after every listener has run.
    pub fn commit(mut self) -> Result<()> {
        return self.finish();
    }

    fn finish(&mut self) -> Result<()> {
        if self.finished {
            return Ok(());
        }
        self.finished = true;
        match self.state.assembler.commit()? {
            Commit::Ready => {
                let list = self.list;
                let state = &mut *self.state;
                return list.publisher.fire(list.id, || list.deliver_locked(state));
            }
            Commit::Nested | Commit::Empty | Commit::Merged => return Ok(()),
        }
    }
}

impl<T: Send + Sync + 'static> Drop for ListWriter<'_, T> {
    fn drop(&mut self) {
        if self.finished {
            return;
        }
        warn!(subject = ?self.list.id, "list writer dropped without commit");
        if let Err(error) = self.finish() {
            warn!(%error, "implicit commit failed");
        }
    }
}
