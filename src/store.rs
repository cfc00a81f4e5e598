//! Collection Stores
//!
//! Client-side cache of one server-owned resource. Mutations are applied
//! locally only after the server confirms them, and at most one mutation per
//! entity id is in flight at a time.
//!
//! Fetches and mutations are sequenced: a mutation that started after a
//! fetch began and committed while that fetch was still in flight is
//! replayed over the fetched list, so the fetch cannot clobber it.

use std::cell::{Cell, RefCell};
use std::collections::{BTreeSet, HashMap, HashSet};
use std::rc::Rc;

use async_trait::async_trait;
use leptos::prelude::*;

use crate::api::{self, ApiClient, SessionEvent};
use crate::error::{ApiError, ApiResult, TransportError};
use crate::models::{Entity, Reminder, ReminderDraft, Task, TaskDraft, TaskPatch};
use crate::validation::Validate;

// ========================
// Resources
// ========================

/// A server collection the store can list and append to
#[async_trait(?Send)]
pub trait Resource: Sized + 'static {
    type Entity: Entity;
    type Draft: Validate;

    const LOAD_FAILED: &'static str;
    const CREATE_FAILED: &'static str;

    async fn list(client: &ApiClient) -> Result<Vec<Self::Entity>, TransportError>;
    async fn create(client: &ApiClient, draft: &Self::Draft) -> Result<Self::Entity, TransportError>;
}

/// Collections that also support per-id read, update and delete
#[async_trait(?Send)]
pub trait Editable: Resource {
    type Patch: Validate;

    const UPDATE_FAILED: &'static str;
    const DELETE_FAILED: &'static str;

    async fn fetch(client: &ApiClient, id: IdOf<Self>) -> Result<Self::Entity, TransportError>;
    async fn update(client: &ApiClient, id: IdOf<Self>, patch: &Self::Patch) -> Result<Self::Entity, TransportError>;
    async fn delete(client: &ApiClient, id: IdOf<Self>) -> Result<(), TransportError>;
}

pub type IdOf<R> = <<R as Resource>::Entity as Entity>::Id;

pub struct Tasks;

#[async_trait(?Send)]
impl Resource for Tasks {
    type Entity = Task;
    type Draft = TaskDraft;

    const LOAD_FAILED: &'static str = "Failed to load tasks. Please try again.";
    const CREATE_FAILED: &'static str = "Failed to create task";

    async fn list(client: &ApiClient) -> Result<Vec<Task>, TransportError> {
        api::task::list(client).await
    }

    async fn create(client: &ApiClient, draft: &TaskDraft) -> Result<Task, TransportError> {
        api::task::create(client, &draft.normalized()).await
    }
}

#[async_trait(?Send)]
impl Editable for Tasks {
    type Patch = TaskPatch;

    const UPDATE_FAILED: &'static str = "Failed to update task";
    const DELETE_FAILED: &'static str = "Failed to delete task";

    async fn fetch(client: &ApiClient, id: u32) -> Result<Task, TransportError> {
        api::task::get(client, id).await
    }

    async fn update(client: &ApiClient, id: u32, patch: &TaskPatch) -> Result<Task, TransportError> {
        api::task::update(client, id, &patch.normalized()).await
    }

    async fn delete(client: &ApiClient, id: u32) -> Result<(), TransportError> {
        api::task::delete(client, id).await
    }
}

pub struct Reminders;

#[async_trait(?Send)]
impl Resource for Reminders {
    type Entity = Reminder;
    type Draft = ReminderDraft;

    const LOAD_FAILED: &'static str = "Failed to load reminders";
    const CREATE_FAILED: &'static str = "Failed to create reminder";

    async fn list(client: &ApiClient) -> Result<Vec<Reminder>, TransportError> {
        api::reminder::list(client).await
    }

    async fn create(client: &ApiClient, draft: &ReminderDraft) -> Result<Reminder, TransportError> {
        api::reminder::create(client, &draft.normalized()).await
    }
}

pub type TaskStore = CollectionStore<Tasks>;
pub type ReminderStore = CollectionStore<Reminders>;

// ========================
// Ledger
// ========================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MutationKind {
    Update,
    Delete,
}

/// In-flight mutation marker, one per id
#[derive(Debug, Clone, Copy)]
struct PendingOperation {
    kind: MutationKind,
    seq: u64,
}

/// A confirmed change, replayable over a fetched list
#[derive(Debug, Clone)]
enum Change<T: Entity> {
    Created(T),
    Updated(T),
    Deleted(T::Id),
}

impl<T: Entity> Change<T> {
    fn apply(&self, items: &mut Vec<T>) {
        match self {
            Change::Created(entity) => {
                items.retain(|item| item.id() != entity.id());
                items.insert(0, entity.clone());
            }
            Change::Updated(entity) => {
                if let Some(item) = items.iter_mut().find(|item| item.id() == entity.id()) {
                    *item = entity.clone();
                }
            }
            Change::Deleted(id) => items.retain(|item| item.id() != *id),
        }
    }
}

struct Ledger<T: Entity> {
    next_seq: u64,
    pending: HashMap<T::Id, PendingOperation>,
    /// Start sequence of the latest mutation per id
    last_started: HashMap<T::Id, u64>,
    /// Start sequences of in-flight fetches
    fetches: BTreeSet<u64>,
    /// Changes committed while a fetch was in flight
    journal: Vec<(u64, Change<T>)>,
}

impl<T: Entity> Default for Ledger<T> {
    fn default() -> Self {
        Self {
            next_seq: 0,
            pending: HashMap::new(),
            last_started: HashMap::new(),
            fetches: BTreeSet::new(),
            journal: Vec::new(),
        }
    }
}

impl<T: Entity> Ledger<T> {
    fn begin(&mut self) -> u64 {
        self.next_seq += 1;
        self.next_seq
    }

    fn record(&mut self, seq: u64, change: Change<T>) {
        if !self.fetches.is_empty() {
            self.journal.push((seq, change));
        }
    }

    /// Close fetch `seq`, returning the changes that must be replayed over
    /// its result.
    fn finish_fetch(&mut self, seq: u64) -> Vec<Change<T>> {
        self.fetches.remove(&seq);
        let replay = self
            .journal
            .iter()
            .filter(|(started, _)| *started > seq)
            .map(|(_, change)| change.clone())
            .collect();
        match self.fetches.first().copied() {
            Some(oldest) => self.journal.retain(|(started, _)| *started > oldest),
            None => self.journal.clear(),
        }
        replay
    }

    fn touched_since(&self, id: &T::Id, seq: u64) -> bool {
        self.pending.contains_key(id) || self.last_started.get(id).is_some_and(|started| *started > seq)
    }
}

fn dedup_by_id<T: Entity>(items: Vec<T>) -> Vec<T> {
    let mut seen = HashSet::new();
    items.into_iter().filter(|item| seen.insert(item.id())).collect()
}

// ========================
// Store
// ========================

struct StoreInner<R: Resource> {
    client: ApiClient,
    items: ArcRwSignal<Vec<R::Entity>>,
    loading: ArcRwSignal<bool>,
    ledger: RefCell<Ledger<R::Entity>>,
    /// Bumped on reset; results from an older generation are dropped
    generation: Cell<u64>,
}

impl<R: Resource> StoreInner<R> {
    fn reset(&self) {
        self.generation.set(self.generation.get() + 1);
        {
            let mut ledger = self.ledger.borrow_mut();
            ledger.pending.clear();
            ledger.last_started.clear();
            ledger.journal.clear();
        }
        self.items.set(Vec::new());
        self.loading.set(false);
    }

    fn commit(&self, seq: u64, generation: u64, change: Change<R::Entity>) {
        if self.generation.get() != generation {
            tracing::debug!("dropping result that predates a reset");
            return;
        }
        self.items.update(|items| change.apply(items));
        self.ledger.borrow_mut().record(seq, change);
    }

    fn close_fetch(&self, seq: u64) -> Vec<Change<R::Entity>> {
        let (replay, still_fetching) = {
            let mut ledger = self.ledger.borrow_mut();
            let replay = ledger.finish_fetch(seq);
            (replay, !ledger.fetches.is_empty())
        };
        self.loading.set(still_fetching);
        replay
    }
}

/// Closes out a full fetch, including when its future is dropped mid-flight
struct FetchGuard<R: Resource> {
    inner: Rc<StoreInner<R>>,
    seq: u64,
    closed: bool,
}

impl<R: Resource> FetchGuard<R> {
    fn open(inner: &Rc<StoreInner<R>>) -> Self {
        let seq = {
            let mut ledger = inner.ledger.borrow_mut();
            let seq = ledger.begin();
            ledger.fetches.insert(seq);
            seq
        };
        inner.loading.set(true);
        Self { inner: inner.clone(), seq, closed: false }
    }

    fn finish(mut self) -> Vec<Change<R::Entity>> {
        self.closed = true;
        self.inner.close_fetch(self.seq)
    }
}

impl<R: Resource> Drop for FetchGuard<R> {
    fn drop(&mut self) {
        if !self.closed {
            tracing::debug!(seq = self.seq, "fetch abandoned");
            self.inner.close_fetch(self.seq);
        }
    }
}

/// Releases the pending marker for `id` when the mutation settles
struct PendingGuard<R: Resource> {
    inner: Rc<StoreInner<R>>,
    id: IdOf<R>,
    seq: u64,
    generation: u64,
}

impl<R: Resource> Drop for PendingGuard<R> {
    fn drop(&mut self) {
        let mut ledger = self.inner.ledger.borrow_mut();
        if ledger.pending.get(&self.id).is_some_and(|op| op.seq == self.seq) {
            ledger.pending.remove(&self.id);
        }
    }
}

/// Shared handle to one resource's collection
pub struct CollectionStore<R: Resource> {
    inner: Rc<StoreInner<R>>,
}

impl<R: Resource> Clone for CollectionStore<R> {
    fn clone(&self) -> Self {
        Self { inner: self.inner.clone() }
    }
}

impl<R: Resource> CollectionStore<R> {
    /// Empty store; it discards its contents whenever the session ends.
    pub fn new(client: ApiClient) -> Self {
        let inner = Rc::new(StoreInner {
            client,
            items: ArcRwSignal::new(Vec::new()),
            loading: ArcRwSignal::new(false),
            ledger: RefCell::new(Ledger::default()),
            generation: Cell::new(0),
        });

        let weak = Rc::downgrade(&inner);
        inner.client.events().subscribe(move |event: &SessionEvent| {
            if let Some(inner) = weak.upgrade() {
                tracing::debug!(?event, "discarding collection");
                inner.reset();
            }
        });

        Self { inner }
    }

    /// Read-only subscription to the collection
    pub fn items(&self) -> ArcReadSignal<Vec<R::Entity>> {
        self.inner.items.read_only()
    }

    /// `true` while a full fetch is in flight
    pub fn loading(&self) -> ArcReadSignal<bool> {
        self.inner.loading.read_only()
    }

    pub fn snapshot(&self) -> Vec<R::Entity> {
        self.inner.items.get_untracked()
    }

    pub fn len(&self) -> usize {
        self.inner.items.with_untracked(Vec::len)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn get(&self, id: IdOf<R>) -> Option<R::Entity> {
        self.inner
            .items
            .with_untracked(|items| items.iter().find(|item| item.id() == id).cloned())
    }

    pub fn is_pending(&self, id: &IdOf<R>) -> bool {
        self.inner.ledger.borrow().pending.contains_key(id)
    }

    /// Which mutation, if any, is in flight for `id`
    pub fn pending_kind(&self, id: &IdOf<R>) -> Option<MutationKind> {
        self.inner.ledger.borrow().pending.get(id).map(|op| op.kind)
    }

    /// Drop everything; in-flight results arriving later are ignored.
    pub fn reset(&self) {
        self.inner.reset();
    }

    /// Replace the collection with the server's current list.
    pub async fn fetch_all(&self) -> ApiResult<()> {
        let generation = self.inner.generation.get();
        let fetch = FetchGuard::open(&self.inner);

        let result = R::list(&self.inner.client).await;
        let replay = fetch.finish();

        let fetched = result.map_err(|e| ApiError::from_transport(e, R::LOAD_FAILED))?;
        if self.inner.generation.get() != generation {
            tracing::debug!("dropping fetch that predates a reset");
            return Ok(());
        }

        let mut items = dedup_by_id(fetched);
        for change in &replay {
            change.apply(&mut items);
        }
        tracing::debug!(count = items.len(), replayed = replay.len(), "collection fetched");
        self.inner.items.set(items);
        Ok(())
    }

    /// Validate, submit, and prepend the server's copy on success.
    pub async fn create(&self, draft: &R::Draft) -> ApiResult<R::Entity> {
        draft.validate()?;
        let generation = self.inner.generation.get();
        let seq = self.inner.ledger.borrow_mut().begin();

        let entity = R::create(&self.inner.client, draft)
            .await
            .map_err(|e| ApiError::from_transport(e, R::CREATE_FAILED))?;

        self.inner.commit(seq, generation, Change::Created(entity.clone()));
        Ok(entity)
    }

    fn acquire(&self, id: IdOf<R>, kind: MutationKind) -> ApiResult<PendingGuard<R>> {
        let mut ledger = self.inner.ledger.borrow_mut();
        if let Some(op) = ledger.pending.get(&id) {
            tracing::warn!(%id, requested = ?kind, in_flight = ?op.kind, "mutation rejected, another is pending");
            return Err(ApiError::Busy { id: id.to_string() });
        }
        let seq = ledger.begin();
        ledger.pending.insert(id, PendingOperation { kind, seq });
        ledger.last_started.insert(id, seq);
        Ok(PendingGuard {
            inner: self.inner.clone(),
            id,
            seq,
            generation: self.inner.generation.get(),
        })
    }
}

impl<R: Editable> CollectionStore<R> {
    /// Refresh one entity. The local copy is replaced only when no mutation
    /// on that id started since the read began.
    pub async fn fetch_one(&self, id: IdOf<R>) -> ApiResult<R::Entity> {
        let generation = self.inner.generation.get();
        let seq = self.inner.ledger.borrow_mut().begin();

        let entity = R::fetch(&self.inner.client, id)
            .await
            .map_err(|e| ApiError::from_transport(e, R::LOAD_FAILED))?;

        let stale = self.inner.generation.get() != generation || self.inner.ledger.borrow().touched_since(&id, seq);
        if !stale {
            self.inner.items.update(|items| Change::Updated(entity.clone()).apply(items));
        }
        Ok(entity)
    }

    /// Validate and submit a patch; the local copy changes only once the
    /// server returns the updated entity.
    pub async fn update(&self, id: IdOf<R>, patch: &R::Patch) -> ApiResult<R::Entity> {
        patch.validate()?;
        let pending = self.acquire(id, MutationKind::Update)?;

        let entity = R::update(&self.inner.client, id, patch)
            .await
            .map_err(|e| ApiError::from_transport(e, R::UPDATE_FAILED))?;

        self.inner.commit(pending.seq, pending.generation, Change::Updated(entity.clone()));
        Ok(entity)
    }

    /// Delete on the server, then locally. Confirmation with the user is the
    /// caller's job.
    pub async fn delete(&self, id: IdOf<R>) -> ApiResult<()> {
        let pending = self.acquire(id, MutationKind::Delete)?;

        R::delete(&self.inner.client, id)
            .await
            .map_err(|e| ApiError::from_transport(e, R::DELETE_FAILED))?;

        self.inner.commit(pending.seq, pending.generation, Change::Deleted(id));
        Ok(())
    }
}
