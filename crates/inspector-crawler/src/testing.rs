//! In-memory collaborators for unit tests.

use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::thread::{self, ThreadId};
use std::time::Duration;

use async_trait::async_trait;
use inspector_source::{ColonyHandle, ColonyId, ColonySource, SourceError, SourceResult};
use inspector_store::{DateKey, Document, DocumentStore, SnapshotStore, StoreError, StoreResult};

use crate::clock::Clock;

/// Registry with fixed per-colony `(domains, tasks)` counters.
pub struct FakeSource {
    colonies: Vec<(u64, u64)>,
    skills: u64,
    failing: HashSet<ColonyId>,
    removed: HashSet<ColonyId>,
    globals_down: bool,
    delay: Option<Duration>,
    /// Ids passed to `colony()`, in call order.
    pub visited: Mutex<Vec<ColonyId>>,
}

impl FakeSource {
    pub fn new(colonies: Vec<(u64, u64)>, skills: u64) -> Self {
        Self {
            colonies,
            skills,
            failing: HashSet::new(),
            removed: HashSet::new(),
            globals_down: false,
            delay: None,
            visited: Mutex::new(Vec::new()),
        }
    }

    pub fn failing_on(mut self, id: ColonyId) -> Self {
        self.failing.insert(id);
        self
    }

    /// Colony `id` stays counted but lookups report it as gone.
    pub fn removed(mut self, id: ColonyId) -> Self {
        self.removed.insert(id);
        self
    }

    pub fn globals_down(mut self) -> Self {
        self.globals_down = true;
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn visited(&self) -> Vec<ColonyId> {
        self.visited.lock().unwrap().clone()
    }
}

#[async_trait]
impl ColonySource for FakeSource {
    async fn colony_count(&self) -> SourceResult<u64> {
        if self.globals_down {
            return Err(SourceError::Unavailable("registry offline".into()));
        }
        Ok(self.colonies.len() as u64)
    }

    async fn skill_count(&self) -> SourceResult<u64> {
        if self.globals_down {
            return Err(SourceError::Unavailable("registry offline".into()));
        }
        Ok(self.skills)
    }

    async fn colony(&self, id: ColonyId) -> SourceResult<Box<dyn ColonyHandle>> {
        self.visited.lock().unwrap().push(id);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        if self.failing.contains(&id) {
            return Err(SourceError::Unavailable(format!("colony {id} timed out")));
        }
        if self.removed.contains(&id) {
            return Err(SourceError::NotFound(id));
        }
        let index = id.checked_sub(1).ok_or(SourceError::NotFound(id))? as usize;
        let (domains, tasks) = *self.colonies.get(index).ok_or(SourceError::NotFound(id))?;
        Ok(Box::new(FakeColony { id, domains, tasks }))
    }
}

struct FakeColony {
    id: ColonyId,
    domains: u64,
    tasks: u64,
}

#[async_trait]
impl ColonyHandle for FakeColony {
    fn id(&self) -> ColonyId {
        self.id
    }

    async fn domain_count(&self) -> SourceResult<u64> {
        Ok(self.domains)
    }

    async fn task_count(&self) -> SourceResult<u64> {
        Ok(self.tasks)
    }
}

/// In-memory store that counts writes and can be told to fail.
pub struct RecordingStore {
    inner: DocumentStore,
    writes: AtomicUsize,
    fail_reads: Mutex<bool>,
    fail_writes_to: Mutex<Option<String>>,
    writer_threads: Mutex<Vec<ThreadId>>,
}

impl RecordingStore {
    pub fn new() -> Self {
        Self {
            inner: DocumentStore::open_in_memory().unwrap(),
            writes: AtomicUsize::new(0),
            fail_reads: Mutex::new(false),
            fail_writes_to: Mutex::new(None),
            writer_threads: Mutex::new(Vec::new()),
        }
    }

    pub fn writes(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    pub fn fail_reads(&self, fail: bool) {
        *self.fail_reads.lock().unwrap() = fail;
    }

    /// Threads that performed writes, in call order.
    pub fn writer_threads(&self) -> Vec<ThreadId> {
        self.writer_threads.lock().unwrap().clone()
    }

    /// Fail every write to `collection` until cleared with `None`.
    pub fn fail_writes_to(&self, collection: Option<&str>) {
        *self.fail_writes_to.lock().unwrap() = collection.map(str::to_string);
    }
}

impl SnapshotStore for RecordingStore {
    fn find_one(&self, collection: &str, name: &str) -> StoreResult<Option<Document>> {
        if *self.fail_reads.lock().unwrap() {
            return Err(StoreError::Read("store offline".into()));
        }
        self.inner.find_one(collection, name)
    }

    fn update_one(&self, collection: &str, name: &str, fields: Document) -> StoreResult<()> {
        if self.fail_writes_to.lock().unwrap().as_deref() == Some(collection) {
            return Err(StoreError::Write(format!("{collection} rejected write")));
        }
        self.writes.fetch_add(1, Ordering::SeqCst);
        self.writer_threads.lock().unwrap().push(thread::current().id());
        self.inner.update_one(collection, name, fields)
    }
}

/// Clock pinned to a settable day.
pub struct FixedClock(Mutex<DateKey>);

impl FixedClock {
    pub fn new(day: &str) -> Self {
        Self(Mutex::new(day.parse().unwrap()))
    }

    pub fn set(&self, day: &str) {
        *self.0.lock().unwrap() = day.parse().unwrap();
    }
}

impl Clock for FixedClock {
    fn today(&self) -> DateKey {
        *self.0.lock().unwrap()
    }
}

pub fn day(s: &str) -> DateKey {
    s.parse().unwrap()
}
