//! Fingerprint-keyed query cache with load deduplication.
//!
//! Every read in the client goes through [`CacheStore::fetch`]. Values of
//! any `Clone + Send + Sync` type share one arena; the fingerprint decides
//! which type is stored under which key.
//!
//! Invariants:
//! - later callers join the load in flight unless an invalidation hit it
//!   after it started; then they start a new load that replaces it
//! - an entry invalidated while its load is in flight ends up `Stale`,
//!   never `Fresh`, once that load lands
//! - a replaced load is handed to the callers that joined it but not stored
//! - a load that lands after [`CacheStore::clear`] is handed to its
//!   callers but not stored

use crate::config::CacheConfig;
use crate::error::{HrmsError, Result};
use crate::fingerprint::{Fingerprint, Invalidation};
use parking_lot::Mutex;
use std::any::Any;
use std::collections::HashMap;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{debug, warn};

type Value = Arc<dyn Any + Send + Sync>;
type Outcome = std::result::Result<Value, HrmsError>;

/// Callback invoked when an entry changes status.
pub type Subscriber = Arc<dyn Fn(&Fingerprint, EntryStatus) + Send + Sync>;

/// Lifecycle status of a cache entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryStatus {
    /// A load is in flight and no invalidation has hit it yet.
    Pending,
    /// The stored value reflects the latest completed load.
    Fresh,
    /// The next fetch reloads.
    Stale,
}

/// Per-call fetch options.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FetchOptions {
    /// Retries after a transient load failure.
    pub retries: u32,
}

impl FetchOptions {
    /// Never retry; a failure reaches the caller as is.
    pub const NO_RETRY: FetchOptions = FetchOptions { retries: 0 };
}

/// Handle returned by [`CacheStore::subscribe`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

/// Snapshot of the cache counters.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct CacheMetrics {
    /// Fetches answered from a fresh entry.
    pub hits: u64,
    /// Fetches that started a load.
    pub misses: u64,
    /// Fetches that attached to a load already in flight.
    pub joins: u64,
    /// Loader invocations, retries included.
    pub loads: u64,
    /// Loads that ended in an error after all retries.
    pub failures: u64,
}

#[derive(Default)]
struct Counters {
    hits: AtomicU64,
    misses: AtomicU64,
    joins: AtomicU64,
    loads: AtomicU64,
    failures: AtomicU64,
}

struct InFlight {
    id: u64,
    /// Entry epoch when the load started.
    epoch: u64,
    rx: watch::Receiver<Option<Outcome>>,
}

struct Entry {
    value: Option<Value>,
    error: Option<HrmsError>,
    status: EntryStatus,
    /// Bumped by every invalidation.
    epoch: u64,
    in_flight: Option<InFlight>,
}

impl Entry {
    fn new() -> Self {
        Self {
            value: None,
            error: None,
            status: EntryStatus::Stale,
            epoch: 0,
            in_flight: None,
        }
    }
}

#[derive(Default)]
struct Inner {
    entries: HashMap<Fingerprint, Entry>,
    subscribers: HashMap<Fingerprint, Vec<(SubscriptionId, Subscriber)>>,
    next_flight: u64,
    next_subscription: u64,
}

impl Inner {
    fn callbacks(&self, fingerprint: &Fingerprint) -> Vec<Subscriber> {
        self.subscribers
            .get(fingerprint)
            .map(|subs| subs.iter().map(|(_, cb)| cb.clone()).collect())
            .unwrap_or_default()
    }
}

enum Step {
    Hit(Value),
    Join(watch::Receiver<Option<Outcome>>),
    Lead {
        id: u64,
        epoch: u64,
        tx: watch::Sender<Option<Outcome>>,
        notify: Vec<Subscriber>,
    },
}

/// Key-indexed store of query results.
pub struct CacheStore {
    inner: Mutex<Inner>,
    counters: Counters,
    config: CacheConfig,
}

impl CacheStore {
    /// Creates an empty store.
    pub fn new(config: CacheConfig) -> Self {
        Self {
            inner: Mutex::new(Inner::default()),
            counters: Counters::default(),
            config,
        }
    }

    /// Options carrying the configured default retry count.
    pub fn default_options(&self) -> FetchOptions {
        FetchOptions {
            retries: self.config.default_retries,
        }
    }

    /// Returns the cached value for `fingerprint`, loading it if needed.
    ///
    /// A fresh entry is returned without calling `loader`. If a load for the
    /// fingerprint is already in flight and no invalidation hit it since it
    /// started, the call waits for that load and shares its outcome.
    /// Otherwise `loader` runs, retried up to `options.retries` times on
    /// transient failures.
    pub async fn fetch<T, F, Fut>(
        &self,
        fingerprint: &Fingerprint,
        options: FetchOptions,
        mut loader: F,
    ) -> Result<T>
    where
        T: Clone + Send + Sync + 'static,
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        loop {
            match self.begin(fingerprint) {
                Step::Hit(value) => {
                    self.counters.hits.fetch_add(1, Ordering::Relaxed);
                    return downcast(fingerprint, &value);
                }
                Step::Join(mut rx) => {
                    self.counters.joins.fetch_add(1, Ordering::Relaxed);
                    let outcome = match rx.wait_for(Option::is_some).await {
                        Ok(landed) => (*landed).clone(),
                        Err(_) => None,
                    };
                    match outcome {
                        Some(Ok(value)) => return downcast(fingerprint, &value),
                        Some(Err(err)) => return Err(err),
                        // The leading caller was dropped mid-load; try again.
                        None => continue,
                    }
                }
                Step::Lead {
                    id,
                    epoch,
                    tx,
                    notify,
                } => {
                    self.counters.misses.fetch_add(1, Ordering::Relaxed);
                    emit(&notify, fingerprint, EntryStatus::Pending);

                    let mut guard = LeadGuard {
                        store: self,
                        fingerprint,
                        id,
                        armed: true,
                    };
                    let result = self.run_loader(fingerprint, options, &mut loader).await;
                    guard.armed = false;

                    let outcome: Outcome = match &result {
                        Ok(value) => Ok(Arc::new(value.clone()) as Value),
                        Err(err) => Err(err.clone()),
                    };
                    self.settle(fingerprint, id, epoch, outcome.clone());
                    tx.send_replace(Some(outcome));
                    return result;
                }
            }
        }
    }

    fn begin(&self, fingerprint: &Fingerprint) -> Step {
        let mut inner = self.inner.lock();
        let id = inner.next_flight;
        let notify = inner.callbacks(fingerprint);
        let entry = inner
            .entries
            .entry(fingerprint.clone())
            .or_insert_with(Entry::new);

        if let Some(flight) = &entry.in_flight {
            if flight.epoch == entry.epoch {
                return Step::Join(flight.rx.clone());
            }
            debug!(%fingerprint, "in-flight load was invalidated, replacing it");
        }
        if entry.status == EntryStatus::Fresh {
            if let Some(value) = &entry.value {
                return Step::Hit(value.clone());
            }
        }

        let (tx, rx) = watch::channel(None);
        let epoch = entry.epoch;
        entry.in_flight = Some(InFlight { id, epoch, rx });
        entry.status = EntryStatus::Pending;
        inner.next_flight += 1;
        debug!(%fingerprint, "cache load started");
        Step::Lead {
            id,
            epoch,
            tx,
            notify,
        }
    }

    async fn run_loader<T, F, Fut>(
        &self,
        fingerprint: &Fingerprint,
        options: FetchOptions,
        loader: &mut F,
    ) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let mut attempt = 0;
        loop {
            self.counters.loads.fetch_add(1, Ordering::Relaxed);
            match loader().await {
                Ok(value) => return Ok(value),
                Err(err) if err.is_transient() && attempt < options.retries => {
                    let delay = self.config.retry_delay(attempt);
                    warn!(%fingerprint, attempt, ?delay, "cache load failed, retrying: {}", err);
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(err) => {
                    self.counters.failures.fetch_add(1, Ordering::Relaxed);
                    warn!(%fingerprint, "cache load failed: {}", err);
                    return Err(err);
                }
            }
        }
    }

    /// Records a finished load, unless the entry was cleared or replaced meanwhile.
    fn settle(&self, fingerprint: &Fingerprint, id: u64, epoch: u64, outcome: Outcome) {
        let (status, notify) = {
            let mut inner = self.inner.lock();
            let notify = inner.callbacks(fingerprint);
            let Some(entry) = inner.entries.get_mut(fingerprint) else {
                debug!(%fingerprint, "cache load landed after clear, dropping");
                return;
            };
            if entry.in_flight.as_ref().map(|f| f.id) != Some(id) {
                debug!(%fingerprint, "replaced cache load landed, dropping");
                return;
            }
            entry.in_flight = None;
            let invalidated = entry.epoch != epoch;
            entry.status = match outcome {
                Ok(value) => {
                    entry.value = Some(value);
                    entry.error = None;
                    if invalidated {
                        EntryStatus::Stale
                    } else {
                        EntryStatus::Fresh
                    }
                }
                Err(err) => {
                    entry.error = Some(err);
                    EntryStatus::Stale
                }
            };
            debug!(%fingerprint, status = ?entry.status, "cache load settled");
            (entry.status, notify)
        };
        emit(&notify, fingerprint, status);
    }

    /// Called when a leading fetch is dropped before its load finished.
    fn abandon(&self, fingerprint: &Fingerprint, id: u64) {
        let notify = {
            let mut inner = self.inner.lock();
            let notify = inner.callbacks(fingerprint);
            let Some(entry) = inner.entries.get_mut(fingerprint) else {
                return;
            };
            if entry.in_flight.as_ref().map(|f| f.id) != Some(id) {
                return;
            }
            entry.in_flight = None;
            entry.status = EntryStatus::Stale;
            notify
        };
        emit(&notify, fingerprint, EntryStatus::Stale);
    }

    /// Marks every entry matching `target` stale. No reload is started.
    ///
    /// Returns the fingerprints that were marked.
    pub fn invalidate(&self, target: &Invalidation) -> Vec<Fingerprint> {
        let mut marked = Vec::new();
        let mut notify = Vec::new();
        {
            let mut inner = self.inner.lock();
            let mut hits = Vec::new();
            for (fingerprint, entry) in inner.entries.iter_mut() {
                if target.matches(fingerprint) {
                    entry.epoch += 1;
                    entry.status = EntryStatus::Stale;
                    hits.push(fingerprint.clone());
                }
            }
            for fingerprint in hits {
                notify.push((fingerprint.clone(), inner.callbacks(&fingerprint)));
                marked.push(fingerprint);
            }
        }
        debug!(%target, count = marked.len(), "cache invalidated");
        for (fingerprint, callbacks) in &notify {
            emit(callbacks, fingerprint, EntryStatus::Stale);
        }
        marked.sort();
        marked
    }

    /// Drops every entry. Subscribers of dropped entries see them go stale.
    pub fn clear(&self) {
        let notify: Vec<(Fingerprint, Vec<Subscriber>)> = {
            let mut inner = self.inner.lock();
            let dropped: Vec<Fingerprint> = inner.entries.drain().map(|(fp, _)| fp).collect();
            dropped
                .into_iter()
                .map(|fp| {
                    let callbacks = inner.callbacks(&fp);
                    (fp, callbacks)
                })
                .collect()
        };
        debug!(count = notify.len(), "cache cleared");
        for (fingerprint, callbacks) in &notify {
            emit(callbacks, fingerprint, EntryStatus::Stale);
        }
    }

    /// Registers `callback` for status changes of `fingerprint`.
    pub fn subscribe(&self, fingerprint: &Fingerprint, callback: Subscriber) -> SubscriptionId {
        let mut inner = self.inner.lock();
        let id = SubscriptionId(inner.next_subscription);
        inner.next_subscription += 1;
        inner
            .subscribers
            .entry(fingerprint.clone())
            .or_default()
            .push((id, callback));
        id
    }

    /// Removes a subscription. Returns false if it was not registered.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut inner = self.inner.lock();
        let mut removed = false;
        inner.subscribers.retain(|_, subs| {
            let before = subs.len();
            subs.retain(|(sub, _)| *sub != id);
            removed |= subs.len() != before;
            !subs.is_empty()
        });
        removed
    }

    /// Returns the status of an entry, if it exists.
    pub fn status(&self, fingerprint: &Fingerprint) -> Option<EntryStatus> {
        self.inner.lock().entries.get(fingerprint).map(|e| e.status)
    }

    /// Returns the stored value regardless of status.
    pub fn peek<T: Clone + 'static>(&self, fingerprint: &Fingerprint) -> Option<T> {
        let inner = self.inner.lock();
        let value = inner.entries.get(fingerprint)?.value.clone()?;
        value.downcast_ref::<T>().cloned()
    }

    /// Returns the error of the last failed load, if the entry has one.
    pub fn last_error(&self, fingerprint: &Fingerprint) -> Option<HrmsError> {
        let inner = self.inner.lock();
        inner.entries.get(fingerprint)?.error.clone()
    }

    /// Returns all fingerprints currently held, sorted.
    pub fn fingerprints(&self) -> Vec<Fingerprint> {
        let mut keys: Vec<Fingerprint> = self.inner.lock().entries.keys().cloned().collect();
        keys.sort();
        keys
    }

    pub fn metrics(&self) -> CacheMetrics {
        CacheMetrics {
            hits: self.counters.hits.load(Ordering::Relaxed),
            misses: self.counters.misses.load(Ordering::Relaxed),
            joins: self.counters.joins.load(Ordering::Relaxed),
            loads: self.counters.loads.load(Ordering::Relaxed),
            failures: self.counters.failures.load(Ordering::Relaxed),
        }
    }
}

impl Default for CacheStore {
    fn default() -> Self {
        Self::new(CacheConfig::default())
    }
}

impl std::fmt::Debug for CacheStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CacheStore")
            .field("entries", &self.inner.lock().entries.len())
            .field("metrics", &self.metrics())
            .finish()
    }
}

/// Releases the in-flight slot if the leading fetch is dropped early.
struct LeadGuard<'a> {
    store: &'a CacheStore,
    fingerprint: &'a Fingerprint,
    id: u64,
    armed: bool,
}

impl Drop for LeadGuard<'_> {
    fn drop(&mut self) {
        if self.armed {
            self.store.abandon(self.fingerprint, self.id);
        }
    }
}

fn emit(callbacks: &[Subscriber], fingerprint: &Fingerprint, status: EntryStatus) {
    for callback in callbacks {
        callback(fingerprint, status);
    }
}

fn downcast<T: Clone + 'static>(fingerprint: &Fingerprint, value: &Value) -> Result<T> {
    value
        .downcast_ref::<T>()
        .cloned()
        .ok_or_else(|| HrmsError::CacheTypeMismatch {
            fingerprint: fingerprint.to_string(),
        })
}
