// =============================================================================
// Async Resource Loader - Fetch Lifecycle with Supersession
// =============================================================================
//
// Every fetched resource (the catalog, one country's detail record, the map
// features) lives in a named slot with a LoadState:
//
//   Idle -> Loading -> Loaded(value)
//                   -> Failed(error)
//
// Supersession: each `begin` bumps the slot's generation counter and hands out
// a ticket carrying it. When a fetch resolves, its result is applied only if
// the ticket's generation is still the slot's current one. An older fetch that
// resolves late is dropped; it never overwrites a newer request's state.
// There is no real abort, the stale future simply runs to completion.
//
// The last successfully loaded value is kept separately from the state, so a
// refresh in flight or a failed refresh never clears what is on screen.
//
// Single-threaded: slots are shared through Rc<RefCell<..>> and no borrow is
// ever held across an await.

use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::rc::Rc;

use chrono::{DateTime, Utc};

use crate::client::FetchError;
use crate::identity::CanonicalKey;

/// Named unit of loadable state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceSlot {
    Catalog,
    Detail(CanonicalKey),
    Features,
}

impl fmt::Display for ResourceSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResourceSlot::Catalog => f.write_str("catalog"),
            ResourceSlot::Detail(key) => write!(f, "detail:{}", key),
            ResourceSlot::Features => f.write_str("features"),
        }
    }
}

/// Lifecycle of one slot; exactly one variant holds at a time
#[derive(Debug, Clone, PartialEq)]
pub enum LoadState<T> {
    Idle,
    Loading,
    Loaded(T),
    Failed(FetchError),
}

impl<T> LoadState<T> {
    pub fn is_loading(&self) -> bool {
        matches!(self, LoadState::Loading)
    }

    pub fn is_loaded(&self) -> bool {
        matches!(self, LoadState::Loaded(_))
    }

    pub fn value(&self) -> Option<&T> {
        match self {
            LoadState::Loaded(value) => Some(value),
            _ => None,
        }
    }

    pub fn error(&self) -> Option<&FetchError> {
        match self {
            LoadState::Failed(e) => Some(e),
            _ => None,
        }
    }
}

/// Proof that a request was dispatched for a slot at a given generation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ticket {
    slot: ResourceSlot,
    generation: u64,
}

impl Ticket {
    pub fn slot(&self) -> ResourceSlot {
        self.slot
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }
}

/// What happened to a resolved fetch
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Completion {
    /// The result became the slot's state
    Applied,
    /// A newer request had been issued; the result was dropped
    Superseded,
}

struct SlotEntry<T> {
    generation: u64,
    state: LoadState<T>,
    latest: Option<T>,
    loaded_at: Option<DateTime<Utc>>,
}

impl<T> Default for SlotEntry<T> {
    fn default() -> Self {
        Self {
            generation: 0,
            state: LoadState::Idle,
            latest: None,
            loaded_at: None,
        }
    }
}

/// Slot table for one kind of loaded value
///
/// Clones share the same slots.
pub struct Loader<T> {
    slots: Rc<RefCell<HashMap<ResourceSlot, SlotEntry<T>>>>,
}

impl<T> Clone for Loader<T> {
    fn clone(&self) -> Self {
        Self {
            slots: Rc::clone(&self.slots),
        }
    }
}

impl<T> Default for Loader<T> {
    fn default() -> Self {
        Self {
            slots: Rc::new(RefCell::new(HashMap::new())),
        }
    }
}

impl<T: Clone + 'static> Loader<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Move a slot to Loading and supersede anything in flight for it
    pub fn begin(&self, slot: ResourceSlot) -> Ticket {
        let mut slots = self.slots.borrow_mut();
        let entry = slots.entry(slot).or_default();
        entry.generation += 1;
        entry.state = LoadState::Loading;
        log::debug!("{}: request #{} started", slot, entry.generation);
        Ticket {
            slot,
            generation: entry.generation,
        }
    }

    /// Apply a fetch result if its ticket is still current
    pub fn complete(&self, ticket: Ticket, result: Result<T, FetchError>) -> Completion {
        let mut slots = self.slots.borrow_mut();
        let Some(entry) = slots.get_mut(&ticket.slot) else {
            return Completion::Superseded;
        };

        if entry.generation != ticket.generation {
            log::debug!(
                "{}: discarding result of request #{} (current is #{})",
                ticket.slot,
                ticket.generation,
                entry.generation
            );
            return Completion::Superseded;
        }

        match result {
            Ok(value) => {
                log::debug!("{}: request #{} loaded", ticket.slot, ticket.generation);
                entry.latest = Some(value.clone());
                entry.loaded_at = Some(Utc::now());
                entry.state = LoadState::Loaded(value);
            }
            Err(e) => {
                log::warn!("{}: {}", ticket.slot, e);
                entry.state = LoadState::Failed(e);
            }
        }
        Completion::Applied
    }

    /// Start a request now and return the future that finishes it
    ///
    /// The slot is `Loading` as soon as this returns, before the future is
    /// polled. Issuing another request for the same slot supersedes this one.
    pub fn request<F>(&self, slot: ResourceSlot, fetcher: F) -> impl Future<Output = Completion> + 'static
    where
        F: Future<Output = Result<T, FetchError>> + 'static,
    {
        let ticket = self.begin(slot);
        let loader = self.clone();
        async move {
            let result = fetcher.await;
            loader.complete(ticket, result)
        }
    }

    /// Request only if the slot is Idle or Failed (fetch once per session)
    ///
    /// Resolves to `None` when nothing was requested.
    pub fn ensure<F>(&self, slot: ResourceSlot, fetcher: F) -> impl Future<Output = Option<Completion>> + 'static
    where
        F: Future<Output = Result<T, FetchError>> + 'static,
    {
        let needed = matches!(self.state(slot), LoadState::Idle | LoadState::Failed(_));
        let ticket = needed.then(|| self.begin(slot));
        let loader = self.clone();
        async move {
            let ticket = ticket?;
            let result = fetcher.await;
            Some(loader.complete(ticket, result))
        }
    }

    /// Current state of a slot (Idle if never requested)
    pub fn state(&self, slot: ResourceSlot) -> LoadState<T> {
        self.slots
            .borrow()
            .get(&slot)
            .map(|entry| entry.state.clone())
            .unwrap_or(LoadState::Idle)
    }

    /// Last successfully loaded value, kept across later Loading/Failed states
    pub fn latest(&self, slot: ResourceSlot) -> Option<T> {
        self.slots.borrow().get(&slot).and_then(|entry| entry.latest.clone())
    }

    /// Borrow the last loaded value without cloning it
    ///
    /// The slot table stays borrowed while `f` runs: `f` may read this loader
    /// (`state`, `latest`) but must not `begin`, `complete` or `request` on it,
    /// which would panic on the shared borrow.
    pub fn with_latest<R>(&self, slot: ResourceSlot, f: impl FnOnce(Option<&T>) -> R) -> R {
        let slots = self.slots.borrow();
        f(slots.get(&slot).and_then(|entry| entry.latest.as_ref()))
    }

    /// When the slot last loaded successfully
    pub fn loaded_at(&self, slot: ResourceSlot) -> Option<DateTime<Utc>> {
        self.slots.borrow().get(&slot).and_then(|entry| entry.loaded_at)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identity::normalize;
    use tokio::sync::oneshot;

    fn fra() -> ResourceSlot {
        ResourceSlot::Detail(normalize("FRA").unwrap())
    }

    /// A fetcher the test resolves by hand
    fn manual<T: 'static>() -> (
        oneshot::Sender<Result<T, FetchError>>,
        impl Future<Output = Result<T, FetchError>> + 'static,
    ) {
        let (tx, rx) = oneshot::channel();
        let fetch = async move {
            match rx.await {
                Ok(result) => result,
                Err(_) => Err(FetchError::network("test", "fetcher dropped")),
            }
        };
        (tx, fetch)
    }

    #[test]
    fn test_slot_names() {
        assert_eq!(ResourceSlot::Catalog.to_string(), "catalog");
        assert_eq!(fra().to_string(), "detail:FRA");
        assert_eq!(ResourceSlot::Features.to_string(), "features");
    }

    #[tokio::test]
    async fn test_request_lifecycle() {
        let loader: Loader<String> = Loader::new();
        assert_eq!(loader.state(ResourceSlot::Catalog), LoadState::Idle);

        let (tx, fetch) = manual();
        let pending = loader.request(ResourceSlot::Catalog, fetch);
        assert_eq!(loader.state(ResourceSlot::Catalog), LoadState::Loading);

        tx.send(Ok("catalog".to_string())).unwrap();
        assert_eq!(pending.await, Completion::Applied);
        assert_eq!(loader.state(ResourceSlot::Catalog), LoadState::Loaded("catalog".to_string()));
        assert!(loader.loaded_at(ResourceSlot::Catalog).is_some());
    }

    #[tokio::test]
    async fn test_later_request_supersedes_earlier() {
        let loader: Loader<&'static str> = Loader::new();

        let (tx1, f1) = manual();
        let (tx2, f2) = manual();
        let first = loader.request(fra(), f1);
        let second = loader.request(fra(), f2);

        // f2 resolves first, then f1 resolves late
        tx2.send(Ok("second")).unwrap();
        assert_eq!(second.await, Completion::Applied);
        tx1.send(Ok("first")).unwrap();
        assert_eq!(first.await, Completion::Superseded);

        assert_eq!(loader.state(fra()), LoadState::Loaded("second"));
        assert_eq!(loader.latest(fra()), Some("second"));
    }

    #[tokio::test]
    async fn test_stale_failure_is_dropped_too() {
        let loader: Loader<u32> = Loader::new();
        let (tx1, f1) = manual();
        let (tx2, f2) = manual();
        let first = loader.request(fra(), f1);
        let second = loader.request(fra(), f2);

        tx1.send(Err(FetchError::network("detail:FRA", "timeout"))).unwrap();
        assert_eq!(first.await, Completion::Superseded);
        assert_eq!(loader.state(fra()), LoadState::Loading);

        tx2.send(Ok(7)).unwrap();
        second.await;
        assert_eq!(loader.state(fra()), LoadState::Loaded(7));
    }

    #[tokio::test]
    async fn test_failure_keeps_latest_value() {
        let loader: Loader<u32> = Loader::new();
        loader.request(fra(), async { Ok(1) }).await;

        let err = FetchError::Status {
            resource: "detail:FRA".to_string(),
            status: 503,
        };
        let failing = err.clone();
        loader.request(fra(), async move { Err(failing) }).await;

        assert_eq!(loader.state(fra()), LoadState::Failed(err));
        assert_eq!(loader.latest(fra()), Some(1));
        assert_eq!(loader.with_latest(fra(), |v| v.copied()), Some(1));
    }

    #[tokio::test]
    async fn test_retry_after_failure() {
        let loader: Loader<u32> = Loader::new();
        loader
            .request(ResourceSlot::Features, async { Err(FetchError::network("features", "offline")) })
            .await;
        assert!(loader.state(ResourceSlot::Features).error().is_some());

        loader.request(ResourceSlot::Features, async { Ok(3) }).await;
        assert_eq!(loader.state(ResourceSlot::Features).value(), Some(&3));
    }

    #[tokio::test]
    async fn test_slots_are_independent() {
        let loader: Loader<&'static str> = Loader::new();
        let deu = ResourceSlot::Detail(normalize("DEU").unwrap());

        let (tx, f) = manual();
        let pending = loader.request(fra(), f);
        loader.request(deu, async { Ok("germany") }).await;

        tx.send(Ok("france")).unwrap();
        assert_eq!(pending.await, Completion::Applied);
        assert_eq!(loader.state(deu), LoadState::Loaded("germany"));
    }

    #[tokio::test]
    async fn test_ensure_fetches_once() {
        let loader: Loader<u32> = Loader::new();
        assert_eq!(
            loader.ensure(ResourceSlot::Catalog, async { Ok(1) }).await,
            Some(Completion::Applied)
        );
        assert_eq!(loader.ensure(ResourceSlot::Catalog, async { Ok(2) }).await, None);
        assert_eq!(loader.state(ResourceSlot::Catalog), LoadState::Loaded(1));

        // A failed slot is requested again
        loader
            .request(ResourceSlot::Features, async { Err(FetchError::network("features", "offline")) })
            .await;
        assert_eq!(
            loader.ensure(ResourceSlot::Features, async { Ok(5) }).await,
            Some(Completion::Applied)
        );
    }

    #[test]
    fn test_begin_complete_by_hand() {
        let loader: Loader<u32> = Loader::new();
        let old = loader.begin(ResourceSlot::Catalog);
        let new = loader.begin(ResourceSlot::Catalog);
        assert!(new.generation() > old.generation());

        assert_eq!(loader.complete(new, Ok(2)), Completion::Applied);
        assert_eq!(loader.complete(old, Ok(1)), Completion::Superseded);
        assert_eq!(loader.latest(ResourceSlot::Catalog), Some(2));
    }

    #[tokio::test]
    async fn test_with_latest_can_read_the_same_loader() {
        let loader: Loader<u32> = Loader::new();
        loader.request(ResourceSlot::Catalog, async { Ok(3) }).await;

        let seen = loader.with_latest(ResourceSlot::Catalog, |value| {
            (value.copied(), loader.latest(ResourceSlot::Catalog), loader.state(ResourceSlot::Catalog))
        });
        assert_eq!(seen, (Some(3), Some(3), LoadState::Loaded(3)));
        assert!(loader.with_latest(ResourceSlot::Features, |value| value.is_none()));
    }
}
