//! Manager directory: name listing, candidate matching and debounced lookups
//!
//! The directory sits on top of a [`RecordStore`]. Lookups driven by typing go
//! through [`ManagerLookup`], which debounces them and stamps every issued
//! request with a token so that a slow, older response can be recognised and
//! dropped once a newer one has been issued.

pub mod debounce;
pub mod store;

#[cfg(feature = "airtable")]
pub mod airtable;

use std::collections::HashSet;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use log::{debug, warn};
use serde::Serialize;
use tokio::sync::mpsc::{self, error::TrySendError};
use tokio::task::JoinHandle;

use crate::notify::{Notice, Notifier};
use crate::Result;

pub use debounce::Debouncer;
pub use store::{Attachment, MemoryStore, RecordStore, StoreRecord};

/// Maximum number of candidates requested per lookup.
pub const DEFAULT_LIMIT: usize = 5;

/// Undrained completions kept before new ones are dropped.
pub const LOOKUP_BACKLOG: usize = 16;

/// A resolved manager. Records without a photo never become one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ManagerRecord {
    pub name: String,
    pub photo_url: String,
}

/// Pick the winning candidate for `query`.
///
/// The first candidate whose name equals the trimmed query ignoring case wins;
/// otherwise the first candidate in store order.
pub fn choose_candidate<'a>(query: &str, candidates: &'a [StoreRecord]) -> Option<&'a StoreRecord> {
    let wanted = query.trim().to_lowercase();
    candidates
        .iter()
        .find(|r| r.name.trim().to_lowercase() == wanted)
        .or_else(|| candidates.first())
}

/// Drop blank names and exact duplicates, keeping first-seen order.
pub fn dedup_names(names: Vec<String>) -> Vec<String> {
    let mut seen = HashSet::new();
    names
        .into_iter()
        .filter(|n| !n.trim().is_empty())
        .filter(|n| seen.insert(n.clone()))
        .collect()
}

#[derive(Clone)]
pub struct ManagerDirectory {
    store: Arc<dyn RecordStore>,
    notifier: Arc<dyn Notifier>,
    limit: usize,
}

impl ManagerDirectory {
    pub fn new(store: Arc<dyn RecordStore>, notifier: Arc<dyn Notifier>) -> Self {
        Self { store, notifier, limit: DEFAULT_LIMIT }
    }

    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = limit.max(1);
        self
    }

    pub fn limit(&self) -> usize {
        self.limit
    }

    /// Unique manager names in store order. Never fails: a store error is
    /// logged, reported as a warning notice and yields an empty list.
    pub async fn list_all_names(&self) -> Vec<String> {
        match self.store.list_names().await {
            Ok(names) => {
                let names = dedup_names(names);
                debug!("loaded {} manager names", names.len());
                names
            }
            Err(e) => {
                warn!("failed to load manager names: {}", e);
                self.notifier
                    .notify(Notice::Warning("Failed to load manager options".to_string()));
                Vec::new()
            }
        }
    }

    /// Resolve `query` to a manager with a photo.
    ///
    /// `Ok(None)` covers a blank query (the store is not contacted), no
    /// candidates, and a winner without photo. Store failures come back as
    /// `Error::LookupFailed`.
    pub async fn find_manager(&self, query: &str) -> Result<Option<ManagerRecord>> {
        if query.trim().is_empty() {
            return Ok(None);
        }

        let candidates = self
            .store
            .find_candidates(query, self.limit)
            .await
            .map_err(|e| e.into_lookup())?;
        debug!("{} candidates for '{}'", candidates.len(), query);

        Ok(choose_candidate(query, &candidates).and_then(|winner| {
            winner.photo.first().map(|p| ManagerRecord {
                name: winner.name.clone(),
                photo_url: p.url.clone(),
            })
        }))
    }
}

impl std::fmt::Debug for ManagerDirectory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ManagerDirectory").field("limit", &self.limit).finish()
    }
}

/// Names loaded once per session, shared read-only.
#[derive(Debug, Clone, Default)]
pub struct NameCache {
    names: Arc<Vec<String>>,
}

impl NameCache {
    pub fn new(names: Vec<String>) -> Self {
        Self { names: Arc::new(names) }
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// Names containing `input` ignoring case; nothing for blank input.
    pub fn suggest(&self, input: &str) -> Vec<&str> {
        if input.trim().is_empty() {
            return Vec::new();
        }
        let needle = input.to_lowercase();
        self.names
            .iter()
            .filter(|n| n.to_lowercase().contains(&needle))
            .map(String::as_str)
            .collect()
    }
}

/// Result of one issued lookup, delivered on the completion channel.
#[derive(Debug)]
pub struct LookupCompletion {
    pub token: u64,
    pub query: String,
    pub result: Result<Option<ManagerRecord>>,
}

#[derive(Clone)]
struct Issuer {
    directory: ManagerDirectory,
    latest: Arc<AtomicU64>,
    tx: mpsc::Sender<LookupCompletion>,
}

impl Issuer {
    fn next_token(&self) -> u64 {
        self.latest.fetch_add(1, Ordering::SeqCst) + 1
    }

    async fn run(self, token: u64, query: String) {
        debug!("lookup #{} for '{}'", token, query);
        let result = self.directory.find_manager(&query).await;
        match self.tx.try_send(LookupCompletion { token, query, result }) {
            Ok(()) => {}
            Err(TrySendError::Full(_)) => {
                debug!("lookup #{} dropped; {} completions are waiting to be drained", token, LOOKUP_BACKLOG)
            }
            Err(TrySendError::Closed(_)) => debug!("lookup #{} finished after its receiver was dropped", token),
        }
    }
}

/// Debounced, token-stamped manager lookups.
///
/// Completions arrive on the receiver returned by [`ManagerLookup::new`] in
/// the order they finish, which need not be the order they were issued; check
/// [`ManagerLookup::is_current`] before applying one. The channel holds at most
/// [`LOOKUP_BACKLOG`] completions; a host that stops draining it loses the
/// newer ones, not memory.
pub struct ManagerLookup {
    issuer: Issuer,
    debouncer: Debouncer,
}

impl ManagerLookup {
    pub fn new(
        directory: ManagerDirectory,
        window: Duration,
    ) -> (Self, mpsc::Receiver<LookupCompletion>) {
        let (tx, rx) = mpsc::channel(LOOKUP_BACKLOG);
        let issuer = Issuer { directory, latest: Arc::new(AtomicU64::new(0)), tx };
        (Self { issuer, debouncer: Debouncer::new(window) }, rx)
    }

    pub fn directory(&self) -> &ManagerDirectory {
        &self.issuer.directory
    }

    /// Issue a lookup for `query` once typing has paused for the window.
    pub fn schedule(&self, query: impl Into<String>) -> JoinHandle<()> {
        let query = query.into();
        let issuer = self.issuer.clone();
        self.debouncer.call(move || {
            let token = issuer.next_token();
            issuer.run(token, query)
        })
    }

    /// Issue a lookup right away, dropping any pending debounced one.
    pub fn issue(&self, query: impl Into<String>) -> JoinHandle<()> {
        self.debouncer.cancel();
        let token = self.issuer.next_token();
        tokio::spawn(self.issuer.clone().run(token, query.into()))
    }

    /// Drop the pending lookup and make every issued one stale.
    pub fn invalidate(&self) {
        self.debouncer.cancel();
        self.issuer.latest.fetch_add(1, Ordering::SeqCst);
    }

    /// Whether `token` belongs to the most recently issued lookup.
    pub fn is_current(&self, token: u64) -> bool {
        self.issuer.latest.load(Ordering::SeqCst) == token
    }
}

impl std::fmt::Debug for ManagerLookup {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ManagerLookup")
            .field("latest", &self.issuer.latest.load(Ordering::SeqCst))
            .field("window", &self.debouncer.window())
            .finish()
    }
}
