use std::collections::HashMap;
use std::fmt::{self, Debug};
use std::sync::Arc;

use parking_lot::RwLock;
use tokio::sync::Mutex;
use tracing::debug;
use weft_base::{Ref, Rev, SessionId};

use crate::{
    config::Config,
    error::Error,
    remote::{RemoteRevision, SessionClient},
    revision::BoxRevision,
    store::RevisionStore,
    table::{AttrMeta, Namespace, Table},
};

/// The peer's cache of attribute snapshots for sessions owned by other
/// peers.
///
/// One entry per remote session, holding the latest observed ref and a
/// partial table of the attributes that have been fetched or observed so
/// far. Entries stay warm primarily through [`observe`](RemoteCache::observe),
/// which merges the snapshots piggybacked on incoming commands and
/// notifications; reads the cache cannot serve fall back to fetching
/// through the [`SessionClient`].
///
/// Merges are monotone: an entry's ref never moves backward, and replies
/// older than the cached ref are discarded. Frozen attributes survive every
/// merge, since they can never change. A session reported gone by its
/// owning peer is tombstoned so later reads fail fast without another
/// round-trip.
#[derive(Clone)]
pub struct RemoteCache {
    client: Arc<dyn SessionClient>,
    config: Config,
    entries: Arc<RwLock<HashMap<SessionId, CacheEntry>>>,
}

pub(crate) type CacheEntry = Arc<Mutex<EntryState>>;

impl RemoteCache {
    /// A cache that reaches owning peers through `client`, with default
    /// tunables.
    pub fn new(client: Arc<dyn SessionClient>) -> Self {
        Self::with_config(client, Config::default())
    }

    /// A cache that reaches owning peers through `client`.
    pub fn with_config(client: Arc<dyn SessionClient>, config: Config) -> Self {
        RemoteCache {
            client,
            config,
            entries: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Runs one client call under the configured default timeout.
    pub(crate) async fn call<T>(
        &self,
        fut: impl std::future::Future<Output = Result<T, Error>>,
    ) -> Result<T, Error> {
        match tokio::time::timeout(self.config.default_timeout, fut).await {
            Ok(result) => result,
            Err(_) => Err(Error::Transport(anyhow::anyhow!(
                "remote session operation timed out"
            ))),
        }
    }

    /// A revision bound to `at`, backed by this cache.
    ///
    /// No fetch happens here; the revision fetches on first read that the
    /// cache cannot serve.
    pub fn lookup(&self, at: Ref) -> RemoteRevision {
        RemoteRevision::new(self.clone(), at)
    }

    /// Merges an attribute snapshot observed on an incoming message.
    ///
    /// This is how caches stay warm without extra round-trips: transports
    /// call this for every snapshot the codec extracts from message
    /// headers.
    pub async fn observe(&self, at: Ref, ns: &str, attrs: Vec<AttrMeta>) {
        let entry = self.entry(at.id);
        let mut state = entry.lock().await;
        if state.closed {
            return;
        }
        state.merge(at, ns, attrs);
    }

    /// Evicts the entry for `id`.
    ///
    /// Used when a session-closed notification arrives or the owning peer
    /// becomes unreachable; a later lookup starts from a cold entry.
    pub fn invalidate(&self, id: SessionId) {
        if self.entries.write().remove(&id).is_some() {
            debug!(session = %id.fmt_short(), "evicted remote session");
        }
    }

    pub(crate) fn client(&self) -> &Arc<dyn SessionClient> {
        &self.client
    }

    pub(crate) fn entry(&self, id: SessionId) -> CacheEntry {
        if let Some(entry) = self.entries.read().get(&id) {
            return entry.clone();
        }
        self.entries
            .write()
            .entry(id)
            .or_insert_with(|| Arc::new(Mutex::new(EntryState::new(id))))
            .clone()
    }
}

impl Debug for RemoteCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RemoteCache")
            .field("sessions", &self.entries.read().len())
            .finish_non_exhaustive()
    }
}

impl RevisionStore for RemoteCache {
    fn get_revision(&self, at: Ref) -> Result<BoxRevision, Error> {
        Ok(Box::new(self.lookup(at)))
    }
}

/// The cached state for one remote session.
pub(crate) struct EntryState {
    /// The latest ref observed for the session.
    at: Ref,
    /// The attributes fetched or observed so far. Partial: only keys that
    /// have crossed this peer are present.
    table: Table,
    /// Whether the owning peer has reported the session gone.
    closed: bool,
}

impl EntryState {
    fn new(id: SessionId) -> Self {
        EntryState {
            at: id.at(0),
            table: Table::default(),
            closed: false,
        }
    }

    pub(crate) fn at(&self) -> Ref {
        self.at
    }

    pub(crate) fn is_closed(&self) -> bool {
        self.closed
    }

    /// Tombstones the entry; the session is authoritatively gone.
    pub(crate) fn close(&mut self) {
        self.closed = true;
        self.table = Table::default();
    }

    /// Merges a reply or observed snapshot into the entry.
    ///
    /// A newer ref replaces the snapshot: the ref advances, non-frozen
    /// entries from the old snapshot are dropped (they may have changed),
    /// frozen entries are retained, and the attributes carried by the reply
    /// are installed. A reply at the cached ref merges in place. An older
    /// reply is discarded.
    pub(crate) fn merge(&mut self, at: Ref, ns: &str, attrs: Vec<AttrMeta>) {
        if at.rev < self.at.rev {
            return;
        }

        if at.rev > self.at.rev {
            self.at = at;
            let namespaces: Vec<String> =
                self.table.iter().map(|(name, _)| name.to_string()).collect();
            for name in namespaces {
                self.table
                    .namespace_mut(&name)
                    .retain(|meta| meta.attr.is_frozen);
            }
        }

        if !attrs.is_empty() {
            let namespace = self.table.namespace_mut(ns);
            for meta in attrs {
                namespace.insert(meta);
            }
        }
    }

    /// Advances the cached ref without any attributes, as learned from a
    /// head probe.
    pub(crate) fn merge_ref(&mut self, at: Ref) {
        self.merge(at, "", Vec::new());
    }

    /// Serves a read bound to `rev` from the cache, if it can be served
    /// consistently.
    ///
    /// Before a fetch (`allow_newer == false`) the cache answers only from
    /// an exact-revision snapshot, or for frozen attributes, which are
    /// stable at any newer snapshot. After a fetch has brought the entry to
    /// the owning peer's head (`allow_newer == true`) a newer snapshot is
    /// the best consistent view available and is served as a whole.
    pub(crate) fn try_serve(
        &self,
        rev: Rev,
        ns: &str,
        keys: &[&str],
        allow_newer: bool,
    ) -> Option<Namespace> {
        if self.at.rev < rev {
            return None;
        }
        let exact = self.at.rev == rev;
        let namespace = self.table.namespace(ns);

        let mut result = Namespace::default();
        for key in keys {
            let meta = namespace.and_then(|namespace| namespace.get(key))?;
            if !exact && !allow_newer && !meta.attr.is_frozen {
                return None;
            }
            result.insert(meta.clone());
        }
        Some(result)
    }
}

impl Debug for EntryState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EntryState")
            .field("ref", &self.at)
            .field("closed", &self.closed)
            .finish_non_exhaustive()
    }
}
