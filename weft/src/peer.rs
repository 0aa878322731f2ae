use std::fmt::{self, Debug};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

use tracing::debug;
use weft_base::{PeerId, SessionId};

use crate::{
    config::Config,
    remote::{RemoteCache, SessionClient},
    session::{Catalog, Session, SessionRegistry},
    store::AggregateStore,
};

/// One process on the bus.
///
/// The peer owns the directory of its local sessions and, when constructed
/// with a [`SessionClient`], a cache of remote-session state. Its
/// [`AggregateStore`] is what command and notification handlers use to turn
/// an incoming ref into a [`Revision`](crate::Revision).
pub struct Peer {
    id: PeerId,
    registry: SessionRegistry,
    cache: Option<RemoteCache>,
    store: AggregateStore,
    session_seq: AtomicU32,
}

impl Peer {
    /// A peer with no remote access: refs owned by other peers answer as
    /// closed.
    pub fn new(id: PeerId) -> Self {
        Self::build(id, None)
    }

    /// A peer that reaches other peers' sessions through `client`.
    pub fn with_client(id: PeerId, client: Arc<dyn SessionClient>) -> Self {
        Self::build(id, Some(RemoteCache::new(client)))
    }

    /// A peer with custom tunables.
    pub fn with_config(id: PeerId, client: Arc<dyn SessionClient>, config: Config) -> Self {
        Self::build(id, Some(RemoteCache::with_config(client, config)))
    }

    fn build(id: PeerId, cache: Option<RemoteCache>) -> Self {
        let registry = SessionRegistry::default();
        let store = AggregateStore::new(
            id,
            Some(Arc::new(registry.clone())),
            cache
                .clone()
                .map(|cache| Arc::new(cache) as Arc<dyn crate::store::RevisionStore>),
        );
        Peer {
            id,
            registry,
            cache,
            store,
            session_seq: AtomicU32::new(0),
        }
    }

    /// The peer's identifier.
    pub fn id(&self) -> PeerId {
        self.id
    }

    /// Creates a new session owned by this peer.
    pub fn session(&self) -> Session {
        let seq = self.session_seq.fetch_add(1, Ordering::Relaxed) + 1;
        let id = SessionId { peer: self.id, seq };
        let catalog = Catalog::new(id);
        self.registry.add(catalog.clone());
        debug!(session = %id.fmt_short(), "session created");
        Session::new(catalog, self.registry.clone())
    }

    /// The directory of this peer's live sessions.
    pub fn registry(&self) -> &SessionRegistry {
        &self.registry
    }

    /// The remote-session cache, when the peer was built with a client.
    pub fn remote_cache(&self) -> Option<&RemoteCache> {
        self.cache.as_ref()
    }

    /// The revision store that routes refs to the local registry or the
    /// remote cache.
    pub fn revisions(&self) -> &AggregateStore {
        &self.store
    }
}

impl Debug for Peer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Peer")
            .field("id", &self.id)
            .field("sessions", &self.registry.len())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::RevisionStore;
    use crate::{Error, Revision};

    fn peer_id(rand: u16) -> PeerId {
        PeerId { clock: 1, rand }
    }

    #[test]
    fn sessions_get_sequential_non_zero_ids() {
        let peer = Peer::new(peer_id(0x0BAD));
        let first = peer.session();
        let second = peer.session();

        assert_eq!(first.id().peer, peer.id());
        assert_eq!(first.id().seq, 1);
        assert_eq!(second.id().seq, 2);
        assert!(first.id().validate().is_ok());
        assert_eq!(peer.registry().len(), 2);
    }

    #[tokio::test]
    async fn revisions_route_to_local_sessions() {
        let peer = Peer::new(peer_id(0x0BAD));
        let session = peer.session();

        let revision = peer.revisions().get_revision(session.current_ref()).unwrap();
        assert_eq!(revision.session_ref(), session.current_ref());

        session.destroy();
        let gone = peer.revisions().get_revision(session.id().at(0)).unwrap();
        assert!(matches!(
            gone.get("ns", "a").await,
            Err(Error::NotFound { .. })
        ));
    }
}
