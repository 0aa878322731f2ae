use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;
use weft_base::{Ref, SessionId};

use crate::{
    error::Error,
    revision::BoxRevision,
    session::Catalog,
    store::{ClosedRevision, RevisionStore},
};

/// The local peer's directory of live session catalogs.
///
/// The registry is the local half of the aggregate revision store: given a
/// ref for a session owned by this peer, it answers with a revision from
/// the session's catalog, or with a closed placeholder once the session is
/// gone.
#[derive(Debug, Clone, Default)]
pub struct SessionRegistry {
    catalogs: Arc<RwLock<HashMap<SessionId, Catalog>>>,
}

impl SessionRegistry {
    /// Registers a catalog under its session ID.
    pub fn add(&self, catalog: Catalog) {
        let id = catalog.session_ref().id;
        self.catalogs.write().insert(id, catalog);
    }

    /// Removes the catalog for `id`, returning it if it was registered.
    pub fn remove(&self, id: SessionId) -> Option<Catalog> {
        self.catalogs.write().remove(&id)
    }

    /// The catalog for `id`, if the session is still live.
    pub fn get(&self, id: SessionId) -> Option<Catalog> {
        self.catalogs.read().get(&id).cloned()
    }

    /// The number of live sessions.
    pub fn len(&self) -> usize {
        self.catalogs.read().len()
    }

    /// Whether no sessions are registered.
    pub fn is_empty(&self) -> bool {
        self.catalogs.read().is_empty()
    }
}

impl RevisionStore for SessionRegistry {
    fn get_revision(&self, at: Ref) -> Result<BoxRevision, Error> {
        match self.get(at.id) {
            Some(catalog) => Ok(Box::new(catalog.at(at.rev)?)),
            None => Ok(Box::new(ClosedRevision::new(at))),
        }
    }
}
