//! Local sessions: the catalog, local revisions, and the session registry.

use std::fmt::{self, Debug};

use tracing::debug;
use weft_base::{Ref, SessionId};

use crate::{error::Error, revision::BoxRevision};

mod catalog;
mod registry;
mod revision;

pub use self::catalog::Catalog;
pub use self::registry::SessionRegistry;
pub use self::revision::LocalRevision;

/// A session hosted by the local peer.
///
/// A session is a thin handle over its [`Catalog`]; destroying it closes
/// the catalog and removes it from the peer's registry. Handles are cheap
/// to clone and share the same underlying session.
#[derive(Clone)]
pub struct Session {
    catalog: Catalog,
    registry: SessionRegistry,
}

impl Session {
    pub(crate) fn new(catalog: Catalog, registry: SessionRegistry) -> Self {
        Session { catalog, registry }
    }

    /// The session's identifier.
    pub fn id(&self) -> SessionId {
        self.catalog.session_ref().id
    }

    /// The session's current ref.
    pub fn current_ref(&self) -> Ref {
        self.catalog.session_ref()
    }

    /// A revision at the session's current head.
    pub fn current_revision(&self) -> Result<BoxRevision, Error> {
        if self.catalog.is_closed() {
            return Err(Error::NotFound { id: self.id() });
        }
        Ok(Box::new(self.catalog.head()))
    }

    /// The catalog that owns this session's attribute table.
    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    /// Whether the session has been destroyed.
    pub fn is_closed(&self) -> bool {
        self.catalog.is_closed()
    }

    /// Waits until the session is destroyed.
    pub async fn closed(&self) {
        self.catalog.closed().await
    }

    /// Destroys the session, forcibly closing its catalog and removing it
    /// from the registry. Idempotent.
    pub fn destroy(&self) {
        self.catalog.close();
        if self.registry.remove(self.id()).is_some() {
            debug!(session = %self.id().fmt_short(), "session destroyed");
        }
    }
}

impl Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("ref", &self.catalog.session_ref())
            .finish_non_exhaustive()
    }
}
