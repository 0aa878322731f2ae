//! Revision lookup: the store trait, the local/remote aggregate, and the
//! closed-session placeholder.

use std::fmt::Debug;
use std::sync::Arc;

use async_trait::async_trait;
use weft_base::{PeerId, Ref};

use crate::{
    attrs::Attr,
    error::Error,
    revision::{BoxRevision, Revision},
    table::Namespace,
};

/// A source of session revisions.
///
/// Lookups never suspend: remote revisions are handed out without any
/// eager fetch, and missing sessions surface as closed placeholders or as
/// [`Error::NotFound`] on first read, never as a null revision.
pub trait RevisionStore: Send + Sync + Debug {
    /// The revision for `at`.
    fn get_revision(&self, at: Ref) -> Result<BoxRevision, Error>;
}

/// A revision store that routes between the local and the remote path.
///
/// Refs for sessions owned by the local peer go to the local store (the
/// session registry); everything else goes to the remote store (the remote
/// cache). When the matching side is not configured the lookup answers with
/// a closed placeholder.
#[derive(Debug, Clone)]
pub struct AggregateStore {
    peer_id: PeerId,
    local: Option<Arc<dyn RevisionStore>>,
    remote: Option<Arc<dyn RevisionStore>>,
}

impl AggregateStore {
    /// A store routing between `local` and `remote` for the peer `peer_id`.
    pub fn new(
        peer_id: PeerId,
        local: Option<Arc<dyn RevisionStore>>,
        remote: Option<Arc<dyn RevisionStore>>,
    ) -> Self {
        AggregateStore {
            peer_id,
            local,
            remote,
        }
    }
}

impl RevisionStore for AggregateStore {
    fn get_revision(&self, at: Ref) -> Result<BoxRevision, Error> {
        if at.id.peer == self.peer_id {
            if let Some(local) = &self.local {
                return local.get_revision(at);
            }
        } else if let Some(remote) = &self.remote {
            return remote.get_revision(at);
        }

        Ok(Box::new(ClosedRevision::new(at)))
    }
}

/// A revision whose session is known to be gone.
///
/// Every read and update answers [`Error::NotFound`]; destroying an
/// already-destroyed session succeeds. Handing this out instead of a null
/// value keeps "the session is gone" a behavior rather than a special case
/// at every call site.
#[derive(Debug, Clone, Copy)]
pub struct ClosedRevision {
    at: Ref,
}

impl ClosedRevision {
    /// A closed placeholder for `at`.
    pub fn new(at: Ref) -> Self {
        ClosedRevision { at }
    }

    fn not_found(&self) -> Error {
        Error::NotFound { id: self.at.id }
    }
}

#[async_trait]
impl Revision for ClosedRevision {
    fn session_ref(&self) -> Ref {
        self.at
    }

    async fn refresh(&self) -> Result<BoxRevision, Error> {
        Err(self.not_found())
    }

    async fn get(&self, _ns: &str, _key: &str) -> Result<Attr, Error> {
        Err(self.not_found())
    }

    async fn get_many(&self, _ns: &str, _keys: &[&str]) -> Result<Namespace, Error> {
        Err(self.not_found())
    }

    async fn update(&self, _ns: &str, _attrs: Vec<Attr>) -> Result<BoxRevision, Error> {
        Err(self.not_found())
    }

    async fn clear(&self, _ns: &str) -> Result<BoxRevision, Error> {
        Err(self.not_found())
    }

    async fn destroy(&self) -> Result<(), Error> {
        Ok(())
    }
}
