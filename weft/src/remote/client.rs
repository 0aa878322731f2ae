use std::fmt::Debug;

use async_trait::async_trait;
use weft_base::{Ref, SessionId};

use crate::{attrs::Attr, error::Error, table::AttrMeta};

/// The slice of the command layer the remote cache consumes.
///
/// Implementations deliver these operations to the peer that owns the
/// session: in production through the broker's command exchange, in tests
/// directly against a local registry. Every method suspends on network I/O
/// and honors cancellation by dropping the future; the cache commits
/// nothing from an abandoned call.
///
/// Domain errors returned by the owning peer come back as [`Error`] values;
/// in particular [`Error::NotFound`] is authoritative and callers cache it.
#[async_trait]
pub trait SessionClient: Send + Sync + Debug {
    /// The session's current ref at the owning peer.
    async fn head(&self, id: SessionId) -> Result<Ref, Error>;

    /// Fetches attributes of the namespace `ns` at the owning peer.
    ///
    /// Requests the listed keys, or the entire namespace when `keys` is
    /// empty. The reply carries the owning catalog's current ref and the
    /// attributes as of that ref; requested keys that have never been
    /// written may be omitted from the reply.
    async fn fetch(
        &self,
        id: SessionId,
        ns: &str,
        keys: &[&str],
    ) -> Result<(Ref, Vec<AttrMeta>), Error>;

    /// Applies an attribute update at the owning peer, optimistically
    /// checked against `at`. The reply carries the new head ref and the
    /// changed attributes.
    async fn update(
        &self,
        at: Ref,
        ns: &str,
        attrs: Vec<Attr>,
    ) -> Result<(Ref, Vec<AttrMeta>), Error>;

    /// Clears the namespace `ns` at the owning peer, optimistically checked
    /// against `at`.
    async fn clear(&self, at: Ref, ns: &str) -> Result<(Ref, Vec<AttrMeta>), Error>;

    /// Destroys the session at the owning peer, optimistically checked
    /// against `at`.
    async fn destroy(&self, at: Ref) -> Result<(), Error>;
}
