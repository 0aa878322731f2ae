use std::fmt::Debug;

use async_trait::async_trait;
use weft_base::Ref;

use crate::{attrs::Attr, error::Error, table::Namespace};

/// A boxed [`Revision`] trait object.
pub type BoxRevision = Box<dyn Revision>;

/// Versioned access to a session's attribute table.
///
/// A revision binds a session at a specific revision number. It is a
/// capability to read and update the table *at that version*: reads reflect
/// the table as of the bound revision, or a newer one when the backing
/// store cannot reconstruct the exact historical view, but never a torn
/// mix. Updates are optimistic: they succeed only if the bound ref is still
/// the session's current ref, and return the revision produced by the
/// update.
///
/// Local revisions answer from the owning catalog in-process and never
/// suspend on I/O. Remote revisions may fetch from the owning peer and
/// honor cancellation by dropping the future; an abandoned operation leaves
/// no partial state behind.
#[async_trait]
pub trait Revision: Send + Sync + Debug {
    /// The ref this revision was bound to at construction.
    fn session_ref(&self) -> Ref;

    /// Returns a revision at the session's current head, which may be newer
    /// than this one.
    async fn refresh(&self) -> Result<BoxRevision, Error>;

    /// Reads one attribute in the namespace `ns`. Attributes that have
    /// never been written read as the unset sentinel.
    async fn get(&self, ns: &str, key: &str) -> Result<Attr, Error>;

    /// Reads several attributes in the namespace `ns` at once, consistently.
    /// The result has an entry for every requested key.
    async fn get_many(&self, ns: &str, keys: &[&str]) -> Result<Namespace, Error>;

    /// Applies an attribute update in the namespace `ns` and returns the
    /// revision it produced.
    async fn update(&self, ns: &str, attrs: Vec<Attr>) -> Result<BoxRevision, Error>;

    /// Sets every attribute in the namespace `ns` to the empty value and
    /// returns the revision it produced.
    async fn clear(&self, ns: &str) -> Result<BoxRevision, Error>;

    /// Requests destruction of the session, subject to the same optimistic
    /// concurrency check as updates.
    async fn destroy(&self) -> Result<(), Error>;
}
