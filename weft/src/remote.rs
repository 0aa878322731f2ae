//! Sessions owned by other peers: the remote cache, remote revisions, and
//! the client trait through which fetches and updates reach the owning
//! peer.

mod cache;
mod client;
mod revision;

pub use self::cache::RemoteCache;
pub use self::client::SessionClient;
pub use self::revision::RemoteRevision;
