//! Session state engine for the weft message bus.
//!
//! Peers on the bus host *sessions*. Each session carries a versioned
//! attribute table: namespaced string keys mapping to string values, each
//! optionally *frozen* (immutable forever once set). The table is owned by
//! the session's [`Catalog`] on the owning peer; every successful update
//! advances the session's revision by exactly one, and updates are checked
//! against the caller-supplied [`Ref`] so concurrent writers cannot clobber
//! changes they have not seen.
//!
//! Observers read and mutate the table through [`Revision`] handles. A
//! revision binds a session at a specific revision number; it is a
//! capability to ask questions *at that version*, not a frozen snapshot.
//! Local revisions answer from the catalog directly. Remote revisions
//! answer from the peer's [`RemoteCache`], which keeps partial attribute
//! snapshots for sessions owned by other peers, fetching through a
//! [`SessionClient`] on miss and merging piggybacked snapshots observed on
//! incoming messages. The [`AggregateStore`] routes ref lookups to
//! whichever side owns the session.
//!
//! The broker transport, command invoker/server, and notification fan-out
//! are external collaborators; this crate defines only the traits and
//! values they exchange (see [`transport`], [`Request`], [`Response`]).
#![deny(missing_docs, rustdoc::broken_intra_doc_links)]

pub mod attrs;
mod config;
pub mod constraint;
mod error;
pub mod payload;
mod peer;
pub mod remote;
mod request;
mod response;
mod revision;
pub mod session;
pub mod store;
pub mod table;
pub mod transport;

pub use self::attrs::{validate_namespace, Attr};
pub use self::config::Config;
pub use self::constraint::Constraint;
pub use self::error::Error;
pub use self::payload::Payload;
pub use self::peer::Peer;
pub use self::remote::{RemoteCache, RemoteRevision, SessionClient};
pub use self::request::Request;
pub use self::response::{Outcome, ReplyMode, Response};
pub use self::revision::{BoxRevision, Revision};
pub use self::session::{Catalog, LocalRevision, Session, SessionRegistry};
pub use self::store::{AggregateStore, ClosedRevision, RevisionStore};
pub use self::table::{AttrMeta, Diff, Namespace, Table};

pub use weft_base::{MessageId, ParseError, PeerId, Ref, Rev, SessionId};
