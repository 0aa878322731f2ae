//! Identifier types for the weft message bus.
//!
//! Every entity on the bus is named by a small value type with a canonical
//! human-readable rendering:
//!
//! - [`PeerId`] identifies one process on the bus (`CLOCK-RAND`).
//! - [`SessionId`] identifies a session hosted by a peer (`CLOCK-RAND.SEQ`).
//! - [`Ref`] pins a session at a specific revision (`CLOCK-RAND.SEQ@REV`).
//! - [`MessageId`] identifies a single message sent by a session
//!   (`CLOCK-RAND.SEQ@REV#SEQ`).
//!
//! Rendering and parsing are exact inverses for every type. All types are
//! plain `Copy` values and carry no I/O.
#![deny(missing_docs, rustdoc::broken_intra_doc_links)]

mod error;
mod message_id;
mod peer_id;
mod reference;
mod session_id;

pub use self::error::ParseError;
pub use self::message_id::MessageId;
pub use self::peer_id::PeerId;
pub use self::reference::{Ref, Rev};
pub use self::session_id::SessionId;
