use std::fmt::{self, Debug};

use weft_base::MessageId;

use crate::{
    payload::Payload,
    revision::{BoxRevision, Revision},
};

/// An incoming command request, as handed to a command handler.
pub struct Request {
    /// The ID of the message that carried the request.
    pub id: MessageId,
    /// The namespace the command was sent in.
    pub namespace: String,
    /// The application-defined command name.
    pub command: String,
    /// A revision of the session that sent the request, at the revision it
    /// held when the request was sent.
    pub source: BoxRevision,
    /// The application-defined payload.
    pub payload: Payload,
}

impl Debug for Request {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Request")
            .field("id", &self.id)
            .field("namespace", &self.namespace)
            .field("command", &self.command)
            .field("source", &self.source.session_ref())
            .finish_non_exhaustive()
    }
}
