use std::fmt::{self, Debug};

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tokio::sync::oneshot;
use tokio_util::sync::CancellationToken;

use crate::{error::Error, payload::Payload};

/// How a command request expects to be answered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReplyMode {
    /// No reply is expected; the responder drops outcomes silently.
    None,
    /// The reply is correlated to the request by message ID.
    Correlated,
    /// The reply carries the full routing information itself.
    Uncorrelated,
}

/// The terminal outcome of a command request.
#[derive(Debug)]
pub enum Outcome {
    /// The handler succeeded, possibly with a payload.
    Success(Payload),
    /// The handler failed with a domain error or application failure.
    Error(Error),
}

/// The responder handed to a command handler.
///
/// Exactly one of [`done`](Response::done), [`error`](Response::error),
/// [`fail`](Response::fail) or [`close`](Response::close) terminates the
/// response; the outcome is delivered to the server loop through a oneshot
/// channel. Responding twice is a programmer error and panics, with the
/// exception of [`close`](Response::close), which reports whether this call
/// was the one that closed the response.
pub struct Response {
    mode: ReplyMode,
    cancel: CancellationToken,
    reply: Mutex<Option<oneshot::Sender<Outcome>>>,
}

impl Response {
    /// A responder for one request, along with the receiver the server loop
    /// awaits the outcome on. `cancel` is the request's cancellation token;
    /// once it fires the reply is no longer required.
    pub fn new(mode: ReplyMode, cancel: CancellationToken) -> (Self, oneshot::Receiver<Outcome>) {
        let (tx, rx) = oneshot::channel();
        (
            Response {
                mode,
                cancel,
                reply: Mutex::new(Some(tx)),
            },
            rx,
        )
    }

    /// Whether the caller still expects a reply.
    ///
    /// Becomes false once the response is closed, when the request carries
    /// [`ReplyMode::None`], or when the request has been cancelled.
    pub fn is_required(&self) -> bool {
        if self.reply.lock().is_none() {
            return false;
        }
        if self.mode == ReplyMode::None {
            return false;
        }
        !self.cancel.is_cancelled()
    }

    /// Whether the response has been terminated.
    pub fn is_closed(&self) -> bool {
        self.reply.lock().is_none()
    }

    /// Terminates the response successfully with `payload`.
    ///
    /// Panics if the response is already closed.
    pub fn done(&self, payload: Payload) {
        self.respond(Outcome::Success(payload));
    }

    /// Terminates the response with an error.
    ///
    /// Panics if the response is already closed.
    pub fn error(&self, err: Error) {
        self.respond(Outcome::Error(err));
    }

    /// Terminates the response with an application failure and returns the
    /// failure value.
    ///
    /// Panics if the response is already closed.
    pub fn fail(&self, failure_type: &str, message: &str) -> Error {
        self.respond(Outcome::Error(Error::failure(failure_type, message)));
        Error::failure(failure_type, message)
    }

    /// Terminates the response successfully with no payload. Returns true
    /// if this call closed the response, false if it was already closed.
    pub fn close(&self) -> bool {
        let Some(tx) = self.reply.lock().take() else {
            return false;
        };
        self.deliver(tx, Outcome::Success(Payload::none()));
        true
    }

    fn respond(&self, outcome: Outcome) {
        let Some(tx) = self.reply.lock().take() else {
            panic!("response is already closed");
        };
        self.deliver(tx, outcome);
    }

    fn deliver(&self, tx: oneshot::Sender<Outcome>, outcome: Outcome) {
        if self.mode == ReplyMode::None || self.cancel.is_cancelled() {
            return;
        }
        // The server loop may have gone away; there is nobody left to tell.
        let _ = tx.send(outcome);
    }
}

impl Debug for Response {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Response")
            .field("mode", &self.mode)
            .field("closed", &self.is_closed())
            .finish_non_exhaustive()
    }
}
