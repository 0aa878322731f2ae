use serde::{Deserialize, Serialize};
use weft_base::{Ref, SessionId};

use crate::payload::Payload;

/// The error taxonomy of the bus.
///
/// The first five variants are *domain errors*: recoverable values that the
/// (external) codec serializes onto the wire and reconstructs on the far
/// peer. [`Error::Transport`] wraps broker-level trouble and is never sent
/// across the wire.
#[derive(Debug, Serialize, Deserialize, thiserror::Error)]
pub enum Error {
    /// The session does not exist, or has been destroyed.
    #[error("session {id} not found")]
    NotFound {
        /// The session that could not be found.
        id: SessionId,
    },

    /// An update was computed against a ref that is no longer current.
    #[error("update of {at} is out of date")]
    StaleUpdate {
        /// The ref the caller supplied.
        at: Ref,
    },

    /// A read at an old revision cannot be reconstructed: one or more of the
    /// requested attributes have been modified since.
    #[error("can not fetch attributes at {at}, one or more attributes have been modified since")]
    StaleFetch {
        /// The ref the read was bound to.
        at: Ref,
    },

    /// An update attempted to change one or more frozen attributes.
    #[error("update of {at} failed, the attributes {keys:?} are frozen")]
    FrozenAttributes {
        /// The ref the caller supplied.
        at: Ref,
        /// The offending attribute keys.
        keys: Vec<String>,
    },

    /// An application-defined failure returned by a command handler.
    ///
    /// Failures are part of the application protocol; callers are expected
    /// to recognize the failure type and recover.
    #[error("{failure_type}: {message}")]
    Failure {
        /// The application-defined failure type.
        failure_type: String,
        /// A human-readable description.
        message: String,
        /// An optional application-defined payload.
        payload: Payload,
    },

    /// A namespace name failed validation.
    #[error("namespace {namespace:?} is invalid: {reason}")]
    InvalidNamespace {
        /// The rejected name.
        namespace: String,
        /// Why it was rejected.
        reason: String,
    },

    /// A revision newer than the catalog's current revision was requested.
    #[error("revision {at} is from the future")]
    FutureRevision {
        /// The requested ref.
        at: Ref,
    },

    /// Broker-level trouble: timeout, cancellation, disconnection.
    #[error(transparent)]
    #[serde(skip)]
    Transport(#[from] anyhow::Error),
}

impl Error {
    /// Constructs an application failure with no payload.
    pub fn failure(failure_type: impl Into<String>, message: impl Into<String>) -> Self {
        Error::Failure {
            failure_type: failure_type.into(),
            message: message.into(),
            payload: Payload::none(),
        }
    }

    /// Whether this is an application-defined failure.
    pub fn is_failure(&self) -> bool {
        matches!(self, Error::Failure { .. })
    }

    /// Whether this is a not-found error.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::NotFound { .. })
    }

    /// Whether retrying the operation against a refreshed revision may
    /// succeed.
    pub fn should_retry(&self) -> bool {
        matches!(self, Error::StaleUpdate { .. } | Error::StaleFetch { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use weft_base::PeerId;

    fn at() -> Ref {
        SessionId {
            peer: PeerId { clock: 1, rand: 0x0BAD },
            seq: 7,
        }
        .at(2)
    }

    #[test]
    fn messages() {
        assert_eq!(
            Error::NotFound { id: at().id }.to_string(),
            "session 1-0BAD.7 not found"
        );
        assert_eq!(
            Error::StaleUpdate { at: at() }.to_string(),
            "update of 1-0BAD.7@2 is out of date"
        );
        assert_eq!(
            Error::failure("cart-empty", "nothing to check out").to_string(),
            "cart-empty: nothing to check out"
        );
    }

    #[test]
    fn classification() {
        assert!(Error::StaleUpdate { at: at() }.should_retry());
        assert!(Error::StaleFetch { at: at() }.should_retry());
        assert!(!Error::NotFound { id: at().id }.should_retry());
        assert!(Error::failure("t", "m").is_failure());
        assert!(Error::NotFound { id: at().id }.is_not_found());
    }

    #[test]
    fn domain_errors_roundtrip() {
        let err = Error::FrozenAttributes {
            at: at(),
            keys: vec!["a".into()],
        };
        let bytes = postcard::to_stdvec(&err).unwrap();
        let back: Error = postcard::from_bytes(&bytes).unwrap();
        match back {
            Error::FrozenAttributes { at: r, keys } => {
                assert_eq!(r, at());
                assert_eq!(keys, vec!["a".to_string()]);
            }
            other => panic!("unexpected variant: {other:?}"),
        }
    }
}
