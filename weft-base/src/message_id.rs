use std::{
    fmt::{self, Debug, Display},
    str::FromStr,
};

use serde::{Deserialize, Serialize};

use crate::{error::ParseError, Ref};

/// The identifier of a single message sent by a session.
///
/// A message ID combines the ref the message was produced at with a message
/// sequence. The sequence resets to zero whenever the session's revision
/// advances, so the `(rev, seq)` pair is unique across the life of the
/// session. The canonical rendering is `CLOCK-RAND.SEQ@REV#SEQ`.
#[derive(Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct MessageId {
    /// The session ref the message was produced at.
    pub at: Ref,
    /// The message sequence within the ref's revision.
    pub seq: u32,
}

impl MessageId {
    /// A friendly short form for log output, without the clock component.
    pub fn fmt_short(&self) -> impl Display + 'static {
        MessageIdShort(self.at, self.seq)
    }
}

struct MessageIdShort(Ref, u32);

impl Display for MessageIdShort {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self.0.fmt_short(), self.1)
    }
}

impl Display for MessageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self.at, self.seq)
    }
}

impl Debug for MessageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "MessageId({self})")
    }
}

impl FromStr for MessageId {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (at, seq) = s.split_once('#').ok_or(ParseError::Malformed)?;
        if seq.is_empty() || !seq.bytes().all(|b| b.is_ascii_digit()) {
            return Err(ParseError::InvalidMessageSeq);
        }
        Ok(MessageId {
            at: at.parse()?,
            seq: seq.parse().map_err(|_| ParseError::InvalidMessageSeq)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{PeerId, SessionId};

    fn at() -> Ref {
        SessionId {
            peer: PeerId {
                clock: 0x0123_4567_89AB_CDEF,
                rand: 0x0BAD,
            },
            seq: 123,
        }
        .at(456)
    }

    #[test]
    fn render_parse_roundtrip() {
        let id = at().message(789);
        assert_eq!(id.to_string(), "123456789ABCDEF-0BAD.123@456#789");
        assert_eq!(
            "123456789ABCDEF-0BAD.123@456#789"
                .parse::<MessageId>()
                .unwrap(),
            id
        );
    }

    #[test]
    fn rejects_malformed() {
        for s in [
            "<malformed>",
            "123456789ABCDEF-0BAD.123@456",
            "123456789ABCDEF-0BAD.123@456#",
            "123456789ABCDEF-0BAD.123@456#x",
            "123456789ABCDEF-0BAD.123@456#4294967296",
        ] {
            assert!(s.parse::<MessageId>().is_err(), "expected {s:?} to fail");
        }
    }

    #[test]
    fn short_form() {
        assert_eq!(at().message(7).fmt_short().to_string(), "0BAD.123@456#7");
    }
}
