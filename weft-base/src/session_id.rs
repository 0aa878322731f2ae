use std::{
    fmt::{self, Debug, Display},
    str::FromStr,
};

use serde::{Deserialize, Serialize};

use crate::{error::ParseError, reference::Ref, PeerId, Rev};

/// The identifier of a session hosted by a peer.
///
/// Sessions are numbered sequentially within their owning peer. The sequence
/// is strictly positive for real sessions; zero is reserved.
///
/// The canonical rendering is `CLOCK-RAND.SEQ`, the peer ID followed by the
/// sequence in decimal.
#[derive(Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SessionId {
    /// The peer that owns the session.
    pub peer: PeerId,
    /// The session sequence within the owning peer, non-zero.
    pub seq: u32,
}

impl SessionId {
    /// Checks that the peer components and the sequence are non-zero.
    pub fn validate(&self) -> Result<(), ParseError> {
        self.peer.validate()?;
        if self.seq == 0 {
            return Err(ParseError::ZeroSeq);
        }
        Ok(())
    }

    /// Creates a [`Ref`] to this session at revision `rev`.
    pub fn at(self, rev: Rev) -> Ref {
        Ref { id: self, rev }
    }

    /// A friendly short form for log output, without the clock component.
    pub fn fmt_short(&self) -> impl Display + 'static {
        SessionIdShort(self.peer.rand, self.seq)
    }
}

struct SessionIdShort(u16, u32);

impl Display for SessionIdShort {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04X}.{}", self.0, self.1)
    }
}

impl Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.peer, self.seq)
    }
}

impl Debug for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SessionId({self})")
    }
}

impl FromStr for SessionId {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (peer, seq) = s.split_once('.').ok_or(ParseError::Malformed)?;
        let id = SessionId {
            peer: peer.parse()?,
            seq: parse_seq(seq)?,
        };
        id.validate()?;
        Ok(id)
    }
}

fn parse_seq(s: &str) -> Result<u32, ParseError> {
    if s.is_empty() || !s.bytes().all(|b| b.is_ascii_digit()) {
        return Err(ParseError::InvalidSeq);
    }
    s.parse().map_err(|_| ParseError::InvalidSeq)
}
