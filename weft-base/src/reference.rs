use std::{
    fmt::{self, Debug, Display},
    str::FromStr,
};

use serde::{Deserialize, Serialize};

use crate::{error::ParseError, MessageId, SessionId};

/// A session revision number.
///
/// Revisions start at zero when a session is created and increase by exactly
/// one on every successful update or clear of the session's attribute table.
pub type Rev = u64;

/// A reference to a session at a specific revision.
///
/// Refs are the version tokens of the bus: every update names the ref it was
/// computed against, and the owning catalog rejects updates whose ref is not
/// its current one. The canonical rendering is `CLOCK-RAND.SEQ@REV`, the
/// revision in decimal.
#[derive(Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Ref {
    /// The session being referenced.
    pub id: SessionId,
    /// The revision of the session's attribute table.
    pub rev: Rev,
}

impl Ref {
    /// Creates a [`MessageId`] for the `seq`-th message sent at this ref.
    pub fn message(self, seq: u32) -> MessageId {
        MessageId { at: self, seq }
    }

    /// A friendly short form for log output, without the clock component.
    pub fn fmt_short(&self) -> impl Display + 'static {
        RefShort(self.id.peer.rand, self.id.seq, self.rev)
    }
}

struct RefShort(u16, u32, Rev);

impl Display for RefShort {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04X}.{}@{}", self.0, self.1, self.2)
    }
}

impl Display for Ref {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.id, self.rev)
    }
}

impl Debug for Ref {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Ref({self})")
    }
}

impl FromStr for Ref {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (id, rev) = s.split_once('@').ok_or(ParseError::Malformed)?;
        Ok(Ref {
            id: id.parse()?,
            rev: parse_rev(rev)?,
        })
    }
}

fn parse_rev(s: &str) -> Result<Rev, ParseError> {
    if s.is_empty() || !s.bytes().all(|b| b.is_ascii_digit()) {
        return Err(ParseError::InvalidRev);
    }
    s.parse().map_err(|_| ParseError::InvalidRev)
}
