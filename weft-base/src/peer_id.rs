use std::{
    fmt::{self, Debug, Display},
    str::FromStr,
    time::{SystemTime, UNIX_EPOCH},
};

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::error::ParseError;

/// The identifier of a peer on the bus.
///
/// A peer ID combines a 64-bit clock component, taken from the wall clock at
/// startup, with a 16-bit random component. The clock component makes IDs
/// from restarts of the same process distinguishable; the random component
/// disambiguates peers started within the same clock tick. Both components
/// are non-zero for a valid ID.
///
/// The canonical rendering is `CLOCK-RAND` with both components in uppercase
/// hex, the clock 1-16 digits and the random component exactly 4.
#[derive(Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PeerId {
    /// The clock component, non-zero.
    pub clock: u64,
    /// The random component, non-zero.
    pub rand: u16,
}

impl PeerId {
    /// Generates a new peer ID from the system clock and a random component.
    pub fn random<R: Rng + ?Sized>(rng: &mut R) -> Self {
        let clock = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("system clock before unix epoch")
            .as_nanos() as u64;

        let mut rand = 0;
        while rand == 0 {
            rand = rng.gen();
        }

        PeerId { clock, rand }
    }

    /// Checks that both components are non-zero.
    pub fn validate(&self) -> Result<(), ParseError> {
        if self.clock == 0 || self.rand == 0 {
            return Err(ParseError::ZeroPeer);
        }
        Ok(())
    }

    /// The random component alone, a friendly short form for log output.
    pub fn fmt_short(&self) -> impl Display + 'static {
        PeerIdShort(self.rand)
    }
}

struct PeerIdShort(u16);

impl Display for PeerIdShort {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04X}", self.0)
    }
}

impl Display for PeerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:X}-{:04X}", self.clock, self.rand)
    }
}

impl Debug for PeerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PeerId({self})")
    }
}

impl FromStr for PeerId {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (clock, rand) = s.split_once('-').ok_or(ParseError::Malformed)?;
        let id = PeerId {
            clock: parse_clock(clock)?,
            rand: parse_rand(rand)?,
        };
        id.validate()?;
        Ok(id)
    }
}

fn parse_clock(s: &str) -> Result<u64, ParseError> {
    if s.is_empty() || s.len() > 16 || !s.bytes().all(|b| b.is_ascii_hexdigit()) {
        return Err(ParseError::InvalidClock);
    }
    u64::from_str_radix(s, 16).map_err(|_| ParseError::InvalidClock)
}

fn parse_rand(s: &str) -> Result<u16, ParseError> {
    if s.len() != 4 || !s.bytes().all(|b| b.is_ascii_hexdigit()) {
        return Err(ParseError::InvalidRand);
    }
    u16::from_str_radix(s, 16).map_err(|_| ParseError::InvalidRand)
}
