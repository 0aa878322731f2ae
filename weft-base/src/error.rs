use serde::{Deserialize, Serialize};

/// Error produced when parsing or validating an identifier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, thiserror::Error)]
pub enum ParseError {
    /// The string does not have the `CLOCK-RAND[.SEQ][@REV][#SEQ]` shape.
    #[error("malformed identifier")]
    Malformed,
    /// The clock component is empty, non-hex, or longer than 16 hex digits.
    #[error("peer clock component must be 1-16 hex digits")]
    InvalidClock,
    /// The random component is not exactly 4 hex digits.
    #[error("peer random component must be exactly 4 hex digits")]
    InvalidRand,
    /// The clock or random component is zero.
    #[error("peer ID components must be non-zero")]
    ZeroPeer,
    /// The session sequence is empty, non-numeric, or overflows 32 bits.
    #[error("invalid session sequence")]
    InvalidSeq,
    /// The session sequence is zero, which is reserved.
    #[error("session sequence must be non-zero")]
    ZeroSeq,
    /// The revision component is empty, non-numeric, or overflows 64 bits.
    #[error("invalid revision number")]
    InvalidRev,
    /// The message sequence is empty, non-numeric, or overflows 32 bits.
    #[error("invalid message sequence")]
    InvalidMessageSeq,
}
