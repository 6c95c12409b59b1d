use std::fmt;

use serde::{Deserialize, Serialize};

/// Why a client asked for an object it was expected to have cached.
///
/// Carried on the wire as a single byte. The cache itself never branches on
/// it; it is passed through so callers can log or decide client-side
/// behavior.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "u8", into = "u8")]
pub enum CacheMissKind {
    /// The client has no copy of the object at all.
    Full,
    /// The client has a copy but its checksum did not match.
    Crc,
    /// Any other reason byte, preserved verbatim.
    Other(u8),
}

impl From<u8> for CacheMissKind {
    fn from(code: u8) -> Self {
        match code {
            0 => Self::Full,
            1 => Self::Crc,
            other => Self::Other(other),
        }
    }
}

impl From<CacheMissKind> for u8 {
    fn from(kind: CacheMissKind) -> Self {
        match kind {
            CacheMissKind::Full => 0,
            CacheMissKind::Crc => 1,
            CacheMissKind::Other(code) => code,
        }
    }
}

impl fmt::Display for CacheMissKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Full => f.write_str("full"),
            Self::Crc => f.write_str("crc"),
            Self::Other(code) => write!(f, "other({code})"),
        }
    }
}
