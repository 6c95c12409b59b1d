//! Naming of durable records.
//!
//! A record is identified by the pair `(agent, region)` and stored under the
//! file name
//!
//! ```text
//! {agent}.{escaped region}.oc
//! ```
//!
//! where `agent` is the fixed-width canonical UUID and the region name is
//! escaped byte-wise: ASCII alphanumerics, `-` and `_` pass through, every
//! other byte (including `.`, `%`, `/` and spaces) becomes `%XX` with
//! uppercase hex. The escape is injective and never produces a path
//! separator, so distinct pairs always map to distinct, flat file names.

use std::fmt;

use objcache_types::AgentId;

use crate::error::{PersistError, PersistResult};

/// File extension of a durable record.
pub const RECORD_EXTENSION: &str = "oc";

/// The collision-free name of one `(agent, region)` record.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RecordKey {
    agent: AgentId,
    region: String,
}

impl RecordKey {
    /// Build the key for `agent` in `region`.
    ///
    /// The region name must be non-empty.
    pub fn new(agent: AgentId, region: &str) -> PersistResult<Self> {
        if region.is_empty() {
            return Err(PersistError::InvalidRegion {
                region: region.to_string(),
                reason: "region name must not be empty".into(),
            });
        }
        Ok(Self {
            agent,
            region: region.to_string(),
        })
    }

    pub fn agent(&self) -> AgentId {
        self.agent
    }

    pub fn region(&self) -> &str {
        &self.region
    }

    /// The flat file name this record is stored under.
    pub fn file_name(&self) -> String {
        format!(
            "{}.{}.{}",
            self.agent,
            escape_region(&self.region),
            RECORD_EXTENSION
        )
    }

    /// Recover a key from a file name produced by [`RecordKey::file_name`].
    ///
    /// Returns `None` for anything else, including non-canonical spellings
    /// of a valid key.
    pub fn parse(file_name: &str) -> Option<Self> {
        let stem = file_name
            .strip_suffix(RECORD_EXTENSION)?
            .strip_suffix('.')?;
        let (agent_part, escaped) = stem.split_once('.')?;

        let agent = AgentId::parse(agent_part).ok()?;
        if agent.to_string() != agent_part {
            return None;
        }

        let region = unescape_region(escaped)?;
        if region.is_empty() || escape_region(&region) != escaped {
            return None;
        }
        Some(Self { agent, region })
    }
}

impl fmt::Display for RecordKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.file_name())
    }
}

fn is_plain(byte: u8) -> bool {
    byte.is_ascii_alphanumeric() || byte == b'-' || byte == b'_'
}

fn escape_region(region: &str) -> String {
    let mut out = String::with_capacity(region.len());
    for &byte in region.as_bytes() {
        if is_plain(byte) {
            out.push(char::from(byte));
        } else {
            out.push_str(&format!("%{byte:02X}"));
        }
    }
    out
}

fn unescape_region(escaped: &str) -> Option<String> {
    let bytes = escaped.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        match bytes[i] {
            b'%' => {
                let hex = escaped.get(i + 1..i + 3)?;
                out.push(u8::from_str_radix(hex, 16).ok()?);
                i += 3;
            }
            byte if is_plain(byte) => {
                out.push(byte);
                i += 1;
            }
            _ => return None,
        }
    }
    String::from_utf8(out).ok()
}
