use std::collections::hash_map::{self, HashMap};

use crate::checksum::Checksum;
use crate::id::ObjectId;

/// One agent's view of the objects it already holds.
///
/// Maps each [`ObjectId`] to the last [`Checksum`] sent to that agent. Keys
/// are unique; inserting an existing key overwrites its checksum.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct AgentChecksumTable {
    entries: HashMap<ObjectId, Checksum>,
}

impl AgentChecksumTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// The checksum recorded for `object`, if any.
    pub fn get(&self, object: &ObjectId) -> Option<Checksum> {
        self.entries.get(object).copied()
    }

    /// Returns `true` if `object` is recorded with exactly `checksum`.
    pub fn matches(&self, object: &ObjectId, checksum: Checksum) -> bool {
        self.get(object) == Some(checksum)
    }

    /// Insert or overwrite an entry, returning the previous checksum.
    pub fn insert(&mut self, object: ObjectId, checksum: Checksum) -> Option<Checksum> {
        self.entries.insert(object, checksum)
    }

    /// Remove an entry, returning its checksum if it was present.
    pub fn remove(&mut self, object: &ObjectId) -> Option<Checksum> {
        self.entries.remove(object)
    }

    pub fn contains(&self, object: &ObjectId) -> bool {
        self.entries.contains_key(object)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&ObjectId, &Checksum)> {
        self.entries.iter()
    }

    /// Copy in every entry of `other` whose object is not already present.
    ///
    /// Existing entries win. Returns the number of entries taken from
    /// `other`.
    pub fn absorb_missing(&mut self, other: AgentChecksumTable) -> usize {
        let mut taken = 0;
        for (object, checksum) in other.entries {
            if let hash_map::Entry::Vacant(slot) = self.entries.entry(object) {
                slot.insert(checksum);
                taken += 1;
            }
        }
        taken
    }
}

impl FromIterator<(ObjectId, Checksum)> for AgentChecksumTable {
    fn from_iter<I: IntoIterator<Item = (ObjectId, Checksum)>>(iter: I) -> Self {
        Self {
            entries: iter.into_iter().collect(),
        }
    }
}

impl Extend<(ObjectId, Checksum)> for AgentChecksumTable {
    fn extend<I: IntoIterator<Item = (ObjectId, Checksum)>>(&mut self, iter: I) {
        self.entries.extend(iter);
    }
}

impl IntoIterator for AgentChecksumTable {
    type Item = (ObjectId, Checksum);
    type IntoIter = hash_map::IntoIter<ObjectId, Checksum>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}
