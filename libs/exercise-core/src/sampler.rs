//! Random sampling and ordering of choice sets.

use rand::seq::SliceRandom;
use rand::Rng;
use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};

use crate::error::{ExerciseError, Result};
use crate::exercise::{ChoiceSource, TermId};

/// Choices in presentation order.
///
/// Serializes as a JSON object whose key order is the insertion order, so a
/// shuffled map is observed shuffled by the client.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChoiceMap {
    entries: Vec<(TermId, String)>,
}

impl ChoiceMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a choice, replacing the display value if the id is present.
    pub fn insert(&mut self, id: TermId, value: impl Into<String>) {
        let value = value.into();
        match self.entries.iter_mut().find(|(existing, _)| *existing == id) {
            Some(entry) => entry.1 = value,
            None => self.entries.push((id, value)),
        }
    }

    pub fn extend(&mut self, other: ChoiceMap) {
        for (id, value) in other.entries {
            self.insert(id, value);
        }
    }

    pub fn get(&self, id: TermId) -> Option<&str> {
        self.entries
            .iter()
            .find(|(existing, _)| *existing == id)
            .map(|(_, value)| value.as_str())
    }

    pub fn contains_key(&self, id: TermId) -> bool {
        self.get(id).is_some()
    }

    pub fn keys(&self) -> impl Iterator<Item = TermId> + '_ {
        self.entries.iter().map(|(id, _)| *id)
    }

    pub fn iter(&self) -> impl Iterator<Item = (TermId, &str)> {
        self.entries.iter().map(|(id, value)| (*id, value.as_str()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl FromIterator<(TermId, String)> for ChoiceMap {
    fn from_iter<I: IntoIterator<Item = (TermId, String)>>(iter: I) -> Self {
        let mut map = ChoiceMap::new();
        for (id, value) in iter {
            map.insert(id, value);
        }
        map
    }
}

impl Serialize for ChoiceMap {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (id, value) in &self.entries {
            map.serialize_entry(id, value)?;
        }
        map.end()
    }
}

/// Pick `n` entries of `source` uniformly at random without replacement.
pub fn sample_choices<R: Rng + ?Sized>(
    source: &ChoiceSource,
    n: usize,
    rng: &mut R,
) -> Result<ChoiceMap> {
    if n > source.len() {
        return Err(ExerciseError::InsufficientChoices {
            requested: n,
            available: source.len(),
        });
    }

    let entries: Vec<(&TermId, &String)> = source.iter().collect();
    Ok(entries
        .choose_multiple(rng, n)
        .map(|(id, value)| (**id, (*value).clone()))
        .collect())
}

/// Same pairs, random order.
pub fn shuffle_map<R: Rng + ?Sized>(map: ChoiceMap, rng: &mut R) -> ChoiceMap {
    let mut entries = map.entries;
    entries.shuffle(rng);
    ChoiceMap { entries }
}
