//! Per-entity mention bookkeeping for card generation.

use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::detect::{Mention, MentionSource, fold_name};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntityRecord {
    pub mentions: u32,
    pub first_chapter: u32,
    pub last_chapter: u32,
    pub card_created: bool,
}

impl EntityRecord {
    fn new(chapter: u32) -> Self {
        Self {
            mentions: 0,
            first_chapter: chapter,
            last_chapter: chapter,
            card_created: false,
        }
    }

    /// Fold a record stored under another spelling of the same name into this one.
    fn absorb(&mut self, other: EntityRecord) {
        self.mentions = self.mentions.saturating_add(other.mentions);
        self.first_chapter = self.first_chapter.min(other.first_chapter);
        self.last_chapter = self.last_chapter.max(other.last_chapter);
        self.card_created |= other.card_created;
    }
}

/// Mention records keyed by entity name. Names are compared case-insensitively
/// (Unicode lowercase); the first spelling seen is kept as the key.
///
/// Serialized as a plain `{name: record}` map.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(
    from = "BTreeMap<String, EntityRecord>",
    into = "BTreeMap<String, EntityRecord>"
)]
pub struct EntityTracker {
    records: BTreeMap<String, EntityRecord>,
    /// Folded name to the spelling used in `records`.
    index: HashMap<String, String>,
}

impl From<BTreeMap<String, EntityRecord>> for EntityTracker {
    fn from(map: BTreeMap<String, EntityRecord>) -> Self {
        let mut tracker = Self::default();
        for (name, record) in map {
            match tracker.index.get(&fold_name(&name)) {
                Some(key) => {
                    if let Some(existing) = tracker.records.get_mut(key) {
                        existing.absorb(record);
                    }
                }
                None => {
                    tracker.index.insert(fold_name(&name), name.clone());
                    tracker.records.insert(name, record);
                }
            }
        }
        tracker
    }
}

impl From<EntityTracker> for BTreeMap<String, EntityRecord> {
    fn from(tracker: EntityTracker) -> Self {
        tracker.records
    }
}

impl EntityTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// The stored spelling for `name`, inserting `name` as the spelling if new.
    fn key_or_insert(&mut self, name: &str) -> String {
        self.index
            .entry(fold_name(name))
            .or_insert_with(|| name.to_string())
            .clone()
    }

    /// Add one mention to the record for `name`, creating it in `chapter`.
    fn mention(&mut self, name: &str, chapter: u32) -> &mut EntityRecord {
        let key = self.key_or_insert(name);
        let record = self
            .records
            .entry(key)
            .or_insert_with(|| EntityRecord::new(chapter));
        record.mentions = record.mentions.saturating_add(1);
        record.last_chapter = chapter;
        record
    }

    /// Count one mention of `name` in `chapter`.
    ///
    /// Returns true exactly once per entity: on the mention that brings the
    /// count to `threshold`, which is also when `card_created` flips.
    pub fn observe(&mut self, name: &str, chapter: u32, threshold: u32) -> bool {
        let record = self.mention(name, chapter);
        if !record.card_created && record.mentions >= threshold.max(1) {
            record.card_created = true;
            return true;
        }
        false
    }

    /// Count a mention of an entity that already has a file. Its file is its
    /// card, so it is marked created and never reported as due.
    pub fn observe_filed(&mut self, name: &str, chapter: u32) {
        self.mention(name, chapter).card_created = true;
    }

    /// Count every mention from one message. Returns the names whose card just
    /// became due; only names without an entity file can become due.
    pub fn observe_all(&mut self, mentions: &[Mention], chapter: u32, threshold: u32) -> Vec<String> {
        let mut due = Vec::new();
        for mention in mentions {
            match mention.source {
                MentionSource::Trigger => self.observe_filed(&mention.name, chapter),
                MentionSource::Capitalized => {
                    if self.observe(&mention.name, chapter, threshold) {
                        info!(entity = %mention.name, "entity_card_due");
                        due.push(self.key_or_insert(&mention.name));
                    }
                }
            }
        }
        due
    }

    pub fn get(&self, name: &str) -> Option<&EntityRecord> {
        self.index
            .get(&fold_name(name))
            .and_then(|key| self.records.get(key))
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &EntityRecord)> {
        self.records.iter()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}
