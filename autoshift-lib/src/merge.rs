//! Merging freshly scraped records into the persisted set.

use std::collections::HashMap;

use autoshift_core::{RecordKey, RewardType, ShiftCodeRecord};

/// What a merge did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MergeStats {
    /// Keys seen for the first time.
    pub added: usize,
    /// Existing records whose fields changed.
    pub updated: usize,
    /// Duplicate keys already present in the existing set, folded into
    /// their first occurrence.
    pub collapsed: usize,
}

impl MergeStats {
    pub fn changed(&self) -> bool {
        self.added + self.updated + self.collapsed > 0
    }
}

/// Merge `incoming` into `existing`, keyed on (code, game).
///
/// Existing order is preserved and new keys are appended in observation
/// order. Records only present in `existing` are kept unchanged.
pub fn merge(
    existing: Vec<ShiftCodeRecord>,
    incoming: Vec<ShiftCodeRecord>,
) -> (Vec<ShiftCodeRecord>, MergeStats) {
    let mut stats = MergeStats::default();
    let mut merged: Vec<ShiftCodeRecord> = Vec::with_capacity(existing.len() + incoming.len());
    let mut index: HashMap<RecordKey, usize> = HashMap::new();

    for record in existing {
        match index.get(&record.key()) {
            Some(&i) => {
                merge_fields(&mut merged[i], &record);
                stats.collapsed += 1;
            }
            None => {
                index.insert(record.key(), merged.len());
                merged.push(record);
            }
        }
    }

    for record in incoming {
        match index.get(&record.key()) {
            Some(&i) => {
                if merge_fields(&mut merged[i], &record) {
                    stats.updated += 1;
                }
            }
            None => {
                index.insert(record.key(), merged.len());
                merged.push(record);
                stats.added += 1;
            }
        }
    }

    (merged, stats)
}

/// Field-level policy for two records with the same key. Returns whether
/// `target` changed.
fn merge_fields(target: &mut ShiftCodeRecord, newer: &ShiftCodeRecord) -> bool {
    let before = target.clone();

    if !newer.reward.is_empty() && newer.reward != target.reward {
        target.reward = newer.reward.clone();
        target.reward_type = RewardType::classify(&target.reward);
    }
    if newer.archived.is_some() {
        target.archived = newer.archived;
    }
    if newer.expires.is_known() && newer.expires != target.expires {
        target.expires = newer.expires.clone();
    }
    target.expired |= newer.expired;
    if target.source.is_empty() {
        target.source = newer.source.clone();
    }
    if !newer.permalink.is_empty() {
        target.permalink = newer.permalink.clone();
    }

    *target != before
}
