//! Feed-versus-store diff for one pass.

use std::collections::{BTreeMap, HashMap, HashSet};

use crate::models::{ListingDescriptor, ListingRecord};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ChangeKind {
    /// Not in the store yet, or only as an unfinished placeholder.
    Add,
    /// Stored, but the feed reports a newer modification time.
    Refresh,
}

#[derive(Debug, Clone)]
pub(crate) struct PendingChange {
    pub descriptor: ListingDescriptor,
    pub kind: ChangeKind,
}

#[derive(Debug, Default)]
pub(crate) struct SyncPlan {
    /// Feed order, first occurrence of each id.
    pub changes: Vec<PendingChange>,
    /// Complete open records missing from the feed, ascending by id.
    pub removed: Vec<ListingRecord>,
    /// Placeholders missing from the feed; deleted without archiving.
    pub abandoned: Vec<String>,
    pub unchanged: usize,
}

impl SyncPlan {
    /// Diff a snapshot of the open set against one feed pass.
    pub fn diff(open: Vec<ListingRecord>, descriptors: Vec<ListingDescriptor>) -> Self {
        let mut plan = SyncPlan::default();
        let stored: HashMap<&str, &ListingRecord> =
            open.iter().map(|record| (record.id.as_str(), record)).collect();
        let mut seen: HashSet<String> = HashSet::new();

        for descriptor in descriptors {
            if !seen.insert(descriptor.id.clone()) {
                continue;
            }

            let kind = match stored.get(descriptor.id.as_str()) {
                Some(record) if !record.complete => ChangeKind::Add,
                Some(record) if descriptor.last_modified > record.last_modified => {
                    ChangeKind::Refresh
                }
                Some(_) => {
                    plan.unchanged += 1;
                    continue;
                }
                None => ChangeKind::Add,
            };
            plan.changes.push(PendingChange { descriptor, kind });
        }

        let mut removed = BTreeMap::new();
        for record in open.iter().filter(|record| !seen.contains(&record.id)) {
            if record.complete {
                removed.insert(record.id.clone(), record.clone());
            } else {
                plan.abandoned.push(record.id.clone());
            }
        }
        plan.removed = removed.into_values().collect();

        plan
    }
}
