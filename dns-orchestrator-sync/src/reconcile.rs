//! Diff planning for the three reconciliation modes.
//!
//! Planning is pure: it turns the previous and desired state of one zone into
//! a list of [`Change`]s without touching the network. The provider dispatches
//! them afterwards.

use std::collections::BTreeSet;
use std::time::Duration;

use crate::error::OperationKind;
use crate::rrset::merge_ttl;
use crate::types::{Record, RecordSet, RecordSets};

/// One create/update/delete call and the records it reports when it succeeds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Change {
    /// Which call to issue.
    pub kind: OperationKind,
    /// State to send. For deletes, the set being removed.
    pub set: RecordSet,
    /// Records reported to the caller on success.
    ///
    /// For creates this is the planned state; the provider replaces it with
    /// the set returned by the service.
    pub applied: Vec<Record>,
}

impl Change {
    fn create(set: &RecordSet) -> Self {
        let set = RecordSet {
            ttl: merge_ttl([set.ttl]),
            ..set.clone()
        };
        Self {
            kind: OperationKind::Create,
            applied: set.to_records(),
            set,
        }
    }

    fn update(set: RecordSet, applied: Vec<Record>) -> Self {
        Self {
            kind: OperationKind::Update,
            set,
            applied,
        }
    }

    fn delete(set: RecordSet, applied: Vec<Record>) -> Self {
        Self {
            kind: OperationKind::Delete,
            set,
            applied,
        }
    }
}

/// Creates for every desired key missing from `previous`.
fn plan_creates(previous: &RecordSets, desired: &RecordSets) -> Vec<Change> {
    desired
        .iter()
        .filter(|(key, set)| !previous.contains_key(*key) && set.has_values())
        .map(|(_, set)| Change::create(set))
        .collect()
}

/// Desired TTL, or the previous one when the caller left it unspecified.
fn ttl_or(want: &RecordSet, prev: &RecordSet) -> Duration {
    if want.ttl.is_zero() {
        prev.ttl
    } else {
        want.ttl
    }
}

/// Replace semantics: make the enabled values of the zone equal `desired`.
///
/// Sets missing from `desired` are deleted, or soft-cleared when they still
/// hold disabled values. Sets present in both take the desired enabled values
/// and TTL; values they enable are dropped from the disabled set.
pub fn plan_replace(previous: &RecordSets, desired: &RecordSets) -> Vec<Change> {
    let mut changes = plan_creates(previous, desired);

    for (key, prev) in previous {
        match desired.get(key) {
            None if prev.enabled.is_empty() => {}
            None if prev.disabled.is_empty() => {
                changes.push(Change::delete(prev.clone(), Vec::new()));
            }
            None => {
                let mut next = prev.clone();
                next.enabled.clear();
                changes.push(Change::update(next, Vec::new()));
            }
            Some(want) if prev.enabled != want.enabled || prev.ttl != ttl_or(want, prev) => {
                let mut next = prev.clone();
                next.enabled.clone_from(&want.enabled);
                next.disabled = &prev.disabled - &want.enabled;
                next.ttl = ttl_or(want, prev);
                let applied = next.to_records();
                changes.push(Change::update(next, applied));
            }
            Some(_) => {}
        }
    }

    changes
}

/// Append semantics: add desired values, never remove anything.
///
/// Disabled values that reappear are re-enabled rather than re-created. The
/// TTL of an existing set becomes the merge of the old and requested TTLs.
/// Only newly enabled values are reported.
pub fn plan_append(previous: &RecordSets, desired: &RecordSets) -> Vec<Change> {
    let mut changes = plan_creates(previous, desired);

    for (key, want) in desired {
        let Some(prev) = previous.get(key) else {
            continue;
        };

        let mut next = prev.clone();
        next.ttl = merge_ttl([prev.ttl, want.ttl]);

        let added: Vec<&String> = want
            .enabled
            .iter()
            .filter(|value| next.enable((*value).clone()))
            .collect();

        if added.is_empty() && next.ttl == prev.ttl {
            continue;
        }

        let applied = next.records_with(added, next.ttl);
        changes.push(Change::update(next, applied));
    }

    changes
}

/// Whether a deletion request targets the set with `name` and `record_type`.
///
/// An empty request type matches every type under the same name.
fn matches_request(request: &Record, set: &RecordSet) -> bool {
    request.name == set.key.name
        && (request.record_type.is_empty() || request.record_type == set.key.record_type)
}

/// Delete semantics: take the requested values out of the enabled set.
///
/// A request with an empty value removes every enabled value of the matched
/// sets. Disabled values are never touched, so a set that keeps some is
/// updated instead of deleted. Removed records are reported with the set TTL.
pub fn plan_delete(previous: &RecordSets, requests: &[Record]) -> Vec<Change> {
    let mut changes = Vec::new();

    for prev in previous.values() {
        let mut next = prev.clone();
        let mut removed = BTreeSet::new();

        for request in requests.iter().filter(|r| matches_request(r, prev)) {
            if request.data.is_empty() {
                removed.append(&mut next.enabled);
            } else if next.enabled.remove(&request.data) {
                removed.insert(request.data.clone());
            }
        }

        if removed.is_empty() {
            continue;
        }

        let applied = prev.records_with(&removed, prev.ttl);
        if next.has_values() {
            changes.push(Change::update(next, applied));
        } else {
            changes.push(Change::delete(next, applied));
        }
    }

    changes
}
