//! Diff between a target record set and the sink's current snapshot.
//!
//! Records are matched by identity hash and compared by content hash, so
//! a second run over an unchanged snapshot plans no writes. Documents the
//! sink holds under any other ID are deleted; their record, if still in
//! the target set, is rewritten under its identity hash.

use std::collections::{BTreeMap, HashSet};

use sla_types::IndexedTicket;
use tracing::debug;

use crate::error::IndexingError;
use crate::sink::SinkDocument;

/// Writes needed to make the sink match the target set.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct ReconcilePlan {
    /// Records absent from the sink or whose content differs
    pub to_upsert: Vec<IndexedTicket>,
    /// Sink IDs not backed by a target record under its identity hash
    pub to_delete: Vec<String>,
    /// Target records already present with identical content
    pub unchanged: usize,
}

impl ReconcilePlan {
    /// True when the sink already matches the target set.
    pub fn is_empty(&self) -> bool {
        self.to_upsert.is_empty() && self.to_delete.is_empty()
    }
}

/// Compute the upserts and deletes that turn `current` into `target`.
///
/// Pure with respect to the sink. If `target` holds several records with
/// the same identity the first one wins.
pub fn reconcile(
    target: &[IndexedTicket],
    current: &[SinkDocument],
) -> Result<ReconcilePlan, IndexingError> {
    let mut remaining: BTreeMap<&str, String> = BTreeMap::new();
    let mut stale: Vec<&str> = Vec::new();
    for doc in current {
        if doc.is_canonical() {
            remaining.insert(doc.doc_id.as_str(), doc.record.content_hash()?);
        } else {
            debug!(doc_id = %doc.doc_id, reference = %doc.record.reference, "Sink document under non-canonical id");
            stale.push(doc.doc_id.as_str());
        }
    }

    let mut plan = ReconcilePlan::default();
    let mut seen = HashSet::with_capacity(target.len());

    for record in target {
        let doc_id = record.identity_hash();
        if !seen.insert(doc_id.clone()) {
            debug!(doc_id = %doc_id, reference = %record.reference, "Duplicate target record ignored");
            continue;
        }
        match remaining.remove(doc_id.as_str()) {
            Some(existing) if existing == record.content_hash()? => plan.unchanged += 1,
            _ => plan.to_upsert.push(record.clone()),
        }
    }

    // A stale ID that is some target record's identity is overwritten by its upsert.
    plan.to_delete = stale
        .into_iter()
        .filter(|doc_id| !seen.contains(*doc_id))
        .chain(remaining.into_keys())
        .map(str::to_string)
        .collect();
    Ok(plan)
}

#[cfg(test)]
mod tests {
    use super::*;
    use sla_types::ComplianceVerdict;

    fn record(id: &str, title: &str) -> IndexedTicket {
        IndexedTicket {
            id: id.to_string(),
            reference: format!("R-{id}"),
            class: "UserRequest".to_string(),
            title: title.to_string(),
            ..Default::default()
        }
    }

    fn stored(records: &[IndexedTicket]) -> Vec<SinkDocument> {
        records.iter().cloned().map(SinkDocument::canonical).collect()
    }

    #[test]
    fn test_identical_sets_plan_nothing() {
        let set = vec![record("1", "a"), record("2", "b")];
        let plan = reconcile(&set, &stored(&set)).unwrap();
        assert!(plan.is_empty());
        assert_eq!(plan.unchanged, 2);
    }

    #[test]
    fn test_empty_sink_upserts_everything() {
        let target = vec![record("1", "a"), record("2", "b")];
        let plan = reconcile(&target, &[]).unwrap();
        assert_eq!(plan.to_upsert, target);
        assert!(plan.to_delete.is_empty());
    }

    #[test]
    fn test_empty_target_deletes_everything() {
        let current = vec![record("1", "a")];
        let plan = reconcile(&[], &stored(&current)).unwrap();
        assert!(plan.to_upsert.is_empty());
        assert_eq!(plan.to_delete, vec![current[0].identity_hash()]);
    }

    #[test]
    fn test_changed_content_is_upserted() {
        let current = vec![record("1", "a"), record("2", "b")];
        let mut changed = record("2", "b");
        changed.sla_compliance_resolve_raw = ComplianceVerdict::Overdue;
        let target = vec![record("1", "a"), changed.clone()];

        let plan = reconcile(&target, &stored(&current)).unwrap();
        assert_eq!(plan.to_upsert, vec![changed]);
        assert!(plan.to_delete.is_empty());
        assert_eq!(plan.unchanged, 1);
    }

    #[test]
    fn test_mixed_plan_is_complete_and_disjoint() {
        let current = vec![record("1", "a"), record("2", "b"), record("3", "c")];
        let target = vec![record("2", "b"), record("3", "changed"), record("4", "d")];

        let plan = reconcile(&target, &stored(&current)).unwrap();

        let upserted: HashSet<String> = plan.to_upsert.iter().map(|r| r.identity_hash()).collect();
        let deleted: HashSet<String> = plan.to_delete.iter().cloned().collect();
        assert!(upserted.is_disjoint(&deleted));
        assert_eq!(deleted, HashSet::from([record("1", "a").identity_hash()]));
        assert_eq!(upserted.len(), 2);
        assert_eq!(plan.unchanged, 1);
        assert_eq!(plan.unchanged + plan.to_upsert.len(), target.len());
    }

    #[test]
    fn test_duplicate_target_first_wins() {
        let target = vec![record("1", "first"), record("1", "second")];
        let plan = reconcile(&target, &[]).unwrap();
        assert_eq!(plan.to_upsert.len(), 1);
        assert_eq!(plan.to_upsert[0].title, "first");
    }

    #[test]
    fn test_class_is_part_of_identity() {
        let incident = IndexedTicket {
            class: "Incident".to_string(),
            ..record("1", "a")
        };
        let request = record("1", "a");
        let plan = reconcile(&[incident.clone()], &stored(&[request.clone()])).unwrap();
        assert_eq!(plan.to_upsert, vec![incident]);
        assert_eq!(plan.to_delete, vec![request.identity_hash()]);
    }

    #[test]
    fn test_non_canonical_id_is_replaced() {
        let legacy = SinkDocument::new("d0a4a9e1legacysha1id", record("1", "a"));
        let current = vec![legacy, SinkDocument::canonical(record("2", "b"))];
        let target = vec![record("1", "a"), record("2", "b")];

        let plan = reconcile(&target, &current).unwrap();

        assert_eq!(plan.to_upsert, vec![record("1", "a")]);
        assert_eq!(plan.to_delete, vec!["d0a4a9e1legacysha1id".to_string()]);
        assert_eq!(plan.unchanged, 1);
    }

    #[test]
    fn test_non_canonical_id_is_deleted_when_ticket_is_gone() {
        let current = vec![SinkDocument::new("d0a4a9e1legacysha1id", record("1", "a"))];
        let plan = reconcile(&[], &current).unwrap();
        assert!(plan.to_upsert.is_empty());
        assert_eq!(plan.to_delete, vec!["d0a4a9e1legacysha1id".to_string()]);
    }

    #[test]
    fn test_two_documents_for_one_identity_collapse_to_one() {
        let current = vec![
            SinkDocument::canonical(record("1", "a")),
            SinkDocument::new("d0a4a9e1legacysha1id", record("1", "old")),
        ];
        let target = vec![record("1", "a")];

        let plan = reconcile(&target, &current).unwrap();

        assert!(plan.to_upsert.is_empty());
        assert_eq!(plan.unchanged, 1);
        assert_eq!(plan.to_delete, vec!["d0a4a9e1legacysha1id".to_string()]);
    }

    #[test]
    fn test_document_under_another_records_id_is_overwritten() {
        // Ticket 1's content stored at ticket 2's address.
        let misplaced = SinkDocument::new(record("2", "b").identity_hash(), record("1", "a"));
        let target = vec![record("1", "a"), record("2", "b")];

        let plan = reconcile(&target, &[misplaced]).unwrap();

        assert_eq!(plan.to_upsert, target);
        assert!(plan.to_delete.is_empty());
    }

    #[test]
    fn test_plan_with_stored_id_mismatches_is_complete_and_disjoint() {
        let current = vec![
            SinkDocument::canonical(record("1", "a")),
            SinkDocument::new("legacy-1", record("1", "a")),
            SinkDocument::new("legacy-2", record("2", "b")),
            SinkDocument::new(record("4", "d").identity_hash(), record("3", "c")),
        ];
        let target = vec![record("1", "a"), record("3", "c"), record("4", "d")];

        let plan = reconcile(&target, &current).unwrap();

        let upserted: HashSet<String> = plan.to_upsert.iter().map(|r| r.identity_hash()).collect();
        let deleted: HashSet<String> = plan.to_delete.iter().cloned().collect();
        assert!(upserted.is_disjoint(&deleted));
        assert_eq!(
            deleted,
            HashSet::from(["legacy-1".to_string(), "legacy-2".to_string()])
        );
        assert_eq!(
            upserted,
            HashSet::from([record("3", "c").identity_hash(), record("4", "d").identity_hash()])
        );
        assert_eq!(plan.unchanged + plan.to_upsert.len(), target.len());
    }
}
