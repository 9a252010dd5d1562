//! Shared result cache keyed by normalized question and filters.
//!
//! Read-mostly shared state: many sessions read concurrently; the only
//! write is invalidation when new ingestion touches a document. Entries are
//! handed out as `Arc` snapshots, so a reader holding an entry keeps a
//! consistent view even if the entry is invalidated underneath it — readers
//! never observe a half-invalidated entry.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, RwLock};

use sha2::{Digest, Sha256};
use tracing::debug;
use uuid::Uuid;

use citeline_core::{EvidenceItem, QueryFilters};

/// One cached fusion result.
#[derive(Debug)]
pub struct CachedEntry {
    pub evidence: Vec<EvidenceItem>,
    /// Documents contributing evidence to this entry.
    evidence_documents: HashSet<Uuid>,
    /// Document scope of the query filter, if scoped.
    scope_documents: Option<HashSet<Uuid>>,
}

impl CachedEntry {
    fn touches_document(&self, document_id: Uuid) -> bool {
        if self.evidence_documents.contains(&document_id) {
            return true;
        }
        match &self.scope_documents {
            // Scoped entry: affected only if the document is in scope.
            Some(scope) => scope.contains(&document_id),
            // Unscoped entry: any new ingestion could change its answer.
            None => true,
        }
    }
}

/// Cache key: SHA-256 over normalized question text plus sorted filter ids.
fn cache_key(question: &str, filters: &QueryFilters) -> String {
    let normalized = question.split_whitespace().collect::<Vec<_>>().join(" ").to_lowercase();

    let mut hasher = Sha256::new();
    hasher.update(normalized.as_bytes());
    hasher.update([0u8]);
    if let Some(ids) = &filters.document_ids {
        let mut sorted = ids.clone();
        sorted.sort();
        for id in sorted {
            hasher.update(id.as_bytes());
        }
    }
    hasher.update([0u8]);
    if let Some(ws) = filters.workspace_id {
        hasher.update(ws.as_bytes());
    }
    format!("{:x}", hasher.finalize())
}

/// Question-hash → evidence list cache with per-document invalidation.
#[derive(Default)]
pub struct ResultCache {
    inner: RwLock<HashMap<String, Arc<CachedEntry>>>,
}

impl ResultCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Look up a cached evidence list for this question and filter set.
    pub fn get(&self, question: &str, filters: &QueryFilters) -> Option<Arc<CachedEntry>> {
        let key = cache_key(question, filters);
        let guard = self.inner.read().unwrap_or_else(|e| e.into_inner());
        guard.get(&key).cloned()
    }

    /// Store a fusion result.
    pub fn insert(&self, question: &str, filters: &QueryFilters, evidence: Vec<EvidenceItem>) {
        let key = cache_key(question, filters);
        let entry = Arc::new(CachedEntry {
            evidence_documents: evidence.iter().map(|e| e.document_id).collect(),
            scope_documents: filters
                .document_ids
                .as_ref()
                .map(|ids| ids.iter().copied().collect()),
            evidence,
        });
        let mut guard = self.inner.write().unwrap_or_else(|e| e.into_inner());
        guard.insert(key, entry);
    }

    /// Drop every entry whose evidence or filter scope touches the given
    /// document. Called on (re-)ingestion; the only write to shared state.
    pub fn invalidate_document(&self, document_id: Uuid) {
        let mut guard = self.inner.write().unwrap_or_else(|e| e.into_inner());
        let before = guard.len();
        guard.retain(|_, entry| !entry.touches_document(document_id));
        debug!(
            document_id = %document_id,
            invalidated = before - guard.len(),
            remaining = guard.len(),
            "cache invalidation"
        );
    }

    /// Number of live entries.
    pub fn len(&self) -> usize {
        self.inner.read().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use citeline_core::{RetrievalMethod, Section};

    fn evidence(document_id: Uuid) -> Vec<EvidenceItem> {
        vec![EvidenceItem {
            chunk_id: Uuid::new_v4(),
            document_id,
            section: Section::Results,
            fused_score: 0.8,
            methods: vec![RetrievalMethod::Lexical],
            snippet: "snippet".to_string(),
            matched_columns: Vec::new(),
        }]
    }

    #[test]
    fn miss_then_hit() {
        let cache = ResultCache::new();
        let filters = QueryFilters::default();
        assert!(cache.get("q", &filters).is_none());
        cache.insert("q", &filters, evidence(Uuid::new_v4()));
        assert!(cache.get("q", &filters).is_some());
    }

    #[test]
    fn key_normalizes_whitespace_and_case() {
        let cache = ResultCache::new();
        let filters = QueryFilters::default();
        cache.insert("What is  the AUROC?", &filters, evidence(Uuid::new_v4()));
        assert!(cache.get("what is the auroc?", &filters).is_some());
    }

    #[test]
    fn different_filters_are_different_keys() {
        let cache = ResultCache::new();
        let doc = Uuid::new_v4();
        cache.insert("q", &QueryFilters::default(), evidence(doc));
        let scoped = QueryFilters {
            document_ids: Some(vec![doc]),
            workspace_id: None,
        };
        assert!(cache.get("q", &scoped).is_none());
    }

    #[test]
    fn document_order_in_filter_does_not_matter() {
        let cache = ResultCache::new();
        let a = Uuid::from_u128(1);
        let b = Uuid::from_u128(2);
        let forward = QueryFilters {
            document_ids: Some(vec![a, b]),
            workspace_id: None,
        };
        let reverse = QueryFilters {
            document_ids: Some(vec![b, a]),
            workspace_id: None,
        };
        cache.insert("q", &forward, evidence(a));
        assert!(cache.get("q", &reverse).is_some());
    }

    #[test]
    fn invalidation_removes_entries_citing_document() {
        let cache = ResultCache::new();
        let doc = Uuid::new_v4();
        let scoped = QueryFilters {
            document_ids: Some(vec![doc]),
            workspace_id: None,
        };
        cache.insert("q", &scoped, evidence(doc));
        cache.invalidate_document(doc);
        assert!(cache.get("q", &scoped).is_none());
    }

    #[test]
    fn invalidation_spares_unrelated_scoped_entries() {
        let cache = ResultCache::new();
        let doc_a = Uuid::new_v4();
        let doc_b = Uuid::new_v4();
        let scoped_a = QueryFilters {
            document_ids: Some(vec![doc_a]),
            workspace_id: None,
        };
        cache.insert("q", &scoped_a, evidence(doc_a));
        cache.invalidate_document(doc_b);
        assert!(cache.get("q", &scoped_a).is_some());
    }

    #[test]
    fn unscoped_entries_invalidated_by_any_ingestion() {
        let cache = ResultCache::new();
        cache.insert("q", &QueryFilters::default(), evidence(Uuid::new_v4()));
        cache.invalidate_document(Uuid::new_v4());
        assert!(cache.get("q", &QueryFilters::default()).is_none());
    }

    #[test]
    fn reader_snapshot_survives_invalidation() {
        let cache = ResultCache::new();
        let doc = Uuid::new_v4();
        cache.insert("q", &QueryFilters::default(), evidence(doc));
        let snapshot = cache.get("q", &QueryFilters::default()).unwrap();
        cache.invalidate_document(doc);
        // The held Arc still provides a full, consistent entry.
        assert_eq!(snapshot.evidence.len(), 1);
        assert!(cache.is_empty());
    }
}
