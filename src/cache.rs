//! Derived-listing cache: root-term listings per vocabulary and sub-term
//! listings per parent.
//!
//! Entries populate lazily. Invalidation is driven synchronously by committed
//! change events and always wins over a population that was in flight when it
//! happened: every invalidation bumps a global epoch, and a computed listing
//! is only stored if the epoch it was computed under is still current.

use std::hash::Hash;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;

use crate::context::{ContextId, Iri};
use crate::events::{ChangeEvent, ChangeKind, ChangeListener};
use crate::model::{EntityKind, TermInfo, TermNode};

/// Key of a root listing. Listings of different workspaces, languages and
/// import modes never share an entry.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RootsKey {
    pub vocabulary: Iri,
    pub context: ContextId,
    pub workspace: u64,
    pub include_imports: bool,
    pub language: String,
}

/// Key of a sub-term listing.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SubTermsKey {
    pub parent: Iri,
    pub workspace: u64,
    pub language: String,
}

/// Counters for diagnostics.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub roots: usize,
    pub sub_terms: usize,
    pub hits: u64,
    pub misses: u64,
    pub epoch: u64,
}

impl std::fmt::Display for CacheStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} root listings, {} sub-term listings, {} hits, {} misses",
            self.roots, self.sub_terms, self.hits, self.misses
        )
    }
}

/// Process-wide listing cache.
#[derive(Debug, Default)]
pub struct ListingCache {
    roots: DashMap<RootsKey, Arc<Vec<TermNode>>>,
    sub_terms: DashMap<SubTermsKey, Arc<Vec<TermInfo>>>,
    epoch: AtomicU64,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl ListingCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Root listing for `key`, computing it with `compute` on a miss.
    pub fn roots<E>(
        &self,
        key: RootsKey,
        compute: impl FnOnce() -> Result<Vec<TermNode>, E>,
    ) -> Result<Arc<Vec<TermNode>>, E> {
        self.get_or_populate(&self.roots, key, compute)
    }

    /// Sub-term listing for `key`, computing it with `compute` on a miss.
    pub fn sub_terms<E>(
        &self,
        key: SubTermsKey,
        compute: impl FnOnce() -> Result<Vec<TermInfo>, E>,
    ) -> Result<Arc<Vec<TermInfo>>, E> {
        self.get_or_populate(&self.sub_terms, key, compute)
    }

    fn get_or_populate<K, V, E>(
        &self,
        map: &DashMap<K, Arc<V>>,
        key: K,
        compute: impl FnOnce() -> Result<V, E>,
    ) -> Result<Arc<V>, E>
    where
        K: Eq + Hash + std::fmt::Debug,
    {
        if let Some(hit) = map.get(&key) {
            self.hits.fetch_add(1, Ordering::Relaxed);
            tracing::debug!(?key, "listing cache hit");
            return Ok(Arc::clone(hit.value()));
        }
        self.misses.fetch_add(1, Ordering::Relaxed);

        // Compute without holding a shard lock; the store may be slow.
        let epoch = self.epoch.load(Ordering::Acquire);
        let value = Arc::new(compute()?);

        match map.entry(key) {
            Entry::Occupied(existing) => Ok(Arc::clone(existing.get())),
            Entry::Vacant(slot) => {
                if self.epoch.load(Ordering::Acquire) == epoch {
                    tracing::debug!(key = ?slot.key(), "listing cache populated");
                    slot.insert(Arc::clone(&value));
                } else {
                    tracing::debug!(key = ?slot.key(), "listing invalidated during population, not cached");
                }
                Ok(value)
            }
        }
    }

    fn bump(&self) {
        self.epoch.fetch_add(1, Ordering::AcqRel);
    }

    /// Drop the sub-term listing of `parent` in every workspace and language.
    pub fn invalidate_parent(&self, parent: &Iri) {
        self.bump();
        self.sub_terms.retain(|k, _| &k.parent != parent);
        self.roots
            .retain(|_, nodes| !nodes.iter().any(|n| &n.info.id == parent));
    }

    /// Drop root listings of `vocabulary` and every listing that includes imports.
    pub fn invalidate_vocabulary(&self, vocabulary: &Iri) {
        self.bump();
        self.roots
            .retain(|k, _| &k.vocabulary != vocabulary && !k.include_imports);
    }

    /// Drop every listing mentioning `term`.
    pub fn invalidate_term(&self, term: &Iri) {
        self.bump();
        self.sub_terms
            .retain(|k, list| &k.parent != term && !list.iter().any(|i| &i.id == term));
        self.roots.retain(|_, nodes| {
            !nodes
                .iter()
                .any(|n| &n.info.id == term || n.sub_terms.iter().any(|i| &i.id == term))
        });
    }

    pub fn clear(&self) {
        self.bump();
        self.roots.clear();
        self.sub_terms.clear();
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            roots: self.roots.len(),
            sub_terms: self.sub_terms.len(),
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            epoch: self.epoch.load(Ordering::Relaxed),
        }
    }
}

impl ChangeListener for ListingCache {
    fn on_change(&self, event: &ChangeEvent) {
        match event.entity.kind {
            EntityKind::Term => {
                self.invalidate_term(&event.entity.id);
                for parent in event.affected_parents() {
                    self.invalidate_parent(parent);
                }
                if let Some(vocabulary) = &event.vocabulary {
                    if event.is_structural() {
                        self.invalidate_vocabulary(vocabulary);
                    }
                }
            }
            EntityKind::Vocabulary | EntityKind::Glossary => {
                if event.change == ChangeKind::Remove {
                    self.clear();
                } else {
                    let vocabulary = event.vocabulary.as_ref().unwrap_or(&event.entity.id);
                    self.invalidate_vocabulary(vocabulary);
                }
            }
            EntityKind::Snapshot | EntityKind::ChangeRecord => {}
        }
        tracing::debug!(
            entity = %event.entity.id,
            change = %event.change,
            "listing cache invalidated"
        );
    }
}
