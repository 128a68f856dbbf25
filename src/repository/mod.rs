//! Repositories: the read/write entry points for vocabularies and terms.
//!
//! Every operation takes an [`OperationScope`]. The scope's workspace
//! snapshot determines the [`ContextView`] of the operation, built once at its
//! start; writes go through descriptors and publish one change event on
//! commit.

pub mod term;
pub mod vocabulary;

use std::collections::{BTreeSet, VecDeque};
use std::sync::Arc;

pub use term::TermRepository;
pub use vocabulary::VocabularyRepository;

use crate::cache::ListingCache;
use crate::context::{ContextId, ContextView, Iri};
use crate::descriptor::DescriptorBuilder;
use crate::error::StoreResult;
use crate::events::ChangeHub;
use crate::identifier::glossary_identifier;
use crate::merge::RelationshipMerger;
use crate::ns;
use crate::snapshot::{SnapshotResolver, exclusion_fragment};
use crate::store::GraphStore;
use crate::workspace::OperationScope;

/// Collaborators shared by both repositories.
pub struct Services {
    pub(crate) store: Arc<dyn GraphStore>,
    pub(crate) descriptors: DescriptorBuilder,
    pub(crate) merger: RelationshipMerger,
    pub(crate) snapshots: SnapshotResolver,
    pub(crate) cache: Arc<ListingCache>,
    pub(crate) hub: Arc<ChangeHub>,
}

impl Services {
    pub fn new(
        store: Arc<dyn GraphStore>,
        descriptors: DescriptorBuilder,
        cache: Arc<ListingCache>,
        hub: Arc<ChangeHub>,
    ) -> Self {
        Self {
            merger: RelationshipMerger::new(store.clone()),
            snapshots: SnapshotResolver::new(store.clone()),
            store,
            descriptors,
            cache,
            hub,
        }
    }

    /// The contexts visible to an operation in `scope`: for every live
    /// vocabulary, the one context it resolves to, provided the vocabulary is
    /// actually declared there.
    pub fn view(&self, scope: &OperationScope) -> StoreResult<ContextView> {
        let rows = self.store.select(&ns::prefixed(&format!(
            "SELECT DISTINCT ?v ?g WHERE {{ GRAPH ?g {{ ?v a glossa:Vocabulary }} {} }}",
            exclusion_fragment("v")
        )))?;
        let mut view = ContextView::new();
        for row in &rows {
            let (Some(vocabulary), Some(g)) = (row.iri("v"), row.iri("g")) else {
                continue;
            };
            let ctx = ContextId::new(g.clone());
            if scope.resolve(vocabulary) == ctx {
                view.insert(vocabulary.clone(), ctx);
            }
        }
        tracing::debug!(
            workspace = scope.metadata().name(),
            vocabularies = view.len(),
            "resolved context view"
        );
        Ok(view)
    }

    /// Vocabularies imported by `vocabulary`, directly or transitively,
    /// excluding `vocabulary` itself. Import cycles are tolerated.
    pub fn transitive_imports(
        &self,
        vocabulary: &Iri,
        view: &ContextView,
    ) -> StoreResult<BTreeSet<Iri>> {
        let mut seen = BTreeSet::new();
        let mut queue = VecDeque::from([vocabulary.clone()]);
        while let Some(current) = queue.pop_front() {
            let Some(ctx) = view.context_of(&current) else {
                continue;
            };
            let rows = self.store.select(&ns::prefixed(&format!(
                "SELECT ?w WHERE {{ GRAPH {} {{ {} glossa:imports ?w }} }}",
                ctx.to_sparql(),
                current.to_sparql()
            )))?;
            for imported in rows.iter().filter_map(|r| r.iri("w")) {
                if imported != vocabulary && seen.insert(imported.clone()) {
                    queue.push_back(imported.clone());
                }
            }
        }
        Ok(seen)
    }

    /// Resolved contexts of the vocabularies `vocabulary` imports.
    pub fn imported_contexts(
        &self,
        vocabulary: &Iri,
        view: &ContextView,
    ) -> StoreResult<Vec<ContextId>> {
        Ok(self
            .transitive_imports(vocabulary, view)?
            .iter()
            .filter_map(|v| view.context_of(v).cloned())
            .collect())
    }

    /// The glossary `vocabulary` declares in `context`, or its default identifier.
    pub fn glossary_of(&self, vocabulary: &Iri, context: &ContextId) -> StoreResult<Iri> {
        let rows = self.store.select(&ns::prefixed(&format!(
            "SELECT ?glossary WHERE {{ GRAPH {} {{ {} glossa:hasGlossary ?glossary }} }} LIMIT 1",
            context.to_sparql(),
            vocabulary.to_sparql()
        )))?;
        Ok(rows
            .first()
            .and_then(|r| r.iri("glossary").cloned())
            .unwrap_or_else(|| glossary_identifier(vocabulary)))
    }
}

impl std::fmt::Debug for Services {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Services")
            .field("hub", &self.hub)
            .field("cache", &self.cache.stats())
            .finish()
    }
}
