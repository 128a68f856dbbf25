//! Thesaurus facade: top-level API for glossa.
//!
//! The `Thesaurus` owns the graph store, the workspace registry, the listing
//! cache and the change hub, and hands out repositories bound to them.

use std::path::PathBuf;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::cache::{CacheStats, ListingCache};
use crate::changes::{ChangeRecorder, RecentlyModifiedAsset, StoreChangeRecords};
use crate::context::{ContextId, Iri};
use crate::descriptor::DescriptorBuilder;
use crate::error::{ConfigError, GlossaResult};
use crate::events::{ChangeHub, ChangeListener, LastModifiedTracker};
use crate::model::{EntityKind, Page};
use crate::repository::{Services, TermRepository, VocabularyRepository};
use crate::store::{GraphStore, Pattern, SparqlStore};
use crate::workspace::{OperationScope, WorkspaceRegistry, check_language};

/// Configuration for a thesaurus instance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ThesaurusConfig {
    /// Directory of the on-disk store. `None` for memory-only mode.
    #[serde(default)]
    pub data_dir: Option<PathBuf>,
    /// Primary language for labels and ordering.
    #[serde(default = "default_language")]
    pub language: String,
    /// Default page size for root listings.
    #[serde(default = "default_page_size")]
    pub page_size: usize,
    /// Whether committed changes are written as change records.
    #[serde(default = "default_record_changes")]
    pub record_changes: bool,
}

fn default_language() -> String {
    "en".into()
}

fn default_page_size() -> usize {
    100
}

fn default_record_changes() -> bool {
    true
}

impl Default for ThesaurusConfig {
    fn default() -> Self {
        Self {
            data_dir: None,
            language: default_language(),
            page_size: default_page_size(),
            record_changes: default_record_changes(),
        }
    }
}

/// A thesaurus over one graph store and one workspace registry.
pub struct Thesaurus {
    config: ThesaurusConfig,
    store: Arc<dyn GraphStore>,
    registry: Arc<WorkspaceRegistry>,
    cache: Arc<ListingCache>,
    hub: Arc<ChangeHub>,
    tracker: Arc<LastModifiedTracker>,
    changes: Arc<StoreChangeRecords>,
    terms: TermRepository,
    vocabularies: VocabularyRepository,
}

impl Thesaurus {
    /// Create a thesaurus with an empty "default" workspace.
    pub fn new(config: ThesaurusConfig) -> GlossaResult<Self> {
        Self::with_registry(config, WorkspaceRegistry::new("default"))
    }

    /// Create a thesaurus using an existing workspace registry.
    pub fn with_registry(config: ThesaurusConfig, registry: WorkspaceRegistry) -> GlossaResult<Self> {
        check_language(&config.language)?;
        if config.page_size == 0 {
            return Err(ConfigError::Invalid {
                message: "page_size must be > 0".into(),
            }
            .into());
        }

        tracing::info!(
            workspace = registry.name(),
            language = %config.language,
            persistent = config.data_dir.is_some(),
            "initializing glossa thesaurus"
        );

        let store: Arc<dyn GraphStore> = match &config.data_dir {
            Some(dir) => Arc::new(SparqlStore::open(dir)?),
            None => Arc::new(SparqlStore::in_memory()?),
        };

        let cache = Arc::new(ListingCache::new());
        let hub = Arc::new(ChangeHub::new());
        let tracker = Arc::new(LastModifiedTracker::new(Utc::now()));
        let changes = Arc::new(StoreChangeRecords::new(Arc::clone(&store)));

        hub.subscribe(cache.clone());
        hub.subscribe(tracker.clone());
        if config.record_changes {
            hub.subscribe(Arc::new(ChangeRecorder::new(Arc::clone(&changes))));
        }

        let services = Arc::new(Services::new(
            Arc::clone(&store),
            DescriptorBuilder::with_defaults(),
            Arc::clone(&cache),
            Arc::clone(&hub),
        ));

        Ok(Self {
            config,
            store,
            registry: Arc::new(registry),
            cache,
            hub,
            tracker,
            changes,
            terms: TermRepository::new(Arc::clone(&services)),
            vocabularies: VocabularyRepository::new(services),
        })
    }

    /// Scope for one operation in the current workspace state.
    pub fn scope(&self) -> OperationScope {
        OperationScope::new(
            self.registry.current_workspace_metadata(),
            self.config.language.clone(),
        )
    }

    /// Like [`Thesaurus::scope`], with change records attributed to `author`.
    pub fn scope_as(&self, author: &str) -> OperationScope {
        self.scope().with_author(author)
    }

    /// First page of a listing with the configured page size.
    pub fn page(&self, offset: usize) -> Page {
        Page::new(offset, self.config.page_size)
    }

    pub fn terms(&self) -> &TermRepository {
        &self.terms
    }

    pub fn vocabularies(&self) -> &VocabularyRepository {
        &self.vocabularies
    }

    pub fn registry(&self) -> &WorkspaceRegistry {
        &self.registry
    }

    pub fn store(&self) -> &Arc<dyn GraphStore> {
        &self.store
    }

    pub fn config(&self) -> &ThesaurusConfig {
        &self.config
    }

    /// Make `vocabulary` editable in `working`. An empty working context is
    /// seeded with a copy of the canonical one; returns the number of
    /// statements copied.
    pub fn checkout(&self, vocabulary: &Iri, working: &ContextId) -> GlossaResult<usize> {
        self.registry.register_editable_vocabulary(vocabulary, working)?;
        let canonical = ContextId::canonical(vocabulary);
        if working == &canonical || !self.store.find(working, &Pattern::any())?.is_empty() {
            return Ok(0);
        }
        let copied = self.vocabularies.copy_context(&canonical, working)?;
        tracing::info!(vocabulary = %vocabulary, working = %working, statements = copied, "checked out vocabulary");
        Ok(copied)
    }

    /// Stop editing `vocabulary` in its working context. The working context
    /// itself is kept.
    pub fn release(&self, vocabulary: &Iri) -> Option<ContextId> {
        self.registry.clear(vocabulary)
    }

    /// Add a listener for committed changes.
    pub fn subscribe(&self, listener: Arc<dyn ChangeListener>) {
        self.hub.subscribe(listener);
    }

    /// When entities of `kind` last changed.
    pub fn last_modified(&self, kind: EntityKind) -> Option<DateTime<Utc>> {
        self.tracker.get(kind)
    }

    /// The `limit` most recently changed terms and vocabularies.
    pub fn recently_modified(&self, limit: usize) -> GlossaResult<Vec<RecentlyModifiedAsset>> {
        Ok(self.changes.find_last_edited(limit)?)
    }

    pub fn change_records(&self) -> &StoreChangeRecords {
        &self.changes
    }

    pub fn cache_stats(&self) -> CacheStats {
        self.cache.stats()
    }

    /// Summary of the thesaurus state.
    pub fn info(&self) -> GlossaResult<ThesaurusInfo> {
        let scope = self.scope();
        Ok(ThesaurusInfo {
            workspace: self.registry.name().to_string(),
            language: self.config.language.clone(),
            persistent: self.config.data_dir.is_some(),
            statements: self.store.len()?,
            contexts: self.store.contexts()?.len(),
            vocabularies: self.vocabularies.find_all(&scope)?.len(),
            editable: self.registry.registrations().len(),
            listeners: self.hub.listener_count(),
            cache: self.cache.stats(),
        })
    }
}

/// Summary information about the thesaurus state.
#[derive(Debug, Clone)]
pub struct ThesaurusInfo {
    pub workspace: String,
    pub language: String,
    pub persistent: bool,
    pub statements: usize,
    pub contexts: usize,
    pub vocabularies: usize,
    pub editable: usize,
    pub listeners: usize,
    pub cache: CacheStats,
}

impl std::fmt::Display for ThesaurusInfo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "glossa thesaurus info")?;
        writeln!(f, "  workspace:    {}", self.workspace)?;
        writeln!(f, "  language:     {}", self.language)?;
        writeln!(f, "  persistent:   {}", self.persistent)?;
        writeln!(f, "  statements:   {}", self.statements)?;
        writeln!(f, "  contexts:     {}", self.contexts)?;
        writeln!(f, "  vocabularies: {}", self.vocabularies)?;
        writeln!(f, "  editable:     {}", self.editable)?;
        writeln!(f, "  listeners:    {}", self.listeners)?;
        writeln!(f, "  cache:        {}", self.cache)?;
        Ok(())
    }
}

impl std::fmt::Debug for Thesaurus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Thesaurus")
            .field("config", &self.config)
            .field("registry", &self.registry)
            .field("hub", &self.hub)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Term, Vocabulary};

    fn iri(s: &str) -> Iri {
        Iri::new(s).unwrap()
    }

    #[test]
    fn create_memory_only_thesaurus() {
        let thesaurus = Thesaurus::new(ThesaurusConfig::default()).unwrap();
        let info = thesaurus.info().unwrap();
        assert!(!info.persistent);
        assert_eq!(info.vocabularies, 0);
        assert_eq!(info.listeners, 3);
    }

    #[test]
    fn invalid_language_rejected() {
        let result = Thesaurus::new(ThesaurusConfig {
            language: "not a tag".into(),
            ..Default::default()
        });
        assert!(result.is_err());
    }

    #[test]
    fn zero_page_size_rejected() {
        let result = Thesaurus::new(ThesaurusConfig {
            page_size: 0,
            ..Default::default()
        });
        assert!(result.is_err());
    }

    #[test]
    fn config_defaults_from_empty_toml() {
        let config: ThesaurusConfig = toml::from_str("").unwrap();
        assert_eq!(config, ThesaurusConfig::default());
    }

    #[test]
    fn checkout_seeds_working_context() {
        let thesaurus = Thesaurus::new(ThesaurusConfig::default()).unwrap();
        let v = iri("https://example.org/v");
        let scope = thesaurus.scope();
        thesaurus
            .vocabularies()
            .persist(&scope, Vocabulary::new(v.clone()).with_label("en", "V"))
            .unwrap();
        thesaurus
            .terms()
            .persist(&scope, Term::new(iri("https://example.org/v/term/a")).with_label("en", "A"), &v)
            .unwrap();

        let working = ContextId::parse("https://example.org/ws/v").unwrap();
        let copied = thesaurus.checkout(&v, &working).unwrap();
        assert!(copied > 0);
        // Second checkout into the same, now populated, context copies nothing.
        assert_eq!(thesaurus.checkout(&v, &working).unwrap(), 0);

        let scope = thesaurus.scope();
        let roots = thesaurus
            .terms()
            .find_all_roots(&scope, &v, Page::default())
            .unwrap();
        assert_eq!(roots.len(), 1);
        assert_eq!(thesaurus.release(&v), Some(working));
    }

    #[test]
    fn changes_are_recorded_and_tracked() {
        let thesaurus = Thesaurus::new(ThesaurusConfig::default()).unwrap();
        let before = thesaurus.last_modified(EntityKind::Term).unwrap();
        let v = iri("https://example.org/v");
        let scope = thesaurus.scope_as("editor");
        thesaurus
            .vocabularies()
            .persist(&scope, Vocabulary::new(v.clone()).with_label("en", "V"))
            .unwrap();
        thesaurus
            .terms()
            .persist(&scope, Term::new(iri("https://example.org/v/term/a")).with_label("en", "A"), &v)
            .unwrap();

        assert!(thesaurus.last_modified(EntityKind::Term).unwrap() >= before);
        let recent = thesaurus.recently_modified(10).unwrap();
        assert_eq!(recent.len(), 2);
        assert_eq!(recent[0].kind, EntityKind::Term);
        assert_eq!(recent[0].author.as_deref(), Some("editor"));
    }
}
