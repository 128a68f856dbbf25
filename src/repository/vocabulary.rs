//! Vocabulary repository.

use std::collections::BTreeSet;
use std::sync::Arc;

use chrono::{DateTime, Utc};

use crate::collation;
use crate::context::{ContextId, ContextView, Iri};
use crate::descriptor::{Attribute, Purpose};
use crate::error::{EntityError, GlossaError, GlossaResult};
use crate::events::{ChangeEvent, ChangeKind};
use crate::model::{EntityKind, Glossary, Snapshot, Vocabulary, Versioned};
use crate::ns::{self, dcterms, glossa, rdf, skos};
use crate::snapshot::{SnapshotResolver, exclusion_fragment};
use crate::store::{ChangeSet, Pattern, Statement, Value};
use crate::workspace::OperationScope;

use super::Services;

/// Reads and writes vocabularies and their glossaries.
#[derive(Debug, Clone)]
pub struct VocabularyRepository {
    services: Arc<Services>,
}

impl VocabularyRepository {
    pub fn new(services: Arc<Services>) -> Self {
        Self { services }
    }

    /// The live vocabulary `id` as seen through its resolved context.
    pub fn find(&self, scope: &OperationScope, id: &Iri) -> GlossaResult<Option<Vocabulary>> {
        let view = self.services.view(scope)?;
        self.find_in(&view, id)
    }

    fn find_in(&self, view: &ContextView, id: &Iri) -> GlossaResult<Option<Vocabulary>> {
        let Some(ctx) = view.context_of(id) else {
            return Ok(None);
        };
        let statements = self.services.store.find(ctx, &Pattern::subject(id))?;
        let mut vocabulary = Vocabulary::new(id.clone());
        for statement in &statements {
            match (statement.predicate.as_str(), &statement.object) {
                (dcterms::TITLE, Value::Literal { value, language: Some(l), .. }) => {
                    vocabulary.label.set(l.as_str(), value.as_str())
                }
                (dcterms::DESCRIPTION, Value::Literal { value, language: Some(l), .. }) => {
                    vocabulary.description.set(l.as_str(), value.as_str())
                }
                (glossa::IMPORTS, Value::Iri(imported)) => {
                    vocabulary.imports.insert(imported.clone());
                }
                (glossa::DESCRIBES_DOCUMENT, Value::Iri(document)) => {
                    vocabulary.document = Some(document.clone());
                }
                _ => {}
            }
        }
        let glossary = self.services.glossary_of(id, ctx)?;
        let rows = self.services.store.select(&ns::prefixed(&format!(
            "SELECT DISTINCT ?t WHERE {{ GRAPH {} {{ {} skos:hasTopConcept ?t }} {} }}",
            ctx.to_sparql(),
            glossary.to_sparql(),
            exclusion_fragment("t")
        )))?;
        vocabulary.glossary = Glossary {
            id: glossary,
            root_terms: rows.iter().filter_map(|r| r.iri("t").cloned()).collect(),
        };
        Ok(Some(vocabulary))
    }

    /// The live vocabulary or, for a snapshot identifier, its snapshot record.
    pub fn lookup(
        &self,
        scope: &OperationScope,
        id: &Iri,
    ) -> GlossaResult<Option<Versioned<Vocabulary>>> {
        if let Some(snapshot) = self.services.snapshots.find(id)? {
            return Ok(Some(Versioned::Snapshot(snapshot)));
        }
        Ok(self.find(scope, id)?.map(Versioned::Live))
    }

    /// Whether `id` is a visible live vocabulary.
    pub fn exists(&self, scope: &OperationScope, id: &Iri) -> GlossaResult<bool> {
        Ok(self.services.view(scope)?.context_of(id).is_some())
    }

    /// Every visible vocabulary, sorted by title.
    pub fn find_all(&self, scope: &OperationScope) -> GlossaResult<Vec<Vocabulary>> {
        let view = self.services.view(scope)?;
        let mut out = Vec::with_capacity(view.len());
        for id in view.vocabularies() {
            if let Some(vocabulary) = self.find_in(&view, id)? {
                out.push(vocabulary);
            }
        }
        let language = scope.language();
        collation::sort_by_label(&mut out, language, |v| v.label.get_or_fallback(language));
        Ok(out)
    }

    /// Vocabularies `id` imports, directly or transitively.
    pub fn transitive_imports(&self, scope: &OperationScope, id: &Iri) -> GlossaResult<BTreeSet<Iri>> {
        let view = self.services.view(scope)?;
        Ok(self.services.transitive_imports(id, &view)?)
    }

    /// Snapshots of vocabulary `id`, newest first.
    pub fn find_snapshots(&self, id: &Iri) -> GlossaResult<Vec<Snapshot>> {
        Ok(self.services.snapshots.find_snapshots(id)?)
    }

    /// The version of vocabulary `id` valid at `at`.
    pub fn find_version_valid_at(
        &self,
        scope: &OperationScope,
        id: &Iri,
        at: DateTime<Utc>,
    ) -> GlossaResult<Option<Versioned<Vocabulary>>> {
        if let Some(snapshot) = self.services.snapshots.find_valid_at(id, at)? {
            return Ok(Some(Versioned::Snapshot(snapshot)));
        }
        Ok(self.find(scope, id)?.map(Versioned::Live))
    }

    /// Create `vocabulary` and its glossary in the context it resolves to.
    pub fn persist(&self, scope: &OperationScope, vocabulary: Vocabulary) -> GlossaResult<Vocabulary> {
        let ctx = scope.resolve(&vocabulary.id);
        let declared = self.services.store.ask(&ns::prefixed(&format!(
            "ASK {{ GRAPH {} {{ {} a glossa:Vocabulary }} }}",
            ctx.to_sparql(),
            vocabulary.id.to_sparql()
        )))?;
        if declared || self.services.snapshots.is_snapshot(&vocabulary.id)? {
            return Err(EntityError::AlreadyExists {
                kind: "vocabulary".into(),
                id: vocabulary.id.to_string(),
            }
            .into());
        }

        let mut changes = ChangeSet::new();
        self.write(&vocabulary, &ctx, Purpose::Save, true, &mut changes)?;
        self.services.store.apply(&changes)?;
        self.publish(
            scope,
            ChangeEvent::new(&vocabulary.id, EntityKind::Vocabulary, ChangeKind::Persist)
                .in_vocabulary(&vocabulary.id, &ctx),
        );
        tracing::info!(vocabulary = %vocabulary.id, context = %ctx, "persisted vocabulary");

        self.find(scope, &vocabulary.id)?
            .ok_or_else(|| not_found(&vocabulary.id))
    }

    /// Replace the vocabulary's own statements. Root-term membership of the
    /// glossary is left alone; it follows the terms.
    pub fn update(&self, scope: &OperationScope, vocabulary: Vocabulary) -> GlossaResult<Vocabulary> {
        let view = self.services.view(scope)?;
        let ctx = view
            .context_of(&vocabulary.id)
            .cloned()
            .ok_or_else(|| not_found(&vocabulary.id))?;
        let mut changes = ChangeSet::new();
        changes.remove(&ctx, self.services.store.find(&ctx, &Pattern::subject(&vocabulary.id))?);
        self.write(&vocabulary, &ctx, Purpose::Update, false, &mut changes)?;
        self.services.store.apply(&changes)?;
        self.publish(
            scope,
            ChangeEvent::new(&vocabulary.id, EntityKind::Vocabulary, ChangeKind::Update)
                .in_vocabulary(&vocabulary.id, &ctx),
        );
        tracing::info!(vocabulary = %vocabulary.id, context = %ctx, "updated vocabulary");

        self.find(scope, &vocabulary.id)?
            .ok_or_else(|| not_found(&vocabulary.id))
    }

    /// Drop vocabulary `id` and everything in its resolved context. Refused
    /// while another visible vocabulary imports it.
    pub fn remove(&self, scope: &OperationScope, id: &Iri) -> GlossaResult<()> {
        let view = self.services.view(scope)?;
        let ctx = view.context_of(id).cloned().ok_or_else(|| not_found(id))?;

        let mut importers = Vec::new();
        for other in view.vocabularies().filter(|v| *v != id) {
            if self.services.transitive_imports(other, &view)?.contains(id) {
                importers.push(other.to_string());
            }
        }
        if !importers.is_empty() {
            return Err(EntityError::InUse {
                id: id.to_string(),
                by: importers.join(", "),
            }
            .into());
        }

        let removed = self.services.store.clear_context(&ctx)?;
        self.publish(
            scope,
            ChangeEvent::new(id, EntityKind::Vocabulary, ChangeKind::Remove).in_vocabulary(id, &ctx),
        );
        tracing::info!(vocabulary = %id, context = %ctx, statements = removed, "removed vocabulary");
        Ok(())
    }

    /// Freeze vocabulary `id` at `at`: a vocabulary snapshot plus a term
    /// snapshot for every live term, all in a context of their own named
    /// after the vocabulary snapshot.
    pub fn create_snapshot(
        &self,
        scope: &OperationScope,
        id: &Iri,
        at: DateTime<Utc>,
    ) -> GlossaResult<Snapshot> {
        let view = self.services.view(scope)?;
        let vocabulary = self.find_in(&view, id)?.ok_or_else(|| not_found(id))?;
        let Some(live) = view.context_of(id).cloned() else {
            return Err(not_found(id));
        };

        let mut snapshot = SnapshotResolver::stub(id, EntityKind::Vocabulary, at, &vocabulary.label);
        snapshot.description = vocabulary.description.clone();
        let ctx = ContextId::new(snapshot.id.clone());
        self.services.snapshots.write(&ctx, &snapshot)?;

        let rows = self.services.store.select(&ns::prefixed(&format!(
            "SELECT DISTINCT ?t WHERE {{ GRAPH {} {{ ?t a skos:Concept }} {} }}",
            live.to_sparql(),
            exclusion_fragment("t")
        )))?;
        let ids: BTreeSet<Iri> = rows.iter().filter_map(|r| r.iri("t").cloned()).collect();
        let infos = self.services.merger.describe(&ids, &view)?;
        for info in infos.values() {
            let stub = SnapshotResolver::stub(&info.id, EntityKind::Term, at, &info.label);
            self.services.snapshots.write(&ctx, &stub)?;
        }

        self.publish(
            scope,
            ChangeEvent::new(&snapshot.id, EntityKind::Snapshot, ChangeKind::Persist)
                .in_vocabulary(id, &ctx),
        );
        tracing::info!(vocabulary = %id, snapshot = %snapshot.id, terms = infos.len(), "created vocabulary snapshot");
        Ok(snapshot)
    }

    /// Copy every statement of `from` into `to`; returns the number copied.
    /// Used to seed a working context from the canonical one.
    pub fn copy_context(&self, from: &ContextId, to: &ContextId) -> GlossaResult<usize> {
        let statements = self.services.store.find(from, &Pattern::any())?;
        self.services.store.insert(to, &statements)?;
        tracing::debug!(from = %from, to = %to, statements = statements.len(), "copied context");
        Ok(statements.len())
    }

    fn write(
        &self,
        vocabulary: &Vocabulary,
        ctx: &ContextId,
        purpose: Purpose,
        with_roots: bool,
        changes: &mut ChangeSet,
    ) -> GlossaResult<()> {
        let descriptor = self
            .services
            .descriptors
            .build(EntityKind::Vocabulary, ctx, purpose)?;
        let glossary_descriptor = self
            .services
            .descriptors
            .build(EntityKind::Glossary, ctx, purpose)?;

        let id = &vocabulary.id;
        let glossary = &vocabulary.glossary.id;
        let mut by_attribute: Vec<(Option<&ContextId>, Vec<Statement>)> = vec![
            (
                descriptor.write_context(Attribute::Types),
                vec![Statement::link(id, rdf::TYPE, &Iri::known(glossa::VOCABULARY))],
            ),
            (
                descriptor.write_context(Attribute::Label),
                vocabulary
                    .label
                    .iter()
                    .map(|(l, t)| Statement::new(id, dcterms::TITLE, Value::lang(t, l)))
                    .collect(),
            ),
            (
                descriptor.write_context(Attribute::Description),
                vocabulary
                    .description
                    .iter()
                    .map(|(l, t)| Statement::new(id, dcterms::DESCRIPTION, Value::lang(t, l)))
                    .collect(),
            ),
            (
                descriptor.write_context(Attribute::Glossary),
                vec![Statement::link(id, glossa::HAS_GLOSSARY, glossary)],
            ),
            (
                descriptor.write_context(Attribute::Imports),
                vocabulary
                    .imports
                    .iter()
                    .filter(|i| *i != id)
                    .map(|i| Statement::link(id, glossa::IMPORTS, i))
                    .collect(),
            ),
            (
                descriptor.write_context(Attribute::Document),
                vocabulary
                    .document
                    .iter()
                    .map(|d| Statement::link(id, glossa::DESCRIBES_DOCUMENT, d))
                    .collect(),
            ),
            (
                glossary_descriptor.write_context(Attribute::Types),
                vec![Statement::link(glossary, rdf::TYPE, &Iri::known(skos::CONCEPT_SCHEME))],
            ),
        ];
        if with_roots {
            by_attribute.push((
                glossary_descriptor.write_context(Attribute::RootTerms),
                vocabulary
                    .glossary
                    .root_terms
                    .iter()
                    .map(|t| Statement::link(glossary, skos::HAS_TOP_CONCEPT, t))
                    .collect(),
            ));
        }

        for (target, statements) in by_attribute {
            if let Some(target) = target {
                changes.insert(target, statements);
            }
        }
        Ok(())
    }

    fn publish(&self, scope: &OperationScope, event: ChangeEvent) {
        let mut uow = self.services.hub.unit_of_work();
        uow.record(event.by(scope.author()));
        uow.commit();
    }
}

fn not_found(id: &Iri) -> GlossaError {
    EntityError::NotFound {
        kind: "vocabulary".into(),
        id: id.to_string(),
    }
    .into()
}
