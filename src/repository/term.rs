//! Term repository.

use std::collections::BTreeSet;
use std::sync::Arc;

use chrono::{DateTime, Utc};

use crate::cache::{RootsKey, SubTermsKey};
use crate::context::{ContextId, ContextView, Iri, values_clause};
use crate::descriptor::{Attribute, Descriptor, Purpose};
use crate::error::{ConfigError, ConsistencyError, EntityError, GlossaError, GlossaResult};
use crate::events::{ChangeEvent, ChangeKind};
use crate::merge::sort_infos;
use crate::model::{
    EntityKind, LangString, MultilingualString, Page, RelationshipKind, Snapshot, Term, TermInfo,
    TermNode, Versioned,
};
use crate::ns::{self, TERM_MODEL_PREDICATES, dcterms, glossa, rdf, skos};
use crate::snapshot::{SnapshotResolver, exclusion_fragment};
use crate::store::{ChangeSet, Pattern, Statement, Value, escape_literal};
use crate::workspace::{OperationScope, check_language};

use super::Services;

/// Reads and writes terms through the workspace overlay.
#[derive(Debug, Clone)]
pub struct TermRepository {
    services: Arc<Services>,
}

impl TermRepository {
    pub fn new(services: Arc<Services>) -> Self {
        Self { services }
    }

    // -----------------------------------------------------------------------
    // Reads
    // -----------------------------------------------------------------------

    /// The live term `id`, with merged relationships and sorted sub-terms.
    /// Snapshots and terms outside the view yield `None`.
    pub fn find(&self, scope: &OperationScope, id: &Iri) -> GlossaResult<Option<Term>> {
        let view = self.services.view(scope)?;
        self.find_in(scope, &view, id)
    }

    fn find_in(
        &self,
        scope: &OperationScope,
        view: &ContextView,
        id: &Iri,
    ) -> GlossaResult<Option<Term>> {
        if self.services.snapshots.is_snapshot(id)? {
            return Ok(None);
        }
        let Some((vocabulary, ctx)) = self.locate(id, view)? else {
            return Ok(None);
        };
        let statements = self.services.store.find(&ctx, &Pattern::subject(id))?;
        let mut term = read_term(id, &statements);
        let imported = self.services.imported_contexts(&vocabulary, view)?;
        term.relationships = self.services.merger.merge(id, &ctx, &imported, view)?;
        term.sub_terms = self.sub_terms_in(scope, view, id)?.as_ref().clone();
        term.vocabulary = Some(vocabulary);
        Ok(Some(term))
    }

    /// The vocabulary and context holding the live term `id` in `view`.
    fn locate(&self, id: &Iri, view: &ContextView) -> GlossaResult<Option<(Iri, ContextId)>> {
        let rows = self.services.store.select(&ns::prefixed(&format!(
            "SELECT DISTINCT ?g WHERE {{ {} GRAPH ?g {{ {} a skos:Concept }} }}",
            view.values_clause("g"),
            id.to_sparql()
        )))?;
        let found: Vec<(Iri, ContextId)> = rows
            .iter()
            .filter_map(|r| r.iri("g"))
            .filter_map(|g| {
                let ctx = ContextId::new(g.clone());
                view.vocabulary_of(&ctx).cloned().map(|v| (v, ctx))
            })
            .collect();
        match found.len() {
            0 => Ok(None),
            1 => Ok(found.into_iter().next()),
            _ => {
                let contexts = found
                    .iter()
                    .map(|(_, c)| c.to_string())
                    .collect::<Vec<_>>()
                    .join(", ");
                tracing::error!(term = %id, %contexts, "term asserted in several visible contexts");
                Err(ConsistencyError::AmbiguousContext {
                    term: id.to_string(),
                    contexts,
                }
                .into())
            }
        }
    }

    /// Summary of the live term `id`.
    pub fn find_info(&self, scope: &OperationScope, id: &Iri) -> GlossaResult<Option<TermInfo>> {
        let view = self.services.view(scope)?;
        if self.services.snapshots.is_snapshot(id)? || self.locate(id, &view)?.is_none() {
            return Ok(None);
        }
        let ids = BTreeSet::from([id.clone()]);
        Ok(self.services.merger.describe(&ids, &view)?.remove(id))
    }

    /// The live term or, for a snapshot identifier, its snapshot record.
    pub fn lookup(&self, scope: &OperationScope, id: &Iri) -> GlossaResult<Option<Versioned<Term>>> {
        if let Some(snapshot) = self.services.snapshots.find(id)? {
            return Ok(Some(Versioned::Snapshot(snapshot)));
        }
        Ok(self.find(scope, id)?.map(Versioned::Live))
    }

    /// Whether a live term `id` is visible.
    pub fn exists(&self, scope: &OperationScope, id: &Iri) -> GlossaResult<bool> {
        let view = self.services.view(scope)?;
        Ok(self.services.store.ask(&ns::prefixed(&format!(
            "ASK {{ {} GRAPH ?g {{ {t} a skos:Concept }} BIND({t} AS ?t) {} }}",
            view.values_clause("g"),
            exclusion_fragment("t"),
            t = id.to_sparql()
        )))?)
    }

    /// Whether `vocabulary` already has a live term labelled `label` in
    /// `language`, ignoring case.
    pub fn exists_in_vocabulary(
        &self,
        scope: &OperationScope,
        label: &str,
        vocabulary: &Iri,
        language: &str,
    ) -> GlossaResult<bool> {
        let view = self.services.view(scope)?;
        let Some(ctx) = view.context_of(vocabulary) else {
            return Ok(false);
        };
        Ok(self.services.store.ask(&ns::prefixed(&format!(
            "ASK {{ GRAPH {} {{ ?t a skos:Concept ; skos:prefLabel ?l }} \
             FILTER(LCASE(STR(?l)) = LCASE(\"{}\") && LANGMATCHES(LANG(?l), \"{}\")) {} }}",
            ctx.to_sparql(),
            escape_literal(label),
            escape_literal(language),
            exclusion_fragment("t")
        )))?)
    }

    /// Every live term of `vocabulary`, sorted by label.
    pub fn find_all(&self, scope: &OperationScope, vocabulary: &Iri) -> GlossaResult<Vec<TermInfo>> {
        let view = self.services.view(scope)?;
        let Some(ctx) = view.context_of(vocabulary) else {
            return Ok(Vec::new());
        };
        let rows = self.services.store.select(&ns::prefixed(&format!(
            "SELECT DISTINCT ?t WHERE {{ GRAPH {} {{ ?t a skos:Concept }} {} }}",
            ctx.to_sparql(),
            exclusion_fragment("t")
        )))?;
        let ids: BTreeSet<Iri> = rows.iter().filter_map(|r| r.iri("t").cloned()).collect();
        let mut infos: Vec<TermInfo> = self.services.merger.describe(&ids, &view)?.into_values().collect();
        sort_infos(&mut infos, scope.language());
        Ok(infos)
    }

    /// Root terms of `vocabulary` with their sub-terms, sorted by label.
    pub fn find_all_roots(
        &self,
        scope: &OperationScope,
        vocabulary: &Iri,
        page: Page,
    ) -> GlossaResult<Vec<TermNode>> {
        self.roots(scope, vocabulary, page, false)
    }

    /// Root terms of `vocabulary` and of every vocabulary it imports.
    pub fn find_all_roots_including_imports(
        &self,
        scope: &OperationScope,
        vocabulary: &Iri,
        page: Page,
    ) -> GlossaResult<Vec<TermNode>> {
        self.roots(scope, vocabulary, page, true)
    }

    fn roots(
        &self,
        scope: &OperationScope,
        vocabulary: &Iri,
        page: Page,
        include_imports: bool,
    ) -> GlossaResult<Vec<TermNode>> {
        let view = self.services.view(scope)?;
        let Some(ctx) = view.context_of(vocabulary).cloned() else {
            return Ok(Vec::new());
        };
        let key = RootsKey {
            vocabulary: vocabulary.clone(),
            context: ctx,
            workspace: scope.metadata().fingerprint(),
            include_imports,
            language: scope.language().to_string(),
        };
        let nodes = self.services.cache.roots(key, || -> GlossaResult<Vec<TermNode>> {
            let mut vocabularies = vec![vocabulary.clone()];
            if include_imports {
                vocabularies.extend(self.services.transitive_imports(vocabulary, &view)?);
            }
            let mut ids = BTreeSet::new();
            for v in &vocabularies {
                if let Some(c) = view.context_of(v) {
                    ids.extend(self.root_ids(v, c)?);
                }
            }
            let mut roots: Vec<TermInfo> =
                self.services.merger.describe(&ids, &view)?.into_values().collect();
            sort_infos(&mut roots, scope.language());
            roots
                .into_iter()
                .map(|info| {
                    let sub_terms = self.sub_terms_in(scope, &view, &info.id)?.as_ref().clone();
                    Ok::<_, GlossaError>(TermNode { info, sub_terms })
                })
                .collect()
        })?;
        Ok(page.apply(&nodes))
    }

    /// Live root identifiers of `vocabulary` in `ctx`. A snapshot listed as a
    /// root is a consistency violation.
    fn root_ids(&self, vocabulary: &Iri, ctx: &ContextId) -> GlossaResult<BTreeSet<Iri>> {
        let glossary = self.services.glossary_of(vocabulary, ctx)?;
        let offending = self.services.store.select(&ns::prefixed(&format!(
            "SELECT ?t WHERE {{ GRAPH {} {{ {} skos:hasTopConcept ?t }} GRAPH ?sg {{ ?t a glossa:Snapshot }} }} LIMIT 1",
            ctx.to_sparql(),
            glossary.to_sparql()
        )))?;
        if let Some(term) = offending.first().and_then(|r| r.iri("t")) {
            tracing::error!(term = %term, vocabulary = %vocabulary, "snapshot listed as root term");
            return Err(ConsistencyError::SnapshotAsRoot {
                term: term.to_string(),
                vocabulary: vocabulary.to_string(),
            }
            .into());
        }
        let rows = self.services.store.select(&ns::prefixed(&format!(
            "SELECT DISTINCT ?t WHERE {{ GRAPH {} {{ {} skos:hasTopConcept ?t }} {} }}",
            ctx.to_sparql(),
            glossary.to_sparql(),
            exclusion_fragment("t")
        )))?;
        Ok(rows.iter().filter_map(|r| r.iri("t").cloned()).collect())
    }

    /// Direct sub-terms of `parent`, sorted by label.
    pub fn find_sub_terms(&self, scope: &OperationScope, parent: &Iri) -> GlossaResult<Vec<TermInfo>> {
        let view = self.services.view(scope)?;
        Ok(self.sub_terms_in(scope, &view, parent)?.as_ref().clone())
    }

    fn sub_terms_in(
        &self,
        scope: &OperationScope,
        view: &ContextView,
        parent: &Iri,
    ) -> GlossaResult<Arc<Vec<TermInfo>>> {
        let key = SubTermsKey {
            parent: parent.clone(),
            workspace: scope.metadata().fingerprint(),
            language: scope.language().to_string(),
        };
        Ok(self.services.cache.sub_terms(key, || {
            self.services.merger.sub_terms(parent, view, scope.language())
        })?)
    }

    /// Live terms whose preferred or alternative label contains `text`
    /// (case-insensitive), in one vocabulary or the whole view.
    pub fn search(
        &self,
        scope: &OperationScope,
        text: &str,
        vocabulary: Option<&Iri>,
    ) -> GlossaResult<Vec<TermInfo>> {
        let view = self.services.view(scope)?;
        let contexts: Vec<&ContextId> = match vocabulary {
            Some(v) => view.context_of(v).into_iter().collect(),
            None => view.contexts().collect(),
        };
        if contexts.is_empty() {
            return Ok(Vec::new());
        }
        let rows = self.services.store.select(&ns::prefixed(&format!(
            "SELECT DISTINCT ?t WHERE {{ {} GRAPH ?g {{ ?t a skos:Concept ; ?lp ?l }} \
             FILTER(?lp IN (skos:prefLabel, skos:altLabel)) \
             FILTER(CONTAINS(LCASE(STR(?l)), LCASE(\"{}\"))) {} }}",
            values_clause("g", contexts),
            escape_literal(text),
            exclusion_fragment("t")
        )))?;
        let ids: BTreeSet<Iri> = rows.iter().filter_map(|r| r.iri("t").cloned()).collect();
        let mut infos: Vec<TermInfo> = self.services.merger.describe(&ids, &view)?.into_values().collect();
        sort_infos(&mut infos, scope.language());
        Ok(infos)
    }

    /// Snapshots of term `id`, newest first.
    pub fn find_snapshots(&self, id: &Iri) -> GlossaResult<Vec<Snapshot>> {
        Ok(self.services.snapshots.find_snapshots(id)?)
    }

    /// The version of term `id` valid at `at`: the latest snapshot created
    /// at or before `at`, else the live term.
    pub fn find_version_valid_at(
        &self,
        scope: &OperationScope,
        id: &Iri,
        at: DateTime<Utc>,
    ) -> GlossaResult<Option<Versioned<Term>>> {
        if let Some(snapshot) = self.services.snapshots.find_valid_at(id, at)? {
            return Ok(Some(Versioned::Snapshot(snapshot)));
        }
        Ok(self.find(scope, id)?.map(Versioned::Live))
    }

    // -----------------------------------------------------------------------
    // Writes
    // -----------------------------------------------------------------------

    /// Create `term` in the resolved context of `vocabulary`.
    ///
    /// The vocabulary attribute is cleared before writing; parents are split
    /// into internal and external ones by their actual vocabulary. A term
    /// without an internal parent becomes a root of the vocabulary.
    pub fn persist(
        &self,
        scope: &OperationScope,
        mut term: Term,
        vocabulary: &Iri,
    ) -> GlossaResult<Term> {
        let view = self.services.view(scope)?;
        let ctx = view
            .context_of(vocabulary)
            .cloned()
            .ok_or_else(|| not_found("vocabulary", vocabulary))?;
        if self.services.snapshots.is_snapshot(&term.id)? || self.locate(&term.id, &view)?.is_some() {
            return Err(EntityError::AlreadyExists {
                kind: "term".into(),
                id: term.id.to_string(),
            }
            .into());
        }

        term.vocabulary = None;
        check_languages(&term)?;
        self.normalize_parents(&mut term, vocabulary, &view)?;
        let descriptor = self.descriptor(&term, vocabulary, Purpose::Save, scope, &view)?;
        let mut changes = ChangeSet::new();
        self.write(&term, vocabulary, &descriptor, &mut changes)?;
        self.services.store.apply(&changes)?;

        let mut uow = self.services.hub.unit_of_work();
        uow.record(
            ChangeEvent::new(&term.id, EntityKind::Term, ChangeKind::Persist)
                .in_vocabulary(vocabulary, &ctx)
                .with_parents(BTreeSet::new(), term.all_parents())
                .by(scope.author()),
        );
        uow.commit();
        tracing::info!(term = %term.id, vocabulary = %vocabulary, context = %ctx, "persisted term");

        self.find(scope, &term.id)?
            .ok_or_else(|| not_found("term", &term.id))
    }

    /// Replace the stored state of an existing term with `term`.
    ///
    /// Only statements the term model represents are replaced; anything else
    /// stored about the term is left as it is. The old and new state are
    /// swapped in one store write.
    pub fn update(&self, scope: &OperationScope, mut term: Term) -> GlossaResult<Term> {
        let view = self.services.view(scope)?;
        let (vocabulary, ctx) = self
            .locate(&term.id, &view)?
            .ok_or_else(|| not_found("term", &term.id))?;
        let stored = self.services.store.find(&ctx, &Pattern::subject(&term.id))?;
        let before = read_term(&term.id, &stored).all_parents();

        term.vocabulary = None;
        check_languages(&term)?;
        self.normalize_parents(&mut term, &vocabulary, &view)?;
        let descriptor = self.descriptor(&term, &vocabulary, Purpose::Update, scope, &view)?;
        let mut changes = ChangeSet::new();
        changes.remove(&ctx, stored.into_iter().filter(modelled));
        changes.remove(&ctx, [self.root_statement(&vocabulary, &ctx, &term.id)?]);
        self.write(&term, &vocabulary, &descriptor, &mut changes)?;
        self.services.store.apply(&changes)?;

        let mut uow = self.services.hub.unit_of_work();
        uow.record(
            ChangeEvent::new(&term.id, EntityKind::Term, ChangeKind::Update)
                .in_vocabulary(&vocabulary, &ctx)
                .with_parents(before, term.all_parents())
                .by(scope.author()),
        );
        uow.commit();
        tracing::info!(term = %term.id, vocabulary = %vocabulary, context = %ctx, "updated term");

        self.find(scope, &term.id)?
            .ok_or_else(|| not_found("term", &term.id))
    }

    /// Remove term `id` together with the relationship statements other
    /// terms assert towards it. Refused while the term has sub-terms.
    pub fn remove(&self, scope: &OperationScope, id: &Iri) -> GlossaResult<()> {
        let view = self.services.view(scope)?;
        let (vocabulary, ctx) = self
            .locate(id, &view)?
            .ok_or_else(|| not_found("term", id))?;
        let children = self.services.merger.sub_terms(id, &view, scope.language())?;
        if !children.is_empty() {
            return Err(EntityError::HasSubTerms {
                id: id.to_string(),
                count: children.len(),
            }
            .into());
        }
        let existing = self
            .find_in(scope, &view, id)?
            .ok_or_else(|| not_found("term", id))?;
        let descriptor = self.descriptor(&existing, &vocabulary, Purpose::Update, scope, &view)?;

        let mut changes = ChangeSet::new();
        for kind in RelationshipKind::ALL {
            for other in existing.relationships.get(kind).all() {
                let other_ctx = descriptor.nested_context(&other.id).unwrap_or(&ctx);
                changes.remove(other_ctx, [Statement::link(&other.id, kind.predicate(), id)]);
            }
        }
        changes.remove(&ctx, self.services.store.find(&ctx, &Pattern::subject(id))?);
        changes.remove(&ctx, [self.root_statement(&vocabulary, &ctx, id)?]);
        self.services.store.apply(&changes)?;

        let mut uow = self.services.hub.unit_of_work();
        uow.record(
            ChangeEvent::new(id, EntityKind::Term, ChangeKind::Remove)
                .in_vocabulary(&vocabulary, &ctx)
                .with_parents(existing.all_parents(), BTreeSet::new())
                .by(scope.author()),
        );
        uow.commit();
        tracing::info!(term = %id, vocabulary = %vocabulary, context = %ctx, "removed term");
        Ok(())
    }

    /// Delete the relationship of `kind` between `id` and `other` in both
    /// directions. The statement `other` asserts is removed from the context
    /// of `other`'s vocabulary.
    pub fn remove_relationship(
        &self,
        scope: &OperationScope,
        id: &Iri,
        kind: RelationshipKind,
        other: &Iri,
    ) -> GlossaResult<()> {
        let view = self.services.view(scope)?;
        let (vocabulary, ctx) = self
            .locate(id, &view)?
            .ok_or_else(|| not_found("term", id))?;
        let probe = Term::new(id.clone()).with_relationship(kind, other);
        let descriptor = self.descriptor(&probe, &vocabulary, Purpose::Update, scope, &view)?;

        let predicate = kind.predicate();
        let other_ctx = descriptor.nested_context(other).unwrap_or(&ctx);
        let mut changes = ChangeSet::new();
        changes.remove(&ctx, [Statement::link(id, predicate, other)]);
        changes.remove(other_ctx, [Statement::link(other, predicate, id)]);
        self.services.store.apply(&changes)?;

        let parents = self.stored_parents(id, &ctx)?;
        let mut uow = self.services.hub.unit_of_work();
        uow.record(
            ChangeEvent::new(id, EntityKind::Term, ChangeKind::Update)
                .in_vocabulary(&vocabulary, &ctx)
                .with_parents(parents.clone(), parents)
                .by(scope.author()),
        );
        uow.commit();
        tracing::info!(term = %id, other = %other, %kind, "removed relationship");
        Ok(())
    }

    /// Record the current state of term `id` as a snapshot created at `at`,
    /// next to the live term.
    pub fn create_snapshot(
        &self,
        scope: &OperationScope,
        id: &Iri,
        at: DateTime<Utc>,
    ) -> GlossaResult<Snapshot> {
        let view = self.services.view(scope)?;
        let term = self
            .find_in(scope, &view, id)?
            .ok_or_else(|| not_found("term", id))?;
        let (vocabulary, ctx) = self
            .locate(id, &view)?
            .ok_or_else(|| not_found("term", id))?;
        let mut snapshot = SnapshotResolver::stub(id, EntityKind::Term, at, &term.label);
        snapshot.definition = term.definition.clone();
        snapshot.description = term.description.clone();
        self.services.snapshots.write(&ctx, &snapshot)?;

        let mut uow = self.services.hub.unit_of_work();
        uow.record(
            ChangeEvent::new(&snapshot.id, EntityKind::Snapshot, ChangeKind::Persist)
                .in_vocabulary(&vocabulary, &ctx)
                .by(scope.author()),
        );
        uow.commit();
        tracing::info!(term = %id, snapshot = %snapshot.id, "created term snapshot");
        Ok(snapshot)
    }

    // -----------------------------------------------------------------------
    // Helpers
    // -----------------------------------------------------------------------

    fn stored_parents(&self, id: &Iri, ctx: &ContextId) -> GlossaResult<BTreeSet<Iri>> {
        let statements = self.services.store.find(ctx, &Pattern::subject(id))?;
        Ok(read_term(id, &statements).all_parents())
    }

    /// Re-sort parents into internal and external by the vocabulary they
    /// actually belong to. Parents of unknown vocabulary keep their side.
    fn normalize_parents(
        &self,
        term: &mut Term,
        vocabulary: &Iri,
        view: &ContextView,
    ) -> GlossaResult<()> {
        term.parent_terms.remove(&term.id);
        term.external_parent_terms.remove(&term.id);
        let all = term.all_parents();
        let infos = self.services.merger.describe(&all, view)?;
        let mut internal = BTreeSet::new();
        let mut external = BTreeSet::new();
        for parent in all {
            let is_internal = match infos.get(&parent).and_then(|i| i.vocabulary.as_ref()) {
                Some(v) => v == vocabulary,
                None => term.parent_terms.contains(&parent),
            };
            if is_internal {
                internal.insert(parent);
            } else {
                external.insert(parent);
            }
        }
        term.parent_terms = internal;
        term.external_parent_terms = external;
        Ok(())
    }

    fn descriptor(
        &self,
        term: &Term,
        vocabulary: &Iri,
        purpose: Purpose,
        scope: &OperationScope,
        view: &ContextView,
    ) -> GlossaResult<Descriptor> {
        let mut references: BTreeSet<Iri> = term.external_parent_terms.clone();
        for kind in RelationshipKind::ALL {
            references.extend(term.relationships.get(kind).all().map(|i| i.id.clone()));
        }
        let infos = self.services.merger.describe(&references, view)?;
        Ok(self.services.descriptors.build_for_term(
            term,
            vocabulary,
            purpose,
            scope,
            |r| infos.get(r).and_then(|i| i.vocabulary.clone()),
        )?)
    }

    /// Stage the statements persisting `term`, plus its root membership
    /// when it has no parent in its own vocabulary.
    fn write(
        &self,
        term: &Term,
        vocabulary: &Iri,
        descriptor: &Descriptor,
        changes: &mut ChangeSet,
    ) -> GlossaResult<()> {
        for (attribute, statements) in term_statements(term) {
            if let Some(ctx) = descriptor.write_context(attribute) {
                changes.insert(ctx, statements);
            }
        }

        if term.parent_terms.is_empty() {
            let glossary_descriptor = self.services.descriptors.build(
                EntityKind::Glossary,
                &descriptor.owner,
                Purpose::Update,
            )?;
            if let Some(ctx) = glossary_descriptor.write_context(Attribute::RootTerms) {
                changes.insert(ctx, [self.root_statement(vocabulary, &descriptor.owner, &term.id)?]);
            }
        }
        Ok(())
    }

    /// `glossary skos:hasTopConcept id` for the glossary of `vocabulary` in `ctx`.
    fn root_statement(&self, vocabulary: &Iri, ctx: &ContextId, id: &Iri) -> GlossaResult<Statement> {
        let glossary = self.services.glossary_of(vocabulary, ctx)?;
        Ok(Statement::link(&glossary, skos::HAS_TOP_CONCEPT, id))
    }
}

fn not_found(kind: &str, id: &Iri) -> GlossaError {
    EntityError::NotFound {
        kind: kind.to_string(),
        id: id.to_string(),
    }
    .into()
}

/// Map a term's stored statements onto the model. Relationships, sub-terms
/// and the vocabulary are filled in by the caller.
fn read_term(id: &Iri, statements: &[Statement]) -> Term {
    let mut term = Term::new(id.clone());
    term.draft = false;
    for statement in statements {
        let predicate = statement.predicate.as_str();
        match (predicate, &statement.object) {
            (skos::PREF_LABEL, Value::Literal { value, language: Some(l), .. }) => {
                term.label.set(l.as_str(), value.as_str())
            }
            (skos::DEFINITION, Value::Literal { value, language: Some(l), .. }) => {
                term.definition.set(l.as_str(), value.as_str())
            }
            (dcterms::DESCRIPTION, Value::Literal { value, language: Some(l), .. }) => {
                term.description.set(l.as_str(), value.as_str())
            }
            (skos::ALT_LABEL, Value::Literal { value, language: Some(l), .. }) => {
                term.alt_labels.insert(LangString::new(l.as_str(), value.as_str()));
            }
            (skos::HIDDEN_LABEL, Value::Literal { value, language: Some(l), .. }) => {
                term.hidden_labels.insert(LangString::new(l.as_str(), value.as_str()));
            }
            (skos::BROADER, Value::Iri(parent)) => {
                term.parent_terms.insert(parent.clone());
            }
            (skos::BROAD_MATCH, Value::Iri(parent)) => {
                term.external_parent_terms.insert(parent.clone());
            }
            (glossa::IS_DRAFT, value) => term.draft = value.as_bool().unwrap_or(false),
            (p, object) if !TERM_MODEL_PREDICATES.contains(&p) => {
                term.properties
                    .entry(statement.predicate.clone())
                    .or_default()
                    .insert(object.clone());
            }
            _ => {}
        }
    }
    term
}

/// Whether rewriting a term from its model replaces `statement`. Labels
/// without a language tag, extra types and other shapes the model does not
/// read are kept on update.
fn modelled(statement: &Statement) -> bool {
    let object = &statement.object;
    match statement.predicate.as_str() {
        skos::PREF_LABEL
        | skos::DEFINITION
        | dcterms::DESCRIPTION
        | skos::ALT_LABEL
        | skos::HIDDEN_LABEL => object.language().is_some(),
        skos::BROADER
        | skos::BROAD_MATCH
        | skos::RELATED
        | skos::RELATED_MATCH
        | skos::EXACT_MATCH => object.as_iri().is_some(),
        rdf::TYPE => object.as_iri().is_some_and(|t| t.as_str() == skos::CONCEPT),
        _ => true,
    }
}

/// Reject language tags before anything is staged for the store.
fn check_languages(term: &Term) -> Result<(), ConfigError> {
    let texts = [&term.label, &term.definition, &term.description]
        .into_iter()
        .flat_map(|text| text.iter().map(|(language, _)| language));
    let labels = term
        .alt_labels
        .iter()
        .chain(&term.hidden_labels)
        .map(|label| label.language.as_str());
    let properties = term.properties.values().flatten().filter_map(Value::language);
    for tag in texts.chain(labels).chain(properties) {
        check_language(tag)?;
    }
    Ok(())
}

fn text_statements(id: &Iri, predicate: &str, text: &MultilingualString) -> Vec<Statement> {
    text.iter()
        .map(|(lang, t)| Statement::new(id, predicate, Value::lang(t, lang)))
        .collect()
}

fn label_statements(id: &Iri, predicate: &str, labels: &BTreeSet<LangString>) -> Vec<Statement> {
    labels
        .iter()
        .map(|l| Statement::new(id, predicate, Value::lang(&l.text, &l.language)))
        .collect()
}

fn link_statements<'a>(
    id: &Iri,
    predicate: &str,
    targets: impl IntoIterator<Item = &'a Iri>,
) -> Vec<Statement> {
    targets
        .into_iter()
        .filter(|t| *t != id)
        .map(|t| Statement::link(id, predicate, t))
        .collect()
}

/// The statements persisting `term`, grouped by attribute.
fn term_statements(term: &Term) -> Vec<(Attribute, Vec<Statement>)> {
    let id = &term.id;
    let forward = |kind: RelationshipKind| {
        link_statements(
            id,
            kind.predicate(),
            term.relationships.get(kind).forward.iter().map(|i| &i.id),
        )
    };
    let properties = term
        .properties
        .iter()
        .filter(|(p, _)| !TERM_MODEL_PREDICATES.contains(&p.as_str()))
        .flat_map(|(p, values)| {
            values
                .iter()
                .map(move |v| Statement::new(id, p.as_str(), v.clone()))
        })
        .collect();
    vec![
        (
            Attribute::Types,
            vec![Statement::link(id, rdf::TYPE, &Iri::known(skos::CONCEPT))],
        ),
        (Attribute::Label, text_statements(id, skos::PREF_LABEL, &term.label)),
        (Attribute::Definition, text_statements(id, skos::DEFINITION, &term.definition)),
        (Attribute::Description, text_statements(id, dcterms::DESCRIPTION, &term.description)),
        (Attribute::AltLabels, label_statements(id, skos::ALT_LABEL, &term.alt_labels)),
        (Attribute::HiddenLabels, label_statements(id, skos::HIDDEN_LABEL, &term.hidden_labels)),
        (Attribute::Parents, link_statements(id, skos::BROADER, &term.parent_terms)),
        (
            Attribute::ExternalParents,
            link_statements(id, skos::BROAD_MATCH, &term.external_parent_terms),
        ),
        (Attribute::Related, forward(RelationshipKind::Related)),
        (Attribute::RelatedMatch, forward(RelationshipKind::RelatedMatch)),
        (Attribute::ExactMatch, forward(RelationshipKind::ExactMatch)),
        (
            Attribute::Draft,
            vec![Statement::new(id, glossa::IS_DRAFT, Value::boolean(term.draft))],
        ),
        (Attribute::Properties, properties),
    ]
}
