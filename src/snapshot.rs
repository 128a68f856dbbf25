//! Snapshots: immutable, timestamped version stubs of terms and vocabularies.
//!
//! A snapshot carries the `glossa:Snapshot` marker type, a `glossa:versionOf`
//! back-reference and a creation timestamp. Listings, hierarchy traversal and
//! search exclude snapshots with [`exclusion_fragment`] inside the query;
//! explicit lookup and [`SnapshotResolver::find_valid_at`] still reach them.

use std::sync::Arc;

use chrono::{DateTime, Utc};

use crate::context::{ContextId, Iri};
use crate::error::StoreResult;
use crate::identifier::snapshot_identifier;
use crate::model::{EntityKind, MultilingualString, Snapshot};
use crate::ns::{self, dcterms, glossa, rdf, skos};
use crate::store::{GraphStore, Statement, Value};

/// SPARQL filter excluding bindings of `?{var}` that are snapshots in any context.
///
/// Exposed for search and export services that build their own queries.
pub fn exclusion_fragment(var: &str) -> String {
    format!("FILTER NOT EXISTS {{ GRAPH ?snapshot_graph_{var} {{ ?{var} a glossa:Snapshot }} }}")
}

/// Reads and writes snapshot stubs.
pub struct SnapshotResolver {
    store: Arc<dyn GraphStore>,
}

impl SnapshotResolver {
    pub fn new(store: Arc<dyn GraphStore>) -> Self {
        Self { store }
    }

    /// Whether `id` carries the snapshot marker in any context.
    pub fn is_snapshot(&self, id: &Iri) -> StoreResult<bool> {
        self.store.ask(&ns::prefixed(&format!(
            "ASK {{ GRAPH ?g {{ {} a glossa:Snapshot }} }}",
            id.to_sparql()
        )))
    }

    /// The snapshot record for `id`, if `id` is a snapshot.
    pub fn find(&self, id: &Iri) -> StoreResult<Option<Snapshot>> {
        let s = id.to_sparql();
        let rows = self.store.select(&ns::prefixed(&format!(
            "SELECT ?of ?created ?vocab WHERE {{ GRAPH ?g {{ \
                {s} a glossa:Snapshot ; glossa:versionOf ?of ; glossa:snapshotCreated ?created . \
                OPTIONAL {{ {s} a glossa:VocabularySnapshot . BIND(true AS ?vocab) }} \
             }} }} LIMIT 1"
        )))?;
        let Some(row) = rows.first() else {
            return Ok(None);
        };
        let (Some(version_of), Some(created)) = (
            row.iri("of").cloned(),
            row.get("created").and_then(Value::as_date_time),
        ) else {
            return Ok(None);
        };
        let kind = if row.get("vocab").is_some() {
            EntityKind::Vocabulary
        } else {
            EntityKind::Term
        };

        let mut snapshot = Snapshot {
            id: id.clone(),
            version_of,
            kind,
            created,
            label: MultilingualString::new(),
            definition: MultilingualString::new(),
            description: MultilingualString::new(),
        };
        let texts = self.store.select(&ns::prefixed(&format!(
            "SELECT ?p ?o WHERE {{ GRAPH ?g {{ {s} ?p ?o }} \
             FILTER(?p IN (skos:prefLabel, dcterms:title, skos:definition, dcterms:description)) }}"
        )))?;
        for row in texts {
            let (Some(p), Some(value)) = (row.iri("p"), row.get("o")) else {
                continue;
            };
            let (Some(text), Some(lang)) = (value.as_literal(), value.language()) else {
                continue;
            };
            let target = match p.as_str() {
                skos::PREF_LABEL | dcterms::TITLE => &mut snapshot.label,
                skos::DEFINITION => &mut snapshot.definition,
                dcterms::DESCRIPTION => &mut snapshot.description,
                _ => continue,
            };
            target.set(lang, text);
        }
        Ok(Some(snapshot))
    }

    /// Snapshots of `original`, newest first. Equal timestamps order by
    /// descending identifier.
    pub fn find_snapshots(&self, original: &Iri) -> StoreResult<Vec<Snapshot>> {
        let rows = self.store.select(&ns::prefixed(&format!(
            "SELECT DISTINCT ?s WHERE {{ GRAPH ?g {{ ?s a glossa:Snapshot ; glossa:versionOf {} }} }}",
            original.to_sparql()
        )))?;
        let mut snapshots = Vec::with_capacity(rows.len());
        for row in &rows {
            if let Some(id) = row.iri("s") {
                if let Some(snapshot) = self.find(id)? {
                    snapshots.push(snapshot);
                }
            }
        }
        snapshots.sort_by(|a, b| b.created.cmp(&a.created).then_with(|| b.id.cmp(&a.id)));
        Ok(snapshots)
    }

    /// The latest snapshot of `original` created at or before `at`.
    /// `None` means the live entity is the valid version.
    pub fn find_valid_at(&self, original: &Iri, at: DateTime<Utc>) -> StoreResult<Option<Snapshot>> {
        let snapshots = self.find_snapshots(original)?;
        let valid = snapshots.into_iter().find(|s| s.created <= at);
        tracing::debug!(
            entity = %original,
            at = %at,
            snapshot = valid.as_ref().map(|s| s.id.as_str()).unwrap_or("<live>"),
            "resolved version"
        );
        Ok(valid)
    }

    /// Write a stub for `snapshot` into `context`.
    pub fn write(&self, context: &ContextId, snapshot: &Snapshot) -> StoreResult<()> {
        let id = &snapshot.id;
        let (live_type, kind_type, label_predicate) = match snapshot.kind {
            EntityKind::Vocabulary => (glossa::VOCABULARY, glossa::VOCABULARY_SNAPSHOT, dcterms::TITLE),
            _ => (skos::CONCEPT, glossa::TERM_SNAPSHOT, skos::PREF_LABEL),
        };
        let mut statements = vec![
            Statement::link(id, rdf::TYPE, &Iri::known(live_type)),
            Statement::link(id, rdf::TYPE, &Iri::known(glossa::SNAPSHOT)),
            Statement::link(id, rdf::TYPE, &Iri::known(kind_type)),
            Statement::link(id, glossa::VERSION_OF, &snapshot.version_of),
            Statement::new(id, glossa::SNAPSHOT_CREATED, Value::date_time(snapshot.created)),
        ];
        for (predicate, texts) in [
            (label_predicate, &snapshot.label),
            (skos::DEFINITION, &snapshot.definition),
            (dcterms::DESCRIPTION, &snapshot.description),
        ] {
            for (lang, text) in texts.iter() {
                statements.push(Statement::new(id, predicate, Value::lang(text, lang)));
            }
        }
        self.store.insert(context, &statements)
    }

    /// Build the snapshot record of `original` created at `created`.
    pub fn stub(
        original: &Iri,
        kind: EntityKind,
        created: DateTime<Utc>,
        label: &MultilingualString,
    ) -> Snapshot {
        Snapshot {
            id: snapshot_identifier(original, created),
            version_of: original.clone(),
            kind,
            created,
            label: label.clone(),
            definition: MultilingualString::new(),
            description: MultilingualString::new(),
        }
    }
}

impl std::fmt::Debug for SnapshotResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SnapshotResolver").finish()
    }
}
