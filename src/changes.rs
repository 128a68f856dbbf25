//! Change records: who changed which entity when, and the "recently modified"
//! projection computed from them.
//!
//! Writing change records is never on the correctness path: the
//! [`ChangeRecorder`] listener logs sink failures and carries on.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::context::{ContextId, Iri};
use crate::error::StoreResult;
use crate::events::{ChangeEvent, ChangeKind, ChangeListener, EntityRef};
use crate::model::{EntityKind, MultilingualString};
use crate::ns::{self, glossa, rdf};
use crate::snapshot::exclusion_fragment;
use crate::store::{GraphStore, Statement, Value};

/// One persisted change record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangeRecord {
    pub id: Iri,
    pub entity: EntityRef,
    pub change: ChangeKind,
    pub author: Option<String>,
    pub at: DateTime<Utc>,
}

/// A destination for change records.
pub trait ChangeRecordSink: Send + Sync {
    fn record(&self, record: &ChangeRecord) -> StoreResult<()>;
}

/// Discards every record.
#[derive(Debug, Default)]
pub struct NoopChangeRecords;

impl ChangeRecordSink for NoopChangeRecords {
    fn record(&self, _record: &ChangeRecord) -> StoreResult<()> {
        Ok(())
    }
}

/// An entity with its most recent change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RecentlyModifiedAsset {
    pub id: Iri,
    pub label: MultilingualString,
    pub kind: EntityKind,
    pub modified: DateTime<Utc>,
    pub author: Option<String>,
    pub change: ChangeKind,
}

/// Change records kept in a dedicated context of the graph store.
pub struct StoreChangeRecords {
    store: Arc<dyn GraphStore>,
    context: ContextId,
    seq: AtomicU64,
}

impl StoreChangeRecords {
    pub fn new(store: Arc<dyn GraphStore>) -> Self {
        Self {
            store,
            context: ContextId::new(Iri::known(glossa::CHANGES_CONTEXT)),
            seq: AtomicU64::new(0),
        }
    }

    /// The context the records live in.
    pub fn context(&self) -> &ContextId {
        &self.context
    }

    fn next_id(&self, at: DateTime<Utc>) -> Iri {
        let seq = self.seq.fetch_add(1, Ordering::Relaxed);
        let nanos = at.timestamp_nanos_opt().unwrap_or_default();
        Iri::known(format!("urn:glossa:change:{nanos}-{seq}"))
    }

    /// Build the record for a committed event.
    pub fn record_for(&self, event: &ChangeEvent) -> ChangeRecord {
        ChangeRecord {
            id: self.next_id(event.at),
            entity: event.entity.clone(),
            change: event.change,
            author: event.author.clone(),
            at: event.at,
        }
    }

    /// All records, oldest first.
    pub fn find_all(&self) -> StoreResult<Vec<ChangeRecord>> {
        let query = ns::prefixed(&format!(
            "SELECT ?r ?entity ?kind ?change ?at ?author WHERE {{ GRAPH {} {{ \
                ?r a glossa:ChangeRecord ; glossa:changedEntity ?entity ; glossa:entityKind ?kind ; \
                   glossa:changeKind ?change ; glossa:timestamp ?at . \
                OPTIONAL {{ ?r glossa:author ?author }} \
             }} }}",
            self.context.to_sparql()
        ));
        let mut records: Vec<ChangeRecord> = self
            .store
            .select(&query)?
            .iter()
            .filter_map(|row| {
                Some(ChangeRecord {
                    id: row.iri("r")?.clone(),
                    entity: EntityRef {
                        id: row.iri("entity")?.clone(),
                        kind: EntityKind::parse(row.literal("kind")?)?,
                    },
                    change: ChangeKind::parse(row.literal("change")?)?,
                    author: row.literal("author").map(str::to_string),
                    at: row.get("at")?.as_date_time()?,
                })
            })
            .collect();
        records.sort_by(|a, b| a.at.cmp(&b.at).then_with(|| a.id.cmp(&b.id)));
        Ok(records)
    }

    /// Records of one entity, oldest first.
    pub fn find_for(&self, entity: &Iri) -> StoreResult<Vec<ChangeRecord>> {
        Ok(self
            .find_all()?
            .into_iter()
            .filter(|r| &r.entity.id == entity)
            .collect())
    }

    /// The `limit` most recently changed terms and vocabularies, newest first.
    ///
    /// Only the latest change per entity counts. Entities whose latest change
    /// removed them, snapshots and entities no longer in the store are skipped.
    pub fn find_last_edited(&self, limit: usize) -> StoreResult<Vec<RecentlyModifiedAsset>> {
        let mut latest: BTreeMap<Iri, ChangeRecord> = BTreeMap::new();
        for record in self.find_all()? {
            if !matches!(record.entity.kind, EntityKind::Term | EntityKind::Vocabulary) {
                continue;
            }
            latest.insert(record.entity.id.clone(), record);
        }

        let mut candidates: Vec<ChangeRecord> = latest
            .into_values()
            .filter(|r| r.change != ChangeKind::Remove)
            .collect();
        candidates.sort_by(|a, b| b.at.cmp(&a.at).then_with(|| b.entity.id.cmp(&a.entity.id)));

        let mut assets = Vec::new();
        for record in candidates {
            if assets.len() >= limit {
                break;
            }
            let Some(label) = self.live_label(&record.entity)? else {
                continue;
            };
            assets.push(RecentlyModifiedAsset {
                id: record.entity.id,
                label,
                kind: record.entity.kind,
                modified: record.at,
                author: record.author,
                change: record.change,
            });
        }
        Ok(assets)
    }

    /// Label of a live (non-snapshot) entity, `None` if it no longer exists.
    fn live_label(&self, entity: &EntityRef) -> StoreResult<Option<MultilingualString>> {
        let (class, label) = match entity.kind {
            EntityKind::Vocabulary => ("glossa:Vocabulary", "dcterms:title"),
            _ => ("skos:Concept", "skos:prefLabel"),
        };
        let query = ns::prefixed(&format!(
            "SELECT ?label WHERE {{ BIND({} AS ?e) GRAPH ?g {{ ?e a {class} . OPTIONAL {{ ?e {label} ?label }} }} {} }}",
            entity.id.to_sparql(),
            exclusion_fragment("e")
        ));
        let rows = self.store.select(&query)?;
        if rows.is_empty() {
            return Ok(None);
        }
        let mut text = MultilingualString::new();
        for row in rows {
            if let Some(Value::Literal {
                value,
                language: Some(lang),
                ..
            }) = row.get("label")
            {
                text.set(lang.as_str(), value.as_str());
            }
        }
        Ok(Some(text))
    }
}

impl ChangeRecordSink for StoreChangeRecords {
    fn record(&self, record: &ChangeRecord) -> StoreResult<()> {
        let r = &record.id;
        let mut statements = vec![
            Statement::link(r, rdf::TYPE, &Iri::known(glossa::CHANGE_RECORD)),
            Statement::link(r, glossa::CHANGED_ENTITY, &record.entity.id),
            Statement::new(r, glossa::ENTITY_KIND, Value::string(record.entity.kind.as_str())),
            Statement::new(r, glossa::CHANGE_KIND, Value::string(record.change.as_str())),
            Statement::new(r, glossa::TIMESTAMP, Value::date_time(record.at)),
        ];
        if let Some(author) = &record.author {
            statements.push(Statement::new(r, glossa::AUTHOR, Value::string(author)));
        }
        self.store.insert(&self.context, &statements)
    }
}

impl std::fmt::Debug for StoreChangeRecords {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StoreChangeRecords")
            .field("context", &self.context)
            .finish()
    }
}

/// Listener turning change events into change records.
pub struct ChangeRecorder {
    records: Arc<StoreChangeRecords>,
    sink: Arc<dyn ChangeRecordSink>,
}

impl ChangeRecorder {
    /// Record into `records` itself.
    pub fn new(records: Arc<StoreChangeRecords>) -> Self {
        let sink: Arc<dyn ChangeRecordSink> = records.clone();
        Self { records, sink }
    }

    /// Record into a different sink, using `records` only for identifiers.
    pub fn with_sink(records: Arc<StoreChangeRecords>, sink: Arc<dyn ChangeRecordSink>) -> Self {
        Self { records, sink }
    }
}

impl ChangeListener for ChangeRecorder {
    fn on_change(&self, event: &ChangeEvent) {
        if matches!(event.entity.kind, EntityKind::ChangeRecord | EntityKind::Snapshot) {
            return;
        }
        let record = self.records.record_for(event);
        if let Err(e) = self.sink.record(&record) {
            tracing::warn!(
                entity = %event.entity.id,
                change = %event.change,
                error = %e,
                "failed to write change record"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::StoreError;
    use crate::ns::skos;
    use crate::store::SparqlStore;

    fn iri(s: &str) -> Iri {
        Iri::new(s).unwrap()
    }

    struct FailingSink;

    impl ChangeRecordSink for FailingSink {
        fn record(&self, _record: &ChangeRecord) -> StoreResult<()> {
            Err(StoreError::Persistence {
                message: "disk full".into(),
            })
        }
    }

    fn concept(store: &SparqlStore, id: &Iri, label: &str) {
        let ctx = ContextId::parse("https://example.org/v").unwrap();
        store
            .insert(
                &ctx,
                &[
                    Statement::link(id, rdf::TYPE, &Iri::known(skos::CONCEPT)),
                    Statement::new(id, skos::PREF_LABEL, Value::lang(label, "en")),
                ],
            )
            .unwrap();
    }

    fn event_at(id: &Iri, change: ChangeKind, secs: i64) -> ChangeEvent {
        let mut e = ChangeEvent::new(id, EntityKind::Term, change).by(Some("editor"));
        e.at = DateTime::from_timestamp(1_700_000_000 + secs, 0).unwrap();
        e
    }

    #[test]
    fn latest_change_per_entity_newest_first() {
        let store = Arc::new(SparqlStore::in_memory().unwrap());
        let a = iri("https://example.org/v/term/a");
        let b = iri("https://example.org/v/term/b");
        let gone = iri("https://example.org/v/term/gone");
        concept(&store, &a, "A");
        concept(&store, &b, "B");

        let records = Arc::new(StoreChangeRecords::new(store.clone()));
        let recorder = ChangeRecorder::new(records.clone());
        recorder.on_change(&event_at(&a, ChangeKind::Persist, 0));
        recorder.on_change(&event_at(&b, ChangeKind::Persist, 1));
        recorder.on_change(&event_at(&a, ChangeKind::Update, 2));
        recorder.on_change(&event_at(&gone, ChangeKind::Persist, 3));
        recorder.on_change(&event_at(&gone, ChangeKind::Remove, 4));

        let recent = records.find_last_edited(10).unwrap();
        let ids: Vec<_> = recent.iter().map(|r| r.id.clone()).collect();
        assert_eq!(ids, vec![a.clone(), b]);
        assert_eq!(recent[0].change, ChangeKind::Update);
        assert_eq!(recent[0].author.as_deref(), Some("editor"));
        assert_eq!(recent[0].label.get("en"), Some("A"));

        assert_eq!(records.find_last_edited(1).unwrap().len(), 1);
        assert_eq!(records.find_for(&a).unwrap().len(), 2);
    }

    #[test]
    fn sink_failure_is_swallowed() {
        let store = Arc::new(SparqlStore::in_memory().unwrap());
        let records = Arc::new(StoreChangeRecords::new(store.clone()));
        let recorder = ChangeRecorder::with_sink(records.clone(), Arc::new(FailingSink));
        recorder.on_change(&event_at(&iri("https://example.org/t"), ChangeKind::Persist, 0));
        assert!(records.find_all().unwrap().is_empty());
    }
}
