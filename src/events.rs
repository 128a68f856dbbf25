//! Change notification: one event per logical mutation.
//!
//! Repositories collect the events of one operation in a [`UnitOfWork`] and
//! publish them through the [`ChangeHub`] only when the operation commits.
//! Subscribers are the listing cache, the [`LastModifiedTracker`] and the
//! change-record writer.

use std::collections::BTreeSet;
use std::sync::{Arc, Mutex, RwLock};

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};

use crate::context::{ContextId, Iri};
use crate::model::EntityKind;

/// The operation a change event reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeKind {
    Persist,
    Update,
    Remove,
}

impl ChangeKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Persist => "persist",
            Self::Update => "update",
            Self::Remove => "remove",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "persist" => Some(Self::Persist),
            "update" => Some(Self::Update),
            "remove" => Some(Self::Remove),
            _ => None,
        }
    }

    /// Fold a later change of the same entity into this one.
    fn then(self, later: ChangeKind) -> ChangeKind {
        match (self, later) {
            (_, Self::Remove) => Self::Remove,
            (Self::Persist, _) => Self::Persist,
            (_, later) => later,
        }
    }
}

impl std::fmt::Display for ChangeKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Identity of a changed entity.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EntityRef {
    pub id: Iri,
    pub kind: EntityKind,
}

/// A committed mutation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangeEvent {
    pub entity: EntityRef,
    pub change: ChangeKind,
    /// Owning vocabulary (the vocabulary itself for vocabulary events).
    pub vocabulary: Option<Iri>,
    /// Context the mutation was written to.
    pub context: Option<ContextId>,
    /// Parents of a term before the mutation.
    pub parents_before: BTreeSet<Iri>,
    /// Parents of a term after the mutation.
    pub parents_after: BTreeSet<Iri>,
    pub author: Option<String>,
    pub at: DateTime<Utc>,
}

impl ChangeEvent {
    pub fn new(id: &Iri, kind: EntityKind, change: ChangeKind) -> Self {
        Self {
            entity: EntityRef {
                id: id.clone(),
                kind,
            },
            change,
            vocabulary: None,
            context: None,
            parents_before: BTreeSet::new(),
            parents_after: BTreeSet::new(),
            author: None,
            at: Utc::now(),
        }
    }

    pub fn in_vocabulary(mut self, vocabulary: &Iri, context: &ContextId) -> Self {
        self.vocabulary = Some(vocabulary.clone());
        self.context = Some(context.clone());
        self
    }

    pub fn with_parents(mut self, before: BTreeSet<Iri>, after: BTreeSet<Iri>) -> Self {
        self.parents_before = before;
        self.parents_after = after;
        self
    }

    pub fn by(mut self, author: Option<&str>) -> Self {
        self.author = author.map(str::to_string);
        self
    }

    /// Parents before and after, combined.
    pub fn affected_parents(&self) -> BTreeSet<&Iri> {
        self.parents_before.iter().chain(&self.parents_after).collect()
    }

    /// Whether the term's position in the hierarchy changed.
    pub fn is_structural(&self) -> bool {
        self.change != ChangeKind::Update || self.parents_before != self.parents_after
    }
}

/// A subscriber to committed change events.
pub trait ChangeListener: Send + Sync {
    /// Handle one event. Must not fail the committing operation.
    fn on_change(&self, event: &ChangeEvent);

    /// Handle the events of one committed operation.
    fn on_batch(&self, events: &[ChangeEvent]) {
        for e in events {
            self.on_change(e);
        }
    }
}

/// Fan-out of change events to subscribers, in subscription order.
#[derive(Default)]
pub struct ChangeHub {
    listeners: RwLock<Vec<Arc<dyn ChangeListener>>>,
}

impl ChangeHub {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&self, listener: Arc<dyn ChangeListener>) {
        self.listeners
            .write()
            .expect("change hub lock poisoned")
            .push(listener);
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.read().expect("change hub lock poisoned").len()
    }

    /// Deliver `events` to every listener.
    pub fn publish(&self, events: &[ChangeEvent]) {
        if events.is_empty() {
            return;
        }
        let listeners = self.listeners.read().expect("change hub lock poisoned").clone();
        for listener in &listeners {
            listener.on_batch(events);
        }
    }

    /// Start collecting the events of one logical operation.
    pub fn unit_of_work(&self) -> UnitOfWork<'_> {
        UnitOfWork {
            hub: self,
            pending: Vec::new(),
        }
    }
}

impl std::fmt::Debug for ChangeHub {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChangeHub")
            .field("listeners", &self.listener_count())
            .finish()
    }
}

/// Events of one logical operation, published together on [`commit`].
/// Dropping the unit without committing discards them.
///
/// [`commit`]: UnitOfWork::commit
pub struct UnitOfWork<'a> {
    hub: &'a ChangeHub,
    pending: Vec<ChangeEvent>,
}

impl UnitOfWork<'_> {
    /// Record an event. Repeated changes of one entity fold into one event.
    pub fn record(&mut self, event: ChangeEvent) {
        if let Some(existing) = self.pending.iter_mut().find(|e| e.entity == event.entity) {
            existing.change = existing.change.then(event.change);
            existing.parents_after = event.parents_after;
            existing.at = event.at;
            if existing.vocabulary.is_none() {
                existing.vocabulary = event.vocabulary;
            }
            if existing.context.is_none() {
                existing.context = event.context;
            }
            return;
        }
        self.pending.push(event);
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    /// Publish the collected events; returns how many were published.
    pub fn commit(self) -> usize {
        let n = self.pending.len();
        self.hub.publish(&self.pending);
        n
    }
}

/// Last modification time per entity kind, for conditional-request headers.
#[derive(Debug)]
pub struct LastModifiedTracker {
    stamps: DashMap<EntityKind, DateTime<Utc>>,
}

impl LastModifiedTracker {
    /// Every kind starts at `started`.
    pub fn new(started: DateTime<Utc>) -> Self {
        let stamps = DashMap::new();
        for kind in EntityKind::ALL {
            stamps.insert(kind, started);
        }
        Self { stamps }
    }

    pub fn get(&self, kind: EntityKind) -> Option<DateTime<Utc>> {
        self.stamps.get(&kind).map(|v| *v)
    }

    /// Move the stamp of `kind` forward to `at`. Never moves backwards.
    pub fn touch(&self, kind: EntityKind, at: DateTime<Utc>) {
        self.stamps
            .entry(kind)
            .and_modify(|v| *v = (*v).max(at))
            .or_insert(at);
    }
}

impl ChangeListener for LastModifiedTracker {
    fn on_change(&self, event: &ChangeEvent) {
        self.touch(event.entity.kind, event.at);
        // Root membership lives in the glossary.
        if event.entity.kind == EntityKind::Term && event.is_structural() {
            self.touch(EntityKind::Glossary, event.at);
        }
    }
}

/// Collects events in memory.
#[derive(Debug, Default)]
pub struct VecListener {
    events: Mutex<Vec<ChangeEvent>>,
}

impl VecListener {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<ChangeEvent> {
        self.events.lock().expect("listener lock poisoned").clone()
    }

    pub fn len(&self) -> usize {
        self.events.lock().expect("listener lock poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl ChangeListener for VecListener {
    fn on_change(&self, event: &ChangeEvent) {
        self.events
            .lock()
            .expect("listener lock poisoned")
            .push(event.clone());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn iri(s: &str) -> Iri {
        Iri::new(s).unwrap()
    }

    #[test]
    fn commit_publishes_once_per_entity() {
        let hub = ChangeHub::new();
        let sink = Arc::new(VecListener::new());
        hub.subscribe(sink.clone());

        let t = iri("https://example.org/v/term/t");
        let p = iri("https://example.org/v/term/p");
        let mut uow = hub.unit_of_work();
        uow.record(ChangeEvent::new(&t, EntityKind::Term, ChangeKind::Persist));
        uow.record(
            ChangeEvent::new(&t, EntityKind::Term, ChangeKind::Update)
                .with_parents(BTreeSet::new(), [p.clone()].into()),
        );
        assert!(sink.is_empty());
        assert_eq!(uow.commit(), 1);

        let events = sink.events();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].change, ChangeKind::Persist);
        assert!(events[0].parents_after.contains(&p));
    }

    #[test]
    fn dropped_unit_publishes_nothing() {
        let hub = ChangeHub::new();
        let sink = Arc::new(VecListener::new());
        hub.subscribe(sink.clone());
        {
            let mut uow = hub.unit_of_work();
            uow.record(ChangeEvent::new(
                &iri("https://example.org/t"),
                EntityKind::Term,
                ChangeKind::Remove,
            ));
        }
        assert!(sink.is_empty());
    }

    #[test]
    fn remove_wins_when_folding() {
        assert_eq!(ChangeKind::Persist.then(ChangeKind::Remove), ChangeKind::Remove);
        assert_eq!(ChangeKind::Update.then(ChangeKind::Update), ChangeKind::Update);
        assert_eq!(ChangeKind::Persist.then(ChangeKind::Update), ChangeKind::Persist);
    }

    #[test]
    fn tracker_only_moves_forward() {
        let start = Utc::now();
        let tracker = LastModifiedTracker::new(start);
        assert_eq!(tracker.get(EntityKind::Vocabulary), Some(start));

        let later = start + chrono::Duration::seconds(5);
        let mut event = ChangeEvent::new(&iri("https://example.org/t"), EntityKind::Term, ChangeKind::Persist);
        event.at = later;
        tracker.on_change(&event);
        assert_eq!(tracker.get(EntityKind::Term), Some(later));
        assert_eq!(tracker.get(EntityKind::Glossary), Some(later));

        tracker.touch(EntityKind::Term, start);
        assert_eq!(tracker.get(EntityKind::Term), Some(later));
    }
}
