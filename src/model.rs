//! Thesaurus data model: vocabularies, glossaries, terms and snapshots.

use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::context::Iri;
use crate::ns::skos;
use crate::store::Value;

/// The kinds of entity the thesaurus reads and writes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    Vocabulary,
    Glossary,
    Term,
    Snapshot,
    ChangeRecord,
}

impl EntityKind {
    pub const ALL: [EntityKind; 5] = [
        EntityKind::Vocabulary,
        EntityKind::Glossary,
        EntityKind::Term,
        EntityKind::Snapshot,
        EntityKind::ChangeRecord,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Vocabulary => "vocabulary",
            Self::Glossary => "glossary",
            Self::Term => "term",
            Self::Snapshot => "snapshot",
            Self::ChangeRecord => "change_record",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|k| k.as_str() == s)
    }
}

impl std::fmt::Display for EntityKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Language tag → text.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MultilingualString(BTreeMap<String, String>);

impl MultilingualString {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(language: impl Into<String>, text: impl Into<String>) -> Self {
        let mut s = Self::new();
        s.set(language, text);
        s
    }

    pub fn set(&mut self, language: impl Into<String>, text: impl Into<String>) {
        self.0.insert(language.into(), text.into());
    }

    pub fn get(&self, language: &str) -> Option<&str> {
        self.0.get(language).map(String::as_str)
    }

    /// Text in `language`, or else in the first available language (tag order).
    pub fn get_or_fallback(&self, language: &str) -> Option<&str> {
        self.get(language)
            .or_else(|| self.0.values().next().map(String::as_str))
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(l, t)| (l.as_str(), t.as_str()))
    }
}

/// A single language-tagged string, used for alternative and hidden labels.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct LangString {
    pub language: String,
    pub text: String,
}

impl LangString {
    pub fn new(language: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            language: language.into(),
            text: text.into(),
        }
    }
}

/// Lightweight term summary: identifier, label and (inferred) vocabulary.
///
/// Equality and ordering consider the identifier only, so sets of term infos
/// never hold the same term twice under different labels.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TermInfo {
    pub id: Iri,
    pub label: MultilingualString,
    pub vocabulary: Option<Iri>,
}

impl TermInfo {
    pub fn new(id: Iri) -> Self {
        Self {
            id,
            label: MultilingualString::new(),
            vocabulary: None,
        }
    }
}

impl PartialEq for TermInfo {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for TermInfo {}

impl PartialOrd for TermInfo {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for TermInfo {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.id.cmp(&other.id)
    }
}

impl std::hash::Hash for TermInfo {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

/// A root-listing entry: a term plus its sorted sub-terms.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TermNode {
    pub info: TermInfo,
    pub sub_terms: Vec<TermInfo>,
}

/// Symmetric relationship kinds with forward/inverse views.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RelationshipKind {
    Related,
    RelatedMatch,
    ExactMatch,
}

impl RelationshipKind {
    pub const ALL: [RelationshipKind; 3] = [
        RelationshipKind::Related,
        RelationshipKind::RelatedMatch,
        RelationshipKind::ExactMatch,
    ];

    pub fn predicate(self) -> &'static str {
        match self {
            Self::Related => skos::RELATED,
            Self::RelatedMatch => skos::RELATED_MATCH,
            Self::ExactMatch => skos::EXACT_MATCH,
        }
    }

    /// Match relationships point into other (imported) vocabularies.
    pub fn crosses_vocabularies(self) -> bool {
        !matches!(self, Self::Related)
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "related" => Some(Self::Related),
            "related_match" | "relatedMatch" => Some(Self::RelatedMatch),
            "exact_match" | "exactMatch" => Some(Self::ExactMatch),
            _ => None,
        }
    }
}

impl std::fmt::Display for RelationshipKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::Related => "related",
            Self::RelatedMatch => "related_match",
            Self::ExactMatch => "exact_match",
        })
    }
}

/// Asserted (`forward`) and inferred (`inverse`) relationships of one kind.
///
/// `inverse` never contains the term itself nor anything in `forward`, and is
/// never persisted.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelationshipSet {
    pub forward: BTreeSet<TermInfo>,
    pub inverse: BTreeSet<TermInfo>,
}

impl RelationshipSet {
    /// Forward and inverse, combined.
    pub fn all(&self) -> impl Iterator<Item = &TermInfo> {
        self.forward.iter().chain(self.inverse.iter())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Relationships {
    pub related: RelationshipSet,
    pub related_match: RelationshipSet,
    pub exact_match: RelationshipSet,
}

impl Relationships {
    pub fn get(&self, kind: RelationshipKind) -> &RelationshipSet {
        match kind {
            RelationshipKind::Related => &self.related,
            RelationshipKind::RelatedMatch => &self.related_match,
            RelationshipKind::ExactMatch => &self.exact_match,
        }
    }

    pub fn get_mut(&mut self, kind: RelationshipKind) -> &mut RelationshipSet {
        match kind {
            RelationshipKind::Related => &mut self.related,
            RelationshipKind::RelatedMatch => &mut self.related_match,
            RelationshipKind::ExactMatch => &mut self.exact_match,
        }
    }
}

/// A thesaurus term.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Term {
    pub id: Iri,
    pub label: MultilingualString,
    pub definition: MultilingualString,
    pub description: MultilingualString,
    pub alt_labels: BTreeSet<LangString>,
    pub hidden_labels: BTreeSet<LangString>,
    /// Parents in the same vocabulary (`skos:broader`).
    pub parent_terms: BTreeSet<Iri>,
    /// Parents in other vocabularies (`skos:broadMatch`).
    pub external_parent_terms: BTreeSet<Iri>,
    /// Children, sorted by label. Read-only.
    pub sub_terms: Vec<TermInfo>,
    pub relationships: Relationships,
    pub draft: bool,
    /// Inferred from graph membership on read, never written.
    pub vocabulary: Option<Iri>,
    /// Extended properties: predicate → stored values, language tags and
    /// datatypes included.
    pub properties: BTreeMap<Iri, BTreeSet<Value>>,
}

impl Term {
    pub fn new(id: Iri) -> Self {
        Self {
            id,
            label: MultilingualString::new(),
            definition: MultilingualString::new(),
            description: MultilingualString::new(),
            alt_labels: BTreeSet::new(),
            hidden_labels: BTreeSet::new(),
            parent_terms: BTreeSet::new(),
            external_parent_terms: BTreeSet::new(),
            sub_terms: Vec::new(),
            relationships: Relationships::default(),
            draft: true,
            vocabulary: None,
            properties: BTreeMap::new(),
        }
    }

    pub fn with_label(mut self, language: &str, text: &str) -> Self {
        self.label.set(language, text);
        self
    }

    pub fn with_definition(mut self, language: &str, text: &str) -> Self {
        self.definition.set(language, text);
        self
    }

    pub fn with_parent(mut self, parent: &Iri) -> Self {
        self.parent_terms.insert(parent.clone());
        self
    }

    pub fn with_external_parent(mut self, parent: &Iri) -> Self {
        self.external_parent_terms.insert(parent.clone());
        self
    }

    /// Assert a forward relationship of `kind` to `other`.
    pub fn with_relationship(mut self, kind: RelationshipKind, other: &Iri) -> Self {
        self.relationships
            .get_mut(kind)
            .forward
            .insert(TermInfo::new(other.clone()));
        self
    }

    pub fn with_related(self, other: &Iri) -> Self {
        self.with_relationship(RelationshipKind::Related, other)
    }

    /// Summary of this term.
    pub fn info(&self) -> TermInfo {
        TermInfo {
            id: self.id.clone(),
            label: self.label.clone(),
            vocabulary: self.vocabulary.clone(),
        }
    }

    /// All parents, internal and external.
    pub fn all_parents(&self) -> BTreeSet<Iri> {
        self.parent_terms
            .union(&self.external_parent_terms)
            .cloned()
            .collect()
    }
}

/// The root-term holder owned by exactly one vocabulary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Glossary {
    pub id: Iri,
    pub root_terms: BTreeSet<Iri>,
}

/// A vocabulary with its glossary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Vocabulary {
    pub id: Iri,
    pub label: MultilingualString,
    pub description: MultilingualString,
    pub glossary: Glossary,
    /// Directly imported vocabularies.
    pub imports: BTreeSet<Iri>,
    pub document: Option<Iri>,
}

impl Vocabulary {
    /// A vocabulary with an empty glossary at `{id}/glossary`.
    pub fn new(id: Iri) -> Self {
        let glossary = crate::identifier::glossary_identifier(&id);
        Self {
            id,
            label: MultilingualString::new(),
            description: MultilingualString::new(),
            glossary: Glossary {
                id: glossary,
                root_terms: BTreeSet::new(),
            },
            imports: BTreeSet::new(),
            document: None,
        }
    }

    pub fn with_label(mut self, language: &str, text: &str) -> Self {
        self.label.set(language, text);
        self
    }

    pub fn with_import(mut self, imported: &Iri) -> Self {
        self.imports.insert(imported.clone());
        self
    }
}

/// An immutable, timestamped copy of a term or vocabulary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snapshot {
    pub id: Iri,
    /// The live entity this is a version of.
    pub version_of: Iri,
    /// `Term` or `Vocabulary`.
    pub kind: EntityKind,
    pub created: DateTime<Utc>,
    pub label: MultilingualString,
    pub definition: MultilingualString,
    pub description: MultilingualString,
}

/// Result of an explicit lookup: the live entity or a snapshot record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Versioned<T> {
    Live(T),
    Snapshot(Snapshot),
}

impl<T> Versioned<T> {
    pub fn is_snapshot(&self) -> bool {
        matches!(self, Self::Snapshot(_))
    }

    pub fn live(self) -> Option<T> {
        match self {
            Self::Live(t) => Some(t),
            Self::Snapshot(_) => None,
        }
    }

    pub fn snapshot(self) -> Option<Snapshot> {
        match self {
            Self::Live(_) => None,
            Self::Snapshot(s) => Some(s),
        }
    }
}

/// Offset/limit paging for listings. `limit == None` returns everything.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Page {
    pub offset: usize,
    pub limit: Option<usize>,
}

impl Page {
    pub fn new(offset: usize, limit: usize) -> Self {
        Self {
            offset,
            limit: Some(limit),
        }
    }

    pub fn apply<T: Clone>(&self, items: &[T]) -> Vec<T> {
        let rest = items.iter().skip(self.offset);
        match self.limit {
            Some(limit) => rest.take(limit).cloned().collect(),
            None => rest.cloned().collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn iri(s: &str) -> Iri {
        Iri::new(s).unwrap()
    }

    #[test]
    fn label_falls_back_to_first_language() {
        let mut label = MultilingualString::with("de", "Fluss");
        label.set("cs", "Řeka");
        assert_eq!(label.get_or_fallback("en"), Some("Řeka"));
        assert_eq!(label.get_or_fallback("de"), Some("Fluss"));
        assert_eq!(MultilingualString::new().get_or_fallback("en"), None);
    }

    #[test]
    fn term_info_identity_ignores_label() {
        let a = TermInfo::new(iri("https://example.org/t/a"));
        let mut b = a.clone();
        b.label.set("en", "A");
        let set: BTreeSet<_> = [a, b].into_iter().collect();
        assert_eq!(set.len(), 1);
    }

    #[test]
    fn page_applies_offset_and_limit() {
        let items = vec![1, 2, 3, 4, 5];
        assert_eq!(Page::new(1, 2).apply(&items), vec![2, 3]);
        assert_eq!(Page::default().apply(&items), items);
        assert!(Page::new(9, 2).apply(&items).is_empty());
    }

    #[test]
    fn new_vocabulary_owns_glossary() {
        let v = Vocabulary::new(iri("https://example.org/v"));
        assert_eq!(v.glossary.id.as_str(), "https://example.org/v/glossary");
    }

    #[test]
    fn only_related_stays_inside_vocabulary() {
        assert!(!RelationshipKind::Related.crosses_vocabularies());
        assert!(RelationshipKind::ExactMatch.crosses_vocabularies());
    }
}
