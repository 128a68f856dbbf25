//! Descriptors: which context each attribute of an entity is read from or
//! written to.
//!
//! The assignment is a strategy table keyed by [`EntityKind`], each strategy a
//! list of `(attribute, rule)` pairs. Building a descriptor applies the rules
//! to an owner context and a [`Purpose`]:
//!
//! | rule                | save / update        | read                 |
//! |---------------------|----------------------|----------------------|
//! | `Owner`             | owner context        | owner context        |
//! | `ForeignReference`  | owner context        | owner context        |
//! | `Inferred`          | unset                | inferred             |
//! | `Computed`          | unset                | whole view           |
//!
//! `ForeignReference` attributes additionally yield *nested* contexts: a
//! referenced term that lives in another vocabulary is updated in that
//! vocabulary's resolved context, never in the owner's.

use std::collections::{BTreeMap, BTreeSet};

use crate::context::{ContextId, Iri};
use crate::error::ConfigError;
use crate::model::{EntityKind, RelationshipKind, Term};
use crate::workspace::OperationScope;

/// Named attributes of the persisted entities.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Attribute {
    Types,
    Label,
    Definition,
    Description,
    AltLabels,
    HiddenLabels,
    Parents,
    ExternalParents,
    SubTerms,
    Related,
    RelatedMatch,
    ExactMatch,
    Draft,
    Properties,
    /// Owning vocabulary of a term, derived from graph membership.
    Vocabulary,
    Glossary,
    RootTerms,
    Imports,
    Document,
    ChangedEntity,
    ChangeKind,
    EntityKind,
    Author,
    Timestamp,
}

impl Attribute {
    /// The attribute holding relationships of `kind`.
    pub fn for_relationship(kind: RelationshipKind) -> Self {
        match kind {
            RelationshipKind::Related => Self::Related,
            RelationshipKind::RelatedMatch => Self::RelatedMatch,
            RelationshipKind::ExactMatch => Self::ExactMatch,
        }
    }
}

/// How an attribute's context is chosen.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttributeRule {
    /// Stored in the owner's context.
    Owner,
    /// Never stored; derived on read from where the entity is found.
    Inferred,
    /// Never stored; computed on read across every visible context.
    Computed,
    /// Stored in the owner's context; referenced foreign terms resolve to
    /// their own vocabulary's context.
    ForeignReference,
}

/// What the descriptor is built for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Purpose {
    Save,
    Update,
    Read,
}

/// The resolved context assignment of one attribute.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttributeContext {
    Context(ContextId),
    /// Every context of the operation's view.
    View,
    Inferred,
    /// Left out of this operation entirely.
    Unset,
}

/// Per-attribute context map for one entity and one operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Descriptor {
    pub kind: EntityKind,
    pub purpose: Purpose,
    pub owner: ContextId,
    attributes: BTreeMap<Attribute, AttributeContext>,
    nested: BTreeMap<Iri, ContextId>,
}

impl Descriptor {
    /// Assignment of `attribute`; attributes outside the strategy are unset.
    pub fn context_of(&self, attribute: Attribute) -> &AttributeContext {
        self.attributes
            .get(&attribute)
            .unwrap_or(&AttributeContext::Unset)
    }

    /// The single context `attribute` is written to, if it is written at all.
    pub fn write_context(&self, attribute: Attribute) -> Option<&ContextId> {
        match self.context_of(attribute) {
            AttributeContext::Context(ctx) if self.purpose != Purpose::Read => Some(ctx),
            _ => None,
        }
    }

    /// The context a referenced foreign term is updated in.
    pub fn nested_context(&self, reference: &Iri) -> Option<&ContextId> {
        self.nested.get(reference)
    }

    /// All nested (foreign) references and their contexts.
    pub fn nested(&self) -> impl Iterator<Item = (&Iri, &ContextId)> {
        self.nested.iter()
    }

    /// Distinct contexts touched by a write through this descriptor.
    pub fn write_contexts(&self) -> BTreeSet<&ContextId> {
        self.attributes
            .values()
            .filter_map(|a| match a {
                AttributeContext::Context(ctx) => Some(ctx),
                _ => None,
            })
            .chain(self.nested.values())
            .collect()
    }
}

/// Strategy table: entity kind → attribute rules.
#[derive(Debug, Clone, Default)]
pub struct DescriptorBuilder {
    strategies: BTreeMap<EntityKind, Vec<(Attribute, AttributeRule)>>,
}

impl DescriptorBuilder {
    /// An empty table. Every kind must be registered before use.
    pub fn new() -> Self {
        Self::default()
    }

    /// Strategies for vocabularies, glossaries, terms and change records.
    ///
    /// Snapshots are immutable and never written through a descriptor, so no
    /// strategy is registered for them.
    pub fn with_defaults() -> Self {
        use Attribute as A;
        use AttributeRule as R;

        let mut builder = Self::new();
        builder.register(
            EntityKind::Term,
            vec![
                (A::Types, R::Owner),
                (A::Label, R::Owner),
                (A::Definition, R::Owner),
                (A::Description, R::Owner),
                (A::AltLabels, R::Owner),
                (A::HiddenLabels, R::Owner),
                (A::Parents, R::Owner),
                (A::ExternalParents, R::ForeignReference),
                (A::SubTerms, R::Computed),
                (A::Related, R::ForeignReference),
                (A::RelatedMatch, R::ForeignReference),
                (A::ExactMatch, R::ForeignReference),
                (A::Draft, R::Owner),
                (A::Properties, R::Owner),
                (A::Vocabulary, R::Inferred),
            ],
        );
        builder.register(
            EntityKind::Vocabulary,
            vec![
                (A::Types, R::Owner),
                (A::Label, R::Owner),
                (A::Description, R::Owner),
                (A::Glossary, R::Owner),
                (A::Imports, R::Owner),
                (A::Document, R::Owner),
            ],
        );
        builder.register(
            EntityKind::Glossary,
            vec![(A::Types, R::Owner), (A::RootTerms, R::Owner)],
        );
        builder.register(
            EntityKind::ChangeRecord,
            vec![
                (A::Types, R::Owner),
                (A::ChangedEntity, R::Owner),
                (A::ChangeKind, R::Owner),
                (A::EntityKind, R::Owner),
                (A::Author, R::Owner),
                (A::Timestamp, R::Owner),
            ],
        );
        builder
    }

    /// Register (or replace) the strategy for `kind`.
    pub fn register(&mut self, kind: EntityKind, rules: Vec<(Attribute, AttributeRule)>) {
        self.strategies.insert(kind, rules);
    }

    pub fn has_strategy(&self, kind: EntityKind) -> bool {
        self.strategies.contains_key(&kind)
    }

    /// Apply the strategy for `kind` to `owner`.
    pub fn build(
        &self,
        kind: EntityKind,
        owner: &ContextId,
        purpose: Purpose,
    ) -> Result<Descriptor, ConfigError> {
        let rules = self
            .strategies
            .get(&kind)
            .ok_or_else(|| ConfigError::MissingStrategy {
                kind: kind.to_string(),
            })?;
        let attributes = rules
            .iter()
            .map(|(attribute, rule)| {
                let ctx = match (rule, purpose) {
                    (AttributeRule::Owner | AttributeRule::ForeignReference, _) => {
                        AttributeContext::Context(owner.clone())
                    }
                    (AttributeRule::Inferred, Purpose::Read) => AttributeContext::Inferred,
                    (AttributeRule::Computed, Purpose::Read) => AttributeContext::View,
                    (AttributeRule::Inferred | AttributeRule::Computed, _) => {
                        AttributeContext::Unset
                    }
                };
                (*attribute, ctx)
            })
            .collect();
        Ok(Descriptor {
            kind,
            purpose,
            owner: owner.clone(),
            attributes,
            nested: BTreeMap::new(),
        })
    }

    /// Descriptor for a term owned by `vocabulary`, with nested contexts for
    /// every referenced term of another vocabulary. `vocabulary_of` looks up
    /// the vocabulary a referenced term belongs to; unknown references get
    /// no nested context.
    pub fn build_for_term(
        &self,
        term: &Term,
        vocabulary: &Iri,
        purpose: Purpose,
        scope: &OperationScope,
        mut vocabulary_of: impl FnMut(&Iri) -> Option<Iri>,
    ) -> Result<Descriptor, ConfigError> {
        let owner = scope.resolve(vocabulary);
        let mut descriptor = self.build(EntityKind::Term, &owner, purpose)?;
        let rules = &self.strategies[&EntityKind::Term];

        let mut references: BTreeSet<&Iri> = BTreeSet::new();
        for (attribute, rule) in rules {
            if *rule != AttributeRule::ForeignReference {
                continue;
            }
            match attribute {
                Attribute::ExternalParents => references.extend(term.external_parent_terms.iter()),
                Attribute::Related => {
                    references.extend(term.relationships.related.all().map(|i| &i.id))
                }
                Attribute::RelatedMatch => {
                    references.extend(term.relationships.related_match.all().map(|i| &i.id))
                }
                Attribute::ExactMatch => {
                    references.extend(term.relationships.exact_match.all().map(|i| &i.id))
                }
                _ => {}
            }
        }

        for reference in references {
            if reference == &term.id {
                continue;
            }
            if let Some(foreign) = vocabulary_of(reference) {
                if &foreign != vocabulary {
                    descriptor
                        .nested
                        .insert(reference.clone(), scope.resolve(&foreign));
                }
            }
        }
        Ok(descriptor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workspace::WorkspaceRegistry;

    fn iri(s: &str) -> Iri {
        Iri::new(s).unwrap()
    }

    #[test]
    fn every_owned_attribute_defaults_to_owner() {
        let builder = DescriptorBuilder::with_defaults();
        let owner = ContextId::parse("https://example.org/v").unwrap();
        let d = builder.build(EntityKind::Term, &owner, Purpose::Update).unwrap();
        assert_eq!(d.write_context(Attribute::Label), Some(&owner));
        assert_eq!(d.write_context(Attribute::RelatedMatch), Some(&owner));
        assert_eq!(d.write_contexts().len(), 1);
    }

    #[test]
    fn save_leaves_vocabulary_membership_unset() {
        let builder = DescriptorBuilder::with_defaults();
        let owner = ContextId::parse("https://example.org/v").unwrap();
        let save = builder.build(EntityKind::Term, &owner, Purpose::Save).unwrap();
        assert_eq!(save.context_of(Attribute::Vocabulary), &AttributeContext::Unset);
        assert_eq!(save.context_of(Attribute::SubTerms), &AttributeContext::Unset);

        let read = builder.build(EntityKind::Term, &owner, Purpose::Read).unwrap();
        assert_eq!(read.context_of(Attribute::Vocabulary), &AttributeContext::Inferred);
        assert_eq!(read.context_of(Attribute::SubTerms), &AttributeContext::View);
        assert_eq!(read.write_context(Attribute::Label), None);
    }

    #[test]
    fn missing_strategy_is_a_configuration_error() {
        let builder = DescriptorBuilder::with_defaults();
        let owner = ContextId::parse("https://example.org/v").unwrap();
        let err = builder
            .build(EntityKind::Snapshot, &owner, Purpose::Read)
            .unwrap_err();
        assert!(matches!(err, ConfigError::MissingStrategy { .. }));
    }

    #[test]
    fn foreign_references_resolve_through_workspace() {
        let registry = WorkspaceRegistry::new("review");
        let v = iri("https://example.org/v");
        let w = iri("https://example.org/w");
        let working = ContextId::parse("https://example.org/ws/w").unwrap();
        registry.register_editable_vocabulary(&w, &working).unwrap();
        let scope = OperationScope::new(registry.current_workspace_metadata(), "en");

        let local = iri("https://example.org/v/term/local");
        let foreign = iri("https://example.org/w/term/foreign");
        let term = Term::new(iri("https://example.org/v/term/t"))
            .with_related(&local)
            .with_relationship(RelationshipKind::ExactMatch, &foreign);

        let d = DescriptorBuilder::with_defaults()
            .build_for_term(&term, &v, Purpose::Update, &scope, |r| {
                if r.as_str().starts_with("https://example.org/w/") {
                    Some(w.clone())
                } else {
                    Some(v.clone())
                }
            })
            .unwrap();

        assert_eq!(d.owner, ContextId::canonical(&v));
        assert_eq!(d.write_context(Attribute::ExactMatch), Some(&ContextId::canonical(&v)));
        assert_eq!(d.nested_context(&foreign), Some(&working));
        assert_eq!(d.nested_context(&local), None);
    }
}
