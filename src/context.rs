//! Context identity model: IRIs, named-graph contexts and per-operation views.
//!
//! A vocabulary's *canonical* context is the named graph carrying the
//! vocabulary's own IRI. A workspace may shadow it with a *working* context
//! (see [`crate::workspace`]). A [`ContextView`] is the set of contexts one
//! logical operation is allowed to see, one per visible vocabulary.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// An absolute IRI identifying a vocabulary, term, glossary or context.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Iri(String);

impl Iri {
    /// Parse and validate an IRI.
    pub fn new(iri: impl Into<String>) -> Result<Self, ConfigError> {
        let iri = iri.into();
        oxigraph::model::NamedNode::new(iri.as_str()).map_err(|e| ConfigError::InvalidIri {
            iri: iri.clone(),
            message: e.to_string(),
        })?;
        Ok(Self(iri))
    }

    /// Wrap an IRI that is known to be valid (constants, store output).
    pub(crate) fn known(iri: impl Into<String>) -> Self {
        Self(iri.into())
    }

    /// Get the IRI as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Append a path segment, separated by a single `/`.
    pub fn join(&self, segment: &str) -> Result<Self, ConfigError> {
        let base = self.0.trim_end_matches('/');
        let segment = segment.trim_start_matches('/');
        Self::new(format!("{base}/{segment}"))
    }

    /// Render as a SPARQL IRI reference (`<...>`).
    pub fn to_sparql(&self) -> String {
        format!("<{}>", self.0)
    }
}

impl std::fmt::Display for Iri {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for Iri {
    type Error = ConfigError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Iri> for String {
    fn from(iri: Iri) -> Self {
        iri.0
    }
}

impl AsRef<str> for Iri {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Identifier of a named graph.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ContextId(Iri);

impl ContextId {
    /// Wrap an IRI as a context identifier.
    pub fn new(iri: Iri) -> Self {
        Self(iri)
    }

    /// The canonical context of a vocabulary: the graph named after the vocabulary.
    pub fn canonical(vocabulary: &Iri) -> Self {
        Self(vocabulary.clone())
    }

    /// Parse a context identifier from a string.
    pub fn parse(iri: impl Into<String>) -> Result<Self, ConfigError> {
        Iri::new(iri).map(Self)
    }

    /// Get the underlying IRI.
    pub fn iri(&self) -> &Iri {
        &self.0
    }

    /// Get the IRI as a string slice.
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }

    /// Whether this is the canonical context of `vocabulary`.
    pub fn is_canonical_for(&self, vocabulary: &Iri) -> bool {
        &self.0 == vocabulary
    }

    /// Render as a SPARQL IRI reference.
    pub fn to_sparql(&self) -> String {
        self.0.to_sparql()
    }
}

impl std::fmt::Display for ContextId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Build a SPARQL `VALUES` block binding `var` to the given contexts.
pub fn values_clause<'a>(var: &str, contexts: impl IntoIterator<Item = &'a ContextId>) -> String {
    let mut out = format!("VALUES ?{var} {{");
    for ctx in contexts {
        out.push(' ');
        out.push_str(&ctx.to_sparql());
    }
    out.push_str(" }");
    out
}

/// The contexts visible to one logical operation, one resolved context per
/// visible vocabulary.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ContextView {
    by_context: BTreeMap<ContextId, Iri>,
    by_vocabulary: BTreeMap<Iri, ContextId>,
}

impl ContextView {
    /// Create an empty view.
    pub fn new() -> Self {
        Self::default()
    }

    /// Make `vocabulary` visible through `context`.
    pub fn insert(&mut self, vocabulary: Iri, context: ContextId) {
        if let Some(previous) = self.by_vocabulary.insert(vocabulary.clone(), context.clone()) {
            self.by_context.remove(&previous);
        }
        self.by_context.insert(context, vocabulary);
    }

    /// All visible contexts, in IRI order.
    pub fn contexts(&self) -> impl Iterator<Item = &ContextId> {
        self.by_context.keys()
    }

    /// All visible vocabularies, in IRI order.
    pub fn vocabularies(&self) -> impl Iterator<Item = &Iri> {
        self.by_vocabulary.keys()
    }

    /// The vocabulary whose data lives in `context`, if visible.
    pub fn vocabulary_of(&self, context: &ContextId) -> Option<&Iri> {
        self.by_context.get(context)
    }

    /// The resolved context of `vocabulary`, if visible.
    pub fn context_of(&self, vocabulary: &Iri) -> Option<&ContextId> {
        self.by_vocabulary.get(vocabulary)
    }

    /// Number of visible vocabularies.
    pub fn len(&self) -> usize {
        self.by_vocabulary.len()
    }

    /// Whether nothing is visible.
    pub fn is_empty(&self) -> bool {
        self.by_vocabulary.is_empty()
    }

    /// `VALUES` block binding `var` to every visible context.
    pub fn values_clause(&self, var: &str) -> String {
        values_clause(var, self.contexts())
    }

    /// A narrower view containing only the given vocabularies.
    pub fn restricted_to<'a>(&self, vocabularies: impl IntoIterator<Item = &'a Iri>) -> Self {
        let mut view = Self::new();
        for vocabulary in vocabularies {
            if let Some(ctx) = self.context_of(vocabulary) {
                view.insert(vocabulary.clone(), ctx.clone());
            }
        }
        view
    }
}
