//! Named-graph storage for glossa.
//!
//! Everything the thesaurus persists lives in a named graph (a *context*);
//! the default graph is never used. [`GraphStore`] is the narrow interface the
//! repositories need: context-scoped insert/remove, SPARQL `SELECT` and `ASK`.
//! [`SparqlStore`] implements it on top of oxigraph.

pub mod sparql;

use std::collections::BTreeMap;

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

use crate::context::{ContextId, Iri};
pub use crate::error::StoreResult;
use crate::ns::xsd;

pub use sparql::SparqlStore;

/// An RDF object value as seen by the repositories.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Value {
    Iri(Iri),
    Literal {
        value: String,
        language: Option<String>,
        datatype: Option<Iri>,
    },
}

impl Value {
    /// A plain string literal.
    pub fn string(value: impl Into<String>) -> Self {
        Self::Literal {
            value: value.into(),
            language: None,
            datatype: None,
        }
    }

    /// A language-tagged literal.
    pub fn lang(value: impl Into<String>, language: impl Into<String>) -> Self {
        Self::Literal {
            value: value.into(),
            language: Some(language.into()),
            datatype: None,
        }
    }

    /// A typed literal.
    pub fn typed(value: impl Into<String>, datatype: &str) -> Self {
        Self::Literal {
            value: value.into(),
            language: None,
            datatype: Some(Iri::known(datatype)),
        }
    }

    pub fn boolean(value: bool) -> Self {
        Self::typed(value.to_string(), xsd::BOOLEAN)
    }

    /// An `xsd:dateTime` literal with millisecond precision.
    pub fn date_time(at: DateTime<Utc>) -> Self {
        Self::typed(at.to_rfc3339_opts(SecondsFormat::Millis, true), xsd::DATE_TIME)
    }

    pub fn iri(iri: &Iri) -> Self {
        Self::Iri(iri.clone())
    }

    /// The IRI, if this value is one.
    pub fn as_iri(&self) -> Option<&Iri> {
        match self {
            Self::Iri(iri) => Some(iri),
            Self::Literal { .. } => None,
        }
    }

    /// The lexical form, if this value is a literal.
    pub fn as_literal(&self) -> Option<&str> {
        match self {
            Self::Literal { value, .. } => Some(value),
            Self::Iri(_) => None,
        }
    }

    /// The language tag, if this value is a language-tagged literal.
    pub fn language(&self) -> Option<&str> {
        match self {
            Self::Literal { language, .. } => language.as_deref(),
            Self::Iri(_) => None,
        }
    }

    /// Parse an `xsd:dateTime` literal.
    pub fn as_date_time(&self) -> Option<DateTime<Utc>> {
        let raw = self.as_literal()?;
        DateTime::parse_from_rfc3339(raw)
            .ok()
            .map(|dt| dt.with_timezone(&Utc))
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self.as_literal()? {
            "true" | "1" => Some(true),
            "false" | "0" => Some(false),
            _ => None,
        }
    }

    /// Render as a SPARQL term.
    pub fn to_sparql(&self) -> String {
        match self {
            Self::Iri(iri) => iri.to_sparql(),
            Self::Literal {
                value,
                language: Some(lang),
                ..
            } => format!("\"{}\"@{lang}", escape_literal(value)),
            Self::Literal {
                value,
                datatype: Some(dt),
                ..
            } => format!("\"{}\"^^{}", escape_literal(value), dt.to_sparql()),
            Self::Literal { value, .. } => format!("\"{}\"", escape_literal(value)),
        }
    }
}

impl From<Iri> for Value {
    fn from(iri: Iri) -> Self {
        Self::Iri(iri)
    }
}

/// Escape a string for use inside a double-quoted SPARQL literal.
pub fn escape_literal(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '"' => out.push_str("\\\""),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c => out.push(c),
        }
    }
    out
}

/// One triple, placed into a context by the caller.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Statement {
    pub subject: Iri,
    pub predicate: Iri,
    pub object: Value,
}

impl Statement {
    pub fn new(subject: &Iri, predicate: &str, object: Value) -> Self {
        Self {
            subject: subject.clone(),
            predicate: Iri::known(predicate),
            object,
        }
    }

    /// Statement whose object is an IRI.
    pub fn link(subject: &Iri, predicate: &str, object: &Iri) -> Self {
        Self::new(subject, predicate, Value::iri(object))
    }
}

/// A triple pattern; `None` positions are wildcards.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Pattern {
    pub subject: Option<Iri>,
    pub predicate: Option<Iri>,
    pub object: Option<Value>,
}

impl Pattern {
    /// Matches every statement.
    pub fn any() -> Self {
        Self::default()
    }

    pub fn subject(subject: &Iri) -> Self {
        Self {
            subject: Some(subject.clone()),
            ..Self::default()
        }
    }

    pub fn with_predicate(mut self, predicate: &str) -> Self {
        self.predicate = Some(Iri::known(predicate));
        self
    }

    pub fn with_object(mut self, object: Value) -> Self {
        self.object = Some(object);
        self
    }

    fn to_sparql(&self) -> String {
        let s = self
            .subject
            .as_ref()
            .map_or_else(|| "?s".to_string(), Iri::to_sparql);
        let p = self
            .predicate
            .as_ref()
            .map_or_else(|| "?p".to_string(), Iri::to_sparql);
        let o = self
            .object
            .as_ref()
            .map_or_else(|| "?o".to_string(), Value::to_sparql);
        format!("{s} {p} {o}")
    }
}

/// Removals and insertions that must land together. Removals apply first,
/// so a statement listed on both sides stays stored.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChangeSet {
    removals: Vec<(ContextId, Statement)>,
    insertions: Vec<(ContextId, Statement)>,
}

impl ChangeSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Schedule `statements` for deletion from `context`.
    pub fn remove(&mut self, context: &ContextId, statements: impl IntoIterator<Item = Statement>) {
        self.removals
            .extend(statements.into_iter().map(|s| (context.clone(), s)));
    }

    /// Schedule `statements` for insertion into `context`.
    pub fn insert(&mut self, context: &ContextId, statements: impl IntoIterator<Item = Statement>) {
        self.insertions
            .extend(statements.into_iter().map(|s| (context.clone(), s)));
    }

    pub fn removals(&self) -> &[(ContextId, Statement)] {
        &self.removals
    }

    pub fn insertions(&self) -> &[(ContextId, Statement)] {
        &self.insertions
    }

    pub fn len(&self) -> usize {
        self.removals.len() + self.insertions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.removals.is_empty() && self.insertions.is_empty()
    }
}

/// One row of a `SELECT` result.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Solution(BTreeMap<String, Value>);

impl Solution {
    pub fn new(bindings: BTreeMap<String, Value>) -> Self {
        Self(bindings)
    }

    pub fn get(&self, var: &str) -> Option<&Value> {
        self.0.get(var)
    }

    /// The IRI bound to `var`, if any.
    pub fn iri(&self, var: &str) -> Option<&Iri> {
        self.get(var).and_then(Value::as_iri)
    }

    /// The lexical form of the literal bound to `var`, if any.
    pub fn literal(&self, var: &str) -> Option<&str> {
        self.get(var).and_then(Value::as_literal)
    }
}

/// Context-scoped graph storage.
pub trait GraphStore: Send + Sync {
    /// Add statements to a context. Existing statements are kept once.
    fn insert(&self, context: &ContextId, statements: &[Statement]) -> StoreResult<()>;

    /// Delete statements from a context. Absent statements are ignored.
    fn remove(&self, context: &ContextId, statements: &[Statement]) -> StoreResult<()>;

    /// Apply every change in `changes` or none of them. Statements are
    /// validated before anything is written.
    fn apply(&self, changes: &ChangeSet) -> StoreResult<()>;

    /// Run a SPARQL `SELECT` query.
    fn select(&self, query: &str) -> StoreResult<Vec<Solution>>;

    /// Run a SPARQL `ASK` query.
    fn ask(&self, query: &str) -> StoreResult<bool>;

    /// Total number of quads across all contexts.
    fn len(&self) -> StoreResult<usize>;

    fn is_empty(&self) -> StoreResult<bool> {
        Ok(self.len()? == 0)
    }

    /// Statements in `context` matching `pattern`.
    fn find(&self, context: &ContextId, pattern: &Pattern) -> StoreResult<Vec<Statement>> {
        let query = format!(
            "SELECT * WHERE {{ GRAPH {} {{ {} }} }}",
            context.to_sparql(),
            pattern.to_sparql()
        );
        let rows = self.select(&query)?;
        let mut out = Vec::with_capacity(rows.len());
        for row in rows {
            let subject = match (&pattern.subject, row.iri("s")) {
                (Some(s), _) => s.clone(),
                (None, Some(s)) => s.clone(),
                (None, None) => continue,
            };
            let predicate = match (&pattern.predicate, row.iri("p")) {
                (Some(p), _) => p.clone(),
                (None, Some(p)) => p.clone(),
                (None, None) => continue,
            };
            let object = match (&pattern.object, row.get("o")) {
                (Some(o), _) => o.clone(),
                (None, Some(o)) => o.clone(),
                (None, None) => continue,
            };
            out.push(Statement {
                subject,
                predicate,
                object,
            });
        }
        Ok(out)
    }

    /// Delete every statement in `context` matching `pattern`; returns the count.
    fn remove_matching(&self, context: &ContextId, pattern: &Pattern) -> StoreResult<usize> {
        let found = self.find(context, pattern)?;
        self.remove(context, &found)?;
        Ok(found.len())
    }

    /// Every non-empty context.
    fn contexts(&self) -> StoreResult<Vec<ContextId>> {
        let rows = self.select("SELECT DISTINCT ?g WHERE { GRAPH ?g { ?s ?p ?o } }")?;
        Ok(rows
            .iter()
            .filter_map(|row| row.iri("g").cloned().map(ContextId::new))
            .collect())
    }

    /// Empty a context entirely.
    fn clear_context(&self, context: &ContextId) -> StoreResult<usize> {
        self.remove_matching(context, &Pattern::any())
    }
}
