//! Quad store backed by oxigraph.
//!
//! Provides durable (or in-memory) storage of named-graph quads and SPARQL
//! query capabilities. Every oxigraph failure is reported as
//! [`StoreError::Persistence`].

use std::collections::BTreeMap;

use oxigraph::model::{GraphName, Literal, NamedNode, Quad, Term};
use oxigraph::sparql::QueryResults;
use oxigraph::store::Store;

use crate::context::{ContextId, Iri};
use crate::error::{StoreError, StoreResult};

use super::{ChangeSet, GraphStore, Solution, Statement, Value};

const XSD_STRING: &str = "http://www.w3.org/2001/XMLSchema#string";

/// Persistent SPARQL-capable quad store.
pub struct SparqlStore {
    store: Store,
}

impl SparqlStore {
    /// Create a new in-memory store (no persistence).
    pub fn in_memory() -> StoreResult<Self> {
        let store = Store::new().map_err(|e| StoreError::Persistence {
            message: format!("failed to create oxigraph store: {e}"),
        })?;
        Ok(Self { store })
    }

    /// Open or create a persistent store at the given path.
    pub fn open(path: &std::path::Path) -> StoreResult<Self> {
        std::fs::create_dir_all(path).map_err(|source| StoreError::Io { source })?;
        let store = Store::open(path).map_err(|e| StoreError::Persistence {
            message: format!("failed to open oxigraph store at {}: {e}", path.display()),
        })?;
        Ok(Self { store })
    }

    fn named(iri: &Iri) -> StoreResult<NamedNode> {
        NamedNode::new(iri.as_str()).map_err(|e| StoreError::Persistence {
            message: format!("invalid IRI {iri}: {e}"),
        })
    }

    fn object(value: &Value) -> StoreResult<Term> {
        match value {
            Value::Iri(iri) => Ok(Self::named(iri)?.into()),
            Value::Literal {
                value,
                language: Some(lang),
                ..
            } => Literal::new_language_tagged_literal(value.as_str(), lang.as_str())
                .map(Term::from)
                .map_err(|e| StoreError::Persistence {
                    message: format!("invalid language tag {lang}: {e}"),
                }),
            Value::Literal {
                value,
                datatype: Some(dt),
                ..
            } => Ok(Literal::new_typed_literal(value.as_str(), Self::named(dt)?).into()),
            Value::Literal { value, .. } => Ok(Literal::new_simple_literal(value.as_str()).into()),
        }
    }

    fn quad(context: &ContextId, statement: &Statement) -> StoreResult<Quad> {
        Ok(Quad::new(
            Self::named(&statement.subject)?,
            Self::named(&statement.predicate)?,
            Self::object(&statement.object)?,
            GraphName::NamedNode(Self::named(context.iri())?),
        ))
    }

    /// Convert every statement up front, so an invalid one fails the whole
    /// write before the store is touched.
    fn quads<'a>(
        statements: impl Iterator<Item = (&'a ContextId, &'a Statement)>,
    ) -> StoreResult<Vec<Quad>> {
        statements
            .map(|(context, statement)| Self::quad(context, statement))
            .collect()
    }

    /// Remove then insert inside one oxigraph transaction.
    fn commit(&self, removals: &[Quad], insertions: &[Quad]) -> StoreResult<()> {
        if removals.is_empty() && insertions.is_empty() {
            return Ok(());
        }
        let mut transaction = self.store.start_transaction().map_err(|e| StoreError::Persistence {
            message: format!("failed to start transaction: {e}"),
        })?;
        for quad in removals {
            transaction.remove(quad);
        }
        for quad in insertions {
            transaction.insert(quad);
        }
        transaction.commit().map_err(|e| StoreError::Persistence {
            message: format!("transaction commit failed: {e}"),
        })
    }

    /// Convert an oxigraph term into a crate value. Blank nodes are skipped.
    fn value(term: &Term) -> Option<Value> {
        match term {
            Term::NamedNode(node) => Some(Value::Iri(Iri::known(node.as_str()))),
            Term::Literal(literal) => {
                let language = literal.language().map(str::to_string);
                let datatype = literal.datatype();
                let datatype = if language.is_some() || datatype.as_str() == XSD_STRING {
                    None
                } else {
                    Some(Iri::known(datatype.as_str()))
                };
                Some(Value::Literal {
                    value: literal.value().to_string(),
                    language,
                    datatype,
                })
            }
            _ => None,
        }
    }

    /// Get internal store reference (for advanced oxigraph operations).
    pub fn store(&self) -> &Store {
        &self.store
    }
}

impl GraphStore for SparqlStore {
    fn insert(&self, context: &ContextId, statements: &[Statement]) -> StoreResult<()> {
        let quads = Self::quads(statements.iter().map(|s| (context, s)))?;
        self.commit(&[], &quads)
    }

    fn remove(&self, context: &ContextId, statements: &[Statement]) -> StoreResult<()> {
        let quads = Self::quads(statements.iter().map(|s| (context, s)))?;
        self.commit(&quads, &[])
    }

    fn apply(&self, changes: &ChangeSet) -> StoreResult<()> {
        let removals = Self::quads(changes.removals().iter().map(|(c, s)| (c, s)))?;
        let insertions = Self::quads(changes.insertions().iter().map(|(c, s)| (c, s)))?;
        self.commit(&removals, &insertions)
    }

    fn select(&self, query: &str) -> StoreResult<Vec<Solution>> {
        let results = self.store.query(query).map_err(|e| StoreError::Persistence {
            message: format!("SPARQL query failed: {e}"),
        })?;

        match results {
            QueryResults::Solutions(solutions) => {
                let mut rows = Vec::new();
                for solution in solutions {
                    let solution = solution.map_err(|e| StoreError::Persistence {
                        message: format!("solution error: {e}"),
                    })?;
                    let mut row = BTreeMap::new();
                    for (var, term) in solution.iter() {
                        if let Some(value) = Self::value(term) {
                            row.insert(var.as_str().to_string(), value);
                        }
                    }
                    rows.push(Solution::new(row));
                }
                Ok(rows)
            }
            _ => Err(StoreError::Persistence {
                message: "expected solutions from SELECT query".into(),
            }),
        }
    }

    fn ask(&self, query: &str) -> StoreResult<bool> {
        let results = self.store.query(query).map_err(|e| StoreError::Persistence {
            message: format!("SPARQL query failed: {e}"),
        })?;
        match results {
            QueryResults::Boolean(b) => Ok(b),
            _ => Err(StoreError::Persistence {
                message: "expected boolean result from ASK query".into(),
            }),
        }
    }

    fn len(&self) -> StoreResult<usize> {
        self.store.len().map_err(|e| StoreError::Persistence {
            message: format!("failed to count quads: {e}"),
        })
    }
}

impl std::fmt::Debug for SparqlStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SparqlStore").finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::Pattern;

    fn iri(s: &str) -> Iri {
        Iri::new(s).unwrap()
    }

    fn ctx(s: &str) -> ContextId {
        ContextId::new(iri(s))
    }

    #[test]
    fn insert_is_scoped_to_context() {
        let store = SparqlStore::in_memory().unwrap();
        let a = iri("https://example.org/a");
        let st = Statement::new(&a, "https://example.org/label", Value::lang("A", "en"));
        store.insert(&ctx("https://example.org/g1"), &[st.clone()]).unwrap();

        let in_g1 = store
            .find(&ctx("https://example.org/g1"), &Pattern::subject(&a))
            .unwrap();
        let in_g2 = store
            .find(&ctx("https://example.org/g2"), &Pattern::subject(&a))
            .unwrap();
        assert_eq!(in_g1, vec![st]);
        assert!(in_g2.is_empty());
    }

    #[test]
    fn duplicate_insert_is_stored_once() {
        let store = SparqlStore::in_memory().unwrap();
        let a = iri("https://example.org/a");
        let st = Statement::link(&a, "https://example.org/p", &iri("https://example.org/b"));
        let g = ctx("https://example.org/g");
        store.insert(&g, &[st.clone(), st.clone()]).unwrap();
        assert_eq!(store.len().unwrap(), 1);
    }

    #[test]
    fn remove_matching_counts_removed() {
        let store = SparqlStore::in_memory().unwrap();
        let a = iri("https://example.org/a");
        let g = ctx("https://example.org/g");
        store
            .insert(
                &g,
                &[
                    Statement::new(&a, "https://example.org/p", Value::string("x")),
                    Statement::new(&a, "https://example.org/q", Value::boolean(false)),
                ],
            )
            .unwrap();
        assert_eq!(store.remove_matching(&g, &Pattern::subject(&a)).unwrap(), 2);
        assert!(store.is_empty().unwrap());
    }

    #[test]
    fn invalid_statement_aborts_whole_change_set() {
        let store = SparqlStore::in_memory().unwrap();
        let a = iri("https://example.org/a");
        let g = ctx("https://example.org/g");
        let kept = Statement::new(&a, "https://example.org/label", Value::lang("A", "en"));
        store.insert(&g, &[kept.clone()]).unwrap();

        let mut changes = ChangeSet::new();
        changes.remove(&g, [kept.clone()]);
        changes.insert(
            &g,
            [
                Statement::new(&a, "https://example.org/label", Value::lang("B", "en")),
                Statement::new(&a, "https://example.org/label", Value::lang("C", "not a tag!")),
            ],
        );
        assert!(store.apply(&changes).is_err());
        assert_eq!(store.find(&g, &Pattern::subject(&a)).unwrap(), vec![kept]);
    }

    #[test]
    fn apply_removes_before_inserting() {
        let store = SparqlStore::in_memory().unwrap();
        let a = iri("https://example.org/a");
        let g = ctx("https://example.org/g");
        let old = Statement::new(&a, "https://example.org/p", Value::string("old"));
        let same = Statement::new(&a, "https://example.org/q", Value::string("same"));
        store.insert(&g, &[old.clone(), same.clone()]).unwrap();

        let new = Statement::new(&a, "https://example.org/p", Value::string("new"));
        let mut changes = ChangeSet::new();
        changes.remove(&g, [old, same.clone()]);
        changes.insert(&g, [new.clone(), same.clone()]);
        store.apply(&changes).unwrap();

        let mut stored = store.find(&g, &Pattern::subject(&a)).unwrap();
        stored.sort();
        assert_eq!(stored, vec![new, same]);
    }

    #[test]
    fn ask_and_contexts() {
        let store = SparqlStore::in_memory().unwrap();
        let a = iri("https://example.org/a");
        store
            .insert(
                &ctx("https://example.org/g"),
                &[Statement::new(&a, "https://example.org/p", Value::string("x"))],
            )
            .unwrap();
        assert!(store
            .ask("ASK { GRAPH ?g { <https://example.org/a> ?p ?o } }")
            .unwrap());
        assert_eq!(store.contexts().unwrap(), vec![ctx("https://example.org/g")]);
    }
}
