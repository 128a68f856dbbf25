//! Relationship merge: asserted (forward) relationships of a term plus the
//! inferred inverse ones, and sub-term listings.
//!
//! For each symmetric kind the forward set holds the objects the term asserts
//! itself; the inverse set holds every visible term asserting the relationship
//! towards it, minus the term itself, minus the forward set, minus snapshots.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use crate::collation;
use crate::context::{ContextId, ContextView, Iri, values_clause};
use crate::error::StoreResult;
use crate::model::{MultilingualString, RelationshipKind, RelationshipSet, Relationships, TermInfo};
use crate::ns;
use crate::snapshot::exclusion_fragment;
use crate::store::{GraphStore, Solution, Value};

/// Computes relationship records and term summaries.
pub struct RelationshipMerger {
    store: Arc<dyn GraphStore>,
}

impl RelationshipMerger {
    pub fn new(store: Arc<dyn GraphStore>) -> Self {
        Self { store }
    }

    /// All three relationship records of `term`.
    ///
    /// `own` is the term's resolved context; `imported` the resolved contexts
    /// of the vocabularies its vocabulary imports, consulted for the
    /// cross-vocabulary kinds only.
    pub fn merge(
        &self,
        term: &Iri,
        own: &ContextId,
        imported: &[ContextId],
        view: &ContextView,
    ) -> StoreResult<Relationships> {
        let mut relationships = Relationships::default();
        for kind in RelationshipKind::ALL {
            *relationships.get_mut(kind) = self.merge_kind(term, kind, own, imported, view)?;
        }
        Ok(relationships)
    }

    /// The record of one relationship kind.
    pub fn merge_kind(
        &self,
        term: &Iri,
        kind: RelationshipKind,
        own: &ContextId,
        imported: &[ContextId],
        view: &ContextView,
    ) -> StoreResult<RelationshipSet> {
        let forward_ids = self.forward_ids(term, kind, own, imported)?;
        let mut inverse_ids = self.inverse_ids(term, kind, view)?;
        inverse_ids.retain(|id| !forward_ids.contains(id));

        let all: BTreeSet<Iri> = forward_ids.union(&inverse_ids).cloned().collect();
        let infos = self.describe(&all, view)?;
        let pick = |ids: &BTreeSet<Iri>| -> BTreeSet<TermInfo> {
            ids.iter()
                .map(|id| infos.get(id).cloned().unwrap_or_else(|| TermInfo::new(id.clone())))
                .collect()
        };
        Ok(RelationshipSet {
            forward: pick(&forward_ids),
            inverse: pick(&inverse_ids),
        })
    }

    fn forward_ids(
        &self,
        term: &Iri,
        kind: RelationshipKind,
        own: &ContextId,
        imported: &[ContextId],
    ) -> StoreResult<BTreeSet<Iri>> {
        let mut contexts = vec![own];
        if kind.crosses_vocabularies() {
            contexts.extend(imported.iter());
        }
        let t = term.to_sparql();
        let query = ns::prefixed(&format!(
            "SELECT DISTINCT ?x WHERE {{ {} GRAPH ?g {{ {t} <{}> ?x }} FILTER(isIRI(?x) && ?x != {t}) }}",
            values_clause("g", contexts),
            kind.predicate()
        ));
        Ok(iris(&self.store.select(&query)?, "x"))
    }

    fn inverse_ids(
        &self,
        term: &Iri,
        kind: RelationshipKind,
        view: &ContextView,
    ) -> StoreResult<BTreeSet<Iri>> {
        let t = term.to_sparql();
        let query = ns::prefixed(&format!(
            "SELECT DISTINCT ?x WHERE {{ {} GRAPH ?g {{ ?x <{}> {t} }} FILTER(?x != {t}) {} }}",
            view.values_clause("g"),
            kind.predicate(),
            exclusion_fragment("x")
        ));
        Ok(iris(&self.store.select(&query)?, "x"))
    }

    /// Direct children of `parent` (internal and external parent links) in
    /// the view, snapshots excluded, sorted by label in `language`.
    pub fn sub_terms(
        &self,
        parent: &Iri,
        view: &ContextView,
        language: &str,
    ) -> StoreResult<Vec<TermInfo>> {
        let query = ns::prefixed(&format!(
            "SELECT DISTINCT ?x WHERE {{ {} GRAPH ?g {{ ?x ?rel {} . ?x a skos:Concept }} \
             FILTER(?rel IN (skos:broader, skos:broadMatch)) {} }}",
            view.values_clause("g"),
            parent.to_sparql(),
            exclusion_fragment("x")
        ));
        let ids = iris(&self.store.select(&query)?, "x");
        let mut infos: Vec<TermInfo> = self.describe(&ids, view)?.into_values().collect();
        sort_infos(&mut infos, language);
        Ok(infos)
    }

    /// Summaries for `ids`. Data from a context of the view wins over any
    /// other context; ids not found anywhere get an empty label.
    pub fn describe(
        &self,
        ids: &BTreeSet<Iri>,
        view: &ContextView,
    ) -> StoreResult<BTreeMap<Iri, TermInfo>> {
        if ids.is_empty() {
            return Ok(BTreeMap::new());
        }
        let values: Vec<String> = ids.iter().map(Iri::to_sparql).collect();
        let query = ns::prefixed(&format!(
            "SELECT ?x ?g ?label ?vocabulary WHERE {{ VALUES ?x {{ {} }} GRAPH ?g {{ \
                ?x a skos:Concept . \
                OPTIONAL {{ ?x skos:prefLabel ?label }} \
                OPTIONAL {{ ?vocabulary a glossa:Vocabulary }} \
             }} }}",
            values.join(" ")
        ));

        // id -> (context, in view, info)
        let mut best: BTreeMap<Iri, (ContextId, bool, TermInfo)> = BTreeMap::new();
        for row in self.store.select(&query)? {
            let (Some(id), Some(g)) = (row.iri("x"), row.iri("g")) else {
                continue;
            };
            let ctx = ContextId::new(g.clone());
            let in_view = view.vocabulary_of(&ctx).is_some();
            let entry = best.entry(id.clone()).or_insert_with(|| {
                (ctx.clone(), in_view, TermInfo::new(id.clone()))
            });
            if in_view && !entry.1 {
                *entry = (ctx.clone(), true, TermInfo::new(id.clone()));
            }
            if entry.0 != ctx {
                continue;
            }
            let info = &mut entry.2;
            if info.vocabulary.is_none() {
                info.vocabulary = view
                    .vocabulary_of(&ctx)
                    .cloned()
                    .or_else(|| row.iri("vocabulary").cloned());
            }
            if let Some(Value::Literal {
                value,
                language: Some(lang),
                ..
            }) = row.get("label")
            {
                info.label.set(lang.as_str(), value.as_str());
            }
        }

        Ok(ids
            .iter()
            .map(|id| {
                let info = best
                    .remove(id)
                    .map(|(_, _, info)| info)
                    .unwrap_or_else(|| TermInfo::new(id.clone()));
                (id.clone(), info)
            })
            .collect())
    }
}

impl std::fmt::Debug for RelationshipMerger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RelationshipMerger").finish()
    }
}

/// Sort summaries by label in `language`, falling back to any language.
pub fn sort_infos(infos: &mut [TermInfo], language: &str) {
    collation::sort_by_label(infos, language, |info| label_in(&info.label, language));
}

fn label_in<'a>(label: &'a MultilingualString, language: &str) -> Option<&'a str> {
    label.get_or_fallback(language)
}

fn iris(rows: &[Solution], var: &str) -> BTreeSet<Iri> {
    rows.iter().filter_map(|r| r.iri(var).cloned()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ns::{rdf, skos};
    use crate::store::{SparqlStore, Statement};

    fn iri(s: &str) -> Iri {
        Iri::new(s).unwrap()
    }

    struct Fixture {
        store: Arc<SparqlStore>,
        vocabulary: Iri,
        ctx: ContextId,
        view: ContextView,
    }

    impl Fixture {
        fn new() -> Self {
            let store = Arc::new(SparqlStore::in_memory().unwrap());
            let vocabulary = iri("https://example.org/v");
            let ctx = ContextId::canonical(&vocabulary);
            let mut view = ContextView::new();
            view.insert(vocabulary.clone(), ctx.clone());
            Self {
                store,
                vocabulary,
                ctx,
                view,
            }
        }

        fn concept(&self, id: &Iri, label: &str) {
            self.store
                .insert(
                    &self.ctx,
                    &[
                        Statement::link(id, rdf::TYPE, &Iri::known(skos::CONCEPT)),
                        Statement::new(id, skos::PREF_LABEL, Value::lang(label, "en")),
                    ],
                )
                .unwrap();
        }

        fn link(&self, s: &Iri, p: &str, o: &Iri) {
            self.store.insert(&self.ctx, &[Statement::link(s, p, o)]).unwrap();
        }

        fn merger(&self) -> RelationshipMerger {
            RelationshipMerger::new(self.store.clone())
        }
    }

    #[test]
    fn inverse_excludes_forward_and_self() {
        let f = Fixture::new();
        let [t, a, b, c] = ["t", "a", "b", "c"].map(|n| iri(&format!("https://example.org/v/term/{n}")));
        for (id, label) in [(&t, "T"), (&a, "A"), (&b, "B"), (&c, "C")] {
            f.concept(id, label);
        }
        f.link(&t, skos::RELATED, &a);
        f.link(&t, skos::RELATED, &b);
        f.link(&t, skos::RELATED, &t);
        f.link(&c, skos::RELATED, &t);
        f.link(&a, skos::RELATED, &t);

        let set = f
            .merger()
            .merge_kind(&t, RelationshipKind::Related, &f.ctx, &[], &f.view)
            .unwrap();
        let forward: Vec<_> = set.forward.iter().map(|i| i.id.clone()).collect();
        let inverse: Vec<_> = set.inverse.iter().map(|i| i.id.clone()).collect();
        assert_eq!(forward, vec![a, b]);
        assert_eq!(inverse, vec![c]);
        assert_eq!(set.inverse.iter().next().unwrap().label.get("en"), Some("C"));
    }

    #[test]
    fn merge_is_idempotent() {
        let f = Fixture::new();
        let t = iri("https://example.org/v/term/t");
        let x = iri("https://example.org/v/term/x");
        f.concept(&t, "T");
        f.concept(&x, "X");
        f.link(&x, skos::EXACT_MATCH, &t);
        let m = f.merger();
        let first = m.merge(&t, &f.ctx, &[], &f.view).unwrap();
        let second = m.merge(&t, &f.ctx, &[], &f.view).unwrap();
        assert_eq!(first, second);
        assert_eq!(first.exact_match.inverse.len(), 1);
    }

    #[test]
    fn sub_terms_are_sorted_and_include_external_children() {
        let f = Fixture::new();
        let p = iri("https://example.org/v/term/p");
        let b = iri("https://example.org/v/term/b");
        let a = iri("https://example.org/v/term/a");
        f.concept(&p, "Parent");
        f.concept(&b, "Beta");
        f.concept(&a, "Alpha");
        f.link(&b, skos::BROADER, &p);
        f.link(&a, skos::BROAD_MATCH, &p);

        let subs = f.merger().sub_terms(&p, &f.view, "en").unwrap();
        let labels: Vec<_> = subs.iter().map(|i| i.label.get("en").unwrap()).collect();
        assert_eq!(labels, vec!["Alpha", "Beta"]);
        assert_eq!(subs[0].vocabulary.as_ref(), Some(&f.vocabulary));
    }

    #[test]
    fn describe_unknown_id_yields_bare_info() {
        let f = Fixture::new();
        let ghost = iri("https://example.org/v/term/ghost");
        let infos = f.merger().describe(&[ghost.clone()].into(), &f.view).unwrap();
        assert_eq!(infos[&ghost], TermInfo::new(ghost.clone()));
        assert!(infos[&ghost].label.is_empty());
    }
}
