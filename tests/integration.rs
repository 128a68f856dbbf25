//! End-to-end tests for the thesaurus: overlay resolution, relationship
//! merging, snapshot handling, listing cache coherency and change events.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use chrono::{TimeZone, Utc};

use glossa::context::{ContextId, Iri};
use glossa::engine::{Thesaurus, ThesaurusConfig};
use glossa::error::{ConfigError, ConsistencyError, EntityError, GlossaError};
use glossa::events::{ChangeKind, VecListener};
use glossa::identifier::snapshot_identifier;
use glossa::model::{EntityKind, Page, RelationshipKind, Term, Versioned, Vocabulary};
use glossa::ns::{rdf, skos};
use glossa::store::{GraphStore, Pattern, Statement, Value};
use glossa::workspace::{OperationScope, WorkspaceMetadata};

fn iri(s: &str) -> Iri {
    Iri::new(s).unwrap()
}

fn thesaurus() -> Thesaurus {
    Thesaurus::new(ThesaurusConfig::default()).unwrap()
}

fn vocabulary(t: &Thesaurus, id: &str, label: &str) -> Iri {
    let id = iri(id);
    t.vocabularies()
        .persist(&t.scope(), Vocabulary::new(id.clone()).with_label("en", label))
        .unwrap();
    id
}

fn term(t: &Thesaurus, vocabulary: &Iri, slug: &str, label: &str) -> Iri {
    let id = vocabulary.join(&format!("term/{slug}")).unwrap();
    t.terms()
        .persist(&t.scope(), Term::new(id.clone()).with_label("en", label), vocabulary)
        .unwrap();
    id
}

fn ids<'a>(infos: impl IntoIterator<Item = &'a glossa::model::TermInfo>) -> BTreeSet<Iri> {
    infos.into_iter().map(|i| i.id.clone()).collect()
}

#[test]
fn inverse_related_excludes_forward_and_self() {
    let t = thesaurus();
    let v = vocabulary(&t, "https://example.org/v", "V");
    let scope = t.scope();
    let a = term(&t, &v, "a", "A");
    let b = term(&t, &v, "b", "B");
    let target = v.join("term/t").unwrap();
    t.terms()
        .persist(
            &scope,
            Term::new(target.clone())
                .with_label("en", "T")
                .with_related(&a)
                .with_related(&b),
            &v,
        )
        .unwrap();
    let c = v.join("term/c").unwrap();
    t.terms()
        .persist(&scope, Term::new(c.clone()).with_label("en", "C").with_related(&target), &v)
        .unwrap();
    let mut a_term = t.terms().find(&scope, &a).unwrap().unwrap();
    a_term = a_term.with_related(&target);
    t.terms().update(&scope, a_term).unwrap();

    let found = t.terms().find(&scope, &target).unwrap().unwrap();
    let related = &found.relationships.related;
    assert_eq!(ids(&related.forward), BTreeSet::from([a.clone(), b]));
    assert_eq!(ids(&related.inverse), BTreeSet::from([c]));
    assert!(!ids(related.all()).contains(&target));

    // Reading twice yields the same record.
    let again = t.terms().find(&scope, &target).unwrap().unwrap();
    assert_eq!(again.relationships, found.relationships);
}

#[test]
fn czech_roots_follow_czech_collation() {
    let t = Thesaurus::new(ThesaurusConfig {
        language: "cs".into(),
        ..Default::default()
    })
    .unwrap();
    let scope = t.scope();
    let v = iri("https://example.org/countries");
    t.vocabularies()
        .persist(&scope, Vocabulary::new(v.clone()).with_label("cs", "Země"))
        .unwrap();
    for (slug, label) in [
        ("spanelsko", "Španělsko"),
        ("syrie", "Sýrie"),
        ("nemecko", "Německo"),
        ("cina", "Čína"),
    ] {
        let id = v.join(&format!("term/{slug}")).unwrap();
        t.terms()
            .persist(&scope, Term::new(id).with_label("cs", label), &v)
            .unwrap();
    }

    let roots = t.terms().find_all_roots(&scope, &v, Page::default()).unwrap();
    let labels: Vec<&str> = roots
        .iter()
        .map(|n| n.info.label.get("cs").unwrap())
        .collect();
    assert_eq!(labels, ["Čína", "Německo", "Sýrie", "Španělsko"]);
}

#[test]
fn vocabulary_snapshot_is_excluded_but_resolvable() {
    let t = thesaurus();
    let v = vocabulary(&t, "https://example.org/v", "V");
    term(&t, &v, "river", "River");
    let scope = t.scope();
    let at = Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap();
    let snapshot = t.vocabularies().create_snapshot(&scope, &v, at).unwrap();
    assert_eq!(snapshot.id, snapshot_identifier(&v, at));

    let all = t.vocabularies().find_all(&scope).unwrap();
    assert_eq!(all.len(), 1);
    assert_eq!(all[0].id, v);
    assert!(t.vocabularies().find(&scope, &snapshot.id).unwrap().is_none());

    match t.vocabularies().lookup(&scope, &snapshot.id).unwrap() {
        Some(Versioned::Snapshot(s)) => {
            assert_eq!(s.version_of, v);
            assert_eq!(s.kind, EntityKind::Vocabulary);
            assert_eq!(s.created, at);
        }
        other => panic!("expected snapshot, got {other:?}"),
    }

    // Term stubs of the frozen vocabulary never show up in listings.
    assert_eq!(t.terms().find_all(&scope, &v).unwrap().len(), 1);
    assert_eq!(t.terms().search(&scope, "river", None).unwrap().len(), 1);
}

#[test]
fn root_lists_new_child() {
    let t = thesaurus();
    let v = vocabulary(&t, "https://example.org/v", "V");
    let scope = t.scope();
    let p = term(&t, &v, "p", "P");

    let roots = t.terms().find_all_roots(&scope, &v, Page::default()).unwrap();
    assert_eq!(roots.len(), 1);
    assert!(roots[0].sub_terms.is_empty());

    let c = v.join("term/c").unwrap();
    t.terms()
        .persist(&scope, Term::new(c.clone()).with_label("en", "C").with_parent(&p), &v)
        .unwrap();

    let roots = t.terms().find_all_roots(&scope, &v, Page::default()).unwrap();
    assert_eq!(roots.len(), 1);
    assert_eq!(roots[0].info.id, p);
    assert_eq!(ids(&roots[0].sub_terms), BTreeSet::from([c]));
}

#[test]
fn version_resolution_is_monotonic() {
    let t = thesaurus();
    let v = vocabulary(&t, "https://example.org/v", "V");
    let scope = t.scope();
    let x = term(&t, &v, "x", "X");
    let t1 = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
    let t2 = Utc.with_ymd_and_hms(2024, 2, 1, 0, 0, 0).unwrap();
    let t3 = Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap();
    for at in [t1, t2, t3] {
        t.terms().create_snapshot(&scope, &x, at).unwrap();
    }

    let between = Utc.with_ymd_and_hms(2024, 2, 15, 0, 0, 0).unwrap();
    match t.terms().find_version_valid_at(&scope, &x, between).unwrap() {
        Some(Versioned::Snapshot(s)) => assert_eq!(s.id, snapshot_identifier(&x, t2)),
        other => panic!("expected snapshot, got {other:?}"),
    }

    let before = Utc.with_ymd_and_hms(2023, 6, 1, 0, 0, 0).unwrap();
    match t.terms().find_version_valid_at(&scope, &x, before).unwrap() {
        Some(Versioned::Live(term)) => assert_eq!(term.id, x),
        other => panic!("expected live term, got {other:?}"),
    }

    let snapshots = t.terms().find_snapshots(&x).unwrap();
    let created: Vec<_> = snapshots.iter().map(|s| s.created).collect();
    assert_eq!(created, [t3, t2, t1]);

    // Snapshots stay out of live listings.
    assert_eq!(t.terms().find_all(&scope, &v).unwrap().len(), 1);
    assert!(t.terms().find(&scope, &snapshots[0].id).unwrap().is_none());
}

#[test]
fn moving_a_term_updates_cached_listings() {
    let t = thesaurus();
    let v = vocabulary(&t, "https://example.org/v", "V");
    let scope = t.scope();
    let p1 = term(&t, &v, "p1", "P1");
    let p2 = term(&t, &v, "p2", "P2");
    let c = v.join("term/c").unwrap();
    t.terms()
        .persist(&scope, Term::new(c.clone()).with_label("en", "C").with_parent(&p1), &v)
        .unwrap();

    let before = t.terms().find_all_roots(&scope, &v, Page::default()).unwrap();
    assert_eq!(ids(&before[0].sub_terms), BTreeSet::from([c.clone()]));
    assert!(before[1].sub_terms.is_empty());
    // Served from the cache the second time.
    t.terms().find_all_roots(&scope, &v, Page::default()).unwrap();
    assert!(t.cache_stats().hits > 0);

    let mut moved = t.terms().find(&scope, &c).unwrap().unwrap();
    moved.parent_terms = BTreeSet::from([p2.clone()]);
    t.terms().update(&scope, moved).unwrap();

    let after = t.terms().find_all_roots(&scope, &v, Page::default()).unwrap();
    assert_eq!(after[0].info.id, p1);
    assert!(after[0].sub_terms.is_empty());
    assert_eq!(after[1].info.id, p2);
    assert_eq!(ids(&after[1].sub_terms), BTreeSet::from([c.clone()]));
    assert!(t.terms().find_sub_terms(&scope, &p1).unwrap().is_empty());
    assert_eq!(t.terms().find_sub_terms(&scope, &p2).unwrap().len(), 1);
}

#[test]
fn working_context_shadows_canonical_only_for_registered_vocabulary() {
    let t = thesaurus();
    let v = vocabulary(&t, "https://example.org/v", "V");
    let u = vocabulary(&t, "https://example.org/u", "U");
    let a = term(&t, &v, "a", "Old");
    let b = term(&t, &u, "b", "Other");

    let working = ContextId::parse("https://example.org/workspace/1/v").unwrap();
    t.checkout(&v, &working).unwrap();

    let scope = t.scope();
    let mut edited = t.terms().find(&scope, &a).unwrap().unwrap();
    edited.label.set("en", "New");
    t.terms().update(&scope, edited).unwrap();

    let in_workspace = t.terms().find(&scope, &a).unwrap().unwrap();
    assert_eq!(in_workspace.label.get("en"), Some("New"));

    let canonical = OperationScope::new(WorkspaceMetadata::new("other", BTreeMap::new()), "en");
    let published = t.terms().find(&canonical, &a).unwrap().unwrap();
    assert_eq!(published.label.get("en"), Some("Old"));

    // The unregistered vocabulary resolves to its canonical context in both.
    for s in [&scope, &canonical] {
        let other = t.terms().find(s, &b).unwrap().unwrap();
        assert_eq!(other.vocabulary.as_ref(), Some(&u));
    }
}

#[test]
fn conflicting_registration_is_rejected() {
    let t = thesaurus();
    let v = vocabulary(&t, "https://example.org/v", "V");
    let w1 = ContextId::parse("https://example.org/ws/1").unwrap();
    let w2 = ContextId::parse("https://example.org/ws/2").unwrap();
    t.checkout(&v, &w1).unwrap();
    assert!(matches!(
        t.checkout(&v, &w2),
        Err(GlossaError::Config(_))
    ));
}

#[test]
fn self_references_are_dropped() {
    let t = thesaurus();
    let v = vocabulary(&t, "https://example.org/v", "V");
    let scope = t.scope();
    let x = v.join("term/x").unwrap();
    t.terms()
        .persist(
            &scope,
            Term::new(x.clone())
                .with_label("en", "X")
                .with_related(&x)
                .with_parent(&x),
            &v,
        )
        .unwrap();

    let found = t.terms().find(&scope, &x).unwrap().unwrap();
    assert!(found.parent_terms.is_empty());
    assert_eq!(found.relationships.related.all().count(), 0);
    let roots = t.terms().find_all_roots(&scope, &v, Page::default()).unwrap();
    assert_eq!(roots.len(), 1);
}

#[test]
fn removal_with_sub_terms_is_refused() {
    let t = thesaurus();
    let v = vocabulary(&t, "https://example.org/v", "V");
    let scope = t.scope();
    let p = term(&t, &v, "p", "P");
    let c = v.join("term/c").unwrap();
    t.terms()
        .persist(&scope, Term::new(c.clone()).with_label("en", "C").with_parent(&p), &v)
        .unwrap();

    let err = t.terms().remove(&scope, &p).unwrap_err();
    assert!(matches!(
        err,
        GlossaError::Entity(EntityError::HasSubTerms { count: 1, .. })
    ));

    t.terms().remove(&scope, &c).unwrap();
    t.terms().remove(&scope, &p).unwrap();
    assert!(t.terms().find_all(&scope, &v).unwrap().is_empty());
    assert!(t.terms().find_all_roots(&scope, &v, Page::default()).unwrap().is_empty());
}

#[test]
fn removing_a_term_drops_incoming_relationships() {
    let t = thesaurus();
    let v = vocabulary(&t, "https://example.org/v", "V");
    let scope = t.scope();
    let a = term(&t, &v, "a", "A");
    let b = v.join("term/b").unwrap();
    t.terms()
        .persist(&scope, Term::new(b.clone()).with_label("en", "B").with_related(&a), &v)
        .unwrap();

    t.terms().remove(&scope, &a).unwrap();
    let found = t.terms().find(&scope, &b).unwrap().unwrap();
    assert_eq!(found.relationships.related.all().count(), 0);
}

#[test]
fn cross_vocabulary_relationship_removed_in_both_directions() {
    let t = thesaurus();
    let base = vocabulary(&t, "https://example.org/base", "Base");
    let scope = t.scope();
    let derived = iri("https://example.org/derived");
    t.vocabularies()
        .persist(
            &scope,
            Vocabulary::new(derived.clone())
                .with_label("en", "Derived")
                .with_import(&base),
        )
        .unwrap();
    let x = term(&t, &base, "x", "X");
    let y = derived.join("term/y").unwrap();
    t.terms()
        .persist(
            &scope,
            Term::new(y.clone())
                .with_label("en", "Y")
                .with_relationship(RelationshipKind::ExactMatch, &x),
            &derived,
        )
        .unwrap();

    let x_term = t.terms().find(&scope, &x).unwrap().unwrap();
    assert_eq!(ids(&x_term.relationships.exact_match.inverse), BTreeSet::from([y.clone()]));

    let roots = t
        .terms()
        .find_all_roots_including_imports(&scope, &derived, Page::default())
        .unwrap();
    assert_eq!(roots.len(), 2);

    t.terms()
        .remove_relationship(&scope, &x, RelationshipKind::ExactMatch, &y)
        .unwrap();
    let x_term = t.terms().find(&scope, &x).unwrap().unwrap();
    let y_term = t.terms().find(&scope, &y).unwrap().unwrap();
    assert_eq!(x_term.relationships.exact_match.all().count(), 0);
    assert_eq!(y_term.relationships.exact_match.all().count(), 0);

    assert!(matches!(
        t.vocabularies().remove(&scope, &base),
        Err(GlossaError::Entity(EntityError::InUse { .. }))
    ));
}

#[test]
fn external_parent_is_stored_as_broad_match() {
    let t = thesaurus();
    let base = vocabulary(&t, "https://example.org/base", "Base");
    let other = vocabulary(&t, "https://example.org/other", "Other");
    let scope = t.scope();
    let x = term(&t, &base, "x", "X");
    let y = other.join("term/y").unwrap();
    t.terms()
        .persist(&scope, Term::new(y.clone()).with_label("en", "Y").with_parent(&x), &other)
        .unwrap();

    let y_term = t.terms().find(&scope, &y).unwrap().unwrap();
    assert!(y_term.parent_terms.is_empty());
    assert_eq!(y_term.external_parent_terms, BTreeSet::from([x.clone()]));
    // A term with only an external parent is a root of its own vocabulary.
    let roots = t.terms().find_all_roots(&scope, &other, Page::default()).unwrap();
    assert_eq!(roots.len(), 1);
    assert_eq!(ids(&t.terms().find_sub_terms(&scope, &x).unwrap()), BTreeSet::from([y]));
}

#[test]
fn term_in_two_visible_contexts_is_a_consistency_error() {
    let t = thesaurus();
    let v = vocabulary(&t, "https://example.org/v", "V");
    let u = vocabulary(&t, "https://example.org/u", "U");
    let x = term(&t, &v, "x", "X");
    t.store()
        .insert(
            &ContextId::canonical(&u),
            &[Statement::link(&x, rdf::TYPE, &iri(skos::CONCEPT))],
        )
        .unwrap();

    assert!(matches!(
        t.terms().find(&t.scope(), &x),
        Err(GlossaError::Consistency(ConsistencyError::AmbiguousContext { .. }))
    ));
}

#[test]
fn snapshot_listed_as_root_is_a_consistency_error() {
    let t = thesaurus();
    let v = vocabulary(&t, "https://example.org/v", "V");
    let scope = t.scope();
    let x = term(&t, &v, "x", "X");
    let at = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
    let snapshot = t.terms().create_snapshot(&scope, &x, at).unwrap();
    let glossary = t.vocabularies().find(&scope, &v).unwrap().unwrap().glossary.id;
    t.store()
        .insert(
            &ContextId::canonical(&v),
            &[Statement::link(&glossary, skos::HAS_TOP_CONCEPT, &snapshot.id)],
        )
        .unwrap();

    assert!(matches!(
        t.terms().find_all_roots(&scope, &v, Page::default()),
        Err(GlossaError::Consistency(ConsistencyError::SnapshotAsRoot { .. }))
    ));
}

#[test]
fn each_mutation_fires_one_event() {
    let t = thesaurus();
    let listener = Arc::new(VecListener::new());
    t.subscribe(listener.clone());

    let v = vocabulary(&t, "https://example.org/v", "V");
    let x = term(&t, &v, "x", "X");
    let scope = t.scope();
    let found = t.terms().find(&scope, &x).unwrap().unwrap();
    t.terms().update(&scope, found).unwrap();
    t.terms().remove(&scope, &x).unwrap();

    let events = listener.events();
    let changes: Vec<(EntityKind, ChangeKind)> = events
        .iter()
        .map(|e| (e.entity.kind, e.change))
        .collect();
    assert_eq!(
        changes,
        [
            (EntityKind::Vocabulary, ChangeKind::Persist),
            (EntityKind::Term, ChangeKind::Persist),
            (EntityKind::Term, ChangeKind::Update),
            (EntityKind::Term, ChangeKind::Remove),
        ]
    );

    // Failed writes publish nothing.
    assert!(t.terms().remove(&scope, &x).is_err());
    assert_eq!(listener.len(), 4);
}

fn stored(t: &Thesaurus, ctx: &ContextId) -> Vec<Statement> {
    let mut statements = t.store().find(ctx, &Pattern::any()).unwrap();
    statements.sort();
    statements
}

#[test]
fn failed_update_leaves_term_untouched() {
    let t = thesaurus();
    let v = vocabulary(&t, "https://example.org/v", "V");
    let scope = t.scope();
    let p = term(&t, &v, "p", "P");
    let r = term(&t, &v, "r", "R");
    let x = v.join("term/x").unwrap();
    t.terms()
        .persist(
            &scope,
            Term::new(x.clone())
                .with_label("en", "X")
                .with_definition("en", "Something")
                .with_parent(&p),
            &v,
        )
        .unwrap();
    let roots_before = t.terms().find_all_roots(&scope, &v, Page::default()).unwrap();
    let ctx = ContextId::canonical(&v);
    let before = stored(&t, &ctx);

    let listener = Arc::new(VecListener::new());
    t.subscribe(listener.clone());
    for id in [&x, &r] {
        let found = t.terms().find(&scope, id).unwrap().unwrap();
        assert!(matches!(
            t.terms().update(&scope, found.with_label("not a tag!", "Bad")),
            Err(GlossaError::Config(ConfigError::InvalidLanguage { .. }))
        ));
    }
    assert!(listener.is_empty());
    assert_eq!(stored(&t, &ctx), before);

    let kept = t.terms().find(&scope, &x).unwrap().unwrap();
    assert_eq!(kept.label.get("en"), Some("X"));
    assert_eq!(kept.definition.get("en"), Some("Something"));
    assert_eq!(kept.parent_terms, BTreeSet::from([p.clone()]));

    let roots_after = t.terms().find_all_roots(&scope, &v, Page::default()).unwrap();
    assert_eq!(roots_after, roots_before);
    let root_ids: BTreeSet<Iri> = roots_after.iter().map(|n| n.info.id.clone()).collect();
    assert_eq!(root_ids, BTreeSet::from([p.clone(), r]));
    assert_eq!(ids(&t.terms().find_sub_terms(&scope, &p).unwrap()), BTreeSet::from([x]));
}

#[test]
fn failed_persist_leaves_nothing_behind() {
    let t = thesaurus();
    let v = vocabulary(&t, "https://example.org/v", "V");
    let scope = t.scope();
    let ctx = ContextId::canonical(&v);
    let before = stored(&t, &ctx);
    let listener = Arc::new(VecListener::new());
    t.subscribe(listener.clone());

    let x = v.join("term/x").unwrap();
    let bad = Term::new(x.clone())
        .with_label("en", "X")
        .with_label("bad tag", "Y");
    assert!(t.terms().persist(&scope, bad, &v).is_err());
    assert!(!t.terms().exists(&scope, &x).unwrap());
    assert!(listener.is_empty());
    assert_eq!(stored(&t, &ctx), before);

    // A corrected retry is not mistaken for a duplicate.
    t.terms()
        .persist(&scope, Term::new(x.clone()).with_label("en", "X"), &v)
        .unwrap();
    assert!(t.terms().exists(&scope, &x).unwrap());
    assert_eq!(listener.len(), 1);
}

#[test]
fn update_keeps_statements_outside_the_model() {
    let t = thesaurus();
    let v = vocabulary(&t, "https://example.org/v", "V");
    let scope = t.scope();
    let x = term(&t, &v, "x", "X");
    let ctx = ContextId::canonical(&v);
    let scope_note = "http://www.w3.org/2004/02/skos/core#scopeNote";
    let extra = [
        Statement::new(&x, scope_note, Value::lang("note", "en")),
        Statement::new(&x, skos::PREF_LABEL, Value::string("River")),
        Statement::link(
            &x,
            "http://www.w3.org/2000/01/rdf-schema#seeAlso",
            &iri("https://example.org/elsewhere"),
        ),
        Statement::link(&x, rdf::TYPE, &iri("https://example.org/ontology/Place")),
        Statement::new(
            &x,
            "https://example.org/ontology/rank",
            Value::typed("42", "http://www.w3.org/2001/XMLSchema#integer"),
        ),
    ];
    t.store().insert(&ctx, &extra).unwrap();

    let found = t.terms().find(&scope, &x).unwrap().unwrap();
    assert_eq!(
        found.properties[&iri(scope_note)],
        BTreeSet::from([Value::lang("note", "en")])
    );
    t.terms()
        .update(&scope, found.with_label("en", "Renamed"))
        .unwrap();

    let after = t.store().find(&ctx, &Pattern::subject(&x)).unwrap();
    for statement in &extra {
        assert!(after.contains(statement), "lost {statement:?}");
    }
    assert!(after.contains(&Statement::new(&x, skos::PREF_LABEL, Value::lang("Renamed", "en"))));
    assert!(!after.contains(&Statement::new(&x, skos::PREF_LABEL, Value::lang("X", "en"))));
}

#[test]
fn duplicate_persist_is_rejected() {
    let t = thesaurus();
    let v = vocabulary(&t, "https://example.org/v", "V");
    let x = term(&t, &v, "x", "X");
    let scope = t.scope();
    assert!(matches!(
        t.terms().persist(&scope, Term::new(x), &v),
        Err(GlossaError::Entity(EntityError::AlreadyExists { .. }))
    ));
    assert!(t.vocabularies().persist(&scope, Vocabulary::new(v)).is_err());
}

#[test]
fn label_lookup_ignores_case() {
    let t = thesaurus();
    let v = vocabulary(&t, "https://example.org/v", "V");
    term(&t, &v, "river", "River");
    let scope = t.scope();
    assert!(t.terms().exists_in_vocabulary(&scope, "river", &v, "en").unwrap());
    assert!(!t.terms().exists_in_vocabulary(&scope, "lake", &v, "en").unwrap());
    assert!(!t.terms().exists_in_vocabulary(&scope, "river", &v, "cs").unwrap());
}

#[test]
fn recently_modified_skips_removed_entities() {
    let t = thesaurus();
    let v = vocabulary(&t, "https://example.org/v", "V");
    let a = term(&t, &v, "a", "A");
    let b = term(&t, &v, "b", "B");
    t.terms().remove(&t.scope(), &a).unwrap();

    let recent = t.recently_modified(10).unwrap();
    let ids: Vec<&Iri> = recent.iter().map(|r| &r.id).collect();
    assert!(ids.contains(&&b));
    assert!(ids.contains(&&v));
    assert!(!ids.contains(&&a));
}
