// thiserror's #[error("...{field}...")] format strings reference struct fields,
// but the compiler doesn't see through the derive macro and reports false positives.
#![allow(unused_assignments)]

//! # glossa
//!
//! Context-resolution and term-graph consistency layer for SKOS thesauri
//! stored in a named-graph (quad) store.
//!
//! ## Architecture
//!
//! - **Identity model** (`context`): IRIs, named-graph contexts and the per-operation view
//! - **Workspace overlay** (`workspace`): working-copy contexts shadowing canonical ones
//! - **Descriptors** (`descriptor`): per-attribute context assignment, expressed as data
//! - **Relationship merge** (`merge`): forward asserted vs. inverse inferred relationships
//! - **Snapshots** (`snapshot`): version stubs, exclusion fragment, "valid at" resolution
//! - **Listing cache** (`cache`): root/sub-term listings with invalidation tokens
//! - **Change hook** (`events`, `changes`): one event per logical mutation
//! - **Storage** (`store`): `oxigraph` quads behind the [`store::GraphStore`] trait
//!
//! ## Library usage
//!
//! ```no_run
//! use glossa::engine::{Thesaurus, ThesaurusConfig};
//! use glossa::model::{Term, Vocabulary};
//! use glossa::context::Iri;
//!
//! let thesaurus = Thesaurus::new(ThesaurusConfig::default()).unwrap();
//! let scope = thesaurus.scope();
//!
//! let vocabulary = Iri::new("https://example.org/vocabulary/geo").unwrap();
//! thesaurus
//!     .vocabularies()
//!     .persist(&scope, Vocabulary::new(vocabulary.clone()).with_label("en", "Geography"))
//!     .unwrap();
//!
//! let term = Term::new(Iri::new("https://example.org/vocabulary/geo/term/river").unwrap())
//!     .with_label("en", "River");
//! thesaurus.terms().persist(&scope, term, &vocabulary).unwrap();
//! let roots = thesaurus.terms().find_all_roots(&scope, &vocabulary, Default::default()).unwrap();
//! assert_eq!(roots.len(), 1);
//! ```

pub mod cache;
pub mod changes;
pub mod collation;
pub mod context;
pub mod descriptor;
pub mod engine;
pub mod error;
pub mod events;
pub mod identifier;
pub mod merge;
pub mod model;
pub mod ns;
pub mod paths;
pub mod repository;
pub mod snapshot;
pub mod store;
pub mod workspace;
