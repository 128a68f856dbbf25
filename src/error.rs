//! Rich diagnostic error types for glossa.
//!
//! Each area defines its own error type with miette `#[diagnostic]` derives,
//! providing error codes, help text, and source chains. Read boundaries report
//! absent data as `None` / empty collections; the `NotFound` variants below are
//! only raised by writes that target an entity which does not exist.

use miette::Diagnostic;
use thiserror::Error;

use crate::workspace::WorkspaceError;

/// Top-level error type for glossa.
#[derive(Debug, Error, Diagnostic)]
pub enum GlossaError {
    #[error(transparent)]
    #[diagnostic(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Consistency(#[from] ConsistencyError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Entity(#[from] EntityError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Workspace(#[from] WorkspaceError),
}

// ---------------------------------------------------------------------------
// Configuration errors
// ---------------------------------------------------------------------------

/// Fatal misconfiguration. Never retried.
#[derive(Debug, Error, Diagnostic)]
pub enum ConfigError {
    #[error("no context strategy registered for entity kind {kind}")]
    #[diagnostic(
        code(glossa::config::missing_strategy),
        help(
            "Every entity kind that is read or written needs a context strategy. \
             Register one with `DescriptorBuilder::register()` before using it."
        )
    )]
    MissingStrategy { kind: String },

    #[error("vocabulary {vocabulary} is already edited in context {existing}, cannot register {requested}")]
    #[diagnostic(
        code(glossa::config::conflicting_registration),
        help(
            "A workspace may hold at most one working context per vocabulary. \
             Clear the existing registration first."
        )
    )]
    ConflictingRegistration {
        vocabulary: String,
        existing: String,
        requested: String,
    },

    #[error("context {context} is already the working context of {holder}, cannot use it for {vocabulary}")]
    #[diagnostic(
        code(glossa::config::context_in_use),
        help(
            "A working context serves a single vocabulary. Pick another context \
             or clear the registration of the vocabulary holding it."
        )
    )]
    ContextInUse {
        context: String,
        holder: String,
        vocabulary: String,
    },

    #[error("invalid IRI \"{iri}\": {message}")]
    #[diagnostic(
        code(glossa::config::invalid_iri),
        help("Identifiers must be absolute IRIs, e.g. `https://example.org/vocabulary/geo`.")
    )]
    InvalidIri { iri: String, message: String },

    #[error("invalid language tag \"{tag}\"")]
    #[diagnostic(
        code(glossa::config::invalid_language),
        help("Use a BCP 47 language tag such as `en`, `cs` or `pt-BR`.")
    )]
    InvalidLanguage { tag: String },

    #[error("invalid configuration: {message}")]
    #[diagnostic(code(glossa::config::invalid), help("Check the thesaurus configuration. {message}"))]
    Invalid { message: String },
}

// ---------------------------------------------------------------------------
// Store errors
// ---------------------------------------------------------------------------

/// Failures of the underlying graph store.
#[derive(Debug, Error, Diagnostic)]
pub enum StoreError {
    #[error("persistence failure: {message}")]
    #[diagnostic(
        code(glossa::store::persistence),
        help(
            "The graph store rejected the operation. Check the query or the \
             on-disk store; the operation was not retried."
        )
    )]
    Persistence { message: String },

    #[error("I/O error: {source}")]
    #[diagnostic(
        code(glossa::store::io),
        help("Check that the data directory exists and has correct permissions.")
    )]
    Io {
        #[source]
        source: std::io::Error,
    },
}

/// Result type for store operations.
pub type StoreResult<T> = std::result::Result<T, StoreError>;

// ---------------------------------------------------------------------------
// Consistency errors
// ---------------------------------------------------------------------------

/// Data-integrity violations. Logged and surfaced, never auto-corrected.
#[derive(Debug, Error, Diagnostic)]
pub enum ConsistencyError {
    #[error("snapshot {term} is listed as a root term of vocabulary {vocabulary}")]
    #[diagnostic(
        code(glossa::consistency::snapshot_as_root),
        help(
            "Snapshots are immutable version stubs and must never be top concepts \
             of a live glossary. Remove the `skos:hasTopConcept` statement manually."
        )
    )]
    SnapshotAsRoot { term: String, vocabulary: String },

    #[error("term {term} is asserted in several visible contexts: {contexts}")]
    #[diagnostic(
        code(glossa::consistency::ambiguous_context),
        help(
            "A term must belong to exactly one vocabulary in the current workspace view. \
             Remove the duplicate `skos:Concept` assertion from one of the contexts."
        )
    )]
    AmbiguousContext { term: String, contexts: String },
}

// ---------------------------------------------------------------------------
// Entity errors
// ---------------------------------------------------------------------------

/// Rejected writes on individual entities.
#[derive(Debug, Error, Diagnostic)]
pub enum EntityError {
    #[error("{kind} {id} not found")]
    #[diagnostic(
        code(glossa::entity::not_found),
        help("The entity does not exist in the context resolved for the current workspace.")
    )]
    NotFound { kind: String, id: String },

    #[error("{kind} {id} already exists")]
    #[diagnostic(
        code(glossa::entity::already_exists),
        help("Use `update()` to modify an existing entity, or choose another identifier.")
    )]
    AlreadyExists { kind: String, id: String },

    #[error("term {id} still has {count} sub-term(s)")]
    #[diagnostic(
        code(glossa::entity::has_sub_terms),
        help("Remove or re-parent the sub-terms before removing their parent.")
    )]
    HasSubTerms { id: String, count: usize },

    #[error("vocabulary {id} is imported by {by}")]
    #[diagnostic(
        code(glossa::entity::in_use),
        help("Remove the import from the importing vocabularies first.")
    )]
    InUse { id: String, by: String },
}

/// Convenience alias for functions returning glossa results.
pub type GlossaResult<T> = std::result::Result<T, GlossaError>;
