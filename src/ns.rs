//! RDF vocabulary constants used by the thesaurus model.

/// SPARQL prologue shared by every query issued by the repositories.
pub const SPARQL_PREFIXES: &str = "\
PREFIX rdf: <http://www.w3.org/1999/02/22-rdf-syntax-ns#>
PREFIX xsd: <http://www.w3.org/2001/XMLSchema#>
PREFIX skos: <http://www.w3.org/2004/02/skos/core#>
PREFIX dcterms: <http://purl.org/dc/terms/>
PREFIX glossa: <https://glossa.dev/ontology/>
";

/// Prepend the shared prefixes to a query body.
pub fn prefixed(body: &str) -> String {
    format!("{SPARQL_PREFIXES}{body}")
}

pub mod rdf {
    pub const TYPE: &str = "http://www.w3.org/1999/02/22-rdf-syntax-ns#type";
}

pub mod xsd {
    pub const BOOLEAN: &str = "http://www.w3.org/2001/XMLSchema#boolean";
    pub const DATE_TIME: &str = "http://www.w3.org/2001/XMLSchema#dateTime";
}

pub mod skos {
    pub const CONCEPT: &str = "http://www.w3.org/2004/02/skos/core#Concept";
    pub const CONCEPT_SCHEME: &str = "http://www.w3.org/2004/02/skos/core#ConceptScheme";
    pub const PREF_LABEL: &str = "http://www.w3.org/2004/02/skos/core#prefLabel";
    pub const ALT_LABEL: &str = "http://www.w3.org/2004/02/skos/core#altLabel";
    pub const HIDDEN_LABEL: &str = "http://www.w3.org/2004/02/skos/core#hiddenLabel";
    pub const DEFINITION: &str = "http://www.w3.org/2004/02/skos/core#definition";
    pub const BROADER: &str = "http://www.w3.org/2004/02/skos/core#broader";
    pub const BROAD_MATCH: &str = "http://www.w3.org/2004/02/skos/core#broadMatch";
    pub const RELATED: &str = "http://www.w3.org/2004/02/skos/core#related";
    pub const RELATED_MATCH: &str = "http://www.w3.org/2004/02/skos/core#relatedMatch";
    pub const EXACT_MATCH: &str = "http://www.w3.org/2004/02/skos/core#exactMatch";
    pub const HAS_TOP_CONCEPT: &str = "http://www.w3.org/2004/02/skos/core#hasTopConcept";
}

pub mod dcterms {
    pub const TITLE: &str = "http://purl.org/dc/terms/title";
    pub const DESCRIPTION: &str = "http://purl.org/dc/terms/description";
}

/// Application ontology.
pub mod glossa {
    pub const NS: &str = "https://glossa.dev/ontology/";

    pub const VOCABULARY: &str = "https://glossa.dev/ontology/Vocabulary";
    pub const HAS_GLOSSARY: &str = "https://glossa.dev/ontology/hasGlossary";
    pub const IMPORTS: &str = "https://glossa.dev/ontology/imports";
    pub const DESCRIBES_DOCUMENT: &str = "https://glossa.dev/ontology/describesDocument";
    pub const IS_DRAFT: &str = "https://glossa.dev/ontology/isDraft";

    /// Version marker type carried by every snapshot.
    pub const SNAPSHOT: &str = "https://glossa.dev/ontology/Snapshot";
    pub const TERM_SNAPSHOT: &str = "https://glossa.dev/ontology/TermSnapshot";
    pub const VOCABULARY_SNAPSHOT: &str = "https://glossa.dev/ontology/VocabularySnapshot";
    pub const VERSION_OF: &str = "https://glossa.dev/ontology/versionOf";
    pub const SNAPSHOT_CREATED: &str = "https://glossa.dev/ontology/snapshotCreated";

    pub const CHANGE_RECORD: &str = "https://glossa.dev/ontology/ChangeRecord";
    pub const CHANGED_ENTITY: &str = "https://glossa.dev/ontology/changedEntity";
    pub const CHANGE_KIND: &str = "https://glossa.dev/ontology/changeKind";
    pub const ENTITY_KIND: &str = "https://glossa.dev/ontology/entityKind";
    pub const AUTHOR: &str = "https://glossa.dev/ontology/author";
    pub const TIMESTAMP: &str = "https://glossa.dev/ontology/timestamp";

    /// Context holding change-tracking records.
    pub const CHANGES_CONTEXT: &str = "https://glossa.dev/context/changes";
}

/// Predicates whose values the term reader maps onto dedicated fields.
/// Everything else ends up in the extended properties.
pub const TERM_MODEL_PREDICATES: &[&str] = &[
    rdf::TYPE,
    skos::PREF_LABEL,
    skos::ALT_LABEL,
    skos::HIDDEN_LABEL,
    skos::DEFINITION,
    skos::BROADER,
    skos::BROAD_MATCH,
    skos::RELATED,
    skos::RELATED_MATCH,
    skos::EXACT_MATCH,
    dcterms::DESCRIPTION,
    glossa::IS_DRAFT,
];
