//! Identifier generation for terms, glossaries and snapshots.

use chrono::{DateTime, Utc};
use unicode_normalization::UnicodeNormalization;
use unicode_normalization::char::is_combining_mark;

use crate::context::Iri;
use crate::error::ConfigError;

/// Path segment under a vocabulary that holds its terms.
pub const TERM_SEGMENT: &str = "term";
/// Path segment under an entity that holds its snapshots.
pub const VERSION_SEGMENT: &str = "version";
/// Snapshot suffix layout: `yyyymmddThhmmssSSS`.
const VERSION_FORMAT: &str = "%Y%m%dT%H%M%S%3f";

/// Derives readable identifiers from labels.
pub struct IdentifierResolver;

impl IdentifierResolver {
    /// Reduce a label to a URL-safe slug: diacritics removed, lowercase,
    /// runs of anything other than ASCII letters and digits collapsed to `-`.
    pub fn normalize(label: &str) -> String {
        let mut slug = String::with_capacity(label.len());
        let mut pending_dash = false;
        for c in label.nfd().filter(|c| !is_combining_mark(*c)) {
            if c.is_ascii_alphanumeric() {
                if pending_dash && !slug.is_empty() {
                    slug.push('-');
                }
                pending_dash = false;
                slug.push(c.to_ascii_lowercase());
            } else {
                pending_dash = true;
            }
        }
        slug
    }

    /// `{namespace}/{slug(label)}`.
    pub fn generate(namespace: &Iri, label: &str) -> Result<Iri, ConfigError> {
        let slug = Self::normalize(label);
        if slug.is_empty() {
            return Err(ConfigError::Invalid {
                message: format!("label \"{label}\" yields an empty identifier"),
            });
        }
        namespace.join(&slug)
    }

    /// `{vocabulary}/term/{slug(label)}`.
    pub fn term_identifier(vocabulary: &Iri, label: &str) -> Result<Iri, ConfigError> {
        Self::generate(&vocabulary.join(TERM_SEGMENT)?, label)
    }

    /// Like [`Self::term_identifier`], appending `-2`, `-3`, ... until
    /// `taken` reports a free identifier.
    pub fn unique_term_identifier(
        vocabulary: &Iri,
        label: &str,
        mut taken: impl FnMut(&Iri) -> bool,
    ) -> Result<Iri, ConfigError> {
        let base = Self::term_identifier(vocabulary, label)?;
        if !taken(&base) {
            return Ok(base);
        }
        let mut n = 2usize;
        loop {
            let candidate = Iri::new(format!("{base}-{n}"))?;
            if !taken(&candidate) {
                return Ok(candidate);
            }
            n += 1;
        }
    }
}

/// The glossary owned by `vocabulary`: `{vocabulary}/glossary`.
pub fn glossary_identifier(vocabulary: &Iri) -> Iri {
    Iri::known(format!(
        "{}/glossary",
        vocabulary.as_str().trim_end_matches('/')
    ))
}

/// `{original}/version/{yyyymmddThhmmssSSS}`.
pub fn snapshot_identifier(original: &Iri, created: DateTime<Utc>) -> Iri {
    Iri::known(format!(
        "{}/{VERSION_SEGMENT}/{}",
        original.as_str().trim_end_matches('/'),
        created.format(VERSION_FORMAT)
    ))
}

/// Whether `id` has the shape of a snapshot identifier, returning the original.
pub fn snapshot_original(id: &Iri) -> Option<Iri> {
    let (original, suffix) = id.as_str().rsplit_once(&format!("/{VERSION_SEGMENT}/"))?;
    if suffix.is_empty() || suffix.contains('/') {
        return None;
    }
    Some(Iri::known(original))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn iri(s: &str) -> Iri {
        Iri::new(s).unwrap()
    }

    #[test]
    fn slug_strips_diacritics_and_punctuation() {
        assert_eq!(IdentifierResolver::normalize("Čína"), "cina");
        assert_eq!(IdentifierResolver::normalize("  Hlavní  město, Praha! "), "hlavni-mesto-praha");
        assert_eq!(IdentifierResolver::normalize("---"), "");
    }

    #[test]
    fn term_identifier_lives_under_vocabulary() {
        let id = IdentifierResolver::term_identifier(&iri("https://example.org/v/"), "Řeka").unwrap();
        assert_eq!(id.as_str(), "https://example.org/v/term/reka");
    }

    #[test]
    fn empty_label_is_rejected() {
        assert!(IdentifierResolver::term_identifier(&iri("https://example.org/v"), "?!").is_err());
    }

    #[test]
    fn unique_identifier_appends_counter() {
        let v = iri("https://example.org/v");
        let id = IdentifierResolver::unique_term_identifier(&v, "River", |c| {
            c.as_str().ends_with("/river") || c.as_str().ends_with("/river-2")
        })
        .unwrap();
        assert_eq!(id.as_str(), "https://example.org/v/term/river-3");
    }

    #[test]
    fn snapshot_identifier_format() {
        let at = DateTime::parse_from_rfc3339("2024-03-01T10:05:07.042Z")
            .unwrap()
            .with_timezone(&Utc);
        let id = snapshot_identifier(&iri("https://example.org/v/term/a"), at);
        assert_eq!(id.as_str(), "https://example.org/v/term/a/version/20240301T100507042");
        assert_eq!(snapshot_original(&id), Some(iri("https://example.org/v/term/a")));
        assert_eq!(snapshot_original(&iri("https://example.org/v/term/a")), None);
    }
}
