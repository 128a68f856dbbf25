//! Language-aware label ordering.
//!
//! Primary comparison ignores case and diacritics, except for Czech and
//! Slovak where the caron letters (č ř š ž) sort as separate letters right
//! after their base letter and the `ch` digraph sorts after `h`. Labels that
//! compare equal at the primary level fall back to codepoint order.

use std::cmp::Ordering;

use unicode_normalization::UnicodeNormalization;
use unicode_normalization::char::is_combining_mark;

const COMBINING_CARON: char = '\u{030C}';

/// Precomputed sort key for one label.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CollationKey {
    weights: Vec<u32>,
    raw: String,
}

impl CollationKey {
    pub fn new(text: &str, language: &str) -> Self {
        Self {
            weights: primary_weights(text, language),
            raw: text.to_string(),
        }
    }
}

impl PartialOrd for CollationKey {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for CollationKey {
    fn cmp(&self, other: &Self) -> Ordering {
        self.weights
            .cmp(&other.weights)
            .then_with(|| self.raw.cmp(&other.raw))
    }
}

fn has_czech_alphabet(language: &str) -> bool {
    let primary = language.split(['-', '_']).next().unwrap_or_default();
    primary.eq_ignore_ascii_case("cs") || primary.eq_ignore_ascii_case("sk")
}

fn primary_weights(text: &str, language: &str) -> Vec<u32> {
    let czech = has_czech_alphabet(language);
    let chars: Vec<char> = text.to_lowercase().nfd().collect();
    let mut weights = Vec::with_capacity(chars.len());
    let mut i = 0;
    while i < chars.len() {
        let c = chars[i];
        i += 1;
        if is_combining_mark(c) {
            continue;
        }
        let mut marks = Vec::new();
        while i < chars.len() && is_combining_mark(chars[i]) {
            marks.push(chars[i]);
            i += 1;
        }
        let base = c as u32 * 4;
        if czech && matches!(c, 'c' | 'r' | 's' | 'z') && marks.contains(&COMBINING_CARON) {
            weights.push(base + 2);
        } else if czech && c == 'c' && marks.is_empty() && chars.get(i) == Some(&'h') {
            weights.push('h' as u32 * 4 + 3);
            i += 1;
        } else {
            weights.push(base);
        }
    }
    weights
}

/// Compare two labels in `language`.
pub fn compare(a: &str, b: &str, language: &str) -> Ordering {
    CollationKey::new(a, language).cmp(&CollationKey::new(b, language))
}

/// Sort `items` by the label `label` extracts; unlabeled items go last.
pub fn sort_by_label<T>(items: &mut [T], language: &str, label: impl Fn(&T) -> Option<&str>) {
    items.sort_by_cached_key(|item| match label(item) {
        Some(text) => (false, CollationKey::new(text, language)),
        None => (true, CollationKey::new("", language)),
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn czech_caron_letters_follow_base_letter() {
        let mut labels = vec!["Španělsko", "Sýrie", "Německo", "Čína"];
        sort_by_label(&mut labels, "cs", |l| Some(*l));
        assert_eq!(labels, vec!["Čína", "Německo", "Sýrie", "Španělsko"]);
    }

    #[test]
    fn ch_digraph_sorts_after_h() {
        assert_eq!(compare("chléb", "hrad", "cs"), Ordering::Greater);
        assert_eq!(compare("chléb", "indie", "cs"), Ordering::Less);
        assert_eq!(compare("chléb", "hrad", "en"), Ordering::Less);
    }

    #[test]
    fn other_languages_ignore_diacritics() {
        assert_eq!(compare("Špan", "Sz", "en"), Ordering::Less);
        assert_eq!(compare("école", "ecole", "fr"), Ordering::Greater);
        assert_eq!(compare("Ecole", "ecole", "fr"), Ordering::Less);
    }

    #[test]
    fn unlabeled_items_sort_last() {
        let mut items = vec![None, Some("b"), Some("a")];
        sort_by_label(&mut items, "en", |i| *i);
        assert_eq!(items, vec![Some("a"), Some("b"), None]);
    }
}
