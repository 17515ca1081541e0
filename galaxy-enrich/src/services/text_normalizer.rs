//! Title and name canonicalization
//!
//! Titles are compared in a folded form: subtitle dropped, case-folded,
//! diacritics removed, punctuation turned into spaces, whitespace collapsed.
//! Every function here is idempotent.

use crate::types::NormalizedTitle;
use unicode_normalization::char::is_combining_mark;
use unicode_normalization::UnicodeNormalization;

/// Case-fold, strip diacritics, keep alphanumerics, collapse whitespace
///
/// No subtitle truncation; used for token comparisons of arbitrary text.
pub fn fold_text(text: &str) -> String {
    let mut folded = String::with_capacity(text.len());
    for c in text.nfkd().flat_map(char::to_lowercase) {
        if is_combining_mark(c) {
            continue;
        }
        if c.is_alphanumeric() {
            folded.push(c);
        } else {
            folded.push(' ');
        }
    }
    folded.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Canonical title: first non-empty subtitle segment, folded
///
/// Separators are `:`, `|`, en/em dashes, and a hyphen surrounded by
/// whitespace. Intra-word hyphens ("self-supervised") are not separators.
pub fn normalize_title(text: &str) -> NormalizedTitle {
    let folded = subtitle_segments(text)
        .into_iter()
        .map(fold_text)
        .find(|segment| !segment.is_empty())
        .unwrap_or_default();
    NormalizedTitle::from_normalized(folded)
}

fn subtitle_segments(text: &str) -> Vec<&str> {
    let chars: Vec<(usize, char)> = text.char_indices().collect();
    let mut segments = Vec::new();
    let mut start = 0;

    for (i, &(pos, c)) in chars.iter().enumerate() {
        let is_separator = match c {
            ':' | '|' | '\u{2013}' | '\u{2014}' => true,
            '-' => {
                let spaced_before = i > 0 && chars[i - 1].1.is_whitespace();
                let spaced_after = chars.get(i + 1).is_some_and(|&(_, n)| n.is_whitespace());
                spaced_before && spaced_after
            }
            _ => false,
        };
        if is_separator {
            segments.push(&text[start..pos]);
            start = pos + c.len_utf8();
        }
    }
    segments.push(&text[start..]);
    segments
}

/// Person name split into given and family parts (original casing kept)
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PersonName {
    pub given: String,
    pub family: String,
}

impl PersonName {
    /// `"given family"`, or whichever part exists
    pub fn full(&self) -> String {
        match (self.given.is_empty(), self.family.is_empty()) {
            (true, _) => self.family.clone(),
            (false, true) => self.given.clone(),
            (false, false) => format!("{} {}", self.given, self.family),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.given.is_empty() && self.family.is_empty()
    }
}

/// Split a name: last token is the family name, the rest are given names
///
/// `"Family, Given"` is reordered first. Empty input yields empty parts.
pub fn normalize_name(text: &str) -> PersonName {
    let text = text.trim();
    let reordered;
    let text = match text.split_once(',') {
        Some((family, given)) if !family.trim().is_empty() && !given.trim().is_empty() => {
            reordered = format!("{} {}", given.trim(), family.trim());
            reordered.as_str()
        }
        _ => text,
    };

    let mut tokens: Vec<&str> = text
        .split_whitespace()
        .map(|t| t.trim_matches(','))
        .filter(|t| !t.is_empty())
        .collect();
    let Some(family) = tokens.pop() else {
        return PersonName::default();
    };
    PersonName {
        given: tokens.join(" "),
        family: family.to_string(),
    }
}

/// Canonical DOI: scheme/prefix stripped, lowercased; `None` unless it starts with `10.`
pub fn normalize_doi(text: &str) -> Option<String> {
    let lowered = text.trim().to_lowercase();
    let mut doi = lowered.as_str();
    for prefix in [
        "https://doi.org/",
        "http://doi.org/",
        "https://dx.doi.org/",
        "http://dx.doi.org/",
        "doi.org/",
        "doi:",
    ] {
        if let Some(rest) = doi.strip_prefix(prefix) {
            doi = rest.trim_start();
            break;
        }
    }
    let doi = doi.trim_end_matches(['.', ',', ';', ')']);
    if doi.starts_with("10.") && doi.contains('/') {
        Some(doi.to_string())
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_subtitle_truncation_equalizes_titles() {
        let a = normalize_title("Deep Learning for Protein Folding");
        let b = normalize_title("Deep learning for protein folding: a survey");
        assert_eq!(a, b);
        assert_eq!(a.as_str(), "deep learning for protein folding");
    }

    #[test]
    fn test_diacritics_and_punctuation_stripped() {
        let title = normalize_title("  Études   sur l'Économie, (Vol. 2)  ");
        assert_eq!(title.as_str(), "etudes sur l economie vol 2");
    }

    #[test]
    fn test_spaced_dash_and_pipe_are_separators() {
        assert_eq!(normalize_title("Graph Nets - A Review").as_str(), "graph nets");
        assert_eq!(normalize_title("Graph Nets | Preprint").as_str(), "graph nets");
        assert_eq!(normalize_title("Graph Nets \u{2014} extended").as_str(), "graph nets");
    }

    #[test]
    fn test_intra_word_hyphen_kept_as_token_break() {
        assert_eq!(
            normalize_title("Self-Supervised Learning").as_str(),
            "self supervised learning"
        );
    }

    #[test]
    fn test_leading_separator_uses_next_segment() {
        assert_eq!(normalize_title(": Hidden Title: sub").as_str(), "hidden title");
        assert_eq!(normalize_title("").as_str(), "");
        assert_eq!(normalize_title(":::").as_str(), "");
    }

    #[test]
    fn test_normalize_title_idempotent() {
        let samples = [
            "Deep learning for protein folding: a survey",
            "  Études   sur l'Économie  ",
            "ℌilbert spaces — notes",
            "İstanbul Çalışmaları",
            "Self-Supervised | Learning",
            "ǅemal's ﬁnal report",
            "",
            "10:30 meeting",
        ];
        for s in samples {
            let once = normalize_title(s);
            let twice = normalize_title(once.as_str());
            assert_eq!(once, twice, "not idempotent for {:?}", s);
        }
    }

    #[test]
    fn test_normalize_name_splits_family_last() {
        let name = normalize_name("Ada King Lovelace");
        assert_eq!(name.given, "Ada King");
        assert_eq!(name.family, "Lovelace");
    }

    #[test]
    fn test_normalize_name_edge_cases() {
        assert_eq!(normalize_name(""), PersonName::default());
        assert_eq!(normalize_name("   "), PersonName::default());
        let single = normalize_name("Plato");
        assert_eq!(single.given, "");
        assert_eq!(single.family, "Plato");
    }

    #[test]
    fn test_normalize_name_comma_form() {
        let name = normalize_name("Lovelace, Ada");
        assert_eq!(name.given, "Ada");
        assert_eq!(name.family, "Lovelace");
        assert_eq!(normalize_name(&name.full()), name);
    }

    #[test]
    fn test_normalize_doi() {
        assert_eq!(
            normalize_doi("https://doi.org/10.1000/XYZ.1").as_deref(),
            Some("10.1000/xyz.1")
        );
        assert_eq!(normalize_doi("doi: 10.1000/abc.").as_deref(), Some("10.1000/abc"));
        assert_eq!(normalize_doi("not a doi"), None);
        assert_eq!(normalize_doi(""), None);
    }
}
