//! Text folding and boundary-aware term matching.

use unicode_normalization::UnicodeNormalization;
use unicode_normalization::char::is_combining_mark;

/// Folds text for table lookups: compatibility decomposition with combining
/// marks dropped, a handful of letters that do not decompose spelled out,
/// lowercased, internal whitespace collapsed and trimmed.
///
/// Scripts without a Latin transliteration are kept as-is.
///
/// ```
/// use forge_harvest::locate::fold;
///
/// assert_eq!(fold("  São   Paulo "), "sao paulo");
/// assert_eq!(fold("KØBENHAVN"), "kobenhavn");
/// assert_eq!(fold("中国"), "中国");
/// ```
#[must_use]
pub fn fold(text: &str) -> String {
    let mut folded = String::with_capacity(text.len());
    for ch in text.nfkd().filter(|c| !is_combining_mark(*c)) {
        for lower in ch.to_lowercase() {
            match lower {
                'ø' => folded.push('o'),
                'æ' => folded.push_str("ae"),
                'œ' => folded.push_str("oe"),
                'ß' => folded.push_str("ss"),
                'ł' => folded.push('l'),
                'đ' | 'ð' => folded.push('d'),
                'þ' => folded.push_str("th"),
                'ı' => folded.push('i'),
                other => folded.push(other),
            }
        }
    }
    folded.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Whether `haystack` contains `term` as a standalone word.
///
/// A side of `term` that ends in an alphanumeric character must be followed
/// (or preceded) by a non-alphanumeric character or the string edge; a side
/// that ends in punctuation matches anywhere. So `"na"` does not match inside
/// `"china"` while `";-)"` matches inside `"paris;-)"`.
#[must_use]
pub fn contains_term(haystack: &str, term: &str) -> bool {
    if term.is_empty() {
        return false;
    }
    let needs_left = term.chars().next().is_some_and(char::is_alphanumeric);
    let needs_right = term.chars().next_back().is_some_and(char::is_alphanumeric);

    haystack.match_indices(term).any(|(start, _)| {
        let end = start + term.len();
        let left_ok = !needs_left
            || !haystack[..start]
                .chars()
                .next_back()
                .is_some_and(char::is_alphanumeric);
        let right_ok =
            !needs_right || !haystack[end..].chars().next().is_some_and(char::is_alphanumeric);
        left_ok && right_ok
    })
}
