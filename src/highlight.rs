use std::collections::HashSet;

use regex::{Regex, RegexBuilder};

/// Case-insensitive matcher for the words of a search query, longest word
/// first so overlapping words highlight the wider match.
pub fn query_matcher(query: &str) -> Option<Regex> {
    let mut seen = HashSet::new();
    let mut words: Vec<&str> = query
        .split_whitespace()
        .filter(|word| seen.insert(word.to_lowercase()))
        .collect();
    if words.is_empty() {
        return None;
    }
    words.sort_by(|a, b| b.len().cmp(&a.len()));
    let pattern = words
        .into_iter()
        .map(regex::escape)
        .collect::<Vec<_>>()
        .join("|");
    RegexBuilder::new(&pattern)
        .case_insensitive(true)
        .build()
        .ok()
}

/// Splits `text` into `(segment, is_match)` runs for rendering.
pub fn segments<'a>(text: &'a str, matcher: Option<&Regex>) -> Vec<(&'a str, bool)> {
    let Some(matcher) = matcher else {
        return vec![(text, false)];
    };
    let mut out = Vec::new();
    let mut cursor = 0;
    for found in matcher.find_iter(text) {
        if found.start() > cursor {
            out.push((&text[cursor..found.start()], false));
        }
        out.push((found.as_str(), true));
        cursor = found.end();
    }
    if cursor < text.len() {
        out.push((&text[cursor..], false));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prefers_longer_words_first() {
        let regex = query_matcher("not note").expect("regex");
        let matches: Vec<_> = regex.find_iter("notebook").map(|m| m.as_str()).collect();
        assert_eq!(matches, vec!["note"]);
    }

    #[test]
    fn blank_query_has_no_matcher() {
        assert!(query_matcher("   ").is_none());
    }

    #[test]
    fn splits_text_around_matches() {
        let regex = query_matcher("TODO").expect("regex");
        assert_eq!(
            segments("a todo list, Todo", Some(&regex)),
            vec![("a ", false), ("todo", true), (" list, ", false), ("Todo", true)]
        );
        assert_eq!(segments("plain", None), vec![("plain", false)]);
    }
}
