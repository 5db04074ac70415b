//! Matcher grammar: `*`/empty matches everything, a pipe-separated list of
//! words compares by equality, anything else compiles as a regex (an
//! invalid regex is logged and treated as non-match).
//!
//! Simplified from `astrid-hooks::hook::HookMatcher`'s four-variant enum
//! (glob/regex/tool-names/server-names) down to spec.md's single string
//! grammar.

use regex::Regex;
use tracing::warn;

/// Whether `matcher` matches `value`, per the grammar above.
#[must_use]
pub fn matches(matcher: &str, value: &str) -> bool {
    if matcher.is_empty() || matcher == "*" {
        return true;
    }

    if matcher.contains('|') || !matcher.chars().any(|c| is_regex_metachar(c)) {
        return matcher.split('|').any(|word| word == value);
    }

    match Regex::new(matcher) {
        Ok(re) => re.is_match(value),
        Err(err) => {
            warn!(matcher, error = %err, "invalid hook matcher regex, treating as non-match");
            false
        },
    }
}

fn is_regex_metachar(c: char) -> bool {
    matches!(
        c,
        '.' | '^' | '$' | '*' | '+' | '?' | '(' | ')' | '[' | ']' | '{' | '}' | '\\'
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_and_star_match_everything() {
        assert!(matches("", "anything"));
        assert!(matches("*", "anything"));
    }

    #[test]
    fn single_word_matches_by_equality() {
        assert!(matches("Bash", "Bash"));
        assert!(!matches("Bash", "Read"));
    }

    #[test]
    fn pipe_separated_words_match_by_equality() {
        assert!(matches("a|b", "a"));
        assert!(matches("a|b", "b"));
        assert!(!matches("a|b", "c"));
    }

    #[test]
    fn metacharacter_strings_compile_as_regex() {
        assert!(matches("^Bash.*", "BashTool"));
        assert!(!matches("^Bash.*", "Read"));
    }

    #[test]
    fn invalid_regex_is_treated_as_non_match() {
        assert!(!matches("(unclosed", "anything"));
    }
}
