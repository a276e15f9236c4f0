//! Pattern detectors used by the validator
//!
//! Every function here is pure and total over any input string.

use std::collections::HashSet;
use std::sync::LazyLock;

use regex::Regex;

use super::wordlist::WordList;

static UPPERCASE: LazyLock<Regex> = LazyLock::new(|| Regex::new("[A-Z]").expect("valid regex"));
static LOWERCASE: LazyLock<Regex> = LazyLock::new(|| Regex::new("[a-z]").expect("valid regex"));
static DIGIT: LazyLock<Regex> = LazyLock::new(|| Regex::new("[0-9]").expect("valid regex"));

/// Shortest run that counts as a sequence.
pub const MIN_SEQUENCE_LEN: usize = 4;

pub fn count_uppercase(password: &str) -> usize {
    UPPERCASE.find_iter(password).count()
}

pub fn count_lowercase(password: &str) -> usize {
    LOWERCASE.find_iter(password).count()
}

pub fn count_digits(password: &str) -> usize {
    DIGIT.find_iter(password).count()
}

/// Matcher for a configurable special-character allow-list.
///
/// The list is escaped before it goes into a character class, so entries
/// such as `]`, `-`, `^` or `\` are matched literally.
#[derive(Debug, Clone)]
pub struct SpecialChars {
    class: Option<Regex>,
}

impl SpecialChars {
    pub fn new(allowed: &str) -> Self {
        let class = if allowed.is_empty() {
            None
        } else {
            Regex::new(&format!("[{}]", regex::escape(allowed))).ok()
        };
        Self { class }
    }

    pub fn count(&self, password: &str) -> usize {
        self.class
            .as_ref()
            .map_or(0, |class| class.find_iter(password).count())
    }
}

/// Replace look-alike digits and symbols with the letters they stand for.
pub fn normalize_leet(password: &str) -> String {
    password
        .chars()
        .map(|c| match c {
            '0' => 'o',
            '1' | '!' => 'i',
            '3' => 'e',
            '4' | '@' => 'a',
            '5' | '$' => 's',
            '7' => 't',
            '8' => 'b',
            other => other,
        })
        .collect()
}

/// True if the lowercased password, or its leet-normalized form, is a known
/// common password.
pub fn is_common_password(password: &str, words: &WordList) -> bool {
    let lower = password.to_lowercase();
    words.contains(&lower) || words.contains(&normalize_leet(&lower))
}

/// True if the lowercased password contains any keyboard pattern, forward or
/// reversed.
pub fn contains_keyboard_pattern(password: &str, words: &WordList) -> bool {
    let lower = password.to_lowercase();
    words.keyboard_patterns().iter().any(|pattern| {
        let reversed: String = pattern.chars().rev().collect();
        lower.contains(pattern.as_str()) || lower.contains(&reversed)
    })
}

/// True if some window of `min_len` characters has strictly consecutive
/// ascending or descending code points ("abcd", "4321").
pub fn contains_sequence(password: &str, min_len: usize) -> bool {
    if min_len < 2 {
        return !password.is_empty();
    }
    let codes: Vec<i64> = password.chars().map(|c| c as i64).collect();
    codes.windows(min_len).any(|window| {
        let ascending = window.windows(2).all(|pair| pair[1] == pair[0] + 1);
        let descending = window.windows(2).all(|pair| pair[1] == pair[0] - 1);
        ascending || descending
    })
}

/// True if any character repeats consecutively more than `max_repeating` times.
pub fn has_repeating_chars(password: &str, max_repeating: usize) -> bool {
    let mut run = 0usize;
    let mut previous: Option<char> = None;
    for c in password.chars() {
        if previous == Some(c) {
            run += 1;
            if run > max_repeating {
                return true;
            }
        } else {
            run = 1;
            previous = Some(c);
        }
    }
    false
}

pub fn unique_chars(password: &str) -> usize {
    password.chars().collect::<HashSet<_>>().len()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_class_counts() {
        assert_eq!(count_uppercase("AbCd"), 2);
        assert_eq!(count_lowercase("AbCd"), 2);
        assert_eq!(count_digits("a1b22"), 3);
        assert_eq!(count_uppercase("ÉCOLE"), 4);
    }

    #[test]
    fn test_special_chars_escapes_class_metacharacters() {
        let special = SpecialChars::new(r"]-^\");
        assert_eq!(special.count(r"a]b-c^d\"), 4);
        assert_eq!(special.count("abc"), 0);
    }

    #[test]
    fn test_special_chars_default_list() {
        let special = SpecialChars::new(r#"!@#$%^&*(),.?":{}|<>-_=+[]\;'`~"#);
        assert_eq!(special.count("Tr0ub4dor&3xyz"), 1);
        assert_eq!(special.count("[]{}~`"), 6);
    }

    #[test]
    fn test_special_chars_empty_list_matches_nothing() {
        assert_eq!(SpecialChars::new("").count("!!!"), 0);
    }

    #[test]
    fn test_normalize_leet() {
        assert_eq!(normalize_leet("p4ssw0rd"), "password");
        assert_eq!(normalize_leet("$h!3ld"), "shield");
        assert_eq!(normalize_leet("@78"), "atb");
    }

    #[test]
    fn test_is_common_password() {
        let words = WordList::builtin();
        assert!(is_common_password("password", words));
        assert!(is_common_password("PASSWORD", words));
        assert!(is_common_password("p4ssw0rd", words));
        assert!(is_common_password("Tr4d1ng", words));
        assert!(!is_common_password("Tr0ub4dor&3xyz", words));
    }

    #[test]
    fn test_keyboard_pattern_forward_and_reversed() {
        let words = WordList::builtin();
        assert!(contains_keyboard_pattern("myQWERTYpass", words));
        assert!(contains_keyboard_pattern("ytrewq", words));
        assert!(contains_keyboard_pattern("x1qaz2wsx", words));
        assert!(!contains_keyboard_pattern("Tr0ub4dor&3xyz", words));
    }

    #[test]
    fn test_contains_sequence() {
        assert!(contains_sequence("xxabcdxx", 4));
        assert!(contains_sequence("pass4321", 4));
        assert!(!contains_sequence("abc", 4));
        assert!(!contains_sequence("abce", 4));
        assert!(!contains_sequence("Tr0ub4dor&3xyz", 4));
        assert!(!contains_sequence("", 4));
    }

    #[test]
    fn test_has_repeating_chars() {
        assert!(!has_repeating_chars("aaab", 3));
        assert!(has_repeating_chars("aaaab", 3));
        assert!(has_repeating_chars("baaa", 2));
        assert!(!has_repeating_chars("", 3));
    }

    #[test]
    fn test_zero_repeat_limit_only_flags_actual_repeats() {
        assert!(!has_repeating_chars("abc", 0));
        assert!(!has_repeating_chars("a", 0));
        assert!(has_repeating_chars("aab", 0));
    }

    #[test]
    fn test_unique_chars() {
        assert_eq!(unique_chars("aabbcc"), 3);
        assert_eq!(unique_chars(""), 0);
    }
}
