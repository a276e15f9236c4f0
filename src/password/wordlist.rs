//! Static word lists: common passwords and keyboard patterns
//!
//! The default lists are compiled in from `data/`. A deployment can swap in
//! its own lists with [`WordList::load`] without touching the checks.

use std::collections::HashSet;
use std::path::Path;
use std::sync::LazyLock;

const COMMON_PASSWORDS: &str = include_str!("data/common-passwords.txt");
const KEYBOARD_PATTERNS: &str = include_str!("data/keyboard-patterns.txt");

static DEFAULT_WORDLIST: LazyLock<WordList> =
    LazyLock::new(|| WordList::parse(COMMON_PASSWORDS, KEYBOARD_PATTERNS));

/// Common-password set plus keyboard-adjacency patterns.
#[derive(Debug, Clone, Default)]
pub struct WordList {
    common: HashSet<String>,
    keyboard_patterns: Vec<String>,
}

impl WordList {
    /// The compiled-in lists.
    pub fn builtin() -> &'static WordList {
        &DEFAULT_WORDLIST
    }

    /// Parse newline-separated lists. Blank lines and `#` comments are
    /// skipped; entries are lowercased and de-duplicated.
    pub fn parse(common: &str, keyboard_patterns: &str) -> Self {
        let common = entries(common).collect();

        let mut patterns: Vec<String> = Vec::new();
        for entry in entries(keyboard_patterns) {
            if !patterns.contains(&entry) {
                patterns.push(entry);
            }
        }

        Self {
            common,
            keyboard_patterns: patterns,
        }
    }

    /// Load both lists from files.
    pub fn from_files(common: &Path, keyboard_patterns: &Path) -> std::io::Result<Self> {
        Self::load(Some(common), Some(keyboard_patterns))
    }

    /// Load whichever lists have a file; the others stay compiled-in.
    pub fn load(
        common: Option<&Path>,
        keyboard_patterns: Option<&Path>,
    ) -> std::io::Result<Self> {
        let common = match common {
            Some(path) => std::fs::read_to_string(path)?,
            None => COMMON_PASSWORDS.to_string(),
        };
        let patterns = match keyboard_patterns {
            Some(path) => std::fs::read_to_string(path)?,
            None => KEYBOARD_PATTERNS.to_string(),
        };
        Ok(Self::parse(&common, &patterns))
    }

    pub fn contains(&self, candidate: &str) -> bool {
        self.common.contains(candidate)
    }

    pub fn keyboard_patterns(&self) -> &[String] {
        &self.keyboard_patterns
    }

    pub fn len(&self) -> usize {
        self.common.len()
    }

    pub fn is_empty(&self) -> bool {
        self.common.is_empty()
    }
}

fn entries(source: &str) -> impl Iterator<Item = String> + '_ {
    source
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(str::to_lowercase)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_builtin_list_size() {
        let list = WordList::builtin();
        assert!(list.len() >= 150, "only {} entries", list.len());
        assert!(!list.keyboard_patterns().is_empty());
    }

    #[test]
    fn test_builtin_entries_are_lowercased() {
        let list = WordList::builtin();
        assert!(list.contains("hockey"));
        assert!(!list.contains("Hockey"));
    }

    #[test]
    fn test_parse_skips_comments_and_dedupes() {
        let list = WordList::parse("# header\nAlpha\nalpha\n\nbeta\n", "qwe\nQWE\n");
        assert_eq!(list.len(), 2);
        assert!(list.contains("alpha"));
        assert_eq!(list.keyboard_patterns(), ["qwe".to_string()]);
    }

    #[test]
    fn test_from_files() {
        let dir = TempDir::new().unwrap();
        let common = dir.path().join("common.txt");
        let patterns = dir.path().join("patterns.txt");
        std::fs::write(&common, "hunter2\n").unwrap();
        std::fs::write(&patterns, "poiuy\n").unwrap();

        let list = WordList::from_files(&common, &patterns).unwrap();
        assert!(list.contains("hunter2"));
        assert_eq!(list.keyboard_patterns().len(), 1);
    }

    #[test]
    fn test_load_keeps_builtin_for_missing_file() {
        let dir = TempDir::new().unwrap();
        let common = dir.path().join("common.txt");
        std::fs::write(&common, "hunter2\n").unwrap();

        let list = WordList::load(Some(&common), None).unwrap();
        assert_eq!(list.len(), 1);
        assert_eq!(
            list.keyboard_patterns(),
            WordList::builtin().keyboard_patterns()
        );

        assert!(WordList::load(Some(&dir.path().join("missing.txt")), None).is_err());
    }
}
