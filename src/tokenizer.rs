//! Separator-driven line tokenizer.
//!
//! Any run of separator characters is a single boundary, so consecutive
//! separators never produce empty tokens. Tokens are trimmed of surrounding
//! whitespace and dropped if nothing is left, which makes a line of only
//! separators or whitespace blank under any separator set.

use crate::constants::DEFAULT_SEPARATORS;
use crate::error::{CloudError, Result};

/// Set of characters that separate tokens on a line
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SeparatorSet {
    ascii: [bool; 128],
    other: Vec<char>,
}

impl SeparatorSet {
    /// Build a separator set from the characters of `chars`
    pub fn new(chars: &str) -> Result<Self> {
        if chars.is_empty() {
            return Err(CloudError::Configuration {
                message: "separator set must contain at least one character".to_string(),
            });
        }

        let mut ascii = [false; 128];
        let mut other = Vec::new();
        for c in chars.chars() {
            if c.is_ascii() {
                ascii[c as usize] = true;
            } else if !other.contains(&c) {
                other.push(c);
            }
        }

        Ok(Self { ascii, other })
    }

    #[inline]
    pub fn contains(&self, c: char) -> bool {
        if c.is_ascii() {
            self.ascii[c as usize]
        } else {
            self.other.contains(&c)
        }
    }

    /// Characters in the set, ASCII first in code order
    pub fn chars(&self) -> String {
        self.ascii
            .iter()
            .enumerate()
            .filter(|&(_, &set)| set)
            .map(|(code, _)| code as u8 as char)
            .chain(self.other.iter().copied())
            .collect()
    }
}

impl Default for SeparatorSet {
    fn default() -> Self {
        let mut ascii = [false; 128];
        for b in DEFAULT_SEPARATORS.bytes() {
            ascii[b as usize] = true;
        }
        Self {
            ascii,
            other: Vec::new(),
        }
    }
}

/// Lazy sequence of tokens on one line
#[derive(Debug, Clone)]
pub struct Tokens<'a> {
    rest: &'a str,
    separators: &'a SeparatorSet,
}

impl<'a> Iterator for Tokens<'a> {
    type Item = &'a str;

    fn next(&mut self) -> Option<&'a str> {
        let separators = self.separators;
        loop {
            let start = self.rest.find(|c: char| !separators.contains(c))?;
            let rest = &self.rest[start..];
            let end = rest
                .find(|c: char| separators.contains(c))
                .unwrap_or(rest.len());

            let token = rest[..end].trim();
            self.rest = &rest[end..];

            if !token.is_empty() {
                return Some(token);
            }
        }
    }
}

/// Split `line` into tokens on any run of `separators`
pub fn tokenize<'a>(line: &'a str, separators: &'a SeparatorSet) -> Tokens<'a> {
    Tokens {
        rest: line,
        separators,
    }
}

/// A line is blank when it yields no tokens
pub fn is_blank(line: &str, separators: &SeparatorSet) -> bool {
    tokenize(line, separators).next().is_none()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn collect<'a>(line: &'a str, separators: &'a SeparatorSet) -> Vec<&'a str> {
        tokenize(line, separators).collect()
    }

    #[test]
    fn test_default_separators() {
        let seps = SeparatorSet::default();
        assert_eq!(collect("1 2\t3,4", &seps), vec!["1", "2", "3", "4"]);
        assert!(seps.contains('\n'));
        assert!(!seps.contains(';'));
    }

    #[test]
    fn test_runs_of_separators_are_one_boundary() {
        let seps = SeparatorSet::new(",").unwrap();
        assert_eq!(collect("1,,,2,3", &seps), vec!["1", "2", "3"]);
        assert_eq!(collect(",,1,2,", &seps), vec!["1", "2"]);
    }

    #[test]
    fn test_separator_only_lines_are_blank() {
        let seps = SeparatorSet::new(", ").unwrap();
        assert_eq!(tokenize(",, ,", &seps).count(), 0);
        assert!(is_blank(",, ,", &seps));
        assert!(is_blank("", &seps));
    }

    #[test]
    fn test_whitespace_lines_are_blank_without_whitespace_separators() {
        let seps = SeparatorSet::new(";").unwrap();
        assert!(is_blank("   \t ", &seps));
        assert!(is_blank(" ; ;", &seps));
        assert_eq!(collect(" 1 ; 2 ", &seps), vec!["1", "2"]);
    }

    #[test]
    fn test_tokens_are_restartable() {
        let seps = SeparatorSet::default();
        let line = "4.0 5.0 6.0";
        assert_eq!(tokenize(line, &seps).count(), 3);
        assert_eq!(tokenize(line, &seps).nth(2), Some("6.0"));
    }

    #[test]
    fn test_default_chars_in_code_order() {
        assert_eq!(SeparatorSet::default().chars(), "\t\n ,");
    }

    #[test]
    fn test_non_ascii_separators() {
        let seps = SeparatorSet::new("·|").unwrap();
        assert_eq!(collect("1·2|3", &seps), vec!["1", "2", "3"]);
        assert_eq!(seps.chars(), "|·");
    }

    #[test]
    fn test_empty_separator_set_rejected() {
        assert!(matches!(
            SeparatorSet::new(""),
            Err(CloudError::Configuration { .. })
        ));
    }
}
