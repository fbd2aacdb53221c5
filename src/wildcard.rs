//! Glob style text matching.

use regex::{Regex, RegexBuilder};

use crate::error::RuleError;

/// Case-insensitive `*`/`?` pattern matching the complete input.
#[derive(Clone, Debug)]
pub struct Wildcard {
    pattern: String,
    regex: Regex,
    shortcut: String,
}

impl Wildcard {
    pub fn new(pattern: &str) -> Result<Self, RuleError> {
        let mut regex = String::with_capacity(pattern.len() + 2);
        regex.push('^');
        for c in pattern.chars() {
            match c {
                '*' => regex.push_str(".*"),
                '?' => regex.push('.'),
                c => regex.push_str(&regex::escape(c.encode_utf8(&mut [0; 4]))),
            }
        }
        regex.push('$');

        let regex =
            RegexBuilder::new(&regex).case_insensitive(true).dot_matches_new_line(true).build()?;

        let shortcut = longest_literal(pattern).to_lowercase();
        Ok(Self { regex, pattern: pattern.into(), shortcut })
    }

    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    /// Longest run of the pattern without wildcard characters.
    pub fn shortcut(&self) -> &str {
        &self.shortcut
    }

    /// Check if the entire input matches the pattern.
    pub fn matches(&self, input: &str) -> bool {
        if input.is_empty() {
            return false;
        }

        if !self.shortcut.is_empty() && !input.to_lowercase().contains(&self.shortcut) {
            return false;
        }

        self.regex.is_match(input)
    }
}

fn longest_literal(pattern: &str) -> &str {
    pattern
        .split(['*', '?'])
        .fold("", |longest, part| if part.len() > longest.len() { part } else { longest })
}
