//! Exclusion globs: config-level patterns that keep paths out of a baseline.
//!
//! Patterns use shell-style globs: `*` matches within a path component,
//! `**` matches across path components, `?` matches a single character.
//! A path is excluded when it, or any of its ancestors, matches a pattern.

#![allow(missing_docs)]

use std::path::Path;

use regex::Regex;

use crate::core::errors::{ImonError, Result};

#[derive(Debug, Clone)]
struct GlobPattern {
    original: String,
    compiled: Regex,
}

/// Compiled set of exclusion patterns.
#[derive(Debug, Clone, Default)]
pub struct ExclusionSet {
    patterns: Vec<GlobPattern>,
}

impl ExclusionSet {
    pub fn new(patterns: &[String]) -> Result<Self> {
        let patterns = patterns
            .iter()
            .map(|pat| {
                Ok(GlobPattern {
                    original: pat.clone(),
                    compiled: glob_to_regex(pat)?,
                })
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { patterns })
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.patterns.len()
    }

    pub fn is_excluded(&self, path: &Path) -> bool {
        self.matching_pattern(path).is_some()
    }

    /// The first pattern that excludes `path`, if any.
    pub fn matching_pattern(&self, path: &Path) -> Option<&str> {
        if self.patterns.is_empty() {
            return None;
        }
        let mut current = Some(path);
        while let Some(p) = current {
            let p_str = normalize_path_for_matching(p);
            if let Some(pat) = self
                .patterns
                .iter()
                .find(|pat| pat.compiled.is_match(&p_str))
            {
                return Some(pat.original.as_str());
            }
            current = p.parent();
        }
        None
    }
}

/// Validate that a glob pattern can be compiled.
pub fn validate_glob_pattern(pattern: &str) -> Result<()> {
    glob_to_regex(pattern).map(|_| ())
}

fn glob_to_regex(pattern: &str) -> Result<Regex> {
    let normalized_pattern = pattern.replace('\\', "/");
    let mut regex_str = String::with_capacity(pattern.len() * 2);
    regex_str.push('^');

    let chars: Vec<char> = normalized_pattern.chars().collect();
    let mut i = 0;

    while i < chars.len() {
        match chars[i] {
            '*' if i + 1 < chars.len() && chars[i + 1] == '*' => {
                if i + 2 < chars.len() && chars[i + 2] == '/' {
                    regex_str.push_str("(?:.*/)?");
                    i += 3;
                } else {
                    regex_str.push_str(".*");
                    i += 2;
                }
            }
            '*' => {
                regex_str.push_str("[^/]*");
                i += 1;
            }
            '?' => {
                regex_str.push_str("[^/]");
                i += 1;
            }
            c @ ('.' | '+' | '(' | ')' | '{' | '}' | '[' | ']' | '^' | '$' | '|' | '\\') => {
                regex_str.push('\\');
                regex_str.push(c);
                i += 1;
            }
            c => {
                regex_str.push(c);
                i += 1;
            }
        }
    }

    regex_str.push('$');

    Regex::new(&regex_str).map_err(|err| ImonError::InvalidConfig {
        details: format!("invalid exclude pattern {pattern:?}: {err}"),
    })
}

fn normalize_path_for_matching(path: &Path) -> String {
    path.to_string_lossy().replace('\\', "/")
}
