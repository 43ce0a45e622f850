use std::path::{Path, PathBuf};

use regex::RegexSet;

use super::normalize_path;
use crate::config::ConfigError;

/// Compiled `compilerOptions.paths` table.
///
/// Built once per build and never mutated afterwards. `matches` is the cheap
/// string-only filter; `lookup` substitutes the wildcard into the first
/// configured target.
#[derive(Debug, Clone, Default)]
pub struct AliasTable {
    /// Mappings ordered most-specific first (longest literal prefix, then
    /// declaration order).
    mappings: Vec<AliasMapping>,
    /// One regex per mapping, in the same order as `mappings`.
    matcher: Option<RegexSet>,
}

/// A single alias key with its first substitution target.
#[derive(Debug, Clone)]
struct AliasMapping {
    /// The prefix before the wildcard, e.g. "@utils/" for "@utils/*".
    prefix: String,
    /// The suffix after the wildcard (usually empty).
    suffix: String,
    /// Whether the key had a wildcard at all; exact keys match only themselves.
    wildcard: bool,
    /// Target pattern, e.g. "src/utils/*".
    target: String,
    /// Directory the target is resolved against (baseUrl or the config dir).
    base: PathBuf,
}

impl AliasTable {
    /// A table with no aliases; every specifier is a non-match.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Build the table from the raw `paths` object.
    ///
    /// Targets resolve under `base_url` when set, otherwise under
    /// `config_dir`. Keys or targets with more than one `*` are rejected.
    pub fn from_config(
        paths: Option<&serde_json::Map<String, serde_json::Value>>,
        base_url: Option<&Path>,
        config_dir: &Path,
    ) -> Result<Self, ConfigError> {
        let paths = match paths {
            Some(paths) if !paths.is_empty() => paths,
            _ => return Ok(Self::empty()),
        };

        let base = base_url.unwrap_or(config_dir);
        let mut mappings = Vec::with_capacity(paths.len());

        for (pattern, targets) in paths {
            let target = match targets
                .as_array()
                .and_then(|arr| arr.first())
                .and_then(serde_json::Value::as_str)
            {
                Some(target) => target,
                None => {
                    log::warn!("ignoring path alias {pattern:?}: first target is not a string");
                    continue;
                }
            };

            ensure_single_wildcard(pattern)?;
            ensure_single_wildcard(target)?;

            let (prefix, suffix) = split_on_wildcard(pattern);
            mappings.push(AliasMapping {
                prefix: prefix.to_string(),
                suffix: suffix.unwrap_or_default().to_string(),
                wildcard: suffix.is_some(),
                target: target.to_string(),
                base: base.to_path_buf(),
            });
        }

        // Stable sort: equal prefix lengths keep declaration order
        mappings.sort_by(|a, b| b.prefix.len().cmp(&a.prefix.len()));

        let matcher = if mappings.is_empty() {
            None
        } else {
            Some(RegexSet::new(mappings.iter().map(AliasMapping::regex))?)
        };

        Ok(AliasTable { mappings, matcher })
    }

    /// True when no alias is configured.
    pub fn is_empty(&self) -> bool {
        self.mappings.is_empty()
    }

    /// Cheap filter: does any alias key match this specifier?
    pub fn matches(&self, specifier: &str) -> bool {
        self.matcher
            .as_ref()
            .is_some_and(|matcher| matcher.is_match(specifier))
    }

    /// Map a specifier to its candidate absolute path (extension not guaranteed).
    pub fn lookup(&self, specifier: &str) -> Option<PathBuf> {
        let matcher = self.matcher.as_ref()?;
        // SetMatches iterates in ascending index order, i.e. most specific first
        let index = matcher.matches(specifier).into_iter().next()?;
        let mapping = &self.mappings[index];
        let matched = match_pattern(specifier, &mapping.prefix, &mapping.suffix, mapping.wildcard)?;
        Some(mapping.substitute(matched))
    }
}

impl AliasMapping {
    fn regex(&self) -> String {
        if self.wildcard {
            format!(
                "^{}(?s:.*){}$",
                regex::escape(&self.prefix),
                regex::escape(&self.suffix)
            )
        } else {
            format!("^{}$", regex::escape(&self.prefix))
        }
    }

    fn substitute(&self, matched: &str) -> PathBuf {
        let replaced = self.target.replacen('*', matched, 1);
        normalize_path(&self.base.join(replaced))
    }
}

fn ensure_single_wildcard(pattern: &str) -> Result<(), ConfigError> {
    if pattern.matches('*').count() > 1 {
        return Err(ConfigError::InvalidAlias {
            pattern: pattern.to_string(),
        });
    }
    Ok(())
}

/// Split a pattern string on the first "*" wildcard.
/// Returns the prefix and, if there was a wildcard, the suffix.
fn split_on_wildcard(pattern: &str) -> (&str, Option<&str>) {
    match pattern.find('*') {
        Some(pos) => (&pattern[..pos], Some(&pattern[pos + 1..])),
        None => (pattern, None),
    }
}

/// Match a specifier against an alias key.
/// Returns the portion matched by the wildcard (empty for exact keys), or None.
fn match_pattern<'a>(
    specifier: &'a str,
    prefix: &str,
    suffix: &str,
    wildcard: bool,
) -> Option<&'a str> {
    if !wildcard {
        return (specifier == prefix).then_some("");
    }
    let rest = specifier.strip_prefix(prefix)?;
    rest.strip_suffix(suffix)
}
