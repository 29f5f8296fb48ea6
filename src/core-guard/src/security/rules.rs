//! Ordered path rules and glob matching.

use globset::{Glob, GlobBuilder, GlobMatcher, GlobSet, GlobSetBuilder};

/// One `{pattern, rule}` entry. Patterns are Ant-style globs: `*` stays within a path
/// segment, `**` spans any number of segments.
///
/// Unlike Ant, a trailing `/**` needs at least one segment after the prefix: `/static/**`
/// matches `/static/app.js` but not bare `/static`. List the prefix itself as well to cover it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccessRule {
    pub path_pattern: String,
    pub requires_auth: bool,
}

impl AccessRule {
    pub fn permit_all(path_pattern: impl Into<String>) -> Self {
        Self {
            path_pattern: path_pattern.into(),
            requires_auth: false,
        }
    }

    pub fn authenticated(path_pattern: impl Into<String>) -> Self {
        Self {
            path_pattern: path_pattern.into(),
            requires_auth: true,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum RuleError {
    #[error("Path pattern must start with '/': '{0}'")]
    NotAbsolute(String),

    #[error("Invalid path pattern '{pattern}': {source}")]
    InvalidPattern {
        pattern: String,
        #[source]
        source: globset::Error,
    },
}

/// Compiled rule list, evaluated top to bottom. The first matching rule wins.
#[derive(Debug, Clone)]
pub struct RuleSet {
    rules: Vec<(AccessRule, GlobMatcher)>,
}

impl RuleSet {
    pub fn compile(rules: Vec<AccessRule>) -> Result<Self, RuleError> {
        let rules = rules
            .into_iter()
            .map(|rule| {
                let matcher = path_glob(&rule.path_pattern)?.compile_matcher();
                Ok((rule, matcher))
            })
            .collect::<Result<Vec<_>, RuleError>>()?;
        Ok(Self { rules })
    }

    pub fn first_match(&self, path: &str) -> Option<&AccessRule> {
        self.rules
            .iter()
            .find(|(_, matcher)| matcher.is_match(path))
            .map(|(rule, _)| rule)
    }

    /// Unmatched paths require authentication.
    pub fn requires_auth(&self, path: &str) -> bool {
        self.first_match(path).map(|rule| rule.requires_auth).unwrap_or(true)
    }
}

/// Builds one matcher for a list of patterns (any match counts).
pub fn build_glob_set(patterns: &[String]) -> Result<GlobSet, RuleError> {
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        builder.add(path_glob(pattern)?);
    }
    builder.build().map_err(|source| RuleError::InvalidPattern {
        pattern: patterns.join(","),
        source,
    })
}

fn path_glob(pattern: &str) -> Result<Glob, RuleError> {
    if !pattern.starts_with('/') {
        return Err(RuleError::NotAbsolute(pattern.to_string()));
    }
    GlobBuilder::new(pattern)
        .literal_separator(true)
        .build()
        .map_err(|source| RuleError::InvalidPattern {
            pattern: pattern.to_string(),
            source,
        })
}
