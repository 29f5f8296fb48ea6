//! Per-request access decisions.
//!
//! The host pipeline asks, in order:
//! 1. [`AccessPolicy::is_exempt`]: if true, serve the request without touching sessions.
//! 2. Resolve the caller's [`Authentication`] from the session store.
//! 3. [`AccessPolicy::authorize`]: permit, or fail with [`AccessError::AuthenticationRequired`],
//!    upon which the caller redirects to the login entry point.
//!
//! The policy is immutable after construction and holds no per-request state.

use globset::GlobSet;

use data_model_guard::Session;

use super::rules::{AccessRule, RuleError, RuleSet, build_glob_set};
use crate::common::config::SecurityConfig;

/// Who the caller is for the current request. Exactly one variant holds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Authentication {
    Anonymous,
    Authenticated(Session),
}

impl Authentication {
    pub fn is_authenticated(&self) -> bool {
        matches!(self, Self::Authenticated(_))
    }

    pub fn username(&self) -> Option<&str> {
        self.session().map(|s| s.username.as_str())
    }

    pub fn session(&self) -> Option<&Session> {
        match self {
            Self::Anonymous => None,
            Self::Authenticated(session) => Some(session),
        }
    }
}

impl From<Option<Session>> for Authentication {
    fn from(session: Option<Session>) -> Self {
        session.map_or(Self::Anonymous, Self::Authenticated)
    }
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum AccessError {
    #[error("Authentication required")]
    AuthenticationRequired,
}

#[derive(Debug, Clone)]
pub struct AccessPolicy {
    exempt: GlobSet,
    rules: RuleSet,
}

impl AccessPolicy {
    /// `rules` are evaluated top to bottom; paths matching none of them require authentication.
    pub fn new(exempt_patterns: &[String], rules: Vec<AccessRule>) -> Result<Self, RuleError> {
        Ok(Self {
            exempt: build_glob_set(exempt_patterns)?,
            rules: RuleSet::compile(rules)?,
        })
    }

    /// Exempt globs from the config, then every public path as a permit-all rule, then
    /// "any other request is authenticated".
    pub fn from_config(config: &SecurityConfig) -> Result<Self, RuleError> {
        let rules = config.public_paths.iter().map(AccessRule::permit_all).collect();
        Self::new(&config.exempt_paths, rules)
    }

    /// Exempt paths skip authentication, authorization and session lookup.
    pub fn is_exempt(&self, path: &str) -> bool {
        self.exempt.is_match(path)
    }

    pub fn requires_auth(&self, path: &str) -> bool {
        !self.is_exempt(path) && self.rules.requires_auth(path)
    }

    pub fn authorize(&self, path: &str, authentication: &Authentication) -> Result<(), AccessError> {
        if self.requires_auth(path) && !authentication.is_authenticated() {
            return Err(AccessError::AuthenticationRequired);
        }
        Ok(())
    }
}
