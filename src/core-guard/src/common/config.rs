use std::env;
use std::time::Duration;

use crate::security::password::{MAX_COST, MIN_COST};

/// Minimum accepted length (bytes) of SESSION_SECRET.
pub const MIN_SECRET_LEN: usize = 32;

pub const DEFAULT_EXEMPT_PATHS: &[&str] = &["/static/**"];
pub const DEFAULT_PUBLIC_PATHS: &[&str] = &["/login", "/signup", "/user"];
pub const DEFAULT_LOGIN_PATH: &str = "/login";
pub const DEFAULT_LOGIN_SUCCESS_PATH: &str = "/articles";
pub const DEFAULT_LOGOUT_PATH: &str = "/logout";
pub const DEFAULT_LOGOUT_SUCCESS_PATH: &str = "/login";
pub const DEFAULT_SESSION_DURATION_SECS: u64 = 1800;
/// One year. Session lifetimes beyond this are rejected.
pub const MAX_SESSION_DURATION_SECS: u64 = 365 * 24 * 60 * 60;
pub const DEFAULT_SESSION_PURGE_INTERVAL_SECS: u64 = 60;
pub const DEFAULT_BCRYPT_COST: u32 = 10;
pub const DEFAULT_LOGIN_MIN_DURATION_MS: u64 = 1000;

/// Everything the access policy, login flow and cookies are configured with.
#[derive(Clone)]
pub struct SecurityConfig {
    /// Globs that bypass authentication and session handling entirely.
    pub exempt_paths: Vec<String>,
    /// Globs reachable without an authenticated session.
    pub public_paths: Vec<String>,
    pub login_path: String,
    pub login_success_path: String,
    /// Answered for every caller, authenticated or not, and never remembered as a post-login destination.
    pub logout_path: String,
    pub logout_success_path: String,
    /// When false, logout only clears the cookie and the server-side session lives until it expires.
    pub invalidate_session_on_logout: bool,
    pub csrf_enabled: bool,
    /// HMAC key for session and CSRF cookies.
    pub session_secret: String,
    pub session_duration: Duration,
    pub session_purge_interval: Duration,
    pub session_cookie_secure: bool,
    pub bcrypt_cost: u32,
    /// Floor on login response time, applied to successes and failures alike.
    pub login_min_duration: Duration,
}

impl SecurityConfig {
    /// Default policy around the given secret.
    pub fn new(session_secret: impl Into<String>) -> Self {
        Self {
            exempt_paths: DEFAULT_EXEMPT_PATHS.iter().map(|p| p.to_string()).collect(),
            public_paths: DEFAULT_PUBLIC_PATHS.iter().map(|p| p.to_string()).collect(),
            login_path: DEFAULT_LOGIN_PATH.to_string(),
            login_success_path: DEFAULT_LOGIN_SUCCESS_PATH.to_string(),
            logout_path: DEFAULT_LOGOUT_PATH.to_string(),
            logout_success_path: DEFAULT_LOGOUT_SUCCESS_PATH.to_string(),
            invalidate_session_on_logout: true,
            csrf_enabled: true,
            session_secret: session_secret.into(),
            session_duration: Duration::from_secs(DEFAULT_SESSION_DURATION_SECS),
            session_purge_interval: Duration::from_secs(DEFAULT_SESSION_PURGE_INTERVAL_SECS),
            session_cookie_secure: false,
            bcrypt_cost: DEFAULT_BCRYPT_COST,
            login_min_duration: Duration::from_millis(DEFAULT_LOGIN_MIN_DURATION_MS),
        }
    }

    /// Reads the configuration from the environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let session_secret = lookup("SESSION_SECRET")
            .filter(|s| !s.trim().is_empty())
            .ok_or(ConfigError::MissingVar("SESSION_SECRET"))?;
        if session_secret.len() < MIN_SECRET_LEN {
            return Err(ConfigError::SecretTooShort(session_secret.len()));
        }

        let mut config = Self::new(session_secret);

        if let Some(paths) = lookup("SECURITY_EXEMPT_PATHS") {
            config.exempt_paths = parse_list(&paths);
        }
        if let Some(paths) = lookup("SECURITY_PUBLIC_PATHS") {
            config.public_paths = parse_list(&paths);
        }
        if let Some(value) = lookup("CSRF_ENABLED") {
            config.csrf_enabled = parse_bool("CSRF_ENABLED", &value)?;
        }
        if let Some(value) = lookup("SESSION_COOKIE_SECURE") {
            config.session_cookie_secure = parse_bool("SESSION_COOKIE_SECURE", &value)?;
        }
        if let Some(value) = lookup("SESSION_DURATION_SECONDS") {
            config.session_duration = Duration::from_secs(parse_u64("SESSION_DURATION_SECONDS", &value)?);
        }
        if let Some(value) = lookup("SESSION_PURGE_INTERVAL_SECS") {
            config.session_purge_interval = Duration::from_secs(parse_u64("SESSION_PURGE_INTERVAL_SECS", &value)?);
        }
        if let Some(value) = lookup("LOGIN_MIN_DURATION_MS") {
            config.login_min_duration = Duration::from_millis(parse_u64("LOGIN_MIN_DURATION_MS", &value)?);
        }
        if let Some(value) = lookup("BCRYPT_COST") {
            let cost = parse_u64("BCRYPT_COST", &value)?;
            config.bcrypt_cost = u32::try_from(cost).map_err(|_| ConfigError::InvalidCost(cost))?;
        }

        config.validate()?;
        Ok(config)
    }

    /// Checks invariants that cannot be expressed in the field types.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(MIN_COST..=MAX_COST).contains(&self.bcrypt_cost) {
            return Err(ConfigError::InvalidCost(self.bcrypt_cost as u64));
        }
        let duration_secs = self.session_duration.as_secs();
        if self.session_duration.is_zero() || duration_secs > MAX_SESSION_DURATION_SECS {
            return Err(ConfigError::InvalidValue {
                var: "SESSION_DURATION_SECONDS",
                value: duration_secs.to_string(),
            });
        }
        if self.session_purge_interval.is_zero() {
            return Err(ConfigError::InvalidValue {
                var: "SESSION_PURGE_INTERVAL_SECS",
                value: "0".to_string(),
            });
        }
        Ok(())
    }
}

impl std::fmt::Debug for SecurityConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SecurityConfig")
            .field("exempt_paths", &self.exempt_paths)
            .field("public_paths", &self.public_paths)
            .field("login_path", &self.login_path)
            .field("login_success_path", &self.login_success_path)
            .field("logout_path", &self.logout_path)
            .field("logout_success_path", &self.logout_success_path)
            .field("invalidate_session_on_logout", &self.invalidate_session_on_logout)
            .field("csrf_enabled", &self.csrf_enabled)
            .field("session_secret", &"<redacted>")
            .field("session_duration", &self.session_duration)
            .field("session_purge_interval", &self.session_purge_interval)
            .field("session_cookie_secure", &self.session_cookie_secure)
            .field("bcrypt_cost", &self.bcrypt_cost)
            .field("login_min_duration", &self.login_min_duration)
            .finish()
    }
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{0} environment variable is required. Generate a secret with: openssl rand -base64 32")]
    MissingVar(&'static str),

    #[error("SESSION_SECRET must be at least 32 bytes, got {0}")]
    SecretTooShort(usize),

    #[error("Invalid value for {var}: '{value}'")]
    InvalidValue { var: &'static str, value: String },

    #[error("BCRYPT_COST must be between 4 and 31, got {0}")]
    InvalidCost(u64),
}

/// Comma-separated list, blanks dropped.
fn parse_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .map(str::to_string)
        .collect()
}

/// Accepts "1", "true", "yes", "y" and "0", "false", "no", "n" (any case).
fn parse_bool(var: &'static str, value: &str) -> Result<bool, ConfigError> {
    match value.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "y" => Ok(true),
        "0" | "false" | "no" | "n" => Ok(false),
        _ => Err(ConfigError::InvalidValue {
            var,
            value: value.to_string(),
        }),
    }
}

fn parse_u64(var: &'static str, value: &str) -> Result<u64, ConfigError> {
    value.trim().parse::<u64>().map_err(|_| ConfigError::InvalidValue {
        var,
        value: value.to_string(),
    })
}
