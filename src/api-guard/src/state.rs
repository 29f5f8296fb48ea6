use std::sync::Arc;

use core_guard::{
    AccessPolicy, Authenticator, BcryptPasswordEncoder, ConfigError, CsrfTokens, PasswordEncoder, PasswordError,
    Registrar, RuleError, SecurityConfig, Signer, SigningError,
};
use data_model_guard::{SessionStore, UserStore};

use crate::auth::cookies::SessionCookies;

#[derive(Debug, thiserror::Error)]
pub enum StateError {
    #[error("Invalid security configuration: {0}")]
    Config(#[from] ConfigError),
    #[error("Invalid access rules: {0}")]
    Rules(#[from] RuleError),
    #[error("Password encoder setup failed: {0}")]
    Password(#[from] PasswordError),
    #[error("Cookie signing setup failed: {0}")]
    Signing(#[from] SigningError),
}

/// Shared, immutable request-handling context. Cloning is cheap.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<SecurityConfig>,
    pub policy: Arc<AccessPolicy>,
    pub authenticator: Arc<Authenticator>,
    pub registrar: Arc<Registrar>,
    pub session_cookies: Arc<SessionCookies>,
    pub csrf: Arc<CsrfTokens>,
}

impl AppState {
    /// Wires the policy module to its collaborators.
    pub fn new(
        config: SecurityConfig,
        users: Arc<dyn UserStore>,
        sessions: Arc<dyn SessionStore>,
    ) -> Result<Self, StateError> {
        config.validate()?;

        let encoder: Arc<dyn PasswordEncoder> = Arc::new(BcryptPasswordEncoder::new(config.bcrypt_cost)?);
        let signer = Signer::new(&config.session_secret)?;

        let policy = AccessPolicy::from_config(&config)?;
        let authenticator = Authenticator::new(users.clone(), sessions, encoder.clone(), config.login_min_duration)?;
        let registrar = Registrar::new(users, encoder);
        let session_cookies = SessionCookies::new(signer.clone(), config.session_duration, config.session_cookie_secure);
        let csrf = CsrfTokens::new(signer);

        Ok(Self {
            config: Arc::new(config),
            policy: Arc::new(policy),
            authenticator: Arc::new(authenticator),
            registrar: Arc::new(registrar),
            session_cookies: Arc::new(session_cookies),
            csrf: Arc::new(csrf),
        })
    }
}
