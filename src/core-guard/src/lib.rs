pub mod common;
pub mod security;

pub use common::config::{ConfigError, SecurityConfig};
pub use common::db_env::{get_database_url, get_db_pool};
pub use common::health::health_check;
pub use common::hostname::{HostPortError, get_bind_addr};
pub use common::logging::setup_logging;

pub use security::authenticator::{AuthError, Authenticator};
pub use security::csrf::{CSRF_FORM_FIELD, CSRF_HEADER, CsrfError, CsrfTokens};
pub use security::firewall::{FirewallError, check_path};
pub use security::password::{BcryptPasswordEncoder, PasswordEncoder, PasswordError};
pub use security::policy::{AccessError, AccessPolicy, Authentication};
pub use security::registration::{Registrar, RegistrationError};
pub use security::rules::{AccessRule, RuleError, RuleSet};
pub use security::signing::{Signer, SigningError};
