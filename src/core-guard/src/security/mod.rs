//! The access policy: which paths need a login, how logins and logouts happen, and how
//! passwords are hashed.

pub mod authenticator;
pub mod csrf;
pub mod firewall;
pub mod password;
pub mod policy;
pub mod registration;
pub mod rules;
pub mod signing;
