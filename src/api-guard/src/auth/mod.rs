pub mod cookies;
pub mod csrf;
pub mod handlers;
pub mod middleware;

pub use csrf::verify_csrf;
pub use handlers::{get_login, get_signup, logout, post_login, post_user};
pub use middleware::enforce_access;
