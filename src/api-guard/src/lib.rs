pub mod auth;
pub mod error;
pub mod reaper;
pub mod routes;
pub mod state;
pub mod views;

pub use state::AppState;
