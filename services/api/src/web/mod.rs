pub mod auth;
pub mod generate;
pub mod middleware;
pub mod rest;
pub mod state;

// Re-export the handlers the binary wires into the router.
pub use generate::generate_handler;
pub use middleware::require_auth;
pub use rest::{delete_history_handler, download_handler, list_history_handler};
