pub mod auth;
pub mod error;
pub mod routes;
pub mod state;

pub use routes::app;
pub use state::AppState;
