pub mod artifact_handlers;
pub mod common;
pub mod handlers;
pub mod instance_handlers;
pub mod routes;
pub mod state;
pub mod user_extractor;

pub use routes::*;
pub use state::AppState;
