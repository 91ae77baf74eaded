//! API layer - HTTP endpoints and request extractors

pub mod admin;
pub mod health;
pub mod middleware;
pub mod router;
pub mod state;
pub mod types;
pub mod v1;

pub use middleware::{PresentedApiKey, RequireAdmin};
pub use router::create_router;
pub use state::AppState;
