//! Authentication infrastructure module
//!
//! JWT token management for admin sessions.

mod jwt;

pub use jwt::{JwtClaims, JwtConfig, JwtGenerator, JwtService};
