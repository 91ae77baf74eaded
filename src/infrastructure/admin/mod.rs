//! Admin infrastructure: password hashing, storage and the admin service

mod password;
mod postgres_repository;
mod repository;
mod service;

pub use password::{Argon2Hasher, PasswordHasher};
pub use postgres_repository::PostgresAdminRepository;
pub use repository::InMemoryAdminRepository;
pub use service::{AdminService, CreateAdminRequest, LoginResult};
