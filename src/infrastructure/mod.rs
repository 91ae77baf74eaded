//! Infrastructure layer - Storage, rate limiting, crypto and delivery implementations

pub mod admin;
pub mod api_key;
pub mod auth;
pub mod logging;
pub mod notification;
pub mod quotation;
pub mod storage;
