//! Draft quotation storage

mod moka_store;

pub use moka_store::{DraftStoreConfig, MokaDraftStore};
