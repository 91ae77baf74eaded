//! Draft quotation domain

mod draft;
mod store;

pub use draft::{DraftContent, DraftId, DraftItem, DraftQuotation, DraftValidationError};
pub use store::DraftStore;
