//! Draft quotation entity

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::domain::admin::AdminId;

/// Errors raised when a draft fails validation
#[derive(Debug, Error, Clone, PartialEq)]
pub enum DraftValidationError {
    #[error("Draft ID '{0}' is not a valid UUID")]
    InvalidId(String),

    #[error("Customer name cannot be empty")]
    EmptyCustomerName,

    #[error("Customer email '{0}' is not a valid address")]
    InvalidCustomerEmail(String),

    #[error("A quotation needs at least one item")]
    NoItems,

    #[error("Item '{0}' must have a quantity greater than zero")]
    ZeroQuantity(String),

    #[error("Item at position {0} has an empty product ID")]
    EmptyProductId(usize),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DraftId(Uuid);

impl DraftId {
    pub fn generate() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn parse(value: &str) -> Result<Self, DraftValidationError> {
        Uuid::parse_str(value)
            .map(Self)
            .map_err(|_| DraftValidationError::InvalidId(value.to_string()))
    }
}

impl std::fmt::Display for DraftId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One product line of a quotation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DraftItem {
    pub product_id: String,
    pub product_name: String,
    pub quantity: u32,
    /// Packaging unit, e.g. `kg`, `l`, `drum`
    pub unit: String,
    pub unit_price_cents: u64,
}

impl DraftItem {
    pub fn line_total_cents(&self) -> u64 {
        self.unit_price_cents.saturating_mul(u64::from(self.quantity))
    }
}

/// Editable content of a draft
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DraftContent {
    pub customer_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub customer_email: Option<String>,
    pub items: Vec<DraftItem>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

impl DraftContent {
    pub fn validate(&self) -> Result<(), DraftValidationError> {
        if self.customer_name.trim().is_empty() {
            return Err(DraftValidationError::EmptyCustomerName);
        }

        if let Some(email) = &self.customer_email {
            let valid = email
                .split_once('@')
                .is_some_and(|(local, domain)| !local.is_empty() && !domain.is_empty());
            if !valid {
                return Err(DraftValidationError::InvalidCustomerEmail(email.clone()));
            }
        }

        if self.items.is_empty() {
            return Err(DraftValidationError::NoItems);
        }

        for (position, item) in self.items.iter().enumerate() {
            if item.product_id.trim().is_empty() {
                return Err(DraftValidationError::EmptyProductId(position));
            }
            if item.quantity == 0 {
                return Err(DraftValidationError::ZeroQuantity(item.product_id.clone()));
            }
        }

        Ok(())
    }
}

/// A quotation being prepared by an admin, kept only for a limited time
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DraftQuotation {
    id: DraftId,
    owner: AdminId,
    #[serde(flatten)]
    content: DraftContent,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl DraftQuotation {
    /// Create a validated draft
    pub fn new(
        id: DraftId,
        owner: AdminId,
        content: DraftContent,
        now: DateTime<Utc>,
    ) -> Result<Self, DraftValidationError> {
        content.validate()?;

        Ok(Self {
            id,
            owner,
            content,
            created_at: now,
            updated_at: now,
        })
    }

    pub fn id(&self) -> &DraftId {
        &self.id
    }

    pub fn owner(&self) -> &AdminId {
        &self.owner
    }

    pub fn content(&self) -> &DraftContent {
        &self.content
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    /// Sum of all line totals
    pub fn total_cents(&self) -> u64 {
        self.content
            .items
            .iter()
            .fold(0u64, |acc, item| acc.saturating_add(item.line_total_cents()))
    }

    /// Replace the content, keeping identity and creation time
    pub fn replace_content(
        &mut self,
        content: DraftContent,
        now: DateTime<Utc>,
    ) -> Result<(), DraftValidationError> {
        content.validate()?;
        self.content = content;
        self.updated_at = now;
        Ok(())
    }
}
