//! Interaction and catalog records read from the interaction store

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Kind of a user-product interaction event
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum InteractionKind {
    View,
    Purchase,
    /// Any kind the service has no dedicated variant for
    Other(String),
}

impl InteractionKind {
    /// Parse a stored interaction type. Never fails; unrecognized values
    /// become `Other`.
    pub fn parse(value: &str) -> Self {
        let normalized = value.trim().to_lowercase();
        match normalized.as_str() {
            "view" => InteractionKind::View,
            "purchase" => InteractionKind::Purchase,
            _ => InteractionKind::Other(normalized),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            InteractionKind::View => "view",
            InteractionKind::Purchase => "purchase",
            InteractionKind::Other(kind) => kind,
        }
    }
}

impl From<&str> for InteractionKind {
    fn from(value: &str) -> Self {
        InteractionKind::parse(value)
    }
}

impl fmt::Display for InteractionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Historical user-product interaction. Immutable once recorded.
#[derive(Debug, Clone, PartialEq)]
pub struct Interaction {
    pub user_id: String,
    pub product_id: String,
    pub kind: InteractionKind,
    pub timestamp: DateTime<Utc>,
}

impl Interaction {
    pub fn new(
        user_id: impl Into<String>,
        product_id: impl Into<String>,
        kind: InteractionKind,
    ) -> Self {
        Self {
            user_id: user_id.into(),
            product_id: product_id.into(),
            kind,
            timestamp: Utc::now(),
        }
    }
}

/// Catalog product
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    pub id: String,
    pub name: String,
    pub description: String,
    pub price: f64,
}
