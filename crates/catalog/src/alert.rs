//! Stock alerts derived from catalog state.
//!
//! Alerts are not authoritative: they are recomputed from an item's stock and
//! threshold after every stock mutation. At most one unresolved alert exists
//! per item at any time.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use shopledger_core::{DomainError, Entity, Quantity};

use crate::item::{Item, ItemId};

shopledger_core::uuid_id!(
    /// Stock alert identifier.
    AlertId, "AlertId"
);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertKind {
    OutOfStock,
    LowStock,
}

impl AlertKind {
    pub fn as_str(self) -> &'static str {
        match self {
            AlertKind::OutOfStock => "out_of_stock",
            AlertKind::LowStock => "low_stock",
        }
    }
}

impl core::str::FromStr for AlertKind {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "out_of_stock" => Ok(AlertKind::OutOfStock),
            "low_stock" => Ok(AlertKind::LowStock),
            other => Err(DomainError::validation(format!("unknown alert kind: {other}"))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockAlert {
    pub id: AlertId,
    pub item_id: ItemId,
    pub kind: AlertKind,
    pub message: String,
    pub created_at: DateTime<Utc>,
    pub resolved: bool,
}

impl Entity for StockAlert {
    type Id = AlertId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}

/// What the alert for an item should currently be.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AlertAssessment {
    pub kind: AlertKind,
    pub message: String,
}

/// Classify an item's stock: out of stock at or below zero, low at or below
/// its threshold, otherwise no alert.
pub fn assess(item: &Item) -> Option<AlertAssessment> {
    classify(item.stock, item.min_stock).map(|kind| AlertAssessment {
        kind,
        message: match kind {
            AlertKind::OutOfStock => {
                format!("OUT OF STOCK: {} needs immediate restocking", item.name)
            }
            AlertKind::LowStock => format!(
                "Low stock alert: {} has only {} units left",
                item.name, item.stock
            ),
        },
    })
}

fn classify(stock: Quantity, min_stock: Quantity) -> Option<AlertKind> {
    if stock <= Quantity::ZERO {
        Some(AlertKind::OutOfStock)
    } else if stock <= min_stock {
        Some(AlertKind::LowStock)
    } else {
        None
    }
}
