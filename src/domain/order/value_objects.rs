use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

// ============================================================================
// Order Value Objects
// ============================================================================

/// One requested line of an order.
///
/// `quantity` is what the store asked for. Approval overwrites it with the
/// approved amount and keeps the request in `original_quantity`.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct OrderItem {
    pub item_id: Uuid,
    pub name: String,
    pub category: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub strength: Option<String>,
    pub quantity: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub approved_quantity: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub original_quantity: Option<u32>,
}

impl OrderItem {
    pub fn new(item_id: Uuid, name: impl Into<String>, category: impl Into<String>, quantity: u32) -> Self {
        Self {
            item_id,
            name: name.into(),
            category: category.into(),
            strength: None,
            quantity,
            approved_quantity: None,
            original_quantity: None,
        }
    }

    pub fn with_strength(mut self, strength: impl Into<String>) -> Self {
        self.strength = Some(strength.into());
        self
    }

    /// Quantity requested at creation, whether or not the order was approved since.
    pub fn requested_quantity(&self) -> u32 {
        self.original_quantity.unwrap_or(self.quantity)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
    Pending,
    Approved,
    Rejected,
}

impl OrderStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Pending => "pending",
            OrderStatus::Approved => "approved",
            OrderStatus::Rejected => "rejected",
        }
    }

    /// Approved and rejected orders never transition again.
    pub fn is_terminal(&self) -> bool {
        !matches!(self, OrderStatus::Pending)
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OrderStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(OrderStatus::Pending),
            "approved" => Ok(OrderStatus::Approved),
            "rejected" => Ok(OrderStatus::Rejected),
            other => Err(format!("unknown order status: {}", other)),
        }
    }
}

/// Order document as persisted in the order store.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    pub id: Uuid,
    pub store_name: String,
    pub city: String,
    pub status: OrderStatus,
    /// Bumped by every stored change; conditional writes compare it.
    #[serde(default)]
    pub version: u64,
    pub items: Vec<OrderItem>,
    pub requested_by: String,
    pub requested_at: DateTime<Utc>,

    // Approval
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub approved_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub approved_by: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_partial_approval: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub partial_approval_note: Option<String>,

    // Rejection
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rejected_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rejected_by: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rejection_reason: Option<String>,
}

// ============================================================================
// Unit Tests
// ============================================================================
