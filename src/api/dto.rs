use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::error::ApiError;
use crate::domain::inventory::{DeductResult, SkipReason};
use crate::domain::order::{ApprovalOutcome, ApproveOrder, OrderItem, OrderStatus, PlaceOrder, RejectOrder};

// ============================================================================
// Request / Response Schemas
// ============================================================================

/// Actor recorded when the caller does not name one.
pub const DEFAULT_ACTOR: &str = "system";

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderItemRequest {
    pub item_id: Uuid,
    pub name: String,
    pub category: String,
    #[serde(default)]
    pub strength: Option<String>,
    pub quantity: u32,
}

/// Body of POST and PUT.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderRequest {
    pub store_name: String,
    pub city: String,
    pub items: Vec<OrderItemRequest>,
    pub requested_by: String,
}

impl From<OrderRequest> for PlaceOrder {
    fn from(request: OrderRequest) -> Self {
        PlaceOrder {
            store_name: request.store_name,
            city: request.city,
            items: request
                .items
                .into_iter()
                .map(|item| OrderItem {
                    item_id: item.item_id,
                    name: item.name,
                    category: item.category,
                    strength: item.strength,
                    quantity: item.quantity,
                    approved_quantity: None,
                    original_quantity: None,
                })
                .collect(),
            requested_by: request.requested_by,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListOrdersQuery {
    pub store_name: Option<String>,
    pub city: Option<String>,
    pub status: Option<OrderStatus>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApproveRequest {
    #[serde(default)]
    pub approved_quantities: Option<HashMap<Uuid, u32>>,
    #[serde(default)]
    pub approved_by: Option<String>,
    #[serde(default)]
    pub partial_approval_note: Option<String>,
}

impl From<ApproveRequest> for ApproveOrder {
    fn from(request: ApproveRequest) -> Self {
        ApproveOrder {
            approved_quantities: request.approved_quantities,
            approved_by: actor_or_default(request.approved_by),
            note: non_blank(request.partial_approval_note),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RejectRequest {
    #[serde(default)]
    pub rejected_by: Option<String>,
    #[serde(default)]
    pub rejection_reason: Option<String>,
}

impl From<RejectRequest> for RejectOrder {
    fn from(request: RejectRequest) -> Self {
        RejectOrder {
            rejected_by: actor_or_default(request.rejected_by),
            reason: non_blank(request.rejection_reason),
        }
    }
}

/// Decode an optional JSON body; an empty body means "all defaults".
pub fn parse_optional_body<T>(body: &[u8]) -> Result<T, ApiError>
where
    T: Default + for<'de> Deserialize<'de>,
{
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(T::default());
    }
    serde_json::from_slice(body).map_err(|e| ApiError::Validation(format!("Invalid request body: {}", e)))
}

pub fn parse_order_id(raw: &str) -> Result<Uuid, ApiError> {
    Uuid::parse_str(raw).map_err(|_| ApiError::Validation("Invalid order ID".to_string()))
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

fn actor_or_default(actor: Option<String>) -> String {
    non_blank(actor).unwrap_or_else(|| DEFAULT_ACTOR.to_string())
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatedResponse {
    pub order_id: Uuid,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ActionResponse {
    pub success: bool,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub order_id: Option<Uuid>,
}

impl ActionResponse {
    pub fn ok(message: impl Into<String>, order_id: Option<Uuid>) -> Self {
        Self {
            success: true,
            message: message.into(),
            order_id,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InventoryOutcome {
    pub item_id: Uuid,
    pub quantity: u64,
    pub outcome: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<SkipReason>,
}

impl From<&DeductResult> for InventoryOutcome {
    fn from(result: &DeductResult) -> Self {
        match result {
            DeductResult::Applied { item_id, quantity, .. } => InventoryOutcome {
                item_id: *item_id,
                quantity: *quantity,
                outcome: "applied",
                reason: None,
            },
            DeductResult::Skipped { item_id, quantity, reason } => InventoryOutcome {
                item_id: *item_id,
                quantity: *quantity,
                outcome: "skipped",
                reason: Some(reason.clone()),
            },
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApproveResponse {
    pub success: bool,
    pub message: String,
    pub order_id: Uuid,
    pub is_partial_approval: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub inventory: Option<Vec<InventoryOutcome>>,
}

impl ApproveResponse {
    pub fn from_outcome(outcome: &ApprovalOutcome, report_inventory: bool) -> Self {
        let partial = outcome.order.is_partial_approval.unwrap_or(false);
        Self {
            success: true,
            message: if partial {
                "Order partially approved successfully".to_string()
            } else {
                "Order approved successfully".to_string()
            },
            order_id: outcome.order.id,
            is_partial_approval: partial,
            inventory: report_inventory
                .then(|| outcome.deductions.iter().map(InventoryOutcome::from).collect()),
        }
    }
}
