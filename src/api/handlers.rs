use actix_web::{web, HttpResponse};
use chrono::Utc;
use uuid::Uuid;

use super::dto::{
    parse_optional_body, parse_order_id, ActionResponse, ApproveRequest, ApproveResponse,
    CreatedResponse, ListOrdersQuery, OrderRequest, RejectRequest,
};
use super::error::ApiError;
use super::AppState;
use crate::domain::order::{Order, PlaceOrder};
use crate::store::{OrderFilter, TransitionOutcome};

// ============================================================================
// Order Handlers
// ============================================================================

pub async fn list_orders(
    state: web::Data<AppState>,
    query: web::Query<ListOrdersQuery>,
) -> Result<HttpResponse, ApiError> {
    let query = query.into_inner();
    let store_name = query
        .store_name
        .filter(|name| !name.trim().is_empty())
        .ok_or_else(|| ApiError::Validation("storeName is required".to_string()))?;

    let filter = OrderFilter {
        store_name,
        city: query.city.filter(|city| !city.trim().is_empty()),
        status: query.status,
    };
    let orders = state.orders.list(&filter).await?;

    Ok(HttpResponse::Ok().json(orders))
}

pub async fn get_order(state: web::Data<AppState>, path: web::Path<String>) -> Result<HttpResponse, ApiError> {
    let order_id = parse_order_id(&path)?;

    match state.orders.get(order_id).await? {
        Some(order) => Ok(HttpResponse::Ok().json(order)),
        None => Err(ApiError::NotFound("Order not found".to_string())),
    }
}

pub async fn create_order(
    state: web::Data<AppState>,
    body: web::Json<OrderRequest>,
) -> Result<HttpResponse, ApiError> {
    let order = Order::place(Uuid::new_v4(), PlaceOrder::from(body.into_inner()), Utc::now())?;

    if !state.orders.insert(&order).await? {
        return Err(ApiError::Conflict("Order already exists".to_string()));
    }

    state.metrics.record_order_created();
    tracing::info!(
        order_id = %order.id,
        store_name = %order.store_name,
        item_count = order.items.len(),
        "Order created"
    );

    Ok(HttpResponse::Created().json(CreatedResponse { order_id: order.id }))
}

/// Upsert: create a pending order under the given id, or revise a pending one.
pub async fn replace_order(
    state: web::Data<AppState>,
    path: web::Path<String>,
    body: web::Json<OrderRequest>,
) -> Result<HttpResponse, ApiError> {
    let order_id = parse_order_id(&path)?;
    let command = PlaceOrder::from(body.into_inner());

    let Some(existing) = state.orders.get(order_id).await? else {
        let order = Order::place(order_id, command, Utc::now())?;
        if !state.orders.insert(&order).await? {
            return Err(ApiError::Conflict("Order was created concurrently".to_string()));
        }
        state.metrics.record_order_created();
        tracing::info!(order_id = %order_id, "Order created by upsert");
        return Ok(HttpResponse::Ok().json(ActionResponse::ok("Order created", Some(order_id))));
    };

    let revised = existing.revise(command)?;
    match state
        .orders
        .update_if_current(&revised, existing.status, existing.version)
        .await?
    {
        TransitionOutcome::Applied => {
            tracing::info!(order_id = %order_id, "Order updated");
            Ok(HttpResponse::Ok().json(ActionResponse::ok("Order updated", Some(order_id))))
        }
        TransitionOutcome::Conflict { current } => Err(ApiError::Conflict(format!(
            "Order changed concurrently (current status: {})",
            current
        ))),
        TransitionOutcome::Modified { .. } => Err(ApiError::Conflict(
            "Order was modified concurrently, reload and retry".to_string(),
        )),
        TransitionOutcome::Missing => Err(ApiError::Conflict("Order was deleted concurrently".to_string())),
    }
}

pub async fn delete_order(state: web::Data<AppState>, path: web::Path<String>) -> Result<HttpResponse, ApiError> {
    let order_id = parse_order_id(&path)?;

    if !state.orders.delete(order_id).await? {
        return Err(ApiError::NotFound("Order not found".to_string()));
    }

    tracing::info!(order_id = %order_id, "Order deleted");
    Ok(HttpResponse::Ok().json(ActionResponse::ok("Order deleted", Some(order_id))))
}

// ============================================================================
// Approval Handlers
// ============================================================================

pub async fn approve_order(
    state: web::Data<AppState>,
    path: web::Path<String>,
    body: web::Bytes,
) -> Result<HttpResponse, ApiError> {
    let order_id = parse_order_id(&path)?;
    let request: ApproveRequest = parse_optional_body(&body)?;

    let outcome = state.engine.approve(order_id, request.into()).await?;

    Ok(HttpResponse::Ok().json(ApproveResponse::from_outcome(
        &outcome,
        state.report_inventory_outcomes,
    )))
}

pub async fn reject_order(
    state: web::Data<AppState>,
    path: web::Path<String>,
    body: web::Bytes,
) -> Result<HttpResponse, ApiError> {
    let order_id = parse_order_id(&path)?;
    let request: RejectRequest = parse_optional_body(&body)?;

    state.engine.reject(order_id, request.into()).await?;

    Ok(HttpResponse::Ok().json(ActionResponse::ok("Order rejected successfully", Some(order_id))))
}
