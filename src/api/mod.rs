// ============================================================================
// HTTP API
// ============================================================================
//
// /orders/pharmacy              GET list (storeName required), POST create
// /orders/pharmacy/{id}         GET, PUT (upsert), DELETE
// /orders/pharmacy/{id}/approve PATCH
// /orders/pharmacy/{id}/reject  PATCH
// /health, /metrics
//
// ============================================================================

mod dto;
mod error;
mod handlers;

use std::sync::Arc;

use actix_web::web;

use crate::domain::order::ApprovalEngine;
use crate::metrics::{health_handler, metrics_handler, Metrics};
use crate::store::{CatalogStore, OrderStore};

use error::ApiError;

/// Shared handles injected into every handler.
pub struct AppState {
    pub orders: Arc<dyn OrderStore>,
    pub catalog: Arc<dyn CatalogStore>,
    pub engine: Arc<ApprovalEngine>,
    pub metrics: Arc<Metrics>,
    pub report_inventory_outcomes: bool,
}

/// Register routes and extractor error handling.
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.app_data(
        web::JsonConfig::default()
            .error_handler(|err, _req| ApiError::Validation(format!("Invalid request body: {}", err)).into()),
    )
    .app_data(
        web::QueryConfig::default()
            .error_handler(|err, _req| ApiError::Validation(format!("Invalid query: {}", err)).into()),
    )
    .service(
        web::scope("/orders/pharmacy")
            .route("", web::get().to(handlers::list_orders))
            .route("", web::post().to(handlers::create_order))
            .route("/{id}", web::get().to(handlers::get_order))
            .route("/{id}", web::put().to(handlers::replace_order))
            .route("/{id}", web::delete().to(handlers::delete_order))
            .route("/{id}/approve", web::patch().to(handlers::approve_order))
            .route("/{id}/reject", web::patch().to(handlers::reject_order)),
    )
    .route("/health", web::get().to(health_handler))
    .route("/metrics", web::get().to(metrics_handler));
}

// ============================================================================
// Handler Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::dto::DEFAULT_ACTOR;
    use super::*;
    use crate::domain::inventory::{CatalogItem, InventoryAdjuster};
    use crate::domain::order::{Order, OrderItem, OrderStatus, PlaceOrder};
    use crate::health::ComponentHealth;
    use crate::store::{InMemoryCatalogStore, InMemoryOrderStore, OrderFilter, StoreResult, TransitionOutcome};
    use actix_web::http::StatusCode;
    use actix_web::{test, App};
    use chrono::Utc;
    use serde_json::{json, Value};
    use uuid::Uuid;

    struct Harness {
        orders: Arc<InMemoryOrderStore>,
        catalog: Arc<InMemoryCatalogStore>,
        state: web::Data<AppState>,
    }

    fn harness(stock: &[(Uuid, u64)], report_inventory_outcomes: bool) -> Harness {
        let metrics = Arc::new(Metrics::new().unwrap());
        let orders = Arc::new(InMemoryOrderStore::new());
        let catalog = Arc::new(InMemoryCatalogStore::with_items(
            stock.iter().map(|(id, stock)| CatalogItem::new(*id, "item", *stock)),
        ));
        let inventory = Arc::new(InventoryAdjuster::new(catalog.clone(), metrics.clone(), 3));
        let engine = Arc::new(ApprovalEngine::new(orders.clone(), inventory, metrics.clone()));
        let state = web::Data::new(AppState {
            orders: orders.clone(),
            catalog: catalog.clone(),
            engine,
            metrics,
            report_inventory_outcomes,
        });
        Harness { orders, catalog, state }
    }

    async fn seed(harness: &Harness, lines: &[(Uuid, u32)]) -> Order {
        let order = Order::place(
            Uuid::new_v4(),
            PlaceOrder {
                store_name: "Central".to_string(),
                city: "Lagos".to_string(),
                items: lines
                    .iter()
                    .map(|(id, quantity)| OrderItem::new(*id, "item", "general", *quantity))
                    .collect(),
                requested_by: "clerk".to_string(),
            },
            Utc::now(),
        )
        .unwrap();
        harness.orders.insert(&order).await.unwrap();
        order
    }

    fn order_body(item_id: Uuid, quantity: u32) -> Value {
        json!({
            "storeName": "Central",
            "city": "Lagos",
            "requestedBy": "clerk",
            "items": [{
                "itemId": item_id,
                "name": "Amoxicillin",
                "category": "antibiotic",
                "strength": "250mg",
                "quantity": quantity
            }]
        })
    }

    #[actix_web::test]
    async fn test_create_then_fetch() {
        let h = harness(&[], false);
        let app = test::init_service(App::new().app_data(h.state.clone()).configure(configure)).await;

        let req = test::TestRequest::post()
            .uri("/orders/pharmacy")
            .set_json(order_body(Uuid::new_v4(), 4))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::CREATED);
        let created: Value = test::read_body_json(resp).await;
        let order_id = created["orderId"].as_str().unwrap().to_string();

        let req = test::TestRequest::get()
            .uri(&format!("/orders/pharmacy/{}", order_id))
            .to_request();
        let order: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(order["status"], "pending");
        assert_eq!(order["items"][0]["quantity"], 4);
    }

    #[actix_web::test]
    async fn test_create_validation_errors() {
        let h = harness(&[], false);
        let app = test::init_service(App::new().app_data(h.state.clone()).configure(configure)).await;

        let req = test::TestRequest::post()
            .uri("/orders/pharmacy")
            .set_json(order_body(Uuid::new_v4(), 0))
            .to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::BAD_REQUEST);

        let req = test::TestRequest::post()
            .uri("/orders/pharmacy")
            .set_json(json!({"storeName": "Central"}))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["success"], false);
        assert_eq!(h.orders.len().await, 0);
    }

    #[actix_web::test]
    async fn test_list_requires_store_name() {
        let h = harness(&[], false);
        seed(&h, &[(Uuid::new_v4(), 1)]).await;
        let app = test::init_service(App::new().app_data(h.state.clone()).configure(configure)).await;

        let req = test::TestRequest::get().uri("/orders/pharmacy").to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::BAD_REQUEST);

        let req = test::TestRequest::get()
            .uri("/orders/pharmacy?storeName=Central&status=pending")
            .to_request();
        let orders: Vec<Value> = test::call_and_read_body_json(&app, req).await;
        assert_eq!(orders.len(), 1);

        let req = test::TestRequest::get()
            .uri("/orders/pharmacy?storeName=Central&city=Abuja")
            .to_request();
        let orders: Vec<Value> = test::call_and_read_body_json(&app, req).await;
        assert!(orders.is_empty());

        let req = test::TestRequest::get()
            .uri("/orders/pharmacy?storeName=Central&status=shipped")
            .to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::BAD_REQUEST);
    }

    #[actix_web::test]
    async fn test_invalid_and_missing_ids() {
        let h = harness(&[], false);
        let app = test::init_service(App::new().app_data(h.state.clone()).configure(configure)).await;

        for req in [
            test::TestRequest::get().uri("/orders/pharmacy/123").to_request(),
            test::TestRequest::patch().uri("/orders/pharmacy/abc/approve").to_request(),
            test::TestRequest::patch().uri("/orders/pharmacy/abc/reject").to_request(),
            test::TestRequest::delete().uri("/orders/pharmacy/xyz").to_request(),
        ] {
            assert_eq!(test::call_service(&app, req).await.status(), StatusCode::BAD_REQUEST);
        }

        let missing = Uuid::new_v4();
        for req in [
            test::TestRequest::get().uri(&format!("/orders/pharmacy/{}", missing)).to_request(),
            test::TestRequest::patch()
                .uri(&format!("/orders/pharmacy/{}/approve", missing))
                .to_request(),
            test::TestRequest::patch()
                .uri(&format!("/orders/pharmacy/{}/reject", missing))
                .to_request(),
            test::TestRequest::delete().uri(&format!("/orders/pharmacy/{}", missing)).to_request(),
        ] {
            assert_eq!(test::call_service(&app, req).await.status(), StatusCode::NOT_FOUND);
        }
    }

    #[actix_web::test]
    async fn test_approve_without_body_is_full_approval() {
        let item = Uuid::new_v4();
        let h = harness(&[(item, 20)], false);
        let order = seed(&h, &[(item, 10)]).await;
        let app = test::init_service(App::new().app_data(h.state.clone()).configure(configure)).await;

        let req = test::TestRequest::patch()
            .uri(&format!("/orders/pharmacy/{}/approve", order.id))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK);

        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["success"], true);
        assert_eq!(body["isPartialApproval"], false);
        assert!(body.get("inventory").is_none());
        assert_eq!(h.catalog.stock_of(item).await, Some(10));

        let stored = h.orders.get(order.id).await.unwrap().unwrap();
        assert_eq!(stored.approved_by.as_deref(), Some(DEFAULT_ACTOR));
    }

    #[actix_web::test]
    async fn test_approve_reports_inventory_when_enabled() {
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        let h = harness(&[(a, 20), (b, 2)], true);
        let order = seed(&h, &[(a, 10), (b, 5)]).await;
        let app = test::init_service(App::new().app_data(h.state.clone()).configure(configure)).await;

        let req = test::TestRequest::patch()
            .uri(&format!("/orders/pharmacy/{}/approve", order.id))
            .set_json(json!({
                "approvedQuantities": { a.to_string(): 10, b.to_string(): 5 },
                "approvedBy": "pharmacist"
            }))
            .to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;

        assert_eq!(body["isPartialApproval"], true);
        let inventory = body["inventory"].as_array().unwrap();
        assert_eq!(inventory.len(), 2);
        let skipped: Vec<&Value> = inventory.iter().filter(|o| o["outcome"] == "skipped").collect();
        assert_eq!(skipped.len(), 1);
        assert_eq!(skipped[0]["itemId"], b.to_string());
        assert_eq!(skipped[0]["reason"]["kind"], "insufficientStock");
    }

    #[actix_web::test]
    async fn test_approve_malformed_body_has_no_side_effects() {
        let item = Uuid::new_v4();
        let h = harness(&[(item, 20)], false);
        let order = seed(&h, &[(item, 10)]).await;
        let app = test::init_service(App::new().app_data(h.state.clone()).configure(configure)).await;

        let req = test::TestRequest::patch()
            .uri(&format!("/orders/pharmacy/{}/approve", order.id))
            .insert_header(("content-type", "application/json"))
            .set_payload(r#"{"approvedQuantities": {"not-a-uuid": 3}}"#)
            .to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::BAD_REQUEST);

        assert_eq!(h.orders.get(order.id).await.unwrap().unwrap(), order);
        assert_eq!(h.catalog.stock_of(item).await, Some(20));
    }

    #[actix_web::test]
    async fn test_reject_then_approve_is_refused() {
        let item = Uuid::new_v4();
        let h = harness(&[(item, 20)], false);
        let order = seed(&h, &[(item, 10)]).await;
        let app = test::init_service(App::new().app_data(h.state.clone()).configure(configure)).await;

        let req = test::TestRequest::patch()
            .uri(&format!("/orders/pharmacy/{}/reject", order.id))
            .set_json(json!({"rejectedBy": "pharmacist", "rejectionReason": "Out of budget"}))
            .to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["success"], true);

        let req = test::TestRequest::patch()
            .uri(&format!("/orders/pharmacy/{}/approve", order.id))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        let body: Value = test::read_body_json(resp).await;
        assert!(body["message"].as_str().unwrap().contains("rejected"));

        let stored = h.orders.get(order.id).await.unwrap().unwrap();
        assert_eq!(stored.status, OrderStatus::Rejected);
        assert_eq!(stored.rejection_reason.as_deref(), Some("Out of budget"));
        assert_eq!(h.catalog.stock_of(item).await, Some(20));
    }

    #[actix_web::test]
    async fn test_put_upserts_and_revises_pending_orders() {
        let h = harness(&[], false);
        let app = test::init_service(App::new().app_data(h.state.clone()).configure(configure)).await;
        let order_id = Uuid::new_v4();

        let req = test::TestRequest::put()
            .uri(&format!("/orders/pharmacy/{}", order_id))
            .set_json(order_body(Uuid::new_v4(), 3))
            .to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["message"], "Order created");

        let req = test::TestRequest::put()
            .uri(&format!("/orders/pharmacy/{}", order_id))
            .set_json(order_body(Uuid::new_v4(), 9))
            .to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["message"], "Order updated");

        let stored = h.orders.get(order_id).await.unwrap().unwrap();
        assert_eq!(stored.items[0].quantity, 9);
        assert_eq!(stored.status, OrderStatus::Pending);

        let req = test::TestRequest::patch()
            .uri(&format!("/orders/pharmacy/{}/reject", order_id))
            .to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::OK);

        let req = test::TestRequest::put()
            .uri(&format!("/orders/pharmacy/{}", order_id))
            .set_json(order_body(Uuid::new_v4(), 1))
            .to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::BAD_REQUEST);
    }

    /// Rewrites the order (same content, next version) right after handing it out.
    struct TouchedAfterRead(Arc<InMemoryOrderStore>);

    #[async_trait::async_trait]
    impl OrderStore for TouchedAfterRead {
        async fn get(&self, id: Uuid) -> StoreResult<Option<Order>> {
            let read = self.0.get(id).await?;
            if let Some(order) = &read {
                let mut touched = order.clone();
                touched.version += 1;
                self.0.update_if_current(&touched, order.status, order.version).await?;
            }
            Ok(read)
        }

        async fn list(&self, filter: &OrderFilter) -> StoreResult<Vec<Order>> {
            self.0.list(filter).await
        }

        async fn insert(&self, order: &Order) -> StoreResult<bool> {
            self.0.insert(order).await
        }

        async fn update_if_current(
            &self,
            order: &Order,
            expected_status: OrderStatus,
            expected_version: u64,
        ) -> StoreResult<TransitionOutcome> {
            self.0.update_if_current(order, expected_status, expected_version).await
        }

        async fn delete(&self, id: Uuid) -> StoreResult<bool> {
            self.0.delete(id).await
        }

        async fn check_health(&self) -> ComponentHealth {
            self.0.check_health().await
        }
    }

    #[actix_web::test]
    async fn test_concurrent_writes_answer_conflict() {
        let item = Uuid::new_v4();
        let h = harness(&[(item, 20)], false);
        let order = seed(&h, &[(item, 10)]).await;

        let touching = Arc::new(TouchedAfterRead(h.orders.clone()));
        let metrics = h.state.metrics.clone();
        let inventory = Arc::new(InventoryAdjuster::new(h.catalog.clone(), metrics.clone(), 3));
        let state = web::Data::new(AppState {
            orders: touching.clone(),
            catalog: h.catalog.clone(),
            engine: Arc::new(ApprovalEngine::new(touching, inventory, metrics.clone())),
            metrics,
            report_inventory_outcomes: false,
        });
        let app = test::init_service(App::new().app_data(state).configure(configure)).await;

        let req = test::TestRequest::put()
            .uri(&format!("/orders/pharmacy/{}", order.id))
            .set_json(order_body(item, 3))
            .to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::CONFLICT);

        let req = test::TestRequest::patch()
            .uri(&format!("/orders/pharmacy/{}/approve", order.id))
            .to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::CONFLICT);

        let stored = h.orders.get(order.id).await.unwrap().unwrap();
        assert_eq!(stored.status, OrderStatus::Pending);
        assert_eq!(stored.items[0].quantity, 10);
        assert_eq!(h.catalog.stock_of(item).await, Some(20));
    }

    #[actix_web::test]
    async fn test_delete_order() {
        let h = harness(&[], false);
        let order = seed(&h, &[(Uuid::new_v4(), 1)]).await;
        let app = test::init_service(App::new().app_data(h.state.clone()).configure(configure)).await;

        let req = test::TestRequest::delete()
            .uri(&format!("/orders/pharmacy/{}", order.id))
            .to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::OK);
        assert_eq!(h.orders.len().await, 0);
    }

    #[actix_web::test]
    async fn test_health_and_metrics_endpoints() {
        let h = harness(&[], false);
        let app = test::init_service(App::new().app_data(h.state.clone()).configure(configure)).await;

        let req = test::TestRequest::get().uri("/health").to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["status"], "healthy");
        assert_eq!(body["health"]["components"].as_array().unwrap().len(), 2);

        h.state.metrics.record_order_created();
        let req = test::TestRequest::get().uri("/metrics").to_request();
        let body = test::call_and_read_body(&app, req).await;
        let text = String::from_utf8(body.to_vec()).unwrap();
        assert!(text.contains("orders_created_total 1"));
    }
}
