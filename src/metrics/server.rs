use actix_web::{web, HttpResponse};
use prometheus::{Encoder, TextEncoder};

use crate::api::AppState;
use crate::health::SystemHealth;

/// Prometheus text exposition of the service registry.
pub async fn metrics_handler(state: web::Data<AppState>) -> HttpResponse {
    let encoder = TextEncoder::new();
    let metric_families = state.metrics.registry().gather();

    let mut buffer = Vec::new();
    if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
        tracing::error!(error = %e, "Failed to encode metrics");
        return HttpResponse::InternalServerError().finish();
    }

    HttpResponse::Ok()
        .content_type("text/plain; version=0.0.4")
        .body(buffer)
}

/// Store connectivity summary; 503 when any store is unhealthy.
pub async fn health_handler(state: web::Data<AppState>) -> HttpResponse {
    let (orders, catalog) = tokio::join!(state.orders.check_health(), state.catalog.check_health());
    let health = SystemHealth::from_components(vec![orders, catalog]);

    let body = serde_json::json!({
        "status": if health.overall_status.is_unhealthy() { "unhealthy" } else { "healthy" },
        "service": "pharmacy-orders",
        "health": health,
    });

    if health.overall_status.is_unhealthy() {
        HttpResponse::ServiceUnavailable().json(body)
    } else {
        HttpResponse::Ok().json(body)
    }
}
