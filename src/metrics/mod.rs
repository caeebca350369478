// Private module declaration
mod server;

use prometheus::{HistogramOpts, HistogramVec, IntCounter, IntCounterVec, Opts, Registry};

// Re-export for public API
pub use server::{health_handler, metrics_handler};

// ============================================================================
// Metrics Module - Prometheus metrics for observability
// ============================================================================
//
// Provides metrics for:
// - Order creation
// - Approval / rejection transitions (full vs partial)
// - Transitions refused because the order had already left `pending`
// - Per-item inventory deductions (applied vs skipped, by reason)
// - Approval latency
//
// All metrics are registered with Prometheus and can be scraped via /metrics
// ============================================================================

pub struct Metrics {
    registry: Registry,

    pub orders_created: IntCounter,
    pub order_transitions: IntCounterVec,
    pub order_transitions_refused: IntCounterVec,
    pub inventory_deductions: IntCounterVec,
    pub approval_duration: HistogramVec,
}

impl Metrics {
    pub fn new() -> anyhow::Result<Self> {
        let registry = Registry::new();

        let orders_created = IntCounter::new("orders_created_total", "Total orders created")?;
        registry.register(Box::new(orders_created.clone()))?;

        let order_transitions = IntCounterVec::new(
            Opts::new("order_transitions_total", "Orders that left the pending state"),
            &["transition", "kind"],
        )?;
        registry.register(Box::new(order_transitions.clone()))?;

        let order_transitions_refused = IntCounterVec::new(
            Opts::new(
                "order_transition_refused_total",
                "Approve/reject calls refused because the order was not pending",
            ),
            &["operation", "current_status"],
        )?;
        registry.register(Box::new(order_transitions_refused.clone()))?;

        let inventory_deductions = IntCounterVec::new(
            Opts::new("inventory_deductions_total", "Per-item stock deductions"),
            &["outcome", "reason"],
        )?;
        registry.register(Box::new(inventory_deductions.clone()))?;

        let approval_duration = HistogramVec::new(
            HistogramOpts::new("approval_duration_seconds", "Approve/reject handling duration")
                .buckets(vec![0.001, 0.005, 0.01, 0.05, 0.1, 0.5, 1.0, 5.0]),
            &["operation"],
        )?;
        registry.register(Box::new(approval_duration.clone()))?;

        Ok(Self {
            registry,
            orders_created,
            order_transitions,
            order_transitions_refused,
            inventory_deductions,
            approval_duration,
        })
    }

    /// Get the Prometheus registry for exposing metrics via HTTP
    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn record_order_created(&self) {
        self.orders_created.inc();
    }

    pub fn record_approval(&self, partial: bool) {
        let kind = if partial { "partial" } else { "full" };
        self.order_transitions.with_label_values(&["approved", kind]).inc();
    }

    pub fn record_rejection(&self) {
        self.order_transitions.with_label_values(&["rejected", "-"]).inc();
    }

    pub fn record_refused_transition(&self, operation: &str, current_status: &str) {
        self.order_transitions_refused
            .with_label_values(&[operation, current_status])
            .inc();
    }

    pub fn record_deduction(&self, applied: bool, reason: &str) {
        let outcome = if applied { "applied" } else { "skipped" };
        self.inventory_deductions.with_label_values(&[outcome, reason]).inc();
    }

    pub fn observe_duration(&self, operation: &str, duration_secs: f64) {
        self.approval_duration
            .with_label_values(&[operation])
            .observe(duration_secs);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn counter_value(metrics: &Metrics, name: &str) -> f64 {
        metrics
            .registry()
            .gather()
            .iter()
            .find(|m| m.name() == name)
            .map(|family| family.metric.iter().map(|m| m.counter.value.unwrap_or(0.0)).sum())
            .unwrap_or(0.0)
    }

    #[test]
    fn test_metrics_creation() {
        let metrics = Metrics::new().unwrap();
        metrics.record_order_created();
        assert!(!metrics.registry().gather().is_empty());
    }

    #[test]
    fn test_record_transitions() {
        let metrics = Metrics::new().unwrap();
        metrics.record_approval(false);
        metrics.record_approval(true);
        metrics.record_rejection();

        let gathered = metrics.registry().gather();
        let transitions = gathered
            .iter()
            .find(|m| m.name() == "order_transitions_total")
            .unwrap();
        assert_eq!(transitions.metric.len(), 3);
        assert_eq!(counter_value(&metrics, "order_transitions_total"), 3.0);
    }

    #[test]
    fn test_record_deductions() {
        let metrics = Metrics::new().unwrap();
        metrics.record_deduction(true, "-");
        metrics.record_deduction(false, "insufficient_stock");
        metrics.record_deduction(false, "insufficient_stock");

        assert_eq!(counter_value(&metrics, "inventory_deductions_total"), 3.0);
    }

    #[test]
    fn test_orders_created_counter() {
        let metrics = Metrics::new().unwrap();
        metrics.record_order_created();
        metrics.record_order_created();
        assert_eq!(counter_value(&metrics, "orders_created_total"), 2.0);
    }
}
