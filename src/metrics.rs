use tracing::trace;

// Lightweight metric events; the Prometheus recorder renders at /metrics.

pub fn inc_requests(route: &'static str) {
    trace!(
        target = "showroom.metrics",
        route = route,
        "requests_total_inc"
    );
}

pub fn catalog_loaded(items: usize, elapsed_ms: u128) {
    trace!(
        target = "showroom.metrics",
        items = items as u64,
        elapsed_ms = elapsed_ms as u64,
        "catalog_loaded"
    );
}

pub fn export_rendered(format: &'static str, elapsed_ms: u128) {
    trace!(
        target = "showroom.metrics",
        format = format,
        elapsed_ms = elapsed_ms as u64,
        "export_rendered"
    );
}
