// ===============================
// src/metrics.rs
// ===============================
use once_cell::sync::Lazy;
use prometheus::{
    Encoder, Histogram, HistogramOpts, IntCounter, IntCounterVec, Opts, Registry, TextEncoder,
};

// Single custom registry (everything is registered here by `init`)
pub static REGISTRY: Lazy<Registry> = Lazy::new(Registry::new);

// -------- HTTP --------
pub static HTTP_REQUESTS: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("http_requests_total", "backend requests (labels: method, route, status)"),
        &["method", "route", "status"],
    )
    .expect("http_requests_total opts")
});

pub static HTTP_LATENCY: Lazy<Histogram> = Lazy::new(|| {
    Histogram::with_opts(HistogramOpts::new(
        "http_request_latency_ms",
        "Backend request latency (ms)",
    ))
    .expect("http_request_latency_ms opts")
});

// -------- Cash register --------
pub static CASH_OPS: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("cashbox_ops_total", "cash register operations (labels: op, outcome)"),
        &["op", "outcome"],
    )
    .expect("cashbox_ops_total opts")
});

// -------- Uploads --------
pub static UPLOAD_BYTES: Lazy<IntCounter> = Lazy::new(|| {
    IntCounter::new("image_upload_bytes_total", "bytes PUT to presigned urls")
        .expect("image_upload_bytes_total opts")
});

pub fn init() {
    for m in [
        REGISTRY.register(Box::new(HTTP_REQUESTS.clone())),
        REGISTRY.register(Box::new(HTTP_LATENCY.clone())),
        REGISTRY.register(Box::new(CASH_OPS.clone())),
        REGISTRY.register(Box::new(UPLOAD_BYTES.clone())),
    ] {
        // AlreadyReg on a second init is fine
        let _ = m;
    }
}

pub fn cash_op(op: &str, ok: bool) {
    CASH_OPS
        .with_label_values(&[op, if ok { "ok" } else { "error" }])
        .inc();
}

/// Collapse numeric path segments so route labels stay low-cardinality:
/// `/api/cashbox/sessions/42/movements` -> `/api/cashbox/sessions/:id/movements`.
pub fn route_label(path: &str) -> String {
    path.split('?')
        .next()
        .unwrap_or_default()
        .split('/')
        .map(|seg| {
            if !seg.is_empty() && seg.chars().all(|c| c.is_ascii_digit()) {
                ":id"
            } else {
                seg
            }
        })
        .collect::<Vec<_>>()
        .join("/")
}

// Encode all metrics in Prometheus text format
pub fn encode_metrics() -> String {
    let encoder = TextEncoder::new();
    let families = REGISTRY.gather();
    let mut buf = Vec::new();
    if encoder.encode(&families, &mut buf).is_err() || buf.is_empty() {
        buf.extend_from_slice(b"# no metrics\n");
    }
    String::from_utf8_lossy(&buf).into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn route_labels_hide_ids() {
        assert_eq!(
            route_label("/api/cashbox/sessions/42/movements"),
            "/api/cashbox/sessions/:id/movements"
        );
        assert_eq!(route_label("/api/cashbox/current/1"), "/api/cashbox/current/:id");
        assert_eq!(route_label("/api/cashbox/sessions?storeId=1"), "/api/cashbox/sessions");
    }

    #[test]
    fn registered_counters_show_up_in_dump() {
        init();
        init();
        cash_op("open", true);
        let text = encode_metrics();
        assert!(text.contains("cashbox_ops_total"));
    }
}
