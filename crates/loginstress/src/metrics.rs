use crate::engine::orchestrator::ACTIVE_ATTEMPTS;
use hyper::{
    service::{make_service_fn, service_fn},
    Body, Request, Response, Server, StatusCode,
};
use lazy_static::lazy_static;
use prometheus::core::Collector;
use prometheus::{Encoder, Gauge, IntCounter, IntCounterVec, Opts, Registry, TextEncoder};
use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::atomic::Ordering;
use tracing::{error, info};

lazy_static! {
    pub static ref REGISTRY: Registry = Registry::new();
    pub static ref IN_FLIGHT_GAUGE: Gauge = Gauge::new(
        "loginstress_in_flight_attempts",
        "Number of login attempts currently in flight"
    )
    .expect("metric can be created");
    /// Completed attempts, labelled by outcome kind
    pub static ref ATTEMPTS_TOTAL: IntCounterVec = IntCounterVec::new(
        Opts::new(
            "loginstress_attempts_total",
            "Total number of completed login attempts by outcome"
        ),
        &["outcome"]
    )
    .expect("metric can be created");
    pub static ref SKIPPED_CREDENTIALS: IntCounter = IntCounter::new(
        "loginstress_skipped_credentials_total",
        "Total number of credential lines skipped as malformed"
    )
    .expect("metric can be created");
    /// Count of runs stopped early (rate limited, blocked or interrupted)
    pub static ref RUN_STOPPED: IntCounter = IntCounter::new(
        "loginstress_run_stopped_total",
        "Total number of runs stopped before all credentials were attempted"
    )
    .expect("metric can be created");
}

/// Adds every loginstress collector to [`REGISTRY`]. Safe to call repeatedly.
pub fn register_metrics() {
    let collectors: [Box<dyn Collector>; 4] = [
        Box::new(IN_FLIGHT_GAUGE.clone()),
        Box::new(ATTEMPTS_TOTAL.clone()),
        Box::new(SKIPPED_CREDENTIALS.clone()),
        Box::new(RUN_STOPPED.clone()),
    ];
    for collector in collectors {
        // AlreadyReg on repeat calls is expected.
        let _ = REGISTRY.register(collector);
    }
}

/// Text exposition of the registry, with the in-flight gauge sampled first.
pub fn render_metrics() -> String {
    IN_FLIGHT_GAUGE.set(ACTIVE_ATTEMPTS.load(Ordering::SeqCst) as f64);

    let mut buffer = Vec::new();
    match TextEncoder::new().encode(&REGISTRY.gather(), &mut buffer) {
        Ok(()) => String::from_utf8_lossy(&buffer).into_owned(),
        Err(e) => format!("# failed to encode metrics: {}", e),
    }
}

fn route(path: &str) -> (StatusCode, String) {
    match path {
        "/metrics" => (StatusCode::OK, render_metrics()),
        "/health" => (StatusCode::OK, "OK".to_string()),
        _ => (StatusCode::NOT_FOUND, "Not Found".to_string()),
    }
}

pub(crate) async fn metrics_handler(req: Request<Body>) -> Result<Response<Body>, Infallible> {
    let (status, body) = route(req.uri().path());
    let mut response = Response::new(Body::from(body));
    *response.status_mut() = status;
    Ok(response)
}

/// Serves `/metrics` and `/health` on `0.0.0.0:port` for the rest of the run.
pub async fn run_metrics_server(port: u16) {
    register_metrics();

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let builder = match Server::try_bind(&addr) {
        Ok(builder) => builder,
        Err(e) => {
            error!(port, error = %e, "Failed to bind metrics server");
            return;
        }
    };

    info!(port, "Metrics server online");
    let served = builder
        .serve(make_service_fn(|_conn| async {
            Ok::<_, Infallible>(service_fn(metrics_handler))
        }))
        .await;

    if let Err(e) = served {
        error!(error = %e, "Metrics server failed");
    }
}
