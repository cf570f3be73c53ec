//! Here we expose prometheus metrics about howler-servicenow
use axum::{
	extract::Extension,
	http::{header::CONTENT_TYPE, StatusCode},
	response::{IntoResponse, Response},
	routing::get,
	Router,
};
use prometheus::{Encoder, Registry, TextEncoder, TEXT_FORMAT};

async fn metrics_handler(Extension(registry): Extension<Registry>) -> Response {
	let mut buffer = vec![];
	let encoder = TextEncoder::new();
	let metric_families = registry.gather();

	match encoder.encode(&metric_families, &mut buffer) {
		Ok(()) => ([(CONTENT_TYPE, TEXT_FORMAT)], buffer).into_response(),
		Err(err) => {
			tracing::error!("failed to encode metrics: {err}");
			(StatusCode::INTERNAL_SERVER_ERROR, err.to_string()).into_response()
		}
	}
}

/// `GET /metrics` serving everything registered on `registry`
pub fn router(registry: Registry) -> Router {
	Router::new().route("/metrics", get(metrics_handler)).layer(Extension(registry))
}
