//! http endpoint alertmanager delivers alert group notifications to
use std::{
	net::{IpAddr, Ipv4Addr, SocketAddr},
	sync::Arc,
};

use anyhow::{Context, Result};
use axum::{
	extract::{rejection::JsonRejection, Extension, Json},
	http::StatusCode,
	routing::post,
	Router,
};
use prometheus::{IntCounterVec, Registry};
use serde::{Deserialize, Serialize};

use crate::{alert, error::Error, reconciler::Reconciler};

#[derive(Debug, Deserialize, Clone)]
pub struct WebhookReceiverSettings {
	pub bind_address: IpAddr,
	pub port: u16,
}

impl Default for WebhookReceiverSettings {
	fn default() -> Self {
		Self { bind_address: IpAddr::V4(Ipv4Addr::UNSPECIFIED), port: 9877 }
	}
}

impl WebhookReceiverSettings {
	pub fn to_socket_addr(&self) -> SocketAddr {
		SocketAddr::new(self.bind_address, self.port)
	}
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
/// body of every webhook response
pub struct JsonResponse {
	pub status: u16,
	pub message: String,
}

impl JsonResponse {
	fn new(status: StatusCode, message: String) -> (StatusCode, Json<Self>) {
		(status, Json(Self { status: status.as_u16(), message }))
	}
}

struct State {
	reconciler: Reconciler,
	/// received notifications by outcome
	metric: IntCounterVec,
}

impl State {
	fn new(reconciler: Reconciler, registry: &Registry) -> Result<Self> {
		use prometheus::opts;

		let metric = IntCounterVec::new(
			opts!("received_notifications", "total number of received alert group notifications")
				.namespace("howler")
				.subsystem("alertmanager_webhook"),
			&["outcome"],
		)?;
		registry.register(Box::new(metric.clone()))?;

		Ok(Self { reconciler, metric })
	}
}

async fn alertmanager_receiver(
	Extension(state): Extension<Arc<State>>,
	alert: Result<Json<alert::Data>, JsonRejection>,
) -> (StatusCode, Json<JsonResponse>) {
	let State { reconciler, metric } = &*state;

	let res = match alert {
		Ok(Json(data)) => reconciler.reconcile(&data).await,
		Err(rejection) => Err(Error::MalformedInput(rejection.to_string())),
	};

	match res {
		Ok(reconciled) => {
			tracing::debug!("reconciled incident {}", reconciled.incident().number);
			metric.with_label_values(&["success"]).inc();
			JsonResponse::new(StatusCode::OK, String::from("Success"))
		}
		Err(err @ Error::MalformedInput(_)) => {
			tracing::warn!("error reading request body: {err}");
			metric.with_label_values(&["malformed"]).inc();
			JsonResponse::new(err.status_code(), err.to_string())
		}
		Err(err) => {
			tracing::error!("error managing incident from alert: {err}");
			metric.with_label_values(&["tracker_error"]).inc();
			JsonResponse::new(err.status_code(), err.to_string())
		}
	}
}

/// `POST /webhook` handing notifications to the reconciler
pub fn router(reconciler: Reconciler, registry: &Registry) -> Result<Router> {
	let state = Arc::new(
		State::new(reconciler, registry).context("failed to register prometheus meters")?,
	);

	Ok(Router::new().route("/webhook", post(alertmanager_receiver)).layer(Extension(state)))
}

/// serve `app` until ctrl-c is received
pub async fn run_receiver(settings: &WebhookReceiverSettings, app: Router) -> Result<()> {
	let addr = settings.to_socket_addr();
	tracing::info!("listening on: {addr}");

	axum::Server::bind(&addr)
		.serve(app.into_make_service())
		.with_graceful_shutdown(shutdown_signal())
		.await
		.context("alertmanager webhook receiver crashed")?;

	Ok(())
}

async fn shutdown_signal() {
	if let Err(err) = tokio::signal::ctrl_c().await {
		tracing::error!("failed to listen for ctrl-c: {err}");
		std::future::pending::<()>().await;
	}
	tracing::info!("shutting down");
}
