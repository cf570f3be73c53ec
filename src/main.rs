use std::sync::Arc;

use anyhow::{Context, Result};
use howler_servicenow::{
	alertmanager_webhook_receiver, log, reconciler::Reconciler, settings::Settings,
	telemetry_endpoint, tracker::servicenow::ServiceNow,
};
use prometheus::Registry;

/// exit the complete program if one thread panics
fn setup_panic_handler() {
	let default_panic = std::panic::take_hook();
	std::panic::set_hook(Box::new(move |info| {
		default_panic(info);
		std::process::exit(1);
	}));
}

/// the entry point of the program
#[tokio::main]
pub async fn main() -> Result<()> {
	setup_panic_handler();

	let settings = Settings::load().context("failed to load config and command line arguments")?;

	log::setup_logging(&settings.log).context("could not setup logging")?;

	let registry = Registry::new();

	let tracker = ServiceNow::new(&settings.service_now, &registry)
		.context("failed to create ServiceNow client")?;
	tracing::info!("ServiceNow config loaded for instance {}", settings.service_now.instance_name);

	let reconciler = Reconciler::new(
		Arc::new(tracker),
		settings.service_now.incident_group_key_field.clone(),
		settings.default_incident.clone(),
		&settings.reconciler,
		&registry,
	)
	.context("failed to construct reconciler")?;

	let app = alertmanager_webhook_receiver::router(reconciler, &registry)?
		.merge(telemetry_endpoint::router(registry));

	tracing::info!("starting {} {}", clap::crate_name!(), clap::crate_version!());

	alertmanager_webhook_receiver::run_receiver(&settings.webhook_receiver, app).await
}
