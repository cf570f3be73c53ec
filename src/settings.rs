use std::net::SocketAddr;

use anyhow::{Context, Result};
use clap::{Arg, Command};
use config::Config;
use serde::Deserialize;

use crate::{
	alertmanager_webhook_receiver::WebhookReceiverSettings, log::LogSettings,
	reconciler::ReconcilerSettings, tracker::servicenow::ServiceNowSettings,
};

/// prefix of environment variables overriding config file values, e.g.
/// `HOWLER__SERVICE_NOW__PASSWORD`
const ENV_PREFIX: &str = "HOWLER";

#[derive(Debug, Clone, Deserialize)]
/// fields every created or updated incident gets regardless of the alert
pub struct DefaultIncidentSettings {
	pub assignment_group: String,
	/// defaults to the ServiceNow user name
	#[serde(default)]
	pub caller_id: String,
	pub impact: u8,
	pub urgency: u8,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
	#[serde(default)]
	pub log: LogSettings,
	#[serde(default)]
	pub webhook_receiver: WebhookReceiverSettings,
	#[serde(default)]
	pub reconciler: ReconcilerSettings,
	pub service_now: ServiceNowSettings,
	pub default_incident: DefaultIncidentSettings,
}

impl Settings {
	/// parse command line arguments and load the config file they point to
	pub fn load() -> Result<Self> {
		let opts = Command::new(clap::crate_name!())
			.version(clap::crate_version!())
			.about(clap::crate_description!())
			.args([
				Arg::new("config")
					.help("path of config file")
					.takes_value(true)
					.short('c')
					.long("config")
					.default_value("./config.yaml"),
				Arg::new("level")
					.help("log level")
					.possible_values(["error", "warn", "info", "debug", "trace"])
					.ignore_case(true)
					.takes_value(true)
					.long("log"),
				Arg::new("listen")
					.help("address to listen on for webhooks and metric scrapes")
					.value_name("ADDR:PORT")
					.takes_value(true)
					.long("listen"),
			])
			.get_matches();

		let config_path = opts.value_of("config").context("no config path given")?;

		let mut settings = Self::from_source(config::File::with_name(config_path))?;

		if let Some(level) = opts.value_of("level") {
			settings.log.level = level.to_string();
		}

		if let Some(listen) = opts.value_of("listen") {
			let addr: SocketAddr = listen.parse().context("invalid listen address")?;
			settings.webhook_receiver.bind_address = addr.ip();
			settings.webhook_receiver.port = addr.port();
		}

		Ok(settings)
	}

	/// settings from a config source overlaid by the environment
	pub fn from_source<S>(source: S) -> Result<Self>
	where
		S: config::Source + Send + Sync + 'static,
	{
		let conf = Config::builder()
			.add_source(source)
			.add_source(config::Environment::with_prefix(ENV_PREFIX).separator("__"))
			.build()
			.context("can't load config")?;

		let mut settings: Settings = conf.try_deserialize().context("can't load config")?;

		if settings.default_incident.caller_id.is_empty() {
			settings.default_incident.caller_id = settings.service_now.user_name.clone();
		}

		Ok(settings)
	}
}
