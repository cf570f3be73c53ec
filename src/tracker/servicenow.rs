//! [IncidentTracker] backed by the ServiceNow table api
use std::{collections::HashMap, time::Duration};

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use prometheus::{HistogramVec, IntCounterVec, Registry};
use reqwest::{header::ACCEPT, Method, RequestBuilder};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_with::{serde_as, DurationSeconds};
use url::Url;

use super::{ExistingIncidentRef, IncidentTracker, TrackerError};
use crate::incident::IncidentFields;

/// path of the incident table below the instance url
const INCIDENT_TABLE: &str = "api/now/v2/table/incident";

/// body fields written from [IncidentFields], the group key field must not
/// shadow one of them
const INCIDENT_BODY_FIELDS: [&str; 7] = [
	"short_description",
	"description",
	"comments",
	"assignment_group",
	"caller_id",
	"impact",
	"urgency",
];

fn default_timeout() -> Duration {
	Duration::from_secs(10)
}

#[serde_as]
#[derive(Debug, Clone, Deserialize)]
/// connection to the ServiceNow instance
pub struct ServiceNowSettings {
	/// `<instance_name>.service-now.com`
	pub instance_name: String,
	/// overrides the url derived from `instance_name`
	#[serde(default)]
	pub base_url: Option<Url>,
	pub user_name: String,
	pub password: String,
	/// incident field holding the group key
	pub incident_group_key_field: String,
	/// timeout of a single http request
	#[serde_as(as = "DurationSeconds<f64>")]
	#[serde(default = "default_timeout")]
	pub timeout: Duration,
}

impl ServiceNowSettings {
	/// url of the ServiceNow instance
	pub fn instance_url(&self) -> Result<Url, url::ParseError> {
		match &self.base_url {
			Some(url) => Ok(url.clone()),
			None => Url::parse(&format!("https://{}.service-now.com", self.instance_name)),
		}
	}
}

#[derive(Debug, Clone)]
/// prometheus meters for the ServiceNow http client
struct Metrics {
	/// total number of http requests
	requests: IntCounterVec,
	/// total number of failed http requests
	requests_failed: IntCounterVec,
	/// time spent by http requests
	request_duration: HistogramVec,
}

impl Metrics {
	/// construct and register prometheus meters
	fn new(registry: &Registry) -> Result<Self, prometheus::Error> {
		use prometheus::{exponential_buckets, histogram_opts, opts};

		let requests = IntCounterVec::new(
			opts!("requests_total", "total number of http requests")
				.namespace("howler")
				.subsystem("servicenow_client"),
			&["method"],
		)?;

		let requests_failed = IntCounterVec::new(
			opts!("requests_failed", "number of failed http requests")
				.namespace("howler")
				.subsystem("servicenow_client"),
			&["method", "status_code"],
		)?;

		let request_duration = HistogramVec::new(
			histogram_opts!(
				"request_duration_seconds",
				"total time of a http request in seconds",
				exponential_buckets(0.01, 2., 12)?
			)
			.namespace("howler")
			.subsystem("servicenow_client"),
			&["method"],
		)?;

		registry.register(Box::new(requests.clone()))?;
		registry.register(Box::new(requests_failed.clone()))?;
		registry.register(Box::new(request_duration.clone()))?;

		Ok(Self { requests, requests_failed, request_duration })
	}
}

#[derive(Deserialize)]
/// envelope of every table api response
struct TableResponse<T> {
	result: T,
}

#[derive(Serialize)]
/// request body of create and update calls, the group key is stored under the
/// configured field name
struct IncidentPayload<'a> {
	#[serde(flatten)]
	fields: &'a IncidentFields,
	#[serde(flatten)]
	group_key: HashMap<&'a str, &'a str>,
}

#[derive(Debug, Clone)]
/// ServiceNow table api client
pub struct ServiceNow {
	/// http client
	client: reqwest::Client,
	/// url of the incident table
	table_url: Url,
	user_name: String,
	password: String,
	/// incident field holding the group key
	group_key_field: String,
	/// prometheus meters for http requests
	metrics: Metrics,
}

impl ServiceNow {
	/// construct client and register its meters
	pub fn new(settings: &ServiceNowSettings, registry: &Registry) -> Result<Self> {
		let group_key_field = settings.incident_group_key_field.as_str();
		if group_key_field.is_empty() || INCIDENT_BODY_FIELDS.contains(&group_key_field) {
			bail!("incident_group_key_field {group_key_field:?} must name a field not written from the alert");
		}

		let mut table_url = settings.instance_url().context("invalid ServiceNow instance url")?;
		// keep a path prefix of base_url, Url::join would replace its last segment
		if !table_url.path().ends_with('/') {
			let path = format!("{}/", table_url.path());
			table_url.set_path(&path);
		}
		let table_url = table_url.join(INCIDENT_TABLE).context("invalid ServiceNow table url")?;

		Ok(Self {
			client: reqwest::Client::builder()
				.timeout(settings.timeout)
				.build()
				.context("failed to build reqwest client")?,
			table_url,
			user_name: settings.user_name.clone(),
			password: settings.password.clone(),
			group_key_field: settings.incident_group_key_field.clone(),
			metrics: Metrics::new(registry).context("failed to register prometheus meters")?,
		})
	}

	/// request against the incident table, `sys_id` addresses a single record
	fn request(&self, method: Method, sys_id: Option<&str>) -> Result<RequestBuilder, TrackerError> {
		let mut url = self.table_url.clone();
		if let Some(sys_id) = sys_id {
			url.path_segments_mut()
				.map_err(|_| url::ParseError::RelativeUrlWithCannotBeABaseBase)?
				.push(sys_id);
		}

		Ok(self
			.client
			.request(method, url)
			.basic_auth(&self.user_name, Some(&self.password))
			.header(ACCEPT, "application/json"))
	}

	/// send request, record meters and decode the `result` of the response
	async fn send<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T, TrackerError> {
		let request = request.build()?;
		let method = request.method().as_str().to_owned();

		let _timer = self.metrics.request_duration.with_label_values(&[&method]).start_timer();
		self.metrics.requests.with_label_values(&[&method]).inc();

		let response = self.client.execute(request).await?;
		let status = response.status();

		if !status.is_success() {
			self.metrics.requests_failed.with_label_values(&[&method, status.as_str()]).inc();
			let body = response.text().await.unwrap_or_default();
			return Err(TrackerError::Status { status: status.as_u16(), body });
		}

		let body = response.bytes().await?;
		let TableResponse { result } = serde_json::from_slice(&body)?;

		Ok(result)
	}

	fn payload<'a>(&'a self, fields: &'a IncidentFields) -> IncidentPayload<'a> {
		IncidentPayload {
			fields,
			group_key: HashMap::from([(self.group_key_field.as_str(), fields.group_key.as_str())]),
		}
	}
}

#[async_trait]
impl IncidentTracker for ServiceNow {
	async fn query(
		&self,
		filters: &HashMap<String, String>,
	) -> Result<Vec<ExistingIncidentRef>, TrackerError> {
		let request = self.request(Method::GET, None)?.query(filters);
		self.send(request).await
	}

	async fn create(&self, fields: &IncidentFields) -> Result<ExistingIncidentRef, TrackerError> {
		let request = self.request(Method::POST, None)?.json(&self.payload(fields));
		self.send(request).await
	}

	async fn update(
		&self,
		fields: &IncidentFields,
		sys_id: &str,
	) -> Result<ExistingIncidentRef, TrackerError> {
		let request = self.request(Method::PUT, Some(sys_id))?.json(&self.payload(fields));
		self.send(request).await
	}
}
