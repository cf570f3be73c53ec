//! boundary to the incident tracker

use std::collections::HashMap;

use async_trait::async_trait;
use serde::Deserialize;
use thiserror::Error;

use crate::incident::IncidentFields;

pub mod servicenow;

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
/// reference to an incident stored in the tracker
pub struct ExistingIncidentRef {
	/// opaque identifier used to address updates
	pub sys_id: String,
	/// human readable incident number
	#[serde(default)]
	pub number: String,
}

/// Error returned by an [IncidentTracker]
#[derive(Error, Debug)]
pub enum TrackerError {
	/// the request could not be sent or the response could not be read
	#[error("request to incident tracker failed: {0}")]
	Http(#[from] reqwest::Error),
	/// the tracker answered with a non success status code
	#[error("incident tracker responded with status {status}: {body}")]
	Status { status: u16, body: String },
	/// the response body is not what we expected
	#[error("unexpected incident tracker response: {0}")]
	Decode(#[from] serde_json::Error),
	/// the configured tracker url can't be used to build a request url
	#[error("invalid incident tracker url: {0}")]
	Url(#[from] url::ParseError),
}

/// Query, create and update incidents. Implementations don't retry failed
/// requests.
#[async_trait]
pub trait IncidentTracker: Send + Sync {
	/// all incidents whose fields equal the given values, in the order the
	/// tracker returned them
	async fn query(
		&self,
		filters: &HashMap<String, String>,
	) -> Result<Vec<ExistingIncidentRef>, TrackerError>;

	/// open a new incident
	async fn create(&self, fields: &IncidentFields) -> Result<ExistingIncidentRef, TrackerError>;

	/// overwrite the fields of the incident identified by `sys_id`
	async fn update(
		&self,
		fields: &IncidentFields,
		sys_id: &str,
	) -> Result<ExistingIncidentRef, TrackerError>;
}
