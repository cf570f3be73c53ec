//! data structures for deserializing incoming alert group notifications
use std::fmt;

use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// label or annotation pairs, kept in the order alertmanager sent them
pub type LabelSet = IndexMap<String, String>;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
/// state of an alert group or of a single alert
pub enum Status {
	/// at least one alert is active
	Firing,
	/// all alerts stopped firing
	Resolved,
}

impl Status {
	/// the name alertmanager uses on the wire
	pub fn as_str(&self) -> &'static str {
		match self {
			Status::Firing => "firing",
			Status::Resolved => "resolved",
		}
	}
}

impl fmt::Display for Status {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
/// alert group notification received by the alertmanager webhook receiver
pub struct Data {
	/// webhook payload version, "4" for current alertmanager releases
	#[serde(default)]
	pub version: String,
	/// alertmanager's own group identifier, not used for correlation
	#[serde(default)]
	pub group_key: String,
	/// number of alerts alertmanager dropped because of `max_alerts`
	#[serde(default)]
	pub truncated_alerts: u64,

	pub receiver: String,
	pub status: Status,
	pub alerts: Vec<Alert>,
	pub group_labels: LabelSet,
	#[serde(default)]
	pub common_labels: LabelSet,
	#[serde(default)]
	pub common_annotations: LabelSet,
	#[serde(default, rename = "externalURL")]
	pub external_url: String,
}

#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
/// a single alert of a group
pub struct Alert {
	pub status: Status,
	#[serde(default)]
	pub labels: LabelSet,
	#[serde(default)]
	pub annotations: LabelSet,
	pub starts_at: DateTime<Utc>,
	#[serde(default)]
	pub ends_at: Option<DateTime<Utc>>,
	#[serde(default, rename = "generatorURL")]
	pub generator_url: String,
	#[serde(default)]
	pub fingerprint: String,
}
