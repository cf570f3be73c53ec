//! Builds the incident fields written to the tracker from an alert group.
//!
//! The text layout matches what existing incidents already contain, so
//! changing any of the prefixes or separators below breaks the history of
//! updated incidents.

use chrono::{DateTime, Timelike, Utc};
use serde::Serialize;

use crate::{
	alert::{Alert, Data, LabelSet},
	group_key::{derive_group_key, sorted_pairs},
	settings::DefaultIncidentSettings,
};

/// first line of the comment log
pub const COMMENTS_HEADER: &str = "Alerts list:";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
/// fields of an incident created or updated for an alert group
pub struct IncidentFields {
	pub short_description: String,
	pub description: String,
	pub comments: String,
	pub assignment_group: String,
	pub caller_id: String,
	pub impact: String,
	pub urgency: String,
	/// written under the configured correlation field, see
	/// [ServiceNowSettings](crate::tracker::servicenow::ServiceNowSettings)
	#[serde(skip)]
	pub group_key: String,
}

/// Maps an alert group notification to the fields of its incident.
///
/// Only the payload and the static defaults are read, calling this twice with
/// the same arguments yields equal fields.
pub fn map_to_incident_fields(data: &Data, defaults: &DefaultIncidentSettings) -> IncidentFields {
	let group_key = derive_group_key(&data.group_labels);

	let short_description = format!("[{}] {group_key}", data.status);

	let description = [
		format!("Group key: {group_key}"),
		format!("AlertManager receiver: {}", data.receiver),
		format!("AlertManager source URL: {}", data.external_url),
	]
	.join("\n");

	let mut comments = String::from(COMMENTS_HEADER);
	for alert in data.alerts.iter() {
		comments.push_str("\n\n");
		comments.push_str(&render_alert(alert));
	}

	IncidentFields {
		short_description,
		description,
		comments,
		assignment_group: defaults.assignment_group.clone(),
		caller_id: defaults.caller_id.clone(),
		impact: defaults.impact.to_string(),
		urgency: defaults.urgency.to_string(),
		group_key,
	}
}

/// status line followed by sorted labels and sorted annotations
fn render_alert(alert: &Alert) -> String {
	let mut lines = vec![format!("[{}] {}", alert.status, format_timestamp(&alert.starts_at))];
	lines.extend(render_pairs(&alert.labels));
	lines.extend(render_pairs(&alert.annotations));
	lines.join("\n")
}

fn render_pairs(pairs: &LabelSet) -> impl Iterator<Item = String> + '_ {
	sorted_pairs(pairs).into_iter().map(|(name, value)| format!("- {name}: {value}"))
}

/// `2022-05-10 12:34:56.789 +0000 UTC`, the fraction is left out when zero and
/// trailing zeros are trimmed
pub fn format_timestamp(ts: &DateTime<Utc>) -> String {
	let seconds = ts.format("%Y-%m-%d %H:%M:%S");
	match ts.nanosecond() % 1_000_000_000 {
		0 => format!("{seconds} +0000 UTC"),
		nanos => {
			let fraction = format!("{nanos:09}");
			format!("{seconds}.{} +0000 UTC", fraction.trim_end_matches('0'))
		}
	}
}
