//! Reconciles alert groups with incidents.
//!
//! Every notification looks up the incidents carrying its group key. Without a
//! match a new incident is opened, otherwise the first match is updated. No
//! state is kept between notifications, the tracker is the only store.

use std::{collections::HashMap, sync::Arc};

use prometheus::{IntCounter, IntCounterVec, Registry};
use serde::Deserialize;

use crate::{
	alert,
	error::{Error, WriteAction},
	group_key::derive_group_key,
	incident::map_to_incident_fields,
	key_lock::GroupKeyLocks,
	settings::DefaultIncidentSettings,
	tracker::{ExistingIncidentRef, IncidentTracker},
};

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ReconcilerSettings {
	/// hold a lock per group key from lookup until the write finished, so
	/// concurrent notifications of one group can't both create an incident
	#[serde(default)]
	pub serialize_per_group_key: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
/// what reconciling an alert group did
pub enum Reconciled {
	Created(ExistingIncidentRef),
	Updated(ExistingIncidentRef),
}

impl Reconciled {
	pub fn incident(&self) -> &ExistingIncidentRef {
		match self {
			Reconciled::Created(incident) | Reconciled::Updated(incident) => incident,
		}
	}
}

#[derive(Debug, Clone)]
/// prometheus meters for the reconciler
struct ReconcilerMetrics {
	/// incidents written, by action
	incidents: IntCounterVec,
	/// lookups returning more than one incident
	duplicates: IntCounter,
	/// failed reconciliations, by stage
	errors: IntCounterVec,
}

impl ReconcilerMetrics {
	fn new(registry: &Registry) -> Result<Self, prometheus::Error> {
		use prometheus::opts;

		let incidents = IntCounterVec::new(
			opts!("incidents_total", "incidents created or updated")
				.namespace("howler")
				.subsystem("reconciler"),
			&["action"],
		)?;

		let duplicates = IntCounter::with_opts(
			opts!("duplicate_incidents_total", "lookups that found more than one incident")
				.namespace("howler")
				.subsystem("reconciler"),
		)?;

		let errors = IntCounterVec::new(
			opts!("errors_total", "failed reconciliations")
				.namespace("howler")
				.subsystem("reconciler"),
			&["stage"],
		)?;

		registry.register(Box::new(incidents.clone()))?;
		registry.register(Box::new(duplicates.clone()))?;
		registry.register(Box::new(errors.clone()))?;

		Ok(Self { incidents, duplicates, errors })
	}
}

/// Decides between creating and updating the incident of an alert group
pub struct Reconciler {
	tracker: Arc<dyn IncidentTracker>,
	/// incident field holding the group key
	group_key_field: String,
	defaults: DefaultIncidentSettings,
	/// only set if reconciliation is serialized per group key
	locks: Option<GroupKeyLocks>,
	metrics: ReconcilerMetrics,
}

impl Reconciler {
	pub fn new(
		tracker: Arc<dyn IncidentTracker>,
		group_key_field: String,
		defaults: DefaultIncidentSettings,
		settings: &ReconcilerSettings,
		registry: &Registry,
	) -> Result<Self, prometheus::Error> {
		Ok(Self {
			tracker,
			group_key_field,
			defaults,
			locks: settings.serialize_per_group_key.then(GroupKeyLocks::new),
			metrics: ReconcilerMetrics::new(registry)?,
		})
	}

	/// Creates an incident for the alert group or updates the existing one.
	///
	/// Fails without writing anything if the lookup fails. Errors of the
	/// tracker are returned as they are, nothing is retried.
	pub async fn reconcile(&self, data: &alert::Data) -> Result<Reconciled, Error> {
		tracing::info!(
			status = %data.status,
			group_labels = ?data.group_labels,
			common_labels = ?data.common_labels,
			common_annotations = ?data.common_annotations,
			"received alert group"
		);

		let group_key = derive_group_key(&data.group_labels);

		let _guard = match &self.locks {
			Some(locks) => Some(locks.lock(&group_key).await),
			None => None,
		};

		let filters = HashMap::from([(self.group_key_field.clone(), group_key.clone())]);

		let incidents = match self.tracker.query(&filters).await {
			Ok(incidents) => incidents,
			Err(source) => {
				self.metrics.errors.with_label_values(&["query"]).inc();
				return Err(Error::TrackerQuery { group_key, source });
			}
		};

		let fields = map_to_incident_fields(data, &self.defaults);

		match incidents.first() {
			None => {
				tracing::info!("found no existing incident for alert group key: {group_key}");

				let incident = self.tracker.create(&fields).await.map_err(|source| {
					self.metrics.errors.with_label_values(&["create"]).inc();
					Error::TrackerWrite {
						action: WriteAction::Create,
						group_key: group_key.clone(),
						source,
					}
				})?;

				tracing::info!("created incident {} for alert group key: {group_key}", incident.number);
				self.metrics.incidents.with_label_values(&["created"]).inc();

				Ok(Reconciled::Created(incident))
			}
			Some(existing) => {
				if incidents.len() > 1 {
					tracing::warn!(
						"found {} existing incidents for alert group key: {group_key}. will use first one ({})",
						incidents.len(),
						existing.number
					);
					self.metrics.duplicates.inc();
				}

				tracing::info!(
					"found existing incident ({}) for alert group key: {group_key}",
					existing.number
				);

				let incident =
					self.tracker.update(&fields, &existing.sys_id).await.map_err(|source| {
						self.metrics.errors.with_label_values(&["update"]).inc();
						Error::TrackerWrite {
							action: WriteAction::Update,
							group_key: group_key.clone(),
							source,
						}
					})?;

				self.metrics.incidents.with_label_values(&["updated"]).inc();

				Ok(Reconciled::Updated(incident))
			}
		}
	}
}
