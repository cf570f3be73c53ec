//! prometheus alertmanager receiver that keeps one ServiceNow incident per
//! alert group
//!
//! Features:
//! - derives a stable group key from the group labels and stores it on the
//!   incident
//! - creates an incident for unknown groups, updates the existing one otherwise
//! - optionally serializes notifications of the same group

pub mod alert;
pub mod alertmanager_webhook_receiver;
pub mod error;
pub mod group_key;
pub mod incident;
pub mod key_lock;
pub mod log;
pub mod reconciler;
pub mod settings;
pub mod telemetry_endpoint;
pub mod tracker;
