//! errors surfaced to the alertmanager webhook receiver
use std::fmt;

use axum::http::StatusCode;
use thiserror::Error;

use crate::tracker::TrackerError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
/// write issued to the incident tracker
pub enum WriteAction {
	Create,
	Update,
}

impl fmt::Display for WriteAction {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			WriteAction::Create => f.write_str("create"),
			WriteAction::Update => f.write_str("update"),
		}
	}
}

#[derive(Error, Debug)]
pub enum Error {
	/// the request body is not an alert group notification
	#[error("malformed alert group notification: {0}")]
	MalformedInput(String),
	/// looking up incidents for the group key failed, nothing was written
	#[error("failed to look up incidents for group key \"{group_key}\": {source}")]
	TrackerQuery { group_key: String, source: TrackerError },
	/// creating or updating the incident failed
	#[error("failed to {action} incident for group key \"{group_key}\": {source}")]
	TrackerWrite { action: WriteAction, group_key: String, source: TrackerError },
}

impl Error {
	/// status code the webhook receiver answers with
	pub fn status_code(&self) -> StatusCode {
		match self {
			Error::MalformedInput(_) => StatusCode::BAD_REQUEST,
			Error::TrackerQuery { .. } | Error::TrackerWrite { .. } => {
				StatusCode::INTERNAL_SERVER_ERROR
			}
		}
	}
}
