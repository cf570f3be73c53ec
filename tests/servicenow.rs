use std::{
	collections::HashMap,
	time::{Duration, Instant},
};

use howler_servicenow::{
	incident::IncidentFields,
	tracker::{
		servicenow::{ServiceNow, ServiceNowSettings},
		ExistingIncidentRef, IncidentTracker, TrackerError,
	},
};
use prometheus::Registry;
use serde_json::json;
use url::Url;
use wiremock::{
	matchers::{basic_auth, body_partial_json, header, method, path, query_param},
	Mock, MockServer, ResponseTemplate,
};

const TABLE: &str = "/api/now/v2/table/incident";

fn client(server: &MockServer) -> ServiceNow {
	client_with_timeout(server, Duration::from_secs(5))
}

fn client_with_timeout(server: &MockServer, timeout: Duration) -> ServiceNow {
	let settings = ServiceNowSettings {
		instance_name: "acme".to_owned(),
		base_url: Some(Url::parse(&server.uri()).unwrap()),
		user_name: "alertmanager".to_owned(),
		password: "secret".to_owned(),
		incident_group_key_field: "u_other_reference_1".to_owned(),
		timeout,
	};

	ServiceNow::new(&settings, &Registry::new()).unwrap()
}

fn fields() -> IncidentFields {
	IncidentFields {
		short_description: "[firing] alertname: HighCPU, job: node".to_owned(),
		description: "Group key: alertname: HighCPU, job: node".to_owned(),
		comments: "Alerts list:".to_owned(),
		assignment_group: "ops".to_owned(),
		caller_id: "alertmanager".to_owned(),
		impact: "2".to_owned(),
		urgency: "2".to_owned(),
		group_key: "alertname: HighCPU, job: node".to_owned(),
	}
}

#[tokio::test]
async fn query_filters_by_group_key_field() {
	let server = MockServer::start().await;

	Mock::given(method("GET"))
		.and(path(TABLE))
		.and(query_param("u_other_reference_1", "alertname: HighCPU, job: node"))
		.and(basic_auth("alertmanager", "secret"))
		.and(header("accept", "application/json"))
		.respond_with(ResponseTemplate::new(200).set_body_json(json!({
			"result": [
				{"sys_id": "abc123", "number": "INC0010001", "state": "1"},
				{"sys_id": "def456", "number": "INC0010002"}
			]
		})))
		.expect(1)
		.mount(&server)
		.await;

	let filters = HashMap::from([(
		"u_other_reference_1".to_owned(),
		"alertname: HighCPU, job: node".to_owned(),
	)]);
	let incidents = client(&server).query(&filters).await.unwrap();

	assert_eq!(
		incidents,
		vec![
			ExistingIncidentRef { sys_id: "abc123".to_owned(), number: "INC0010001".to_owned() },
			ExistingIncidentRef { sys_id: "def456".to_owned(), number: "INC0010002".to_owned() },
		]
	);
}

#[tokio::test]
async fn create_posts_fields_with_group_key() {
	let server = MockServer::start().await;

	Mock::given(method("POST"))
		.and(path(TABLE))
		.and(body_partial_json(json!({
			"short_description": "[firing] alertname: HighCPU, job: node",
			"assignment_group": "ops",
			"caller_id": "alertmanager",
			"impact": "2",
			"u_other_reference_1": "alertname: HighCPU, job: node"
		})))
		.respond_with(
			ResponseTemplate::new(201)
				.set_body_json(json!({"result": {"sys_id": "new1", "number": "INC0010003"}})),
		)
		.expect(1)
		.mount(&server)
		.await;

	let incident = client(&server).create(&fields()).await.unwrap();

	assert_eq!(incident.sys_id, "new1");
	assert_eq!(incident.number, "INC0010003");
}

#[tokio::test]
async fn update_puts_to_sys_id() {
	let server = MockServer::start().await;

	Mock::given(method("PUT"))
		.and(path(format!("{TABLE}/abc123")))
		.and(body_partial_json(json!({"comments": "Alerts list:"})))
		.respond_with(
			ResponseTemplate::new(200)
				.set_body_json(json!({"result": {"sys_id": "abc123", "number": "INC0010001"}})),
		)
		.expect(1)
		.mount(&server)
		.await;

	let incident = client(&server).update(&fields(), "abc123").await.unwrap();

	assert_eq!(incident.sys_id, "abc123");
}

#[tokio::test]
async fn error_status_is_returned() {
	let server = MockServer::start().await;

	Mock::given(method("GET"))
		.and(path(TABLE))
		.respond_with(ResponseTemplate::new(401).set_body_string("User Not Authenticated"))
		.expect(1)
		.mount(&server)
		.await;

	let err = client(&server).query(&HashMap::new()).await.unwrap_err();

	match err {
		TrackerError::Status { status, body } => {
			assert_eq!(status, 401);
			assert_eq!(body, "User Not Authenticated");
		}
		err => panic!("unexpected error {err:?}"),
	}
}

#[tokio::test]
async fn unexpected_body_is_a_decode_error() {
	let server = MockServer::start().await;

	Mock::given(method("POST"))
		.and(path(TABLE))
		.respond_with(ResponseTemplate::new(201).set_body_string("<html>login</html>"))
		.mount(&server)
		.await;

	let err = client(&server).create(&fields()).await.unwrap_err();

	assert!(matches!(err, TrackerError::Decode(_)));
}

#[tokio::test]
async fn slow_tracker_times_out() {
	let server = MockServer::start().await;

	Mock::given(method("GET"))
		.and(path(TABLE))
		.respond_with(
			ResponseTemplate::new(200)
				.set_body_json(json!({"result": []}))
				.set_delay(Duration::from_secs(5)),
		)
		.mount(&server)
		.await;

	let started = Instant::now();
	let err = client_with_timeout(&server, Duration::from_millis(200))
		.query(&HashMap::new())
		.await
		.unwrap_err();

	match err {
		TrackerError::Http(err) => assert!(err.is_timeout()),
		err => panic!("unexpected error {err:?}"),
	}
	assert!(started.elapsed() < Duration::from_secs(2));
}
