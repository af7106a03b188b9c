use serde_json::json;

use hs_domain::transcript::Line;
use hs_service::{Error, SyntheticCase, synthetic};

fn case(name: &str, profile: &str) -> SyntheticCase {
	SyntheticCase {
		name: name.to_string(),
		category: "respiratory".to_string(),
		batch_identifier: "run-1_batch_01".to_string(),
		profile: profile.to_string(),
		limited_chart: json!({ "demographics": "45 year old" }),
		transcript: vec![Line::new("Clinician", "What brings you in?")],
	}
}

#[tokio::test]
async fn saving_a_case_twice_keeps_the_first() {
	let dir = tempfile::tempdir().expect("Failed to create temp dir.");

	synthetic::save_case_files(dir.path(), &case("Ana", "first profile"))
		.await
		.expect("Failed to save the first case.");

	let err = synthetic::save_case_files(dir.path(), &case("Ana", "second profile"))
		.await
		.expect_err("Expected the name to be taken.");

	assert!(matches!(err, Error::InvalidRequest { .. }), "Unexpected error: {err}");

	let raw = std::fs::read_to_string(dir.path().join("Ana/case.json"))
		.expect("Case file must exist.");
	let stored: serde_json::Value = serde_json::from_str(&raw).expect("Case file must be JSON.");

	assert_eq!(stored["profile"], "first profile");
	assert_eq!(stored["batch_identifier"], "run-1_batch_01");
}
