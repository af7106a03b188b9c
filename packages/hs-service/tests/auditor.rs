mod common;

use serde_json::{Map, Value, json};

use hs_domain::{
	IGNORED_KEY_VALUE, cycle::Label, instruction::InstructionWithParameters, transcript::Line,
};
use hs_service::{AuditStore, Auditor, Error, FileAuditStore};

use common::{instruction, with_command};

async fn file_auditor(root: &std::path::Path, case: &str, cycle: u32) -> Auditor {
	let store = FileAuditStore::open(root, case).await.expect("Failed to open file store.");

	Auditor::new(Box::new(store), case, cycle)
}

fn read_note(root: &std::path::Path, case: &str) -> Value {
	let raw = std::fs::read_to_string(root.join(case).join("generated_note.json"))
		.expect("Note file must exist.");

	serde_json::from_str(&raw).expect("Note file must be JSON.")
}

fn questionnaire_information() -> String {
	json!({
		"name": "Review of systems",
		"dbid": 7,
		"questions": [
			{
				"dbid": 11,
				"label": "Symptoms",
				"type": "checkbox",
				"responses": [
					{ "dbid": 1, "value": "Fever", "selected": false },
					{ "dbid": 2, "value": "Cough", "selected": false },
					{ "dbid": 3, "value": "Fatigue", "selected": false }
				]
			}
		]
	})
	.to_string()
}

#[tokio::test]
async fn cycle_watermark_only_moves_forward() {
	let dir = tempfile::tempdir().expect("Failed to create temp dir.");
	let mut auditor = file_auditor(dir.path(), "watermark", 0).await;

	assert_eq!(auditor.cycle(), 1);

	auditor.set_cycle(3);
	auditor.set_cycle(1);

	assert_eq!(auditor.cycle(), 3);
	assert_eq!(auditor.cycle_key(), "cycle_003");
}

#[tokio::test]
async fn repeated_parameter_writes_append_within_the_cycle() {
	let dir = tempfile::tempdir().expect("Failed to create temp dir.");
	let auditor = file_auditor(dir.path(), "merge", 2).await;
	let first = InstructionWithParameters {
		instruction: instruction("A", 0, "Allergy", "penicillin"),
		parameters: json!({ "keywords": "penicillin" }).as_object().cloned().unwrap_or_default(),
	};
	let second = InstructionWithParameters {
		instruction: instruction("B", 1, "Medication", "ibuprofen"),
		parameters: json!({ "keywords": "ibuprofen" }).as_object().cloned().unwrap_or_default(),
	};

	assert!(auditor.computed_parameters(&[first]).await.expect("First write failed."));
	assert!(auditor.computed_parameters(&[second]).await.expect("Second write failed."));

	let document = auditor
		.store()
		.get_json(Label::InstructionToParameters)
		.await
		.expect("Failed to read document.");
	let bucket = &document["cycle_002"];
	let uuids = bucket["instructions"]
		.as_array()
		.expect("Instructions must be an array.")
		.iter()
		.map(|item| item["uuid"].as_str().unwrap_or_default().to_string())
		.collect::<Vec<_>>();

	assert_eq!(uuids, vec!["A".to_string(), "B".to_string()]);
	assert_eq!(bucket["parameters"][1]["keywords"], "ibuprofen");
	// Reduced instruction JSON leaves out the provenance flags.
	assert!(bucket["instructions"][0].get("is_new").is_none());
}

#[tokio::test]
async fn transcripts_from_earlier_cycles_survive_later_writes() {
	let dir = tempfile::tempdir().expect("Failed to create temp dir.");
	let mut auditor = file_auditor(dir.path(), "transcripts", 1).await;
	let audio = vec![vec![1_u8, 2, 3]];

	auditor
		.identified_transcript(&audio, &[Line::new("Clinician", "Any allergies?")])
		.await
		.expect("Failed to record cycle 1.");
	auditor.set_cycle(2);
	auditor
		.identified_transcript(&[], &[Line::new("Patient", "Penicillin.")])
		.await
		.expect("Failed to record cycle 2.");

	let document =
		auditor.store().get_json(Label::AudioToTranscript).await.expect("Failed to read.");

	assert_eq!(document.len(), 2);
	assert_eq!(document["cycle_001"][0]["text"], "Any allergies?");
	assert_eq!(document["cycle_002"][0]["speaker"], "Patient");
	assert_eq!(
		std::fs::read(dir.path().join("transcripts/audios/cycle_001_00.mp3"))
			.expect("Audio chunk must be written."),
		vec![1_u8, 2, 3]
	);
}

#[tokio::test]
async fn found_instructions_scrub_identifiers() {
	let dir = tempfile::tempdir().expect("Failed to create temp dir.");
	let auditor = file_auditor(dir.path(), "scrub", 1).await;
	let initial = [instruction("A", 0, "Allergy", "penicillin")];
	let cumulated = [instruction("A", 0, "Allergy", "penicillin, rash")];

	auditor
		.found_instructions(&[Line::new("Patient", "I get a rash.")], &initial, &cumulated)
		.await
		.expect("Failed to record instructions.");

	let document =
		auditor.store().get_json(Label::TranscriptToInstructions).await.expect("Failed to read.");
	let bucket = &document["cycle_001"];

	assert_eq!(bucket["instructions"]["initial"][0]["uuid"], IGNORED_KEY_VALUE);
	assert_eq!(bucket["instructions"]["result"][0]["uuid"], IGNORED_KEY_VALUE);
	assert_eq!(bucket["instructions"]["result"][0]["is_new"], true);
	assert_eq!(bucket["transcript"][0]["text"], "I get a rash.");
}

#[tokio::test]
async fn questionnaire_snapshots_replace_the_cycle() {
	let dir = tempfile::tempdir().expect("Failed to create temp dir.");
	let auditor = file_auditor(dir.path(), "questionnaires", 1).await;
	let lines = [Line::new("Clinician", "Any symptoms?")];
	let first = with_command(
		instruction("Q", 0, "ReviewOfSystem", &questionnaire_information()),
		"ReviewOfSystemsCommand",
		json!({ "questions": { "question-11": [] } }),
	);
	let second = with_command(
		instruction("Q", 0, "ReviewOfSystem", &questionnaire_information()),
		"ReviewOfSystemsCommand",
		json!({
			"questions": {
				"question-11": [
					{ "value": "Fever", "selected": true, "comment": "since Monday" },
					{ "value": "Cough", "selected": true },
					{ "value": "Fatigue", "selected": false }
				]
			},
			"note_uuid": "note-1",
			"command_uuid": "command-1"
		}),
	);

	auditor.computed_questionnaires(&lines, &[], &[first]).await.expect("First write failed.");
	auditor
		.computed_questionnaires(&lines, &[], &[second])
		.await
		.expect("Second write failed.");

	let document =
		auditor.store().get_json(Label::StagedQuestionnaires).await.expect("Failed to read.");
	let commands = document["cycle_001"]["commands"].as_array().expect("Commands array.");

	assert_eq!(commands.len(), 1);
	assert_eq!(commands[0]["attributes"]["note_uuid"], IGNORED_KEY_VALUE);
	assert_eq!(commands[0]["attributes"]["questions"]["question-11"][0]["value"], "Fever");

	let summary = auditor.summarized_generated_commands().await.expect("Failed to summarize.");

	assert_eq!(summary.len(), 1);
	assert_eq!(summary[0].instruction, "ReviewOfSystem");
	assert_eq!(summary[0].command.attributes["Symptoms"], "Fever (since Monday), Cough");
}

#[tokio::test]
async fn summary_revises_commands_by_instruction_uuid() {
	let dir = tempfile::tempdir().expect("Failed to create temp dir.");
	let mut auditor = file_auditor(dir.path(), "revisions", 1).await;

	auditor
		.computed_commands(&[
			with_command(instruction("A", 0, "Plan", "rest"), "PlanCommand", json!({ "x": 1 })),
			with_command(instruction("B", 1, "Goal", "walk"), "GoalCommand", json!({ "y": 1 })),
		])
		.await
		.expect("Failed to record cycle 1.");
	auditor.set_cycle(2);
	auditor
		.computed_commands(&[with_command(
			instruction("A", 0, "Plan", "rest more"),
			"PlanCommand",
			json!({ "x": 2, "command_uuid": "c-1" }),
		)])
		.await
		.expect("Failed to record cycle 2.");

	let summary = auditor.summarized_generated_commands().await.expect("Failed to summarize.");

	assert_eq!(summary.len(), 2);
	assert_eq!(summary[0].instruction, "rest more");
	assert_eq!(
		Value::Object(summary[0].command.attributes.clone()),
		json!({ "x": 2 })
	);
	assert_eq!(summary[1].instruction, "walk");

	let instructions = auditor
		.summarized_generated_commands_as_instructions()
		.await
		.expect("Failed to summarize as instructions.");

	assert_eq!(instructions.len(), 2);
	assert_eq!(instructions[0].uuid, "A");
	assert_eq!(instructions[0].information, "rest more");
}

#[tokio::test]
async fn open_records_the_note_as_failed_until_finalized() {
	let dir = tempfile::tempdir().expect("Failed to create temp dir.");
	let auditor = file_auditor(dir.path(), "finalize", 2).await;

	assert_eq!(read_note(dir.path(), "finalize")["failed"], true);

	auditor.case_finalize(&Map::new()).await.expect("Failed to finalize.");

	let note = read_note(dir.path(), "finalize");

	assert_eq!(note["failed"], false);
	assert_eq!(note["cycle_count"], 2);
	assert_eq!(note["note_json"], json!([]));
}

#[tokio::test]
async fn reported_errors_mark_the_note_failed() {
	let dir = tempfile::tempdir().expect("Failed to create temp dir.");
	let auditor = file_auditor(dir.path(), "errors", 1).await;
	let mut errors = Map::new();

	errors.insert("cycle_001".to_string(), json!("Command builder timed out."));
	auditor.case_finalize(&errors).await.expect("Failed to finalize.");

	let note = read_note(dir.path(), "errors");

	assert_eq!(note["failed"], true);
	assert_eq!(note["errors"]["cycle_001"], "Command builder timed out.");
}

#[tokio::test]
async fn attach_reads_a_previous_session_without_resetting_it() {
	let dir = tempfile::tempdir().expect("Failed to create temp dir.");
	let auditor = file_auditor(dir.path(), "reopen", 1).await;
	let generated_note_id = auditor.store().generated_note_id();

	auditor
		.computed_commands(&[with_command(
			instruction("A", 0, "Plan", "rest"),
			"PlanCommand",
			json!({ "x": 1 }),
		)])
		.await
		.expect("Failed to record commands.");
	auditor.case_finalize(&Map::new()).await.expect("Failed to finalize.");

	let store = FileAuditStore::attach(dir.path(), "reopen").await.expect("Failed to attach.");

	assert_eq!(store.generated_note_id(), generated_note_id);
	assert_eq!(store.case_id(), "reopen");

	let reopened = Auditor::new(Box::new(store), "reopen", 1);
	let path = reopened.generate_html_summary().await.expect("Failed to render summary.");
	let html = std::fs::read_to_string(&path).expect("Summary must be written.");

	assert!(html.contains("PlanCommand"));
	assert_eq!(read_note(dir.path(), "reopen")["failed"], false);

	let _ = std::fs::remove_file(path);
}

#[tokio::test]
async fn reopening_a_case_starts_a_fresh_note() {
	let dir = tempfile::tempdir().expect("Failed to create temp dir.");
	let first = file_auditor(dir.path(), "rerun", 1).await;

	first
		.identified_transcript(&[], &[Line::new("Patient", "My knee hurts.")])
		.await
		.expect("Failed to record transcript.");
	first
		.computed_commands(&[with_command(
			instruction("A", 0, "Plan", "stale"),
			"PlanCommand",
			json!({ "x": 1 }),
		)])
		.await
		.expect("Failed to record commands.");
	first.case_finalize(&Map::new()).await.expect("Failed to finalize.");

	let second = file_auditor(dir.path(), "rerun", 1).await;

	second
		.computed_commands(&[with_command(
			instruction("B", 0, "Plan", "fresh"),
			"PlanCommand",
			json!({ "x": 2 }),
		)])
		.await
		.expect("Failed to record commands.");

	let summary = second.summarized_generated_commands().await.expect("Failed to summarize.");
	let instructions = summary.iter().map(|entry| entry.instruction.as_str()).collect::<Vec<_>>();

	assert_eq!(instructions, ["fresh"]);

	let transcript =
		second.store().get_json(Label::AudioToTranscript).await.expect("Failed to read.");

	assert_eq!(transcript["cycle_001"][0]["text"], "My knee hurts.");
}

#[tokio::test]
async fn transcripts_within_one_cycle_accumulate() {
	let dir = tempfile::tempdir().expect("Failed to create temp dir.");
	let auditor = file_auditor(dir.path(), "chunks", 1).await;

	auditor
		.identified_transcript(&[], &[Line::new("Clinician", "Any allergies?")])
		.await
		.expect("Failed to record the first chunk.");
	auditor
		.identified_transcript(&[], &[Line::new("Patient", "Penicillin.")])
		.await
		.expect("Failed to record the second chunk.");

	let document =
		auditor.store().get_json(Label::AudioToTranscript).await.expect("Failed to read.");
	let lines = document["cycle_001"].as_array().expect("Bucket must be a list.");

	assert_eq!(lines.len(), 2);
	assert_eq!(lines[0]["text"], "Any allergies?");
	assert_eq!(lines[1]["text"], "Penicillin.");
}

#[tokio::test]
async fn attach_requires_a_recorded_note() {
	let dir = tempfile::tempdir().expect("Failed to create temp dir.");

	FileAuditStore::create(dir.path(), "bare").await.expect("Failed to create case.");

	let err = FileAuditStore::attach(dir.path(), "bare").await.err().expect("Expected an error.");

	assert!(matches!(err, Error::NotFound { .. }), "Unexpected error: {err}");

	std::fs::write(dir.path().join("bare/generated_note.json"), "{ not json")
		.expect("Failed to write note file.");

	let err = FileAuditStore::attach(dir.path(), "bare").await.err().expect("Expected an error.");

	assert!(matches!(err, Error::NotFound { .. }), "Unexpected error: {err}");
}
