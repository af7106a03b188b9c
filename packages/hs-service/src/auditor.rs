//! Cycle-indexed audit trail of a note generation session.
//!
//! Every pipeline stage reports its output here. Documents are keyed by [`Label`] and hold one
//! bucket per cycle key; writes read the whole document, merge the current cycle and write it back.

pub mod file;
pub mod postgres;

use std::path::PathBuf;

use serde_json::{Map, Value, json};
use uuid::Uuid;

use hs_domain::{
	cycle::{Cycle, Label},
	instruction::{Instruction, InstructionWithCommand, InstructionWithParameters},
	note::{self, SummarizedCommand},
	transcript::{self, Line},
};
use hs_storage::models::NoteOutcome;

use crate::{BoxFuture, Result};

const SUMMARY_TEMPLATE: &str = include_str!("../templates/summary.html");
const SUMMARY_PLACEHOLDER: &str = "{{summary}}";

pub trait AuditStore
where
	Self: Send + Sync,
{
	fn upsert_json<'a>(
		&'a self,
		label: Label,
		content: &'a Map<String, Value>,
	) -> BoxFuture<'a, Result<()>>;

	/// Absent documents read as an empty mapping.
	fn get_json<'a>(&'a self, label: Label) -> BoxFuture<'a, Result<Map<String, Value>>>;

	fn upsert_audio<'a>(&'a self, label: &'a str, audio: &'a [u8]) -> BoxFuture<'a, Result<()>>;

	fn finalize<'a>(&'a self, outcome: &'a NoteOutcome) -> BoxFuture<'a, Result<()>>;

	fn case_id(&self) -> String;

	fn generated_note_id(&self) -> Uuid;
}

pub struct Auditor {
	store: Box<dyn AuditStore>,
	case: String,
	cycle: Cycle,
}
impl Auditor {
	pub fn new(store: Box<dyn AuditStore>, case: impl Into<String>, cycle: u32) -> Self {
		Self { store, case: case.into(), cycle: Cycle::new(cycle) }
	}

	pub fn case(&self) -> &str {
		&self.case
	}

	pub fn cycle(&self) -> u32 {
		self.cycle.number()
	}

	pub fn cycle_key(&self) -> String {
		self.cycle.key()
	}

	pub fn store(&self) -> &dyn AuditStore {
		self.store.as_ref()
	}

	/// Only ever raises the cycle.
	pub fn set_cycle(&mut self, cycle: u32) {
		self.cycle.advance_to(cycle);
	}

	pub async fn identified_transcript(&self, audios: &[Vec<u8>], lines: &[Line]) -> Result<bool> {
		let cycle_key = self.cycle_key();

		for (index, audio) in audios.iter().enumerate() {
			self.store.upsert_audio(&format!("{cycle_key}_{index:02}"), audio).await?;
		}

		self.merge_cycle(Label::AudioToTranscript, transcript::lines_to_json(lines)).await?;

		Ok(true)
	}

	pub async fn found_instructions(
		&self,
		lines: &[Line],
		initial: &[Instruction],
		cumulated: &[Instruction],
	) -> Result<bool> {
		let payload = json!({
			"transcript": transcript::lines_to_json(lines),
			"instructions": {
				"initial": scrubbed(initial),
				"result": scrubbed(cumulated),
			},
		});

		self.merge_cycle(Label::TranscriptToInstructions, payload).await?;

		Ok(true)
	}

	pub async fn computed_parameters(
		&self,
		instructions: &[InstructionWithParameters],
	) -> Result<bool> {
		let columns = [
			(
				"instructions",
				instructions.iter().map(|item| item.instruction.to_json(true)).collect::<Vec<_>>(),
			),
			(
				"parameters",
				instructions
					.iter()
					.map(|item| Value::Object(item.parameters.clone()))
					.collect::<Vec<_>>(),
			),
		];

		self.append_cycle(Label::InstructionToParameters, columns).await?;

		Ok(true)
	}

	pub async fn computed_commands(&self, instructions: &[InstructionWithCommand]) -> Result<bool> {
		let columns = [
			(
				"instructions",
				instructions.iter().map(|item| item.instruction.to_json(true)).collect::<Vec<_>>(),
			),
			(
				"parameters",
				instructions
					.iter()
					.map(|item| Value::Object(item.parameters.clone()))
					.collect::<Vec<_>>(),
			),
			(
				"commands",
				instructions.iter().map(|item| item.command.to_audit_json()).collect::<Vec<_>>(),
			),
		];

		self.append_cycle(Label::ParametersToCommand, columns).await?;

		Ok(true)
	}

	/// Replaces the cycle's questionnaire snapshot; each snapshot is already complete.
	pub async fn computed_questionnaires(
		&self,
		lines: &[Line],
		initial: &[Instruction],
		instructions: &[InstructionWithCommand],
	) -> Result<bool> {
		let payload = json!({
			"transcript": transcript::lines_to_json(lines),
			"instructions": {
				"initial": scrubbed(initial),
				"result": instructions
					.iter()
					.map(|item| item.instruction.to_json(true))
					.collect::<Vec<_>>(),
			},
			"commands": instructions
				.iter()
				.map(|item| item.command.to_audit_json())
				.collect::<Vec<_>>(),
		});

		self.merge_cycle(Label::StagedQuestionnaires, payload).await?;

		Ok(true)
	}

	pub async fn summarized_generated_commands(&self) -> Result<Vec<SummarizedCommand>> {
		let commands = self.store.get_json(Label::ParametersToCommand).await?;
		let questionnaires = self.store.get_json(Label::StagedQuestionnaires).await?;

		Ok(note::summarize(&commands, &questionnaires)?)
	}

	pub async fn summarized_generated_commands_as_instructions(&self) -> Result<Vec<Instruction>> {
		let commands = self.store.get_json(Label::ParametersToCommand).await?;
		let questionnaires = self.store.get_json(Label::StagedQuestionnaires).await?;

		Ok(note::summarize_as_instructions(&commands, &questionnaires)?)
	}

	/// Writes the summary into a standalone HTML page under the OS temp dir and returns its path.
	pub async fn generate_html_summary(&self) -> Result<PathBuf> {
		let summary = self.summarized_generated_commands().await?;
		let html = render_summary(&self.case, &summary)?;
		let path = std::env::temp_dir().join(format!("summary_{}.html", Uuid::new_v4().simple()));

		tokio::fs::write(&path, html).await?;
		tracing::info!(case = %self.case, path = %path.display(), "Wrote HTML summary.");

		Ok(path)
	}

	/// Persists the assembled note. The note counts as failed when any error was reported.
	pub async fn case_finalize(&self, errors: &Map<String, Value>) -> Result<bool> {
		let summary = self.summarized_generated_commands().await?;
		let outcome = NoteOutcome {
			cycle_count: self.cycle.number(),
			note_json: serde_json::to_value(&summary)?,
			failed: !errors.is_empty(),
			errors: Value::Object(errors.clone()),
		};

		self.store.finalize(&outcome).await?;
		tracing::info!(
			case = %self.case,
			cycles = outcome.cycle_count,
			commands = summary.len(),
			failed = outcome.failed,
			"Finalized generated note."
		);

		Ok(true)
	}

	/// Lists already in the cycle bucket are extended and objects merged key by key, so repeated
	/// calls within one cycle accumulate. Labels that replace their cycle overwrite the bucket.
	async fn merge_cycle(&self, label: Label, payload: Value) -> Result<()> {
		let cycle_key = self.cycle_key();
		let mut document = self.store.get_json(label).await?;

		if label.replaces_cycle() || !document.contains_key(&cycle_key) {
			document.insert(cycle_key, payload);
		} else if let Some(bucket) = document.get_mut(&cycle_key) {
			merge_value(bucket, payload)
				.map_err(|message| malformed(label, &cycle_key, &message))?;
		}

		self.store.upsert_json(label, &document).await
	}

	async fn append_cycle<const N: usize>(
		&self,
		label: Label,
		columns: [(&str, Vec<Value>); N],
	) -> Result<()> {
		let cycle_key = self.cycle_key();
		let mut document = self.store.get_json(label).await?;
		let bucket = document.entry(cycle_key.clone()).or_insert_with(|| Value::Object(Map::new()));
		let Some(bucket) = bucket.as_object_mut() else {
			return Err(malformed(label, &cycle_key, "cycle bucket is not an object"));
		};

		for (column, values) in columns {
			let entry = bucket.entry(column).or_insert_with(|| Value::Array(Vec::new()));
			let Some(entry) = entry.as_array_mut() else {
				return Err(malformed(label, &cycle_key, &format!("{column} is not an array")));
			};

			entry.extend(values);
		}

		self.store.upsert_json(label, &document).await
	}
}

fn scrubbed(instructions: &[Instruction]) -> Vec<Value> {
	instructions.iter().map(|instruction| instruction.to_scrubbed_json(false)).collect()
}

fn merge_value(target: &mut Value, incoming: Value) -> std::result::Result<(), String> {
	match (target, incoming) {
		(Value::Array(target), Value::Array(incoming)) => target.extend(incoming),
		(Value::Object(target), Value::Object(incoming)) => {
			for (key, value) in incoming {
				match target.get_mut(&key) {
					Some(existing) => merge_value(existing, value)
						.map_err(|message| format!("{key}: {message}"))?,
					None => {
						target.insert(key, value);
					},
				}
			}
		},
		(Value::Array(_) | Value::Object(_), _) | (_, Value::Array(_) | Value::Object(_)) =>
			return Err("cycle bucket shape does not match the new payload".to_string()),
		(target, incoming) => *target = incoming,
	}

	Ok(())
}

fn malformed(label: Label, cycle: &str, message: &str) -> crate::Error {
	hs_domain::Error::MalformedDocument {
		label: label.to_string(),
		cycle: cycle.to_string(),
		message: message.to_string(),
	}
	.into()
}

fn render_summary(case: &str, summary: &[SummarizedCommand]) -> Result<String> {
	// The JSON is embedded in a script element, so a closing tag inside a value must not end it.
	let json = serde_json::to_string_pretty(summary)?.replace("</", "<\\/");
	let title = case.replace('&', "&amp;").replace('<', "&lt;").replace('>', "&gt;");

	Ok(SUMMARY_TEMPLATE.replace("{{case}}", &title).replace(SUMMARY_PLACEHOLDER, &json))
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn summary_page_embeds_escaped_json() {
		let summary = vec![SummarizedCommand {
			instruction: "</script>".to_string(),
			command: note::CommandSummary {
				module: "plan".to_string(),
				class: "PlanCommand".to_string(),
				attributes: Map::new(),
			},
		}];
		let html = render_summary("a <b>", &summary).expect("Failed to render summary.");

		assert!(html.contains("a &lt;b&gt;"));
		assert!(html.contains("<\\/script>"));
		assert!(!html.contains(SUMMARY_PLACEHOLDER));
	}

	#[test]
	fn merged_buckets_extend_nested_lists() {
		let mut bucket =
			json!({ "transcript": ["a"], "instructions": { "initial": [1], "result": [] } });

		merge_value(
			&mut bucket,
			json!({ "transcript": ["b"], "instructions": { "initial": [2], "result": [3] } }),
		)
		.expect("Failed to merge.");

		assert_eq!(
			bucket,
			json!({ "transcript": ["a", "b"], "instructions": { "initial": [1, 2], "result": [3] } })
		);
		assert!(merge_value(&mut bucket, json!(["c"])).is_err());
	}
}
