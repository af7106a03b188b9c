//! Reduces the per-cycle audit trail of a generation session into the final note.
//!
//! Ordinary commands are revised by instruction uuid: later cycles overwrite earlier ones while
//! keeping the position where the uuid first appeared. Questionnaire commands are revised by
//! snapshot: only the last `staged_questionnaires` cycle is read, and its entries are keyed by
//! position (`questionnaire_NN`) after all ordinary commands, so questionnaire-class commands
//! that also show up in `parameters2command` are skipped there. Cycles are read in numeric order.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::{
	Error, Result,
	cycle::{self, Label},
	instruction::{Command, Instruction},
	questionnaire::{Answer, Questionnaire},
};

#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct CommandSummary {
	pub module: String,
	pub class: String,
	pub attributes: Map<String, Value>,
}

#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct SummarizedCommand {
	pub instruction: String,
	pub command: CommandSummary,
}

#[derive(Debug, Deserialize)]
struct CommandCycle {
	instructions: Vec<Instruction>,
	commands: Vec<Command>,
}

#[derive(Debug, Deserialize)]
struct StagedInstructions {
	result: Vec<Instruction>,
}

#[derive(Debug, Deserialize)]
struct QuestionnaireCycle {
	instructions: StagedInstructions,
	commands: Vec<Command>,
}

/// Insertion-ordered map: re-inserting a key replaces the value in place.
struct Entries<T> {
	positions: HashMap<String, usize>,
	values: Vec<T>,
}
impl<T> Entries<T> {
	fn new() -> Self {
		Self { positions: HashMap::new(), values: Vec::new() }
	}

	fn upsert(&mut self, key: String, value: T) {
		match self.positions.get(&key) {
			Some(&position) => self.values[position] = value,
			None => {
				self.positions.insert(key, self.values.len());
				self.values.push(value);
			},
		}
	}

	fn into_values(self) -> Vec<T> {
		self.values
	}
}

pub fn questionnaire_key(index: usize) -> String {
	format!("questionnaire_{index:02}")
}

pub fn summarize(
	parameters2command: &Map<String, Value>,
	staged_questionnaires: &Map<String, Value>,
) -> Result<Vec<SummarizedCommand>> {
	let mut entries = Entries::new();

	for (cycle, payload) in ordered_cycles(parameters2command) {
		for (instruction, command) in command_pairs(cycle, payload)? {
			if command.is_questionnaire() {
				continue;
			}

			entries.upsert(
				instruction.uuid.clone(),
				SummarizedCommand {
					instruction: instruction.information,
					command: CommandSummary {
						module: command.module,
						class: command.class,
						attributes: Command::display_attributes(&command.attributes),
					},
				},
			);
		}
	}

	if let Some((cycle, payload)) = last_cycle(staged_questionnaires) {
		let pairs = questionnaire_pairs(cycle, payload)?;

		for (index, (instruction, command)) in pairs.into_iter().enumerate() {
			let summary = summarize_questionnaire(&instruction, &command)?;

			entries.upsert(questionnaire_key(index), summary);
		}
	}

	Ok(entries.into_values())
}

/// Same reduction as [`summarize`], but yields instructions ready to be fed back through the
/// pipeline. Questionnaire answers are written into the questionnaire carried by `information`.
pub fn summarize_as_instructions(
	parameters2command: &Map<String, Value>,
	staged_questionnaires: &Map<String, Value>,
) -> Result<Vec<Instruction>> {
	let mut entries = Entries::new();

	for (cycle, payload) in ordered_cycles(parameters2command) {
		for (instruction, command) in command_pairs(cycle, payload)? {
			if command.is_questionnaire() {
				continue;
			}

			entries.upsert(instruction.uuid.clone(), instruction);
		}
	}

	if let Some((cycle, payload)) = last_cycle(staged_questionnaires) {
		let pairs = questionnaire_pairs(cycle, payload)?;

		for (index, (mut instruction, command)) in pairs.into_iter().enumerate() {
			let mut questionnaire = Questionnaire::from_information(&instruction.information)?;
			let answers = command_answers(&command);

			for question in &mut questionnaire.questions {
				let raw = answers.get(&question.command_key()).unwrap_or(&Value::Null);

				Answer::from_raw(question.kind, raw)?.apply_to(question);
			}

			instruction.information = questionnaire.to_information()?;

			entries.upsert(questionnaire_key(index), instruction);
		}
	}

	Ok(entries.into_values())
}

fn summarize_questionnaire(
	instruction: &Instruction,
	command: &Command,
) -> Result<SummarizedCommand> {
	let questionnaire = Questionnaire::from_information(&instruction.information)?;
	let answers = command_answers(command);
	let mut attributes = Map::new();

	for question in &questionnaire.questions {
		let raw = answers.get(&question.command_key()).unwrap_or(&Value::Null);
		let answer = Answer::from_raw(question.kind, raw)?;

		attributes.insert(question.label.clone(), answer.display(question));
	}

	Ok(SummarizedCommand {
		instruction: instruction.instruction.clone(),
		command: CommandSummary {
			module: command.module.clone(),
			class: command.class.clone(),
			attributes,
		},
	})
}

fn command_answers(command: &Command) -> Map<String, Value> {
	command.attributes.get("questions").and_then(Value::as_object).cloned().unwrap_or_default()
}

// Keys that are not cycle keys sort after every cycle, by name.
fn cycle_order(key: &str) -> u32 {
	cycle::parse_cycle_key(key).unwrap_or(u32::MAX)
}

fn ordered_cycles(document: &Map<String, Value>) -> Vec<(&String, &Value)> {
	let mut cycles = document.iter().collect::<Vec<_>>();

	cycles.sort_by(|(a, _), (b, _)| cycle_order(a).cmp(&cycle_order(b)).then_with(|| a.cmp(b)));

	cycles
}

fn last_cycle(document: &Map<String, Value>) -> Option<(&String, &Value)> {
	ordered_cycles(document).pop()
}

fn command_pairs(cycle: &str, payload: &Value) -> Result<Vec<(Instruction, Command)>> {
	let parsed: CommandCycle = serde_json::from_value(payload.clone())
		.map_err(|err| malformed(Label::ParametersToCommand, cycle, err.to_string()))?;

	zip_aligned(Label::ParametersToCommand, cycle, parsed.instructions, parsed.commands)
}

fn questionnaire_pairs(cycle: &str, payload: &Value) -> Result<Vec<(Instruction, Command)>> {
	let parsed: QuestionnaireCycle = serde_json::from_value(payload.clone())
		.map_err(|err| malformed(Label::StagedQuestionnaires, cycle, err.to_string()))?;

	zip_aligned(Label::StagedQuestionnaires, cycle, parsed.instructions.result, parsed.commands)
}

fn zip_aligned(
	label: Label,
	cycle: &str,
	instructions: Vec<Instruction>,
	commands: Vec<Command>,
) -> Result<Vec<(Instruction, Command)>> {
	if instructions.len() != commands.len() {
		return Err(malformed(
			label,
			cycle,
			format!(
				"{} instructions are not aligned with {} commands.",
				instructions.len(),
				commands.len()
			),
		));
	}

	Ok(instructions.into_iter().zip(commands).collect())
}

fn malformed(label: Label, cycle: &str, message: String) -> Error {
	Error::MalformedDocument { label: label.to_string(), cycle: cycle.to_string(), message }
}
