use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::IGNORED_KEY_VALUE;

/// Attributes a clinical command carries to identify itself inside a note.
pub const COMMAND_IDENTIFIER_KEYS: [&str; 2] = ["note_uuid", "command_uuid"];

pub const QUESTIONNAIRE_COMMAND_CLASSES: [&str; 4] = [
	"QuestionnaireCommand",
	"PhysicalExamCommand",
	"ReviewOfSystemsCommand",
	"StructuredAssessmentCommand",
];

#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct Instruction {
	pub uuid: String,
	pub index: u32,
	pub instruction: String,
	pub information: String,
	#[serde(default)]
	pub is_new: bool,
	#[serde(default)]
	pub is_updated: bool,
}
impl Instruction {
	/// The reduced form leaves out the provenance flags, which only matter within the cycle that
	/// produced them.
	pub fn to_json(&self, reduced: bool) -> Value {
		let mut map = Map::new();

		map.insert("uuid".to_string(), Value::String(self.uuid.clone()));
		map.insert("index".to_string(), Value::from(self.index));
		map.insert("instruction".to_string(), Value::String(self.instruction.clone()));
		map.insert("information".to_string(), Value::String(self.information.clone()));

		if !reduced {
			map.insert("is_new".to_string(), Value::Bool(self.is_new));
			map.insert("is_updated".to_string(), Value::Bool(self.is_updated));
		}

		Value::Object(map)
	}

	pub fn to_scrubbed_json(&self, reduced: bool) -> Value {
		let mut json = self.to_json(reduced);

		if let Some(map) = json.as_object_mut() {
			map.insert("uuid".to_string(), Value::String(IGNORED_KEY_VALUE.to_string()));
		}

		json
	}
}

#[derive(Clone, Debug, PartialEq)]
pub struct InstructionWithParameters {
	pub instruction: Instruction,
	pub parameters: Map<String, Value>,
}

#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct Command {
	pub module: String,
	pub class: String,
	pub attributes: Map<String, Value>,
}
impl Command {
	pub fn is_questionnaire(&self) -> bool {
		QUESTIONNAIRE_COMMAND_CLASSES.contains(&self.class.as_str())
	}

	/// Serialized form stored in the audit trail, identifiers replaced by the ignore sentinel.
	pub fn to_audit_json(&self) -> Value {
		let mut attributes = self.attributes.clone();

		for key in COMMAND_IDENTIFIER_KEYS {
			attributes.insert(key.to_string(), Value::String(IGNORED_KEY_VALUE.to_string()));
		}

		serde_json::json!({
			"module": self.module,
			"class": self.class,
			"attributes": attributes,
		})
	}

	pub fn display_attributes(attributes: &Map<String, Value>) -> Map<String, Value> {
		attributes
			.iter()
			.filter(|(key, _)| !COMMAND_IDENTIFIER_KEYS.contains(&key.as_str()))
			.map(|(key, value)| (key.clone(), value.clone()))
			.collect()
	}
}

#[derive(Clone, Debug, PartialEq)]
pub struct InstructionWithCommand {
	pub instruction: Instruction,
	pub parameters: Map<String, Value>,
	pub command: Command,
}

#[cfg(test)]
mod tests {
	use super::*;

	fn instruction() -> Instruction {
		Instruction {
			uuid: "uuid-1".to_string(),
			index: 2,
			instruction: "Allergy".to_string(),
			information: "Penicillin".to_string(),
			is_new: true,
			is_updated: false,
		}
	}

	#[test]
	fn reduced_json_omits_provenance_flags() {
		let json = instruction().to_json(true);

		assert_eq!(
			json,
			serde_json::json!({
				"uuid": "uuid-1",
				"index": 2,
				"instruction": "Allergy",
				"information": "Penicillin",
			})
		);
	}

	#[test]
	fn scrubbed_json_hides_uuid() {
		let json = instruction().to_scrubbed_json(false);

		assert_eq!(json["uuid"], IGNORED_KEY_VALUE);
		assert_eq!(json["is_new"], true);
	}

	#[test]
	fn reduced_json_deserializes_with_default_flags() {
		let parsed: Instruction =
			serde_json::from_value(instruction().to_json(true)).expect("Failed to parse.");

		assert!(!parsed.is_new);
		assert_eq!(parsed.uuid, "uuid-1");
	}

	#[test]
	fn audit_json_scrubs_identifiers_and_display_drops_them() {
		let mut attributes = Map::new();

		attributes.insert("note_uuid".to_string(), Value::String("n-1".to_string()));
		attributes.insert("command_uuid".to_string(), Value::String("c-1".to_string()));
		attributes.insert("narrative".to_string(), Value::String("text".to_string()));

		let command = Command {
			module: "canvas_sdk.commands.commands.hpi".to_string(),
			class: "HistoryOfPresentIllnessCommand".to_string(),
			attributes,
		};
		let json = command.to_audit_json();

		assert_eq!(json["attributes"]["note_uuid"], IGNORED_KEY_VALUE);
		assert_eq!(json["attributes"]["command_uuid"], IGNORED_KEY_VALUE);

		let display = Command::display_attributes(&command.attributes);

		assert_eq!(display.len(), 1);
		assert_eq!(display["narrative"], "text");
		assert!(!command.is_questionnaire());
	}
}
