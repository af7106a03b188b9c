use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct Line {
	pub speaker: String,
	pub text: String,
}
impl Line {
	pub fn new(speaker: impl Into<String>, text: impl Into<String>) -> Self {
		Self { speaker: speaker.into(), text: text.into() }
	}
}

pub fn lines_to_json(lines: &[Line]) -> Value {
	Value::Array(
		lines
			.iter()
			.map(|line| serde_json::json!({ "speaker": line.speaker, "text": line.text }))
			.collect(),
	)
}
