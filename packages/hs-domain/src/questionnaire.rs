use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{Error, Result};

#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum QuestionType {
	Checkbox,
	Radio,
	Integer,
	Text,
}

#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct Response {
	pub dbid: i64,
	pub value: Value,
	#[serde(default)]
	pub selected: bool,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub comment: Option<String>,
}

#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct Question {
	pub dbid: i64,
	pub label: String,
	#[serde(rename = "type")]
	pub kind: QuestionType,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub skipped: Option<bool>,
	#[serde(default)]
	pub responses: Vec<Response>,
}
impl Question {
	/// Key of this question inside a questionnaire command's `questions` attribute.
	pub fn command_key(&self) -> String {
		format!("question-{}", self.dbid)
	}
}

#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct Questionnaire {
	pub name: String,
	pub dbid: i64,
	pub questions: Vec<Question>,
}
impl Questionnaire {
	pub fn from_information(information: &str) -> Result<Self> {
		serde_json::from_str(information)
			.map_err(|err| Error::InvalidQuestionnaire { message: err.to_string() })
	}

	pub fn to_information(&self) -> Result<String> {
		serde_json::to_string(self)
			.map_err(|err| Error::InvalidQuestionnaire { message: err.to_string() })
	}
}

#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct CheckboxAnswer {
	pub value: String,
	#[serde(default)]
	pub selected: bool,
	#[serde(default)]
	pub comment: Option<String>,
}
impl CheckboxAnswer {
	fn comment(&self) -> Option<&str> {
		self.comment.as_deref().map(str::trim).filter(|comment| !comment.is_empty())
	}
}

/// A command's raw answer to one question, interpreted by the question's kind.
#[derive(Clone, Debug, PartialEq)]
pub enum Answer {
	Checkbox(Vec<CheckboxAnswer>),
	Radio(Option<i64>),
	Integer(Value),
	Text(Value),
}
impl Answer {
	pub fn from_raw(kind: QuestionType, raw: &Value) -> Result<Self> {
		match kind {
			QuestionType::Checkbox => {
				if raw.is_null() {
					return Ok(Self::Checkbox(Vec::new()));
				}

				serde_json::from_value(raw.clone()).map(Self::Checkbox).map_err(|err| {
					Error::InvalidQuestionnaire {
						message: format!("Checkbox answer is not a list of options: {err}"),
					}
				})
			},
			QuestionType::Radio => match raw {
				Value::Null => Ok(Self::Radio(None)),
				Value::Number(number) => number.as_i64().map(|id| Self::Radio(Some(id))).ok_or_else(
					|| Error::InvalidQuestionnaire {
						message: format!("Radio answer {number} is not an option id."),
					},
				),
				Value::String(text) =>
					text.trim().parse::<i64>().map(|id| Self::Radio(Some(id))).map_err(|_| {
						Error::InvalidQuestionnaire {
							message: format!("Radio answer {text:?} is not an option id."),
						}
					}),
				other => Err(Error::InvalidQuestionnaire {
					message: format!("Radio answer {other} is not an option id."),
				}),
			},
			QuestionType::Integer => Ok(Self::Integer(raw.clone())),
			QuestionType::Text => Ok(Self::Text(raw.clone())),
		}
	}

	pub fn display(&self, question: &Question) -> Value {
		match self {
			Self::Checkbox(options) => Value::String(
				options
					.iter()
					.filter(|option| option.selected)
					.map(|option| match option.comment() {
						Some(comment) => format!("{} ({comment})", option.value),
						None => option.value.clone(),
					})
					.collect::<Vec<_>>()
					.join(", "),
			),
			Self::Radio(selected) => selected
				.and_then(|id| question.responses.iter().find(|response| response.dbid == id))
				.map(|response| response.value.clone())
				.unwrap_or(Value::Null),
			Self::Integer(value) | Self::Text(value) => value.clone(),
		}
	}

	/// Writes the answer back into the question's responses, the shape the chart expects.
	pub fn apply_to(&self, question: &mut Question) {
		match self {
			Self::Checkbox(options) =>
				for response in &mut question.responses {
					let matched = options
						.iter()
						.find(|option| response.value.as_str() == Some(option.value.as_str()));

					response.selected = matched.is_some_and(|option| option.selected);
					response.comment = matched
						.filter(|option| option.selected)
						.and_then(|option| option.comment().map(str::to_string));
				},
			Self::Radio(selected) =>
				for response in &mut question.responses {
					response.selected = Some(response.dbid) == *selected;
				},
			Self::Integer(value) | Self::Text(value) => {
				if value.is_null() {
					return;
				}

				match question.responses.first_mut() {
					Some(response) => {
						response.value = value.clone();
						response.selected = true;
					},
					None => question.responses.push(Response {
						dbid: 0,
						value: value.clone(),
						selected: true,
						comment: None,
					}),
				}
			},
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	fn radio_question() -> Question {
		Question {
			dbid: 7,
			label: "Smoker".to_string(),
			kind: QuestionType::Radio,
			skipped: None,
			responses: vec![
				Response { dbid: 70, value: Value::from("Yes"), selected: false, comment: None },
				Response { dbid: 71, value: Value::from("No"), selected: false, comment: None },
			],
		}
	}

	#[test]
	fn checkbox_display_joins_selected_options_with_comments() {
		let raw = serde_json::json!([
			{ "value": "OptionA", "selected": true, "comment": "commentA" },
			{ "value": "OptionB", "selected": true, "comment": "" },
			{ "value": "OptionC", "selected": false, "comment": "ignored" },
		]);
		let question = Question {
			dbid: 1,
			label: "Symptoms".to_string(),
			kind: QuestionType::Checkbox,
			skipped: None,
			responses: Vec::new(),
		};
		let answer = Answer::from_raw(QuestionType::Checkbox, &raw).expect("Failed to parse.");

		assert_eq!(answer.display(&question), Value::from("OptionA (commentA), OptionB"));
	}

	#[test]
	fn radio_display_looks_up_the_selected_option() {
		let question = radio_question();
		let answer = Answer::from_raw(QuestionType::Radio, &Value::from(71)).expect("Failed.");

		assert_eq!(answer.display(&question), Value::from("No"));

		let unknown = Answer::from_raw(QuestionType::Radio, &Value::from("99")).expect("Failed.");

		assert_eq!(unknown.display(&question), Value::Null);
	}

	#[test]
	fn radio_answer_rejects_non_ids() {
		let err = Answer::from_raw(QuestionType::Radio, &Value::Bool(true))
			.expect_err("Expected an invalid radio answer.");

		assert!(err.to_string().contains("is not an option id"), "Unexpected error: {err}");
	}

	#[test]
	fn integer_and_text_pass_through() {
		let question = radio_question();

		assert_eq!(
			Answer::from_raw(QuestionType::Integer, &Value::from(42))
				.expect("Failed.")
				.display(&question),
			Value::from(42)
		);
		assert_eq!(
			Answer::from_raw(QuestionType::Text, &Value::from("free"))
				.expect("Failed.")
				.display(&question),
			Value::from("free")
		);
	}

	#[test]
	fn applying_answers_updates_responses() {
		let mut question = radio_question();

		Answer::Radio(Some(70)).apply_to(&mut question);

		assert!(question.responses[0].selected);
		assert!(!question.responses[1].selected);

		let mut text = Question {
			dbid: 3,
			label: "Notes".to_string(),
			kind: QuestionType::Text,
			skipped: None,
			responses: Vec::new(),
		};

		Answer::Text(Value::from("stable")).apply_to(&mut text);

		assert_eq!(text.responses.len(), 1);
		assert_eq!(text.responses[0].value, Value::from("stable"));
	}
}
