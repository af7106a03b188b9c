use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ValidationStatus {
	Generation,
	Review,
	Evaluation,
}
impl ValidationStatus {
	pub fn as_str(self) -> &'static str {
		match self {
			Self::Generation => "generation",
			Self::Review => "review",
			Self::Evaluation => "evaluation",
		}
	}

	pub fn parse(raw: &str) -> Option<Self> {
		match raw {
			"generation" => Some(Self::Generation),
			"review" => Some(Self::Review),
			"evaluation" => Some(Self::Evaluation),
			_ => None,
		}
	}
}
