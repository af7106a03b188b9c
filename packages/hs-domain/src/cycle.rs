use std::fmt;

pub fn cycle_key(cycle: u32) -> String {
	format!("cycle_{cycle:03}")
}

/// Inverse of [`cycle_key`]. Keys grow past their padding after cycle 999, so order cycles by
/// this number rather than by key.
pub fn parse_cycle_key(key: &str) -> Option<u32> {
	key.strip_prefix("cycle_")?.parse().ok()
}

/// Most advanced cycle seen by a session. Never moves backwards and never drops below 1.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct Cycle(u32);
impl Cycle {
	pub fn new(cycle: u32) -> Self {
		Self(cycle.max(1))
	}

	pub fn advance_to(&mut self, cycle: u32) {
		if cycle > self.0 {
			self.0 = cycle;
		}
	}

	pub fn number(self) -> u32 {
		self.0
	}

	pub fn key(self) -> String {
		cycle_key(self.0)
	}
}

#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum Label {
	AudioToTranscript,
	TranscriptToInstructions,
	InstructionToParameters,
	ParametersToCommand,
	StagedQuestionnaires,
}
impl Label {
	pub const ALL: [Self; 5] = [
		Self::AudioToTranscript,
		Self::TranscriptToInstructions,
		Self::InstructionToParameters,
		Self::ParametersToCommand,
		Self::StagedQuestionnaires,
	];

	pub fn as_str(self) -> &'static str {
		match self {
			Self::AudioToTranscript => "audio2transcript",
			Self::TranscriptToInstructions => "transcript2instructions",
			Self::InstructionToParameters => "instruction2parameters",
			Self::ParametersToCommand => "parameters2command",
			Self::StagedQuestionnaires => "staged_questionnaires",
		}
	}

	pub fn parse(raw: &str) -> Option<Self> {
		Self::ALL.into_iter().find(|label| label.as_str() == raw)
	}

	/// Questionnaire snapshots already hold the complete state of a cycle, so they replace the
	/// cycle bucket instead of merging into it.
	pub fn replaces_cycle(self) -> bool {
		matches!(self, Self::StagedQuestionnaires)
	}

	/// Transcripts belong to the case; every other label belongs to one generated note.
	pub fn is_case_level(self) -> bool {
		matches!(self, Self::AudioToTranscript)
	}
}
impl fmt::Display for Label {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}
