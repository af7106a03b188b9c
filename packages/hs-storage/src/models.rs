use serde_json::Value;
use time::OffsetDateTime;
use uuid::Uuid;

#[derive(Debug, sqlx::FromRow)]
pub struct Case {
	pub case_id: Uuid,
	pub name: String,
	pub transcript: Value,
	pub limited_chart: Value,
	pub profile: String,
	pub validation_status: String,
	pub batch_identifier: String,
	pub tags: Value,
	pub created_at: OffsetDateTime,
	pub updated_at: OffsetDateTime,
}

#[derive(Debug)]
pub struct NewCase<'a> {
	pub name: &'a str,
	pub validation_status: hs_domain::case::ValidationStatus,
	pub batch_identifier: &'a str,
	pub tags: &'a Value,
}

#[derive(Debug, sqlx::FromRow)]
pub struct GeneratedNote {
	pub generated_note_id: Uuid,
	pub case_id: Uuid,
	pub cycle_count: i32,
	pub note_json: Value,
	pub failed: bool,
	pub errors: Value,
	pub text_llm_vendor: String,
	pub text_llm_name: String,
	pub code_version: String,
	pub created_at: OffsetDateTime,
	pub updated_at: OffsetDateTime,
}

#[derive(Debug)]
pub struct NewGeneratedNote<'a> {
	pub case_id: Uuid,
	pub text_llm_vendor: &'a str,
	pub text_llm_name: &'a str,
	pub code_version: &'a str,
}

/// Final state written once a generation run ends, successfully or not.
#[derive(Debug)]
pub struct NoteOutcome {
	pub cycle_count: u32,
	pub note_json: Value,
	pub failed: bool,
	pub errors: Value,
}

#[derive(Debug, sqlx::FromRow)]
pub struct Rubric {
	pub rubric_id: Uuid,
	pub case_id: Uuid,
	pub author: String,
	pub rubric: Value,
	pub text_llm_vendor: String,
	pub text_llm_name: String,
	pub temperature: f32,
	pub code_version: String,
	pub created_at: OffsetDateTime,
}

#[derive(Debug)]
pub struct NewRubric<'a> {
	pub case_id: Uuid,
	pub author: &'a str,
	pub rubric: &'a Value,
	pub text_llm_vendor: &'a str,
	pub text_llm_name: &'a str,
	pub temperature: f32,
	pub code_version: &'a str,
}

#[derive(Debug, sqlx::FromRow)]
pub struct Score {
	pub score_id: Uuid,
	pub rubric_id: Uuid,
	pub generated_note_id: Uuid,
	pub scoring_result: Value,
	pub overall_score: f64,
	pub text_llm_vendor: String,
	pub text_llm_name: String,
	pub temperature: f32,
	pub code_version: String,
	pub created_at: OffsetDateTime,
}

#[derive(Debug)]
pub struct NewScore<'a> {
	pub rubric_id: Uuid,
	pub generated_note_id: Uuid,
	pub scoring_result: &'a Value,
	pub overall_score: f64,
	pub text_llm_vendor: &'a str,
	pub text_llm_name: &'a str,
	pub temperature: f32,
	pub code_version: &'a str,
}
