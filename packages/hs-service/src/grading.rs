use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use uuid::Uuid;

use hs_domain::rubric::{self, CriterionJudgment, GradedCriterion, RubricCriterion};
use hs_storage::{db::Db, models::NewScore, queries};

use crate::{Error, EvalService, Result};

#[derive(Debug, Serialize)]
pub struct GradeReport {
	pub score_id: Uuid,
	pub rubric_id: Uuid,
	pub generated_note_id: Uuid,
	pub overall_score: f64,
	pub criteria: Vec<GradedCriterion>,
}

impl EvalService {
	/// Grades a generated note against a rubric with the model as judge. Every call appends a new
	/// score.
	pub async fn grade_note(
		&self,
		db: &Db,
		rubric_id: Uuid,
		generated_note_id: Uuid,
	) -> Result<GradeReport> {
		let Some(stored_rubric) = queries::get_rubric(db, rubric_id).await? else {
			return Err(Error::NotFound { message: format!("rubric {rubric_id}") });
		};
		let Some(note) = queries::get_generated_note(db, generated_note_id).await? else {
			return Err(Error::NotFound { message: format!("generated note {generated_note_id}") });
		};
		let criteria: Vec<RubricCriterion> = serde_json::from_value(stored_rubric.rubric)?;

		rubric::validate_rubric(&criteria)?;

		let system_prompt = [
			"You are a clinician grading a note written by a medical scribe.",
			"For each rubric criterion, decide how well the note satisfies it.",
			"Satisfaction goes from 0 (not at all) to 100 (completely).",
			"Judge every criterion exactly once and refer to it by its id.",
		]
		.map(String::from);
		let user_prompt = vec![
			"Rubric:".to_string(),
			"```json".to_string(),
			serde_json::to_string_pretty(&numbered(&criteria))?,
			"```".to_string(),
			String::new(),
			"Note to grade:".to_string(),
			"```json".to_string(),
			serde_json::to_string_pretty(&note.note_json)?,
			"```".to_string(),
		];
		let graded = self
			.generator()
			.generate_json_checked(
				&system_prompt,
				&user_prompt,
				&judgment_schema(criteria.len()),
				|value| check_judgments(&criteria, value),
			)
			.await?;
		let overall_score = rubric::overall_score(&graded);
		let llm = &self.cfg.providers.llm;
		let scoring_result = serde_json::to_value(&graded)?;
		let score_id = queries::insert_score(
			db,
			&NewScore {
				rubric_id,
				generated_note_id,
				scoring_result: &scoring_result,
				overall_score,
				text_llm_vendor: &llm.provider_id,
				text_llm_name: &llm.model,
				temperature: llm.temperature,
				code_version: &self.code_version,
			},
		)
		.await?;

		tracing::info!(%rubric_id, %generated_note_id, %score_id, overall_score, "Stored score.");

		Ok(GradeReport { score_id, rubric_id, generated_note_id, overall_score, criteria: graded })
	}
}

pub fn judgment_schema(criteria: usize) -> Value {
	json!({
		"type": "array",
		"minItems": criteria,
		"maxItems": criteria,
		"items": {
			"type": "object",
			"properties": {
				"id": { "type": "integer", "minimum": 0, "maximum": criteria.saturating_sub(1) },
				"rationale": { "type": "string" },
				"satisfaction": { "type": "number", "minimum": 0, "maximum": 100 },
			},
			"required": ["id", "rationale", "satisfaction"],
			"additionalProperties": false,
		},
	})
}

/// Grades schema-valid judgments; duplicate or missing criteria come back as a message the
/// model can act on.
pub fn check_judgments(
	criteria: &[RubricCriterion],
	value: &Value,
) -> std::result::Result<Vec<GradedCriterion>, String> {
	let judgments = Vec::<CriterionJudgment>::deserialize(value).map_err(|err| err.to_string())?;

	rubric::grade(criteria, &judgments).map_err(|err| err.to_string())
}

fn numbered(criteria: &[RubricCriterion]) -> Vec<Value> {
	criteria
		.iter()
		.enumerate()
		.map(|(id, criterion)| {
			json!({
				"id": id,
				"criterion": criterion.criterion,
				"weight": criterion.weight,
				"sense": criterion.sense,
			})
		})
		.collect()
}
