use serde::Deserialize;
use serde_json::{Value, json};
use uuid::Uuid;

use hs_domain::rubric::{self, RubricCriterion};
use hs_storage::{db::Db, models::NewRubric, queries};

use crate::{Error, EvalService, Result};

impl EvalService {
	/// Asks the model for a rubric fitting the case's transcript and chart and stores it.
	pub async fn generate_rubric(&self, db: &Db, case: &str, author: &str) -> Result<Uuid> {
		let Some(stored) = queries::get_case_by_name(db, case).await? else {
			return Err(Error::NotFound { message: format!("case {case}") });
		};
		let system_prompt = [
			"You are a clinician reviewing documentation written from a patient encounter.",
			"Write a rubric for the note a scribe would write from this transcript and chart.",
			"Each criterion is one statement a reviewer can check against the note.",
			"Weights go from 0 to 100 and reflect clinical importance.",
			"Use the negative sense for content that must not appear in the note.",
		]
		.map(String::from);
		let user_prompt = vec![
			"Transcript of the encounter:".to_string(),
			"```json".to_string(),
			serde_json::to_string_pretty(&stored.transcript)?,
			"```".to_string(),
			String::new(),
			"Limited chart of the patient:".to_string(),
			"```json".to_string(),
			serde_json::to_string_pretty(&stored.limited_chart)?,
			"```".to_string(),
		];
		let criteria = self
			.generator()
			.generate_json_checked(&system_prompt, &user_prompt, &rubric_schema(), |value| {
				let criteria = Vec::<RubricCriterion>::deserialize(value)
					.map_err(|err| err.to_string())?;

				rubric::validate_rubric(&criteria).map_err(|err| err.to_string())?;

				Ok(criteria)
			})
			.await?;

		let llm = &self.cfg.providers.llm;
		let rubric_json = serde_json::to_value(&criteria)?;
		let rubric_id = queries::insert_rubric(
			db,
			&NewRubric {
				case_id: stored.case_id,
				author,
				rubric: &rubric_json,
				text_llm_vendor: &llm.provider_id,
				text_llm_name: &llm.model,
				temperature: llm.temperature,
				code_version: &self.code_version,
			},
		)
		.await?;

		tracing::info!(%case, %rubric_id, criteria = criteria.len(), "Stored generated rubric.");

		Ok(rubric_id)
	}
}

pub fn rubric_schema() -> Value {
	json!({
		"type": "array",
		"minItems": 1,
		"items": {
			"type": "object",
			"properties": {
				"criterion": { "type": "string", "minLength": 1 },
				"weight": { "type": "integer", "minimum": 0, "maximum": 100 },
				"sense": { "type": "string", "enum": ["positive", "negative"] },
			},
			"required": ["criterion", "weight", "sense"],
			"additionalProperties": false,
		},
	})
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn schema_accepts_well_formed_rubrics_only() {
		let validator =
			jsonschema::validator_for(&rubric_schema()).expect("Rubric schema must compile.");

		assert!(validator.is_valid(&json!([
			{ "criterion": "Mentions the penicillin allergy.", "weight": 40, "sense": "positive" }
		])));
		assert!(!validator.is_valid(&json!([])));
		assert!(!validator.is_valid(&json!([
			{ "criterion": "Mentions the allergy.", "weight": 140, "sense": "positive" }
		])));
		assert!(!validator.is_valid(&json!([
			{ "criterion": "Mentions the allergy.", "weight": 40, "sense": "neutral" }
		])));
	}
}
