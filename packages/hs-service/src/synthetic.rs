//! Synthetic cases: patient profiles, then a limited chart and an encounter transcript per
//! profile, all produced through [`crate::JsonGenerator`].

use std::path::Path;

use serde::Deserialize;
use serde_json::{Map, Value, json};
use uuid::Uuid;

use hs_domain::{
	case::ValidationStatus,
	cycle::{Label, cycle_key},
	transcript::{self, Line},
};
use hs_storage::{db::Db, models::NewCase, queries};

use crate::{AuditStore, Error, EvalService, FileAuditStore, Result};

#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct PatientProfile {
	pub name: String,
	/// One line summing up the clinical situation, used to keep batches diverse.
	pub scenario: String,
	pub profile: String,
}

#[derive(Clone, Debug, PartialEq)]
pub struct SyntheticCase {
	pub name: String,
	pub category: String,
	pub batch_identifier: String,
	pub profile: String,
	pub limited_chart: Value,
	pub transcript: Vec<Line>,
}
impl SyntheticCase {
	pub fn tags(&self) -> Value {
		json!({ "category": self.category, "synthetic": true })
	}

	/// Generated transcripts form the first and only cycle of the case.
	pub fn transcript_document(&self) -> Map<String, Value> {
		let mut document = Map::new();

		document.insert(cycle_key(1), transcript::lines_to_json(&self.transcript));

		document
	}
}

/// State carried across batches of one generation run.
pub struct SyntheticSession<'a> {
	service: &'a EvalService,
	category: String,
	run: String,
	seen_scenarios: Vec<String>,
	seen_names: Vec<String>,
}
impl<'a> SyntheticSession<'a> {
	pub fn new(service: &'a EvalService, category: impl Into<String>) -> Self {
		let run = Uuid::new_v4().simple().to_string();

		Self {
			service,
			category: category.into(),
			run: run[..8].to_string(),
			seen_scenarios: Vec::new(),
			seen_names: Vec::new(),
		}
	}

	pub fn seen_scenarios(&self) -> &[String] {
		&self.seen_scenarios
	}

	pub fn batch_identifier(&self, batch: u32) -> String {
		format!("{}-{}-{batch:02}", self.category, self.run)
	}

	pub async fn generate_batch(&mut self, batch: u32, size: usize) -> Result<Vec<SyntheticCase>> {
		let batch_identifier = self.batch_identifier(batch);
		let profiles = self.generate_profiles(size).await?;
		let mut cases = Vec::with_capacity(profiles.len());

		for profile in profiles {
			let limited_chart = self.generate_chart(&profile).await?;
			let transcript = self.generate_transcript(&profile, &limited_chart).await?;

			tracing::info!(
				batch = %batch_identifier,
				case = %profile.name,
				lines = transcript.len(),
				"Generated synthetic case."
			);
			cases.push(SyntheticCase {
				name: profile.name,
				category: self.category.clone(),
				batch_identifier: batch_identifier.clone(),
				profile: profile.profile,
				limited_chart,
				transcript,
			});
		}

		Ok(cases)
	}

	/// Profiles never repeat a scenario or a name already produced in this session.
	pub async fn generate_profiles(&mut self, count: usize) -> Result<Vec<PatientProfile>> {
		let system_prompt = [
			"You are a clinician designing realistic patients for documentation exercises.",
			"Each patient gets a short unique name, a one line scenario and a narrative profile.",
			"The profile covers age, history, current concerns and social context.",
		]
		.map(String::from);
		let mut user_prompt = vec![format!(
			"Create {count} patient profiles for the category: {}.",
			self.category
		)];

		if !self.seen_scenarios.is_empty() {
			user_prompt.push(String::new());
			user_prompt.push("Do not reuse any of these scenarios:".to_string());
			user_prompt.extend(self.seen_scenarios.iter().map(|scenario| format!("- {scenario}")));
		}
		if !self.seen_names.is_empty() {
			user_prompt.push(String::new());
			user_prompt.push(format!("Do not reuse these names: {}.", self.seen_names.join(", ")));
		}

		let value = self
			.service
			.generator()
			.generate_json(&system_prompt, &user_prompt, &profiles_schema(count))
			.await?;
		let profiles: Vec<PatientProfile> = serde_json::from_value(value)?;

		for profile in &profiles {
			if self.seen_names.contains(&profile.name) {
				return Err(Error::InvalidRequest {
					message: format!("Generated profile name {:?} was already used.", profile.name),
				});
			}

			self.seen_names.push(profile.name.clone());
			self.seen_scenarios.push(profile.scenario.clone());
		}

		Ok(profiles)
	}

	pub async fn generate_chart(&self, profile: &PatientProfile) -> Result<Value> {
		let system_prompt = [
			"You are a clinician preparing the chart of a patient before a visit.",
			"Only include facts consistent with the profile.",
		]
		.map(String::from);
		let user_prompt = vec![
			"Patient profile:".to_string(),
			profile.profile.clone(),
			String::new(),
			"Write the limited chart of this patient.".to_string(),
		];

		self.service.generator().generate_json(&system_prompt, &user_prompt, &chart_schema()).await
	}

	pub async fn generate_transcript(
		&self,
		profile: &PatientProfile,
		limited_chart: &Value,
	) -> Result<Vec<Line>> {
		let system_prompt = [
			"You are writing the transcript of a primary care visit.",
			"The speakers are the Clinician and the Patient, sometimes a Caregiver.",
			"The conversation sounds natural and covers the scenario end to end.",
		]
		.map(String::from);
		let user_prompt = vec![
			"Patient profile:".to_string(),
			profile.profile.clone(),
			String::new(),
			"Limited chart:".to_string(),
			"```json".to_string(),
			serde_json::to_string_pretty(limited_chart)?,
			"```".to_string(),
		];
		let value = self
			.service
			.generator()
			.generate_json(&system_prompt, &user_prompt, &transcript_schema())
			.await?;

		Ok(serde_json::from_value(value)?)
	}
}

/// Fails with [`Error::InvalidRequest`] when a case with the same name is already stored.
pub async fn save_case_db(db: &Db, case: &SyntheticCase) -> Result<Uuid> {
	let tags = case.tags();
	let case_id = queries::insert_case(
		db,
		&NewCase {
			name: &case.name,
			validation_status: ValidationStatus::Generation,
			batch_identifier: &case.batch_identifier,
			tags: &tags,
		},
	)
	.await?
	.ok_or_else(|| duplicate_case(&case.name))?;

	queries::update_case_profile(db, case_id, &case.profile).await?;
	queries::update_case_chart(db, case_id, &case.limited_chart).await?;
	queries::update_case_transcript(db, case_id, &case.transcript_document()).await?;

	Ok(case_id)
}

/// Fails with [`Error::InvalidRequest`] when the case directory already holds a case.
pub async fn save_case_files(root: &Path, case: &SyntheticCase) -> Result<()> {
	let store = FileAuditStore::create(root, &case.name).await?;

	if store.has_case_document().await? {
		return Err(duplicate_case(&case.name));
	}

	store.upsert_json(Label::AudioToTranscript, &case.transcript_document()).await?;
	store
		.write_case_document(&json!({
			"name": case.name,
			"profile": case.profile,
			"limited_chart": case.limited_chart,
			"validation_status": ValidationStatus::Generation.as_str(),
			"batch_identifier": case.batch_identifier,
			"tags": case.tags(),
		}))
		.await
}

fn duplicate_case(name: &str) -> Error {
	Error::InvalidRequest { message: format!("Case {name:?} already exists.") }
}

pub fn profiles_schema(count: usize) -> Value {
	json!({
		"type": "array",
		"minItems": count,
		"maxItems": count,
		"items": {
			"type": "object",
			"properties": {
				"name": { "type": "string", "minLength": 1, "pattern": "^[^/\\\\]+$" },
				"scenario": { "type": "string", "minLength": 1 },
				"profile": { "type": "string", "minLength": 1 },
			},
			"required": ["name", "scenario", "profile"],
			"additionalProperties": false,
		},
	})
}

pub fn chart_schema() -> Value {
	let list = json!({ "type": "array", "items": { "type": "string" } });

	json!({
		"type": "object",
		"properties": {
			"demographics": { "type": "string" },
			"conditions": list.clone(),
			"medications": list.clone(),
			"allergies": list.clone(),
			"immunizations": list.clone(),
			"family_history": list,
		},
		"required": [
			"demographics",
			"conditions",
			"medications",
			"allergies",
			"immunizations",
			"family_history",
		],
		"additionalProperties": false,
	})
}

pub fn transcript_schema() -> Value {
	json!({
		"type": "array",
		"minItems": 1,
		"items": {
			"type": "object",
			"properties": {
				"speaker": { "type": "string", "minLength": 1 },
				"text": { "type": "string", "minLength": 1 },
			},
			"required": ["speaker", "text"],
			"additionalProperties": false,
		},
	})
}
