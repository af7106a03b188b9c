//! Drives a chat model until it returns JSON that validates against a schema.
//!
//! Each attempt is a single provider call. A rejected attempt is retried with the original turns
//! plus the rejected output and the exact parser, validator or caller check error; only the
//! latest failure is carried forward. When every attempt fails, the last output is written to the configured
//! failure file.

use std::sync::LazyLock;

use regex::Regex;
use serde_json::Value;

use hs_config::{Generator, LlmProviderConfig};
use hs_providers::chat::Turn;

use crate::{ChatProvider, Error, Result};

static FENCED: LazyLock<Result<Regex, regex::Error>> =
	LazyLock::new(|| Regex::new(r"(?s)```(?i:json)?[ \t]*\n?(.*?)\n?[ \t]*```"));

pub struct JsonGenerator<'a> {
	provider: &'a dyn ChatProvider,
	llm: &'a LlmProviderConfig,
	cfg: &'a Generator,
}
impl<'a> JsonGenerator<'a> {
	pub fn new(
		provider: &'a dyn ChatProvider,
		llm: &'a LlmProviderConfig,
		cfg: &'a Generator,
	) -> Self {
		Self { provider, llm, cfg }
	}

	pub async fn generate_json(
		&self,
		system_prompt: &[String],
		user_prompt: &[String],
		schema: &Value,
	) -> Result<Value> {
		self.generate_json_checked(system_prompt, user_prompt, schema, |value| Ok(value.clone()))
			.await
	}

	/// Like [`Self::generate_json`], with `check` run on schema-valid output. A check error is
	/// sent back to the model like any other rejection and consumes an attempt.
	pub async fn generate_json_checked<T, F>(
		&self,
		system_prompt: &[String],
		user_prompt: &[String],
		schema: &Value,
		check: F,
	) -> Result<T>
	where
		F: Fn(&Value) -> std::result::Result<T, String>,
	{
		let validator = jsonschema::validator_for(schema)
			.map_err(|err| Error::InvalidSchema { message: err.to_string() })?;
		let user_prompt = with_schema(user_prompt, schema)?;
		let base = vec![Turn::system(system_prompt), Turn::user(&user_prompt)];
		let mut turns = base.clone();
		let mut last_output = String::new();

		for attempt in 1..=self.cfg.retries {
			let raw = self.provider.complete(self.llm, &turns).await?;
			let output = strip_fences(&raw);
			let rejection = match serde_json::from_str::<Value>(&output) {
				Ok(value) => {
					let violations = validator
						.iter_errors(&value)
						.map(|err| err.to_string())
						.collect::<Vec<_>>();

					if violations.is_empty() {
						match check(&value) {
							Ok(checked) => {
								tracing::debug!(attempt, "Model output accepted.");

								return Ok(checked);
							},
							Err(err) => format!("The JSON was rejected: {err}"),
						}
					} else {
						format!("The JSON does not follow the schema: {}", violations.join("; "))
					}
				},
				Err(err) => format!("The response is not valid JSON: {err}"),
			};

			tracing::warn!(
				attempt,
				retries = self.cfg.retries,
				error = %rejection,
				"Model output rejected."
			);

			turns = base.clone();
			turns.push(Turn::model(std::slice::from_ref(&output)));
			turns.push(Turn::user(&corrective_prompt(&rejection)));
			last_output = output;
		}

		tokio::fs::write(&self.cfg.failure_file, last_output.as_bytes()).await?;
		tracing::error!(
			attempts = self.cfg.retries,
			path = %self.cfg.failure_file.display(),
			"Model never produced schema-valid JSON."
		);

		Err(Error::GenerationExhausted {
			attempts: self.cfg.retries,
			path: self.cfg.failure_file.clone(),
		})
	}
}

/// Returns the body of a Markdown code fence, or the trimmed text when it is not fenced.
pub fn strip_fences(text: &str) -> String {
	let trimmed = text.trim();
	let Ok(fenced) = FENCED.as_ref() else {
		return trimmed.to_string();
	};

	fenced
		.captures(trimmed)
		.and_then(|captures| captures.get(1))
		.map_or(trimmed, |body| body.as_str())
		.trim()
		.to_string()
}

fn with_schema(user_prompt: &[String], schema: &Value) -> Result<Vec<String>> {
	let mut lines = user_prompt.to_vec();

	lines.push(String::new());
	lines.push(
		"Your response must be a JSON Markdown block validated with the schema:".to_string(),
	);
	lines.push("```json".to_string());
	lines.push(serde_json::to_string_pretty(schema)?);
	lines.push("```".to_string());

	Ok(lines)
}

fn corrective_prompt(rejection: &str) -> Vec<String> {
	vec![
		"Your previous response could not be used:".to_string(),
		"```text".to_string(),
		rejection.to_string(),
		"```".to_string(),
		"Return the corrected JSON only, following the same schema.".to_string(),
	]
}
