use std::time::Duration;

use color_eyre::Result;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::Error;

#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
	System,
	User,
	Model,
}
impl Role {
	fn as_wire(self) -> &'static str {
		match self {
			Self::System => "system",
			Self::User => "user",
			Self::Model => "assistant",
		}
	}
}

#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct Turn {
	pub role: Role,
	pub lines: Vec<String>,
}
impl Turn {
	pub fn new(role: Role, lines: Vec<String>) -> Self {
		Self { role, lines }
	}

	pub fn system(lines: &[String]) -> Self {
		Self::new(Role::System, lines.to_vec())
	}

	pub fn user(lines: &[String]) -> Self {
		Self::new(Role::User, lines.to_vec())
	}

	pub fn model(lines: &[String]) -> Self {
		Self::new(Role::Model, lines.to_vec())
	}
}

pub fn to_messages(turns: &[Turn]) -> Vec<Value> {
	turns
		.iter()
		.map(|turn| {
			serde_json::json!({
				"role": turn.role.as_wire(),
				"content": turn.lines.join("\n"),
			})
		})
		.collect()
}

/// Sends one chat completion request and returns the assistant text untouched.
pub async fn complete(cfg: &hs_config::LlmProviderConfig, turns: &[Turn]) -> Result<String> {
	let client = Client::builder().timeout(Duration::from_millis(cfg.timeout_ms)).build()?;
	let url = format!("{}{}", cfg.api_base, cfg.path);
	let body = serde_json::json!({
		"model": cfg.model,
		"temperature": cfg.temperature,
		"messages": to_messages(turns),
	});
	let res = client
		.post(&url)
		.headers(crate::auth_headers(&cfg.api_key, &cfg.default_headers)?)
		.json(&body)
		.send()
		.await?;
	let json: Value = res.error_for_status()?.json().await?;

	Ok(parse_completion_text(&json)?)
}

pub fn parse_completion_text(json: &Value) -> crate::Result<String> {
	json.get("choices")
		.and_then(|v| v.as_array())
		.and_then(|arr| arr.first())
		.and_then(|choice| choice.get("message"))
		.and_then(|msg| msg.get("content"))
		.and_then(|c| c.as_str())
		.map(str::to_string)
		.ok_or_else(|| Error::InvalidResponse {
			message: "Chat response is missing message content.".to_string(),
		})
}
