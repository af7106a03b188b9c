#![allow(dead_code)]

use std::{
	collections::VecDeque,
	path::PathBuf,
	sync::{Mutex, MutexGuard},
};

use serde_json::{Map, Value};

use hs_config::{Generator, LlmProviderConfig};
use hs_domain::instruction::{Command, Instruction, InstructionWithCommand};
use hs_providers::chat::Turn;
use hs_service::{BoxFuture, ChatProvider};

/// Replays canned model outputs and records every request.
pub struct ScriptedProvider {
	responses: Mutex<VecDeque<String>>,
	fallback: String,
	requests: Mutex<Vec<Vec<Turn>>>,
}
impl ScriptedProvider {
	pub fn new(responses: &[&str]) -> Self {
		Self::with_fallback(responses, "")
	}

	pub fn with_fallback(responses: &[&str], fallback: &str) -> Self {
		Self {
			responses: Mutex::new(responses.iter().map(|r| r.to_string()).collect()),
			fallback: fallback.to_string(),
			requests: Mutex::new(Vec::new()),
		}
	}

	pub fn requests(&self) -> MutexGuard<'_, Vec<Vec<Turn>>> {
		self.requests.lock().expect("Request log poisoned.")
	}
}
impl ChatProvider for ScriptedProvider {
	fn complete<'a>(
		&'a self,
		_: &'a LlmProviderConfig,
		turns: &'a [Turn],
	) -> BoxFuture<'a, color_eyre::Result<String>> {
		Box::pin(async move {
			self.requests().push(turns.to_vec());

			let next = self.responses.lock().expect("Responses poisoned.").pop_front();

			Ok(next.unwrap_or_else(|| self.fallback.clone()))
		})
	}
}

pub fn llm_config() -> LlmProviderConfig {
	LlmProviderConfig {
		provider_id: "openai".to_string(),
		api_base: "http://127.0.0.1:9".to_string(),
		api_key: "test-key".to_string(),
		path: "/v1/chat/completions".to_string(),
		model: "gpt-4o".to_string(),
		temperature: 0.0,
		timeout_ms: 1_000,
		default_headers: Map::new(),
	}
}

pub fn generator_config(retries: u32, failure_file: PathBuf) -> Generator {
	Generator { retries, failure_file }
}

pub fn instruction(uuid: &str, index: u32, kind: &str, information: &str) -> Instruction {
	Instruction {
		uuid: uuid.to_string(),
		index,
		instruction: kind.to_string(),
		information: information.to_string(),
		is_new: true,
		is_updated: false,
	}
}

pub fn with_command(
	instruction: Instruction,
	class: &str,
	attributes: Value,
) -> InstructionWithCommand {
	let attributes = match attributes {
		Value::Object(map) => map,
		_ => Map::new(),
	};

	InstructionWithCommand {
		instruction,
		parameters: Map::new(),
		command: Command { module: "commands".to_string(), class: class.to_string(), attributes },
	}
}
