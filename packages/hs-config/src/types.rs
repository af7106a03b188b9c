use std::path::PathBuf;

use serde::Deserialize;
use serde_json::{Map, Value};

#[derive(Debug, Deserialize)]
pub struct Config {
	pub service: Service,
	pub storage: Storage,
	pub providers: Providers,
	#[serde(default)]
	pub generator: Generator,
	pub auditor: Auditor,
}

#[derive(Debug, Deserialize)]
pub struct Service {
	pub log_level: String,
}

#[derive(Debug, Deserialize)]
pub struct Storage {
	pub postgres: Postgres,
	pub files: Files,
}

#[derive(Debug, Deserialize)]
pub struct Postgres {
	pub dsn: String,
	pub pool_max_conns: u32,
}

#[derive(Debug, Deserialize)]
pub struct Files {
	/// Directory holding one sub-directory per case for the file-backed auditor.
	pub root: PathBuf,
}

#[derive(Debug, Deserialize)]
pub struct Providers {
	pub llm: LlmProviderConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LlmProviderConfig {
	/// Vendor label recorded as provenance on generated notes, rubrics and scores.
	pub provider_id: String,
	pub api_base: String,
	pub api_key: String,
	pub path: String,
	pub model: String,
	pub temperature: f32,
	pub timeout_ms: u64,
	#[serde(default)]
	pub default_headers: Map<String, Value>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Generator {
	#[serde(default = "default_retries")]
	pub retries: u32,
	/// Receives the last model output when every attempt failed.
	#[serde(default = "default_failure_file")]
	pub failure_file: PathBuf,
}
impl Default for Generator {
	fn default() -> Self {
		Self { retries: default_retries(), failure_file: default_failure_file() }
	}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditorMode {
	Db,
	File,
}
impl AuditorMode {
	pub fn as_str(self) -> &'static str {
		match self {
			Self::Db => "db",
			Self::File => "file",
		}
	}
}

#[derive(Debug, Deserialize)]
pub struct Auditor {
	pub mode: AuditorMode,
}

fn default_retries() -> u32 {
	3
}

fn default_failure_file() -> PathBuf {
	PathBuf::from("invalid_output.json")
}
