mod error;
mod types;

pub use error::{Error, Result};
pub use types::{
	Auditor, AuditorMode, Config, Files, Generator, LlmProviderConfig, Postgres, Providers,
	Service, Storage,
};

use std::{fs, path::Path};

pub fn load(path: &Path) -> Result<Config> {
	let raw = fs::read_to_string(path)
		.map_err(|err| Error::ReadConfig { path: path.to_path_buf(), source: err })?;

	let mut cfg: Config = toml::from_str(&raw)
		.map_err(|err| Error::ParseConfig { path: path.to_path_buf(), source: err })?;

	normalize(&mut cfg);

	validate(&cfg)?;

	Ok(cfg)
}

pub fn validate(cfg: &Config) -> Result<()> {
	if cfg.service.log_level.trim().is_empty() {
		return Err(Error::Validation {
			message: "service.log_level must be non-empty.".to_string(),
		});
	}
	if cfg.storage.postgres.pool_max_conns == 0 {
		return Err(Error::Validation {
			message: "storage.postgres.pool_max_conns must be greater than zero.".to_string(),
		});
	}
	if cfg.auditor.mode == crate::AuditorMode::Db && cfg.storage.postgres.dsn.trim().is_empty() {
		return Err(Error::Validation {
			message: "storage.postgres.dsn must be non-empty when auditor.mode is db.".to_string(),
		});
	}
	if cfg.storage.files.root.as_os_str().is_empty() {
		return Err(Error::Validation {
			message: "storage.files.root must be non-empty.".to_string(),
		});
	}
	if cfg.generator.retries == 0 {
		return Err(Error::Validation {
			message: "generator.retries must be greater than zero.".to_string(),
		});
	}
	if cfg.generator.failure_file.as_os_str().is_empty() {
		return Err(Error::Validation {
			message: "generator.failure_file must be non-empty.".to_string(),
		});
	}

	let llm = &cfg.providers.llm;

	for (label, value) in [
		("providers.llm.provider_id", &llm.provider_id),
		("providers.llm.api_base", &llm.api_base),
		("providers.llm.api_key", &llm.api_key),
		("providers.llm.model", &llm.model),
	] {
		if value.trim().is_empty() {
			return Err(Error::Validation { message: format!("{label} must be non-empty.") });
		}
	}

	if !llm.temperature.is_finite() || !(0.0..=2.0).contains(&llm.temperature) {
		return Err(Error::Validation {
			message: "providers.llm.temperature must be in the range 0.0-2.0.".to_string(),
		});
	}
	if llm.timeout_ms == 0 {
		return Err(Error::Validation {
			message: "providers.llm.timeout_ms must be greater than zero.".to_string(),
		});
	}

	for (key, value) in &llm.default_headers {
		if !value.is_string() {
			return Err(Error::Validation {
				message: format!("providers.llm.default_headers.{key} must be a string."),
			});
		}
	}

	Ok(())
}

fn normalize(cfg: &mut Config) {
	let llm = &mut cfg.providers.llm;

	llm.api_base = llm.api_base.trim_end_matches('/').to_string();

	if !llm.path.is_empty() && !llm.path.starts_with('/') {
		llm.path = format!("/{}", llm.path);
	}
}
