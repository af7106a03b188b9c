pub mod auditor;
pub mod grading;
pub mod rubric;
pub mod synthetic;
pub mod synthetic_json;

mod error;

pub use auditor::{AuditStore, Auditor, file::FileAuditStore, postgres::PostgresAuditStore};
pub use error::{Error, Result};
pub use grading::GradeReport;
pub use synthetic::{SyntheticCase, SyntheticSession};
pub use synthetic_json::JsonGenerator;

use std::{future::Future, pin::Pin, sync::Arc};

use hs_config::{Config, LlmProviderConfig};
use hs_providers::chat::{self, Turn};

pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

pub trait ChatProvider
where
	Self: Send + Sync,
{
	fn complete<'a>(
		&'a self,
		cfg: &'a LlmProviderConfig,
		turns: &'a [Turn],
	) -> BoxFuture<'a, color_eyre::Result<String>>;
}

/// Everything the LLM-driven operations share: configuration and the chat seam.
pub struct EvalService {
	pub cfg: Config,
	pub provider: Arc<dyn ChatProvider>,
	pub code_version: String,
}
impl EvalService {
	pub fn new(cfg: Config, code_version: impl Into<String>) -> Self {
		Self::with_provider(cfg, Arc::new(DefaultChatProvider), code_version)
	}

	pub fn with_provider(
		cfg: Config,
		provider: Arc<dyn ChatProvider>,
		code_version: impl Into<String>,
	) -> Self {
		Self { cfg, provider, code_version: code_version.into() }
	}

	pub fn generator(&self) -> JsonGenerator<'_> {
		JsonGenerator::new(self.provider.as_ref(), &self.cfg.providers.llm, &self.cfg.generator)
	}
}

pub struct DefaultChatProvider;
impl ChatProvider for DefaultChatProvider {
	fn complete<'a>(
		&'a self,
		cfg: &'a LlmProviderConfig,
		turns: &'a [Turn],
	) -> BoxFuture<'a, color_eyre::Result<String>> {
		Box::pin(chat::complete(cfg, turns))
	}
}
