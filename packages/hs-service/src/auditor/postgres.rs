use serde_json::{Map, Value, json};
use uuid::Uuid;

use hs_config::LlmProviderConfig;
use hs_domain::{case::ValidationStatus, cycle::Label};
use hs_storage::{
	db::Db,
	models::{NewCase, NewGeneratedNote, NoteOutcome},
	queries,
};

use crate::{BoxFuture, Result, auditor::AuditStore};

/// Transcripts live on the case row so several generation attempts can share them; every other
/// label lives on this store's generated note row.
pub struct PostgresAuditStore {
	db: Db,
	case_id: Uuid,
	generated_note_id: Uuid,
}
impl PostgresAuditStore {
	/// Creates the case if needed and always starts a new generated note for this session.
	pub async fn open(
		db: Db,
		case: &str,
		llm: &LlmProviderConfig,
		code_version: &str,
	) -> Result<Self> {
		let tags = json!({});
		let case_id = queries::upsert_case(
			&db,
			&NewCase {
				name: case,
				validation_status: ValidationStatus::Generation,
				batch_identifier: "",
				tags: &tags,
			},
		)
		.await?;
		let generated_note_id = queries::insert_generated_note(
			&db,
			&NewGeneratedNote {
				case_id,
				text_llm_vendor: &llm.provider_id,
				text_llm_name: &llm.model,
				code_version,
			},
		)
		.await?;

		tracing::info!(%case, %case_id, %generated_note_id, "Opened Postgres audit store.");

		Ok(Self { db, case_id, generated_note_id })
	}

	/// Reads an existing generated note, for summaries of past sessions.
	pub async fn attach(db: Db, case: &str, generated_note_id: Option<Uuid>) -> Result<Self> {
		let Some(stored) = queries::get_case_by_name(&db, case).await? else {
			return Err(crate::Error::NotFound { message: format!("case {case}") });
		};
		let generated_note_id = match generated_note_id {
			Some(id) => id,
			None => queries::latest_generated_note_id(&db, stored.case_id).await?.ok_or_else(
				|| crate::Error::NotFound { message: format!("generated note for case {case}") },
			)?,
		};

		Ok(Self { db, case_id: stored.case_id, generated_note_id })
	}
}
impl AuditStore for PostgresAuditStore {
	fn upsert_json<'a>(
		&'a self,
		label: Label,
		content: &'a Map<String, Value>,
	) -> BoxFuture<'a, Result<()>> {
		Box::pin(async move {
			if label.is_case_level() {
				queries::update_case_transcript(&self.db, self.case_id, content).await?;
			} else {
				queries::update_generated_note_document(
					&self.db,
					self.generated_note_id,
					label,
					content,
				)
				.await?;
			}

			Ok(())
		})
	}

	fn get_json<'a>(&'a self, label: Label) -> BoxFuture<'a, Result<Map<String, Value>>> {
		Box::pin(async move {
			let document = if label.is_case_level() {
				queries::get_case_transcript(&self.db, self.case_id).await?
			} else {
				queries::get_generated_note_document(&self.db, self.generated_note_id, label).await?
			};

			Ok(document)
		})
	}

	fn upsert_audio<'a>(&'a self, label: &'a str, audio: &'a [u8]) -> BoxFuture<'a, Result<()>> {
		Box::pin(async move {
			// TODO: store audio chunks once the schema has a place for binary case data.
			tracing::debug!(label, bytes = audio.len(), "Audio chunk accepted but not stored.");

			Ok(())
		})
	}

	fn finalize<'a>(&'a self, outcome: &'a NoteOutcome) -> BoxFuture<'a, Result<()>> {
		Box::pin(async move {
			queries::finalize_generated_note(&self.db, self.generated_note_id, outcome).await?;

			Ok(())
		})
	}

	fn case_id(&self) -> String {
		self.case_id.to_string()
	}

	fn generated_note_id(&self) -> Uuid {
		self.generated_note_id
	}
}
