use std::path::{Path, PathBuf};

use serde_json::{Map, Value, json};
use uuid::Uuid;

use hs_domain::cycle::Label;
use hs_storage::models::NoteOutcome;

use crate::{BoxFuture, Error, Result, auditor::AuditStore};

const AUDIO_DIR: &str = "audios";
const CASE_FILE: &str = "case.json";
const NOTE_FILE: &str = "generated_note.json";

/// Keeps one directory per case: a JSON file per label, audio chunks under `audios/` and the
/// note state in `generated_note.json`.
pub struct FileAuditStore {
	case_dir: PathBuf,
	case: String,
	generated_note_id: Uuid,
}
impl FileAuditStore {
	/// Starts a new session; the note is recorded as failed until it is finalized.
	///
	/// The files of the previous note are removed so the new note starts from an empty trail.
	/// Transcripts belong to the case and are kept.
	pub async fn open(root: &Path, case: &str) -> Result<Self> {
		let store = Self::create(root, case).await?;

		for label in Label::ALL.into_iter().filter(|label| !label.is_case_level()) {
			match tokio::fs::remove_file(store.label_path(label)).await {
				Ok(()) => tracing::debug!(%case, %label, "Cleared previous note document."),
				Err(err) if err.kind() == std::io::ErrorKind::NotFound => {},
				Err(err) => return Err(err.into()),
			}
		}

		store
			.write_document(
				&store.case_dir.join(NOTE_FILE),
				&json!({ "generated_note_id": store.generated_note_id, "failed": true }),
			)
			.await?;
		tracing::info!(%case, dir = %store.case_dir.display(), "Opened file audit store.");

		Ok(store)
	}

	/// Creates the case directory without starting a note.
	pub async fn create(root: &Path, case: &str) -> Result<Self> {
		let store = Self {
			case_dir: case_dir(root, case)?,
			case: case.to_string(),
			generated_note_id: Uuid::new_v4(),
		};

		tokio::fs::create_dir_all(store.case_dir.join(AUDIO_DIR)).await?;

		Ok(store)
	}

	/// Reads a case written by an earlier session without touching its note state.
	pub async fn attach(root: &Path, case: &str) -> Result<Self> {
		let case_dir = case_dir(root, case)?;

		if !tokio::fs::try_exists(&case_dir).await? {
			return Err(Error::NotFound {
				message: format!("case directory {}", case_dir.display()),
			});
		}

		let note_path = case_dir.join(NOTE_FILE);
		let generated_note_id = read_document(&note_path)
			.await
			.ok()
			.and_then(|note| {
				note.get("generated_note_id")
					.and_then(Value::as_str)
					.and_then(|raw| Uuid::parse_str(raw).ok())
			})
			.ok_or_else(|| Error::NotFound {
				message: format!("generated note id in {}", note_path.display()),
			})?;

		Ok(Self { case_dir, case: case.to_string(), generated_note_id })
	}

	pub fn case_dir(&self) -> &Path {
		&self.case_dir
	}

	/// Case-level fields that have no label of their own: profile, chart, tags.
	pub async fn write_case_document(&self, document: &Value) -> Result<()> {
		self.write_document(&self.case_dir.join(CASE_FILE), document).await
	}

	pub async fn has_case_document(&self) -> Result<bool> {
		Ok(tokio::fs::try_exists(self.case_dir.join(CASE_FILE)).await?)
	}

	fn label_path(&self, label: Label) -> PathBuf {
		self.case_dir.join(format!("{label}.json"))
	}

	async fn write_document(&self, path: &Path, document: &Value) -> Result<()> {
		let mut body = serde_json::to_vec_pretty(document)?;

		body.push(b'\n');
		tokio::fs::write(path, body).await?;

		Ok(())
	}
}
impl AuditStore for FileAuditStore {
	fn upsert_json<'a>(
		&'a self,
		label: Label,
		content: &'a Map<String, Value>,
	) -> BoxFuture<'a, Result<()>> {
		Box::pin(async move {
			self.write_document(&self.label_path(label), &Value::Object(content.clone())).await
		})
	}

	fn get_json<'a>(&'a self, label: Label) -> BoxFuture<'a, Result<Map<String, Value>>> {
		Box::pin(async move { read_document(&self.label_path(label)).await })
	}

	fn upsert_audio<'a>(&'a self, label: &'a str, audio: &'a [u8]) -> BoxFuture<'a, Result<()>> {
		Box::pin(async move {
			let path = self.case_dir.join(AUDIO_DIR).join(format!("{label}.mp3"));

			tokio::fs::write(&path, audio).await?;

			Ok(())
		})
	}

	fn finalize<'a>(&'a self, outcome: &'a NoteOutcome) -> BoxFuture<'a, Result<()>> {
		Box::pin(async move {
			let note = json!({
				"generated_note_id": self.generated_note_id,
				"cycle_count": outcome.cycle_count,
				"note_json": outcome.note_json,
				"failed": outcome.failed,
				"errors": outcome.errors,
			});

			self.write_document(&self.case_dir.join(NOTE_FILE), &note).await
		})
	}

	fn case_id(&self) -> String {
		self.case.clone()
	}

	fn generated_note_id(&self) -> Uuid {
		self.generated_note_id
	}
}

fn case_dir(root: &Path, case: &str) -> Result<PathBuf> {
	let trimmed = case.trim();

	if trimmed.is_empty() || trimmed.contains(['/', '\\']) || trimmed == "." || trimmed == ".." {
		return Err(Error::InvalidRequest {
			message: format!("Case name {case:?} cannot be used as a directory name."),
		});
	}

	Ok(root.join(trimmed))
}

async fn read_document(path: &Path) -> Result<Map<String, Value>> {
	let raw = match tokio::fs::read(path).await {
		Ok(raw) => raw,
		Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(Map::new()),
		Err(err) => return Err(err.into()),
	};

	match serde_json::from_slice::<Value>(&raw)? {
		Value::Object(map) => Ok(map),
		_ => Err(Error::InvalidRequest {
			message: format!("{} does not hold a JSON object.", path.display()),
		}),
	}
}
