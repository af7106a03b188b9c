use std::path::PathBuf;

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
	#[error("Invalid request: {message}")]
	InvalidRequest { message: String },
	#[error("Not found: {message}")]
	NotFound { message: String },
	#[error("Invalid schema: {message}")]
	InvalidSchema { message: String },
	#[error(
		"No schema-valid JSON after {attempts} attempts; last output written to {}.",
		path.display()
	)]
	GenerationExhausted { attempts: u32, path: PathBuf },
	#[error("Provider error: {message}")]
	Provider { message: String },
	#[error("Storage error: {message}")]
	Storage { message: String },
	#[error(transparent)]
	Domain(#[from] hs_domain::Error),
	#[error("Filesystem error: {0}")]
	Io(#[from] std::io::Error),
	#[error("JSON error: {0}")]
	Json(#[from] serde_json::Error),
}
impl From<color_eyre::Report> for Error {
	fn from(err: color_eyre::Report) -> Self {
		Self::Provider { message: err.to_string() }
	}
}

impl From<hs_storage::Error> for Error {
	fn from(err: hs_storage::Error) -> Self {
		match err {
			hs_storage::Error::Sqlx(inner) => Self::Storage { message: inner.to_string() },
			hs_storage::Error::InvalidArgument(message) => Self::InvalidRequest { message },
			hs_storage::Error::NotFound(message) => Self::NotFound { message },
		}
	}
}
