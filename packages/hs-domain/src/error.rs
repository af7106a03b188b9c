pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
	#[error("Malformed {label} document at {cycle}: {message}")]
	MalformedDocument { label: String, cycle: String, message: String },
	#[error("Invalid questionnaire: {message}")]
	InvalidQuestionnaire { message: String },
	#[error("Invalid rubric: {message}")]
	InvalidRubric { message: String },
	#[error("Invalid grading: {message}")]
	InvalidGrading { message: String },
}
