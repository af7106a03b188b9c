use serde_json::{Map, Value};
use time::OffsetDateTime;
use uuid::Uuid;

use hs_domain::cycle::Label;

use crate::{
	Error, Result,
	db::Db,
	models::{
		Case, GeneratedNote, NewCase, NewGeneratedNote, NewRubric, NewScore, NoteOutcome, Rubric,
		Score,
	},
};

/// Inserts the case or returns the id of the existing case with the same name, in one statement.
pub async fn upsert_case(db: &Db, case: &NewCase<'_>) -> Result<Uuid> {
	let now = OffsetDateTime::now_utc();
	let case_id: Uuid = sqlx::query_scalar(
		"\
INSERT INTO cases (
	case_id,
	name,
	validation_status,
	batch_identifier,
	tags,
	created_at,
	updated_at
)
VALUES ($1, $2, $3, $4, $5, $6, $6)
ON CONFLICT (name) DO UPDATE SET updated_at = cases.updated_at
RETURNING case_id",
	)
	.bind(Uuid::new_v4())
	.bind(case.name)
	.bind(case.validation_status.as_str())
	.bind(case.batch_identifier)
	.bind(case.tags)
	.bind(now)
	.fetch_one(&db.pool)
	.await?;

	Ok(case_id)
}

/// Inserts a case unless one with the same name exists; `None` means the name was taken.
pub async fn insert_case(db: &Db, case: &NewCase<'_>) -> Result<Option<Uuid>> {
	let now = OffsetDateTime::now_utc();
	let case_id: Option<Uuid> = sqlx::query_scalar(
		"\
INSERT INTO cases (
	case_id,
	name,
	validation_status,
	batch_identifier,
	tags,
	created_at,
	updated_at
)
VALUES ($1, $2, $3, $4, $5, $6, $6)
ON CONFLICT (name) DO NOTHING
RETURNING case_id",
	)
	.bind(Uuid::new_v4())
	.bind(case.name)
	.bind(case.validation_status.as_str())
	.bind(case.batch_identifier)
	.bind(case.tags)
	.bind(now)
	.fetch_optional(&db.pool)
	.await?;

	Ok(case_id)
}

pub async fn get_case_by_name(db: &Db, name: &str) -> Result<Option<Case>> {
	let case = sqlx::query_as::<_, Case>(
		"\
SELECT
	case_id,
	name,
	transcript,
	limited_chart,
	profile,
	validation_status,
	batch_identifier,
	tags,
	created_at,
	updated_at
FROM cases
WHERE name = $1",
	)
	.bind(name)
	.fetch_optional(&db.pool)
	.await?;

	Ok(case)
}

pub async fn update_case_chart(db: &Db, case_id: Uuid, limited_chart: &Value) -> Result<()> {
	let result =
		sqlx::query("UPDATE cases SET limited_chart = $1, updated_at = $2 WHERE case_id = $3")
			.bind(limited_chart)
			.bind(OffsetDateTime::now_utc())
			.bind(case_id)
			.execute(&db.pool)
			.await?;

	expect_row(result.rows_affected(), "case", case_id)
}

pub async fn update_case_profile(db: &Db, case_id: Uuid, profile: &str) -> Result<()> {
	let result = sqlx::query("UPDATE cases SET profile = $1, updated_at = $2 WHERE case_id = $3")
		.bind(profile)
		.bind(OffsetDateTime::now_utc())
		.bind(case_id)
		.execute(&db.pool)
		.await?;

	expect_row(result.rows_affected(), "case", case_id)
}

pub async fn get_case_transcript(db: &Db, case_id: Uuid) -> Result<Map<String, Value>> {
	let transcript: Option<Value> =
		sqlx::query_scalar("SELECT transcript FROM cases WHERE case_id = $1")
			.bind(case_id)
			.fetch_optional(&db.pool)
			.await?;

	Ok(into_document(transcript))
}

pub async fn update_case_transcript(
	db: &Db,
	case_id: Uuid,
	transcript: &Map<String, Value>,
) -> Result<()> {
	let result =
		sqlx::query("UPDATE cases SET transcript = $1, updated_at = $2 WHERE case_id = $3")
			.bind(sqlx::types::Json(transcript))
			.bind(OffsetDateTime::now_utc())
			.bind(case_id)
			.execute(&db.pool)
			.await?;

	expect_row(result.rows_affected(), "case", case_id)
}

/// New notes start as failed so a run that dies before finalizing never reads as a success.
pub async fn insert_generated_note(db: &Db, note: &NewGeneratedNote<'_>) -> Result<Uuid> {
	let now = OffsetDateTime::now_utc();
	let generated_note_id = Uuid::new_v4();

	sqlx::query(
		"\
INSERT INTO generated_notes (
	generated_note_id,
	case_id,
	failed,
	text_llm_vendor,
	text_llm_name,
	code_version,
	created_at,
	updated_at
)
VALUES ($1, $2, TRUE, $3, $4, $5, $6, $6)",
	)
	.bind(generated_note_id)
	.bind(note.case_id)
	.bind(note.text_llm_vendor)
	.bind(note.text_llm_name)
	.bind(note.code_version)
	.bind(now)
	.execute(&db.pool)
	.await?;

	Ok(generated_note_id)
}

pub async fn get_generated_note(
	db: &Db,
	generated_note_id: Uuid,
) -> Result<Option<GeneratedNote>> {
	let note = sqlx::query_as::<_, GeneratedNote>(
		"\
SELECT
	generated_note_id,
	case_id,
	cycle_count,
	note_json,
	failed,
	errors,
	text_llm_vendor,
	text_llm_name,
	code_version,
	created_at,
	updated_at
FROM generated_notes
WHERE generated_note_id = $1",
	)
	.bind(generated_note_id)
	.fetch_optional(&db.pool)
	.await?;

	Ok(note)
}

pub async fn latest_generated_note_id(db: &Db, case_id: Uuid) -> Result<Option<Uuid>> {
	let generated_note_id = sqlx::query_scalar(
		"\
SELECT generated_note_id
FROM generated_notes
WHERE case_id = $1
ORDER BY created_at DESC
LIMIT 1",
	)
	.bind(case_id)
	.fetch_optional(&db.pool)
	.await?;

	Ok(generated_note_id)
}

pub async fn get_generated_note_document(
	db: &Db,
	generated_note_id: Uuid,
	label: Label,
) -> Result<Map<String, Value>> {
	let column = note_column(label)?;
	let sql = format!("SELECT {column} FROM generated_notes WHERE generated_note_id = $1");
	let document: Option<Value> = sqlx::query_scalar(sql.as_str())
		.bind(generated_note_id)
		.fetch_optional(&db.pool)
		.await?;

	Ok(into_document(document))
}

pub async fn update_generated_note_document(
	db: &Db,
	generated_note_id: Uuid,
	label: Label,
	document: &Map<String, Value>,
) -> Result<()> {
	let column = note_column(label)?;
	let sql = format!(
		"UPDATE generated_notes SET {column} = $1, updated_at = $2 WHERE generated_note_id = $3"
	);
	let result = sqlx::query(sql.as_str())
		.bind(sqlx::types::Json(document))
		.bind(OffsetDateTime::now_utc())
		.bind(generated_note_id)
		.execute(&db.pool)
		.await?;

	expect_row(result.rows_affected(), "generated note", generated_note_id)
}

pub async fn finalize_generated_note(
	db: &Db,
	generated_note_id: Uuid,
	outcome: &NoteOutcome,
) -> Result<()> {
	let cycle_count = i32::try_from(outcome.cycle_count).map_err(|_| {
		Error::InvalidArgument(format!("Cycle count {} is out of range.", outcome.cycle_count))
	})?;
	let result = sqlx::query(
		"\
UPDATE generated_notes
SET
	cycle_count = $1,
	note_json = $2,
	failed = $3,
	errors = $4,
	updated_at = $5
WHERE generated_note_id = $6",
	)
	.bind(cycle_count)
	.bind(&outcome.note_json)
	.bind(outcome.failed)
	.bind(&outcome.errors)
	.bind(OffsetDateTime::now_utc())
	.bind(generated_note_id)
	.execute(&db.pool)
	.await?;

	expect_row(result.rows_affected(), "generated note", generated_note_id)
}

pub async fn insert_rubric(db: &Db, rubric: &NewRubric<'_>) -> Result<Uuid> {
	let rubric_id = Uuid::new_v4();

	sqlx::query(
		"\
INSERT INTO rubrics (
	rubric_id,
	case_id,
	author,
	rubric,
	text_llm_vendor,
	text_llm_name,
	temperature,
	code_version,
	created_at
)
VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)",
	)
	.bind(rubric_id)
	.bind(rubric.case_id)
	.bind(rubric.author)
	.bind(rubric.rubric)
	.bind(rubric.text_llm_vendor)
	.bind(rubric.text_llm_name)
	.bind(rubric.temperature)
	.bind(rubric.code_version)
	.bind(OffsetDateTime::now_utc())
	.execute(&db.pool)
	.await?;

	Ok(rubric_id)
}

pub async fn get_rubric(db: &Db, rubric_id: Uuid) -> Result<Option<Rubric>> {
	let rubric = sqlx::query_as::<_, Rubric>(
		"\
SELECT
	rubric_id,
	case_id,
	author,
	rubric,
	text_llm_vendor,
	text_llm_name,
	temperature,
	code_version,
	created_at
FROM rubrics
WHERE rubric_id = $1",
	)
	.bind(rubric_id)
	.fetch_optional(&db.pool)
	.await?;

	Ok(rubric)
}

/// Scores are append-only; there is no update path.
pub async fn insert_score(db: &Db, score: &NewScore<'_>) -> Result<Uuid> {
	let score_id = Uuid::new_v4();

	sqlx::query(
		"\
INSERT INTO scores (
	score_id,
	rubric_id,
	generated_note_id,
	scoring_result,
	overall_score,
	text_llm_vendor,
	text_llm_name,
	temperature,
	code_version,
	created_at
)
VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)",
	)
	.bind(score_id)
	.bind(score.rubric_id)
	.bind(score.generated_note_id)
	.bind(score.scoring_result)
	.bind(score.overall_score)
	.bind(score.text_llm_vendor)
	.bind(score.text_llm_name)
	.bind(score.temperature)
	.bind(score.code_version)
	.bind(OffsetDateTime::now_utc())
	.execute(&db.pool)
	.await?;

	Ok(score_id)
}

pub async fn get_score(db: &Db, score_id: Uuid) -> Result<Option<Score>> {
	let score = sqlx::query_as::<_, Score>(
		"\
SELECT
	score_id,
	rubric_id,
	generated_note_id,
	scoring_result,
	overall_score,
	text_llm_vendor,
	text_llm_name,
	temperature,
	code_version,
	created_at
FROM scores
WHERE score_id = $1",
	)
	.bind(score_id)
	.fetch_optional(&db.pool)
	.await?;

	Ok(score)
}

pub fn note_column(label: Label) -> Result<&'static str> {
	if label.is_case_level() {
		return Err(Error::InvalidArgument(format!(
			"{label} is stored on the case, not the generated note."
		)));
	}

	Ok(label.as_str())
}

fn into_document(value: Option<Value>) -> Map<String, Value> {
	match value {
		Some(Value::Object(map)) => map,
		_ => Map::new(),
	}
}

fn expect_row(rows_affected: u64, kind: &str, id: Uuid) -> Result<()> {
	if rows_affected == 0 {
		return Err(Error::NotFound(format!("{kind} {id}")));
	}

	Ok(())
}
