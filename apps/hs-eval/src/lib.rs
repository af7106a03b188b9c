use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use color_eyre::eyre;
use serde::Serialize;
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

use hs_config::{AuditorMode, Config};
use hs_service::{
	AuditStore, Auditor, EvalService, FileAuditStore, PostgresAuditStore, SyntheticSession,
	synthetic,
};
use hs_storage::db::Db;

#[derive(Debug, Parser)]
#[command(
	version = hs_cli::VERSION,
	rename_all = "kebab",
	styles = hs_cli::styles(),
)]
pub struct Args {
	#[arg(long, short = 'c', value_name = "FILE")]
	pub config: PathBuf,
	#[command(subcommand)]
	pub command: Command,
}

#[derive(Debug, Subcommand)]
#[command(rename_all = "kebab")]
pub enum Command {
	/// Print the note assembled from a case's audit trail.
	Summarize(SummarizeArgs),
	/// Generate and store a grading rubric for a case.
	Rubric(RubricArgs),
	/// Grade a generated note against a rubric.
	Grade(GradeArgs),
	/// Generate batches of synthetic cases.
	Cases(CasesArgs),
}

#[derive(Debug, clap::Args)]
#[command(rename_all = "kebab")]
pub struct SummarizeArgs {
	#[arg(long, value_name = "NAME")]
	pub case: String,
	/// Defaults to `auditor.mode` from the config.
	#[arg(long, value_enum)]
	pub mode: Option<Mode>,
	/// Generated note to read in db mode; the latest one when omitted.
	#[arg(long, value_name = "UUID")]
	pub note: Option<Uuid>,
	/// Write an HTML page instead of printing JSON.
	#[arg(long)]
	pub html: bool,
}

#[derive(Debug, clap::Args)]
#[command(rename_all = "kebab")]
pub struct RubricArgs {
	#[arg(long, value_name = "NAME")]
	pub case: String,
	#[arg(long, default_value = "llm")]
	pub author: String,
}

#[derive(Debug, clap::Args)]
#[command(rename_all = "kebab")]
pub struct GradeArgs {
	#[arg(long, value_name = "UUID")]
	pub rubric: Uuid,
	#[arg(long, value_name = "UUID")]
	pub note: Uuid,
	#[arg(long, short = 'o', value_name = "FILE")]
	pub output: Option<PathBuf>,
}

#[derive(Debug, clap::Args)]
#[command(rename_all = "kebab")]
pub struct CasesArgs {
	#[arg(long, value_name = "N", default_value_t = 1)]
	pub batches: u32,
	#[arg(long, value_name = "N", default_value_t = 5)]
	pub batch_size: u32,
	#[arg(long)]
	pub category: String,
	/// Defaults to `auditor.mode` from the config.
	#[arg(long, value_enum)]
	pub mode: Option<Mode>,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
pub enum Mode {
	Db,
	File,
}
impl From<Mode> for AuditorMode {
	fn from(mode: Mode) -> Self {
		match mode {
			Mode::Db => Self::Db,
			Mode::File => Self::File,
		}
	}
}

#[derive(Debug, Serialize)]
struct GeneratedCase {
	name: String,
	batch_identifier: String,
	#[serde(skip_serializing_if = "Option::is_none")]
	case_id: Option<Uuid>,
}

pub async fn run(args: Args) -> color_eyre::Result<()> {
	let cfg = hs_config::load(&args.config)?;
	let filter = EnvFilter::new(cfg.service.log_level.clone());

	tracing_subscriber::fmt().with_env_filter(filter).init();

	match args.command {
		Command::Summarize(args) => summarize(cfg, args).await,
		Command::Rubric(args) => rubric(cfg, args).await,
		Command::Grade(args) => grade(cfg, args).await,
		Command::Cases(args) => cases(cfg, args).await,
	}
}

async fn summarize(cfg: Config, args: SummarizeArgs) -> color_eyre::Result<()> {
	let mode = args.mode.map(AuditorMode::from).unwrap_or(cfg.auditor.mode);
	let store: Box<dyn AuditStore> = match mode {
		AuditorMode::Db => {
			let db = connect(&cfg).await?;

			Box::new(PostgresAuditStore::attach(db, &args.case, args.note).await?)
		},
		AuditorMode::File =>
			Box::new(FileAuditStore::attach(&cfg.storage.files.root, &args.case).await?),
	};

	tracing::info!(case = %args.case, mode = mode.as_str(), "Summarizing case.");

	let auditor = Auditor::new(store, &args.case, 1);

	if args.html {
		let path = auditor.generate_html_summary().await?;

		println!("{}", path.display());

		return Ok(());
	}

	let summary = auditor.summarized_generated_commands().await?;

	println!("{}", serde_json::to_string_pretty(&summary)?);

	Ok(())
}

async fn rubric(cfg: Config, args: RubricArgs) -> color_eyre::Result<()> {
	let db = connect(&cfg).await?;
	let service = EvalService::new(cfg, hs_cli::CODE_VERSION);
	let rubric_id = service.generate_rubric(&db, &args.case, &args.author).await?;

	println!("{}", serde_json::json!({ "case": args.case, "rubric_id": rubric_id }));

	Ok(())
}

async fn grade(cfg: Config, args: GradeArgs) -> color_eyre::Result<()> {
	let db = connect(&cfg).await?;
	let service = EvalService::new(cfg, hs_cli::CODE_VERSION);
	let report = service.grade_note(&db, args.rubric, args.note).await?;
	let json = serde_json::to_string_pretty(&report)?;

	match &args.output {
		Some(path) => {
			tokio::fs::write(path, format!("{json}\n")).await?;
			tracing::info!(path = %path.display(), "Wrote grading report.");
		},
		None => println!("{json}"),
	}

	Ok(())
}

async fn cases(cfg: Config, args: CasesArgs) -> color_eyre::Result<()> {
	if args.batches == 0 || args.batch_size == 0 {
		return Err(eyre::eyre!("--batches and --batch-size must be greater than zero."));
	}

	let mode = args.mode.map(AuditorMode::from).unwrap_or(cfg.auditor.mode);
	let db = match mode {
		AuditorMode::Db => Some(connect(&cfg).await?),
		AuditorMode::File => None,
	};
	let root = cfg.storage.files.root.clone();
	let service = EvalService::new(cfg, hs_cli::CODE_VERSION);
	let mut session = SyntheticSession::new(&service, args.category.as_str());
	let mut generated = Vec::new();

	for batch in 1..=args.batches {
		let cases = session.generate_batch(batch, args.batch_size as usize).await?;

		for case in cases {
			let saved = match &db {
				Some(db) => synthetic::save_case_db(db, &case).await.map(Some),
				None => synthetic::save_case_files(&root, &case).await.map(|()| None),
			};
			let case_id = match saved {
				Ok(case_id) => case_id,
				Err(hs_service::Error::InvalidRequest { message }) => {
					tracing::warn!(case = %case.name, %message, "Skipped synthetic case.");

					continue;
				},
				Err(err) => return Err(err.into()),
			};

			generated.push(GeneratedCase {
				name: case.name,
				batch_identifier: case.batch_identifier,
				case_id,
			});
		}

		tracing::info!(batch, total = generated.len(), "Stored synthetic batch.");
	}

	println!("{}", serde_json::to_string_pretty(&generated)?);

	Ok(())
}

async fn connect(cfg: &Config) -> color_eyre::Result<Db> {
	if cfg.storage.postgres.dsn.trim().is_empty() {
		return Err(eyre::eyre!("storage.postgres.dsn is required for this command."));
	}

	let db = Db::connect(&cfg.storage.postgres).await?;

	db.ensure_schema().await?;

	Ok(db)
}
