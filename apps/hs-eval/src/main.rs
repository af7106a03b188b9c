// crates.io
use clap::Parser;
// self
use hs_eval::Args;

#[tokio::main]
async fn main() -> color_eyre::Result<()> {
	color_eyre::install()?;
	let args = Args::parse();
	hs_eval::run(args).await
}
