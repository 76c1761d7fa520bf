use std::path::PathBuf;

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use mongodb::Database;
use rust_dotenv::dotenv::DotEnv;
use tracing_subscriber::EnvFilter;

use bigdata_seed::{
	analyze::run_analysis,
	config::{DbCfg, check_server, connect},
	dataset::Dataset,
	report::{print_analysis_report, print_seed_report, print_verify_report, write_json_report},
	seed::{render_dry_run, run_seed, seed_plan},
	status::status,
	verify::run_verify,
};

#[derive(Parser, Debug)]
#[command(version, about = "Seed the bigdata MongoDB database with sample sales and customers")]
pub struct Cli {
	/// Increase output
	#[arg(short, long, global = true)]
	verbose: bool,

	/// Connection string, overrides MONGODB_URI
	#[arg(long, global = true)]
	uri: Option<String>,

	/// Logical database, overrides MONGODB_DATABASE
	#[arg(long, global = true)]
	database: Option<String>,

	#[command(subcommand)]
	command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
	/// Insert the sample sales and customers and index `sales`
	Seed {
		#[arg(long)]
		dry_run: bool,

		#[arg(long)]
		json_out: Option<PathBuf>,
	},
	/// Show document counts and index names
	Status,
	/// Check the database holds exactly the sample data and indexes
	Verify {
		#[arg(long)]
		json_out: Option<PathBuf>,
	},
	/// Aggregate sales by category and by region
	Analyze {
		#[arg(long)]
		json_out: Option<PathBuf>,
	},
	/// Check the server answers
	Ping,
}

fn load_env() -> DotEnv {
	// Load .env in CWD if present, ignore missing
	DotEnv::new("")
}

fn init_tracing(verbose: bool) {
	let default = if verbose { "debug" } else { "info" };
	tracing_subscriber::fmt()
		.with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default)))
		.with_writer(std::io::stderr)
		.with_target(false)
		.init();
}

#[tokio::main]
async fn main() -> Result<()> {
	let args = Cli::parse();
	init_tracing(args.verbose);

	let env = load_env();
	let cfg = DbCfg::from_env(&env)?.with_overrides(args.uri, args.database);

	match args.command {
		Commands::Seed { dry_run, json_out } => {
			let dataset = Dataset::sample();
			if dry_run {
				let plan = seed_plan(cfg.database(), &dataset);
				print!("{}", render_dry_run(&plan, &dataset)?);
				return Ok(());
			}

			let db = connect_from_cfg(&cfg).await?;
			let report = run_seed(&db, &dataset)
				.await
				.with_context(|| format!("seeding {} failed", cfg.database()))?;
			print_seed_report(&report);
			if let Some(path) = &json_out {
				write_json_report(path, &report)?;
			}
		}
		Commands::Status => {
			let db = connect_from_cfg(&cfg).await?;
			status(&db).await?;
		}
		Commands::Verify { json_out } => {
			let db = connect_from_cfg(&cfg).await?;
			let report = run_verify(&db, &Dataset::sample()).await?;
			print_verify_report(&report);
			if let Some(path) = &json_out {
				write_json_report(path, &report)?;
			}
			if report.checks_failed > 0 {
				bail!("{} checks failed", report.checks_failed);
			}
		}
		Commands::Analyze { json_out } => {
			let db = connect_from_cfg(&cfg).await?;
			let report = run_analysis(&db).await?;
			print_analysis_report(&report);
			if let Some(path) = &json_out {
				write_json_report(path, &report)?;
			}
		}
		Commands::Ping => match check_server(&cfg).await {
			Ok(()) => println!("MongoDB: UP"),
			Err(err) => {
				println!("MongoDB: DOWN");
				return Err(err);
			}
		},
	}

	Ok(())
}

async fn connect_from_cfg(cfg: &DbCfg) -> Result<Database> {
	tracing::debug!(database = cfg.database(), "connecting");
	connect(cfg).await
}
