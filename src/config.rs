use anyhow::{Context, Result};
use mongodb::Database;
use rust_dotenv::dotenv::DotEnv;

use crate::core::{create_mongo_client, ping};

pub const DEFAULT_URI: &str = "mongodb://localhost:27017";
pub const DEFAULT_DATABASE: &str = "bigdata";
pub const DEFAULT_APP_NAME: &str = "bigdata-seed";
pub const DEFAULT_SERVER_SELECTION_TIMEOUT_MS: u64 = 3_000;

#[derive(Debug, Clone)]
pub struct DbCfg {
	uri: String,
	database: String,
	app_name: String,
	server_selection_timeout_ms: u64,
}

impl DbCfg {
	pub fn from_env(env: &DotEnv) -> Result<Self> {
		Self::from_lookup(|key| env.get_var(key.to_string()))
	}

	pub fn from_lookup<F>(lookup: F) -> Result<Self>
	where
		F: Fn(&str) -> Option<String>,
	{
		let uri = lookup("MONGODB_URI").unwrap_or_else(|| DEFAULT_URI.to_string());

		let database =
			lookup("MONGODB_DATABASE").unwrap_or_else(|| DEFAULT_DATABASE.to_string());

		let app_name = lookup("MONGODB_APP_NAME").unwrap_or_else(|| DEFAULT_APP_NAME.to_string());

		let server_selection_timeout_ms = match lookup("MONGODB_SERVER_SELECTION_TIMEOUT_MS") {
			Some(raw) => raw.trim().parse::<u64>().with_context(|| {
				format!("MONGODB_SERVER_SELECTION_TIMEOUT_MS must be milliseconds, got {raw:?}")
			})?,
			None => DEFAULT_SERVER_SELECTION_TIMEOUT_MS,
		};

		Ok(Self {
			uri,
			database,
			app_name,
			server_selection_timeout_ms,
		})
	}

	pub fn with_overrides(mut self, uri: Option<String>, database: Option<String>) -> Self {
		if let Some(uri) = uri {
			self.uri = uri;
		}
		if let Some(database) = database {
			self.database = database;
		}
		self
	}

	pub fn uri(&self) -> &str {
		&self.uri
	}

	pub fn database(&self) -> &str {
		&self.database
	}

	pub fn app_name(&self) -> &str {
		&self.app_name
	}

	pub fn server_selection_timeout_ms(&self) -> u64 {
		self.server_selection_timeout_ms
	}
}

/// Builds a client and selects the configured database. The driver connects
/// lazily, so an unreachable server only shows up on the first command.
pub async fn connect(cfg: &DbCfg) -> Result<Database> {
	let client = create_mongo_client(cfg)
		.await
		.with_context(|| format!("Failed configuring client for database {}", cfg.database))?;

	Ok(client.database(&cfg.database))
}

/// Fails on anything between a malformed URI and a server that does not answer.
pub async fn check_server(cfg: &DbCfg) -> Result<()> {
	let db = connect(cfg).await?;
	ping(&db)
		.await
		.with_context(|| format!("ping {} failed", cfg.database))?;
	Ok(())
}
