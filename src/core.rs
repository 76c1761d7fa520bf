use std::time::Duration;

use mongodb::{
	Client, Database,
	bson::{Document, doc},
	options::ClientOptions,
};

use crate::config::DbCfg;

pub async fn create_mongo_client(cfg: &DbCfg) -> Result<Client, mongodb::error::Error> {
	let mut options = ClientOptions::parse(cfg.uri()).await?;
	options.app_name = Some(cfg.app_name().to_string());
	options.server_selection_timeout = Some(Duration::from_millis(cfg.server_selection_timeout_ms()));

	Client::with_options(options)
}

pub async fn ping(db: &Database) -> Result<Document, mongodb::error::Error> {
	db.run_command(doc! { "ping": 1 }).await
}

pub fn namespace(db: &Database, collection: &str) -> String {
	format!("{}.{}", db.name(), collection)
}
