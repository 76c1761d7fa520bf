use anyhow::{Context, Result};
use mongodb::{
	Database,
	bson::{Document, doc},
};

use crate::core::namespace;
use crate::dataset::{CUSTOMERS_COLLECTION, SALES_COLLECTION};

#[derive(Debug, Clone)]
pub struct CollectionStatus {
	pub name: String,
	pub exists: bool,
	pub documents: u64,
	pub indexes: Vec<String>,
}

pub async fn collect_status(db: &Database) -> Result<Vec<CollectionStatus>> {
	let existing = db
		.list_collection_names()
		.await
		.with_context(|| format!("listing collections of {}", db.name()))?;

	let mut out = Vec::new();
	for name in [SALES_COLLECTION, CUSTOMERS_COLLECTION] {
		if !existing.iter().any(|c| c == name) {
			out.push(CollectionStatus {
				name: name.to_string(),
				exists: false,
				documents: 0,
				indexes: Vec::new(),
			});
			continue;
		}

		let coll = db.collection::<Document>(name);
		let documents = coll
			.count_documents(doc! {})
			.await
			.with_context(|| format!("counting {}", namespace(db, name)))?;
		let indexes = coll
			.list_index_names()
			.await
			.with_context(|| format!("listing indexes of {}", namespace(db, name)))?;

		out.push(CollectionStatus {
			name: name.to_string(),
			exists: true,
			documents,
			indexes,
		});
	}
	Ok(out)
}

pub async fn status(db: &Database) -> Result<()> {
	let rows = collect_status(db).await?;

	println!("Database {}:", db.name());
	for row in rows {
		if row.exists {
			println!(
				"  {}: {} documents, indexes [{}]",
				row.name,
				row.documents,
				row.indexes.join(", ")
			);
		} else {
			println!("  {}: not created", row.name);
		}
	}
	Ok(())
}
