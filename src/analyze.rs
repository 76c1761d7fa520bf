use anyhow::{Context, Result};
use futures_util::TryStreamExt;
use mongodb::{
	Database,
	bson::{self, Document, doc},
};
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use time::{OffsetDateTime, format_description::well_known::Rfc3339};

use crate::core::namespace;
use crate::dataset::SALES_COLLECTION;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategorySummary {
	#[serde(rename = "_id")]
	pub category: String,
	pub total_orders: i64,
	pub total_quantity: i64,
	pub total_revenue: f64,
	pub avg_price: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegionSummary {
	#[serde(rename = "_id")]
	pub region: String,
	pub orders_count: i64,
	pub total_revenue: f64,
	pub avg_order_value: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct AnalysisReport {
	pub database: String,
	pub analyzed_at: String,
	pub categories: Vec<CategorySummary>,
	pub regions: Vec<RegionSummary>,
}

pub fn category_pipeline() -> Vec<Document> {
	vec![
		doc! {
			"$group": {
				"_id": "$category",
				"total_orders": { "$sum": 1 },
				"total_quantity": { "$sum": "$quantity" },
				"total_revenue": { "$sum": "$total_value" },
				"avg_price": { "$avg": "$price" },
			}
		},
		doc! { "$sort": { "_id": 1 } },
	]
}

pub fn region_pipeline() -> Vec<Document> {
	vec![
		doc! {
			"$group": {
				"_id": "$region",
				"orders_count": { "$sum": 1 },
				"total_revenue": { "$sum": "$total_value" },
				"avg_order_value": { "$avg": "$total_value" },
			}
		},
		doc! { "$sort": { "_id": 1 } },
	]
}

async fn aggregate<T: DeserializeOwned>(
	db: &Database,
	pipeline: Vec<Document>,
	label: &str,
) -> Result<Vec<T>> {
	let ns = namespace(db, SALES_COLLECTION);
	let rows: Vec<Document> = db
		.collection::<Document>(SALES_COLLECTION)
		.aggregate(pipeline)
		.await
		.with_context(|| format!("aggregating {label} on {ns}"))?
		.try_collect()
		.await
		.with_context(|| format!("reading {label} results from {ns}"))?;

	rows.into_iter()
		.map(|row| bson::from_document(row).with_context(|| format!("decoding {label} row")))
		.collect()
}

pub async fn run_analysis(db: &Database) -> Result<AnalysisReport> {
	let categories = aggregate(db, category_pipeline(), "category analysis").await?;
	let regions = aggregate(db, region_pipeline(), "regional analysis").await?;
	Ok(AnalysisReport {
		database: db.name().to_string(),
		analyzed_at: OffsetDateTime::now_utc().format(&Rfc3339)?,
		categories,
		regions,
	})
}
