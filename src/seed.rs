use std::fmt;
use std::time::Instant;

use anyhow::{Context, Result};
use mongodb::{
	Database, IndexModel,
	bson::{Document, doc},
};
use serde::Serialize;
use time::{OffsetDateTime, format_description::well_known::Rfc3339};
use tracing::{debug, info, warn};

use crate::core::{namespace, ping};
use crate::dataset::{CUSTOMERS_COLLECTION, Customer, Dataset, SALES_COLLECTION, Sale};
use crate::error::SeedError;

pub const SALES_INDEX_FIELDS: [&str; 3] = ["customer_id", "date", "category"];

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SeedStep {
	SelectDatabase { database: String },
	InsertSales { count: usize },
	InsertCustomers { count: usize },
	CreateIndex { collection: String, field: String },
}

impl fmt::Display for SeedStep {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Self::SelectDatabase { database } => write!(f, "select database {database}"),
			Self::InsertSales { count } => {
				write!(f, "insert {count} documents into {SALES_COLLECTION}")
			}
			Self::InsertCustomers { count } => {
				write!(f, "insert {count} documents into {CUSTOMERS_COLLECTION}")
			}
			Self::CreateIndex { collection, field } => {
				write!(f, "create index {collection}.{}", index_name(field))
			}
		}
	}
}

pub fn seed_plan(database: &str, dataset: &Dataset) -> Vec<SeedStep> {
	let mut plan = vec![
		SeedStep::SelectDatabase {
			database: database.to_string(),
		},
		SeedStep::InsertSales {
			count: dataset.sales.len(),
		},
		SeedStep::InsertCustomers {
			count: dataset.customers.len(),
		},
	];
	plan.extend(SALES_INDEX_FIELDS.iter().map(|field| SeedStep::CreateIndex {
		collection: SALES_COLLECTION.to_string(),
		field: field.to_string(),
	}));
	plan
}

pub fn index_name(field: &str) -> String {
	format!("{field}_1")
}

pub fn ascending_index(field: &str) -> IndexModel {
	IndexModel::builder().keys(doc! { field: 1 }).build()
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StepOutcome {
	Selected,
	Inserted(usize),
	IndexCreated(String),
}

impl fmt::Display for StepOutcome {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Self::Selected => f.write_str("ok"),
			Self::Inserted(n) => write!(f, "inserted {n}"),
			Self::IndexCreated(name) => write!(f, "created {name}"),
		}
	}
}

#[derive(Debug, Clone, Serialize)]
pub struct StepReport {
	pub step: SeedStep,
	pub outcome: String,
	pub duration_ms: u128,
}

#[derive(Debug, Clone, Serialize)]
pub struct SeedReport {
	pub database: String,
	pub started_at: String,
	pub finished_at: String,
	pub duration_ms: u128,
	pub sales_inserted: usize,
	pub customers_inserted: usize,
	pub indexes_created: Vec<String>,
	pub steps: Vec<StepReport>,
}

/// Runs the whole plan against `db`. Stops at the first failing step;
/// earlier steps stay committed.
pub async fn run_seed(db: &Database, dataset: &Dataset) -> Result<SeedReport> {
	let started_at = OffsetDateTime::now_utc();
	let run_start = Instant::now();

	let plan = seed_plan(db.name(), dataset);
	let outcomes = execute_plan(db, dataset, &plan).await?;

	let mut report = SeedReport {
		database: db.name().to_string(),
		started_at: started_at.format(&Rfc3339)?,
		finished_at: String::new(),
		duration_ms: 0,
		sales_inserted: 0,
		customers_inserted: 0,
		indexes_created: Vec::new(),
		steps: Vec::with_capacity(outcomes.len()),
	};

	for (step, outcome, duration_ms) in outcomes {
		match (&step, &outcome) {
			(SeedStep::InsertSales { .. }, StepOutcome::Inserted(n)) => report.sales_inserted = *n,
			(SeedStep::InsertCustomers { .. }, StepOutcome::Inserted(n)) => {
				report.customers_inserted = *n
			}
			(_, StepOutcome::IndexCreated(name)) => report.indexes_created.push(name.clone()),
			_ => {}
		}
		report.steps.push(StepReport {
			step,
			outcome: outcome.to_string(),
			duration_ms,
		});
	}

	report.finished_at = OffsetDateTime::now_utc()
		.format(&Rfc3339)
		.context("formatting finish time")?;
	report.duration_ms = run_start.elapsed().as_millis();
	Ok(report)
}

pub async fn execute_plan(
	db: &Database,
	dataset: &Dataset,
	plan: &[SeedStep],
) -> Result<Vec<(SeedStep, StepOutcome, u128)>, SeedError> {
	let mut done = Vec::with_capacity(plan.len());
	for step in plan {
		let start = Instant::now();
		debug!(%step, "starting");
		match execute_step(db, dataset, step).await {
			Ok(outcome) => {
				info!(%step, %outcome, "step complete");
				done.push((step.clone(), outcome, start.elapsed().as_millis()));
			}
			Err(source) => {
				let err = SeedError::classify(db.name(), step.to_string(), source);
				if err.is_duplicate_key() {
					warn!(%step, "duplicate key: {} looks already seeded", db.name());
				}
				return Err(err);
			}
		}
	}
	Ok(done)
}

async fn execute_step(
	db: &Database,
	dataset: &Dataset,
	step: &SeedStep,
) -> Result<StepOutcome, mongodb::error::Error> {
	match step {
		SeedStep::SelectDatabase { .. } => {
			ping(db).await?;
			Ok(StepOutcome::Selected)
		}
		SeedStep::InsertSales { .. } => {
			let result = db
				.collection::<Sale>(SALES_COLLECTION)
				.insert_many(&dataset.sales)
				.await?;
			Ok(StepOutcome::Inserted(result.inserted_ids.len()))
		}
		SeedStep::InsertCustomers { .. } => {
			let result = db
				.collection::<Customer>(CUSTOMERS_COLLECTION)
				.insert_many(&dataset.customers)
				.await?;
			Ok(StepOutcome::Inserted(result.inserted_ids.len()))
		}
		SeedStep::CreateIndex { collection, field } => {
			debug!(ns = %namespace(db, collection), %field, "creating ascending index");
			let result = db
				.collection::<Document>(collection)
				.create_index(ascending_index(field))
				.await?;
			Ok(StepOutcome::IndexCreated(result.index_name))
		}
	}
}

pub fn render_dry_run(plan: &[SeedStep], dataset: &Dataset) -> Result<String> {
	let mut out = String::new();
	for (i, step) in plan.iter().enumerate() {
		out.push_str(&format!("DRY RUN: step {}: would {step}\n", i + 1));
	}
	let docs = serde_json::to_string_pretty(dataset).context("serializing dataset")?;
	out.push_str(&docs);
	out.push('\n');
	Ok(out)
}
