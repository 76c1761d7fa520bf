use std::collections::BTreeSet;

use anyhow::{Context, Result};
use futures_util::TryStreamExt;
use mongodb::{
	Database, IndexModel,
	bson::{Bson, doc},
};
use serde::Serialize;
use time::{OffsetDateTime, format_description::well_known::Rfc3339};

use crate::core::namespace;
use crate::dataset::{CUSTOMERS_COLLECTION, Customer, Dataset, SALES_COLLECTION, Sale};
use crate::seed::SALES_INDEX_FIELDS;

const PRIMARY_INDEX: &str = "_id_";

#[derive(Debug, Clone, PartialEq)]
pub struct IndexSummary {
	pub name: String,
	/// Key fields with their direction; non-numeric directions (text, hashed) map to 0.
	pub keys: Vec<(String, i64)>,
}

impl IndexSummary {
	pub fn from_model(model: &IndexModel) -> Self {
		let name = model
			.options
			.as_ref()
			.and_then(|o| o.name.clone())
			.unwrap_or_default();
		let keys = model
			.keys
			.iter()
			.map(|(field, dir)| (field.clone(), direction(dir)))
			.collect();
		Self { name, keys }
	}

	fn ascending_field(&self) -> Option<&str> {
		match self.keys.as_slice() {
			[(field, 1)] => Some(field.as_str()),
			_ => None,
		}
	}
}

fn direction(value: &Bson) -> i64 {
	match value {
		Bson::Int32(n) => i64::from(*n),
		Bson::Int64(n) => *n,
		Bson::Double(f) => *f as i64,
		_ => 0,
	}
}

#[derive(Debug, Clone, Default)]
pub struct Snapshot {
	pub sales: Vec<Sale>,
	pub customers: Vec<Customer>,
	pub sales_indexes: Vec<IndexSummary>,
}

pub async fn take_snapshot(db: &Database) -> Result<Snapshot> {
	let existing = db
		.list_collection_names()
		.await
		.with_context(|| format!("listing collections of {}", db.name()))?;

	let sales_ns = namespace(db, SALES_COLLECTION);
	let sales: Vec<Sale> = db
		.collection::<Sale>(SALES_COLLECTION)
		.find(doc! {})
		.await
		.with_context(|| format!("reading {sales_ns}"))?
		.try_collect()
		.await
		.with_context(|| format!("decoding {sales_ns}"))?;

	let customers_ns = namespace(db, CUSTOMERS_COLLECTION);
	let customers: Vec<Customer> = db
		.collection::<Customer>(CUSTOMERS_COLLECTION)
		.find(doc! {})
		.await
		.with_context(|| format!("reading {customers_ns}"))?
		.try_collect()
		.await
		.with_context(|| format!("decoding {customers_ns}"))?;

	// listIndexes fails with NamespaceNotFound on a missing collection.
	let sales_indexes = if existing.iter().any(|c| c == SALES_COLLECTION) {
		let models: Vec<IndexModel> = db
			.collection::<Sale>(SALES_COLLECTION)
			.list_indexes()
			.await
			.with_context(|| format!("listing indexes of {sales_ns}"))?
			.try_collect()
			.await
			.with_context(|| format!("decoding indexes of {sales_ns}"))?;
		models.iter().map(IndexSummary::from_model).collect()
	} else {
		Vec::new()
	};

	Ok(Snapshot {
		sales,
		customers,
		sales_indexes,
	})
}

#[derive(Debug, Clone, Serialize)]
pub struct CheckReport {
	pub name: String,
	pub passed: bool,
	pub message: String,
}

impl CheckReport {
	fn new(name: &str, passed: bool, message: impl Into<String>) -> Self {
		Self {
			name: name.to_string(),
			passed,
			message: message.into(),
		}
	}
}

#[derive(Debug, Clone, Serialize)]
pub struct VerifyReport {
	pub database: String,
	pub checked_at: String,
	pub checks_total: usize,
	pub checks_failed: usize,
	pub checks: Vec<CheckReport>,
}

pub async fn run_verify(db: &Database, expected: &Dataset) -> Result<VerifyReport> {
	let snapshot = take_snapshot(db).await?;
	let checks = run_checks(&snapshot, expected);
	Ok(VerifyReport {
		database: db.name().to_string(),
		checked_at: OffsetDateTime::now_utc().format(&Rfc3339)?,
		checks_total: checks.len(),
		checks_failed: checks.iter().filter(|c| !c.passed).count(),
		checks,
	})
}

pub fn run_checks(snapshot: &Snapshot, expected: &Dataset) -> Vec<CheckReport> {
	vec![
		check_count("sales_count", snapshot.sales.len(), expected.sales.len()),
		check_count(
			"customers_count",
			snapshot.customers.len(),
			expected.customers.len(),
		),
		check_sale_totals(snapshot, expected),
		check_sale_customers(snapshot, expected),
		check_sales_indexes(snapshot),
	]
}

fn check_count(name: &str, got: usize, want: usize) -> CheckReport {
	CheckReport::new(
		name,
		got == want,
		format!("expected {want} documents, found {got}"),
	)
}

fn check_sale_totals(snapshot: &Snapshot, expected: &Dataset) -> CheckReport {
	let mut problems = Vec::new();
	for sale in &snapshot.sales {
		match expected.sale(&sale.date, &sale.product) {
			None => problems.push(format!("unexpected sale {} {}", sale.date, sale.product)),
			Some(want) if want.total_value != sale.total_value => problems.push(format!(
				"{} {}: total_value {} != {}",
				sale.date, sale.product, sale.total_value, want.total_value
			)),
			Some(_) => {}
		}
	}

	if problems.is_empty() {
		CheckReport::new(
			"sale_totals_match_literals",
			true,
			format!("{} sales carry their literal total_value", snapshot.sales.len()),
		)
	} else {
		CheckReport::new("sale_totals_match_literals", false, problems.join("; "))
	}
}

fn check_sale_customers(snapshot: &Snapshot, expected: &Dataset) -> CheckReport {
	let known: BTreeSet<&str> = expected.customers.iter().map(|c| c.id.as_str()).collect();
	let dangling: Vec<String> = snapshot
		.sales
		.iter()
		.filter_map(|sale| {
			let hits = snapshot
				.customers
				.iter()
				.filter(|c| c.id == sale.customer_id)
				.count();
			if !known.contains(sale.customer_id.as_str()) {
				Some(format!("{} (not a sample customer)", sale.customer_id))
			} else {
				(hits != 1).then(|| format!("{} ({} matches)", sale.customer_id, hits))
			}
		})
		.collect();

	if dangling.is_empty() {
		CheckReport::new(
			"sale_customers_resolve",
			true,
			"every customer_id resolves to one sample customer",
		)
	} else {
		CheckReport::new(
			"sale_customers_resolve",
			false,
			format!("unresolved customer_id: {}", dangling.join(", ")),
		)
	}
}

fn check_sales_indexes(snapshot: &Snapshot) -> CheckReport {
	let secondary: Vec<&IndexSummary> = snapshot
		.sales_indexes
		.iter()
		.filter(|idx| idx.name != PRIMARY_INDEX)
		.collect();
	let ascending: BTreeSet<&str> = secondary
		.iter()
		.filter_map(|idx| idx.ascending_field())
		.collect();
	let wanted: BTreeSet<&str> = SALES_INDEX_FIELDS.iter().copied().collect();

	let found = secondary
		.iter()
		.map(|idx| idx.name.as_str())
		.collect::<Vec<_>>()
		.join(", ");
	let passed = secondary.len() == wanted.len() && ascending == wanted;
	CheckReport::new(
		"sales_indexes",
		passed,
		format!(
			"expected ascending indexes on {}, found [{found}]",
			SALES_INDEX_FIELDS.join(", ")
		),
	)
}

#[cfg(test)]
mod tests {
	use mongodb::bson::doc;

	use super::*;
	use crate::seed::ascending_index;

	fn summary(name: &str, keys: &[(&str, i64)]) -> IndexSummary {
		IndexSummary {
			name: name.to_string(),
			keys: keys.iter().map(|(k, d)| (k.to_string(), *d)).collect(),
		}
	}

	fn seeded() -> (Snapshot, Dataset) {
		let data = Dataset::sample();
		let snapshot = Snapshot {
			sales: data.sales.clone(),
			customers: data.customers.clone(),
			sales_indexes: vec![
				summary("_id_", &[("_id", 1)]),
				summary("customer_id_1", &[("customer_id", 1)]),
				summary("date_1", &[("date", 1)]),
				summary("category_1", &[("category", 1)]),
			],
		};
		(snapshot, data)
	}

	fn failed(checks: &[CheckReport]) -> Vec<&str> {
		checks
			.iter()
			.filter(|c| !c.passed)
			.map(|c| c.name.as_str())
			.collect()
	}

	#[test]
	fn seeded_snapshot_passes_every_check() {
		let (snapshot, data) = seeded();
		let checks = run_checks(&snapshot, &data);
		assert_eq!(checks.len(), 5);
		assert!(failed(&checks).is_empty(), "{checks:?}");
	}

	#[test]
	fn empty_database_fails_counts_and_indexes() {
		let data = Dataset::sample();
		let checks = run_checks(&Snapshot::default(), &data);
		assert_eq!(
			failed(&checks),
			vec!["sales_count", "customers_count", "sales_indexes"]
		);
	}

	#[test]
	fn duplicated_sales_fail_the_count() {
		let (mut snapshot, data) = seeded();
		snapshot.sales.extend(Dataset::sample().sales);
		let checks = run_checks(&snapshot, &data);
		assert_eq!(failed(&checks), vec!["sales_count"]);
	}

	#[test]
	fn totals_are_compared_to_literals_not_recomputed() {
		let (mut snapshot, data) = seeded();
		snapshot.sales[0].total_value = 2399.99;
		let checks = run_checks(&snapshot, &data);
		assert_eq!(failed(&checks), vec!["sale_totals_match_literals"]);
		let msg = &checks[2].message;
		assert!(msg.contains("Laptop"), "{msg}");
	}

	#[test]
	fn dangling_customer_is_reported() {
		let (mut snapshot, data) = seeded();
		snapshot.customers.retain(|c| c.id != "C002");
		let checks = run_checks(&snapshot, &data);
		assert_eq!(failed(&checks), vec!["customers_count", "sale_customers_resolve"]);
		assert!(checks[3].message.contains("C002 (0 matches)"));
	}

	#[test]
	fn sale_pointing_at_extra_customer_fails() {
		let (mut snapshot, data) = seeded();
		let mut stranger = snapshot.customers[0].clone();
		stranger.id = "C004".to_string();
		snapshot.customers.push(stranger);
		snapshot.sales[2].customer_id = "C004".to_string();
		let checks = run_checks(&snapshot, &data);
		assert_eq!(failed(&checks), vec!["customers_count", "sale_customers_resolve"]);
		assert!(checks[3].message.contains("C004 (not a sample customer)"));
	}

	#[test]
	fn descending_or_extra_indexes_fail() {
		let (mut snapshot, data) = seeded();
		snapshot.sales_indexes[2] = summary("date_-1", &[("date", -1)]);
		assert_eq!(failed(&run_checks(&snapshot, &data)), vec!["sales_indexes"]);

		let (mut snapshot, data) = seeded();
		snapshot
			.sales_indexes
			.push(summary("region_1", &[("region", 1)]));
		assert_eq!(failed(&run_checks(&snapshot, &data)), vec!["sales_indexes"]);

		let (mut snapshot, data) = seeded();
		snapshot.sales_indexes[1] =
			summary("customer_id_1_date_1", &[("customer_id", 1), ("date", 1)]);
		assert_eq!(failed(&run_checks(&snapshot, &data)), vec!["sales_indexes"]);
	}

	#[test]
	fn summary_reads_keys_and_name_from_model() {
		let model = ascending_index("category");
		let got = IndexSummary::from_model(&model);
		assert_eq!(got.keys, vec![("category".to_string(), 1)]);
		assert_eq!(got.name, "");

		let text = IndexModel::builder().keys(doc! { "product": "text" }).build();
		assert_eq!(IndexSummary::from_model(&text).ascending_field(), None);
	}
}
