use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use serde::Serialize;

use crate::analyze::AnalysisReport;
use crate::seed::SeedReport;
use crate::verify::VerifyReport;

pub fn print_seed_report(report: &SeedReport) {
	println!("Seeded database {}:", report.database);
	println!("  sales inserted: {}", report.sales_inserted);
	println!("  customers inserted: {}", report.customers_inserted);
	println!("  indexes created: {}", report.indexes_created.join(", "));
	println!("  duration_ms: {}", report.duration_ms);
}

pub fn print_verify_report(report: &VerifyReport) {
	println!("Verify {}:", report.database);
	println!(
		"  checks: {} total, {} passed, {} failed",
		report.checks_total,
		report.checks_total - report.checks_failed,
		report.checks_failed
	);
	for check in &report.checks {
		let mark = if check.passed { "ok" } else { "FAIL" };
		println!("  {mark} {}: {}", check.name, check.message);
	}
}

pub fn print_analysis_report(report: &AnalysisReport) {
	println!("Sales by category ({}):", report.database);
	for row in &report.categories {
		println!(
			"  {}: {} orders, quantity {}, revenue {:.2}, avg price {:.2}",
			row.category, row.total_orders, row.total_quantity, row.total_revenue, row.avg_price
		);
	}
	println!("Sales by region ({}):", report.database);
	for row in &report.regions {
		println!(
			"  {}: {} orders, revenue {:.2}, avg order value {:.2}",
			row.region, row.orders_count, row.total_revenue, row.avg_order_value
		);
	}
}

pub fn write_json_report<T: Serialize>(path: &Path, report: &T) -> Result<()> {
	if let Some(parent) = path.parent() {
		fs::create_dir_all(parent)
			.with_context(|| format!("creating report directory {}", parent.display()))?;
	}
	let raw = serde_json::to_string_pretty(report).context("serializing report json")?;
	fs::write(path, format!("{raw}\n"))
		.with_context(|| format!("writing report file {}", path.display()))?;
	Ok(())
}
