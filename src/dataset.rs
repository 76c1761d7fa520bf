use mongodb::bson::oid::ObjectId;
use serde::{Deserialize, Serialize};

pub const SALES_COLLECTION: &str = "sales";
pub const CUSTOMERS_COLLECTION: &str = "customers";

/// One sales transaction. `total_value` is stored as given and never
/// recomputed from `quantity * price`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sale {
	#[serde(rename = "_id")]
	pub id: ObjectId,
	pub date: String,
	pub product: String,
	pub category: String,
	pub quantity: i32,
	pub price: f64,
	pub customer_id: String,
	pub region: String,
	pub total_value: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Customer {
	#[serde(rename = "_id")]
	pub id: String,
	pub name: String,
	pub email: String,
	pub age: i32,
	pub city: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct Dataset {
	pub sales: Vec<Sale>,
	pub customers: Vec<Customer>,
}

impl Dataset {
	pub fn sample() -> Self {
		Self {
			sales: sample_sales(),
			customers: sample_customers(),
		}
	}

	pub fn sale(&self, date: &str, product: &str) -> Option<&Sale> {
		self.sales
			.iter()
			.find(|s| s.date == date && s.product == product)
	}
}

#[allow(clippy::too_many_arguments)]
fn sale(
	date: &str,
	product: &str,
	category: &str,
	quantity: i32,
	price: f64,
	customer_id: &str,
	region: &str,
	total_value: f64,
) -> Sale {
	Sale {
		id: ObjectId::new(),
		date: date.to_string(),
		product: product.to_string(),
		category: category.to_string(),
		quantity,
		price,
		customer_id: customer_id.to_string(),
		region: region.to_string(),
		total_value,
	}
}

fn customer(id: &str, name: &str, email: &str, age: i32, city: &str) -> Customer {
	Customer {
		id: id.to_string(),
		name: name.to_string(),
		email: email.to_string(),
		age,
		city: city.to_string(),
	}
}

pub fn sample_sales() -> Vec<Sale> {
	vec![
		sale("2024-01-15", "Laptop", "Electronics", 2, 1200.00, "C001", "North", 2400.00),
		sale("2024-01-16", "Phone", "Electronics", 1, 800.00, "C002", "South", 800.00),
		sale("2024-01-17", "Tablet", "Electronics", 3, 500.00, "C003", "East", 1500.00),
	]
}

pub fn sample_customers() -> Vec<Customer> {
	vec![
		customer("C001", "Alice Johnson", "alice@example.com", 28, "New York"),
		customer("C002", "Bob Smith", "bob@example.com", 34, "Miami"),
		customer("C003", "Carol Davis", "carol@example.com", 29, "Boston"),
	]
}

#[cfg(test)]
mod tests {
	use std::collections::BTreeSet;

	use mongodb::bson;

	use super::*;

	#[test]
	fn sample_holds_three_sales_and_three_customers() {
		let data = Dataset::sample();
		assert_eq!(data.sales.len(), 3);
		assert_eq!(data.customers.len(), 3);
	}

	#[test]
	fn laptop_total_is_the_literal() {
		let data = Dataset::sample();
		let laptop = data.sale("2024-01-15", "Laptop").expect("laptop sale exists");
		assert_eq!(laptop.quantity, 2);
		assert_eq!(laptop.price, 1200.00);
		assert_eq!(laptop.total_value, 2400.00);
	}

	#[test]
	fn every_sale_references_one_customer() {
		let data = Dataset::sample();
		let ids: BTreeSet<&str> = data.customers.iter().map(|c| c.id.as_str()).collect();
		assert_eq!(ids, BTreeSet::from(["C001", "C002", "C003"]));
		for sale in &data.sales {
			let matches = data
				.customers
				.iter()
				.filter(|c| c.id == sale.customer_id)
				.count();
			assert_eq!(matches, 1, "{} should resolve once", sale.customer_id);
		}
	}

	#[test]
	fn sale_ids_are_fresh_per_build() {
		let a = Dataset::sample();
		let b = Dataset::sample();
		let ids: BTreeSet<ObjectId> = a.sales.iter().chain(&b.sales).map(|s| s.id).collect();
		assert_eq!(ids.len(), 6);
	}

	#[test]
	fn documents_use_underscore_id_and_doubles() {
		let data = Dataset::sample();
		let sale = bson::to_document(&data.sales[1]).expect("sale serializes");
		assert!(sale.get_object_id("_id").is_ok());
		assert_eq!(sale.get_f64("total_value").expect("double"), 800.00);
		assert_eq!(sale.get_i32("quantity").expect("int"), 1);

		let customer = bson::to_document(&data.customers[0]).expect("customer serializes");
		assert_eq!(customer.get_str("_id").expect("string id"), "C001");
		assert!(!customer.contains_key("id"));
	}
}
