use mongodb::error::{Error as DriverError, ErrorKind, WriteFailure};
use thiserror::Error;

const DUPLICATE_KEY: i32 = 11000;

#[derive(Debug, Error)]
pub enum SeedError {
	#[error("cannot reach database {database} during `{step}`")]
	Connectivity {
		database: String,
		step: String,
		#[source]
		source: DriverError,
	},
	#[error("`{step}` was rejected by {database}")]
	Write {
		database: String,
		step: String,
		#[source]
		source: DriverError,
	},
}

impl SeedError {
	pub fn classify(database: &str, step: impl Into<String>, source: DriverError) -> Self {
		let database = database.to_string();
		let step = step.into();
		if is_connectivity(&source) {
			Self::Connectivity {
				database,
				step,
				source,
			}
		} else {
			Self::Write {
				database,
				step,
				source,
			}
		}
	}

	pub fn step(&self) -> &str {
		match self {
			Self::Connectivity { step, .. } | Self::Write { step, .. } => step,
		}
	}

	pub fn is_duplicate_key(&self) -> bool {
		match self {
			Self::Write { source, .. } => duplicate_key(source),
			Self::Connectivity { .. } => false,
		}
	}
}

fn is_connectivity(err: &DriverError) -> bool {
	matches!(
		*err.kind,
		ErrorKind::ServerSelection { .. }
			| ErrorKind::DnsResolve { .. }
			| ErrorKind::ConnectionPoolCleared { .. }
			| ErrorKind::Io(_)
	)
}

fn duplicate_key(err: &DriverError) -> bool {
	match &*err.kind {
		ErrorKind::InsertMany(e) => e
			.write_errors
			.as_ref()
			.is_some_and(|errs| errs.iter().any(|w| w.code == DUPLICATE_KEY)),
		ErrorKind::Write(WriteFailure::WriteError(e)) => e.code == DUPLICATE_KEY,
		ErrorKind::Command(e) => e.code == DUPLICATE_KEY,
		_ => false,
	}
}

#[cfg(test)]
mod tests {
	use std::io;

	use mongodb::bson::{self, doc};
	use mongodb::error::CommandError;

	use super::*;

	#[test]
	fn refused_connection_is_connectivity() {
		let source = DriverError::from(io::Error::from(io::ErrorKind::ConnectionRefused));
		let err = SeedError::classify("bigdata", "insert 3 documents into sales", source);
		assert!(matches!(err, SeedError::Connectivity { .. }), "{err:?}");
		assert!(!err.is_duplicate_key());
		assert_eq!(err.step(), "insert 3 documents into sales");
	}

	#[test]
	fn undecodable_document_is_a_write_failure() {
		let decode = bson::from_document::<crate::dataset::Customer>(doc! { "_id": 1 })
			.expect_err("customer without fields should not decode");
		let err = SeedError::classify("bigdata", "create index sales.date_1", DriverError::from(decode));
		assert!(matches!(err, SeedError::Write { .. }), "{err:?}");
		assert!(!err.is_duplicate_key());
	}

	#[test]
	fn duplicate_key_command_error_is_detected() {
		let command: CommandError = bson::from_document(doc! {
			"code": DUPLICATE_KEY,
			"codeName": "DuplicateKey",
			"errmsg": "E11000 duplicate key error collection: bigdata.customers",
		})
		.expect("command error should decode");
		let source = DriverError::from(ErrorKind::Command(command));
		let err = SeedError::classify("bigdata", "insert 3 documents into customers", source);
		assert!(matches!(err, SeedError::Write { .. }), "{err:?}");
		assert!(err.is_duplicate_key());
	}
}
