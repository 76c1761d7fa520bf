pub mod analyze;
pub mod config;
pub mod core;
pub mod dataset;
pub mod error;
pub mod report;
pub mod seed;
pub mod status;
pub mod verify;
