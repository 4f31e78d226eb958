//! Bank transaction ingestion.
//!
//! Reads the exported bank CSV into [`ledgerlens_core::TransactionRow`]
//! values with minimal interpretation: fields stay raw strings or plain
//! floats so the matching pipeline controls all normalization.

pub mod csv;

pub use crate::csv::{read_transactions, read_transactions_file, CsvError};
