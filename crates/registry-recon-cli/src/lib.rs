//! Batch runner for registry-recon connectors.
//!
//! Reads JSON-lines input rows, runs one connector over them and writes one
//! JSON line per input row.

pub mod batch;
pub mod error;
pub mod input;
pub mod params;

pub use batch::{run_batch, BatchSummary, RowReport};
pub use error::{CliError, CliResult};
