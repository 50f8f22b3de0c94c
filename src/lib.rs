//! Domain Grid - bulk domain availability checking over DNS-over-HTTPS
//!
//! Takes a set of base names and a set of TLDs, checks every combination
//! against redundant DoH providers and keeps a live grid of verdicts.

pub mod domain;
pub mod error;
pub mod resolver;
pub mod run;
pub mod types;

// Re-export commonly used types
pub use error::{DomainGridError, Result};
pub use types::{
    CheckConfig, CheckOutcome, Combination, DohProvider, DomainStatus, GridCell, GridRow,
    ProgressSnapshot, RecordType, RunReport, StatusCounts, MAX_COMBINATIONS,
};

// Re-export main functionality
pub use domain::{DomainValidator, StatusClassifier, Submission};
pub use resolver::{DnsQueryResult, DnsResolver, DohClient};
pub use run::{CheckOrchestrator, RowFilter, RunHandle, SortKey, SortState};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Initialize the library
pub fn init() -> Result<()> {
    // Load .env file if it exists
    dotenv::dotenv().ok();
    Ok(())
}
