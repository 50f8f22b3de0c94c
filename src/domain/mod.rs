//! Domain validation, input parsing and status classification

pub mod classifier;
pub mod input;
pub mod validator;

// Re-export main functionality
pub use classifier::{classify_results, StatusClassifier};
pub use input::{parse_base_names, parse_tlds, Submission};
pub use validator::{DomainValidator, ValidatedDomain};

/// TLDs checked when none are given
pub const POPULAR_TLDS: &[&str] = &["com", "net", "org", "io"];
