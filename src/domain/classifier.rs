//! Registration status classification from redundant DoH lookups

use std::sync::Arc;

use futures::future::join_all;

use crate::domain::DomainValidator;
use crate::resolver::{DnsQueryResult, DnsResolver};
use crate::types::{CheckConfig, CheckOutcome, DohProvider, RecordType};

/// Decides Available / Taken / Invalid for one full domain
pub struct StatusClassifier {
    resolver: Arc<dyn DnsResolver>,
    providers: Vec<DohProvider>,
    record_types: Vec<RecordType>,
    validator: DomainValidator,
}

impl StatusClassifier {
    pub fn new(resolver: Arc<dyn DnsResolver>, config: &CheckConfig) -> Self {
        Self {
            resolver,
            providers: config.providers.clone(),
            record_types: config.record_types.clone(),
            validator: DomainValidator::new(),
        }
    }

    /// Classify a domain. Never fails: problems become part of the verdict.
    pub async fn classify(&self, domain: &str) -> CheckOutcome {
        if let Err(e) = self.validator.validate_full_domain(domain) {
            tracing::debug!(domain = %domain, error = %e, "Skipping lookups for invalid domain");
            return CheckOutcome::invalid(validation_reason(&e));
        }

        let queries = self.providers.iter().flat_map(|provider| {
            self.record_types
                .iter()
                .map(move |record_type| self.resolver.query(provider, domain, *record_type))
        });
        let results = join_all(queries).await;

        let outcome = classify_results(&results);
        tracing::debug!(domain = %domain, status = %outcome.status, "Domain classified");
        outcome
    }
}

/// Reduce a complete result set to a verdict.
///
/// Any NOERROR means taken; unanimous NXDOMAIN means available; anything
/// else is ambiguous and reported as taken.
pub fn classify_results(results: &[DnsQueryResult]) -> CheckOutcome {
    let trail = results
        .iter()
        .map(DnsQueryResult::describe)
        .collect::<Vec<_>>()
        .join("; ");

    if results.iter().any(DnsQueryResult::is_noerror) {
        CheckOutcome::taken(trail)
    } else if !results.is_empty() && results.iter().all(DnsQueryResult::is_nxdomain) {
        CheckOutcome::available(trail)
    } else if trail.is_empty() {
        CheckOutcome::taken("Ambiguous, assuming taken: no lookups were made")
    } else {
        CheckOutcome::taken(format!("Ambiguous, assuming taken; {}", trail))
    }
}

fn validation_reason(err: &crate::error::DomainGridError) -> String {
    match err {
        crate::error::DomainGridError::Validation { message } => message.clone(),
        other => other.to_string(),
    }
}
