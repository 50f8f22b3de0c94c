//! Integration tests for domain-grid

use async_trait::async_trait;
use domain_grid::{
    domain::{classify_results, parse_base_names, parse_tlds},
    run::view::{self, available_domains},
    CheckConfig, CheckOrchestrator, DnsQueryResult, DnsResolver, DohProvider, DomainGridError,
    DomainStatus, DomainValidator, RecordType, RowFilter, SortKey, SortState, StatusClassifier,
    Submission, MAX_COMBINATIONS,
};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Notify;

/// Answers from a fixed table: names starting with "taken" resolve, "flaky"
/// fails at Cloudflare, "slow" waits for the gate, everything else is NXDOMAIN.
#[derive(Default)]
struct TableResolver {
    calls: AtomicUsize,
    gate: Arc<Notify>,
}

#[async_trait]
impl DnsResolver for TableResolver {
    async fn query(&self, provider: &DohProvider, domain: &str, record_type: RecordType) -> DnsQueryResult {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if domain.starts_with("slow") {
            self.gate.notified().await;
        }
        if domain.starts_with("taken") {
            return DnsQueryResult::status(provider, record_type, 0, 1);
        }
        if domain.starts_with("flaky") && provider.name == "Cloudflare" {
            return DnsQueryResult::failed(provider, record_type, "HTTP 503");
        }
        DnsQueryResult::status(provider, record_type, 3, 0)
    }
}

fn config() -> CheckConfig {
    CheckConfig::default()
        .with_flush_interval(Duration::from_millis(10))
        .with_max_concurrency(8)
}

#[test]
fn test_validator_public_api() {
    let validator = DomainValidator::new();
    assert!(validator.is_valid_base_name("my-brand"));
    assert!(!validator.is_valid_base_name("-bad"));
    assert!(validator.is_valid_tld("co.uk"));
    assert!(!validator.is_valid_tld("123"));

    let ok = validator.validate_full_domain("my-brand.co.uk").unwrap();
    assert_eq!(ok.full_domain, "my-brand.co.uk");
    assert!(validator.validate_full_domain("a..com").is_err());
}

#[test]
fn test_submission_from_free_text() {
    let names = parse_base_names("alpha, beta\ngamma beta");
    let tlds = parse_tlds("com, .io");
    let submission = Submission::prepare(&names, &tlds, MAX_COMBINATIONS).unwrap();

    assert_eq!(submission.combination_count(), 6);
    let domains: Vec<String> = submission.combinations().iter().map(|c| c.full_domain()).collect();
    assert_eq!(domains[..2], ["alpha.com".to_string(), "alpha.io".to_string()]);
}

#[test]
fn test_classification_rules() {
    let cf = DohProvider::cloudflare();
    let google = DohProvider::google();

    let taken = classify_results(&[
        DnsQueryResult::status(&cf, RecordType::A, 3, 0),
        DnsQueryResult::status(&google, RecordType::NS, 0, 2),
    ]);
    assert_eq!(taken.status, DomainStatus::Taken);

    let available = classify_results(&[
        DnsQueryResult::status(&cf, RecordType::A, 3, 0),
        DnsQueryResult::status(&google, RecordType::A, 3, 0),
    ]);
    assert_eq!(available.status, DomainStatus::Available);

    let ambiguous = classify_results(&[
        DnsQueryResult::status(&cf, RecordType::A, 3, 0),
        DnsQueryResult::status(&google, RecordType::A, 2, 0),
    ]);
    assert_eq!(ambiguous.status, DomainStatus::Taken);
    assert!(ambiguous.reason.unwrap().contains("Ambiguous"));
}

#[tokio::test]
async fn test_classifier_skips_network_for_invalid_domain() {
    let resolver = Arc::new(TableResolver::default());
    let classifier = StatusClassifier::new(resolver.clone(), &config());

    let outcome = classifier.classify("-bad.com").await;
    assert_eq!(outcome.status, DomainStatus::Invalid);
    assert_eq!(resolver.calls.load(Ordering::SeqCst), 0);

    let outcome = classifier.classify("flaky.com").await;
    assert_eq!(outcome.status, DomainStatus::Taken);
    assert!(outcome.reason.unwrap().contains("HTTP 503"));
}

#[tokio::test]
async fn test_end_to_end_grid() {
    let resolver = Arc::new(TableResolver::default());
    let orchestrator = CheckOrchestrator::with_resolver(config(), resolver.clone());

    let handle = orchestrator
        .start(["bolo", "takenco", "flaky", "-nope"], ["com", "io"])
        .unwrap();
    assert_eq!(handle.submission().rejected_base_names, vec!["-nope"]);
    assert_eq!(handle.total_checks(), 6);

    let report = handle.wait().await.unwrap();
    assert_eq!(report.counts.available, 2);
    assert_eq!(report.counts.taken, 4);
    assert_eq!(resolver.calls.load(Ordering::SeqCst), 6 * 4);

    let rows = orchestrator.snapshot();
    let names: Vec<&str> = rows.iter().map(|r| r.base_name.as_str()).collect();
    assert_eq!(names, vec!["bolo", "takenco", "flaky"]);
    assert_eq!(available_domains(&rows), vec!["bolo.com", "bolo.io"]);

    let filter = RowFilter {
        has_available: true,
        ..Default::default()
    };
    assert_eq!(filter.apply(&rows).len(), 1);

    let mut sorted = rows.clone();
    SortState::new(SortKey::Tld("com".to_string())).sort(&mut sorted);
    assert_eq!(sorted[0].base_name, "bolo");

    let summary = view::summarize(&rows, orchestrator.progress().as_ref());
    assert!(summary.starts_with("6 combinations: 2 available, 4 taken, 0 invalid"));
}

#[tokio::test]
async fn test_unchanged_rows_keep_identity() {
    let resolver = Arc::new(TableResolver::default());
    let gate = resolver.gate.clone();
    let orchestrator = CheckOrchestrator::with_resolver(config(), resolver);
    let mut revisions = orchestrator.subscribe();

    let handle = orchestrator.start(["fast", "slow"], ["com"]).unwrap();

    let before = tokio::time::timeout(Duration::from_secs(5), async {
        loop {
            let rows = orchestrator.snapshot();
            if rows[0].cells[0].status == DomainStatus::Available {
                return rows;
            }
            revisions.changed().await.unwrap();
        }
    })
    .await
    .expect("fast row should settle");
    assert_eq!(before[1].cells[0].status, DomainStatus::Checking);

    let releaser = tokio::spawn(async move {
        loop {
            gate.notify_waiters();
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    });
    handle.wait().await.unwrap();
    releaser.abort();

    let after = orchestrator.snapshot();
    assert!(Arc::ptr_eq(&before[0], &after[0]));
    assert!(!Arc::ptr_eq(&before[1], &after[1]));
    assert_eq!(after[1].cells[0].status, DomainStatus::Available);
}

#[tokio::test]
async fn test_oversized_submission_is_rejected() {
    let resolver = Arc::new(TableResolver::default());
    let orchestrator = CheckOrchestrator::with_resolver(config().with_max_combinations(10), resolver.clone());

    let names: Vec<String> = (0..4).map(|i| format!("name{}", i)).collect();
    let err = orchestrator.start(&names, ["com", "net", "org"]).err().unwrap();
    assert!(matches!(err, DomainGridError::TooManyCombinations { count: 12, limit: 10 }));
    assert!(err.is_input_error());
    assert_eq!(resolver.calls.load(Ordering::SeqCst), 0);
}

#[test]
fn test_export_writes_available_domains() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("out.txt");

    let written = view::export_available(&[], &path).unwrap();
    assert_eq!(written, 0);
    assert_eq!(std::fs::read_to_string(&path).unwrap(), "");
}

#[test]
fn test_library_initialization() {
    assert!(domain_grid::init().is_ok());
    assert!(!domain_grid::VERSION.is_empty());
}
