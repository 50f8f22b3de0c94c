//! Core types and structures for domain-grid

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::env;
use std::str::FromStr;
use std::time::Duration;

use crate::error::{DomainGridError, Result};

/// Hard ceiling on the size of one submission's cross product
pub const MAX_COMBINATIONS: usize = 50_000;

/// Registration status of one grid cell
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DomainStatus {
    Idle,
    Checking,
    Available,
    Taken,
    Invalid,
}

impl DomainStatus {
    /// Display priority used for sorting: Available < Checking < Idle < Invalid < Taken
    pub fn display_rank(self) -> u8 {
        match self {
            DomainStatus::Available => 0,
            DomainStatus::Checking => 1,
            DomainStatus::Idle => 2,
            DomainStatus::Invalid => 3,
            DomainStatus::Taken => 4,
        }
    }
}

impl std::fmt::Display for DomainStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DomainStatus::Idle => write!(f, "idle"),
            DomainStatus::Checking => write!(f, "checking"),
            DomainStatus::Available => write!(f, "available"),
            DomainStatus::Taken => write!(f, "taken"),
            DomainStatus::Invalid => write!(f, "invalid"),
        }
    }
}

/// DNS record type queried over DoH
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RecordType {
    A,
    NS,
}

impl RecordType {
    pub fn as_str(self) -> &'static str {
        match self {
            RecordType::A => "A",
            RecordType::NS => "NS",
        }
    }
}

impl std::fmt::Display for RecordType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A DNS-over-HTTPS endpoint speaking the JSON convention (`Status`, `Answer`)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DohProvider {
    pub name: String,
    pub url: String,
}

impl DohProvider {
    pub fn new(name: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            url: url.into(),
        }
    }

    pub fn cloudflare() -> Self {
        Self::new("Cloudflare", "https://cloudflare-dns.com/dns-query")
    }

    pub fn google() -> Self {
        Self::new("Google", "https://dns.google/resolve")
    }
}

impl FromStr for DohProvider {
    type Err = DomainGridError;

    /// Parse `name=url`
    fn from_str(s: &str) -> Result<Self> {
        let (name, url) = s
            .split_once('=')
            .ok_or_else(|| crate::config_error!("Expected name=url, got '{}'", s))?;
        let (name, url) = (name.trim(), url.trim());
        if name.is_empty() || !(url.starts_with("https://") || url.starts_with("http://")) {
            return Err(crate::config_error!("Invalid DoH provider '{}'", s));
        }
        Ok(Self::new(name, url))
    }
}

/// One (base name, TLD) pair under evaluation
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Combination {
    pub base_name: String,
    pub tld: String,
}

impl Combination {
    pub fn new(base_name: impl Into<String>, tld: impl Into<String>) -> Self {
        Self {
            base_name: base_name.into(),
            tld: tld.into(),
        }
    }

    pub fn full_domain(&self) -> String {
        format!("{}.{}", self.base_name, self.tld)
    }
}

/// Verdict for one combination
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckOutcome {
    pub status: DomainStatus,
    pub reason: Option<String>,
}

impl CheckOutcome {
    pub fn available(reason: impl Into<String>) -> Self {
        Self {
            status: DomainStatus::Available,
            reason: Some(reason.into()),
        }
    }

    pub fn taken(reason: impl Into<String>) -> Self {
        Self {
            status: DomainStatus::Taken,
            reason: Some(reason.into()),
        }
    }

    pub fn invalid(reason: impl Into<String>) -> Self {
        Self {
            status: DomainStatus::Invalid,
            reason: Some(reason.into()),
        }
    }
}

/// One TLD cell of a grid row
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GridCell {
    pub id: String,
    pub tld: String,
    pub status: DomainStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

impl GridCell {
    pub fn checking(base_name: &str, tld: &str) -> Self {
        Self {
            id: format!("{}.{}", base_name, tld),
            tld: tld.to_string(),
            status: DomainStatus::Checking,
            reason: None,
        }
    }
}

/// One row of the grid: a base name and its cells in TLD order
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GridRow {
    pub base_name: String,
    pub cells: Vec<GridCell>,
}

impl GridRow {
    /// Look up the cell for a TLD
    pub fn cell(&self, tld: &str) -> Option<&GridCell> {
        self.cells.iter().find(|c| c.tld == tld)
    }

    pub fn has_status(&self, status: DomainStatus) -> bool {
        self.cells.iter().any(|c| c.status == status)
    }
}

/// A buffered cell update waiting for the next flush
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingUpdate {
    pub base_name: String,
    pub tld: String,
    pub status: DomainStatus,
    pub reason: Option<String>,
}

impl PendingUpdate {
    pub fn from_outcome(combination: &Combination, outcome: CheckOutcome) -> Self {
        Self {
            base_name: combination.base_name.clone(),
            tld: combination.tld.clone(),
            status: outcome.status,
            reason: outcome.reason,
        }
    }
}

/// Per-status cell counts
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusCounts {
    pub available: usize,
    pub taken: usize,
    pub invalid: usize,
    pub checking: usize,
    pub idle: usize,
}

impl StatusCounts {
    pub fn record(&mut self, status: DomainStatus) {
        match status {
            DomainStatus::Available => self.available += 1,
            DomainStatus::Taken => self.taken += 1,
            DomainStatus::Invalid => self.invalid += 1,
            DomainStatus::Checking => self.checking += 1,
            DomainStatus::Idle => self.idle += 1,
        }
    }

    pub fn total(&self) -> usize {
        self.available + self.taken + self.invalid + self.checking + self.idle
    }
}

/// Point-in-time view of a run's progress
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProgressSnapshot {
    pub run_id: u64,
    pub total_checks: usize,
    pub completed_checks: usize,
    pub running: bool,
    pub elapsed: Duration,
}

/// Final report of a completed run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunReport {
    pub run_id: u64,
    pub total_checks: usize,
    pub counts: StatusCounts,
    pub started_at: DateTime<Utc>,
    pub elapsed: Duration,
}

/// Configuration for domain checking
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckConfig {
    pub providers: Vec<DohProvider>,
    pub record_types: Vec<RecordType>,
    pub max_concurrency: usize,
    pub request_timeout: Duration,
    pub flush_interval: Duration,
    pub max_combinations: usize,
    pub user_agent: String,
}

impl Default for CheckConfig {
    fn default() -> Self {
        Self {
            providers: vec![DohProvider::cloudflare(), DohProvider::google()],
            record_types: vec![RecordType::A, RecordType::NS],
            max_concurrency: 64,
            request_timeout: Duration::from_secs(10),
            flush_interval: Duration::from_millis(300),
            max_combinations: MAX_COMBINATIONS,
            user_agent: format!("domain-grid/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

impl CheckConfig {
    /// Build a configuration from `DOMAIN_GRID_*` environment variables
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();

        if let Some(v) = env_number("DOMAIN_GRID_CONCURRENCY")? {
            config = config.with_max_concurrency(v as usize);
        }
        if let Some(v) = env_number("DOMAIN_GRID_TIMEOUT_SECS")? {
            config = config.with_request_timeout(Duration::from_secs(v.max(1)));
        }
        if let Some(v) = env_number("DOMAIN_GRID_FLUSH_MS")? {
            config = config.with_flush_interval(Duration::from_millis(v.max(10)));
        }
        if let Some(v) = env_number("DOMAIN_GRID_MAX_COMBINATIONS")? {
            config = config.with_max_combinations(v as usize);
        }
        if let Ok(raw) = env::var("DOMAIN_GRID_DOH_PROVIDERS") {
            let providers = raw
                .split(',')
                .filter(|s| !s.trim().is_empty())
                .map(DohProvider::from_str)
                .collect::<Result<Vec<_>>>()?;
            if providers.is_empty() {
                return Err(crate::config_error!("DOMAIN_GRID_DOH_PROVIDERS is empty"));
            }
            config = config.with_providers(providers);
        }

        Ok(config)
    }

    /// Cap concurrent classifications; at least one
    pub fn with_max_concurrency(mut self, max: usize) -> Self {
        self.max_concurrency = max.clamp(1, 1024);
        self
    }

    pub fn with_providers(mut self, providers: Vec<DohProvider>) -> Self {
        self.providers = providers;
        self
    }

    pub fn with_flush_interval(mut self, interval: Duration) -> Self {
        self.flush_interval = interval;
        self
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    pub fn with_max_combinations(mut self, max: usize) -> Self {
        self.max_combinations = max;
        self
    }

    /// Number of DoH queries issued per classified domain
    pub fn queries_per_domain(&self) -> usize {
        self.providers.len() * self.record_types.len()
    }
}

fn env_number(key: &str) -> Result<Option<u64>> {
    match env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse::<u64>()
            .map(Some)
            .map_err(|e| crate::config_error!("{} must be a number: {}", key, e)),
        Err(_) => Ok(None),
    }
}
