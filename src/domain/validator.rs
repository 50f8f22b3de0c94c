//! Domain name validation utilities

use crate::error::{DomainGridError, Result};
use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    static ref BASE_NAME_RE: Regex =
        Regex::new(r"(?i)^[a-z0-9]([a-z0-9-]{0,61}[a-z0-9])?$").expect("valid base name regex");
    static ref TLD_RE: Regex =
        Regex::new(r"(?i)^[a-z0-9]([a-z0-9-]*[a-z0-9])?(\.[a-z0-9]([a-z0-9-]*[a-z0-9])?)*$")
            .expect("valid tld regex");
    static ref DOMAIN_CHARS_RE: Regex = Regex::new(r"^[a-z0-9.-]+$").expect("valid charset regex");
}

/// Domain name validator
///
/// All checks are pure; nothing here touches the network.
#[derive(Debug, Clone, Copy, Default)]
pub struct DomainValidator;

impl DomainValidator {
    /// Create a new domain validator
    pub fn new() -> Self {
        Self
    }

    /// A base name is a single DNS label
    pub fn is_valid_base_name(&self, name: &str) -> bool {
        !name.contains('.')
            && !name.starts_with('-')
            && !name.ends_with('-')
            && BASE_NAME_RE.is_match(name)
    }

    /// A TLD may carry several labels (`co.uk`) but not an all-numeric last one
    pub fn is_valid_tld(&self, tld: &str) -> bool {
        if tld.len() < 2 || tld.starts_with('.') || tld.ends_with('.') || tld.contains("..") {
            return false;
        }
        if !TLD_RE.is_match(tld) {
            return false;
        }
        tld.rsplit('.')
            .next()
            .is_some_and(|last| !last.chars().all(|c| c.is_ascii_digit()))
    }

    /// Validate a full domain before any lookup is issued for it
    pub fn validate_full_domain(&self, domain: &str) -> Result<ValidatedDomain> {
        self.validate_length(domain)?;
        self.validate_format(domain)?;

        if !DOMAIN_CHARS_RE.is_match(domain) {
            return Err(DomainGridError::validation("Domain contains invalid characters"));
        }

        let labels: Vec<&str> = domain.split('.').collect();
        for label in &labels {
            self.validate_label(label)?;
        }

        // split always yields at least one item and the format check ensured a dot
        let tld = labels[labels.len() - 1];
        if tld.len() < 2 {
            return Err(DomainGridError::validation("TLD too short (min 2 characters)"));
        }
        if tld.chars().all(|c| c.is_ascii_digit()) {
            return Err(DomainGridError::validation("TLD cannot be all-numeric"));
        }

        Ok(ValidatedDomain {
            full_domain: domain.to_string(),
            name: labels[..labels.len() - 1].join("."),
            tld: tld.to_string(),
        })
    }

    /// Validate domain length
    fn validate_length(&self, domain: &str) -> Result<()> {
        if domain.len() > 253 {
            return Err(DomainGridError::validation("Domain name too long (max 253 characters)"));
        }

        if domain.len() < 3 {
            return Err(DomainGridError::validation("Domain name too short (min 3 characters)"));
        }

        Ok(())
    }

    /// Validate dot placement
    fn validate_format(&self, domain: &str) -> Result<()> {
        if !domain.contains('.') {
            return Err(DomainGridError::validation("Domain must have at least one dot"));
        }

        if domain.starts_with('.') || domain.ends_with('.') {
            return Err(DomainGridError::validation("Domain cannot start or end with dot"));
        }

        if domain.contains("..") {
            return Err(DomainGridError::validation("Domain cannot contain consecutive dots"));
        }

        Ok(())
    }

    fn validate_label(&self, label: &str) -> Result<()> {
        if label.is_empty() {
            return Err(DomainGridError::validation("Domain label cannot be empty"));
        }

        if label.len() > 63 {
            return Err(DomainGridError::validation("Domain label too long (max 63 characters)"));
        }

        if label.starts_with('-') || label.ends_with('-') {
            return Err(DomainGridError::validation("Domain label cannot start or end with hyphen"));
        }

        Ok(())
    }
}

/// A domain that passed full validation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedDomain {
    pub full_domain: String,
    pub name: String,
    pub tld: String,
}
