//! DNS-over-HTTPS resolution
//!
//! A resolver answers one (provider, domain, record type) question and
//! never fails outright: every failure mode lands in [`DnsQueryResult::error`].

pub mod doh;

pub use doh::DohClient;

use crate::types::{DohProvider, RecordType};
use async_trait::async_trait;

/// DNS response code for "name exists"
pub const RCODE_NOERROR: u32 = 0;
/// DNS response code for "name does not exist"
pub const RCODE_NXDOMAIN: u32 = 3;

/// Core trait for DNS lookups
#[async_trait]
pub trait DnsResolver: Send + Sync {
    /// Issue a single uncached query
    async fn query(&self, provider: &DohProvider, domain: &str, record_type: RecordType) -> DnsQueryResult;
}

/// Normalized outcome of one DoH query
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DnsQueryResult {
    pub provider: String,
    pub record_type: RecordType,
    /// DNS RCODE from the `Status` field, if a body was parsed
    pub dns_status: Option<u32>,
    pub answer_count: usize,
    pub error: Option<String>,
}

impl DnsQueryResult {
    pub fn status(provider: &DohProvider, record_type: RecordType, dns_status: u32, answer_count: usize) -> Self {
        Self {
            provider: provider.name.clone(),
            record_type,
            dns_status: Some(dns_status),
            answer_count,
            error: None,
        }
    }

    pub fn failed(provider: &DohProvider, record_type: RecordType, error: impl Into<String>) -> Self {
        Self {
            provider: provider.name.clone(),
            record_type,
            dns_status: None,
            answer_count: 0,
            error: Some(error.into()),
        }
    }

    pub fn is_noerror(&self) -> bool {
        self.dns_status == Some(RCODE_NOERROR)
    }

    pub fn is_nxdomain(&self) -> bool {
        self.dns_status == Some(RCODE_NXDOMAIN)
    }

    /// One audit-trail entry, e.g. `Cloudflare A: NOERROR (2 answers)`
    pub fn describe(&self) -> String {
        let mut out = format!("{} {}: ", self.provider, self.record_type);
        match self.dns_status {
            Some(code) => out.push_str(&rcode_name(code)),
            None => out.push_str("no status"),
        }
        if self.answer_count > 0 {
            out.push_str(&format!(" ({} answers)", self.answer_count));
        }
        if let Some(err) = &self.error {
            out.push_str(&format!(" [error: {}]", err));
        }
        out
    }
}

/// Human name for a DNS RCODE
pub fn rcode_name(code: u32) -> String {
    match code {
        0 => "NOERROR".to_string(),
        1 => "FORMERR".to_string(),
        2 => "SERVFAIL".to_string(),
        3 => "NXDOMAIN".to_string(),
        4 => "NOTIMP".to_string(),
        5 => "REFUSED".to_string(),
        other => format!("RCODE {}", other),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_describe() {
        let cf = DohProvider::cloudflare();
        let ok = DnsQueryResult::status(&cf, RecordType::A, 0, 2);
        assert_eq!(ok.describe(), "Cloudflare A: NOERROR (2 answers)");
        assert!(ok.is_noerror());

        let failed = DnsQueryResult::failed(&cf, RecordType::NS, "HTTP 503");
        assert_eq!(failed.describe(), "Cloudflare NS: no status [error: HTTP 503]");

        assert_eq!(rcode_name(2), "SERVFAIL");
        assert_eq!(rcode_name(9), "RCODE 9");
    }
}
