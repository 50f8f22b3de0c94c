//! Submission input parsing: base-name blobs, TLD lists and their cross product

use std::collections::HashSet;

use crate::domain::DomainValidator;
use crate::error::{DomainGridError, Result};
use crate::types::Combination;

/// Split a free-text base-name blob on newlines, whitespace and commas
pub fn parse_base_names(blob: &str) -> Vec<String> {
    dedupe(
        blob.split(|c: char| c == ',' || c.is_whitespace())
            .map(|s| s.trim().to_lowercase()),
    )
}

/// Split a comma-delimited TLD string; a leading dot is tolerated
pub fn parse_tlds(raw: &str) -> Vec<String> {
    dedupe(
        raw.split(',')
            .map(|s| s.trim().trim_start_matches('.').to_lowercase()),
    )
}

fn dedupe(items: impl Iterator<Item = String>) -> Vec<String> {
    let mut seen = HashSet::new();
    items
        .filter(|s| !s.is_empty())
        .filter(|s| seen.insert(s.clone()))
        .collect()
}

/// Validated submission: accepted entries plus whatever was dropped
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Submission {
    pub base_names: Vec<String>,
    pub tlds: Vec<String>,
    pub rejected_base_names: Vec<String>,
    pub rejected_tlds: Vec<String>,
}

impl Submission {
    /// Normalize and partition raw entries.
    ///
    /// Fails when nothing usable remains on either axis, or when the cross
    /// product exceeds `max_combinations`.
    pub fn prepare<B, T>(base_names: B, tlds: T, max_combinations: usize) -> Result<Self>
    where
        B: IntoIterator,
        B::Item: AsRef<str>,
        T: IntoIterator,
        T::Item: AsRef<str>,
    {
        let validator = DomainValidator::new();
        let base_names = dedupe(base_names.into_iter().map(|s| s.as_ref().trim().to_lowercase()));
        let tlds = dedupe(
            tlds.into_iter()
                .map(|s| s.as_ref().trim().trim_start_matches('.').to_lowercase()),
        );

        if base_names.is_empty() {
            return Err(DomainGridError::input("No base names provided"));
        }
        if tlds.is_empty() {
            return Err(DomainGridError::input("No TLDs provided"));
        }

        let (accepted_names, rejected_base_names): (Vec<_>, Vec<_>) = base_names
            .into_iter()
            .partition(|n| validator.is_valid_base_name(n));
        let (accepted_tlds, rejected_tlds): (Vec<_>, Vec<_>) =
            tlds.into_iter().partition(|t| validator.is_valid_tld(t));

        if accepted_names.is_empty() {
            return Err(crate::input_error!(
                "No valid base names (rejected: {})",
                rejected_base_names.join(", ")
            ));
        }
        if accepted_tlds.is_empty() {
            return Err(crate::input_error!(
                "No valid TLDs (rejected: {})",
                rejected_tlds.join(", ")
            ));
        }

        let count = accepted_names.len().saturating_mul(accepted_tlds.len());
        if count > max_combinations {
            return Err(DomainGridError::too_many_combinations(count, max_combinations));
        }

        Ok(Self {
            base_names: accepted_names,
            tlds: accepted_tlds,
            rejected_base_names,
            rejected_tlds,
        })
    }

    pub fn combination_count(&self) -> usize {
        self.base_names.len() * self.tlds.len()
    }

    /// Row-major cross product (base name outer, TLD inner)
    pub fn combinations(&self) -> Vec<Combination> {
        self.base_names
            .iter()
            .flat_map(|name| self.tlds.iter().map(move |tld| Combination::new(name.clone(), tld.clone())))
            .collect()
    }

    pub fn has_rejections(&self) -> bool {
        !self.rejected_base_names.is_empty() || !self.rejected_tlds.is_empty()
    }
}
