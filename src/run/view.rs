//! Filtered and sorted projections of the grid, plus summary text

use std::cmp::Ordering;
use std::io::Write;
use std::path::Path;
use std::sync::Arc;

use crate::error::{DomainGridError, Result};
use crate::types::{DomainStatus, GridRow, ProgressSnapshot, StatusCounts};

const VOWELS: &[char] = &['a', 'e', 'i', 'o', 'u'];

/// Row predicates; every enabled one must hold
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RowFilter {
    /// Substring match on the base name
    pub search: Option<String>,
    /// At least one Available cell
    pub has_available: bool,
    /// No Taken cell
    pub no_taken: bool,
    /// No Invalid cell
    pub no_invalid: bool,
    /// Short-name "brandable" heuristic
    pub brandable: bool,
}

impl RowFilter {
    pub fn matches(&self, row: &GridRow) -> bool {
        if let Some(needle) = self.search.as_deref().filter(|s| !s.is_empty()) {
            if !row.base_name.contains(&needle.to_lowercase()) {
                return false;
            }
        }
        if self.has_available && !row.has_status(DomainStatus::Available) {
            return false;
        }
        if self.no_taken && row.has_status(DomainStatus::Taken) {
            return false;
        }
        if self.no_invalid && row.has_status(DomainStatus::Invalid) {
            return false;
        }
        if self.brandable && !is_brandable(&row.base_name) {
            return false;
        }
        true
    }

    pub fn apply(&self, rows: &[Arc<GridRow>]) -> Vec<Arc<GridRow>> {
        rows.iter().filter(|r| self.matches(r)).cloned().collect()
    }
}

/// Starts with a consonant and is either a single letter or contains a vowel
pub fn is_brandable(name: &str) -> bool {
    let mut chars = name.chars();
    let Some(first) = chars.next() else {
        return false;
    };
    if !first.is_ascii_alphabetic() || VOWELS.contains(&first.to_ascii_lowercase()) {
        return false;
    }
    name.len() == 1 || name.chars().any(|c| VOWELS.contains(&c.to_ascii_lowercase()))
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SortKey {
    BaseName,
    Tld(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortDirection {
    #[default]
    Ascending,
    Descending,
}

/// Current sort column; repeated requests for the same key flip direction
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SortState {
    pub key: SortKey,
    pub direction: SortDirection,
}

impl Default for SortState {
    fn default() -> Self {
        Self {
            key: SortKey::BaseName,
            direction: SortDirection::Ascending,
        }
    }
}

impl SortState {
    pub fn new(key: SortKey) -> Self {
        Self {
            key,
            direction: SortDirection::Ascending,
        }
    }

    pub fn toggle(&mut self, key: SortKey) {
        if self.key == key {
            self.direction = match self.direction {
                SortDirection::Ascending => SortDirection::Descending,
                SortDirection::Descending => SortDirection::Ascending,
            };
        } else {
            self.key = key;
            self.direction = SortDirection::Ascending;
        }
    }

    /// Sort rows in place. Rows missing the sorted TLD always go last.
    pub fn sort(&self, rows: &mut [Arc<GridRow>]) {
        let directed = |ord: Ordering| match self.direction {
            SortDirection::Ascending => ord,
            SortDirection::Descending => ord.reverse(),
        };

        match &self.key {
            SortKey::BaseName => rows.sort_by(|a, b| directed(a.base_name.cmp(&b.base_name))),
            SortKey::Tld(tld) => rows.sort_by(|a, b| {
                let rank = |row: &Arc<GridRow>| row.cell(tld).map(|c| c.status.display_rank());
                match (rank(a), rank(b)) {
                    (Some(x), Some(y)) => directed(x.cmp(&y)).then_with(|| a.base_name.cmp(&b.base_name)),
                    (Some(_), None) => Ordering::Less,
                    (None, Some(_)) => Ordering::Greater,
                    (None, None) => a.base_name.cmp(&b.base_name),
                }
            }),
        }
    }
}

/// Cell counts across all rows
pub fn count_statuses(rows: &[Arc<GridRow>]) -> StatusCounts {
    let mut counts = StatusCounts::default();
    for cell in rows.iter().flat_map(|r| r.cells.iter()) {
        counts.record(cell.status);
    }
    counts
}

/// Running progress line or final result line
pub fn summarize(rows: &[Arc<GridRow>], progress: Option<&ProgressSnapshot>) -> String {
    let counts = count_statuses(rows);
    let total = counts.total();
    if total == 0 {
        return "No checks run yet".to_string();
    }

    match progress {
        Some(p) if p.running => {
            let done = total - counts.checking;
            let percent = done as f64 * 100.0 / total as f64;
            format!(
                "Checking {} combinations: {:.0}% complete, {} still checking",
                total, percent, counts.checking
            )
        }
        _ => {
            let mut line = format!(
                "{} combinations: {} available, {} taken, {} invalid",
                total, counts.available, counts.taken, counts.invalid
            );
            if let Some(p) = progress {
                line.push_str(&format!(" ({:.1}s)", p.elapsed.as_secs_f64()));
            }
            line
        }
    }
}

/// Every Available full domain, in row then TLD order
pub fn available_domains(rows: &[Arc<GridRow>]) -> Vec<String> {
    rows.iter()
        .flat_map(|row| {
            row.cells
                .iter()
                .filter(|c| c.status == DomainStatus::Available)
                .map(move |c| format!("{}.{}", row.base_name, c.tld))
        })
        .collect()
}

/// Write the available domains one per line; returns how many were written
pub fn export_available(rows: &[Arc<GridRow>], path: &Path) -> Result<usize> {
    let domains = available_domains(rows);
    let io_err = |e: std::io::Error| DomainGridError::io(e.to_string(), Some(path.to_string_lossy().to_string()));

    let mut file = std::fs::File::create(path).map_err(io_err)?;
    for domain in &domains {
        writeln!(file, "{}", domain).map_err(io_err)?;
    }
    Ok(domains.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::GridCell;
    use std::time::Duration;

    fn row(name: &str, cells: &[(&str, DomainStatus)]) -> Arc<GridRow> {
        Arc::new(GridRow {
            base_name: name.to_string(),
            cells: cells
                .iter()
                .map(|(tld, status)| GridCell {
                    id: format!("{}.{}", name, tld),
                    tld: tld.to_string(),
                    status: *status,
                    reason: None,
                })
                .collect(),
        })
    }

    fn sample() -> Vec<Arc<GridRow>> {
        use DomainStatus::*;
        vec![
            row("zeta", &[("com", Taken), ("io", Available)]),
            row("apple", &[("com", Taken), ("io", Taken)]),
            row("bolo", &[("com", Available), ("io", Invalid)]),
            row("kx", &[("io", Available)]),
        ]
    }

    fn names(rows: &[Arc<GridRow>]) -> Vec<&str> {
        rows.iter().map(|r| r.base_name.as_str()).collect()
    }

    #[test]
    fn test_brandable() {
        assert!(is_brandable("b"));
        assert!(is_brandable("bolo"));
        assert!(!is_brandable("apple"));
        assert!(!is_brandable("kx"));
        assert!(!is_brandable("9lives"));
        assert!(!is_brandable(""));
    }

    #[test]
    fn test_filters_combine_with_and() {
        let rows = sample();

        let f = RowFilter { has_available: true, ..Default::default() };
        assert_eq!(names(&f.apply(&rows)), vec!["zeta", "bolo", "kx"]);

        let f = RowFilter { has_available: true, no_taken: true, ..Default::default() };
        assert_eq!(names(&f.apply(&rows)), vec!["bolo", "kx"]);

        let f = RowFilter { no_taken: true, no_invalid: true, ..Default::default() };
        assert_eq!(names(&f.apply(&rows)), vec!["kx"]);

        let f = RowFilter { brandable: true, ..Default::default() };
        assert_eq!(names(&f.apply(&rows)), vec!["zeta", "bolo"]);

        let f = RowFilter { search: Some("PL".to_string()), ..Default::default() };
        assert_eq!(names(&f.apply(&rows)), vec!["apple"]);
    }

    #[test]
    fn test_sort_by_name_toggles() {
        let mut rows = sample();
        let mut state = SortState::default();

        state.sort(&mut rows);
        assert_eq!(names(&rows), vec!["apple", "bolo", "kx", "zeta"]);

        state.toggle(SortKey::BaseName);
        assert_eq!(state.direction, SortDirection::Descending);
        state.sort(&mut rows);
        assert_eq!(names(&rows), vec!["zeta", "kx", "bolo", "apple"]);
    }

    #[test]
    fn test_sort_by_tld_rank_missing_last() {
        let mut rows = sample();
        let mut state = SortState::default();

        state.toggle(SortKey::Tld("com".to_string()));
        assert_eq!(state.direction, SortDirection::Ascending);
        state.sort(&mut rows);
        assert_eq!(names(&rows), vec!["bolo", "apple", "zeta", "kx"]);

        state.toggle(SortKey::Tld("com".to_string()));
        state.sort(&mut rows);
        assert_eq!(names(&rows), vec!["apple", "zeta", "bolo", "kx"]);
    }

    #[test]
    fn test_summary_running_and_final() {
        let mut rows = sample();
        rows.push(row("mid", &[("com", DomainStatus::Checking), ("io", DomainStatus::Checking)]));

        let running = ProgressSnapshot {
            run_id: 1,
            total_checks: 9,
            completed_checks: 7,
            running: true,
            elapsed: Duration::from_secs(1),
        };
        assert_eq!(
            summarize(&rows, Some(&running)),
            "Checking 9 combinations: 78% complete, 2 still checking"
        );

        let rows = sample();
        let done = ProgressSnapshot { running: false, elapsed: Duration::from_millis(2500), ..running };
        assert_eq!(
            summarize(&rows, Some(&done)),
            "7 combinations: 3 available, 3 taken, 1 invalid (2.5s)"
        );
        assert_eq!(summarize(&[], None), "No checks run yet");
    }

    #[test]
    fn test_export_available() {
        let rows = sample();
        assert_eq!(available_domains(&rows), vec!["zeta.io", "bolo.com", "kx.io"]);

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("available.txt");
        assert_eq!(export_available(&rows, &path).unwrap(), 3);
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "zeta.io\nbolo.com\nkx.io\n");
    }
}
