//! The authoritative result grid

use std::collections::HashMap;
use std::sync::Arc;

use crate::types::{GridCell, GridRow, PendingUpdate, StatusCounts};

/// Rows are shared as `Arc<GridRow>`; a bulk update swaps in new `Arc`s
/// only for rows whose cells actually changed, so observers can compare
/// rows with `Arc::ptr_eq`.
#[derive(Debug, Default)]
pub struct Grid {
    run_id: u64,
    rows: Vec<Arc<GridRow>>,
    index: HashMap<String, usize>,
    revision: u64,
}

impl Grid {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the grid with the cross product of a new run, every cell `Checking`
    pub fn reset(&mut self, run_id: u64, base_names: &[String], tlds: &[String]) {
        self.run_id = run_id;
        self.rows = base_names
            .iter()
            .map(|name| {
                Arc::new(GridRow {
                    base_name: name.clone(),
                    cells: tlds.iter().map(|tld| GridCell::checking(name, tld)).collect(),
                })
            })
            .collect();
        self.index = base_names
            .iter()
            .enumerate()
            .map(|(i, name)| (name.clone(), i))
            .collect();
        self.revision += 1;
    }

    pub fn clear(&mut self) {
        self.run_id = 0;
        self.rows.clear();
        self.index.clear();
        self.revision += 1;
    }

    pub fn run_id(&self) -> u64 {
        self.run_id
    }

    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub fn rows(&self) -> &[Arc<GridRow>] {
        &self.rows
    }

    pub fn snapshot(&self) -> Vec<Arc<GridRow>> {
        self.rows.clone()
    }

    pub fn row(&self, base_name: &str) -> Option<&Arc<GridRow>> {
        self.index.get(base_name).map(|&i| &self.rows[i])
    }

    pub fn counts(&self) -> StatusCounts {
        let mut counts = StatusCounts::default();
        for cell in self.rows.iter().flat_map(|r| r.cells.iter()) {
            counts.record(cell.status);
        }
        counts
    }

    /// Apply a drained batch as one bulk mutation; returns the number of rows replaced.
    ///
    /// Updates are grouped by base name then TLD with the last one per cell
    /// winning. Updates for cells outside the current cross product are dropped.
    pub fn apply(&mut self, updates: Vec<PendingUpdate>) -> usize {
        let mut grouped: HashMap<String, HashMap<String, PendingUpdate>> = HashMap::new();
        for update in updates {
            grouped
                .entry(update.base_name.clone())
                .or_default()
                .insert(update.tld.clone(), update);
        }

        let mut changed = 0;
        for (base_name, cells) in grouped {
            let Some(&idx) = self.index.get(&base_name) else {
                tracing::warn!(base_name = %base_name, "Dropping update for unknown row");
                continue;
            };

            let current = &self.rows[idx];
            let mut next: Option<GridRow> = None;
            for (tld, update) in cells {
                let Some(pos) = current.cells.iter().position(|c| c.tld == tld) else {
                    tracing::warn!(base_name = %base_name, tld = %tld, "Dropping update for unknown cell");
                    continue;
                };
                let existing = &current.cells[pos];
                if existing.status == update.status && existing.reason == update.reason {
                    continue;
                }
                let row = next.get_or_insert_with(|| GridRow::clone(current));
                row.cells[pos] = GridCell {
                    id: existing.id.clone(),
                    tld,
                    status: update.status,
                    reason: update.reason,
                };
            }

            if let Some(row) = next {
                self.rows[idx] = Arc::new(row);
                changed += 1;
            }
        }

        if changed > 0 {
            self.revision += 1;
        }
        changed
    }
}
