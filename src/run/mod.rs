//! Check runs: orchestration, batching and the result grid
//!
//! A run fans one classification out per (base name, TLD) pair, buffers the
//! outcomes and flushes them into the grid on a fixed interval.

mod batcher;
mod context;
mod grid;
mod orchestrator;
pub mod view;

pub use batcher::UpdateBatcher;
pub use context::RunContext;
pub use grid::Grid;
pub use orchestrator::{CheckOrchestrator, RunHandle, CHECK_FAILED_REASON};
pub use view::{RowFilter, SortDirection, SortKey, SortState};
