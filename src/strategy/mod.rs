// Trading strategy module
pub mod signals;

pub use signals::{evaluate_entry, profit_pct, should_exit, EntryEvaluation};
