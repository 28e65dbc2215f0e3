//! Expense items and the per-period collection that owns them.

pub mod breakdown;
pub mod expense;

pub use breakdown::{ExpenseAggregates, ExpenseBreakdown};
pub use expense::{Expense, ExpenseKind, ExpenseType};
