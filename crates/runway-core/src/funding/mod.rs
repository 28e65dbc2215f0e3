//! Funding events (equity, debt, grants), debt amortization and the
//! per-period collection that owns them.

pub mod debt;
pub mod event;
pub mod manager;

pub use debt::{build_debt_schedule, DebtMonth, DebtSchedule};
pub use event::{Compounding, DebtTerms, FundingEvent, FundingKind, FundingType, Installment};
pub use manager::{FundingAggregates, FundingManager};
