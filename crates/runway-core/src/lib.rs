pub mod error;
pub mod expenses;
pub mod funding;
pub mod money;
pub mod period;
pub mod projection;
pub mod revenue;
pub mod types;

#[cfg(feature = "scenarios")]
pub mod scenarios;

pub use error::RunwayError;
pub use money::{CurrencyCode, Money};
pub use period::{Frequency, Period, YearMonth};
pub use types::*;

/// Standard result type for all runway operations
pub type RunwayResult<T> = Result<T, RunwayError>;
