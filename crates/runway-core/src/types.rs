use rust_decimal::Decimal;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::RunwayResult;

/// Rates expressed as decimals (0.05 = 5%). Never as percentages.
pub type Rate = Decimal;

/// Standard computation output envelope
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComputationOutput<T: Serialize> {
    pub result: T,
    pub methodology: String,
    pub assumptions: serde_json::Value,
    pub warnings: Vec<String>,
    pub metadata: ComputationMetadata,
}

/// Metadata for every computation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComputationMetadata {
    pub version: String,
    pub computation_time_us: u64,
    pub precision: String,
}

/// Helper to wrap computation results with metadata
pub fn with_metadata<T: Serialize>(
    methodology: &str,
    assumptions: &impl Serialize,
    warnings: Vec<String>,
    elapsed_us: u64,
    result: T,
) -> ComputationOutput<T> {
    ComputationOutput {
        result,
        methodology: methodology.to_string(),
        assumptions: serde_json::to_value(assumptions).unwrap_or_default(),
        warnings,
        metadata: ComputationMetadata {
            version: env!("CARGO_PKG_VERSION").to_string(),
            computation_time_us: elapsed_us,
            precision: "i64_minor_units".to_string(),
        },
    }
}

/// JSON round trip for model objects handed to and from the desktop shell.
///
/// Blanket-implemented for every serde type; deserialization re-runs the
/// invariants each type enforces through its `TryFrom` or validating impls.
pub trait JsonModel: Serialize + DeserializeOwned {
    fn to_json(&self) -> RunwayResult<String> {
        Ok(serde_json::to_string(self)?)
    }

    fn to_json_value(&self) -> RunwayResult<serde_json::Value> {
        Ok(serde_json::to_value(self)?)
    }

    fn parse_from_json(json: &str) -> RunwayResult<Self> {
        Ok(serde_json::from_str(json)?)
    }
}

impl<T: Serialize + DeserializeOwned> JsonModel for T {}

/// Outcome of a destructive period change on a collection.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReconcileReport {
    /// Ids removed because their month fell outside the new period.
    pub dropped: Vec<String>,
    /// Number of recurring schedules rebuilt in place.
    pub regenerated: usize,
}
