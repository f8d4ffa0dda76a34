// The closed set of combination methods.

use crate::config::ConfigError;
use std::fmt;
use std::str::FromStr;

/// Algorithm used to reduce several estimates for one player to one value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum CombinationMethod {
    #[default]
    Average,
    WeightedAverage,
    Median,
    /// Mean after removing one minimum and one maximum. Needs three values;
    /// falls back to the plain mean below that.
    DropHighLow,
    /// Mean with a t-distribution interval. Needs two values for the
    /// interval; a single value is returned without bounds.
    ConfidenceBands,
}

impl CombinationMethod {
    pub const ALL: [CombinationMethod; 5] = [
        CombinationMethod::Average,
        CombinationMethod::WeightedAverage,
        CombinationMethod::Median,
        CombinationMethod::DropHighLow,
        CombinationMethod::ConfidenceBands,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            CombinationMethod::Average => "average",
            CombinationMethod::WeightedAverage => "weighted_average",
            CombinationMethod::Median => "median",
            CombinationMethod::DropHighLow => "drop_high_low",
            CombinationMethod::ConfidenceBands => "confidence_bands",
        }
    }
}

impl fmt::Display for CombinationMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CombinationMethod {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase();
        CombinationMethod::ALL
            .into_iter()
            .find(|method| method.as_str() == wanted)
            .ok_or_else(|| ConfigError::UnknownMethod(s.to_string()))
    }
}
