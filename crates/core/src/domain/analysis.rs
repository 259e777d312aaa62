use serde::{Deserialize, Serialize};

pub const RECOMMENDATION_LONG: &str = "LONG";
pub const RECOMMENDATION_SHORT: &str = "SHORT";
pub const NOT_AVAILABLE: &str = "N/A";
pub const NOT_SPECIFIED: &str = "Not specified";

/// Normalized trade recommendation. Every field is always populated; missing
/// model output is replaced by a sentinel when the record is built.
///
/// `certainty` and `risk_reward_ratio` are taken as the model states them and
/// are not range checked.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisRecord {
    pub recommendation: String,
    pub certainty: i64,
    pub entry_price: String,
    pub stop_loss: String,
    pub take_profit: String,
    pub risk_reward_ratio: String,
    pub report: String,
}

impl AnalysisRecord {
    pub fn is_long(&self) -> bool {
        self.recommendation == RECOMMENDATION_LONG
    }
}
