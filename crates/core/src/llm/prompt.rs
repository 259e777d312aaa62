use crate::domain::{ChartImage, Timeframe};

/// Example object given to the model. Field names must match `AnalysisRecord`.
const RESPONSE_SHAPE: &str = r#"{"recommendation":"LONG/SHORT","certainty":85,"entryPrice":"$X (desc)","stopLoss":"$X (-X%)","takeProfit":"$X (+X%)","riskRewardRatio":"X:1","report":"Detailed analysis with patterns, SL/TP justification"}"#;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompletionPrompt {
    pub instruction_text: String,
    pub image_data_uri: String,
}

impl CompletionPrompt {
    pub fn new(timeframe: Timeframe, image: &ChartImage) -> Self {
        Self {
            instruction_text: instruction_text(timeframe),
            image_data_uri: image.data_uri(),
        }
    }
}

/// The 2:1 minimum is only stated to the model; replies are not checked
/// against it.
pub fn instruction_text(timeframe: Timeframe) -> String {
    format!(
        "Analyze this {timeframe} crypto chart. Respond ONLY with valid JSON: {RESPONSE_SHAPE}. Min 2:1 R:R required."
    )
}
