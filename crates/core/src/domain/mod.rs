pub mod analysis;
pub mod chart;
pub mod timeframe;

pub use analysis::AnalysisRecord;
pub use chart::{Attachment, ChartImage, ChartRequest};
pub use timeframe::Timeframe;
