use crate::domain::{AnalysisRecord, Timeframe};
use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

pub const TITLE: &str = "📊 Crypto Chart Analysis";
pub const COLOR_LONG: u32 = 0x00ff00;
pub const COLOR_OTHER: u32 = 0xff0000;
pub const ATTRIBUTION: &str = "Powered by OpenRouter AI • Not financial advice";

pub const REPORT_MAX_CHARS: usize = 1024;
const ELLIPSIS: &str = "...";

/// Rich reply payload. Serializes in the chat platform's embed shape.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Presentation {
    pub title: String,
    pub color: u32,
    pub fields: Vec<EmbedField>,
    pub thumbnail: Thumbnail,
    pub footer: Footer,
    pub timestamp: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmbedField {
    pub name: String,
    pub value: String,
    pub inline: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Thumbnail {
    pub url: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Footer {
    pub text: String,
}

impl Presentation {
    pub fn field(&self, name: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|f| f.name == name)
            .map(|f| f.value.as_str())
    }
}

pub fn color_for(record: &AnalysisRecord) -> u32 {
    if record.is_long() {
        COLOR_LONG
    } else {
        COLOR_OTHER
    }
}

/// Caps `report` at [`REPORT_MAX_CHARS`] characters, ellipsis included.
pub fn truncate_report(report: &str) -> String {
    match report.char_indices().nth(REPORT_MAX_CHARS) {
        None => report.to_string(),
        Some(_) => {
            let keep = REPORT_MAX_CHARS - ELLIPSIS.chars().count();
            let cut = report
                .char_indices()
                .nth(keep)
                .map(|(i, _)| i)
                .unwrap_or(report.len());
            format!("{}{ELLIPSIS}", &report[..cut])
        }
    }
}

pub fn present(
    record: &AnalysisRecord,
    timeframe: Timeframe,
    thumbnail_url: &str,
    timestamp: DateTime<Utc>,
) -> Presentation {
    let inline = |name: &str, value: String| EmbedField {
        name: name.to_string(),
        value,
        inline: true,
    };

    Presentation {
        title: TITLE.to_string(),
        color: color_for(record),
        fields: vec![
            inline("📈 Recommendation", format!("**{}**", record.recommendation)),
            inline("🎯 Certainty", format!("{}%", record.certainty)),
            inline("⚖️ Risk/Reward", record.risk_reward_ratio.clone()),
            inline("🎯 Entry Price", record.entry_price.clone()),
            inline("🛑 Stop Loss", record.stop_loss.clone()),
            inline("💰 Take Profit", record.take_profit.clone()),
            EmbedField {
                name: "📝 Analysis Report".to_string(),
                value: truncate_report(&record.report),
                inline: false,
            },
        ],
        thumbnail: Thumbnail {
            url: thumbnail_url.to_string(),
        },
        footer: Footer {
            text: format!("{timeframe} • {ATTRIBUTION}"),
        },
        timestamp: timestamp.to_rfc3339_opts(SecondsFormat::Millis, true),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn record(recommendation: &str, report: &str) -> AnalysisRecord {
        AnalysisRecord {
            recommendation: recommendation.to_string(),
            certainty: 85,
            entry_price: "$50000".to_string(),
            stop_loss: "$48000 (-4%)".to_string(),
            take_profit: "$54000 (+8%)".to_string(),
            risk_reward_ratio: "2:1".to_string(),
            report: report.to_string(),
        }
    }

    fn at() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 1, 12, 30, 0).unwrap()
    }

    #[test]
    fn only_long_gets_the_long_color() {
        assert_eq!(color_for(&record("LONG", "")), COLOR_LONG);
        for other in ["SHORT", "N/A", "long", "LONG ", ""] {
            assert_eq!(color_for(&record(other, "")), COLOR_OTHER, "{other:?}");
        }
    }

    #[test]
    fn report_at_limit_is_unchanged() {
        let exact = "x".repeat(REPORT_MAX_CHARS);
        assert_eq!(truncate_report(&exact), exact);
        assert_eq!(truncate_report("short"), "short");
        assert_eq!(truncate_report(""), "");
    }

    #[test]
    fn long_report_is_cut_to_exactly_the_limit() {
        let long = "y".repeat(REPORT_MAX_CHARS + 1);
        let out = truncate_report(&long);
        assert_eq!(out.chars().count(), REPORT_MAX_CHARS);
        assert!(out.ends_with("..."));
        assert_eq!(&out[..1021], &long[..1021]);
    }

    #[test]
    fn truncation_counts_characters_not_bytes() {
        let long = "📈".repeat(2000);
        let out = truncate_report(&long);
        assert_eq!(out.chars().count(), REPORT_MAX_CHARS);
        assert!(out.starts_with("📈📈"));
        assert!(out.ends_with("📈..."));

        let fits = "é".repeat(REPORT_MAX_CHARS);
        assert_eq!(truncate_report(&fits), fits);
    }

    #[test]
    fn presents_all_fields_in_order() {
        let p = present(
            &record("LONG", "Bullish breakout"),
            Timeframe::FourHours,
            "https://cdn.example/chart.png",
            at(),
        );

        assert_eq!(p.title, TITLE);
        assert_eq!(p.color, COLOR_LONG);
        let names: Vec<_> = p.fields.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(
            names,
            [
                "📈 Recommendation",
                "🎯 Certainty",
                "⚖️ Risk/Reward",
                "🎯 Entry Price",
                "🛑 Stop Loss",
                "💰 Take Profit",
                "📝 Analysis Report",
            ]
        );
        assert!(p.fields[..6].iter().all(|f| f.inline));
        assert!(!p.fields[6].inline);
        assert_eq!(p.field("📈 Recommendation"), Some("**LONG**"));
        assert_eq!(p.field("🎯 Certainty"), Some("85%"));
        assert_eq!(p.field("📝 Analysis Report"), Some("Bullish breakout"));
        assert_eq!(p.thumbnail.url, "https://cdn.example/chart.png");
        assert_eq!(
            p.footer.text,
            "4h • Powered by OpenRouter AI • Not financial advice"
        );
        assert_eq!(p.timestamp, "2026-03-01T12:30:00.000Z");
    }

    #[test]
    fn serializes_as_embed_json() {
        let p = present(&record("SHORT", "r"), Timeframe::OneDay, "u", at());
        let v = serde_json::to_value(&p).unwrap();
        assert_eq!(v["color"], 0xff0000);
        assert_eq!(v["thumbnail"]["url"], "u");
        assert_eq!(v["fields"][6]["inline"], false);
        assert_eq!(v["footer"]["text"], "1d • Powered by OpenRouter AI • Not financial advice");
    }
}
