use crate::domain::Timeframe;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;

/// Attachment metadata as supplied by the chat platform (or the cli).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attachment {
    pub url: String,
    pub content_type: Option<String>,
    pub filename: Option<String>,
}

#[derive(Debug, Clone)]
pub struct ChartImage {
    pub bytes: Vec<u8>,
    pub media_type: String,
}

impl ChartImage {
    pub fn data_uri(&self) -> String {
        format!("data:{};base64,{}", self.media_type, BASE64.encode(&self.bytes))
    }
}

/// One `/perp` invocation.
#[derive(Debug, Clone)]
pub struct ChartRequest {
    pub timeframe: Timeframe,
    pub attachment: Attachment,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn data_uri_uses_declared_media_type_and_standard_base64() {
        let image = ChartImage {
            bytes: b"hello?".to_vec(),
            media_type: "image/webp".to_string(),
        };
        assert_eq!(image.data_uri(), "data:image/webp;base64,aGVsbG8/");
    }
}
