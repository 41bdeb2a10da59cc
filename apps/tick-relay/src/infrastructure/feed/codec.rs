//! Feed Codec
//!
//! JSON encoding and decoding for the upstream feed protocol. A decode
//! failure is reported to the caller and never takes the stream down; the
//! connector logs it and moves on to the next frame.

use crate::infrastructure::feed::messages::{ControlFrame, FeedFrame};

/// Codec errors.
#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    /// JSON encoding/decoding failed.
    #[error("JSON codec error: {0}")]
    Json(#[from] serde_json::Error),
}

/// JSON codec for the upstream feed stream.
#[derive(Debug, Default, Clone)]
pub struct JsonCodec;

impl JsonCodec {
    /// Create a new JSON codec.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Decode one text frame.
    ///
    /// Frame types the relay does not handle decode to [`FeedFrame::Other`].
    ///
    /// # Errors
    ///
    /// Returns an error if the frame is not valid JSON or a `trade` frame is
    /// structurally malformed.
    pub fn decode(&self, text: &str) -> Result<FeedFrame, CodecError> {
        Ok(serde_json::from_str(text)?)
    }

    /// Encode a control frame to its wire text.
    ///
    /// # Errors
    ///
    /// Returns an error if JSON serialization fails.
    pub fn encode(&self, frame: &ControlFrame) -> Result<String, CodecError> {
        Ok(serde_json::to_string(frame)?)
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use test_case::test_case;

    use super::*;

    #[test]
    fn decodes_trade_frame() {
        let codec = JsonCodec::new();

        let frame = codec
            .decode(r#"{"type":"trade","data":[{"s":"AAPL","p":150.0}]}"#)
            .unwrap();

        assert!(matches!(frame, FeedFrame::Trade { .. }));
    }

    #[test]
    fn unknown_frame_type_is_ignored_not_an_error() {
        let codec = JsonCodec::new();

        let frame = codec.decode(r#"{"type":"ping"}"#).unwrap();

        assert_eq!(frame, FeedFrame::Other);
    }

    #[test_case("not json at all"; "garbage")]
    #[test_case(r#"{"type":"trade","data":"oops"}"#; "wrong data shape")]
    #[test_case(r#"{"type":"trade","data":[{"s":"AAPL"}]}"#; "missing price")]
    #[test_case(r#"{"data":[]}"#; "missing type tag")]
    fn malformed_frames_error(text: &str) {
        let codec = JsonCodec::new();
        assert!(codec.decode(text).is_err());
    }

    #[test]
    fn encodes_control_frame() {
        let codec = JsonCodec::new();

        let text = codec.encode(&ControlFrame::subscribe("AAPL")).unwrap();

        assert_eq!(text, r#"{"type":"subscribe","symbol":"AAPL"}"#);
    }
}
