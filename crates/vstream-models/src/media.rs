//! Media metadata models.

use serde::{Deserialize, Serialize};

/// Placeholder used when the transcoder output carries no resolution or codec.
pub const UNKNOWN: &str = "Unknown";

/// Metadata extracted from the transcoder's diagnostic output.
///
/// Every field is independently optional in the source text; missing values
/// fall back to `0.0` seconds and [`UNKNOWN`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MediaMetadata {
    /// Duration in seconds
    pub duration_seconds: f64,
    /// `WIDTHxHEIGHT` or [`UNKNOWN`]
    pub resolution: String,
    /// Video codec name or [`UNKNOWN`]
    pub codec: String,
}

impl Default for MediaMetadata {
    fn default() -> Self {
        Self {
            duration_seconds: 0.0,
            resolution: UNKNOWN.to_string(),
            codec: UNKNOWN.to_string(),
        }
    }
}

impl MediaMetadata {
    /// Whether the resolution could be read from the diagnostics.
    pub fn has_resolution(&self) -> bool {
        self.resolution != UNKNOWN
    }

    /// Whether the codec could be read from the diagnostics.
    pub fn has_codec(&self) -> bool {
        self.codec != UNKNOWN
    }
}
