use serde::{Deserialize, Serialize};

/// A named sub-range of the media timeline
///
/// Chapter lists arrive sorted ascending by `start` and are expected not to
/// overlap; nothing here enforces that.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Chapter {
    /// Ordinal chapter id
    pub id: u32,
    /// Chapter title
    #[serde(default)]
    pub title: String,
    /// Start time in seconds
    pub start: f64,
    /// End time in seconds
    pub end: f64,
}

impl Chapter {
    /// Create a chapter
    pub fn new(id: u32, title: impl Into<String>, start: f64, end: f64) -> Self {
        Self {
            id,
            title: title.into(),
            start,
            end,
        }
    }

    /// Chapter length in seconds
    pub fn duration(&self) -> f64 {
        (self.end - self.start).max(0.0)
    }
}
