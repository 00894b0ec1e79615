//! Business-level failures surfaced to callers as structured `success: false` results.
//!
//! Storage faults never cross a store boundary (they are logged and turned into
//! empty results); the variants here cover the outcomes a caller has to tell apart.

use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum NavError {
    /// A store or the whole spatial memory subsystem could not be opened.
    #[error("{0} unavailable")]
    Unavailable(String),

    /// Required position fields were absent from the emulator reading.
    #[error("missing position data: {}", .0.join(", "))]
    MissingData(Vec<String>),

    #[error("bookmark not found: {0}")]
    NotFound(String),

    /// Greedy planning only works inside a single map.
    #[error("current and target are on different maps ({from} vs {to})")]
    CrossMap { from: i64, to: i64 },

    /// A plan would need more presses than a single suggestion should carry.
    #[error("target is {distance} steps away, more than the {limit}-step planning limit")]
    TooFar { distance: i64, limit: i64 },

    #[error("storage error: {0}")]
    Storage(String),
}

impl NavError {
    /// Render as the `{success: false, error}` object used by every prompt-facing surface.
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::json!({
            "success": false,
            "error": self.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_are_descriptive() {
        let err = NavError::MissingData(vec!["map_bank".into(), "x".into()]);
        assert_eq!(err.to_string(), "missing position data: map_bank, x");

        let err = NavError::CrossMap { from: 1, to: 2 };
        assert!(err.to_string().contains("different maps"));

        let err = NavError::TooFar { distance: 900, limit: 512 };
        assert!(err.to_string().contains("512-step"));

        let err = NavError::Unavailable("spatial memory".into());
        assert_eq!(err.to_string(), "spatial memory unavailable");
    }

    #[test]
    fn json_shape_has_success_false() {
        let json = NavError::NotFound("center".into()).to_json();
        assert_eq!(json["success"], false);
        assert_eq!(json["error"], "bookmark not found: center");
    }
}
