//! Request DTOs for the HTTP API
//!
//! Defines the structure of incoming HTTP request bodies.

use serde::Deserialize;

/// Request body for pattern invalidation (POST /cache/invalidate)
///
/// # Fields
/// - `pattern`: Regular expression matched against cache keys
#[derive(Debug, Clone, Deserialize)]
pub struct InvalidatePatternRequest {
    /// Regular expression source
    pub pattern: String,
}

impl InvalidatePatternRequest {
    /// Validates the request data
    ///
    /// Returns an error message if validation fails, None if valid.
    pub fn validate(&self) -> Option<String> {
        if self.pattern.is_empty() {
            return Some("Pattern cannot be empty".to_string());
        }
        None
    }
}
