use serde::{Deserialize, Serialize};

use crate::error::SprocError;

/// Settings read on every call. Fixed when the [`Caller`](crate::Caller) is built.
///
/// ```rust
/// use sproc_middleware::prelude::*;
///
/// let cfg = CallerConfig::from_json_str(r#"{ "success_code": 1 }"#).unwrap();
/// assert!(cfg.use_status_fields());
/// assert_eq!(cfg.success_code(), 1);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CallerConfig {
    use_status_fields: bool,
    success_code: i16,
}

impl Default for CallerConfig {
    fn default() -> Self {
        Self {
            use_status_fields: true,
            success_code: 0,
        }
    }
}

impl CallerConfig {
    #[must_use]
    pub fn new(use_status_fields: bool, success_code: i16) -> Self {
        Self {
            use_status_fields,
            success_code,
        }
    }

    /// Whether every call reserves two trailing output slots for a status code and message.
    #[must_use]
    pub fn use_status_fields(&self) -> bool {
        self.use_status_fields
    }

    /// The status code that means success.
    #[must_use]
    pub fn success_code(&self) -> i16 {
        self.success_code
    }

    #[must_use]
    pub fn with_status_fields(mut self, enabled: bool) -> Self {
        self.use_status_fields = enabled;
        self
    }

    #[must_use]
    pub fn with_success_code(mut self, code: i16) -> Self {
        self.success_code = code;
        self
    }

    /// Parse a JSON object; missing keys take their defaults.
    ///
    /// # Errors
    /// Returns `SprocError::ConfigError` on malformed JSON.
    pub fn from_json_str(json: &str) -> Result<Self, SprocError> {
        Ok(serde_json::from_str(json)?)
    }
}
