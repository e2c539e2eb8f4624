//! Error types for the junction simulation.
//!
//! The frame loop itself never fails; these errors surface from
//! configuration loading/validation and from callers that ask for strict
//! bias checking instead of clamping.

use thiserror::Error;

/// Result type alias using [`JunctionError`].
pub type Result<T> = std::result::Result<T, JunctionError>;

#[derive(Error, Debug)]
pub enum JunctionError {
    /// A configuration field failed validation
    #[error("Invalid configuration '{field}': {message}")]
    InvalidConfig { field: &'static str, message: String },

    /// Bias outside the square-root domain of the depletion width law
    #[error("Bias {voltage} V is outside the depletion field domain")]
    BiasOutOfDomain { voltage: f32 },

    #[error("Failed to read configuration: {0}")]
    ConfigIo(#[from] std::io::Error),

    #[error("Failed to parse configuration: {0}")]
    ConfigParse(#[from] serde_json::Error),
}

impl JunctionError {
    pub fn invalid_config(field: &'static str, message: impl Into<String>) -> Self {
        Self::InvalidConfig {
            field,
            message: message.into(),
        }
    }
}
