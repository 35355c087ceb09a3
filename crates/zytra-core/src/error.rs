//! Error types for Zytra

use std::fmt;

use serde::Serialize;
use thiserror::Error;

/// Which forecasting model failed to fit
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ModelKind {
    /// Seasonal ARIMA (1,1,1)x(1,1,1,7)
    Sarima,
    /// Additive trend + seasonality forecaster
    Additive,
}

impl ModelKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ModelKind::Sarima => "sarima",
            ModelKind::Additive => "additive",
        }
    }
}

impl fmt::Display for ModelKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Error, Debug)]
pub enum Error {
    #[error("Invalid email or password")]
    InvalidCredentials,

    #[error("Email already registered")]
    DuplicateEmail,

    #[error("Username already taken")]
    DuplicateDisplayName,

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("CSV parsing error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Unable to parse date: {0}")]
    InvalidDate(String),

    #[error("{model} model failed to fit: {reason}")]
    ForecastFitting { model: ModelKind, reason: String },

    #[error("Invalid state: {0}")]
    InvalidState(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Store error: {0}")]
    Store(String),
}

impl Error {
    /// Build a fitting error for the given model
    pub fn fitting(model: ModelKind, reason: impl Into<String>) -> Self {
        Error::ForecastFitting {
            model,
            reason: reason.into(),
        }
    }

    /// Stable machine-readable name for the error kind
    pub fn kind(&self) -> &'static str {
        match self {
            Error::InvalidCredentials => "invalid_credentials",
            Error::DuplicateEmail => "duplicate_email",
            Error::DuplicateDisplayName => "duplicate_display_name",
            Error::InvalidInput(_) => "invalid_input",
            Error::NotFound(_) => "not_found",
            Error::Csv(_) | Error::Parse(_) => "parse_error",
            Error::InvalidDate(_) => "invalid_date",
            Error::ForecastFitting { .. } => "forecast_fitting",
            Error::InvalidState(_) => "invalid_state",
            Error::Io(_) => "io",
            Error::Config(_) => "config",
            Error::Store(_) => "store",
        }
    }

    /// Message shown to the person at the screen.
    ///
    /// Input, lookup and state errors already carry a complete sentence, so
    /// the category prefix is dropped for them.
    pub fn user_message(&self) -> String {
        match self {
            Error::InvalidInput(msg) | Error::NotFound(msg) | Error::InvalidState(msg) => {
                msg.clone()
            }
            other => other.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
