//! Zytra Core Library
//!
//! Shared functionality for the Zytra demand analytics tool:
//! - Account store and per-session login / password reset workflow
//! - CSV loading and column classification
//! - Seasonal ARIMA and additive trend/seasonality forecasting
//! - Demand insights and the downloadable report
//! - Chart data and the event-driven session context behind the dashboard

pub mod app;
pub mod auth;
pub mod chart;
pub mod config;
pub mod data;
pub mod error;
pub mod forecast;
pub mod insights;

/// Sample series generators for tests
#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;

pub use app::{
    Dashboard, Event, ForecastInput, ForecastTicket, Notice, Outcome, SessionContext, View,
};
pub use auth::{AuthState, CredentialStore, Identity, InMemoryCredentialStore, ResetFlow, Session};
pub use chart::{Chart, ChartKind};
pub use config::Config;
pub use data::{ColumnKinds, Table, UploadedFile};
pub use error::{Error, ModelKind, Result};
pub use forecast::{run_forecast, ForecastRequest, ForecastResult, Point};
pub use insights::{insights, InsightSummary, Report};
