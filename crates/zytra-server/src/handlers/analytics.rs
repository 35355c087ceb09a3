//! Chart, forecast and report handlers

use std::sync::Arc;

use axum::{
    extract::State,
    http::{header, HeaderMap},
    response::{IntoResponse, Response},
    Json,
};
use serde::Deserialize;
use tracing::error;

use super::auth::dispatch;
use super::session::unknown_session;
use crate::{get_session_id, AppError, AppState};
use zytra_core::{run_forecast, Event, ForecastInput, ForecastRequest, Outcome};

#[derive(Deserialize)]
pub struct ChartRequest {
    pub metric: String,
}

/// POST /api/chart - Chart a numeric column of the selected file
pub async fn generate_chart(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(body): Json<ChartRequest>,
) -> Result<Json<Outcome>, AppError> {
    dispatch(&state, &headers, Event::GenerateChart { metric: body.metric }).await
}

#[derive(Deserialize)]
pub struct ForecastBody {
    pub date_column: String,
    pub value_column: String,
    /// Days ahead; the configured default when omitted
    pub horizon: Option<usize>,
}

/// POST /api/forecast - Fit both models on the selected file
///
/// Fitting runs on the blocking pool; the session is not locked meanwhile.
/// A result whose session changed in the meantime is discarded.
pub async fn generate_forecast(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(body): Json<ForecastBody>,
) -> Result<Json<Outcome>, AppError> {
    let session_id = get_session_id(&headers)?;
    let request = ForecastRequest {
        date_column: body.date_column,
        value_column: body.value_column,
        horizon: body.horizon.unwrap_or(state.config.default_horizon),
    };

    let input = state
        .sessions
        .update(&session_id, |ctx| {
            ctx.forecast_input(&request).map_err(|e| ctx.reject(e))
        })
        .await
        .ok_or_else(unknown_session)??;
    let ForecastInput { table, ticket } = input;

    let fit_request = request.clone();
    let result = tokio::task::spawn_blocking(move || run_forecast(&table, &fit_request))
        .await
        .map_err(|e| {
            error!(error = %e, "Forecast task failed");
            AppError::internal("Forecast task failed")
        })?;

    let outcome = state
        .sessions
        .update(&session_id, |ctx| ctx.finish_forecast(&ticket, request, result))
        .await
        .ok_or_else(unknown_session)??;
    Ok(Json(outcome))
}

/// GET /api/report - Download the insight report as text
pub async fn download_report(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Response, AppError> {
    let session_id = get_session_id(&headers)?;
    let report = state
        .sessions
        .read(&session_id, |ctx| ctx.report())
        .await
        .ok_or_else(unknown_session)??;

    let disposition = format!("attachment; filename=\"{}\"", report.filename());
    Ok((
        [
            (header::CONTENT_TYPE, "text/plain; charset=utf-8".to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        report.render(),
    )
        .into_response())
}
