//! Account handlers: login, sign-up, logout and password reset

use std::sync::Arc;

use axum::{extract::State, http::HeaderMap, Json};
use serde::Deserialize;

use super::session::unknown_session;
use crate::{get_session_id, AppError, AppState};
use zytra_core::{Event, Outcome};

/// Apply an event to the caller's session
pub(crate) async fn dispatch(
    state: &AppState,
    headers: &HeaderMap,
    event: Event,
) -> Result<Json<Outcome>, AppError> {
    let session_id = get_session_id(headers)?;
    let store = state.store.as_ref();
    let outcome = state
        .sessions
        .update(&session_id, |ctx| ctx.try_handle(store, event))
        .await
        .ok_or_else(unknown_session)??;
    Ok(Json(outcome))
}

#[derive(Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Deserialize)]
pub struct SignupRequest {
    pub email: String,
    pub username: String,
    pub password: String,
}

#[derive(Deserialize)]
pub struct VerifyResetRequest {
    pub email: String,
}

#[derive(Deserialize)]
pub struct SubmitResetRequest {
    pub password: String,
}

/// POST /api/auth/login
pub async fn login(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(body): Json<LoginRequest>,
) -> Result<Json<Outcome>, AppError> {
    let event = Event::Login {
        email: body.email,
        secret: body.password,
    };
    dispatch(&state, &headers, event).await
}

/// POST /api/auth/signup
pub async fn signup(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(body): Json<SignupRequest>,
) -> Result<Json<Outcome>, AppError> {
    let event = Event::SignUp {
        email: body.email,
        display_name: body.username,
        secret: body.password,
    };
    dispatch(&state, &headers, event).await
}

/// POST /api/auth/logout
pub async fn logout(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Json<Outcome>, AppError> {
    dispatch(&state, &headers, Event::Logout).await
}

/// POST /api/auth/reset/request - Open the forgot-password form
pub async fn request_reset(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Json<Outcome>, AppError> {
    dispatch(&state, &headers, Event::RequestReset).await
}

/// POST /api/auth/reset/verify
pub async fn verify_reset(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(body): Json<VerifyResetRequest>,
) -> Result<Json<Outcome>, AppError> {
    dispatch(&state, &headers, Event::VerifyResetEmail { email: body.email }).await
}

/// POST /api/auth/reset/submit
pub async fn submit_reset(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(body): Json<SubmitResetRequest>,
) -> Result<Json<Outcome>, AppError> {
    let event = Event::SubmitNewSecret {
        secret: body.password,
    };
    dispatch(&state, &headers, event).await
}
