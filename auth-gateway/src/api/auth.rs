//! Authentication endpoints.
//!
//! All of these delegate to the identity provider; the gateway's own
//! responsibilities are the local user row written at signup and the
//! HttpOnly cookies carrying the provider's tokens.

use axum::{
    extract::State,
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use axum_extra::extract::cookie::{Cookie, CookieJar};
use serde::Serialize;
use serde_json::{json, Value};
use tracing::warn;
use validator::Validate;

use crate::error::{AppError, Result};
use crate::models::user::{ConfirmSignupRequest, LoginRequest, ResendCodeRequest, SignUpRequest};
use crate::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/signup", post(signup))
        .route("/login", post(login))
        .route("/confirm-signup", post(confirm_signup))
        .route("/resend-code", post(resend_code))
        .route("/refresh-token", post(refresh_token))
        .route("/me", get(me))
}

#[derive(Debug, Serialize)]
pub struct SignUpResponse {
    pub message: String,
    pub user_sub: String,
}

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: String,
}

async fn signup(
    State(state): State<AppState>,
    Json(payload): Json<SignUpRequest>,
) -> Result<(StatusCode, Json<SignUpResponse>)> {
    payload
        .validate()
        .map_err(|e| AppError::BadRequest(e.to_string()))?;

    let user_sub = state
        .identity
        .sign_up(&payload.name, &payload.email, &payload.password)
        .await?;

    state
        .users
        .create(&payload.name, &payload.email, &user_sub)
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(SignUpResponse {
            message:
                "User sign-up initiated. Please check your email to confirm the account."
                    .to_string(),
            user_sub,
        }),
    ))
}

async fn login(
    State(state): State<AppState>,
    jar: CookieJar,
    Json(payload): Json<LoginRequest>,
) -> Result<(CookieJar, Json<MessageResponse>)> {
    payload
        .validate()
        .map_err(|e| AppError::BadRequest(e.to_string()))?;

    let tokens = state
        .identity
        .login(&payload.email, &payload.password)
        .await?;

    let mut jar = jar
        .add(auth_cookie("access_token", tokens.access_token))
        .add(auth_cookie("refresh_token", tokens.refresh_token));

    // The refresh endpoint needs the subject for its secret hash; the
    // local row is the source of truth for it. A missing row only means
    // refresh will require a fresh login.
    match state.users.find_by_email(&payload.email).await {
        Ok(Some(user)) => {
            jar = jar.add(auth_cookie("user_cognito_sub", user.cognito_sub));
        }
        Ok(None) => warn!(email = %payload.email, "login for email without local user row"),
        Err(e) => warn!(error = %e, "could not resolve local user row at login"),
    }

    Ok((
        jar,
        Json(MessageResponse {
            message: "User logged in successfully".to_string(),
        }),
    ))
}

async fn confirm_signup(
    State(state): State<AppState>,
    Json(payload): Json<ConfirmSignupRequest>,
) -> Result<Json<MessageResponse>> {
    payload
        .validate()
        .map_err(|e| AppError::BadRequest(e.to_string()))?;

    state
        .identity
        .confirm_sign_up(&payload.email, &payload.otp)
        .await?;

    Ok(Json(MessageResponse {
        message: "Account confirmed".to_string(),
    }))
}

async fn resend_code(
    State(state): State<AppState>,
    Json(payload): Json<ResendCodeRequest>,
) -> Result<Json<MessageResponse>> {
    payload
        .validate()
        .map_err(|e| AppError::BadRequest(e.to_string()))?;

    state.identity.resend_confirmation_code(&payload.email).await?;

    Ok(Json(MessageResponse {
        message: "Confirmation code resent".to_string(),
    }))
}

async fn refresh_token(
    State(state): State<AppState>,
    jar: CookieJar,
) -> Result<(CookieJar, Json<MessageResponse>)> {
    let refresh_token = jar
        .get("refresh_token")
        .map(|c| c.value().to_string())
        .ok_or(AppError::Unauthorized)?;
    let cognito_sub = jar
        .get("user_cognito_sub")
        .map(|c| c.value().to_string())
        .ok_or(AppError::Unauthorized)?;

    let access_token = state.identity.refresh(&cognito_sub, &refresh_token).await?;

    let jar = jar.add(auth_cookie("access_token", access_token));

    Ok((
        jar,
        Json(MessageResponse {
            message: "Access token refreshed successfully".to_string(),
        }),
    ))
}

async fn me(State(state): State<AppState>, jar: CookieJar) -> Result<Json<Value>> {
    let access_token = jar
        .get("access_token")
        .map(|c| c.value().to_string())
        .ok_or(AppError::Unauthorized)?;

    let user = state.identity.get_user(&access_token).await?;

    Ok(Json(json!({
        "message": "You are authenticated",
        "user": user,
    })))
}

fn auth_cookie(name: &'static str, value: String) -> Cookie<'static> {
    Cookie::build((name, value))
        .http_only(true)
        .secure(true)
        .path("/")
        .build()
}
