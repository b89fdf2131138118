use axum::{Extension, Json, extract::State};
use chrono::Utc;
use tracing::{info, warn};

use campusdash_types::api::{
    MeResponse, RefreshRequest, SendOtpRequest, SendOtpResponse, TokenKind, TokenPair,
    VerifyOtpRequest, VerifyOtpResponse,
};

use crate::convert;
use crate::error::{ApiError, ApiResult, FieldError};
use crate::extract::Payload;
use crate::middleware::Identity;
use crate::otp;
use crate::state::{AppState, run_blocking};

fn validate_contact(contact: &str, errors: &mut Vec<FieldError>) {
    if !otp::is_valid_contact(contact) {
        errors.push(FieldError {
            field: "contact".into(),
            message: "Provide a valid email".into(),
        });
    }
}

pub async fn send_otp(
    State(state): State<AppState>,
    Payload(req): Payload<SendOtpRequest>,
) -> ApiResult<Json<SendOtpResponse>> {
    let contact = req.contact.trim().to_string();
    let mut errors = Vec::new();
    validate_contact(&contact, &mut errors);
    if !errors.is_empty() {
        return Err(ApiError::Validation(errors));
    }

    let code = run_blocking(&state, move |db| otp::issue(db, &contact, Utc::now())).await?;

    Ok(Json(SendOtpResponse {
        message: "OTP generated".into(),
        preview_code: state.options.otp_preview.then_some(code),
    }))
}

pub async fn verify_otp(
    State(state): State<AppState>,
    Payload(req): Payload<VerifyOtpRequest>,
) -> ApiResult<Json<VerifyOtpResponse>> {
    let contact = req.contact.trim().to_string();
    let mut errors = Vec::new();
    validate_contact(&contact, &mut errors);
    if !otp::is_valid_code(&req.code) {
        errors.push(FieldError {
            field: "code".into(),
            message: "OTP code must be 6 digits".into(),
        });
    }
    if !errors.is_empty() {
        return Err(ApiError::Validation(errors));
    }

    let code = req.code;
    let user = run_blocking(&state, move |db| otp::verify(db, &contact, &code, Utc::now())).await?;
    let tokens = state.tokens.issue_pair(&user)?;

    info!("User {} signed in", user.id);
    Ok(Json(VerifyOtpResponse {
        user: user.into(),
        access_token: tokens.access_token,
        refresh_token: tokens.refresh_token,
    }))
}

pub async fn refresh(
    State(state): State<AppState>,
    Payload(req): Payload<RefreshRequest>,
) -> ApiResult<Json<TokenPair>> {
    let claims = state
        .tokens
        .verify(&req.refresh_token, TokenKind::Refresh)
        .map_err(|e| {
            warn!("Refresh rejected: {}", e);
            ApiError::InvalidToken
        })?;

    let user_id = claims.sub.to_string();
    let user = run_blocking(&state, move |db| {
        let row = db
            .get_user_by_id(&user_id)?
            .ok_or_else(|| ApiError::NotFound("User not found".into()))?;
        Ok(convert::user(row)?)
    })
    .await?;

    Ok(Json(state.tokens.issue_pair(&user)?))
}

pub async fn me(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
) -> ApiResult<Json<MeResponse>> {
    let user_id = identity.user_id.to_string();
    let (user, profile) = run_blocking(&state, move |db| {
        let user = db
            .get_user_by_id(&user_id)?
            .ok_or_else(|| ApiError::NotFound("User not found".into()))?;
        let profile = db.get_runner_profile(&user_id)?;
        Ok((user, profile))
    })
    .await?;

    Ok(Json(MeResponse {
        user: convert::user(user)?.into(),
        runner_profile: profile.map(convert::runner_profile).transpose()?,
    }))
}
