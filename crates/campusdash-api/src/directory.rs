use axum::{Json, extract::State};
use chrono::Utc;

use campusdash_types::api::{DataResponse, HealthResponse, UserSummary};
use campusdash_types::models::Location;

use crate::convert;
use crate::error::ApiResult;
use crate::state::{AppState, run_blocking};

pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        service: "CampusDash API",
        status: "ok",
        timestamp: Utc::now(),
    })
}

pub async fn list_locations(State(state): State<AppState>) -> ApiResult<Json<DataResponse<Location>>> {
    let rows = run_blocking(&state, |db| Ok(db.list_locations()?)).await?;
    let data = rows
        .into_iter()
        .map(convert::location)
        .collect::<anyhow::Result<Vec<_>>>()?;
    Ok(Json(DataResponse { data }))
}

pub async fn list_users(State(state): State<AppState>) -> ApiResult<Json<DataResponse<UserSummary>>> {
    let rows = run_blocking(&state, |db| Ok(db.list_users()?)).await?;
    let data = rows
        .into_iter()
        .map(|row| convert::user(row).map(UserSummary::from))
        .collect::<anyhow::Result<Vec<_>>>()?;
    Ok(Json(DataResponse { data }))
}
