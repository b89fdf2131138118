use axum::{Json, extract::State, http::StatusCode};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use tracing::info;

use campusdash_db::lifecycle::{CreateOutcome, TransitionOutcome};
use campusdash_db::models::NewRequest;
use campusdash_db::{format_timestamp, new_id};
use campusdash_types::api::{
    CreateRequestBody, ListMeta, RequestListResponse, RequestView, StatusQuery, UpdateStatusBody,
};
use campusdash_types::models::{Capability, RequestStatus};

use crate::convert;
use crate::error::{ApiError, ApiResult, FieldError};
use crate::extract::{Payload, PathId, QueryParams};
use crate::middleware::{Caller, resolve_actor};
use crate::state::{AppState, run_blocking};

const MAX_INSTRUCTIONS_LEN: usize = 512;

/// Field checks for a new request, collected so the client sees every problem
/// at once. Returns the normalized task type and preferred time.
fn validate_create(body: &CreateRequestBody) -> ApiResult<(String, Option<DateTime<Utc>>)> {
    let mut errors = Vec::new();
    let mut fail = |field: &str, message: &str| {
        errors.push(FieldError {
            field: field.into(),
            message: message.into(),
        })
    };

    let task_type = body.task_type.trim().to_string();
    if task_type.chars().count() < 2 {
        fail("taskType", "taskType must be at least 2 characters");
    }
    if let Some(instructions) = &body.instructions {
        if instructions.chars().count() > MAX_INSTRUCTIONS_LEN {
            fail("instructions", "instructions must be at most 512 characters");
        }
    }
    if let Some(cost) = body.estimated_cost {
        if cost < Decimal::ZERO {
            fail("estimatedCost", "estimatedCost must not be negative");
        }
    }
    let preferred_time = match body.preferred_time.as_deref() {
        None => None,
        Some(raw) => match DateTime::parse_from_rfc3339(raw) {
            Ok(at) => Some(at.with_timezone(&Utc)),
            Err(_) => {
                fail("preferredTime", "preferredTime must be an RFC 3339 timestamp");
                None
            }
        },
    };

    if !errors.is_empty() {
        return Err(ApiError::Validation(errors));
    }
    Ok((task_type, preferred_time))
}

pub async fn create_request(
    State(state): State<AppState>,
    caller: Caller,
    Payload(body): Payload<CreateRequestBody>,
) -> ApiResult<(StatusCode, Json<RequestView>)> {
    let (task_type, preferred_time) = validate_create(&body)?;
    let requester = resolve_actor(
        &state,
        caller,
        body.requester_id,
        "requesterId",
        Capability::CreateRequest,
    )
    .await?;

    let new = NewRequest {
        id: new_id(),
        requester_id: requester.user_id.to_string(),
        pickup_location_id: body.pickup_location_id.to_string(),
        drop_location_id: body.drop_location_id.to_string(),
        task_type,
        preferred_time: preferred_time.map(format_timestamp),
        instructions: body.instructions,
        estimated_cost: body.estimated_cost.map(|c| c.to_string()),
    };

    let created = run_blocking(&state, move |db| match db.create_request(&new)? {
        CreateOutcome::Created(row) => Ok(row),
        CreateOutcome::UnknownRequester => Err(ApiError::NotFound("User not found".into())),
        CreateOutcome::UnknownLocation(field) => {
            Err(ApiError::NotFound(format!("Location not found for {}", field)))
        }
    })
    .await?;

    info!("Request {} created by {}", created.request.id, requester.user_id);
    Ok((StatusCode::CREATED, Json(convert::request_view(created, None)?)))
}

pub async fn list_requests(
    State(state): State<AppState>,
    QueryParams(query): QueryParams<StatusQuery>,
) -> ApiResult<Json<RequestListResponse>> {
    let rows = run_blocking(&state, move |db| Ok(db.list_requests(query.status)?)).await?;
    let data = convert::request_views(rows)?;
    Ok(Json(RequestListResponse {
        meta: ListMeta { count: data.len() },
        data,
    }))
}

pub async fn get_request(
    State(state): State<AppState>,
    PathId(id): PathId,
) -> ApiResult<Json<RequestView>> {
    let (row, events) = run_blocking(&state, move |db| {
        let id = id.to_string();
        let row = db
            .get_request(&id)?
            .ok_or_else(|| ApiError::NotFound("Request not found".into()))?;
        let events = db.request_events(&id)?;
        Ok((row, events))
    })
    .await?;

    Ok(Json(convert::request_view(row, Some(events))?))
}

pub async fn update_status(
    State(state): State<AppState>,
    PathId(id): PathId,
    Payload(body): Payload<UpdateStatusBody>,
) -> ApiResult<Json<RequestView>> {
    let to = body.status;
    if to == RequestStatus::Assigned {
        return Err(ApiError::Conflict(
            "Use the accept route to assign a runner".into(),
        ));
    }

    let updated = run_blocking(&state, move |db| {
        match db.set_request_status(&id.to_string(), to)? {
            TransitionOutcome::Applied(row) => Ok(row),
            TransitionOutcome::NotFound => Err(ApiError::NotFound("Request not found".into())),
            TransitionOutcome::Rejected { current } => Err(ApiError::Conflict(format!(
                "Cannot move request from {} to {}",
                current, to
            ))),
            TransitionOutcome::WrongRunner => {
                Err(ApiError::Forbidden("You cannot change this request".into()))
            }
        }
    })
    .await?;

    info!("Request {} moved to {}", id, to);
    Ok(Json(convert::request_view(updated, None)?))
}
