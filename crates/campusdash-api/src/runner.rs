use axum::{Json, extract::State};
use chrono::{DateTime, Duration, Utc};
use rust_decimal::Decimal;
use tracing::info;

use campusdash_db::lifecycle::{Payout, TransitionOutcome};
use campusdash_db::models::RunnerEarningsRows;
use campusdash_types::api::{
    RecentPayment, RequestView, RunnerQuery, RunnerSummary, RunnerTasksResponse, TaskActionBody,
};
use campusdash_types::models::Capability;

use crate::convert::{self, parse_decimal, parse_timestamp};
use crate::error::{ApiError, ApiResult};
use crate::extract::{PathId, Payload, QueryParams};
use crate::middleware::{Caller, resolve_actor};
use crate::state::{AppState, run_blocking};

const RECENT_PAYMENTS: u32 = 5;
const WEEK_DAYS: i64 = 7;
const PAYOUT_LABEL: &str = "Task payout";

/// Folds raw earnings rows into the summary. A payment made exactly seven
/// days before `now` still counts toward the week.
fn summarize(rows: RunnerEarningsRows, now: DateTime<Utc>) -> anyhow::Result<RunnerSummary> {
    let week_start = now - Duration::days(WEEK_DAYS);

    let mut total_earnings = Decimal::ZERO;
    let mut weekly_earnings = Decimal::ZERO;
    for (amount, created_at) in &rows.settled {
        let amount = parse_decimal(amount)?;
        total_earnings += amount;
        if parse_timestamp(created_at)? >= week_start {
            weekly_earnings += amount;
        }
    }

    let recent_payments = rows
        .recent
        .into_iter()
        .map(|p| -> anyhow::Result<RecentPayment> {
            Ok(RecentPayment {
                id: p.id.parse()?,
                amount: parse_decimal(&p.amount)?,
                created_at: parse_timestamp(&p.created_at)?,
                task_type: p.task_type.unwrap_or_else(|| PAYOUT_LABEL.to_string()),
            })
        })
        .collect::<anyhow::Result<Vec<_>>>()?;

    Ok(RunnerSummary {
        completed_count: rows.completed_count,
        total_earnings,
        weekly_earnings,
        recent_payments,
    })
}

pub async fn summary(
    State(state): State<AppState>,
    caller: Caller,
    QueryParams(query): QueryParams<RunnerQuery>,
) -> ApiResult<Json<RunnerSummary>> {
    let runner = resolve_actor(&state, caller, query.runner_id, "runnerId", Capability::RunTasks).await?;

    let runner_id = runner.user_id.to_string();
    let rows = run_blocking(&state, move |db| Ok(db.runner_earnings(&runner_id, RECENT_PAYMENTS)?)).await?;
    Ok(Json(summarize(rows, Utc::now())?))
}

pub async fn tasks(
    State(state): State<AppState>,
    caller: Caller,
    QueryParams(query): QueryParams<RunnerQuery>,
) -> ApiResult<Json<RunnerTasksResponse>> {
    let runner = resolve_actor(&state, caller, query.runner_id, "runnerId", Capability::RunTasks).await?;

    let runner_id = runner.user_id.to_string();
    let (available, assigned) = run_blocking(&state, move |db| {
        Ok((db.available_tasks()?, db.assigned_tasks(&runner_id)?))
    })
    .await?;

    Ok(Json(RunnerTasksResponse {
        available: convert::request_views(available)?,
        assigned: convert::request_views(assigned)?,
    }))
}

/// Shared mapping for runner transitions.
fn applied(outcome: TransitionOutcome, conflict: &str, forbidden: &str) -> ApiResult<RequestView> {
    match outcome {
        TransitionOutcome::Applied(row) => Ok(convert::request_view(row, None)?),
        TransitionOutcome::NotFound => Err(ApiError::NotFound("Task not found".into())),
        TransitionOutcome::WrongRunner => Err(ApiError::Forbidden(forbidden.into())),
        TransitionOutcome::Rejected { .. } => Err(ApiError::Conflict(conflict.into())),
    }
}

pub async fn accept_task(
    State(state): State<AppState>,
    caller: Caller,
    PathId(id): PathId,
    Payload(body): Payload<TaskActionBody>,
) -> ApiResult<Json<RequestView>> {
    let runner = resolve_actor(&state, caller, body.runner_id, "runnerId", Capability::RunTasks).await?;

    let runner_id = runner.user_id.to_string();
    let outcome = run_blocking(&state, move |db| Ok(db.accept_request(&id.to_string(), &runner_id)?)).await?;
    let view = applied(
        outcome,
        "Task is no longer available",
        "You cannot accept this request",
    )?;

    info!("Task {} accepted by {}", id, runner.user_id);
    Ok(Json(view))
}

pub async fn start_task(
    State(state): State<AppState>,
    caller: Caller,
    PathId(id): PathId,
    Payload(body): Payload<TaskActionBody>,
) -> ApiResult<Json<RequestView>> {
    let runner = resolve_actor(&state, caller, body.runner_id, "runnerId", Capability::RunTasks).await?;

    let runner_id = runner.user_id.to_string();
    let outcome = run_blocking(&state, move |db| Ok(db.start_request(&id.to_string(), &runner_id)?)).await?;
    let view = applied(
        outcome,
        "Task cannot be started in its current state",
        "You cannot start this request",
    )?;

    info!("Task {} started by {}", id, runner.user_id);
    Ok(Json(view))
}

pub async fn complete_task(
    State(state): State<AppState>,
    caller: Caller,
    PathId(id): PathId,
    Payload(body): Payload<TaskActionBody>,
) -> ApiResult<Json<RequestView>> {
    if body.actual_cost.is_some_and(|cost| cost < Decimal::ZERO) {
        return Err(ApiError::invalid("actualCost", "actualCost must not be negative"));
    }
    let runner = resolve_actor(&state, caller, body.runner_id, "runnerId", Capability::RunTasks).await?;

    let runner_id = runner.user_id.to_string();
    let actual_cost = body.actual_cost.map(|cost| cost.to_string());
    let outcome = run_blocking(&state, move |db| {
        let payout = actual_cost.clone().map(|amount| Payout { amount });
        Ok(db.complete_request(&id.to_string(), &runner_id, actual_cost.as_deref(), payout)?)
    })
    .await?;
    let view = applied(
        outcome,
        "Task is already closed",
        "You cannot complete this request",
    )?;

    info!("Task {} completed by {}", id, runner.user_id);
    Ok(Json(view))
}
