//! Row -> API model conversions. Rows hold raw column text; a value that fails
//! to parse here means the database is corrupt and surfaces as a 500.

use anyhow::{Context, Result};
use chrono::{DateTime, NaiveDateTime, Utc};
use rust_decimal::Decimal;
use uuid::Uuid;

use campusdash_db::models::{
    EventRow, LocationRow, RequestRow, RequestWithLocations, RunnerProfileRow, UserRow,
};
use campusdash_types::api::{RequestView, UserSummary};
use campusdash_types::models::{Location, Request, RequestEvent, RunnerProfile, User};

pub fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>> {
    raw.parse::<DateTime<Utc>>()
        .or_else(|_| {
            // SQLite's datetime('now') format, no timezone. Parse as naive UTC.
            NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S").map(|ndt| ndt.and_utc())
        })
        .with_context(|| format!("corrupt timestamp '{}'", raw))
}

pub fn parse_decimal(raw: &str) -> Result<Decimal> {
    raw.parse::<Decimal>()
        .with_context(|| format!("corrupt decimal '{}'", raw))
}

fn parse_id(raw: &str) -> Result<Uuid> {
    raw.parse().with_context(|| format!("corrupt id '{}'", raw))
}

pub fn user(row: UserRow) -> Result<User> {
    Ok(User {
        id: parse_id(&row.id)?,
        role: row.role.parse()?,
        created_at: parse_timestamp(&row.created_at)?,
        name: row.name,
        email: row.email,
    })
}

pub fn runner_profile(row: RunnerProfileRow) -> Result<RunnerProfile> {
    Ok(RunnerProfile {
        user_id: parse_id(&row.user_id)?,
        government_id: row.government_id,
        status: row.status,
    })
}

pub fn location(row: LocationRow) -> Result<Location> {
    Ok(Location {
        id: parse_id(&row.id)?,
        name: row.name,
        latitude: row.latitude,
        longitude: row.longitude,
        kind: row.kind,
    })
}

pub fn request(row: RequestRow) -> Result<Request> {
    Ok(Request {
        id: parse_id(&row.id)?,
        requester_id: parse_id(&row.requester_id)?,
        pickup_location_id: parse_id(&row.pickup_location_id)?,
        drop_location_id: parse_id(&row.drop_location_id)?,
        status: row.status.parse()?,
        runner_id: row.runner_id.as_deref().map(parse_id).transpose()?,
        preferred_time: row.preferred_time.as_deref().map(parse_timestamp).transpose()?,
        estimated_cost: row.estimated_cost.as_deref().map(parse_decimal).transpose()?,
        actual_cost: row.actual_cost.as_deref().map(parse_decimal).transpose()?,
        created_at: parse_timestamp(&row.created_at)?,
        updated_at: parse_timestamp(&row.updated_at)?,
        task_type: row.task_type,
        instructions: row.instructions,
    })
}

pub fn event(row: EventRow) -> Result<RequestEvent> {
    Ok(RequestEvent {
        id: parse_id(&row.id)?,
        request_id: parse_id(&row.request_id)?,
        status: row.status.parse()?,
        timestamp: parse_timestamp(&row.timestamp)?,
    })
}

pub fn request_view(row: RequestWithLocations, events: Option<Vec<EventRow>>) -> Result<RequestView> {
    Ok(RequestView {
        request: request(row.request)?,
        pickup_location: row.pickup.map(location).transpose()?,
        drop_location: row.drop.map(location).transpose()?,
        requester: row.requester.map(user).transpose()?.map(UserSummary::from),
        runner: row.runner.map(user).transpose()?.map(UserSummary::from),
        events: events
            .map(|rows| rows.into_iter().map(event).collect::<Result<Vec<_>>>())
            .transpose()?,
    })
}

pub fn request_views(rows: Vec<RequestWithLocations>) -> Result<Vec<RequestView>> {
    rows.into_iter().map(|row| request_view(row, None)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timestamps_accept_rfc3339_and_sqlite_formats() {
        let a = parse_timestamp("2026-03-01T10:00:00.000000Z").unwrap();
        let b = parse_timestamp("2026-03-01 10:00:00").unwrap();
        assert_eq!(a, b);
        assert!(parse_timestamp("yesterday").is_err());
    }

    #[test]
    fn decimals_keep_exact_precision() {
        let sum: Decimal = ["0.1", "0.2"].iter().map(|s| parse_decimal(s).unwrap()).sum();
        assert_eq!(sum, parse_decimal("0.3").unwrap());
    }

    #[test]
    fn corrupt_rows_are_errors() {
        let row = UserRow {
            id: "not-a-uuid".into(),
            name: "X".into(),
            email: "x@x.test".into(),
            role: "STUDENT".into(),
            created_at: "2026-03-01T10:00:00Z".into(),
        };
        assert!(user(row).is_err());
    }
}
