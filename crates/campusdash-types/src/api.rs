use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::{
    Location, Request, RequestEvent, RequestStatus, Role, RunnerProfile, User,
};

// -- JWT Claims --

/// Which secret a token was signed with. Carried in the token so an access
/// token can never pass as a refresh token or the other way round.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenKind {
    Access,
    Refresh,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: Uuid,
    pub role: Role,
    pub email: String,
    #[serde(rename = "use")]
    pub kind: TokenKind,
    pub iat: usize,
    pub exp: usize,
}

// -- Auth --

#[derive(Debug, Deserialize)]
pub struct SendOtpRequest {
    pub contact: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SendOtpResponse {
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub preview_code: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct VerifyOtpRequest {
    pub contact: String,
    pub code: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VerifyOtpResponse {
    pub user: UserSummary,
    pub access_token: String,
    pub refresh_token: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshRequest {
    pub refresh_token: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MeResponse {
    #[serde(flatten)]
    pub user: UserSummary,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub runner_profile: Option<RunnerProfile>,
}

// -- Directory --

#[derive(Debug, Clone, Serialize)]
pub struct UserSummary {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub role: Role,
}

impl From<User> for UserSummary {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            name: user.name,
            email: user.email,
            role: user.role,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct DataResponse<T> {
    pub data: Vec<T>,
}

// -- Requests --

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateRequestBody {
    pub requester_id: Option<Uuid>,
    pub pickup_location_id: Uuid,
    pub drop_location_id: Uuid,
    pub task_type: String,
    pub preferred_time: Option<String>,
    pub instructions: Option<String>,
    pub estimated_cost: Option<Decimal>,
}

#[derive(Debug, Default, Deserialize)]
pub struct StatusQuery {
    pub status: Option<RequestStatus>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateStatusBody {
    pub status: RequestStatus,
}

/// A request together with its locations and, on the detail route, its
/// event trail (newest first).
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestView {
    #[serde(flatten)]
    pub request: Request,
    pub pickup_location: Option<Location>,
    pub drop_location: Option<Location>,
    pub requester: Option<UserSummary>,
    /// Null until a runner accepts the request.
    pub runner: Option<UserSummary>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub events: Option<Vec<RequestEvent>>,
}

#[derive(Debug, Serialize)]
pub struct ListMeta {
    pub count: usize,
}

#[derive(Debug, Serialize)]
pub struct RequestListResponse {
    pub data: Vec<RequestView>,
    pub meta: ListMeta,
}

// -- Runner --

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunnerQuery {
    pub runner_id: Option<Uuid>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskActionBody {
    pub runner_id: Option<Uuid>,
    pub actual_cost: Option<Decimal>,
}

#[derive(Debug, Serialize)]
pub struct RunnerTasksResponse {
    pub available: Vec<RequestView>,
    pub assigned: Vec<RequestView>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RecentPayment {
    pub id: Uuid,
    pub amount: Decimal,
    pub created_at: DateTime<Utc>,
    pub task_type: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RunnerSummary {
    pub completed_count: u64,
    pub total_earnings: Decimal,
    pub weekly_earnings: Decimal,
    pub recent_payments: Vec<RecentPayment>,
}

// -- Misc --

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub service: &'static str,
    pub status: &'static str,
    pub timestamp: DateTime<Utc>,
}
