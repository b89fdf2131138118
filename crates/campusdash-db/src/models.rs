//! Database row types. These map directly to SQLite rows and stay distinct
//! from the campusdash-types API models to keep the DB layer independent.

pub struct UserRow {
    pub id: String,
    pub name: String,
    pub email: String,
    pub role: String,
    pub created_at: String,
}

pub struct NewUser {
    pub id: String,
    pub name: String,
    pub email: String,
    pub role: campusdash_types::models::Role,
}

pub struct RunnerProfileRow {
    pub user_id: String,
    pub government_id: String,
    pub status: String,
}

pub struct LocationRow {
    pub id: String,
    pub name: String,
    pub latitude: f64,
    pub longitude: f64,
    pub kind: String,
}

pub struct RequestRow {
    pub id: String,
    pub requester_id: String,
    pub pickup_location_id: String,
    pub drop_location_id: String,
    pub task_type: String,
    pub status: String,
    pub runner_id: Option<String>,
    pub preferred_time: Option<String>,
    pub instructions: Option<String>,
    pub estimated_cost: Option<String>,
    pub actual_cost: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

/// A request joined with its pickup and drop locations and the users on
/// either side of it. `runner` is None until the request is accepted.
pub struct RequestWithLocations {
    pub request: RequestRow,
    pub pickup: Option<LocationRow>,
    pub drop: Option<LocationRow>,
    pub requester: Option<UserRow>,
    pub runner: Option<UserRow>,
}

pub struct NewRequest {
    pub id: String,
    pub requester_id: String,
    pub pickup_location_id: String,
    pub drop_location_id: String,
    pub task_type: String,
    pub preferred_time: Option<String>,
    pub instructions: Option<String>,
    pub estimated_cost: Option<String>,
}

pub struct EventRow {
    pub id: String,
    pub request_id: String,
    pub status: String,
    pub timestamp: String,
}

pub struct PaymentRow {
    pub id: String,
    pub request_id: String,
    pub user_id: String,
    pub amount: String,
    pub status: String,
    pub method: String,
    pub reference: String,
    pub created_at: String,
}

/// Settled payout joined with the task type of the request it paid for.
pub struct RecentPaymentRow {
    pub id: String,
    pub amount: String,
    pub created_at: String,
    pub task_type: Option<String>,
}

/// Raw inputs for a runner's earnings summary, read in one snapshot.
pub struct RunnerEarningsRows {
    pub completed_count: u64,
    /// (amount, created_at) of every settled payment to the runner.
    pub settled: Vec<(String, String)>,
    pub recent: Vec<RecentPaymentRow>,
}

pub struct OtpRow {
    pub id: String,
    pub contact: String,
    pub code_hash: String,
    pub expires_at: String,
    pub consumed: bool,
    pub created_at: String,
}
