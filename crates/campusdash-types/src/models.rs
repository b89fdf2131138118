use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Returned when a stored or submitted string is not a known enum value.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown {kind} '{value}'")]
pub struct UnknownVariant {
    pub kind: &'static str,
    pub value: String,
}

/// Closed enums stored as TEXT columns. The column value, the JSON value and
/// `Display` all use the same SCREAMING_SNAKE_CASE spelling.
macro_rules! text_enum {
    ($name:ident, $kind:literal, { $($variant:ident => $text:literal),+ $(,)? }) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        pub enum $name {
            $(
                #[serde(rename = $text)]
                $variant,
            )+
        }

        impl $name {
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            pub const fn as_str(self) -> &'static str {
                match self {
                    $($name::$variant => $text),+
                }
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl std::str::FromStr for $name {
            type Err = UnknownVariant;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($text => Ok($name::$variant),)+
                    _ => Err(UnknownVariant { kind: $kind, value: s.to_string() }),
                }
            }
        }
    };
}

text_enum!(Role, "role", {
    Student => "STUDENT",
    Staff => "STAFF",
    Runner => "RUNNER",
});

text_enum!(RequestStatus, "request status", {
    Pending => "PENDING",
    Assigned => "ASSIGNED",
    InProgress => "IN_PROGRESS",
    Completed => "COMPLETED",
    Cancelled => "CANCELLED",
});

text_enum!(PaymentStatus, "payment status", {
    Pending => "PENDING",
    Settled => "SETTLED",
    Failed => "FAILED",
});

text_enum!(PaymentMethod, "payment method", {
    Wallet => "WALLET",
    Upi => "UPI",
    Cash => "CASH",
    Card => "CARD",
});

// -- Roles --

/// Operations gated by role.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Capability {
    /// Post a new delivery request.
    CreateRequest,
    /// Browse, accept, start and complete tasks, and read earnings.
    RunTasks,
}

impl Role {
    pub fn can(self, capability: Capability) -> bool {
        match capability {
            Capability::CreateRequest => matches!(self, Role::Student | Role::Staff),
            Capability::RunTasks => matches!(self, Role::Runner),
        }
    }
}

// -- Request lifecycle --

impl RequestStatus {
    /// The lifecycle state machine. Every status change in the system is
    /// checked against this table.
    pub fn can_transition_to(self, next: RequestStatus) -> bool {
        use RequestStatus::*;
        matches!(
            (self, next),
            (Pending, Assigned)
                | (Assigned, InProgress)
                | (Assigned, Completed)
                | (InProgress, Completed)
                | (Pending | Assigned | InProgress, Cancelled)
        )
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, RequestStatus::Completed | RequestStatus::Cancelled)
    }
}

// -- Entities --

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub role: Role,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunnerProfile {
    pub user_id: Uuid,
    pub government_id: String,
    pub status: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Location {
    pub id: Uuid,
    pub name: String,
    pub latitude: f64,
    pub longitude: f64,
    #[serde(rename = "type")]
    pub kind: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Request {
    pub id: Uuid,
    pub requester_id: Uuid,
    pub pickup_location_id: Uuid,
    pub drop_location_id: Uuid,
    pub task_type: String,
    pub status: RequestStatus,
    pub runner_id: Option<Uuid>,
    pub preferred_time: Option<DateTime<Utc>>,
    pub instructions: Option<String>,
    pub estimated_cost: Option<Decimal>,
    pub actual_cost: Option<Decimal>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Immutable audit entry for one status transition.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestEvent {
    pub id: Uuid,
    pub request_id: Uuid,
    pub status: RequestStatus,
    pub timestamp: DateTime<Utc>,
}
