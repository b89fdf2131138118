use anyhow::Result;
use chrono::{Duration, Utc};
use rusqlite::TransactionBehavior;
use tracing::info;

use crate::{Database, format_timestamp};

pub const DEMO_STUDENT_ID: &str = "00000000-0000-0000-0000-00000000a001";
pub const DEMO_RUNNER_ID: &str = "00000000-0000-0000-0000-00000000a002";
pub const DEMO_STUDENT_EMAIL: &str = "demo@campusdash.test";
pub const DEMO_RUNNER_EMAIL: &str = "runner@campusdash.test";

const LIBRARY_ID: &str = "00000000-0000-0000-0000-00000000b001";
const HOSTEL_ID: &str = "00000000-0000-0000-0000-00000000b002";
const CANTEEN_ID: &str = "00000000-0000-0000-0000-00000000b003";

/// Actual cost of the seeded completed request, paid out in full.
const STATIONERY_COST: &str = "180";

impl Database {
    /// Loads the demo campus: a student, an approved runner, three locations,
    /// one request in each of PENDING/ASSIGNED/COMPLETED and a settled payout.
    /// Safe to run repeatedly.
    pub fn seed_demo(&self) -> Result<()> {
        self.with_conn_mut(|conn| {
            let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
            let now = Utc::now();
            let at = |minutes_ago: i64| format_timestamp(now - Duration::minutes(minutes_ago));

            tx.execute(
                "INSERT OR IGNORE INTO users (id, name, email, role, created_at) VALUES
                    (?1, 'Demo Student', ?2, 'STUDENT', ?5),
                    (?3, 'Demo Runner', ?4, 'RUNNER', ?5)",
                (DEMO_STUDENT_ID, DEMO_STUDENT_EMAIL, DEMO_RUNNER_ID, DEMO_RUNNER_EMAIL, at(120)),
            )?;

            tx.execute(
                "INSERT OR IGNORE INTO runner_profiles (user_id, government_id, status)
                 VALUES (?1, 'RUNNER-DEMO-001', 'approved')",
                [DEMO_RUNNER_ID],
            )?;

            tx.execute(
                "INSERT OR IGNORE INTO locations (id, name, latitude, longitude, type) VALUES
                    (?1, 'Main Library', 28.6129, 77.2295, 'academic'),
                    (?2, 'North Hostel', 28.6139, 77.2216, 'hostel'),
                    (?3, 'Central Canteen', 28.6145, 77.2268, 'canteen')",
                (LIBRARY_ID, HOSTEL_ID, CANTEEN_ID),
            )?;

            let requests = [
                (
                    "00000000-0000-0000-0000-00000000c001",
                    LIBRARY_ID,
                    HOSTEL_ID,
                    "Parcel delivery",
                    Some("Handle with care"),
                    &["PENDING"][..],
                    None,
                    None,
                ),
                (
                    "00000000-0000-0000-0000-00000000c002",
                    CANTEEN_ID,
                    HOSTEL_ID,
                    "Food pickup",
                    None,
                    &["PENDING", "ASSIGNED"][..],
                    Some(DEMO_RUNNER_ID),
                    None,
                ),
                (
                    "00000000-0000-0000-0000-00000000c003",
                    LIBRARY_ID,
                    CANTEEN_ID,
                    "Stationery order",
                    None,
                    &["PENDING", "ASSIGNED", "COMPLETED"][..],
                    Some(DEMO_RUNNER_ID),
                    Some(STATIONERY_COST),
                ),
            ];

            for (i, (id, pickup, drop, task_type, instructions, trail, runner, actual_cost)) in
                requests.iter().enumerate()
            {
                let created = 90 - (i as i64) * 20;
                let status = trail[trail.len() - 1];
                let inserted = tx.execute(
                    "INSERT OR IGNORE INTO requests (id, requester_id, pickup_location_id,
                         drop_location_id, task_type, status, runner_id, instructions,
                         actual_cost, created_at, updated_at)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
                    rusqlite::params![
                        id,
                        DEMO_STUDENT_ID,
                        pickup,
                        drop,
                        task_type,
                        status,
                        runner,
                        instructions,
                        actual_cost,
                        at(created),
                        at(created - trail.len() as i64 + 1),
                    ],
                )?;
                if inserted == 0 {
                    continue;
                }
                for (step, event_status) in trail.iter().enumerate() {
                    tx.execute(
                        "INSERT INTO request_events (id, request_id, status, timestamp)
                         VALUES (?1, ?2, ?3, ?4)",
                        (crate::new_id(), id, event_status, at(created - step as i64)),
                    )?;
                }
            }

            tx.execute(
                "INSERT OR IGNORE INTO payments (id, request_id, user_id, amount, status, method,
                     reference, created_at)
                 VALUES ('00000000-0000-0000-0000-00000000d003', '00000000-0000-0000-0000-00000000c003',
                         ?1, ?2, 'SETTLED', 'WALLET', 'RUNNER-PAYOUT-001', ?3)",
                (DEMO_RUNNER_ID, STATIONERY_COST, at(45)),
            )?;

            tx.commit()?;
            info!("Demo data seeded");
            Ok(())
        })
    }
}
