use anyhow::Result;
use campusdash_types::models::{PaymentMethod, PaymentStatus, RequestStatus};
use chrono::Utc;
use rusqlite::{Connection, Row, Transaction, TransactionBehavior};
use tracing::info;

use crate::models::{EventRow, NewRequest, PaymentRow, RequestRow, RequestWithLocations};
use crate::queries::{OptionalExt, exists, insert_payment, map_optional_location, map_optional_user};
use crate::{Database, format_timestamp, new_id};

pub enum CreateOutcome {
    Created(RequestWithLocations),
    UnknownRequester,
    /// Carries the name of the offending input field.
    UnknownLocation(&'static str),
}

pub enum TransitionOutcome {
    Applied(RequestWithLocations),
    NotFound,
    /// The caller is not the runner assigned to the request.
    WrongRunner,
    /// The current status does not allow the requested transition.
    Rejected { current: RequestStatus },
}

/// Payout recorded alongside a completion.
pub struct Payout {
    pub amount: String,
}

enum Check {
    Proceed,
    WrongRunner,
    Reject,
}

const REQUEST_SELECT: &str = "
    SELECT r.id, r.requester_id, r.pickup_location_id, r.drop_location_id, r.task_type,
           r.status, r.runner_id, r.preferred_time, r.instructions, r.estimated_cost,
           r.actual_cost, r.created_at, r.updated_at,
           p.id, p.name, p.latitude, p.longitude, p.type,
           d.id, d.name, d.latitude, d.longitude, d.type,
           q.id, q.name, q.email, q.role, q.created_at,
           u.id, u.name, u.email, u.role, u.created_at
    FROM requests r
    LEFT JOIN locations p ON r.pickup_location_id = p.id
    LEFT JOIN locations d ON r.drop_location_id = d.id
    LEFT JOIN users q ON r.requester_id = q.id
    LEFT JOIN users u ON r.runner_id = u.id";

impl Database {
    /// Inserts a PENDING request and its first event in one transaction.
    pub fn create_request(&self, new: &NewRequest) -> Result<CreateOutcome> {
        self.with_conn_mut(|conn| {
            let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

            if !exists(&tx, "users", &new.requester_id)? {
                return Ok(CreateOutcome::UnknownRequester);
            }
            if !exists(&tx, "locations", &new.pickup_location_id)? {
                return Ok(CreateOutcome::UnknownLocation("pickupLocationId"));
            }
            if !exists(&tx, "locations", &new.drop_location_id)? {
                return Ok(CreateOutcome::UnknownLocation("dropLocationId"));
            }

            let now = format_timestamp(Utc::now());
            tx.execute(
                "INSERT INTO requests (id, requester_id, pickup_location_id, drop_location_id,
                     task_type, status, preferred_time, instructions, estimated_cost,
                     created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?10)",
                rusqlite::params![
                    new.id,
                    new.requester_id,
                    new.pickup_location_id,
                    new.drop_location_id,
                    new.task_type,
                    RequestStatus::Pending.as_str(),
                    new.preferred_time,
                    new.instructions,
                    new.estimated_cost,
                    now
                ],
            )?;
            insert_event(&tx, &new.id, RequestStatus::Pending, &now)?;

            let created = query_request(&tx, &new.id)?
                .ok_or_else(|| anyhow::anyhow!("request {} vanished after insert", new.id))?;
            tx.commit()?;

            info!("Request {} created by {}", new.id, new.requester_id);
            Ok(CreateOutcome::Created(created))
        })
    }

    /// All requests newest first, optionally restricted to one status.
    pub fn list_requests(&self, status: Option<RequestStatus>) -> Result<Vec<RequestWithLocations>> {
        self.with_conn(|conn| match status {
            Some(status) => query_requests(
                conn,
                "WHERE r.status = ?1 ORDER BY r.created_at DESC, r.rowid DESC",
                &[status.as_str()],
            ),
            None => query_requests(conn, "ORDER BY r.created_at DESC, r.rowid DESC", &[]),
        })
    }

    pub fn get_request(&self, id: &str) -> Result<Option<RequestWithLocations>> {
        self.with_conn(|conn| query_request(conn, id))
    }

    /// The event trail of a request, newest first.
    pub fn request_events(&self, request_id: &str) -> Result<Vec<EventRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id, request_id, status, timestamp FROM request_events
                 WHERE request_id = ?1
                 ORDER BY timestamp DESC, rowid DESC",
            )?;
            let rows = stmt
                .query_map([request_id], |row| {
                    Ok(EventRow {
                        id: row.get(0)?,
                        request_id: row.get(1)?,
                        status: row.get(2)?,
                        timestamp: row.get(3)?,
                    })
                })?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    /// PENDING requests oldest first, so the longest-waiting task is claimed first.
    pub fn available_tasks(&self) -> Result<Vec<RequestWithLocations>> {
        self.with_conn(|conn| {
            query_requests(
                conn,
                "WHERE r.status = ?1 ORDER BY r.created_at ASC, r.rowid ASC",
                &[RequestStatus::Pending.as_str()],
            )
        })
    }

    /// The runner's ASSIGNED and IN_PROGRESS requests, oldest first.
    pub fn assigned_tasks(&self, runner_id: &str) -> Result<Vec<RequestWithLocations>> {
        self.with_conn(|conn| {
            query_requests(
                conn,
                "WHERE r.runner_id = ?1 AND r.status IN (?2, ?3)
                 ORDER BY r.created_at ASC, r.rowid ASC",
                &[
                    runner_id,
                    RequestStatus::Assigned.as_str(),
                    RequestStatus::InProgress.as_str(),
                ],
            )
        })
    }

    /// PENDING -> ASSIGNED. The status guard is part of the UPDATE itself, so
    /// of several concurrent accepts exactly one is applied.
    pub fn accept_request(&self, request_id: &str, runner_id: &str) -> Result<TransitionOutcome> {
        self.with_conn_mut(|conn| {
            transition(
                conn,
                request_id,
                RequestStatus::Assigned,
                |current, _| {
                    if current == RequestStatus::Pending {
                        Check::Proceed
                    } else {
                        Check::Reject
                    }
                },
                |tx, from, now| {
                    Ok(tx.execute(
                        "UPDATE requests SET status = ?1, runner_id = ?2, updated_at = ?3
                         WHERE id = ?4 AND status = ?5",
                        (
                            RequestStatus::Assigned.as_str(),
                            runner_id,
                            now,
                            request_id,
                            from.as_str(),
                        ),
                    )?)
                },
            )
        })
    }

    /// ASSIGNED -> IN_PROGRESS, only by the assigned runner.
    pub fn start_request(&self, request_id: &str, runner_id: &str) -> Result<TransitionOutcome> {
        self.with_conn_mut(|conn| {
            transition(
                conn,
                request_id,
                RequestStatus::InProgress,
                |current, assigned| {
                    if assigned != Some(runner_id) {
                        Check::WrongRunner
                    } else if current.can_transition_to(RequestStatus::InProgress) {
                        Check::Proceed
                    } else {
                        Check::Reject
                    }
                },
                |tx, from, now| {
                    Ok(tx.execute(
                        "UPDATE requests SET status = ?1, updated_at = ?2
                         WHERE id = ?3 AND status = ?4 AND runner_id = ?5",
                        (
                            RequestStatus::InProgress.as_str(),
                            now,
                            request_id,
                            from.as_str(),
                            runner_id,
                        ),
                    )?)
                },
            )
        })
    }

    /// ASSIGNED/IN_PROGRESS -> COMPLETED, only by the assigned runner. A payout,
    /// if given, is recorded as a settled payment in the same transaction.
    pub fn complete_request(
        &self,
        request_id: &str,
        runner_id: &str,
        actual_cost: Option<&str>,
        payout: Option<Payout>,
    ) -> Result<TransitionOutcome> {
        self.with_conn_mut(|conn| {
            transition(
                conn,
                request_id,
                RequestStatus::Completed,
                |current, assigned| {
                    if assigned != Some(runner_id) {
                        Check::WrongRunner
                    } else if current.can_transition_to(RequestStatus::Completed) {
                        Check::Proceed
                    } else {
                        Check::Reject
                    }
                },
                |tx, from, now| {
                    let changed = tx.execute(
                        "UPDATE requests
                         SET status = ?1, actual_cost = COALESCE(?2, actual_cost), updated_at = ?3
                         WHERE id = ?4 AND status = ?5 AND runner_id = ?6",
                        (
                            RequestStatus::Completed.as_str(),
                            actual_cost,
                            now,
                            request_id,
                            from.as_str(),
                            runner_id,
                        ),
                    )?;
                    if changed == 1 {
                        if let Some(payout) = payout {
                            insert_payment(
                                tx,
                                &PaymentRow {
                                    id: new_id(),
                                    request_id: request_id.to_string(),
                                    user_id: runner_id.to_string(),
                                    amount: payout.amount,
                                    status: PaymentStatus::Settled.as_str().to_string(),
                                    method: PaymentMethod::Wallet.as_str().to_string(),
                                    reference: payout_reference(request_id),
                                    created_at: now.to_string(),
                                },
                            )?;
                        }
                    }
                    Ok(changed)
                },
            )
        })
    }

    /// Administrative status change, checked against the lifecycle table.
    /// ASSIGNED is never reachable here because it needs a runner; cancelling
    /// releases the runner.
    pub fn set_request_status(&self, request_id: &str, to: RequestStatus) -> Result<TransitionOutcome> {
        self.with_conn_mut(|conn| {
            transition(
                conn,
                request_id,
                to,
                |current, _| {
                    if to != RequestStatus::Assigned && current.can_transition_to(to) {
                        Check::Proceed
                    } else {
                        Check::Reject
                    }
                },
                |tx, from, now| {
                    Ok(tx.execute(
                        "UPDATE requests
                         SET status = ?1,
                             runner_id = CASE WHEN ?1 = ?2 THEN NULL ELSE runner_id END,
                             updated_at = ?3
                         WHERE id = ?4 AND status = ?5",
                        (
                            to.as_str(),
                            RequestStatus::Cancelled.as_str(),
                            now,
                            request_id,
                            from.as_str(),
                        ),
                    )?)
                },
            )
        })
    }
}

/// Shared skeleton of every status change: read the row, run the caller's
/// precondition, apply a status-guarded UPDATE, append the event. All inside
/// one IMMEDIATE transaction.
fn transition<C, A>(
    conn: &mut Connection,
    request_id: &str,
    to: RequestStatus,
    check: C,
    apply: A,
) -> Result<TransitionOutcome>
where
    C: FnOnce(RequestStatus, Option<&str>) -> Check,
    A: FnOnce(&Transaction<'_>, RequestStatus, &str) -> Result<usize>,
{
    let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

    let current: Option<(String, Option<String>)> = tx
        .query_row(
            "SELECT status, runner_id FROM requests WHERE id = ?1",
            [request_id],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )
        .optional()?;

    let Some((status, runner_id)) = current else {
        return Ok(TransitionOutcome::NotFound);
    };
    let from: RequestStatus = status.parse()?;

    match check(from, runner_id.as_deref()) {
        Check::Proceed => {}
        Check::WrongRunner => return Ok(TransitionOutcome::WrongRunner),
        Check::Reject => return Ok(TransitionOutcome::Rejected { current: from }),
    }

    let now = format_timestamp(Utc::now());
    if apply(&tx, from, &now)? == 0 {
        return Ok(TransitionOutcome::Rejected { current: from });
    }
    insert_event(&tx, request_id, to, &now)?;

    let updated = query_request(&tx, request_id)?
        .ok_or_else(|| anyhow::anyhow!("request {} vanished during update", request_id))?;
    tx.commit()?;

    info!("Request {}: {} -> {}", request_id, from, to);
    Ok(TransitionOutcome::Applied(updated))
}

fn insert_event(conn: &Connection, request_id: &str, status: RequestStatus, at: &str) -> Result<()> {
    conn.execute(
        "INSERT INTO request_events (id, request_id, status, timestamp) VALUES (?1, ?2, ?3, ?4)",
        (new_id(), request_id, status.as_str(), at),
    )?;
    Ok(())
}

fn payout_reference(request_id: &str) -> String {
    let short: String = request_id.chars().filter(|c| *c != '-').take(8).collect();
    format!("PAYOUT-{}", short.to_uppercase())
}

fn query_request(conn: &Connection, id: &str) -> Result<Option<RequestWithLocations>> {
    let sql = format!("{} WHERE r.id = ?1", REQUEST_SELECT);
    conn.query_row(&sql, [id], map_request).optional()
}

fn query_requests(conn: &Connection, clause: &str, params: &[&str]) -> Result<Vec<RequestWithLocations>> {
    let sql = format!("{} {}", REQUEST_SELECT, clause);
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt
        .query_map(rusqlite::params_from_iter(params.iter()), map_request)?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(rows)
}

fn map_request(row: &Row<'_>) -> rusqlite::Result<RequestWithLocations> {
    Ok(RequestWithLocations {
        request: RequestRow {
            id: row.get(0)?,
            requester_id: row.get(1)?,
            pickup_location_id: row.get(2)?,
            drop_location_id: row.get(3)?,
            task_type: row.get(4)?,
            status: row.get(5)?,
            runner_id: row.get(6)?,
            preferred_time: row.get(7)?,
            instructions: row.get(8)?,
            estimated_cost: row.get(9)?,
            actual_cost: row.get(10)?,
            created_at: row.get(11)?,
            updated_at: row.get(12)?,
        },
        pickup: map_optional_location(row, 13)?,
        drop: map_optional_location(row, 18)?,
        requester: map_optional_user(row, 23)?,
        runner: map_optional_user(row, 28)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{db, location, user};
    use campusdash_types::models::Role;
    use std::sync::{Arc, Barrier};

    struct Fixture {
        db: Database,
        student: String,
        runner_a: String,
        runner_b: String,
        library: String,
        hostel: String,
    }

    fn fixture() -> Fixture {
        let db = db();
        let student = user(&db, "Student", Role::Student);
        let runner_a = user(&db, "RunnerA", Role::Runner);
        let runner_b = user(&db, "RunnerB", Role::Runner);
        let library = location(&db, "Main Library");
        let hostel = location(&db, "North Hostel");
        Fixture { db, student, runner_a, runner_b, library, hostel }
    }

    fn create(f: &Fixture) -> String {
        let id = new_id();
        let outcome = f
            .db
            .create_request(&NewRequest {
                id: id.clone(),
                requester_id: f.student.clone(),
                pickup_location_id: f.library.clone(),
                drop_location_id: f.hostel.clone(),
                task_type: "Parcel delivery".into(),
                preferred_time: None,
                instructions: Some("Handle with care".into()),
                estimated_cost: Some("150".into()),
            })
            .unwrap();
        assert!(matches!(outcome, CreateOutcome::Created(_)));
        id
    }

    fn statuses(db: &Database, id: &str) -> Vec<String> {
        db.request_events(id).unwrap().into_iter().map(|e| e.status).collect()
    }

    fn applied(outcome: TransitionOutcome) -> RequestRow {
        match outcome {
            TransitionOutcome::Applied(r) => r.request,
            _ => panic!("transition was not applied"),
        }
    }

    #[test]
    fn create_starts_pending_with_one_event() {
        let f = fixture();
        let id = create(&f);

        let created = f.db.get_request(&id).unwrap().unwrap();
        assert_eq!(created.request.status, "PENDING");
        assert!(created.request.runner_id.is_none());
        assert_eq!(created.pickup.unwrap().name, "Main Library");
        assert_eq!(created.drop.unwrap().name, "North Hostel");
        assert_eq!(created.requester.unwrap().name, "Student");
        assert!(created.runner.is_none());
        assert_eq!(statuses(&f.db, &id), vec!["PENDING"]);
    }

    #[test]
    fn create_reports_missing_references() {
        let f = fixture();
        let mut new = NewRequest {
            id: new_id(),
            requester_id: f.student.clone(),
            pickup_location_id: new_id(),
            drop_location_id: f.hostel.clone(),
            task_type: "Parcel".into(),
            preferred_time: None,
            instructions: None,
            estimated_cost: None,
        };
        assert!(matches!(
            f.db.create_request(&new).unwrap(),
            CreateOutcome::UnknownLocation("pickupLocationId")
        ));

        new.pickup_location_id = f.library.clone();
        new.requester_id = new_id();
        assert!(matches!(f.db.create_request(&new).unwrap(), CreateOutcome::UnknownRequester));
        assert!(f.db.list_requests(None).unwrap().is_empty());
    }

    #[test]
    fn accept_then_complete_builds_trail_and_payout() {
        let f = fixture();
        let id = create(&f);

        let TransitionOutcome::Applied(accepted) = f.db.accept_request(&id, &f.runner_a).unwrap() else {
            panic!("accept was not applied");
        };
        assert_eq!(accepted.runner.unwrap().name, "RunnerA");
        let assigned = accepted.request;
        assert_eq!(assigned.status, "ASSIGNED");
        assert_eq!(assigned.runner_id.as_deref(), Some(f.runner_a.as_str()));

        let completed = applied(
            f.db.complete_request(&id, &f.runner_a, Some("180"), Some(Payout { amount: "180".into() }))
                .unwrap(),
        );
        assert_eq!(completed.status, "COMPLETED");
        assert_eq!(completed.actual_cost.as_deref(), Some("180"));
        assert_eq!(statuses(&f.db, &id), vec!["COMPLETED", "ASSIGNED", "PENDING"]);

        let earnings = f.db.runner_earnings(&f.runner_a, 5).unwrap();
        assert_eq!(earnings.completed_count, 1);
        assert_eq!(earnings.settled.len(), 1);
        assert_eq!(earnings.recent[0].task_type.as_deref(), Some("Parcel delivery"));
    }

    #[test]
    fn accept_requires_pending() {
        let f = fixture();
        let id = create(&f);
        applied(f.db.accept_request(&id, &f.runner_a).unwrap());

        match f.db.accept_request(&id, &f.runner_b).unwrap() {
            TransitionOutcome::Rejected { current } => assert_eq!(current, RequestStatus::Assigned),
            _ => panic!("second accept must be rejected"),
        }
        assert!(matches!(
            f.db.accept_request(&new_id(), &f.runner_b).unwrap(),
            TransitionOutcome::NotFound
        ));
    }

    #[test]
    fn concurrent_accepts_have_exactly_one_winner() {
        let f = fixture();
        let id = create(&f);
        let db = Arc::new(f.db);
        let runners: Vec<String> = (0..8).map(|i| user(&db, &format!("Racer{i}"), Role::Runner)).collect();
        let barrier = Arc::new(Barrier::new(runners.len()));

        let handles: Vec<_> = runners
            .into_iter()
            .map(|runner| {
                let db = db.clone();
                let id = id.clone();
                let barrier = barrier.clone();
                std::thread::spawn(move || {
                    barrier.wait();
                    matches!(db.accept_request(&id, &runner).unwrap(), TransitionOutcome::Applied(_))
                })
            })
            .collect();

        let winners = handles
            .into_iter()
            .map(|h| h.join().unwrap())
            .filter(|won| *won)
            .count();
        assert_eq!(winners, 1);
        assert_eq!(statuses(&db, &id), vec!["ASSIGNED", "PENDING"]);
    }

    #[test]
    fn accepts_from_separate_handles_on_one_file_have_one_winner() {
        const ROUNDS: usize = 10;
        const RACERS: usize = 16;

        let dir = std::env::temp_dir().join(format!("campusdash_race_{}", new_id()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("race.db");
        // Each handle has its own writer connection and its own mutex.
        let handles = [
            Arc::new(Database::open(&path).unwrap()),
            Arc::new(Database::open(&path).unwrap()),
        ];

        let student = user(&handles[0], "Student", Role::Student);
        let library = location(&handles[0], "Main Library");
        let hostel = location(&handles[1], "North Hostel");
        let runners: Vec<String> = (0..RACERS)
            .map(|i| user(&handles[i % 2], &format!("Racer{i}"), Role::Runner))
            .collect();

        for round in 0..ROUNDS {
            let id = new_id();
            let created = handles[round % 2]
                .create_request(&NewRequest {
                    id: id.clone(),
                    requester_id: student.clone(),
                    pickup_location_id: library.clone(),
                    drop_location_id: hostel.clone(),
                    task_type: format!("Round {round}"),
                    preferred_time: None,
                    instructions: None,
                    estimated_cost: None,
                })
                .unwrap();
            assert!(matches!(created, CreateOutcome::Created(_)));

            let barrier = Arc::new(Barrier::new(RACERS));
            let threads: Vec<_> = runners
                .iter()
                .enumerate()
                .map(|(i, runner)| {
                    let db = handles[i % 2].clone();
                    let runner = runner.clone();
                    let id = id.clone();
                    let barrier = barrier.clone();
                    std::thread::spawn(move || {
                        barrier.wait();
                        match db.accept_request(&id, &runner).unwrap() {
                            TransitionOutcome::Applied(row) => Some(row.request.runner_id),
                            TransitionOutcome::Rejected { current } => {
                                assert_eq!(current, RequestStatus::Assigned);
                                None
                            }
                            _ => panic!("unexpected accept outcome"),
                        }
                    })
                })
                .collect();

            let winners: Vec<Option<String>> = threads
                .into_iter()
                .filter_map(|t| t.join().unwrap())
                .collect();
            assert_eq!(winners.len(), 1, "round {round}");

            for db in &handles {
                let stored = db.get_request(&id).unwrap().unwrap().request;
                assert_eq!(stored.status, "ASSIGNED");
                assert_eq!(stored.runner_id, winners[0]);
                assert_eq!(statuses(db, &id), vec!["ASSIGNED", "PENDING"]);
            }
        }

        drop(handles);
        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn only_assigned_runner_can_start_or_complete() {
        let f = fixture();
        let id = create(&f);

        assert!(matches!(
            f.db.complete_request(&id, &f.runner_a, None, None).unwrap(),
            TransitionOutcome::WrongRunner
        ));

        applied(f.db.accept_request(&id, &f.runner_a).unwrap());
        assert!(matches!(
            f.db.start_request(&id, &f.runner_b).unwrap(),
            TransitionOutcome::WrongRunner
        ));
        assert!(matches!(
            f.db.complete_request(&id, &f.runner_b, Some("10"), None).unwrap(),
            TransitionOutcome::WrongRunner
        ));

        let started = applied(f.db.start_request(&id, &f.runner_a).unwrap());
        assert_eq!(started.status, "IN_PROGRESS");
        applied(f.db.complete_request(&id, &f.runner_a, None, None).unwrap());

        assert!(matches!(
            f.db.complete_request(&id, &f.runner_a, None, None).unwrap(),
            TransitionOutcome::Rejected { current: RequestStatus::Completed }
        ));
        assert_eq!(
            statuses(&f.db, &id),
            vec!["COMPLETED", "IN_PROGRESS", "ASSIGNED", "PENDING"]
        );
    }

    #[test]
    fn set_status_follows_state_machine() {
        let f = fixture();
        let id = create(&f);

        assert!(matches!(
            f.db.set_request_status(&id, RequestStatus::Completed).unwrap(),
            TransitionOutcome::Rejected { current: RequestStatus::Pending }
        ));
        assert!(matches!(
            f.db.set_request_status(&id, RequestStatus::Assigned).unwrap(),
            TransitionOutcome::Rejected { .. }
        ));

        applied(f.db.accept_request(&id, &f.runner_a).unwrap());
        let cancelled = applied(f.db.set_request_status(&id, RequestStatus::Cancelled).unwrap());
        assert_eq!(cancelled.status, "CANCELLED");
        assert!(cancelled.runner_id.is_none());
        assert_eq!(statuses(&f.db, &id)[0], "CANCELLED");

        assert!(matches!(
            f.db.set_request_status(&new_id(), RequestStatus::Cancelled).unwrap(),
            TransitionOutcome::NotFound
        ));
    }

    #[test]
    fn task_board_queries_filter_by_status_and_runner() {
        let f = fixture();
        let first = create(&f);
        let second = create(&f);
        let third = create(&f);
        applied(f.db.accept_request(&second, &f.runner_a).unwrap());
        applied(f.db.accept_request(&third, &f.runner_b).unwrap());

        let available: Vec<String> = f.db.available_tasks().unwrap().into_iter().map(|r| r.request.id).collect();
        assert_eq!(available, vec![first.clone()]);

        let mine: Vec<String> = f
            .db
            .assigned_tasks(&f.runner_a)
            .unwrap()
            .into_iter()
            .map(|r| r.request.id)
            .collect();
        assert_eq!(mine, vec![second.clone()]);

        let all: Vec<String> = f.db.list_requests(None).unwrap().into_iter().map(|r| r.request.id).collect();
        assert_eq!(all, vec![third, second, first.clone()]);

        let pending: Vec<String> = f
            .db
            .list_requests(Some(RequestStatus::Pending))
            .unwrap()
            .into_iter()
            .map(|r| r.request.id)
            .collect();
        assert_eq!(pending, vec![first]);
    }
}
