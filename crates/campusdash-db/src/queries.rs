use crate::models::{
    LocationRow, NewUser, OtpRow, PaymentRow, RecentPaymentRow, RunnerEarningsRows,
    RunnerProfileRow, UserRow,
};
use crate::{Database, format_timestamp};
use anyhow::Result;
use campusdash_types::models::{PaymentStatus, RequestStatus};
use chrono::Utc;
use rusqlite::{Connection, Row};

impl Database {
    // -- Users --

    pub fn create_user(&self, user: &NewUser) -> Result<()> {
        self.with_conn_mut(|conn| {
            conn.execute(
                "INSERT INTO users (id, name, email, role, created_at) VALUES (?1, ?2, ?3, ?4, ?5)",
                (
                    &user.id,
                    &user.name,
                    &user.email,
                    user.role.as_str(),
                    format_timestamp(Utc::now()),
                ),
            )?;
            Ok(())
        })
    }

    pub fn get_user_by_id(&self, id: &str) -> Result<Option<UserRow>> {
        self.with_conn(|conn| query_user(conn, "id", id))
    }

    pub fn get_user_by_email(&self, email: &str) -> Result<Option<UserRow>> {
        self.with_conn(|conn| query_user(conn, "email", email))
    }

    pub fn list_users(&self) -> Result<Vec<UserRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id, name, email, role, created_at FROM users ORDER BY created_at ASC, rowid ASC",
            )?;
            let rows = stmt
                .query_map([], map_user)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    /// Returns false if no such user existed.
    pub fn delete_user(&self, id: &str) -> Result<bool> {
        self.with_conn_mut(|conn| Ok(conn.execute("DELETE FROM users WHERE id = ?1", [id])? == 1))
    }

    // -- Runner profiles --

    pub fn upsert_runner_profile(&self, user_id: &str, government_id: &str, status: &str) -> Result<()> {
        self.with_conn_mut(|conn| {
            conn.execute(
                "INSERT INTO runner_profiles (user_id, government_id, status) VALUES (?1, ?2, ?3)
                 ON CONFLICT(user_id) DO UPDATE SET government_id = excluded.government_id,
                                                    status = excluded.status",
                (user_id, government_id, status),
            )?;
            Ok(())
        })
    }

    pub fn get_runner_profile(&self, user_id: &str) -> Result<Option<RunnerProfileRow>> {
        self.with_conn(|conn| {
            conn.query_row(
                "SELECT user_id, government_id, status FROM runner_profiles WHERE user_id = ?1",
                [user_id],
                |row| {
                    Ok(RunnerProfileRow {
                        user_id: row.get(0)?,
                        government_id: row.get(1)?,
                        status: row.get(2)?,
                    })
                },
            )
            .optional()
        })
    }

    // -- Locations --

    pub fn create_location(
        &self,
        id: &str,
        name: &str,
        latitude: f64,
        longitude: f64,
        kind: &str,
    ) -> Result<()> {
        self.with_conn_mut(|conn| {
            conn.execute(
                "INSERT INTO locations (id, name, latitude, longitude, type) VALUES (?1, ?2, ?3, ?4, ?5)",
                rusqlite::params![id, name, latitude, longitude, kind],
            )?;
            Ok(())
        })
    }

    pub fn list_locations(&self) -> Result<Vec<LocationRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id, name, latitude, longitude, type FROM locations ORDER BY name ASC",
            )?;
            let rows = stmt
                .query_map([], |row| map_location(row, 0))?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    // -- Payments --

    /// Everything needed for a runner's earnings summary, read in a single
    /// snapshot so the counts and sums agree with each other.
    pub fn runner_earnings(&self, runner_id: &str, recent_limit: u32) -> Result<RunnerEarningsRows> {
        self.with_conn(|conn| {
            let tx = conn.unchecked_transaction()?;

            let completed_count: i64 = tx.query_row(
                "SELECT COUNT(*) FROM requests WHERE runner_id = ?1 AND status = ?2",
                (runner_id, RequestStatus::Completed.as_str()),
                |r| r.get(0),
            )?;

            let settled = {
                let mut stmt = tx.prepare(
                    "SELECT amount, created_at FROM payments WHERE user_id = ?1 AND status = ?2",
                )?;
                stmt.query_map((runner_id, PaymentStatus::Settled.as_str()), |row| {
                    Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
                })?
                .collect::<std::result::Result<Vec<_>, _>>()?
            };

            let recent = {
                let mut stmt = tx.prepare(
                    "SELECT p.id, p.amount, p.created_at, r.task_type
                     FROM payments p
                     LEFT JOIN requests r ON p.request_id = r.id
                     WHERE p.user_id = ?1 AND p.status = ?2
                     ORDER BY p.created_at DESC, p.rowid DESC
                     LIMIT ?3",
                )?;
                stmt.query_map(
                    rusqlite::params![runner_id, PaymentStatus::Settled.as_str(), recent_limit],
                    |row| {
                        Ok(RecentPaymentRow {
                            id: row.get(0)?,
                            amount: row.get(1)?,
                            created_at: row.get(2)?,
                            task_type: row.get(3)?,
                        })
                    },
                )?
                .collect::<std::result::Result<Vec<_>, _>>()?
            };

            tx.commit()?;

            Ok(RunnerEarningsRows {
                completed_count: completed_count as u64,
                settled,
                recent,
            })
        })
    }

    // -- OTP --

    pub fn insert_otp(&self, otp: &OtpRow) -> Result<()> {
        self.with_conn_mut(|conn| {
            conn.execute(
                "INSERT INTO otp_requests (id, contact, code_hash, expires_at, consumed, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                rusqlite::params![
                    otp.id,
                    otp.contact,
                    otp.code_hash,
                    otp.expires_at,
                    otp.consumed,
                    otp.created_at
                ],
            )?;
            Ok(())
        })
    }

    /// The most recent unconsumed OTP for `contact` that expires after `now`.
    /// Older outstanding codes are never considered.
    pub fn latest_active_otp(&self, contact: &str, now: &str) -> Result<Option<OtpRow>> {
        self.with_conn(|conn| {
            conn.query_row(
                "SELECT id, contact, code_hash, expires_at, consumed, created_at
                 FROM otp_requests
                 WHERE contact = ?1 AND consumed = 0 AND expires_at > ?2
                 ORDER BY created_at DESC, rowid DESC
                 LIMIT 1",
                (contact, now),
                |row| {
                    Ok(OtpRow {
                        id: row.get(0)?,
                        contact: row.get(1)?,
                        code_hash: row.get(2)?,
                        expires_at: row.get(3)?,
                        consumed: row.get(4)?,
                        created_at: row.get(5)?,
                    })
                },
            )
            .optional()
        })
    }

    /// Marks an OTP used. Returns false if it was already consumed, so only
    /// one of several concurrent verifications can win.
    pub fn consume_otp(&self, id: &str) -> Result<bool> {
        self.with_conn_mut(|conn| {
            let changed = conn.execute(
                "UPDATE otp_requests SET consumed = 1 WHERE id = ?1 AND consumed = 0",
                [id],
            )?;
            Ok(changed == 1)
        })
    }

    pub fn purge_expired_otps(&self, now: &str) -> Result<usize> {
        self.with_conn_mut(|conn| {
            Ok(conn.execute("DELETE FROM otp_requests WHERE expires_at <= ?1", [now])?)
        })
    }
}

pub(crate) fn insert_payment(conn: &Connection, payment: &PaymentRow) -> Result<()> {
    conn.execute(
        "INSERT INTO payments (id, request_id, user_id, amount, status, method, reference, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
        rusqlite::params![
            payment.id,
            payment.request_id,
            payment.user_id,
            payment.amount,
            payment.status,
            payment.method,
            payment.reference,
            payment.created_at
        ],
    )?;
    Ok(())
}

pub(crate) fn exists(conn: &Connection, table: &str, id: &str) -> Result<bool> {
    let sql = format!("SELECT EXISTS(SELECT 1 FROM {} WHERE id = ?1)", table);
    Ok(conn.query_row(&sql, [id], |r| r.get(0))?)
}

fn query_user(conn: &Connection, column: &str, value: &str) -> Result<Option<UserRow>> {
    let sql = format!(
        "SELECT id, name, email, role, created_at FROM users WHERE {} = ?1",
        column
    );
    conn.query_row(&sql, [value], map_user).optional()
}

fn map_user(row: &Row<'_>) -> rusqlite::Result<UserRow> {
    map_user_at(row, 0)
}

fn map_user_at(row: &Row<'_>, offset: usize) -> rusqlite::Result<UserRow> {
    Ok(UserRow {
        id: row.get(offset)?,
        name: row.get(offset + 1)?,
        email: row.get(offset + 2)?,
        role: row.get(offset + 3)?,
        created_at: row.get(offset + 4)?,
    })
}

/// Same as `map_optional_location`, for five user columns.
pub(crate) fn map_optional_user(row: &Row<'_>, offset: usize) -> rusqlite::Result<Option<UserRow>> {
    match row.get::<_, Option<String>>(offset)? {
        Some(_) => map_user_at(row, offset).map(Some),
        None => Ok(None),
    }
}

/// Maps five location columns starting at `offset`. Returns None when the
/// id column is NULL (unmatched LEFT JOIN).
pub(crate) fn map_optional_location(row: &Row<'_>, offset: usize) -> rusqlite::Result<Option<LocationRow>> {
    match row.get::<_, Option<String>>(offset)? {
        Some(_) => map_location(row, offset).map(Some),
        None => Ok(None),
    }
}

fn map_location(row: &Row<'_>, offset: usize) -> rusqlite::Result<LocationRow> {
    Ok(LocationRow {
        id: row.get(offset)?,
        name: row.get(offset + 1)?,
        latitude: row.get(offset + 2)?,
        longitude: row.get(offset + 3)?,
        kind: row.get(offset + 4)?,
    })
}

/// Extension trait for optional query results
pub(crate) trait OptionalExt<T> {
    fn optional(self) -> Result<Option<T>>;
}

impl<T> OptionalExt<T> for std::result::Result<T, rusqlite::Error> {
    fn optional(self) -> Result<Option<T>> {
        match self {
            Ok(val) => Ok(Some(val)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}
