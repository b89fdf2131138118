use anyhow::Result;
use rusqlite::Connection;
use tracing::info;

pub fn run(conn: &Connection) -> Result<()> {
    conn.execute_batch("CREATE TABLE IF NOT EXISTS schema_version (version INTEGER NOT NULL);")?;

    let version: i64 = conn.query_row(
        "SELECT COALESCE(MAX(version), 0) FROM schema_version",
        [],
        |r| r.get(0),
    )?;

    if version < 1 {
        info!("Running migration v1 (initial schema)");
        conn.execute_batch(
            "
            BEGIN;

            CREATE TABLE users (
                id          TEXT PRIMARY KEY,
                name        TEXT NOT NULL,
                email       TEXT NOT NULL UNIQUE,
                role        TEXT NOT NULL CHECK (role IN ('STUDENT', 'STAFF', 'RUNNER')),
                created_at  TEXT NOT NULL
            );

            CREATE TABLE runner_profiles (
                user_id         TEXT PRIMARY KEY REFERENCES users(id) ON DELETE CASCADE,
                government_id   TEXT NOT NULL,
                status          TEXT NOT NULL DEFAULT 'pending'
            );

            CREATE TABLE locations (
                id          TEXT PRIMARY KEY,
                name        TEXT NOT NULL UNIQUE,
                latitude    REAL NOT NULL,
                longitude   REAL NOT NULL,
                type        TEXT NOT NULL
            );

            CREATE TABLE requests (
                id                  TEXT PRIMARY KEY,
                requester_id        TEXT NOT NULL REFERENCES users(id),
                pickup_location_id  TEXT NOT NULL REFERENCES locations(id),
                drop_location_id    TEXT NOT NULL REFERENCES locations(id),
                task_type           TEXT NOT NULL,
                status              TEXT NOT NULL DEFAULT 'PENDING'
                    CHECK (status IN ('PENDING', 'ASSIGNED', 'IN_PROGRESS', 'COMPLETED', 'CANCELLED')),
                runner_id           TEXT REFERENCES users(id),
                preferred_time      TEXT,
                instructions        TEXT,
                estimated_cost      TEXT,
                actual_cost         TEXT,
                created_at          TEXT NOT NULL,
                updated_at          TEXT NOT NULL,
                CHECK ((runner_id IS NOT NULL) = (status IN ('ASSIGNED', 'IN_PROGRESS', 'COMPLETED')))
            );

            CREATE INDEX idx_requests_status ON requests(status, created_at);
            CREATE INDEX idx_requests_runner ON requests(runner_id, status);

            CREATE TABLE request_events (
                id          TEXT PRIMARY KEY,
                request_id  TEXT NOT NULL REFERENCES requests(id) ON DELETE CASCADE,
                status      TEXT NOT NULL
                    CHECK (status IN ('PENDING', 'ASSIGNED', 'IN_PROGRESS', 'COMPLETED', 'CANCELLED')),
                timestamp   TEXT NOT NULL
            );

            CREATE INDEX idx_request_events_request ON request_events(request_id, timestamp);

            CREATE TABLE payments (
                id          TEXT PRIMARY KEY,
                request_id  TEXT NOT NULL REFERENCES requests(id),
                user_id     TEXT NOT NULL REFERENCES users(id),
                amount      TEXT NOT NULL,
                status      TEXT NOT NULL CHECK (status IN ('PENDING', 'SETTLED', 'FAILED')),
                method      TEXT NOT NULL CHECK (method IN ('WALLET', 'UPI', 'CASH', 'CARD')),
                reference   TEXT NOT NULL,
                created_at  TEXT NOT NULL
            );

            CREATE INDEX idx_payments_user ON payments(user_id, status, created_at);

            CREATE TABLE otp_requests (
                id          TEXT PRIMARY KEY,
                contact     TEXT NOT NULL,
                code_hash   TEXT NOT NULL,
                expires_at  TEXT NOT NULL,
                consumed    INTEGER NOT NULL DEFAULT 0,
                created_at  TEXT NOT NULL
            );

            CREATE INDEX idx_otp_requests_contact ON otp_requests(contact, created_at);

            INSERT INTO schema_version (version) VALUES (1);

            COMMIT;
            ",
        )?;
    }

    info!("Database migrations complete");
    Ok(())
}
