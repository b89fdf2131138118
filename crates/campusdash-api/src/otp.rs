use chrono::{DateTime, Duration, Utc};
use rand::Rng;
use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;
use tracing::info;

use campusdash_db::models::OtpRow;
use campusdash_db::{Database, format_timestamp, new_id};
use campusdash_types::models::User;

use crate::convert;
use crate::error::{ApiError, ApiResult};

pub const OTP_TTL_MINUTES: i64 = 5;

/// Uniformly random six-digit code.
pub fn generate_code() -> String {
    rand::rng().random_range(100_000..=999_999).to_string()
}

/// Only the SHA-256 of a code is ever stored.
pub fn hash_code(code: &str) -> String {
    hex::encode(Sha256::digest(code.as_bytes()))
}

fn hash_matches(code: &str, stored_hash: &str) -> bool {
    hash_code(code).as_bytes().ct_eq(stored_hash.as_bytes()).into()
}

pub fn is_valid_code(code: &str) -> bool {
    code.len() == 6 && code.bytes().all(|b| b.is_ascii_digit())
}

pub fn is_valid_contact(contact: &str) -> bool {
    let Some((local, domain)) = contact.split_once('@') else {
        return false;
    };
    !local.is_empty()
        && !domain.contains('@')
        && domain.contains('.')
        && !domain.starts_with('.')
        && !domain.ends_with('.')
        && !contact.chars().any(char::is_whitespace)
}

/// Creates a new OTP for a known user and returns the plain code. Earlier
/// outstanding codes are left alone; verification only trusts the newest.
pub fn issue(db: &Database, contact: &str, now: DateTime<Utc>) -> ApiResult<String> {
    if db.get_user_by_email(contact)?.is_none() {
        return Err(ApiError::NotFound("No user found for this email".into()));
    }

    let code = generate_code();
    db.insert_otp(&OtpRow {
        id: new_id(),
        contact: contact.to_string(),
        code_hash: hash_code(&code),
        expires_at: format_timestamp(now + Duration::minutes(OTP_TTL_MINUTES)),
        consumed: false,
        created_at: format_timestamp(now),
    })?;

    info!("OTP issued, expires in {} minutes", OTP_TTL_MINUTES);
    Ok(code)
}

/// Checks `code` against the newest live OTP for `contact` and consumes it.
pub fn verify(db: &Database, contact: &str, code: &str, now: DateTime<Utc>) -> ApiResult<User> {
    let otp = db
        .latest_active_otp(contact, &format_timestamp(now))?
        .ok_or(ApiError::InvalidOtp)?;

    if !hash_matches(code, &otp.code_hash) {
        return Err(ApiError::InvalidOtp);
    }
    if !db.consume_otp(&otp.id)? {
        // Lost a race with a concurrent verification of the same code.
        return Err(ApiError::InvalidOtp);
    }

    let user = db
        .get_user_by_email(contact)?
        .ok_or_else(|| ApiError::NotFound("User not found".into()))?;
    Ok(convert::user(user)?)
}
