use chrono::{Duration, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use thiserror::Error;

use campusdash_types::api::{Claims, TokenKind, TokenPair};
use campusdash_types::models::User;

/// Secrets that ship in sample configs and must never sign real tokens.
const PLACEHOLDER_SECRETS: &[&str] = &[
    "change-me-to-a-random-string",
    "dev-secret-change-me",
    "dev-access-secret",
    "dev-refresh-secret",
];

const MIN_SECRET_LEN: usize = 32;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SecretError {
    #[error("{0} is unset")]
    Missing(&'static str),
    #[error("{0} is still a placeholder value")]
    Placeholder(&'static str),
    #[error("{0} must be at least {MIN_SECRET_LEN} bytes")]
    TooShort(&'static str),
    #[error("access and refresh secrets must differ")]
    Shared,
}

#[derive(Debug, Error)]
pub enum TokenError {
    #[error("token rejected: {0}")]
    Rejected(#[from] jsonwebtoken::errors::Error),
    #[error("expected a {expected:?} token")]
    WrongKind { expected: TokenKind },
}

#[derive(Debug, Clone)]
pub struct TokenConfig {
    pub access_secret: String,
    pub refresh_secret: String,
    pub access_ttl: Duration,
    pub refresh_ttl: Duration,
}

impl TokenConfig {
    pub const DEFAULT_ACCESS_TTL_SECS: i64 = 15 * 60;
    pub const DEFAULT_REFRESH_TTL_SECS: i64 = 7 * 24 * 60 * 60;

    /// Rejects configurations that would make tokens forgeable or let one
    /// kind of token stand in for the other.
    pub fn validate(&self) -> Result<(), SecretError> {
        check_secret("access secret", &self.access_secret)?;
        check_secret("refresh secret", &self.refresh_secret)?;
        if self.access_secret == self.refresh_secret {
            return Err(SecretError::Shared);
        }
        Ok(())
    }
}

fn check_secret(name: &'static str, secret: &str) -> Result<(), SecretError> {
    if secret.is_empty() {
        Err(SecretError::Missing(name))
    } else if PLACEHOLDER_SECRETS.contains(&secret) {
        Err(SecretError::Placeholder(name))
    } else if secret.len() < MIN_SECRET_LEN {
        Err(SecretError::TooShort(name))
    } else {
        Ok(())
    }
}

struct SigningKey {
    encoding: EncodingKey,
    decoding: DecodingKey,
    algorithm: Algorithm,
    ttl: Duration,
}

impl SigningKey {
    fn new(secret: &str, algorithm: Algorithm, ttl: Duration) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            algorithm,
            ttl,
        }
    }
}

/// Issues and verifies access (HS256) and refresh (HS512) tokens, each with
/// its own secret.
pub struct TokenService {
    access: SigningKey,
    refresh: SigningKey,
}

impl TokenService {
    pub fn new(config: &TokenConfig) -> Self {
        Self {
            access: SigningKey::new(&config.access_secret, Algorithm::HS256, config.access_ttl),
            refresh: SigningKey::new(&config.refresh_secret, Algorithm::HS512, config.refresh_ttl),
        }
    }

    fn key(&self, kind: TokenKind) -> &SigningKey {
        match kind {
            TokenKind::Access => &self.access,
            TokenKind::Refresh => &self.refresh,
        }
    }

    pub fn issue(&self, user: &User, kind: TokenKind) -> anyhow::Result<String> {
        let key = self.key(kind);
        let now = Utc::now();
        let claims = Claims {
            sub: user.id,
            role: user.role,
            email: user.email.clone(),
            kind,
            iat: now.timestamp() as usize,
            exp: (now + key.ttl).timestamp() as usize,
        };

        let token = encode(&Header::new(key.algorithm), &claims, &key.encoding)?;
        Ok(token)
    }

    pub fn issue_access(&self, user: &User) -> anyhow::Result<String> {
        self.issue(user, TokenKind::Access)
    }

    pub fn issue_refresh(&self, user: &User) -> anyhow::Result<String> {
        self.issue(user, TokenKind::Refresh)
    }

    /// A fresh access + refresh pair. Refreshing always replaces both.
    pub fn issue_pair(&self, user: &User) -> anyhow::Result<TokenPair> {
        Ok(TokenPair {
            access_token: self.issue_access(user)?,
            refresh_token: self.issue_refresh(user)?,
        })
    }

    pub fn verify(&self, token: &str, kind: TokenKind) -> Result<Claims, TokenError> {
        let key = self.key(kind);
        let mut validation = Validation::new(key.algorithm);
        validation.leeway = 0;

        let claims = decode::<Claims>(token, &key.decoding, &validation)?.claims;
        if claims.kind != kind {
            return Err(TokenError::WrongKind { expected: kind });
        }
        Ok(claims)
    }
}
