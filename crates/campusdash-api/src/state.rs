use std::sync::Arc;

use campusdash_db::Database;
use tracing::error;

use crate::error::{ApiError, ApiResult};
use crate::tokens::TokenService;

pub type AppState = Arc<AppStateInner>;

pub struct AppStateInner {
    pub db: Database,
    pub tokens: TokenService,
    pub options: ApiOptions,
}

/// Switches for behaviour that must never be on by accident in production.
#[derive(Debug, Clone, Copy, Default)]
pub struct ApiOptions {
    /// Let anonymous callers act as the user named by `runnerId` /
    /// `requesterId`. For trusted integrations and local testing only.
    pub service_mode: bool,
    /// Echo freshly issued OTP codes in the send response.
    pub otp_preview: bool,
}

/// Run blocking DB work off the async runtime.
pub(crate) async fn run_blocking<F, T>(state: &AppState, f: F) -> ApiResult<T>
where
    F: FnOnce(&Database) -> ApiResult<T> + Send + 'static,
    T: Send + 'static,
{
    let state = state.clone();
    tokio::task::spawn_blocking(move || f(&state.db))
        .await
        .map_err(|e| {
            error!("spawn_blocking join error: {}", e);
            ApiError::Internal(anyhow::anyhow!("blocking task failed: {}", e))
        })?
}
