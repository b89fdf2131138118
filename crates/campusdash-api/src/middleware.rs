use std::convert::Infallible;

use axum::{
    extract::{FromRequestParts, Request, State},
    http::request::Parts,
    middleware::Next,
    response::Response,
};
use axum_extra::headers::{Authorization, HeaderMapExt, authorization::Bearer};
use tracing::debug;
use uuid::Uuid;

use campusdash_types::api::{Claims, TokenKind};
use campusdash_types::models::{Capability, Role, User};

use crate::convert;
use crate::error::{ApiError, ApiResult};
use crate::state::{AppState, run_blocking};

/// Who the caller is, as attached by [`authenticate`].
#[derive(Debug, Clone)]
pub struct Identity {
    pub user_id: Uuid,
    pub role: Role,
    pub email: String,
}

impl From<Claims> for Identity {
    fn from(claims: Claims) -> Self {
        Self {
            user_id: claims.sub,
            role: claims.role,
            email: claims.email,
        }
    }
}

impl From<&User> for Identity {
    fn from(user: &User) -> Self {
        Self {
            user_id: user.id,
            role: user.role,
            email: user.email.clone(),
        }
    }
}

/// Attach an [`Identity`] when a valid bearer access token is present.
/// Requests without one continue anonymously; handlers decide what that means.
pub async fn authenticate(State(state): State<AppState>, mut req: Request, next: Next) -> Response {
    if let Some(Authorization(bearer)) = req.headers().typed_get::<Authorization<Bearer>>() {
        match state.tokens.verify(bearer.token(), TokenKind::Access) {
            Ok(claims) => {
                req.extensions_mut().insert(Identity::from(claims));
            }
            Err(e) => debug!("Ignoring bearer token: {}", e),
        }
    }
    next.run(req).await
}

/// Reject requests that [`authenticate`] left anonymous.
pub async fn require_auth(req: Request, next: Next) -> Result<Response, ApiError> {
    if req.extensions().get::<Identity>().is_none() {
        return Err(ApiError::Unauthorized);
    }
    Ok(next.run(req).await)
}

#[derive(Debug, Clone)]
pub enum Caller {
    Identified(Identity),
    Anonymous,
}

impl<S> FromRequestParts<S> for Caller
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(match parts.extensions.get::<Identity>() {
            Some(identity) => Caller::Identified(identity.clone()),
            None => Caller::Anonymous,
        })
    }
}

fn ensure_capable(identity: &Identity, capability: Capability) -> ApiResult<()> {
    if identity.role.can(capability) {
        return Ok(());
    }
    let message = match capability {
        Capability::CreateRequest => "Only students or staff may create requests",
        Capability::RunTasks => "Runner role required",
    };
    Err(ApiError::Forbidden(message.into()))
}

/// Decide who is acting on a route that names its actor.
///
/// A token identity always wins. In service mode an anonymous caller may
/// instead name the acting user through `field` (`runnerId` / `requesterId`);
/// that user is loaded and held to the same role check. Outside service mode
/// anonymous callers are rejected.
pub async fn resolve_actor(
    state: &AppState,
    caller: Caller,
    claimed: Option<Uuid>,
    field: &'static str,
    capability: Capability,
) -> ApiResult<Identity> {
    match caller {
        Caller::Identified(identity) => {
            ensure_capable(&identity, capability)?;
            Ok(identity)
        }
        Caller::Anonymous if state.options.service_mode => {
            let id = claimed.ok_or_else(|| ApiError::invalid(field, format!("{} is required", field)))?;
            let user = run_blocking(state, move |db| {
                let row = db
                    .get_user_by_id(&id.to_string())?
                    .ok_or_else(|| ApiError::NotFound("User not found".into()))?;
                Ok(convert::user(row)?)
            })
            .await?;

            let identity = Identity::from(&user);
            ensure_capable(&identity, capability)?;
            debug!("Service mode: acting as {} via {}", identity.user_id, field);
            Ok(identity)
        }
        Caller::Anonymous => Err(ApiError::Unauthorized),
    }
}
