//! Authentication gate for protected routes.
//!
//! Per-request token lifecycle: extract credentials, verify the access
//! token, transparently refresh an expired one when a refresh token is
//! present, and write the renewed pair back as cookies so long-lived
//! browser sessions never notice the rotation.

use axum::extract::{FromRequestParts, Request, State};
use axum::http::header::{AUTHORIZATION, SET_COOKIE};
use axum::http::request::Parts;
use axum::http::HeaderValue;
use axum::middleware::Next;
use axum::response::Response;
use parley_core::error::CoreError;

use crate::auth::cookies::{self, ACCESS_COOKIE, REFRESH_COOKIE};
use crate::auth::service::{AuthError, Claims, TokenPair};
use crate::error::AppError;
use crate::state::AppState;

/// Authenticated identity exposed to downstream handlers.
#[derive(Debug, Clone)]
pub struct AuthUser {
    /// Identity-provider subject id; owner key for all session queries.
    pub subject: String,
    pub email: Option<String>,
    pub display_name: Option<String>,
}

impl From<Claims> for AuthUser {
    fn from(claims: Claims) -> Self {
        let display_name = match (&claims.given_name, &claims.family_name) {
            (Some(given), Some(family)) => Some(format!("{given} {family}")),
            (Some(given), None) => Some(given.clone()),
            (None, Some(family)) => Some(family.clone()),
            (None, None) => None,
        };
        Self {
            subject: claims.sub,
            email: claims.email,
            display_name,
        }
    }
}

/// Extractor for handlers behind [`auth_gate`].
impl FromRequestParts<AppState> for AuthUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        _state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        parts.extensions.get::<AuthUser>().cloned().ok_or_else(|| {
            AppError::Core(CoreError::Unauthorized("No token provided".into()))
        })
    }
}

/// Middleware driving the token-lifecycle state machine.
///
/// Outcomes: rejected with 401 before the handler runs, or authenticated
/// with [`AuthUser`] placed in request extensions. When authentication
/// succeeded via a refresh, the new pair is appended to the response as
/// `Set-Cookie` headers.
pub async fn auth_gate(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let headers = request.headers();

    let access_token = headers
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::to_string)
        .or_else(|| cookies::read_cookie(headers, ACCESS_COOKIE));
    let refresh_token = cookies::read_cookie(headers, REFRESH_COOKIE);

    let (claims, renewed) = match (access_token, refresh_token) {
        (None, None) => {
            return Err(AppError::Core(CoreError::Unauthorized(
                "No token provided".into(),
            )));
        }
        (None, Some(refresh)) => refresh_and_verify(&state, &refresh).await?,
        (Some(access), refresh) => match state.token_service.verify(&access).await {
            Ok(claims) => (claims, None),
            Err(AuthError::Expired) => match refresh {
                Some(refresh) => refresh_and_verify(&state, &refresh).await?,
                None => return Err(rejected()),
            },
            Err(AuthError::Invalid) => return Err(rejected()),
        },
    };

    tracing::debug!(subject = %claims.sub, refreshed = renewed.is_some(), "Request authenticated");
    request.extensions_mut().insert(AuthUser::from(claims));

    let mut response = next.run(request).await;
    if let Some(pair) = renewed {
        append_auth_cookies(&mut response, &pair)?;
    }
    Ok(response)
}

/// One refresh exchange, then verification of the new access token.
/// Any failure along the way is an ordinary authentication rejection.
async fn refresh_and_verify(
    state: &AppState,
    refresh_token: &str,
) -> Result<(Claims, Option<TokenPair>), AppError> {
    let pair = state
        .token_service
        .refresh(refresh_token)
        .await
        .ok_or_else(rejected)?;
    let claims = state
        .token_service
        .verify(&pair.access_token)
        .await
        .map_err(|_| rejected())?;
    Ok((claims, Some(pair)))
}

fn rejected() -> AppError {
    AppError::Core(CoreError::Unauthorized("Invalid or expired token".into()))
}

fn append_auth_cookies(response: &mut Response, pair: &TokenPair) -> Result<(), AppError> {
    let access = cookies::access_cookie(&pair.access_token, pair.expires_in);
    let refresh = cookies::refresh_cookie(&pair.refresh_token);
    for cookie in [access, refresh] {
        let value = HeaderValue::from_str(&cookie)
            .map_err(|e| AppError::InternalError(format!("Invalid cookie value: {e}")))?;
        response.headers_mut().append(SET_COOKIE, value);
    }
    Ok(())
}
