use axum::{
    extract::{rejection::JsonRejection, Request, State},
    http::{header, HeaderMap},
    middleware::Next,
    response::{IntoResponse, Response},
    Extension, Json,
};
use shared::types::{AuthStatus, LoginRequest, LoginResponse, MessageResponse, UserInfo};
use crate::api::error::ApiError;
use crate::api::routes::AppState;
use crate::session::{token_from_headers, Principal};

/// Attached to gated requests by [`require_session`]
#[derive(Debug, Clone)]
pub struct SessionContext {
    pub token: String,
    pub principal: Principal,
}

/// Reject requests without a live session before they reach the handler.
/// Successful requests get their cookie re-issued so the client-side expiry
/// slides along with the server-side one.
pub async fn require_session(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Response {
    let session = token_from_headers(request.headers()).and_then(|token| {
        state
            .sessions
            .validate(&token)
            .map(|principal| SessionContext { token, principal })
    });

    let Some(session) = session else {
        tracing::debug!("Rejected {} {}: no valid session", request.method(), request.uri());
        return ApiError::Unauthorized.into_response();
    };

    let token = session.token.clone();
    request.extensions_mut().insert(session);
    let mut response = next.run(request).await;

    if !response.headers().contains_key(header::SET_COOKIE) {
        response
            .headers_mut()
            .insert(header::SET_COOKIE, state.cookies.issue(&token));
    }
    response
}

pub async fn login(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Result<Json<LoginRequest>, JsonRejection>,
) -> Result<Response, ApiError> {
    let Ok(Json(body)) = body else {
        tracing::warn!("Login attempt without a readable body");
        return Err(ApiError::Authentication);
    };

    if !state.admin.check(&body.username, &body.password) {
        tracing::warn!("Failed login attempt for user {:?}", body.username);
        return Err(ApiError::Authentication);
    }

    // Drop whatever session the client was carrying before
    if let Some(old) = token_from_headers(&headers) {
        state.sessions.destroy(&old);
    }

    let principal = Principal::admin(state.admin.username.clone());
    let token = state.sessions.create(principal.clone());
    tracing::info!("User {} logged in", principal.username);

    let body = LoginResponse {
        message: "Login successful".to_string(),
        user: principal.into(),
    };
    Ok(([(header::SET_COOKIE, state.cookies.issue(&token))], Json(body)).into_response())
}

pub async fn logout(
    State(state): State<AppState>,
    Extension(session): Extension<SessionContext>,
) -> Response {
    state.sessions.destroy(&session.token);
    tracing::info!("User {} logged out", session.principal.username);

    (
        [(header::SET_COOKIE, state.cookies.clear())],
        Json(MessageResponse::new("Logout successful.")),
    )
        .into_response()
}

pub async fn status(State(state): State<AppState>, headers: HeaderMap) -> Response {
    let session = token_from_headers(&headers)
        .and_then(|token| state.sessions.validate(&token).map(|p| (token, p)));

    match session {
        Some((token, principal)) => {
            let body = AuthStatus {
                is_logged_in: true,
                user: Some(UserInfo::from(principal)),
            };
            ([(header::SET_COOKIE, state.cookies.issue(&token))], Json(body)).into_response()
        }
        None => Json(AuthStatus {
            is_logged_in: false,
            user: None,
        })
        .into_response(),
    }
}
