use axum::{
    extract::{Request, State},
    http::{header, HeaderMap},
    middleware::Next,
    response::{IntoResponse, Response},
};
use base64::{engine::general_purpose, Engine as _};
use serde::Deserialize;
use tracing::debug;
use uuid::Uuid;

use crate::database::caller_repo;
use crate::error::AppError;
use crate::models::Caller;
use crate::state::AppState;

const ACCESS_TOKEN_COOKIE: &str = "access_token=";

#[derive(Deserialize)]
struct JwtPayload {
    user_id: Option<Uuid>,
    sub: Option<String>,
}

/// Token from `Authorization: JWT <t>` / `Bearer <t>`, else the access cookie.
fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    let from_header = headers
        .get(header::AUTHORIZATION)
        .and_then(|hv| hv.to_str().ok())
        .and_then(|value| {
            value
                .strip_prefix("JWT ")
                .or_else(|| value.strip_prefix("Bearer "))
        })
        .map(str::trim);

    from_header.or_else(|| {
        headers
            .get(header::COOKIE)
            .and_then(|hv| hv.to_str().ok())
            .and_then(|cookies| {
                cookies
                    .split(';')
                    .map(str::trim)
                    .find_map(|c| c.strip_prefix(ACCESS_TOKEN_COOKIE))
            })
    })
}

/// User id from the JWT payload (middle part). The signature is checked by
/// whoever issued the token.
fn token_user_id(token: &str) -> Option<Uuid> {
    let mut parts = token.split('.');
    let (_, payload, _) = (parts.next()?, parts.next()?, parts.next()?);
    if parts.next().is_some() {
        return None;
    }
    let bytes = general_purpose::URL_SAFE_NO_PAD
        .decode(payload.trim_end_matches('='))
        .ok()?;
    let payload: JwtPayload = serde_json::from_slice(&bytes).ok()?;
    payload
        .user_id
        .or_else(|| payload.sub.as_deref().and_then(|s| Uuid::parse_str(s).ok()))
}

pub async fn require_auth(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Response {
    let Some(user_id) = bearer_token(request.headers()).and_then(token_user_id) else {
        return AppError::Unauthorized.into_response();
    };

    let lookup = tokio::time::timeout(
        state.config.query_timeout,
        caller_repo::load_caller(&state.pool, user_id),
    )
    .await;

    match lookup {
        Ok(Ok(Some(row))) => {
            request.extensions_mut().insert(Caller::from(row));
            next.run(request).await
        }
        Ok(Ok(None)) => {
            debug!("🔒 Token for unknown or inactive user {}", user_id);
            AppError::Unauthorized.into_response()
        }
        Ok(Err(e)) => AppError::Database(e).into_response(),
        Err(_) => AppError::Timeout.into_response(),
    }
}

#[cfg(test)]
mod tests {
    use axum::http::HeaderValue;

    use super::*;

    fn token(payload: &str) -> String {
        format!(
            "eyJhbGciOiJIUzI1NiJ9.{}.c2lnbmF0dXJl",
            general_purpose::URL_SAFE_NO_PAD.encode(payload)
        )
    }

    #[test]
    fn reads_user_id_or_sub() {
        let id = Uuid::new_v4();
        assert_eq!(token_user_id(&token(&format!(r#"{{"user_id":"{id}"}}"#))), Some(id));
        assert_eq!(token_user_id(&token(&format!(r#"{{"sub":"{id}"}}"#))), Some(id));
        assert_eq!(token_user_id(&token(r#"{"sub":"not-a-uuid"}"#)), None);
        assert_eq!(token_user_id("garbage"), None);
        assert_eq!(token_user_id("a.b.c.d"), None);
    }

    #[test]
    fn header_wins_over_cookie() {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::COOKIE,
            HeaderValue::from_static("theme=dark; access_token=from-cookie"),
        );
        assert_eq!(bearer_token(&headers), Some("from-cookie"));

        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("JWT from-header"));
        assert_eq!(bearer_token(&headers), Some("from-header"));

        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Bearer other"));
        assert_eq!(bearer_token(&headers), Some("other"));
    }

    #[test]
    fn unknown_scheme_falls_back_to_nothing() {
        let mut headers = HeaderMap::new();
        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Basic dXNlcg=="));
        assert_eq!(bearer_token(&headers), None);
    }
}
