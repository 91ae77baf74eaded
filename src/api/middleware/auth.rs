//! API key extraction

use axum::{
    extract::{FromRequestParts, Query},
    http::{header, request::Parts, HeaderMap},
};
use serde::Deserialize;
use tracing::warn;

use crate::api::types::ApiError;

/// Extractor for the API key presented with a request
///
/// Sources, in order of precedence:
/// - Authorization header: `Bearer <api_key>`
/// - X-API-Key header: `<api_key>`
/// - `api_key` query parameter (discouraged, keys end up in access logs)
///
/// Only the raw value is extracted; authorization happens in the handler.
#[derive(Debug, Clone)]
pub struct PresentedApiKey(pub String);

#[derive(Debug, Deserialize)]
struct ApiKeyQuery {
    api_key: Option<String>,
}

impl<S> FromRequestParts<S> for PresentedApiKey
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        if let Some(key) = extract_api_key_from_headers(&parts.headers)? {
            return Ok(PresentedApiKey(key));
        }

        let from_query = Query::<ApiKeyQuery>::try_from_uri(&parts.uri)
            .ok()
            .and_then(|Query(q)| q.api_key)
            .map(|k| k.trim().to_string())
            .filter(|k| !k.is_empty());

        if let Some(key) = from_query {
            warn!(
                path = %parts.uri.path(),
                "API key passed as query parameter; use the Authorization or X-API-Key header"
            );
            return Ok(PresentedApiKey(key));
        }

        Err(ApiError::unauthorized(
            "API key required. Provide via 'Authorization: Bearer <key>' or 'X-API-Key: <key>' header",
        ))
    }
}

/// Value of an `Authorization: Bearer` header, if present
pub fn bearer_token(headers: &HeaderMap) -> Result<Option<String>, ApiError> {
    let Some(auth_header) = headers.get(header::AUTHORIZATION) else {
        return Ok(None);
    };

    let auth_str = auth_header
        .to_str()
        .map_err(|_| ApiError::unauthorized("Invalid Authorization header encoding"))?;

    Ok(auth_str
        .strip_prefix("Bearer ")
        .map(|token| token.trim().to_string())
        .filter(|token| !token.is_empty()))
}

fn extract_api_key_from_headers(headers: &HeaderMap) -> Result<Option<String>, ApiError> {
    if let Some(token) = bearer_token(headers)? {
        return Ok(Some(token));
    }

    if let Some(api_key_header) = headers.get("x-api-key") {
        let key = api_key_header
            .to_str()
            .map_err(|_| ApiError::unauthorized("Invalid X-API-Key header encoding"))?
            .trim();

        if !key.is_empty() {
            return Ok(Some(key.to_string()));
        }
    }

    Ok(None)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::{HeaderValue, Request, StatusCode};

    async fn extract(request: Request<()>) -> Result<PresentedApiKey, ApiError> {
        let (mut parts, _) = request.into_parts();
        PresentedApiKey::from_request_parts(&mut parts, &()).await
    }

    #[tokio::test]
    async fn test_extract_bearer_token() {
        let request = Request::builder()
            .header(header::AUTHORIZATION, "Bearer bzk_live_abc123")
            .body(())
            .unwrap();

        let PresentedApiKey(key) = extract(request).await.unwrap();
        assert_eq!(key, "bzk_live_abc123");
    }

    #[tokio::test]
    async fn test_extract_x_api_key() {
        let request = Request::builder()
            .header("x-api-key", "bzk_test_xyz789")
            .body(())
            .unwrap();

        let PresentedApiKey(key) = extract(request).await.unwrap();
        assert_eq!(key, "bzk_test_xyz789");
    }

    #[tokio::test]
    async fn test_bearer_takes_precedence() {
        let request = Request::builder()
            .uri("/v1/authorize?api_key=bzk_live_query")
            .header(header::AUTHORIZATION, "Bearer bzk_live_bearer")
            .header("x-api-key", "bzk_live_header")
            .body(())
            .unwrap();

        let PresentedApiKey(key) = extract(request).await.unwrap();
        assert_eq!(key, "bzk_live_bearer");
    }

    #[tokio::test]
    async fn test_header_takes_precedence_over_query() {
        let request = Request::builder()
            .uri("/v1/authorize?api_key=bzk_live_query")
            .header("x-api-key", "bzk_live_header")
            .body(())
            .unwrap();

        let PresentedApiKey(key) = extract(request).await.unwrap();
        assert_eq!(key, "bzk_live_header");
    }

    #[tokio::test]
    async fn test_query_parameter_fallback() {
        let request = Request::builder()
            .uri("/v1/authorize?api_key=bzk_dev_fromquery")
            .body(())
            .unwrap();

        let PresentedApiKey(key) = extract(request).await.unwrap();
        assert_eq!(key, "bzk_dev_fromquery");
    }

    #[tokio::test]
    async fn test_missing_api_key() {
        let request = Request::builder().uri("/v1/authorize").body(()).unwrap();

        let err = extract(request).await.unwrap_err();
        assert_eq!(err.status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_basic_auth_is_not_a_key() {
        let request = Request::builder()
            .header(header::AUTHORIZATION, "Basic dXNlcjpwYXNz")
            .body(())
            .unwrap();

        assert!(extract(request).await.is_err());
    }

    #[test]
    fn test_trimmed_token() {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::AUTHORIZATION,
            "Bearer   bzk_live_spaced   ".parse().unwrap(),
        );

        assert_eq!(
            bearer_token(&headers).unwrap(),
            Some("bzk_live_spaced".to_string())
        );
    }

    #[tokio::test]
    async fn test_non_ascii_headers_are_unauthorized() {
        let request = Request::builder()
            .header(
                header::AUTHORIZATION,
                HeaderValue::from_bytes(b"Bearer bzk_live_\xff\xfe").unwrap(),
            )
            .body(())
            .unwrap();
        assert_eq!(extract(request).await.unwrap_err().status, StatusCode::UNAUTHORIZED);

        let request = Request::builder()
            .header("x-api-key", HeaderValue::from_bytes(b"bzk_live_\xff").unwrap())
            .body(())
            .unwrap();
        assert_eq!(extract(request).await.unwrap_err().status, StatusCode::UNAUTHORIZED);
    }
}
