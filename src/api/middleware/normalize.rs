//! Response normalization and conditional caching.
//!
//! Innermost stage of every mounted route. It takes the handler's [`Reply`]
//! value, rewrites keys, serializes once, and derives the `ETag` from exactly
//! those bytes. A matching `If-None-Match` on a `GET`/`HEAD` turns a successful
//! reply into `304 Not Modified` with an empty body.
//!
//! Responses that did not come from a [`Reply`] (errors, denials) pass through
//! untouched.
//!
//! [`Reply`]: crate::api::reply::Reply

use axum::{
    body::Body,
    extract::{Request, State},
    http::{
        HeaderValue, Method, StatusCode,
        header::{CACHE_CONTROL, CONTENT_LENGTH, CONTENT_TYPE, ETAG, IF_NONE_MATCH},
        response::Parts,
    },
    middleware::Next,
    response::{IntoResponse, Response},
};

use crate::api::reply::ReplyBody;
use crate::error::AppError;
use crate::utils::etag::weak_etag;
use crate::utils::key_case::{self, KeyCase};

/// Per-route normalization settings.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NormalizeOptions {
    pub key_case: KeyCase,
    /// `0` emits `no-store`; otherwise `public, max-age=<n>`.
    pub cache_seconds: u64,
}

impl NormalizeOptions {
    /// Deep camelCase keys with the given cache lifetime.
    pub fn camel(cache_seconds: u64) -> Self {
        Self {
            key_case: KeyCase::CamelDeep,
            cache_seconds,
        }
    }

    pub fn cache_control(&self) -> String {
        if self.cache_seconds > 0 {
            format!("public, max-age={}", self.cache_seconds)
        } else {
            "no-store".to_string()
        }
    }
}

/// Caching metadata for one serialized body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheDescriptor {
    pub etag: String,
    pub cache_control: String,
    /// Whether the client's validator equals `etag`.
    pub matched: bool,
}

impl CacheDescriptor {
    pub fn new(
        bytes: &[u8],
        options: &NormalizeOptions,
        if_none_match: Option<&HeaderValue>,
    ) -> Self {
        let etag = weak_etag(bytes);
        let matched = if_none_match.is_some_and(|v| v.as_bytes() == etag.as_bytes());

        Self {
            etag,
            cache_control: options.cache_control(),
            matched,
        }
    }
}

/// Normalizes [`Reply`](crate::api::reply::Reply) responses produced further in.
pub async fn layer(State(options): State<NormalizeOptions>, req: Request, next: Next) -> Response {
    let conditional = matches!(*req.method(), Method::GET | Method::HEAD);
    let if_none_match = conditional
        .then(|| req.headers().get(IF_NONE_MATCH).cloned())
        .flatten();

    let (mut parts, body) = next.run(req).await.into_parts();

    match parts.extensions.remove::<ReplyBody>() {
        Some(ReplyBody(value)) => render(parts, value, &options, if_none_match.as_ref()),
        None => Response::from_parts(parts, body),
    }
}

/// Builds the final response for a handler value.
pub fn render(
    mut parts: Parts,
    value: serde_json::Value,
    options: &NormalizeOptions,
    if_none_match: Option<&HeaderValue>,
) -> Response {
    let value = key_case::transform(value, options.key_case);

    let bytes = match serde_json::to_vec(&value) {
        Ok(bytes) => bytes,
        Err(e) => {
            return AppError::internal("Failed to serialize response", Some(e.to_string()))
                .into_response();
        }
    };

    let descriptor = CacheDescriptor::new(&bytes, options, if_none_match);

    if let Ok(etag) = HeaderValue::from_str(&descriptor.etag) {
        parts.headers.insert(ETAG, etag);
    }
    if let Ok(cache_control) = HeaderValue::from_str(&descriptor.cache_control) {
        parts.headers.insert(CACHE_CONTROL, cache_control);
    }

    if descriptor.matched && parts.status.is_success() {
        parts.status = StatusCode::NOT_MODIFIED;
        parts.headers.remove(CONTENT_TYPE);
        parts.headers.remove(CONTENT_LENGTH);
        return Response::from_parts(parts, Body::empty());
    }

    parts
        .headers
        .insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
    Response::from_parts(parts, Body::from(bytes))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::reply::Reply;
    use axum::body::to_bytes;
    use serde_json::json;

    fn reply_parts(reply: Reply) -> (Parts, serde_json::Value) {
        let (mut parts, _) = reply.into_response().into_parts();
        let ReplyBody(value) = parts.extensions.remove::<ReplyBody>().unwrap();
        (parts, value)
    }

    async fn body_bytes(response: Response) -> Vec<u8> {
        to_bytes(response.into_body(), usize::MAX).await.unwrap().to_vec()
    }

    #[tokio::test]
    async fn test_camel_body_and_headers() {
        let (parts, value) = reply_parts(Reply::ok(json!({"user_id": 5, "full_name": "Ada"})));
        let response = render(parts, value, &NormalizeOptions::camel(60), None);

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()[CACHE_CONTROL], "public, max-age=60");
        assert_eq!(response.headers()[CONTENT_TYPE], "application/json");

        let etag = response.headers()[ETAG].to_str().unwrap().to_string();
        let bytes = body_bytes(response).await;
        assert_eq!(bytes, br#"{"fullName":"Ada","userId":5}"#);
        assert_eq!(etag, weak_etag(&bytes));
    }

    #[tokio::test]
    async fn test_etag_tracks_final_bytes_not_handler_value() {
        let snake = json!({"user_id": 5});
        let camel = json!({"userId": 5});

        let (p1, v1) = reply_parts(Reply::ok(snake));
        let (p2, v2) = reply_parts(Reply::ok(camel));
        let a = render(p1, v1, &NormalizeOptions::camel(0), None);
        let b = render(p2, v2, &NormalizeOptions::camel(0), None);

        assert_eq!(a.headers()[ETAG], b.headers()[ETAG]);

        let (p3, v3) = reply_parts(Reply::ok(json!({"user_id": 5})));
        let preserved = render(p3, v3, &NormalizeOptions::default(), None);
        assert_ne!(a.headers()[ETAG], preserved.headers()[ETAG]);
    }

    #[tokio::test]
    async fn test_no_store_without_cache_seconds() {
        let (parts, value) = reply_parts(Reply::ok(json!([])));
        let response = render(parts, value, &NormalizeOptions::default(), None);

        assert_eq!(response.headers()[CACHE_CONTROL], "no-store");
    }

    #[tokio::test]
    async fn test_matching_validator_yields_empty_304() {
        let body = json!({"title": "Hello"});
        let etag = HeaderValue::from_str(&weak_etag(&serde_json::to_vec(&body).unwrap())).unwrap();

        let (parts, value) = reply_parts(Reply::ok(body));
        let response = render(parts, value, &NormalizeOptions::camel(30), Some(&etag));

        assert_eq!(response.status(), StatusCode::NOT_MODIFIED);
        assert_eq!(response.headers()[ETAG], etag);
        assert!(response.headers().get(CONTENT_TYPE).is_none());
        assert!(body_bytes(response).await.is_empty());
    }

    #[tokio::test]
    async fn test_non_matching_validator_gets_full_body() {
        let stale = HeaderValue::from_static("W/\"stale\"");

        let (parts, value) = reply_parts(Reply::ok(json!({"a": 1})));
        let response = render(parts, value, &NormalizeOptions::camel(30), Some(&stale));

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_bytes(response).await, br#"{"a":1}"#);
    }

    #[tokio::test]
    async fn test_only_success_replies_become_304() {
        let body = json!({"id": 1});
        let etag = HeaderValue::from_str(&weak_etag(&serde_json::to_vec(&body).unwrap())).unwrap();

        let (parts, value) = reply_parts(Reply::with_status(StatusCode::ACCEPTED, body));
        let response = render(parts, value, &NormalizeOptions::default(), Some(&etag));
        assert_eq!(response.status(), StatusCode::NOT_MODIFIED);

        let body = json!({"id": 1});
        let (parts, value) = reply_parts(Reply::with_status(StatusCode::CONFLICT, body));
        let response = render(parts, value, &NormalizeOptions::default(), Some(&etag));
        assert_eq!(response.status(), StatusCode::CONFLICT);
    }

    #[test]
    fn test_descriptor_requires_exact_match() {
        let options = NormalizeOptions::camel(10);
        let etag = weak_etag(b"{}");
        let strong = HeaderValue::from_str(etag.trim_start_matches("W/")).unwrap();

        assert!(!CacheDescriptor::new(b"{}", &options, Some(&strong)).matched);
        assert!(!CacheDescriptor::new(b"{}", &options, None).matched);

        let exact = HeaderValue::from_str(&etag).unwrap();
        assert!(CacheDescriptor::new(b"{}", &options, Some(&exact)).matched);
    }
}
