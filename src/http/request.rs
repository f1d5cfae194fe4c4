//! Request handling.
//!
//! # Responsibilities
//! - Attach a request ID (reused from the client or UUID v4) for tracing
//! - Record when the request reached the server
//! - Turn an axum request into a [`RequestSnapshot`]
//!
//! # Design Decisions
//! - The request ID lives in extensions only, so echoed headers are exactly
//!   what the client sent
//! - Body parsing is lenient: unknown or broken bodies produce empty fields

use std::time::Instant;

use axum::{
    body::{Body, Bytes},
    extract::{FromRequest, Multipart, Request},
    http::{header, request::Parts, HeaderMap, HeaderValue},
    middleware::Next,
    response::Response,
};
use serde_json::{Map, Value};
use url::form_urlencoded;
use uuid::Uuid;

use crate::diagnostics::snapshot::{collect_pairs, normalize_path, RequestSnapshot};

pub const X_REQUEST_ID: &str = "x-request-id";

/// Correlation ID for one request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestId(pub String);

/// Instant the request entered the middleware stack.
#[derive(Debug, Clone, Copy)]
pub struct ReceivedAt(pub Instant);

/// Read the request ID placed in extensions by [`assign_request_id`].
pub trait RequestIdExt {
    fn request_id(&self) -> &str;
}

impl<B> RequestIdExt for axum::http::Request<B> {
    fn request_id(&self) -> &str {
        self.extensions()
            .get::<RequestId>()
            .map(|id| id.0.as_str())
            .unwrap_or("unknown")
    }
}

impl RequestIdExt for Parts {
    fn request_id(&self) -> &str {
        self.extensions
            .get::<RequestId>()
            .map(|id| id.0.as_str())
            .unwrap_or("unknown")
    }
}

/// Middleware: reuse the client's `x-request-id` or mint one, and echo it on
/// the response.
pub async fn assign_request_id(mut request: Request, next: Next) -> Response {
    let id = request
        .headers()
        .get(X_REQUEST_ID)
        .and_then(|v| v.to_str().ok())
        .filter(|v| !v.is_empty())
        .map(str::to_owned)
        .unwrap_or_else(|| Uuid::new_v4().to_string());

    request.extensions_mut().insert(RequestId(id.clone()));
    let mut response = next.run(request).await;

    if let Ok(value) = HeaderValue::from_str(&id) {
        response.headers_mut().insert(X_REQUEST_ID, value);
    }
    response
}

/// Middleware: stamp the request with its arrival time.
pub async fn stamp_received_at(mut request: Request, next: Next) -> Response {
    request.extensions_mut().insert(ReceivedAt(Instant::now()));
    next.run(request).await
}

/// Lowercased media type of the request, without parameters.
pub fn media_type(headers: &HeaderMap) -> Option<String> {
    let value = headers.get(header::CONTENT_TYPE)?.to_str().ok()?;
    let essence = value.split(';').next()?.trim();
    (!essence.is_empty()).then(|| essence.to_ascii_lowercase())
}

/// `application/json` and any `application/*+json`.
pub fn is_json_media_type(media_type: &str) -> bool {
    media_type == "application/json"
        || (media_type.starts_with("application/") && media_type.ends_with("+json"))
}

fn is_urlencoded_media_type(media_type: &str) -> bool {
    media_type == "application/x-www-form-urlencoded"
}

fn is_multipart_media_type(media_type: &str) -> bool {
    media_type == "multipart/form-data"
}

/// Text fields of a `multipart/form-data` body. File parts are skipped; any
/// parse error yields an empty map.
async fn multipart_fields(parts: &Parts, body: &[u8]) -> Map<String, Value> {
    let Some(content_type) = parts.headers.get(header::CONTENT_TYPE) else {
        return Map::new();
    };
    let Ok(request) = axum::http::Request::builder()
        .header(header::CONTENT_TYPE, content_type.clone())
        .body(Body::from(Bytes::copy_from_slice(body)))
    else {
        return Map::new();
    };

    let mut multipart = match Multipart::from_request(request, &()).await {
        Ok(multipart) => multipart,
        Err(e) => {
            tracing::debug!(request_id = %parts.request_id(), error = %e, "Ignoring multipart body");
            return Map::new();
        }
    };

    let mut fields = Vec::new();
    loop {
        let field = match multipart.next_field().await {
            Ok(Some(field)) => field,
            Ok(None) => break,
            Err(e) => {
                tracing::debug!(request_id = %parts.request_id(), error = %e, "Malformed multipart body");
                return Map::new();
            }
        };
        if field.file_name().is_some() {
            continue;
        }
        let Some(name) = field.name().map(str::to_owned) else {
            continue;
        };
        match field.text().await {
            Ok(value) => fields.push((name, value)),
            Err(e) => {
                tracing::debug!(request_id = %parts.request_id(), error = %e, "Malformed multipart field");
                return Map::new();
            }
        }
    }
    collect_pairs(fields)
}

/// Header pairs in arrival order; repeated names are joined with `", "`.
///
/// Names come out lowercase: hyper normalizes header names on parse, so the
/// client's original casing is not available here.
pub fn collect_headers(headers: &HeaderMap) -> Vec<(String, String)> {
    headers
        .keys()
        .map(|name| {
            let value = headers
                .get_all(name)
                .iter()
                .map(|v| String::from_utf8_lossy(v.as_bytes()).into_owned())
                .collect::<Vec<_>>()
                .join(", ");
            (name.as_str().to_string(), value)
        })
        .collect()
}

/// Build the snapshot for a request whose body has already been read.
///
/// `path` is the route path with or without its leading slash.
pub async fn extract_snapshot(
    path: &str,
    parts: &Parts,
    body: &[u8],
    connecting_address: String,
) -> RequestSnapshot {
    let query_parameters = parts
        .uri
        .query()
        .map(|query| collect_pairs(form_urlencoded::parse(query.as_bytes())))
        .unwrap_or_default();

    let media_type = media_type(&parts.headers);

    let form_fields = match media_type.as_deref() {
        Some(mt) if is_urlencoded_media_type(mt) => collect_pairs(form_urlencoded::parse(body)),
        Some(mt) if is_multipart_media_type(mt) && !body.is_empty() => {
            multipart_fields(parts, body).await
        }
        _ => Map::new(),
    };

    let json_body = match media_type.as_deref() {
        Some(mt) if is_json_media_type(mt) && !body.is_empty() => {
            match serde_json::from_slice(body) {
                Ok(value) => Some(value),
                Err(e) => {
                    tracing::debug!(
                        request_id = %parts.request_id(),
                        error = %e,
                        "Ignoring malformed JSON body"
                    );
                    None
                }
            }
        }
        _ => None,
    };

    RequestSnapshot {
        method: parts.method.as_str().to_string(),
        path: normalize_path(path),
        headers: collect_headers(&parts.headers),
        query_parameters,
        form_fields,
        json_body,
        connecting_address,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::Request;
    use serde_json::json;

    fn parts(builder: axum::http::request::Builder) -> Parts {
        builder.body(()).unwrap().into_parts().0
    }

    #[test]
    fn test_media_type_strips_parameters() {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::CONTENT_TYPE,
            HeaderValue::from_static("Application/JSON; charset=utf-8"),
        );
        assert_eq!(media_type(&headers).as_deref(), Some("application/json"));
        assert_eq!(media_type(&HeaderMap::new()), None);
    }

    #[test]
    fn test_json_media_types() {
        assert!(is_json_media_type("application/json"));
        assert!(is_json_media_type("application/problem+json"));
        assert!(!is_json_media_type("text/json"));
        assert!(!is_json_media_type("application/x-www-form-urlencoded"));
    }

    #[test]
    fn test_repeated_headers_are_joined() {
        let mut headers = HeaderMap::new();
        headers.append("x-forwarded-for", HeaderValue::from_static("10.0.0.1"));
        headers.insert("host", HeaderValue::from_static("example.com"));
        headers.append("x-forwarded-for", HeaderValue::from_static("8.8.8.8"));

        let collected = collect_headers(&headers);
        assert_eq!(
            collected,
            vec![
                ("x-forwarded-for".to_string(), "10.0.0.1, 8.8.8.8".to_string()),
                ("host".to_string(), "example.com".to_string()),
            ]
        );
    }

    #[tokio::test]
    async fn test_snapshot_query_and_form() {
        let parts = parts(
            Request::builder()
                .method("POST")
                .uri("/submit?q=rust&tag=a&tag=b")
                .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded"),
        );
        let snapshot = extract_snapshot("submit", &parts, b"name=probe&empty=", "10.0.0.9".into()).await;

        assert_eq!(snapshot.method, "POST");
        assert_eq!(snapshot.path, "/submit");
        assert_eq!(
            serde_json::Value::Object(snapshot.query_parameters),
            json!({"q": "rust", "tag": ["a", "b"]})
        );
        assert_eq!(
            serde_json::Value::Object(snapshot.form_fields),
            json!({"name": "probe", "empty": ""})
        );
        assert_eq!(snapshot.json_body, None);
        assert_eq!(snapshot.connecting_address, "10.0.0.9");
    }

    #[tokio::test]
    async fn test_snapshot_json_body() {
        let parts = parts(
            Request::builder()
                .method("PUT")
                .header(header::CONTENT_TYPE, "application/json"),
        );
        let snapshot = extract_snapshot("", &parts, br#"{"a":1}"#, "10.0.0.9".into()).await;
        assert_eq!(snapshot.path, "/");
        assert_eq!(snapshot.json_body, Some(json!({"a": 1})));
        assert!(snapshot.form_fields.is_empty());
    }

    #[tokio::test]
    async fn test_snapshot_malformed_json_is_absent() {
        let parts = parts(Request::builder().header(header::CONTENT_TYPE, "application/json"));
        let snapshot = extract_snapshot("/", &parts, b"{not json", "10.0.0.9".into()).await;
        assert_eq!(snapshot.json_body, None);

        let snapshot = extract_snapshot("/", &parts, b"", "10.0.0.9".into()).await;
        assert_eq!(snapshot.json_body, None);
    }

    #[tokio::test]
    async fn test_json_ignored_without_json_content_type() {
        let parts = parts(Request::builder().header(header::CONTENT_TYPE, "text/plain"));
        let snapshot = extract_snapshot("/", &parts, br#"{"a":1}"#, "10.0.0.9".into()).await;
        assert_eq!(snapshot.json_body, None);
    }

    #[tokio::test]
    async fn test_snapshot_multipart_text_fields() {
        let parts = parts(
            Request::builder()
                .method("POST")
                .header(header::CONTENT_TYPE, "multipart/form-data; boundary=XyZ"),
        );
        let body = "--XyZ\r\n\
            Content-Disposition: form-data; name=\"tag\"\r\n\r\na\r\n\
            --XyZ\r\n\
            Content-Disposition: form-data; name=\"upload\"; filename=\"a.txt\"\r\n\
            Content-Type: text/plain\r\n\r\nfile contents\r\n\
            --XyZ\r\n\
            Content-Disposition: form-data; name=\"tag\"\r\n\r\nb\r\n\
            --XyZ--\r\n";
        let snapshot = extract_snapshot("/upload", &parts, body.as_bytes(), "10.0.0.9".into()).await;
        assert_eq!(
            serde_json::Value::Object(snapshot.form_fields),
            json!({"tag": ["a", "b"]})
        );
    }

    #[tokio::test]
    async fn test_snapshot_broken_multipart_is_empty() {
        let parts = parts(
            Request::builder()
                .method("POST")
                .header(header::CONTENT_TYPE, "multipart/form-data; boundary=XyZ"),
        );
        let snapshot = extract_snapshot("/", &parts, b"not a multipart body", "10.0.0.9".into()).await;
        assert!(snapshot.form_fields.is_empty());

        let parts = parts_without_boundary();
        let snapshot = extract_snapshot("/", &parts, b"--a\r\n", "10.0.0.9".into()).await;
        assert!(snapshot.form_fields.is_empty());
    }

    fn parts_without_boundary() -> Parts {
        parts(Request::builder().header(header::CONTENT_TYPE, "multipart/form-data"))
    }
}
