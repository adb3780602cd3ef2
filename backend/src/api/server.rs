//! HTTP server for the multiship API.
//!
//! Uploads are converted in a blocking task; the pipeline itself is synchronous.
//!
//! # API Endpoints
//!
//! | Method | Path              | Description                                |
//! |--------|-------------------|--------------------------------------------|
//! | GET    | `/health`         | Health check                               |
//! | GET    | `/api/template`   | Target layout and column aliases           |
//! | POST   | `/api/preview`    | Mapping, groups and first converted rows   |
//! | POST   | `/api/convert`    | Download the zip of address books          |
//! | GET    | `/api/logs`       | SSE stream for real-time logs              |

use axum::{
    extract::{Multipart, State},
    http::{header, HeaderName, Method, StatusCode},
    response::{sse::Event, IntoResponse, Json, Response, Sse},
    routing::{get, post},
    Router,
};
use futures::stream::Stream;
use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use serde_json::{json, Value};
use std::{convert::Infallible, net::SocketAddr, sync::Arc, time::Duration};
use tokio_stream::wrappers::BroadcastStream;
use tokio_stream::StreamExt as _;
use tower_http::cors::CorsLayer;

use super::logs::{log_error, LOG_BROADCASTER};
use super::types::{error_response, ConvertSummary, PreviewResponse};
use crate::config::Template;
use crate::error::{ServerError, ServerResult};
use crate::transform::pipeline::{convert_bytes, preview_bytes, ConvertOptions};

/// Header carrying the JSON summary of a conversion.
const SUMMARY_HEADER: &str = "x-multiship-summary";

/// Characters left as-is in `filename*` and header values.
const UNRESERVED: &AsciiSet = &NON_ALPHANUMERIC.remove(b'-').remove(b'.').remove(b'_').remove(b'~');

type AppState = Arc<Template>;

/// Build the router; split from [`start_server`] so it can be served elsewhere.
pub fn router(template: Template) -> Router {
    let summary = HeaderName::from_static(SUMMARY_HEADER);
    let cors = CorsLayer::new()
        .allow_origin(tower_http::cors::Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::ACCEPT])
        .expose_headers([header::CONTENT_TYPE, header::CONTENT_DISPOSITION, summary]);

    Router::new()
        .route("/", get(health))
        .route("/health", get(health))
        .route("/api/template", get(template_info))
        .route("/api/preview", post(preview_upload))
        .route("/api/convert", post(convert_upload))
        .route("/api/logs", get(sse_logs))
        .layer(cors)
        .with_state(Arc::new(template))
}

/// Start the HTTP server
pub async fn start_server(port: u16, template: Template) -> Result<(), Box<dyn std::error::Error>> {
    let app = router(template);

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    println!("🚀 Multiship server running on http://localhost:{}", port);
    println!("   POST /api/convert  - Upload orders, download zip");
    println!("   POST /api/preview  - Upload orders, inspect mapping");
    println!("   GET  /api/template - Target layout");
    println!("   GET  /api/logs     - SSE log stream");
    println!("   GET  /health       - Health check");
    println!();

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let status = match &self {
            ServerError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ServerError::Convert(e) if e.is_client_error() => StatusCode::BAD_REQUEST,
            ServerError::Convert(_) | ServerError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        let message = match &self {
            ServerError::Convert(e) => e.to_string(),
            ServerError::BadRequest(m) | ServerError::Internal(m) => m.clone(),
        };
        log_error(&message);
        (status, Json(error_response(&message))).into_response()
    }
}

/// Health check endpoint
async fn health() -> Json<Value> {
    Json(json!({
        "status": "ok",
        "service": "multiship",
        "version": env!("CARGO_PKG_VERSION"),
        "endpoints": {
            "template": "GET /api/template",
            "preview": "POST /api/preview",
            "convert": "POST /api/convert",
            "logs": "GET /api/logs (SSE)"
        }
    }))
}

async fn template_info(State(template): State<AppState>) -> Json<Template> {
    Json(template.as_ref().clone())
}

/// SSE endpoint for real-time log streaming
async fn sse_logs() -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let stream = BroadcastStream::new(LOG_BROADCASTER.subscribe()).filter_map(|result| {
        // lagged receivers skip what they missed
        let entry = result.ok()?;
        let json = serde_json::to_string(&entry).ok()?;
        Some(Ok(Event::default().data(json)))
    });

    Sse::new(stream).keep_alive(
        axum::response::sse::KeepAlive::new()
            .interval(Duration::from_secs(15))
            .text("keep-alive"),
    )
}

/// Uploaded file from the `file` multipart field.
struct Upload {
    name: Option<String>,
    bytes: Vec<u8>,
}

async fn read_upload(mut multipart: Multipart) -> ServerResult<Upload> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ServerError::BadRequest(format!("Multipart error: {}", e)))?
    {
        if field.name() == Some("file") {
            let name = field.file_name().map(|s| s.to_string());
            let bytes = field
                .bytes()
                .await
                .map_err(|e| ServerError::BadRequest(format!("Read error: {}", e)))?;
            return Ok(Upload { name, bytes: bytes.to_vec() });
        }
    }
    Err(ServerError::BadRequest("No file provided".into()))
}

fn announce(upload: &Upload) {
    println!("\n{}", "=".repeat(70));
    println!(
        "📄 NEW UPLOAD: {} ({} bytes)",
        upload.name.as_deref().unwrap_or("unknown"),
        upload.bytes.len()
    );
    println!("{}\n", "=".repeat(70));
}

async fn preview_upload(State(template): State<AppState>, multipart: Multipart) -> ServerResult<Json<PreviewResponse>> {
    let upload = read_upload(multipart).await?;
    announce(&upload);

    let Upload { name, bytes } = upload;
    let preview = tokio::task::spawn_blocking(move || preview_bytes(&bytes, &template, &ConvertOptions::default()))
        .await
        .map_err(|e| ServerError::Internal(e.to_string()))??;

    Ok(Json(PreviewResponse::new(preview, name)))
}

async fn convert_upload(State(template): State<AppState>, multipart: Multipart) -> ServerResult<Response> {
    let upload = read_upload(multipart).await?;
    announce(&upload);

    let archive_name = template.archive_name.clone();
    let bytes = upload.bytes;
    let result = tokio::task::spawn_blocking(move || convert_bytes(&bytes, &template))
        .await
        .map_err(|e| ServerError::Internal(e.to_string()))??;

    let summary = serde_json::to_string(&ConvertSummary::from(&result))
        .map_err(|e| ServerError::Internal(e.to_string()))?;

    let headers = [
        (header::CONTENT_TYPE, "application/zip".to_string()),
        (header::CONTENT_DISPOSITION, content_disposition(&archive_name)),
        (HeaderName::from_static(SUMMARY_HEADER), percent_encode(&summary)),
    ];
    Ok((headers, result.archive).into_response())
}

/// `attachment` disposition with an ASCII fallback and the UTF-8 name (RFC 6266).
fn content_disposition(file_name: &str) -> String {
    format!(
        "attachment; filename=\"{}\"; filename*=UTF-8''{}",
        ascii_fallback(file_name),
        percent_encode(file_name)
    )
}

fn ascii_fallback(file_name: &str) -> String {
    if file_name.chars().all(|c| c.is_ascii_graphic() && c != '"' && c != '\\') {
        file_name.to_string()
    } else {
        "archive.zip".to_string()
    }
}

/// RFC 3986 percent-encoding of everything outside the unreserved set.
fn percent_encode(value: &str) -> String {
    utf8_percent_encode(value, UNRESERVED).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ConvertError;

    #[test]
    fn test_content_disposition_korean_name() {
        let value = content_disposition("도매매_복수배송지주소록.zip");
        assert!(value.starts_with("attachment; filename=\"archive.zip\""));
        assert!(value.contains("filename*=UTF-8''%EB%8F%84%EB%A7%A4%EB%A7%A4_"));
        assert!(value.ends_with(".zip"));
    }

    #[test]
    fn test_content_disposition_ascii_name() {
        assert_eq!(
            content_disposition("orders.zip"),
            "attachment; filename=\"orders.zip\"; filename*=UTF-8''orders.zip"
        );
    }

    #[test]
    fn test_percent_encode() {
        assert_eq!(percent_encode("a b/c"), "a%20b%2Fc");
        assert_eq!(percent_encode("가"), "%EA%B0%80");
        assert_eq!(percent_encode("a-b.c_d~e"), "a-b.c_d~e");
        assert_eq!(percent_encode("{\"rows\":1}"), "%7B%22rows%22%3A1%7D");
    }

    #[test]
    fn test_error_status_codes() {
        let missing = ServerError::Convert(ConvertError::MissingGroupColumn { candidates: vec!["상품명".into()] });
        assert_eq!(missing.into_response().status(), StatusCode::BAD_REQUEST);

        let bad = ServerError::BadRequest("No file provided".into());
        assert_eq!(bad.into_response().status(), StatusCode::BAD_REQUEST);

        let internal = ServerError::Internal("join".into());
        assert_eq!(internal.into_response().status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
