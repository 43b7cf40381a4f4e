//! HTTP surface for the compositing daemon.
//!
//! Routes:
//!   GET  /          — static upload page
//!   GET  /health    — daemon status JSON
//!   POST /generate  — multipart photo + crop rectangle → PNG
//!   POST /detect    — multipart photo → suggested crop JSON

use crate::engine::{DetectorHandle, EngineError};
use axum::body::Bytes;
use axum::extract::{DefaultBodyLimit, Multipart, State};
use axum::http::{header, StatusCode};
use axum::response::{Html, IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use medallion_core::compositor::CompositorError;
use medallion_core::{CropRect, Template};
use serde_json::json;
use std::sync::Arc;
use thiserror::Error;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

/// Shared, read-only per-process state.
pub struct AppState {
    pub template: Template,
    pub detector: Option<DetectorHandle>,
}

pub fn create_router(state: Arc<AppState>, max_upload_bytes: usize) -> Router {
    Router::new()
        .route("/", get(index_handler))
        .route("/health", get(health_handler))
        .route("/generate", post(generate_handler))
        .route("/detect", post(detect_handler))
        .layer(DefaultBodyLimit::max(max_upload_bytes))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("Photo missing")]
    PhotoMissing,
    #[error("missing form field: {0}")]
    MissingField(&'static str),
    #[error("invalid value for {field}: {value}")]
    InvalidField { field: &'static str, value: String },
    #[error("invalid crop rectangle: width and height must be at least 1")]
    InvalidCrop,
    #[error("failed to decode photo: {0}")]
    PhotoDecode(image::ImageError),
    #[error("malformed upload: {0}")]
    Multipart(#[from] axum::extract::multipart::MultipartError),
    #[error("no face detected")]
    NoFace,
    #[error("face detection unavailable")]
    DetectorUnavailable,
    #[error("{0}")]
    Compositor(#[from] CompositorError),
    #[error("detector error: {0}")]
    Engine(EngineError),
    #[error("internal error: {0}")]
    Internal(String),
}

impl From<EngineError> for ApiError {
    fn from(err: EngineError) -> Self {
        match err {
            EngineError::NoFaceDetected => ApiError::NoFace,
            other => ApiError::Engine(other),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self {
            ApiError::PhotoMissing
            | ApiError::MissingField(_)
            | ApiError::InvalidField { .. }
            | ApiError::InvalidCrop
            | ApiError::PhotoDecode(_)
            | ApiError::Multipart(_) => StatusCode::BAD_REQUEST,
            ApiError::NoFace => StatusCode::UNPROCESSABLE_ENTITY,
            ApiError::DetectorUnavailable => StatusCode::SERVICE_UNAVAILABLE,
            ApiError::Compositor(_) | ApiError::Engine(_) | ApiError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };
        if status.is_server_error() {
            tracing::error!(error = %self, "request failed");
        } else {
            tracing::debug!(error = %self, "request rejected");
        }
        (status, Json(json!({ "error": self.to_string() }))).into_response()
    }
}

async fn index_handler() -> Html<&'static str> {
    Html(include_str!("../assets/index.html"))
}

async fn health_handler(State(state): State<Arc<AppState>>) -> Json<serde_json::Value> {
    let placement = state.template.placement();
    Json(json!({
        "version": env!("CARGO_PKG_VERSION"),
        "template": {
            "width": state.template.width(),
            "height": state.template.height(),
            "placement": { "diameter": placement.diameter, "x": placement.x, "y": placement.y },
        },
        "detector": state.detector.is_some(),
    }))
}

/// Raw multipart fields of a /generate request, before validation.
#[derive(Default)]
struct GenerateForm {
    photo: Option<Bytes>,
    x: Option<String>,
    y: Option<String>,
    w: Option<String>,
    h: Option<String>,
}

impl GenerateForm {
    async fn read(multipart: &mut Multipart) -> Result<Self, ApiError> {
        let mut form = Self::default();
        while let Some(field) = multipart.next_field().await? {
            let Some(name) = field.name().map(str::to_string) else {
                continue;
            };
            match name.as_str() {
                "photo" => form.photo = Some(field.bytes().await?),
                "x" => form.x = Some(field.text().await?),
                "y" => form.y = Some(field.text().await?),
                "w" => form.w = Some(field.text().await?),
                "h" => form.h = Some(field.text().await?),
                _ => {}
            }
        }
        Ok(form)
    }

    /// Validate field presence and values. The photo check runs first so
    /// a request missing both photo and coordinates reports the photo.
    fn into_parts(self) -> Result<(Bytes, CropRect), ApiError> {
        let photo = self.photo.ok_or(ApiError::PhotoMissing)?;
        let x = parse_coord("x", self.x)?;
        let y = parse_coord("y", self.y)?;
        let w = parse_coord("w", self.w)?;
        let h = parse_coord("h", self.h)?;
        let rect = CropRect::from_f64(x, y, w, h).ok_or(ApiError::InvalidCrop)?;
        Ok((photo, rect))
    }
}

/// Crop coordinates arrive as stringified numbers (often fractional,
/// from a browser crop widget) and are truncated to integers.
fn parse_coord(field: &'static str, value: Option<String>) -> Result<f64, ApiError> {
    let raw = value.ok_or(ApiError::MissingField(field))?;
    raw.trim()
        .parse::<f64>()
        .map_err(|_| ApiError::InvalidField { field, value: raw })
}

async fn generate_handler(
    State(state): State<Arc<AppState>>,
    mut multipart: Multipart,
) -> Result<Response, ApiError> {
    let form = GenerateForm::read(&mut multipart).await?;
    let (photo_bytes, rect) = form.into_parts()?;

    let photo = image::load_from_memory(&photo_bytes).map_err(ApiError::PhotoDecode)?;
    tracing::debug!(
        width = photo.width(),
        height = photo.height(),
        ?rect,
        "photo decoded"
    );

    // Pixel work happens off the reactor.
    let render_state = state.clone();
    let png = tokio::task::spawn_blocking(move || {
        medallion_core::render(&photo, rect, &render_state.template)
    })
    .await
    .map_err(|err| ApiError::Internal(err.to_string()))??;

    Ok(([(header::CONTENT_TYPE, "image/png")], png).into_response())
}

async fn detect_handler(
    State(state): State<Arc<AppState>>,
    mut multipart: Multipart,
) -> Result<Json<serde_json::Value>, ApiError> {
    let mut photo_bytes: Option<Bytes> = None;
    while let Some(field) = multipart.next_field().await? {
        if field.name() == Some("photo") {
            photo_bytes = Some(field.bytes().await?);
        }
    }
    let photo_bytes = photo_bytes.ok_or(ApiError::PhotoMissing)?;
    let photo = image::load_from_memory(&photo_bytes).map_err(ApiError::PhotoDecode)?;

    let detector = state.detector.as_ref().ok_or(ApiError::DetectorUnavailable)?;
    let region = detector.locate(photo).await?;

    Ok(Json(json!({
        "x": region.x,
        "y": region.y,
        "w": region.width,
        "h": region.height,
        "confidence": region.confidence,
    })))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::Request;
    use image::{Rgba, RgbaImage};
    use medallion_core::Placement;
    use tower::ServiceExt;

    const BOUNDARY: &str = "medallion-test-boundary";

    fn test_app() -> Router {
        let template = Template::from_parts(
            RgbaImage::new(64, 64),
            Placement { diameter: 32, x: 8, y: 8 },
        )
        .unwrap();
        let state = Arc::new(AppState {
            template,
            detector: None,
        });
        create_router(state, 8 * 1024 * 1024)
    }

    fn png_photo() -> Vec<u8> {
        let img = RgbaImage::from_pixel(40, 40, Rgba([200, 100, 50, 255]));
        medallion_core::encode_png(&img).unwrap()
    }

    /// Hand-rolled multipart body: (name, filename, bytes) triples.
    fn multipart_body(parts: &[(&str, Option<&str>, &[u8])]) -> Vec<u8> {
        let mut body = Vec::new();
        for (name, filename, data) in parts {
            body.extend_from_slice(format!("--{BOUNDARY}\r\n").as_bytes());
            match filename {
                Some(f) => body.extend_from_slice(
                    format!(
                        "Content-Disposition: form-data; name=\"{name}\"; filename=\"{f}\"\r\n\
                         Content-Type: image/png\r\n\r\n"
                    )
                    .as_bytes(),
                ),
                None => body.extend_from_slice(
                    format!("Content-Disposition: form-data; name=\"{name}\"\r\n\r\n").as_bytes(),
                ),
            }
            body.extend_from_slice(data);
            body.extend_from_slice(b"\r\n");
        }
        body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());
        body
    }

    fn multipart_request(uri: &str, body: Vec<u8>) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={BOUNDARY}"),
            )
            .body(Body::from(body))
            .unwrap()
    }

    async fn body_json(response: Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_generate_without_photo_is_400() {
        let body = multipart_body(&[
            ("x", None, b"0"),
            ("y", None, b"0"),
            ("w", None, b"10"),
            ("h", None, b"10"),
        ]);
        let response = test_app()
            .oneshot(multipart_request("/generate", body))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let json = body_json(response).await;
        assert_eq!(json["error"], "Photo missing");
    }

    #[tokio::test]
    async fn test_generate_returns_template_sized_png() {
        let photo = png_photo();
        let body = multipart_body(&[
            ("photo", Some("photo.png"), &photo),
            ("x", None, b"5.7"),
            ("y", None, b"5.2"),
            ("w", None, b"20"),
            ("h", None, b"20"),
        ]);
        let response = test_app()
            .oneshot(multipart_request("/generate", body))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers().get(header::CONTENT_TYPE).unwrap(),
            "image/png"
        );
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let decoded = image::load_from_memory(&bytes).unwrap();
        assert_eq!((decoded.width(), decoded.height()), (64, 64));
    }

    #[tokio::test]
    async fn test_generate_missing_coordinate_is_400() {
        let photo = png_photo();
        let body = multipart_body(&[
            ("photo", Some("photo.png"), &photo),
            ("x", None, b"0"),
            ("y", None, b"0"),
            ("w", None, b"10"),
        ]);
        let response = test_app()
            .oneshot(multipart_request("/generate", body))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let json = body_json(response).await;
        assert!(json["error"].as_str().unwrap().contains("h"));
    }

    #[tokio::test]
    async fn test_generate_non_numeric_coordinate_is_400() {
        let photo = png_photo();
        let body = multipart_body(&[
            ("photo", Some("photo.png"), &photo),
            ("x", None, b"abc"),
            ("y", None, b"0"),
            ("w", None, b"10"),
            ("h", None, b"10"),
        ]);
        let response = test_app()
            .oneshot(multipart_request("/generate", body))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_generate_zero_size_crop_is_400() {
        let photo = png_photo();
        let body = multipart_body(&[
            ("photo", Some("photo.png"), &photo),
            ("x", None, b"0"),
            ("y", None, b"0"),
            ("w", None, b"0"),
            ("h", None, b"10"),
        ]);
        let response = test_app()
            .oneshot(multipart_request("/generate", body))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_generate_undecodable_photo_is_400() {
        let body = multipart_body(&[
            ("photo", Some("photo.png"), b"not a png"),
            ("x", None, b"0"),
            ("y", None, b"0"),
            ("w", None, b"10"),
            ("h", None, b"10"),
        ]);
        let response = test_app()
            .oneshot(multipart_request("/generate", body))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_detect_without_model_is_503() {
        let photo = png_photo();
        let body = multipart_body(&[("photo", Some("photo.png"), &photo)]);
        let response = test_app()
            .oneshot(multipart_request("/detect", body))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    }

    #[tokio::test]
    async fn test_health_reports_template() {
        let response = test_app()
            .oneshot(
                Request::builder()
                    .uri("/health")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let json = body_json(response).await;
        assert_eq!(json["template"]["width"], 64);
        assert_eq!(json["template"]["placement"]["diameter"], 32);
        assert_eq!(json["detector"], false);
    }

    #[tokio::test]
    async fn test_index_serves_html() {
        let response = test_app()
            .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
    }
}
