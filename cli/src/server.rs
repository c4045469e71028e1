//! HTTP wrapper: upload a screenshot, get the table back as JSON.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use axum::{
    Json, Router,
    body::Bytes,
    extract::{Multipart, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use gridscan::Pipeline;
use serde::Serialize;
use serde_json::json;
use tokio::net::TcpListener;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn};

use crate::{CliError, stored_upload_name};

/// Shared by every request
#[derive(Clone)]
pub struct AppState {
    pub pipeline: Arc<Pipeline>,
    /// Uploads are kept here, created on first use
    pub upload_dir: PathBuf,
}

impl AppState {
    pub fn new(pipeline: Pipeline, upload_dir: impl Into<PathBuf>) -> Self {
        Self {
            pipeline: Arc::new(pipeline),
            upload_dir: upload_dir.into(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

#[derive(Debug, Serialize)]
pub struct ConvertResponse {
    pub timetable: Vec<Vec<String>>,
}

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/health", get(health_check))
        .route("/convert", post(convert))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Serve on an already bound listener until the process stops
pub async fn serve(listener: TcpListener, state: AppState) -> Result<(), CliError> {
    info!(addr = %listener.local_addr()?, upload_dir = %state.upload_dir.display(), "Upload service listening");
    axum::serve(listener, build_router(state)).await?;
    Ok(())
}

pub async fn index() -> &'static str {
    "Hello!"
}

pub async fn health_check() -> impl IntoResponse {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

/// `POST /convert` with a multipart `image` field
pub async fn convert(State(state): State<AppState>, multipart: Multipart) -> Response {
    let Some((file_name, bytes)) = image_field(multipart).await else {
        return no_image();
    };
    let millis = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_millis())
        .unwrap_or_default();
    let Some(stored_name) = stored_upload_name(&file_name, millis) else {
        warn!(file_name, "Rejected upload with unsupported extension");
        return no_image();
    };

    let path = state.upload_dir.join(&stored_name);
    if let Err(e) = save_upload(&state.upload_dir, &path, bytes).await {
        error!(path = %path.display(), error = %e, "Could not store upload");
        return failure(StatusCode::INTERNAL_SERVER_ERROR, e.to_string());
    }
    info!(path = %path.display(), "Saved upload");

    let pipeline = Arc::clone(&state.pipeline);
    let scan_path = path.clone();
    let scan = tokio::task::spawn_blocking(move || pipeline.process_path(&scan_path)).await;

    match scan {
        Ok(Ok(scan)) => Json(ConvertResponse {
            timetable: scan.table.into_rows(),
        })
        .into_response(),
        Ok(Err(e)) => {
            warn!(path = %path.display(), error = %e, "Scan failed");
            failure(StatusCode::UNPROCESSABLE_ENTITY, e.to_string())
        }
        Err(e) => {
            error!(error = %e, "Scan task panicked");
            failure(StatusCode::INTERNAL_SERVER_ERROR, CliError::Join(e.to_string()).to_string())
        }
    }
}

/// File name and contents of the first `image` field that carries a file name
async fn image_field(mut multipart: Multipart) -> Option<(String, Bytes)> {
    while let Ok(Some(field)) = multipart.next_field().await {
        if field.name() != Some("image") {
            continue;
        }
        let file_name = field.file_name()?.to_string();
        let bytes = field.bytes().await.ok()?;
        if bytes.is_empty() {
            return None;
        }
        return Some((file_name, bytes));
    }
    None
}

async fn save_upload(dir: &std::path::Path, path: &std::path::Path, bytes: Bytes) -> std::io::Result<()> {
    tokio::fs::create_dir_all(dir).await?;
    tokio::fs::write(path, &bytes).await
}

fn no_image() -> Response {
    (StatusCode::UNAUTHORIZED, "No image sent").into_response()
}

fn failure(status: StatusCode, message: String) -> Response {
    (status, Json(json!({ "error": message }))).into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use gridscan::{OcrEngine, OcrEngineFactory, OcrError, ScanConfig};
    use image::{GrayImage, ImageFormat, Luma};
    use reqwest::multipart::{Form, Part};
    use std::io::Cursor;
    use std::time::Duration;

    /// Answers by cell size: narrow column is the day, tall row is the second lesson
    struct SizeEngine;

    impl OcrEngine for SizeEngine {
        fn recognize(&mut self, image: &GrayImage, _deadline: Option<Duration>) -> Result<String, OcrError> {
            let text = match (image.width() < 100, image.height() < 50) {
                (true, true) => "Monday",
                (false, true) => "Maths",
                (true, false) => "Tuesday",
                (false, false) => "Physics",
            };
            Ok(text.to_string())
        }
    }

    struct SizeEngineFactory;

    impl OcrEngineFactory for SizeEngineFactory {
        fn name(&self) -> &str {
            "size"
        }

        fn create(&self) -> gridscan::Result<Box<dyn OcrEngine>> {
            Ok(Box::new(SizeEngine))
        }
    }

    fn timetable_png() -> Vec<u8> {
        let (x0, y0, thickness) = (50u32, 40u32, 3u32);
        let xs = [x0, x0 + 80, x0 + 200];
        let ys = [y0, y0 + 40, y0 + 100];
        let (right, bottom) = (x0 + 200 + thickness, y0 + 100 + thickness);

        let mut gray = GrayImage::from_pixel(400, 300, Luma([255]));
        for (x, y, pixel) in gray.enumerate_pixels_mut() {
            let inside = x >= x0 && x < right && y >= y0 && y < bottom;
            let on_column = xs.iter().any(|&cx| x >= cx && x < cx + thickness);
            let on_row = ys.iter().any(|&ry| y >= ry && y < ry + thickness);
            if inside && (on_column || on_row) {
                *pixel = Luma([0]);
            }
        }

        let mut png = Cursor::new(Vec::new());
        gray.write_to(&mut png, ImageFormat::Png).unwrap();
        png.into_inner()
    }

    async fn spawn_service(upload_dir: PathBuf) -> String {
        let config = ScanConfig {
            expected_rows: 2,
            upscale: false,
            ..Default::default()
        };
        let pipeline = Pipeline::builder()
            .config(config)
            .ocr_engine(SizeEngineFactory)
            .build()
            .unwrap();
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(serve(listener, AppState::new(pipeline, upload_dir)));
        format!("http://{addr}")
    }

    fn upload(name: &str, bytes: Vec<u8>) -> Form {
        Form::new().part("image", Part::bytes(bytes).file_name(name.to_string()))
    }

    #[tokio::test]
    async fn index_and_health() {
        let dir = tempfile::tempdir().unwrap();
        let base = spawn_service(dir.path().to_path_buf()).await;

        let body = reqwest::get(format!("{base}/")).await.unwrap().text().await.unwrap();
        assert_eq!(body, "Hello!");

        let health: serde_json::Value = reqwest::get(format!("{base}/health"))
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        assert_eq!(health["status"], "ok");
    }

    #[tokio::test]
    async fn converts_uploaded_timetable() {
        let dir = tempfile::tempdir().unwrap();
        let uploads = dir.path().join("input_images");
        let base = spawn_service(uploads.clone()).await;

        let response = reqwest::Client::new()
            .post(format!("{base}/convert"))
            .multipart(upload("week.png", timetable_png()))
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), reqwest::StatusCode::OK);

        let body: serde_json::Value = response.json().await.unwrap();
        assert_eq!(body, json!({ "timetable": [["Monday", "Maths"], ["Tuesday", "Physics"]] }));

        let stored: Vec<String> = std::fs::read_dir(&uploads)
            .unwrap()
            .map(|entry| entry.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        assert_eq!(stored.len(), 1);
        assert!(stored[0].ends_with("_week.png"));
    }

    #[tokio::test]
    async fn rejects_unsupported_uploads() {
        let dir = tempfile::tempdir().unwrap();
        let base = spawn_service(dir.path().to_path_buf()).await;
        let client = reqwest::Client::new();

        let response = client
            .post(format!("{base}/convert"))
            .multipart(upload("week.gif", timetable_png()))
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), reqwest::StatusCode::UNAUTHORIZED);
        assert_eq!(response.text().await.unwrap(), "No image sent");

        let response = client
            .post(format!("{base}/convert"))
            .multipart(Form::new().text("note", "no file here"))
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), reqwest::StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn undecodable_upload_is_unprocessable() {
        let dir = tempfile::tempdir().unwrap();
        let base = spawn_service(dir.path().to_path_buf()).await;

        let response = reqwest::Client::new()
            .post(format!("{base}/convert"))
            .multipart(upload("week.png", b"definitely not a png".to_vec()))
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), reqwest::StatusCode::UNPROCESSABLE_ENTITY);
        let body: serde_json::Value = response.json().await.unwrap();
        assert!(body["error"].as_str().unwrap().contains("load"));
    }
}
