#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Actix-Web API server for the data extractor.
//!
//! Accepts PDF uploads and runs them through the extraction pipeline,
//! lets clients describe the columns they want via the training context
//! file, and serves the accumulated output CSV as a one-shot download
//! (the file is truncated once it has been streamed).
//!
//! Every request that touches the output CSV or the context file holds
//! [`AppState::output_lock`] for its whole duration, so concurrent
//! uploads never interleave rows and a download never truncates rows an
//! upload is still writing.

mod handlers;
pub mod interactive;

use std::sync::Arc;

use actix_cors::Cors;
use actix_web::{App, HttpServer, middleware, web};
use data_extractor_ai::AiError;
use data_extractor_extract::{ExtractConfig, Extractor};
use thiserror::Error;

const DEFAULT_BIND_ADDR: &str = "127.0.0.1";
const DEFAULT_PORT: u16 = 8080;

/// Errors that can occur while starting the server.
#[derive(Debug, Error)]
pub enum ServerError {
    /// A file operation failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The model client could not be configured.
    #[error(transparent)]
    Ai(#[from] AiError),
}

/// Shared application state.
pub struct AppState {
    /// The extraction pipeline, owning the output CSV and context file.
    pub extractor: Extractor,
    /// File locations the pipeline was built from.
    pub config: ExtractConfig,
    /// Serializes every request that reads or writes the output CSV or
    /// the context file.
    pub output_lock: Arc<tokio::sync::Mutex<()>>,
}

impl AppState {
    /// Creates the state around an already-built extractor.
    #[must_use]
    pub fn new(extractor: Extractor, config: ExtractConfig) -> Self {
        Self {
            extractor,
            config,
            output_lock: Arc::new(tokio::sync::Mutex::new(())),
        }
    }

    /// Builds the state for `config`, creating the model client from the
    /// environment.
    ///
    /// # Errors
    ///
    /// Returns [`ServerError`] if no model credential is set or the upload
    /// directory cannot be created.
    pub fn from_config(config: ExtractConfig) -> Result<Self, ServerError> {
        let generator = data_extractor_ai::create_generator_from_env()?;

        std::fs::create_dir_all(&config.upload_dir)?;

        log::info!(
            "Uploads: {}, context: {}, output: {}",
            config.upload_dir.display(),
            config.context_file.display(),
            config.output_csv.display()
        );

        let extractor = Extractor::from_config(generator, &config);
        Ok(Self::new(extractor, config))
    }
}

/// Registers every route on `cfg`.
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.route("/", web::get().to(handlers::root))
        .route("/health", web::get().to(handlers::health))
        .route("/upload-pdf/", web::post().to(handlers::upload_pdf))
        .route("/upload-columns", web::post().to(handlers::upload_columns))
        .route("/download-csv/", web::get().to(handlers::download_csv));
}

/// Reads `CORS_ALLOWED_ORIGINS` as a comma-separated origin list.
///
/// Returns `None` (allow everything) when the variable is unset or blank.
fn allowed_origins() -> Option<Vec<String>> {
    let origins: Vec<String> = std::env::var("CORS_ALLOWED_ORIGINS")
        .ok()?
        .split(',')
        .map(str::trim)
        .filter(|origin| !origin.is_empty())
        .map(ToString::to_string)
        .collect();

    (!origins.is_empty()).then_some(origins)
}

fn cors(origins: Option<&[String]>) -> Cors {
    origins.map_or_else(Cors::permissive, |origins| {
        origins.iter().fold(
            Cors::default()
                .allow_any_method()
                .allow_any_header()
                .supports_credentials(),
            |cors, origin| cors.allowed_origin(origin),
        )
    })
}

/// Reads `BIND_ADDR` and `PORT`, defaulting to `127.0.0.1:8080`.
#[must_use]
pub fn listen_addr_from_env() -> (String, u16) {
    listen_addr(|name| std::env::var(name).ok())
}

/// Same as [`listen_addr_from_env`], reading variables through `var`.
///
/// A `PORT` that is not a valid port number falls back to the default.
#[must_use]
pub fn listen_addr(var: impl Fn(&str) -> Option<String>) -> (String, u16) {
    let bind_addr = var("BIND_ADDR").unwrap_or_else(|| DEFAULT_BIND_ADDR.to_string());
    let port = var("PORT")
        .and_then(|p| p.trim().parse().ok())
        .unwrap_or(DEFAULT_PORT);
    (bind_addr, port)
}

/// Starts the data extractor API server from environment variables.
///
/// Reads the pipeline configuration and `BIND_ADDR:PORT` (default
/// `127.0.0.1:8080`) and delegates to [`serve`]. The caller is responsible
/// for initializing logging and providing the async runtime (e.g. via
/// `#[actix_web::main]`).
///
/// # Errors
///
/// Returns an `std::io::Result` error if the configuration is invalid, or
/// if the HTTP server fails to bind or encounters a runtime error.
#[allow(clippy::future_not_send)]
pub async fn run_server() -> std::io::Result<()> {
    let config = ExtractConfig::from_env().map_err(std::io::Error::other)?;
    let (bind_addr, port) = listen_addr_from_env();
    serve(config, &bind_addr, port).await
}

/// Starts the Actix-Web HTTP server for `config` on `bind_addr:port`.
///
/// # Errors
///
/// Returns an `std::io::Result` error if the model client cannot be
/// configured, or if the HTTP server fails to bind or encounters a
/// runtime error.
#[allow(clippy::future_not_send)]
pub async fn serve(config: ExtractConfig, bind_addr: &str, port: u16) -> std::io::Result<()> {
    let state = web::Data::new(AppState::from_config(config).map_err(std::io::Error::other)?);

    let origins = allowed_origins();
    match &origins {
        Some(origins) => log::info!("CORS restricted to: {}", origins.join(", ")),
        None => log::info!("CORS: allowing any origin"),
    }

    log::info!("Starting server on {bind_addr}:{port}");

    HttpServer::new(move || {
        App::new()
            .wrap(cors(origins.as_deref()))
            .wrap(middleware::Logger::default())
            .app_data(state.clone())
            .configure(configure)
    })
    .bind((bind_addr, port))?
    .run()
    .await
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use actix_web::http::StatusCode;
    use actix_web::{http::header, test};
    use data_extractor_ai::providers::TextGenerator;
    use data_extractor_extract::context::ContextFile;
    use data_extractor_extract::sink::CsvSink;
    use data_extractor_pdf::ChunkingConfig;
    use serde_json::Value;

    use super::*;

    const BOUNDARY: &str = "----extractor-test-boundary";
    const TABLE: &str = "Name | Count\n---|---\nLeo | 3\n";

    /// Answers every prompt with the same table.
    struct FixedTable {
        calls: Arc<AtomicUsize>,
    }

    #[async_trait::async_trait]
    impl TextGenerator for FixedTable {
        async fn generate(&self, _parts: &[String]) -> Result<String, AiError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(TABLE.to_string())
        }
    }

    struct Fixture {
        dir: tempfile::TempDir,
        config: ExtractConfig,
        original_context: String,
        calls: Arc<AtomicUsize>,
    }

    impl Fixture {
        fn new() -> Self {
            let dir = tempfile::tempdir().unwrap();
            let config = ExtractConfig {
                upload_dir: dir.path().join("pdfs"),
                context_file: dir.path().join("training_data.txt"),
                output_csv: dir.path().join("outputs").join("main.csv"),
                chunking: ChunkingConfig::default(),
            };
            std::fs::create_dir_all(&config.upload_dir).unwrap();

            let original_context: String = (1..=30)
                .map(|i| format!("context line {i}\n"))
                .collect();
            std::fs::write(&config.context_file, &original_context).unwrap();

            Self {
                dir,
                config,
                original_context,
                calls: Arc::new(AtomicUsize::new(0)),
            }
        }

        fn state(&self) -> web::Data<AppState> {
            let extractor = Extractor::new(
                Box::new(FixedTable {
                    calls: self.calls.clone(),
                }),
                CsvSink::new(&self.config.output_csv),
                ContextFile::new(&self.config.context_file),
                self.config.chunking,
            );
            web::Data::new(AppState::new(extractor, self.config.clone()))
        }

        fn pdf(&self, name: &str, text: &str) -> (String, Vec<u8>) {
            let path = self.dir.path().join(name);
            data_extractor_pdf::testing::write_pdf(&path, &[text]).unwrap();
            (name.to_string(), std::fs::read(path).unwrap())
        }

        fn context(&self) -> String {
            std::fs::read_to_string(&self.config.context_file).unwrap()
        }

        fn upload_dir_is_empty(&self) -> bool {
            std::fs::read_dir(&self.config.upload_dir)
                .unwrap()
                .next()
                .is_none()
        }
    }

    fn multipart_body(files: &[(String, Vec<u8>)]) -> Vec<u8> {
        let mut body = Vec::new();
        for (name, bytes) in files {
            body.extend_from_slice(
                format!(
                    "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"files\"; \
                     filename=\"{name}\"\r\nContent-Type: application/pdf\r\n\r\n"
                )
                .as_bytes(),
            );
            body.extend_from_slice(bytes);
            body.extend_from_slice(b"\r\n");
        }
        body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());
        body
    }

    fn upload_request(files: &[(String, Vec<u8>)]) -> test::TestRequest {
        test::TestRequest::post()
            .uri("/upload-pdf/")
            .insert_header((
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={BOUNDARY}"),
            ))
            .set_payload(multipart_body(files))
    }

    fn columns_request(columns: &[&str]) -> test::TestRequest {
        test::TestRequest::post()
            .uri("/upload-columns")
            .set_json(serde_json::json!({ "columns": columns }))
    }

    #[actix_web::test]
    async fn root_and_health_respond() {
        let fixture = Fixture::new();
        let app = test::init_service(
            App::new()
                .app_data(fixture.state())
                .configure(configure),
        )
        .await;

        let root: Value =
            test::call_and_read_body_json(&app, test::TestRequest::get().uri("/").to_request())
                .await;
        assert_eq!(root["message"], "Backend is running successfully");

        let health: Value = test::call_and_read_body_json(
            &app,
            test::TestRequest::get().uri("/health").to_request(),
        )
        .await;
        assert_eq!(health["healthy"], true);
    }

    #[actix_web::test]
    async fn upload_extracts_rows_and_restores_context() {
        let fixture = Fixture::new();
        let app = test::init_service(
            App::new()
                .app_data(fixture.state())
                .configure(configure),
        )
        .await;

        let resp =
            test::call_service(&app, columns_request(&["Name", "Count"]).to_request()).await;
        assert_eq!(resp.status(), StatusCode::OK);
        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["message"], "Columns injected to trainingdata.txt");
        assert!(fixture.context().contains("| Name | Count |"));

        let pdf = fixture.pdf("lions.pdf", "Leo was counted 3 times.");
        let resp = test::call_service(&app, upload_request(&[pdf]).to_request()).await;
        assert_eq!(resp.status(), StatusCode::OK);
        let body: Value = test::read_body_json(resp).await;
        assert_eq!(
            body["message"],
            "1 file(s) processed, and columns removed from trainingdata.txt successfully"
        );

        assert_eq!(fixture.calls.load(Ordering::SeqCst), 1);
        assert_eq!(
            std::fs::read_to_string(&fixture.config.output_csv).unwrap(),
            "Reference_ID,Name,Count\nlions,Leo,3\n"
        );
        assert_eq!(fixture.context(), fixture.original_context);
        assert!(fixture.upload_dir_is_empty());
    }

    #[actix_web::test]
    async fn upload_without_column_block_reports_cleanup_failure() {
        let fixture = Fixture::new();
        let app = test::init_service(
            App::new()
                .app_data(fixture.state())
                .configure(configure),
        )
        .await;

        let pdf = fixture.pdf("lions.pdf", "Leo was counted 3 times.");
        let resp = test::call_service(&app, upload_request(&[pdf]).to_request()).await;
        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let body: Value = test::read_body_json(resp).await;
        assert!(
            body["detail"]
                .as_str()
                .unwrap()
                .starts_with("Error deleting columns from trainingdata.txt:")
        );

        assert!(fixture.config.output_csv.exists());
        assert!(fixture.upload_dir_is_empty());
    }

    #[actix_web::test]
    async fn unreadable_pdf_reports_processing_error_and_cleans_up() {
        let fixture = Fixture::new();
        let app = test::init_service(
            App::new()
                .app_data(fixture.state())
                .configure(configure),
        )
        .await;

        let files = vec![("x.pdf".to_string(), b"notapdf".to_vec())];
        let resp = test::call_service(&app, upload_request(&files).to_request()).await;
        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let body: Value = test::read_body_json(resp).await;
        assert!(
            body["detail"]
                .as_str()
                .unwrap()
                .starts_with("Error processing files:")
        );

        assert_eq!(fixture.calls.load(Ordering::SeqCst), 0);
        assert!(!fixture.config.output_csv.exists());
        assert_eq!(fixture.context(), fixture.original_context);
        assert!(fixture.upload_dir_is_empty());
    }

    #[actix_web::test]
    async fn rejects_non_pdf_upload() {
        let fixture = Fixture::new();
        let app = test::init_service(
            App::new()
                .app_data(fixture.state())
                .configure(configure),
        )
        .await;

        let files = vec![("notes.txt".to_string(), b"hello".to_vec())];
        let resp = test::call_service(&app, upload_request(&files).to_request()).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["detail"], "notes.txt is not a PDF");

        assert_eq!(fixture.calls.load(Ordering::SeqCst), 0);
        assert!(!fixture.config.output_csv.exists());
        assert!(fixture.upload_dir_is_empty());
    }

    #[actix_web::test]
    async fn rejects_empty_column_list() {
        let fixture = Fixture::new();
        let app = test::init_service(
            App::new()
                .app_data(fixture.state())
                .configure(configure),
        )
        .await;

        let resp = test::call_service(&app, columns_request(&[]).to_request()).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["error"], "No column names provided");
        assert_eq!(fixture.context(), fixture.original_context);
    }

    #[actix_web::test]
    async fn download_clears_csv_and_second_download_is_not_found() {
        let fixture = Fixture::new();
        std::fs::create_dir_all(fixture.config.output_csv.parent().unwrap()).unwrap();
        std::fs::write(
            &fixture.config.output_csv,
            "Reference_ID,Name,Count\nlions,Leo,3\n",
        )
        .unwrap();

        let app = test::init_service(
            App::new()
                .app_data(fixture.state())
                .configure(configure),
        )
        .await;

        let resp = test::call_service(
            &app,
            test::TestRequest::get().uri("/download-csv/").to_request(),
        )
        .await;
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(
            resp.headers().get(header::CONTENT_TYPE).unwrap(),
            "text/csv"
        );
        assert!(
            resp.headers()
                .get(header::CONTENT_DISPOSITION)
                .unwrap()
                .to_str()
                .unwrap()
                .contains("extracted_data.csv")
        );
        let body = test::read_body(resp).await;
        assert_eq!(body.as_ref(), b"Reference_ID,Name,Count\nlions,Leo,3\n");
        assert_eq!(
            std::fs::metadata(&fixture.config.output_csv).unwrap().len(),
            0
        );

        let resp = test::call_service(
            &app,
            test::TestRequest::get().uri("/download-csv/").to_request(),
        )
        .await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
        assert_eq!(test::read_body(resp).await.as_ref(), b"CSV not found");
    }

    #[actix_web::test]
    async fn download_without_csv_is_not_found() {
        let fixture = Fixture::new();
        let app = test::init_service(
            App::new()
                .app_data(fixture.state())
                .configure(configure),
        )
        .await;

        let resp = test::call_service(
            &app,
            test::TestRequest::get().uri("/download-csv/").to_request(),
        )
        .await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }

    fn vars(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: std::collections::HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    #[::core::prelude::v1::test]
    fn listen_addr_defaults_to_localhost_8080() {
        assert_eq!(listen_addr(vars(&[])), ("127.0.0.1".to_string(), 8080));
    }

    #[::core::prelude::v1::test]
    fn listen_addr_reads_bind_addr_and_port() {
        let (addr, port) = listen_addr(vars(&[("BIND_ADDR", "0.0.0.0"), ("PORT", "9000")]));
        assert_eq!(addr, "0.0.0.0");
        assert_eq!(port, 9000);
    }

    #[::core::prelude::v1::test]
    fn invalid_port_falls_back_to_default() {
        let (_, port) = listen_addr(vars(&[("PORT", "70000")]));
        assert_eq!(port, 8080);
    }
}
