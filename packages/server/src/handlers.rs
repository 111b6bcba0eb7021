//! HTTP handler functions for the data extractor API.

use std::path::{Path, PathBuf};

use actix_multipart::{Multipart, MultipartError};
use actix_web::http::header;
use actix_web::{HttpResponse, web};
use data_extractor_extract::ExtractError;
use data_extractor_extract::context::ColumnBlock;
use data_extractor_extract::progress::null_progress;
use data_extractor_extract_models::PDF_EXTENSION;
use data_extractor_server_models::{ApiDetail, ApiError, ApiHealth, ApiMessage, ColumnInput};
use futures::StreamExt as _;
use tokio::io::{AsyncReadExt as _, AsyncWriteExt as _};

use crate::AppState;

/// Size of each chunk of the streamed CSV download.
const DOWNLOAD_CHUNK_SIZE: usize = 8 * 1024;

/// Why an upload could not be staged.
#[derive(Debug, thiserror::Error)]
enum UploadError {
    #[error("{0} is not a PDF")]
    NotPdf(String),

    #[error("No files provided")]
    NoFiles,

    #[error("Invalid multipart payload: {0}")]
    Multipart(#[from] MultipartError),

    #[error("Error saving upload: {0}")]
    Io(#[from] std::io::Error),
}

/// `GET /`
pub async fn root() -> HttpResponse {
    HttpResponse::Ok().json(ApiMessage::new("Backend is running successfully"))
}

/// `GET /health`
pub async fn health() -> HttpResponse {
    HttpResponse::Ok().json(ApiHealth {
        healthy: true,
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

/// `POST /upload-pdf/`
///
/// Saves every uploaded PDF into a per-request directory under the upload
/// dir, runs the batch, deletes the saved files, and finally removes the
/// column block from the context file.
pub async fn upload_pdf(state: web::Data<AppState>, mut payload: Multipart) -> HttpResponse {
    let batch_dir = state
        .config
        .upload_dir
        .join(uuid::Uuid::new_v4().to_string());

    let mut saved = Vec::new();
    let staged = save_uploads(&mut payload, &batch_dir, &mut saved).await;

    if let Err(e) = staged {
        discard(&saved, &batch_dir);
        return match e {
            UploadError::NotPdf(_) | UploadError::NoFiles | UploadError::Multipart(_) => {
                log::warn!("Rejected upload: {e}");
                HttpResponse::BadRequest().json(ApiDetail::new(e.to_string()))
            }
            UploadError::Io(_) => {
                log::error!("Failed to stage upload: {e}");
                HttpResponse::InternalServerError().json(ApiDetail::new(e.to_string()))
            }
        };
    }

    log::info!("Processing {} uploaded file(s)", saved.len());

    let _guard = state.output_lock.lock().await;

    let processed = state
        .extractor
        .process_batch(&saved, &null_progress())
        .await;
    let deleted = delete_files(&saved);
    remove_batch_dir(&batch_dir);

    if let Err(e) = processed {
        log::error!("Error processing files: {e}");
        return HttpResponse::InternalServerError()
            .json(ApiDetail::new(format!("Error processing files: {e}")));
    }

    if let Err((path, e)) = deleted {
        log::error!("Error deleting file {}: {e}", path.display());
        return HttpResponse::InternalServerError().json(ApiDetail::new(format!(
            "Error deleting file {}: {e}",
            path.display()
        )));
    }

    if let Err(e) = state.extractor.context().remove_columns() {
        log::error!("Error deleting columns: {e}");
        return HttpResponse::InternalServerError().json(ApiDetail::new(format!(
            "Error deleting columns from trainingdata.txt: {e}"
        )));
    }

    HttpResponse::Ok().json(ApiMessage::new(format!(
        "{} file(s) processed, and columns removed from trainingdata.txt successfully",
        saved.len()
    )))
}

/// `POST /upload-columns`
///
/// Injects a column block describing the requested columns into the
/// context file.
pub async fn upload_columns(
    state: web::Data<AppState>,
    input: web::Json<ColumnInput>,
) -> HttpResponse {
    let block = match ColumnBlock::new(input.into_inner().columns) {
        Ok(block) => block,
        Err(e @ ExtractError::EmptyColumns) => {
            return HttpResponse::BadRequest().json(ApiError {
                error: e.to_string(),
            });
        }
        Err(e) => {
            return HttpResponse::InternalServerError().json(ApiDetail::new(e.to_string()));
        }
    };

    let _guard = state.output_lock.lock().await;

    match state.extractor.context().inject_columns(&block) {
        Ok(()) => HttpResponse::Ok().json(ApiMessage::new("Columns injected to trainingdata.txt")),
        Err(e) => {
            log::error!("Failed to inject columns: {e}");
            HttpResponse::InternalServerError().json(ApiDetail::new(e.to_string()))
        }
    }
}

/// `GET /download-csv/`
///
/// Streams the output CSV as an attachment and truncates it once the whole
/// body has been sent. The output lock is held until truncation, so no
/// upload can append rows that would then be lost.
pub async fn download_csv(state: web::Data<AppState>) -> HttpResponse {
    let guard = state.output_lock.clone().lock_owned().await;
    let sink = state.extractor.sink().clone();

    if !sink.has_content() {
        return HttpResponse::NotFound()
            .content_type("text/plain")
            .body("CSV not found");
    }

    let mut file = match tokio::fs::File::open(sink.path()).await {
        Ok(file) => file,
        Err(e) => {
            log::error!("Failed to open {}: {e}", sink.path().display());
            return HttpResponse::InternalServerError().json(ApiDetail::new(e.to_string()));
        }
    };

    let body = async_stream::stream! {
        let _guard = guard;
        let mut buf = vec![0_u8; DOWNLOAD_CHUNK_SIZE];

        loop {
            match file.read(&mut buf).await {
                Ok(0) => break,
                Ok(n) => yield Ok(web::Bytes::copy_from_slice(&buf[..n])),
                Err(e) => {
                    log::error!("Failed to read {}: {e}", sink.path().display());
                    yield Err(e);
                    return;
                }
            }
        }

        drop(file);
        if let Err(e) = sink.clear() {
            log::error!("Failed to clear {}: {e}", sink.path().display());
        }
    };

    HttpResponse::Ok()
        .content_type("text/csv")
        .insert_header((
            header::CONTENT_DISPOSITION,
            "attachment; filename=\"extracted_data.csv\"",
        ))
        .streaming(body)
}

/// Writes every file part of `payload` into `dir`, pushing each saved
/// path onto `saved` as soon as it exists on disk.
async fn save_uploads(
    payload: &mut Multipart,
    dir: &Path,
    saved: &mut Vec<PathBuf>,
) -> Result<(), UploadError> {
    while let Some(field) = payload.next().await {
        let mut field = field?;

        let Some(filename) = field
            .content_disposition()
            .and_then(|cd| cd.get_filename())
            .map(ToString::to_string)
        else {
            continue;
        };

        if !filename.ends_with(PDF_EXTENSION) {
            return Err(UploadError::NotPdf(filename));
        }
        let Some(name) = Path::new(&filename).file_name() else {
            return Err(UploadError::NotPdf(filename));
        };

        if saved.is_empty() {
            tokio::fs::create_dir_all(dir).await?;
        }
        let path = dir.join(name);
        let mut file = tokio::fs::File::create(&path).await?;
        if !saved.contains(&path) {
            saved.push(path.clone());
        }

        while let Some(chunk) = field.next().await {
            file.write_all(&chunk?).await?;
        }
        file.flush().await?;

        log::debug!("Saved upload {filename} to {}", path.display());
    }

    if saved.is_empty() {
        return Err(UploadError::NoFiles);
    }

    Ok(())
}

/// Deletes every path, continuing past failures and returning the first.
fn delete_files(paths: &[PathBuf]) -> Result<(), (PathBuf, std::io::Error)> {
    let mut first_error = None;

    for path in paths {
        if let Err(e) = std::fs::remove_file(path) {
            log::warn!("Failed to delete {}: {e}", path.display());
            first_error.get_or_insert((path.clone(), e));
        } else {
            log::debug!("Deleted {}", path.display());
        }
    }

    first_error.map_or(Ok(()), Err)
}

fn remove_batch_dir(dir: &Path) {
    if dir.exists()
        && let Err(e) = std::fs::remove_dir(dir)
    {
        log::warn!("Failed to remove upload directory {}: {e}", dir.display());
    }
}

/// Best-effort cleanup of a rejected upload.
fn discard(saved: &[PathBuf], dir: &Path) {
    let _ = delete_files(saved);
    remove_batch_dir(dir);
}
