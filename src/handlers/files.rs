// src/handlers/files.rs

use std::path::{Component, Path, PathBuf};

use axum::{
    body::Body,
    extract::{Query, Request, State},
    response::Response,
};
use serde::Deserialize;
use tower::ServiceExt;
use tower_http::services::ServeFile;

use crate::{config::Config, error::AppError};

#[derive(Debug, Deserialize)]
pub struct FileParams {
    pub path: Option<String>,
}

/// Joins a client-supplied relative path onto `root`.
/// Absolute paths and any `..` component are refused.
pub fn resolve_under(root: &Path, relative: &str) -> Result<PathBuf, AppError> {
    let relative = Path::new(relative.trim());
    if relative.as_os_str().is_empty() {
        return Err(AppError::BadRequest("path is required".to_string()));
    }

    let mut resolved = root.to_path_buf();
    for component in relative.components() {
        match component {
            Component::Normal(part) => resolved.push(part),
            Component::CurDir => {}
            _ => return Err(AppError::BadRequest("path must stay inside the file root".to_string())),
        }
    }
    Ok(resolved)
}

/// Streams a file from `FILE_ROOT`.
///
/// `ServeFile` answers `Range` requests with 206 Partial Content, sets the
/// content type from the extension and handles conditional headers.
pub async fn serve_file(
    State(config): State<Config>,
    Query(params): Query<FileParams>,
    req: Request,
) -> Result<Response, AppError> {
    let relative = params
        .path
        .ok_or_else(|| AppError::BadRequest("path is required".to_string()))?;
    let path = resolve_under(&config.file_root, &relative)?;

    let is_file = tokio::fs::metadata(&path)
        .await
        .map(|meta| meta.is_file())
        .unwrap_or(false);
    if !is_file {
        return Err(AppError::NotFound(format!("File '{}' not found", relative)));
    }

    let response = ServeFile::new(&path)
        .oneshot(req)
        .await
        .map_err(|e| AppError::InternalServerError(e.to_string()))?;

    Ok(response.map(Body::new))
}
