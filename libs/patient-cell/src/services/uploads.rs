use std::path::PathBuf;

use axum::body::Bytes;
use axum::extract::Multipart;
use chrono::Utc;
use tokio::fs;
use tracing::{debug, warn};
use uuid::Uuid;

use shared_models::error::AppError;
use shared_utils::AppState;

/// Multipart field that carries prescription images.
pub const PRESCRIPTION_FIELD: &str = "prescriptionImages";
pub const MAX_PRESCRIPTION_FILES: usize = 10;
/// URL prefix under which the upload directory is served, and the prefix of
/// every stored path.
pub const UPLOADS_ROUTE: &str = "/uploads";
/// Longest sanitized original name kept in a stored file name.
pub const MAX_STORED_NAME_LEN: usize = 100;

/// A file read from the request but not yet written anywhere.
#[derive(Debug, Clone)]
pub struct IncomingFile {
    pub original_name: String,
    pub data: Bytes,
}

#[derive(Debug, Clone, PartialEq)]
pub struct StoredFile {
    pub original_name: String,
    /// Server-relative path persisted with the record, e.g. `uploads/1718-…-scan.png`.
    pub stored_path: String,
    pub disk_path: PathBuf,
}

pub struct UploadService {
    upload_dir: PathBuf,
}

impl UploadService {
    pub fn new(state: &AppState) -> Self {
        Self {
            upload_dir: state.config.upload_dir.clone(),
        }
    }

    /// Buffers every file sent under `field`. Other parts are skipped.
    pub async fn receive(
        &self,
        mut multipart: Multipart,
        field: &str,
        max_files: usize,
    ) -> Result<Vec<IncomingFile>, AppError> {
        let mut files = Vec::new();

        while let Some(part) = multipart
            .next_field()
            .await
            .map_err(AppError::from)?
        {
            if part.name() != Some(field) {
                continue;
            }
            let original_name = match part.file_name() {
                Some(name) if !name.is_empty() => name.to_string(),
                _ => continue,
            };
            if files.len() == max_files {
                return Err(AppError::BadRequest("Too many files uploaded".to_string()));
            }

            let data = part.bytes().await.map_err(AppError::from)?;

            debug!("Received upload {} ({} bytes)", original_name, data.len());
            files.push(IncomingFile { original_name, data });
        }

        Ok(files)
    }

    /// Writes the files under the upload directory with collision-free names.
    /// On failure, files already written by this call are removed.
    pub async fn store(&self, files: Vec<IncomingFile>) -> Result<Vec<StoredFile>, AppError> {
        fs::create_dir_all(&self.upload_dir)
            .await
            .map_err(AppError::storage("Failed to store uploaded files"))?;

        let mut stored = Vec::with_capacity(files.len());

        for file in files {
            let file_name = storage_name(&file.original_name);
            let disk_path = self.upload_dir.join(&file_name);

            if let Err(e) = fs::write(&disk_path, &file.data).await {
                self.discard(&stored).await;
                return Err(AppError::storage("Failed to store uploaded files")(e));
            }

            stored.push(StoredFile {
                original_name: file.original_name,
                stored_path: format!("{}/{}", UPLOADS_ROUTE.trim_start_matches('/'), file_name),
                disk_path,
            });
        }

        Ok(stored)
    }

    /// Best-effort removal of files whose records were never written.
    pub async fn discard(&self, files: &[StoredFile]) {
        for file in files {
            if let Err(e) = fs::remove_file(&file.disk_path).await {
                warn!("Failed to remove orphaned upload {:?}: {}", file.disk_path, e);
            }
        }
    }
}

/// `<millis>-<uuid>-<name>` with anything outside `[A-Za-z0-9._-]` replaced.
pub fn storage_name(original: &str) -> String {
    let sanitized: String = original
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') { c } else { '_' })
        .collect();
    let sanitized = sanitized.trim_start_matches('.');
    let sanitized = if sanitized.is_empty() { "upload" } else { sanitized };

    format!(
        "{}-{}-{}",
        Utc::now().timestamp_millis(),
        Uuid::new_v4().simple(),
        truncate_keeping_extension(sanitized, MAX_STORED_NAME_LEN)
    )
}

// `name` is ASCII once sanitized, so byte offsets are char boundaries.
fn truncate_keeping_extension(name: &str, max_len: usize) -> String {
    if name.len() <= max_len {
        return name.to_string();
    }

    match name.rfind('.') {
        Some(dot) if dot > 0 && name.len() - dot <= max_len / 4 => {
            let extension = &name[dot..];
            format!("{}{}", &name[..max_len - extension.len()], extension)
        }
        _ => name[..max_len].to_string(),
    }
}
