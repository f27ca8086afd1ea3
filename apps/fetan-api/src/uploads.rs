use axum::extract::multipart::Field;
use fetan_db::StoreError;
use std::path::{Path, PathBuf};
use uuid::Uuid;

/// Screenshot uploads larger than this are rejected before anything is
/// written. The global request-body limit enforces the same bound.
pub const MAX_SCREENSHOT_BYTES: usize = 10 * 1024 * 1024;

pub struct StoredUpload {
    /// Relative URL the clients use, e.g. `/uploads/payments/<name>`.
    pub url: String,
    pub path: PathBuf,
}

/// Maps an image content type to the stored file extension.
pub(crate) fn extension_for(content_type: &str) -> Option<&'static str> {
    match content_type {
        "image/jpeg" | "image/jpg" => Some("jpg"),
        "image/png" => Some("png"),
        "image/webp" => Some("webp"),
        "image/gif" => Some("gif"),
        _ => None,
    }
}

/// Stores a multipart image field under `<upload_dir>/payments/` with a
/// generated name. Rejects non-image content and oversized payloads.
pub async fn save_screenshot(
    upload_dir: &Path,
    field: Field<'_>,
) -> Result<StoredUpload, StoreError> {
    let content_type = field
        .content_type()
        .map(str::to_owned)
        .ok_or_else(|| StoreError::validation("screenshot must have a content type"))?;

    if !content_type.starts_with("image/") {
        return Err(StoreError::validation("only image files are allowed"));
    }
    let ext = extension_for(&content_type)
        .ok_or_else(|| StoreError::validation("unsupported image format"))?;

    let bytes = field
        .bytes()
        .await
        .map_err(|e| StoreError::validation(format!("failed to read upload: {e}")))?;

    if bytes.is_empty() {
        return Err(StoreError::validation("screenshot file is empty"));
    }
    if bytes.len() > MAX_SCREENSHOT_BYTES {
        return Err(StoreError::validation("screenshot exceeds the 10 MB limit"));
    }

    let dir = upload_dir.join("payments");
    tokio::fs::create_dir_all(&dir)
        .await
        .map_err(|e| StoreError::Internal(anyhow::anyhow!("failed to create upload dir: {e}")))?;

    let filename = format!("payment-{}.{ext}", Uuid::new_v4());
    let path = dir.join(&filename);
    tokio::fs::write(&path, &bytes)
        .await
        .map_err(|e| StoreError::Internal(anyhow::anyhow!("failed to store upload: {e}")))?;

    Ok(StoredUpload {
        url: format!("/uploads/payments/{filename}"),
        path,
    })
}

/// Best-effort cleanup when order creation fails after the file was
/// already stored.
pub async fn discard(upload: &StoredUpload) {
    if let Err(e) = tokio::fs::remove_file(&upload.path).await {
        tracing::warn!("failed to remove orphaned upload {:?}: {e}", upload.path);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_image_types_map_to_extensions() {
        assert_eq!(extension_for("image/jpeg"), Some("jpg"));
        assert_eq!(extension_for("image/png"), Some("png"));
        assert_eq!(extension_for("image/webp"), Some("webp"));
    }

    #[test]
    fn non_image_types_are_rejected() {
        assert_eq!(extension_for("application/pdf"), None);
        assert_eq!(extension_for("text/plain"), None);
    }
}
