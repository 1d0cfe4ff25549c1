//! Image upload handler.
//!
//! Stores uploads on local disk under the configured directory, grouped
//! by a caller-supplied type ("products", "blog", ...), with a generated
//! name; the original filename only contributes its extension.

use axum::Json;
use axum::extract::{Multipart, Query, State};
use hearthglow_core::Role;
use serde::Deserialize;
use serde_json::json;
use uuid::Uuid;

use crate::error::ApiError;
use crate::middleware::RequireAuth;
use crate::state::AppState;

/// Refuse uploads larger than this. The router's body limit sits above
/// this so the handler gets to return the real error.
const MAX_UPLOAD_BYTES: usize = 5 * 1024 * 1024;

/// Accepted image extensions.
const ALLOWED_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "webp", "gif"];

#[derive(Debug, Default, Deserialize)]
pub struct UploadQuery {
    /// Subdirectory to file the image under, e.g. `products`.
    #[serde(rename = "type")]
    pub upload_type: Option<String>,
}

/// `POST /api/admin/upload?type=...`
///
/// Reads the `image` multipart field and stores it under
/// `uploads/<type>/` (default `general`).
///
/// # Errors
///
/// Returns 400 for a missing image part, unsupported extension, bad
/// type, or an oversized body; 403 below contributor level.
pub async fn upload_image(
    RequireAuth(current): RequireAuth,
    State(state): State<AppState>,
    Query(query): Query<UploadQuery>,
    mut multipart: Multipart,
) -> Result<Json<serde_json::Value>, ApiError> {
    current.require_min_role(Role::Contributor)?;

    let upload_type = sanitized_type(query.upload_type.as_deref())?;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::Validation(e.to_string()))?
    {
        if field.name() != Some("image") {
            continue;
        }

        let extension = field
            .file_name()
            .and_then(sanitized_extension)
            .ok_or_else(|| {
                ApiError::Validation(format!(
                    "file extension must be one of: {}",
                    ALLOWED_EXTENSIONS.join(", ")
                ))
            })?;

        let data = field
            .bytes()
            .await
            .map_err(|e| ApiError::Validation(e.to_string()))?;
        if data.is_empty() {
            return Err(ApiError::Validation("file is empty".to_string()));
        }
        if data.len() > MAX_UPLOAD_BYTES {
            return Err(ApiError::Validation("file exceeds 5 MB".to_string()));
        }

        let filename = format!("{}.{extension}", Uuid::new_v4());
        let dir = state.config().uploads_dir.join(&upload_type);
        tokio::fs::create_dir_all(&dir)
            .await
            .map_err(|e| ApiError::Internal(e.to_string()))?;
        tokio::fs::write(dir.join(&filename), &data)
            .await
            .map_err(|e| ApiError::Internal(e.to_string()))?;

        return Ok(Json(json!({
            "url": format!("/uploads/{upload_type}/{filename}"),
            "type": upload_type,
        })));
    }

    Err(ApiError::Validation("image part is required".to_string()))
}

#[derive(Debug, serde::Deserialize)]
pub struct DeleteRequest {
    pub url: String,
}

/// `DELETE /api/admin/upload`
///
/// Deletes a previously uploaded file by its public URL.
///
/// # Errors
///
/// Returns 400 for a URL outside `/uploads/` or one containing path
/// separators, 404 if the file does not exist, 403 below contributor
/// level.
pub async fn delete_image(
    RequireAuth(current): RequireAuth,
    State(state): State<AppState>,
    Json(payload): Json<DeleteRequest>,
) -> Result<Json<serde_json::Value>, ApiError> {
    current.require_min_role(Role::Contributor)?;

    let filename = uploaded_filename(&payload.url)
        .ok_or_else(|| ApiError::Validation("url must point into /uploads/".to_string()))?;

    let path = state.config().uploads_dir.join(filename);
    match tokio::fs::remove_file(&path).await {
        Ok(()) => Ok(Json(json!({ "deleted": true }))),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Err(ApiError::NotFound("Upload")),
        Err(e) => Err(ApiError::Internal(e.to_string())),
    }
}

/// Validate the upload type used as a subdirectory name. Defaults to
/// `general` when absent.
fn sanitized_type(raw: Option<&str>) -> Result<String, ApiError> {
    let Some(raw) = raw else {
        return Ok("general".to_string());
    };
    let valid = !raw.is_empty()
        && raw
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-' || c == '_');
    if !valid {
        return Err(ApiError::Validation(
            "type must be lowercase letters, digits, - or _".to_string(),
        ));
    }
    Ok(raw.to_string())
}

/// Extract the `<type>/<filename>` path from an upload URL. Rejects
/// anything that could escape the uploads directory.
fn uploaded_filename(url: &str) -> Option<&str> {
    let path = url.strip_prefix("/uploads/")?;
    let mut segments = path.split('/');
    let first = segments.next()?;
    let second = segments.next();
    // At most one subdirectory level, and no empty or dotted segments.
    if segments.next().is_some() {
        return None;
    }
    let segment_ok = |s: &str| !s.is_empty() && !s.contains('\\') && !s.contains("..");
    if !segment_ok(first) || !second.is_none_or(segment_ok) {
        return None;
    }
    Some(path)
}

/// Extract a lowercase extension from the client filename, if allowed.
fn sanitized_extension(filename: &str) -> Option<String> {
    let extension = filename.rsplit('.').next()?.to_ascii_lowercase();
    ALLOWED_EXTENSIONS
        .contains(&extension.as_str())
        .then_some(extension)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitized_extension_accepts_images() {
        assert_eq!(sanitized_extension("photo.PNG"), Some("png".to_string()));
        assert_eq!(sanitized_extension("a.b.jpeg"), Some("jpeg".to_string()));
    }

    #[test]
    fn test_sanitized_extension_rejects_other_types() {
        assert!(sanitized_extension("script.php").is_none());
        assert!(sanitized_extension("archive.zip").is_none());
        assert!(sanitized_extension("noextension").is_none());
    }

    #[test]
    fn test_uploaded_filename_accepts_typed_paths() {
        assert_eq!(
            uploaded_filename("/uploads/general/abc-123.png"),
            Some("general/abc-123.png")
        );
        assert_eq!(
            uploaded_filename("/uploads/abc-123.png"),
            Some("abc-123.png")
        );
    }

    #[test]
    fn test_uploaded_filename_rejects_traversal() {
        assert!(uploaded_filename("/uploads/../etc/passwd").is_none());
        assert!(uploaded_filename("/uploads/a/../b.png").is_none());
        assert!(uploaded_filename("/uploads/a/b/c.png").is_none());
        assert!(uploaded_filename("/uploads/").is_none());
        assert!(uploaded_filename("/uploads/general/").is_none());
        assert!(uploaded_filename("/etc/passwd").is_none());
    }

    #[test]
    fn test_sanitized_type_defaults_to_general() {
        assert_eq!(sanitized_type(None).unwrap(), "general");
        assert_eq!(sanitized_type(Some("products")).unwrap(), "products");
        assert_eq!(sanitized_type(Some("blog_2026")).unwrap(), "blog_2026");
    }

    #[test]
    fn test_sanitized_type_rejects_path_characters() {
        assert!(sanitized_type(Some("")).is_err());
        assert!(sanitized_type(Some("..")).is_err());
        assert!(sanitized_type(Some("a/b")).is_err());
        assert!(sanitized_type(Some("Products")).is_err());
    }
}
