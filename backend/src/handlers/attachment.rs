//! HTTP handler for standalone attachments (reference, mockup and proof images)

use axum::{
    extract::{Multipart, State},
    http::StatusCode,
    Json,
};

use super::upload::MultipartForm;
use crate::error::{AppError, AppResult};
use crate::middleware::CurrentUser;
use crate::models::AttachmentPurpose;
use crate::services::storage::Attachment;
use crate::AppState;

/// Store an uploaded image and return its reference
///
/// Multipart body: a `purpose` text part and a `file` part. The returned
/// `stored_path` is what mockup, modification and release requests refer to.
pub async fn upload_attachment(
    State(state): State<AppState>,
    current_user: CurrentUser,
    multipart: Multipart,
) -> AppResult<(StatusCode, Json<Attachment>)> {
    let mut form = MultipartForm::read(multipart).await?;

    let purpose = form
        .text("purpose")
        .ok_or_else(|| AppError::validation("purpose", "purpose is required"))
        .and_then(parse_purpose)?;
    let upload = form
        .take_file("file")
        .ok_or_else(|| AppError::validation("file", "a file is required"))?;

    let attachment = state
        .storage
        .store(purpose, None, &upload, current_user.0.user_id)
        .await?;
    Ok((StatusCode::CREATED, Json(attachment)))
}

fn parse_purpose(raw: &str) -> AppResult<AttachmentPurpose> {
    let purpose: AttachmentPurpose =
        serde_json::from_value(serde_json::Value::String(raw.trim().to_string()))
            .map_err(|_| AppError::validation("purpose", format!("unknown purpose {}", raw)))?;
    match purpose {
        AttachmentPurpose::ReferenceImage
        | AttachmentPurpose::MockupImage
        | AttachmentPurpose::ReleaseProof => Ok(purpose),
        other => Err(AppError::validation(
            "purpose",
            format!("{} files are uploaded through their own endpoint", other.as_str()),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_purpose_accepts_image_kinds() {
        assert_eq!(parse_purpose("reference_image").unwrap(), AttachmentPurpose::ReferenceImage);
        assert_eq!(parse_purpose(" release_proof ").unwrap(), AttachmentPurpose::ReleaseProof);
    }

    #[test]
    fn test_parse_purpose_rejects_owned_kinds() {
        assert!(parse_purpose("dxf").is_err());
        assert!(parse_purpose("payment_screenshot").is_err());
        assert!(parse_purpose("selfie").is_err());
    }
}
