//! Attachment storage
//!
//! Uploaded files are written under the configured upload directory and only
//! their reference is recorded; content is never read back.

use std::path::{Component, Path, PathBuf};

use chrono::{DateTime, Datelike, Utc};
use serde::Serialize;
use sqlx::{FromRow, PgConnection, PgPool};
use uuid::Uuid;

use crate::config::StorageConfig;
use crate::error::{AppError, AppResult};
use crate::models::AttachmentPurpose;

/// Storage service for uploaded files
#[derive(Clone)]
pub struct StorageService {
    db: PgPool,
    root: PathBuf,
    max_bytes: usize,
}

/// A file received in a multipart request
#[derive(Debug, Clone)]
pub struct Upload {
    pub file_name: String,
    pub bytes: Vec<u8>,
}

/// Recorded attachment reference
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Attachment {
    pub id: Uuid,
    pub purpose: String,
    pub owner_kind: Option<String>,
    pub owner_id: Option<String>,
    pub file_name: String,
    pub stored_path: String,
    pub uploaded_by: Uuid,
    pub uploaded_at: DateTime<Utc>,
}

impl StorageService {
    /// Create a new StorageService instance
    pub fn new(db: PgPool, config: &StorageConfig) -> Self {
        Self {
            db,
            root: PathBuf::from(&config.upload_dir),
            max_bytes: config.max_upload_bytes,
        }
    }

    /// Write an upload to disk and return its path relative to the upload root
    pub async fn write_file(&self, purpose: AttachmentPurpose, upload: &Upload) -> AppResult<String> {
        if upload.bytes.is_empty() {
            return Err(AppError::validation(purpose.as_str(), "uploaded file is empty"));
        }
        if upload.bytes.len() > self.max_bytes {
            return Err(AppError::validation(
                purpose.as_str(),
                format!("file exceeds the {} byte upload limit", self.max_bytes),
            ));
        }

        let relative = stored_path_for(purpose, &upload.file_name, Utc::now(), Uuid::new_v4());
        let target = self.root.join(&relative);

        if let Some(dir) = target.parent() {
            tokio::fs::create_dir_all(dir)
                .await
                .map_err(|e| AppError::StorageError(format!("create {}: {}", dir.display(), e)))?;
        }
        tokio::fs::write(&target, &upload.bytes)
            .await
            .map_err(|e| AppError::StorageError(format!("write {}: {}", target.display(), e)))?;

        tracing::debug!("Stored {} upload at {}", purpose.as_str(), relative);
        Ok(relative)
    }

    /// Write an upload and record it in the attachments table
    pub async fn store(
        &self,
        purpose: AttachmentPurpose,
        owner: Option<(&str, &str)>,
        upload: &Upload,
        uploaded_by: Uuid,
    ) -> AppResult<Attachment> {
        let stored_path = self.write_file(purpose, upload).await?;

        let recorded: AppResult<Attachment> = async {
            let mut conn = self.db.acquire().await?;
            record_attachment(
                &mut conn,
                purpose,
                owner,
                &upload.file_name,
                &stored_path,
                uploaded_by,
            )
            .await
        }
        .await;

        if recorded.is_err() {
            self.remove_file(&stored_path).await;
        }
        recorded
    }

    #[cfg(test)]
    pub(crate) fn root(&self) -> &Path {
        &self.root
    }

    /// Remove files written for a request that did not go through
    pub async fn discard(&self, stored_paths: &[String]) {
        for stored_path in stored_paths {
            self.remove_file(stored_path).await;
        }
    }

    /// Delete a stored file; a missing file is not an error
    pub async fn remove_file(&self, stored_path: &str) {
        let Some(relative) = safe_relative(stored_path) else {
            tracing::warn!("Refusing to remove path outside upload root: {}", stored_path);
            return;
        };
        match tokio::fs::remove_file(self.root.join(relative)).await {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => tracing::warn!("Failed to remove {}: {}", stored_path, e),
        }
    }
}

/// Keep letters, digits, dots, dashes and underscores; everything else becomes `_`
pub fn sanitize_file_name(name: &str) -> String {
    let base = name.rsplit(|c: char| c == '/' || c == '\\').next().unwrap_or(name);
    let cleaned: String = base
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') {
                c
            } else {
                '_'
            }
        })
        .collect();
    let cleaned = cleaned.trim_start_matches('.');

    if cleaned.is_empty() {
        "upload".to_string()
    } else {
        cleaned.chars().take(128).collect()
    }
}

/// Insert the attachments row for a file already written to disk
///
/// Runs on the caller's connection so the row commits or rolls back with the
/// rest of the caller's transaction.
pub async fn record_attachment(
    conn: &mut PgConnection,
    purpose: AttachmentPurpose,
    owner: Option<(&str, &str)>,
    file_name: &str,
    stored_path: &str,
    uploaded_by: Uuid,
) -> AppResult<Attachment> {
    let attachment = sqlx::query_as::<_, Attachment>(
        r#"
        INSERT INTO attachments (purpose, owner_kind, owner_id, file_name, stored_path, uploaded_by)
        VALUES ($1, $2, $3, $4, $5, $6)
        RETURNING id, purpose, owner_kind, owner_id, file_name, stored_path, uploaded_by, uploaded_at
        "#,
    )
    .bind(purpose.as_str())
    .bind(owner.map(|(kind, _)| kind))
    .bind(owner.map(|(_, id)| id))
    .bind(sanitize_file_name(file_name))
    .bind(stored_path)
    .bind(uploaded_by)
    .fetch_one(conn)
    .await?;
    Ok(attachment)
}

/// `{purpose}/{year}/{month}/{id}-{name}`
fn stored_path_for(purpose: AttachmentPurpose, file_name: &str, now: DateTime<Utc>, id: Uuid) -> String {
    format!(
        "{}/{}/{:02}/{}-{}",
        purpose.as_str(),
        now.year(),
        now.month(),
        id,
        sanitize_file_name(file_name)
    )
}

fn safe_relative(stored_path: &str) -> Option<&Path> {
    let path = Path::new(stored_path);
    path.components()
        .all(|c| matches!(c, Component::Normal(_)))
        .then_some(path)
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_sanitize_file_name() {
        assert_eq!(sanitize_file_name("shop front.dxf"), "shop_front.dxf");
        assert_eq!(sanitize_file_name("../../etc/passwd"), "passwd");
        assert_eq!(sanitize_file_name("C:\\designs\\logo.png"), "logo.png");
        assert_eq!(sanitize_file_name("..."), "upload");
    }

    #[test]
    fn test_stored_path_layout() {
        let now = Utc.with_ymd_and_hms(2026, 3, 9, 10, 0, 0).unwrap();
        let id = Uuid::nil();
        assert_eq!(
            stored_path_for(AttachmentPurpose::Dxf, "cut.dxf", now, id),
            format!("dxf/2026/03/{}-cut.dxf", id)
        );
    }

    pub(crate) fn scratch_storage(max_bytes: usize) -> StorageService {
        let db = sqlx::postgres::PgPoolOptions::new()
            .connect_lazy("postgres://localhost/unused")
            .unwrap();
        let root = std::env::temp_dir().join(format!("spm-storage-{}", Uuid::new_v4()));
        StorageService::new(
            db,
            &StorageConfig {
                upload_dir: root.to_string_lossy().into_owned(),
                max_upload_bytes: max_bytes,
            },
        )
    }

    #[test]
    fn test_discard_removes_written_files() {
        tokio_test::block_on(async {
            let storage = scratch_storage(1024);
            let upload = Upload {
                file_name: "transfer.png".to_string(),
                bytes: vec![1, 2, 3],
            };
            let first = storage
                .write_file(AttachmentPurpose::PaymentScreenshot, &upload)
                .await
                .unwrap();
            let second = storage
                .write_file(AttachmentPurpose::InvoiceImage, &upload)
                .await
                .unwrap();
            assert!(storage.root.join(&first).exists());

            storage
                .discard(&[first.clone(), second.clone(), "../outside".to_string()])
                .await;
            assert!(!storage.root.join(&first).exists());
            assert!(!storage.root.join(&second).exists());

            let _ = tokio::fs::remove_dir_all(&storage.root).await;
        });
    }

    #[test]
    fn test_safe_relative_rejects_escapes() {
        assert!(safe_relative("dxf/2026/03/a.dxf").is_some());
        assert!(safe_relative("../secret").is_none());
        assert!(safe_relative("/etc/passwd").is_none());
    }
}
