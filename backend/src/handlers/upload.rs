//! Multipart form reading shared by upload endpoints

use std::collections::HashMap;

use axum::extract::Multipart;
use serde::de::DeserializeOwned;

use crate::error::{AppError, AppResult};
use crate::services::storage::Upload;

/// Text fields and files of a multipart request
#[derive(Debug, Default)]
pub struct MultipartForm {
    fields: HashMap<String, String>,
    files: HashMap<String, Upload>,
}

impl MultipartForm {
    /// Drain a multipart body; parts with a file name are files, the rest text
    pub async fn read(mut multipart: Multipart) -> AppResult<Self> {
        let mut form = Self::default();

        while let Some(field) = multipart
            .next_field()
            .await
            .map_err(|e| AppError::validation("multipart", e.body_text()))?
        {
            let name = field.name().unwrap_or_default().to_string();
            match field.file_name().map(str::to_string) {
                Some(file_name) => {
                    let bytes = field
                        .bytes()
                        .await
                        .map_err(|e| AppError::validation(name.clone(), e.body_text()))?;
                    form.files.insert(
                        name,
                        Upload {
                            file_name,
                            bytes: bytes.to_vec(),
                        },
                    );
                }
                None => {
                    let text = field
                        .text()
                        .await
                        .map_err(|e| AppError::validation(name.clone(), e.body_text()))?;
                    form.fields.insert(name, text);
                }
            }
        }

        Ok(form)
    }

    pub fn text(&self, name: &str) -> Option<&str> {
        self.fields.get(name).map(String::as_str)
    }

    pub fn take_file(&mut self, name: &str) -> Option<Upload> {
        self.files.remove(name)
    }

    /// Deserialize a JSON-encoded text field
    pub fn json<T: DeserializeOwned>(&self, name: &str) -> AppResult<T> {
        let raw = self
            .text(name)
            .ok_or_else(|| AppError::validation(name, format!("{} field is required", name)))?;
        serde_json::from_str(raw).map_err(|e| AppError::validation(name, e.to_string()))
    }
}
