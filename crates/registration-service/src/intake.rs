//! Request decoding for both accepted encodings

use axum::{
    body::Bytes,
    extract::{FromRequest, Multipart, Request},
    http::{header::CONTENT_TYPE, StatusCode},
};
use enrollment_common::{fields, Error, NewAttachment, RegistrationFields, Result};
use tracing::debug;

use crate::service::Submission;

/// Decode a registration request into a [`Submission`].
///
/// Multipart bodies may carry the identification document under
/// `uploadId`; JSON bodies never carry an attachment. Any other content type
/// is rejected.
pub async fn read_submission(request: Request, max_upload_bytes: usize) -> Result<Submission> {
    let content_type = request
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("")
        .to_ascii_lowercase();

    if content_type.contains("multipart/form-data") {
        let multipart = Multipart::from_request(request, &())
            .await
            .map_err(|e| Error::MalformedBody(e.body_text()))?;
        read_multipart(multipart, max_upload_bytes).await
    } else if content_type.contains("application/json") {
        let body = Bytes::from_request(request, &()).await.map_err(|e| {
            if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
                Error::PayloadTooLarge(max_upload_bytes)
            } else {
                Error::MalformedBody(e.body_text())
            }
        })?;
        let value: serde_json::Value = serde_json::from_slice(&body)
            .map_err(|e| Error::MalformedBody(e.to_string()))?;

        Ok(Submission {
            fields: RegistrationFields::from_json(value)?,
            attachment: None,
        })
    } else {
        Err(Error::UnsupportedContentType)
    }
}

async fn read_multipart(mut multipart: Multipart, max_upload_bytes: usize) -> Result<Submission> {
    let multipart_error = |e: axum::extract::multipart::MultipartError| {
        if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
            Error::PayloadTooLarge(max_upload_bytes)
        } else {
            Error::MalformedBody(format!("Failed to parse multipart data: {}", e.body_text()))
        }
    };

    let mut submission = Submission::default();

    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        let name = field.name().unwrap_or("").to_string();

        if name == fields::UPLOAD {
            let filename = field.file_name().map(str::to_string);
            let content_type = field.content_type().map(str::to_string);
            let bytes = field.bytes().await.map_err(multipart_error)?;

            // Browsers send an empty, unnamed part when no file was chosen.
            match filename {
                Some(filename) if !filename.is_empty() => {
                    if submission.attachment.is_none() {
                        debug!("Received attachment {} ({} bytes)", filename, bytes.len());
                        submission.attachment = Some(NewAttachment {
                            filename,
                            content_type,
                            bytes: bytes.to_vec(),
                        });
                    }
                }
                _ => debug!("Ignoring {} part without a file name", fields::UPLOAD),
            }
            continue;
        }

        let value = field.text().await.map_err(multipart_error)?;
        submission.fields.apply_form_value(&name, &value)?;
    }

    Ok(submission)
}
