//! HTTP client for the Registration Service

use anyhow::{Context, Result};
use enrollment_common::RegisterResponse;
use reqwest::multipart::{Form, Part};
use tracing::debug;

use crate::form::PayloadPart;

/// Client for submitting registrations
#[derive(Clone)]
pub struct RegistrationClient {
    base_url: String,
    client: reqwest::Client,
}

impl RegistrationClient {
    /// Create a new registration client
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            client: reqwest::Client::new(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Submit a registration as one multipart request.
    ///
    /// A rejection by the service is returned as a response with
    /// `success: false`; only transport and decoding failures are errors.
    pub async fn submit(&self, parts: Vec<PayloadPart>) -> Result<RegisterResponse> {
        let url = format!("{}/api/register", self.base_url);
        let form = build_form(parts)?;

        debug!("Submitting registration to {}", url);

        let response = self.client.post(&url).multipart(form).send().await?;
        let status = response.status();
        let raw = response
            .bytes()
            .await
            .context("Failed to read registration response")?;

        let body: RegisterResponse = serde_json::from_slice(&raw).with_context(|| {
            format!(
                "Failed to parse registration response ({}): {}",
                status,
                body_excerpt(&raw)
            )
        })?;

        Ok(body)
    }

    /// Check if the service is healthy
    pub async fn health_check(&self) -> Result<bool> {
        let url = format!("{}/health", self.base_url);
        let response = self.client.get(&url).send().await?;
        Ok(response.status().is_success())
    }
}

/// First part of a response body, for error messages
fn body_excerpt(raw: &[u8]) -> String {
    const MAX_EXCERPT: usize = 200;

    let text = String::from_utf8_lossy(raw);
    match text.char_indices().nth(MAX_EXCERPT) {
        Some((end, _)) => format!("{}...", &text[..end]),
        None => text.into_owned(),
    }
}

fn build_form(parts: Vec<PayloadPart>) -> Result<Form> {
    let mut form = Form::new();
    for part in parts {
        form = match part {
            PayloadPart::Text { name, value } => form.text(name, value),
            PayloadPart::File { name, attachment } => {
                let mut file = Part::bytes(attachment.bytes).file_name(attachment.filename);
                if let Some(content_type) = attachment.content_type {
                    file = file
                        .mime_str(&content_type)
                        .with_context(|| format!("Invalid content type: {}", content_type))?;
                }
                form.part(name, file)
            }
        };
    }
    Ok(form)
}
