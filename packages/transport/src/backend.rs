//! `reqwest`-backed [`HttpBackend`].
//!
//! Sends exactly one HTTP request per call. There is no retry loop here;
//! a failure is reported to the [`Transport`](crate::Transport), which
//! moves on to the next endpoint.

use async_trait::async_trait;
use reqwest::multipart;

use crate::registry::Method;
use crate::{BackendResponse, FormField, HttpBackend, RequestBody, RequestSpec, TransportError};

/// Maximum length of the response body preview included in debug logs.
const BODY_PREVIEW_LEN: usize = 200;

/// [`HttpBackend`] over a shared [`reqwest::Client`].
#[derive(Debug, Clone, Default)]
pub struct ReqwestBackend {
    client: reqwest::Client,
}

impl ReqwestBackend {
    /// Wraps an existing client.
    #[must_use]
    pub const fn new(client: reqwest::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl HttpBackend for ReqwestBackend {
    async fn send(
        &self,
        url: &str,
        request: &RequestSpec,
    ) -> Result<BackendResponse, TransportError> {
        let builder = match request.method {
            Method::Get => self.client.get(url),
            Method::Post => self.client.post(url),
        };

        let builder = match &request.body {
            RequestBody::Empty => builder,
            RequestBody::Multipart(fields) => builder.multipart(build_form(fields)?),
        };

        let response = builder.send().await?;

        let status = response.status().as_u16();
        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(String::from);
        let body = response.text().await?;

        log::debug!(
            "  {url} -> HTTP {status}, {} bytes, content-type: {content_type:?}, body: {}",
            body.len(),
            preview(&body),
        );

        Ok(BackendResponse {
            status,
            content_type,
            body,
        })
    }
}

fn build_form(fields: &[FormField]) -> Result<multipart::Form, TransportError> {
    let mut form = multipart::Form::new();
    for field in fields {
        form = match field {
            FormField::Text { name, value } => form.text(name.clone(), value.clone()),
            FormField::File {
                name,
                file_name,
                mime,
                bytes,
            } => {
                let part = multipart::Part::bytes(bytes.clone())
                    .file_name(file_name.clone())
                    .mime_str(mime)
                    .map_err(|e| TransportError::InvalidRequest {
                        message: format!("Failed to set MIME type '{mime}': {e}"),
                    })?;
                form.part(name.clone(), part)
            }
        };
    }
    Ok(form)
}

fn preview(body: &str) -> &str {
    if body.len() <= BODY_PREVIEW_LEN {
        return body;
    }
    let mut end = BODY_PREVIEW_LEN;
    while !body.is_char_boundary(end) {
        end -= 1;
    }
    &body[..end]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn preview_truncates_on_char_boundary() {
        let body = "é".repeat(BODY_PREVIEW_LEN);
        let cut = preview(&body);
        assert!(cut.len() <= BODY_PREVIEW_LEN);
        assert!(cut.chars().all(|c| c == 'é'));
    }

    #[test]
    fn short_bodies_are_not_truncated() {
        assert_eq!(preview("Prediction: SEM lixo"), "Prediction: SEM lixo");
    }

    #[test]
    fn invalid_mime_is_rejected() {
        let fields = vec![FormField::File {
            name: "file".to_string(),
            file_name: "shore.jpg".to_string(),
            mime: "not a mime".to_string(),
            bytes: vec![0xFF, 0xD8],
        }];
        assert!(matches!(
            build_form(&fields),
            Err(TransportError::InvalidRequest { .. })
        ));
    }

    #[test]
    fn valid_form_builds() {
        let fields = vec![
            FormField::File {
                name: "file".to_string(),
                file_name: "shore.jpg".to_string(),
                mime: "image/jpeg".to_string(),
                bytes: vec![0xFF, 0xD8],
            },
            FormField::Text {
                name: "location".to_string(),
                value: "Santos".to_string(),
            },
        ];
        assert!(build_form(&fields).is_ok());
    }
}
