//! Image classification uploads.

use std::sync::Arc;
use std::time::Duration;

use residue_map_normalize::classification::{OutcomeDefaults, normalize_classification};
use residue_map_report_models::ClassificationOutcome;
use residue_map_transport::registry::{self, Endpoint, EndpointGroup};
use residue_map_transport::{FormField, RequestSpec, Transport};

use crate::DashboardError;
use crate::fetch::required_group;

/// Multipart field carrying the image.
pub const IMAGE_FIELD: &str = "file";

/// Multipart field carrying the location label.
pub const LOCATION_FIELD: &str = "location";

/// An image selected for upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageUpload {
    /// File name sent in the multipart part.
    pub file_name: String,
    /// MIME type sent in the multipart part.
    pub mime: String,
    /// Image contents.
    pub bytes: Vec<u8>,
}

impl ImageUpload {
    /// Guesses the MIME type from the file extension.
    #[must_use]
    pub fn new(file_name: impl Into<String>, bytes: Vec<u8>) -> Self {
        let file_name = file_name.into();
        let mime = mime_for(&file_name).to_string();
        Self {
            file_name,
            mime,
            bytes,
        }
    }
}

fn mime_for(file_name: &str) -> &'static str {
    let extension = file_name
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_ascii_lowercase())
        .unwrap_or_default();
    match extension.as_str() {
        "jpg" | "jpeg" => "image/jpeg",
        "png" => "image/png",
        "webp" => "image/webp",
        "gif" => "image/gif",
        _ => "application/octet-stream",
    }
}

/// Sends images to the classification service, falling back across the
/// configured endpoints.
pub struct Classifier {
    transport: Arc<Transport>,
    endpoints: Vec<Endpoint>,
    deadline: Option<Duration>,
}

impl Classifier {
    #[must_use]
    pub fn new(transport: Arc<Transport>, group: &EndpointGroup) -> Self {
        Self {
            transport,
            endpoints: group.enabled_endpoints(),
            deadline: None,
        }
    }

    /// # Errors
    ///
    /// Returns [`DashboardError::Config`] if no classification endpoints
    /// are registered.
    pub fn from_env(transport: Arc<Transport>) -> Result<Self, DashboardError> {
        Ok(Self::new(transport, &required_group(registry::CLASSIFY)?))
    }

    /// Bounds the upload, across all fallback attempts, by `deadline`.
    #[must_use]
    pub const fn with_deadline(mut self, deadline: Option<Duration>) -> Self {
        self.deadline = deadline;
        self
    }

    #[must_use]
    pub fn endpoints(&self) -> &[Endpoint] {
        &self.endpoints
    }

    /// Uploads `image` tagged with `location_label` and normalizes the
    /// verdict, whichever response shape the serving endpoint uses.
    ///
    /// # Errors
    ///
    /// * [`DashboardError::Transport`] if every endpoint failed.
    /// * [`DashboardError::Normalize`] if the response was unreadable.
    pub async fn classify(
        &self,
        image: ImageUpload,
        location_label: &str,
    ) -> Result<ClassificationOutcome, DashboardError> {
        let request = RequestSpec::multipart(
            registry::CLASSIFY,
            vec![
                FormField::File {
                    name: IMAGE_FIELD.to_string(),
                    file_name: image.file_name,
                    mime: image.mime,
                    bytes: image.bytes,
                },
                FormField::Text {
                    name: LOCATION_FIELD.to_string(),
                    value: location_label.to_string(),
                },
            ],
        );

        let response = match self.deadline {
            Some(deadline) => {
                self.transport
                    .fetch_with_deadline(&request, &self.endpoints, deadline)
                    .await?
            }
            None => {
                self.transport
                    .fetch_with_fallback(&request, &self.endpoints)
                    .await?
            }
        };

        let defaults = OutcomeDefaults {
            location: Some(location_label.to_string()).filter(|l| !l.trim().is_empty()),
            confidence: 0.0,
        };
        Ok(normalize_classification(
            &response.body,
            &defaults,
            response.served_by,
        )?)
    }
}
