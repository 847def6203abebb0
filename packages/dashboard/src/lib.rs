#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Residue map dashboard core.
//!
//! Ties the transport, normalizer, aggregation engine and globe together:
//!
//! * [`fetch`] runs one fetch cycle and reconciles the listing and summary
//!   endpoints into an immutable [`Snapshot`].
//! * [`lifecycle`] holds the [`Dashboard`] state machine that owns the
//!   render session, the current selection and the fetch status.
//! * [`session`] owns everything drawn on the globe, allocated from a
//!   [`resources`] arena and released on teardown.
//! * [`driver`] paces frames and applies fetch results as they resolve,
//!   without ever blocking the frame loop on I/O.
//! * [`classify`] uploads an image for classification.
//!
//! [`Snapshot`]: residue_map_analytics::Snapshot

pub mod classify;
pub mod config;
pub mod driver;
pub mod fetch;
pub mod lifecycle;
pub mod resources;
pub mod session;
pub mod surface;

pub use config::DashboardConfig;
pub use lifecycle::{Dashboard, FetchDisposition, FetchStatus, Phase};

use residue_map_normalize::NormalizeError;
use residue_map_transport::TransportError;

/// Errors surfaced at the dashboard's request boundary.
///
/// None of these stop the frame loop; the dashboard keeps showing the
/// last good snapshot and offers a retry.
#[derive(Debug, thiserror::Error)]
pub enum DashboardError {
    /// A request could not be served by any endpoint.
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// A response could not be understood.
    #[error(transparent)]
    Normalize(#[from] NormalizeError),

    /// Invalid or missing configuration.
    #[error("Configuration error: {message}")]
    Config {
        /// Description of what went wrong.
        message: String,
    },
}

impl DashboardError {
    /// A short message suitable for showing next to a retry button.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::Transport(TransportError::AllEndpointsUnavailable { request, .. }) => {
                format!("Could not reach the {request} service. Check your connection and retry.")
            }
            Self::Transport(TransportError::Deadline { request, .. }) => {
                format!("The {request} service took too long to answer. Please retry.")
            }
            Self::Transport(_) => "The request could not be sent. Please retry.".to_string(),
            Self::Normalize(_) => {
                "The service returned a response we could not read. Please retry.".to_string()
            }
            Self::Config { message } => format!("The dashboard is misconfigured: {message}"),
        }
    }
}
