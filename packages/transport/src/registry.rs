//! Compile-time registry of endpoint groups.
//!
//! Each logical request (location listing, summary, classification) is
//! defined in a TOML file under `endpoints/` listing the candidate
//! endpoints in priority order. The registry embeds these at compile time
//! and exposes them via [`all_groups`] and [`group`]. Deployments can
//! point the groups elsewhere through environment variables, see
//! [`group_from_env`].

use residue_map_report_models::EndpointRole;
use serde::Deserialize;
use strum_macros::{AsRefStr, Display, EnumString};

/// Environment variable replacing the base URL of the read endpoints.
pub const API_URL_ENV: &str = "RESIDUE_MAP_API_URL";

/// Environment variable listing classification URLs (comma separated,
/// in attempt order).
pub const CLASSIFY_URLS_ENV: &str = "RESIDUE_MAP_CLASSIFY_URLS";

/// Group identifier of the location listing request.
pub const LOCATIONS: &str = "locations";

/// Group identifier of the fleet summary request.
pub const SUMMARY: &str = "summary";

/// Group identifier of the classification request.
pub const CLASSIFY: &str = "classify";

/// HTTP method of a logical request.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Display, EnumString, AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum Method {
    /// `GET`
    Get,
    /// `POST`
    Post,
}

/// One candidate endpoint for a logical request.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Endpoint {
    /// Unique identifier within the group (e.g., `"classifier_backup"`).
    pub id: String,
    /// Scheme and authority (e.g., `"http://localhost:8080"`).
    pub base_url: String,
    /// Path appended to the base URL (e.g., `"/predict"`).
    #[serde(default)]
    pub path: String,
    /// Attempt order; lower values run first.
    pub priority: u32,
    /// Whether this endpoint is attempted at all.
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Primary or fallback.
    pub role: EndpointRole,
}

impl Endpoint {
    /// Returns the full URL of this endpoint.
    #[must_use]
    pub fn url(&self) -> String {
        format!("{}{}", self.base_url.trim_end_matches('/'), self.path)
    }
}

/// A logical request and its candidate endpoints, loaded from TOML.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct EndpointGroup {
    /// Unique identifier (e.g., `"classify"`).
    pub id: String,
    /// Human-readable name.
    pub name: String,
    /// HTTP method used for every endpoint in the group.
    pub method: Method,
    /// Candidate endpoints, in any order.
    pub endpoints: Vec<Endpoint>,
}

const fn default_true() -> bool {
    true
}

impl EndpointGroup {
    /// Returns only enabled endpoints, sorted by priority (ascending).
    #[must_use]
    pub fn enabled_endpoints(&self) -> Vec<Endpoint> {
        let mut endpoints: Vec<Endpoint> =
            self.endpoints.iter().filter(|e| e.enabled).cloned().collect();
        endpoints.sort_by_key(|e| e.priority);
        endpoints
    }

    /// Returns a copy of this group with every endpoint's base URL replaced.
    #[must_use]
    pub fn with_base_url(&self, base_url: &str) -> Self {
        let mut group = self.clone();
        for endpoint in &mut group.endpoints {
            endpoint.base_url = base_url.to_string();
        }
        group
    }

    /// Returns a copy of this group whose endpoints are exactly `urls`, in
    /// order. The first URL is the primary, the rest are fallbacks.
    ///
    /// Blank entries are ignored. If no usable URL remains the group is
    /// returned unchanged.
    #[must_use]
    pub fn with_urls<S: AsRef<str>>(&self, urls: &[S]) -> Self {
        let endpoints: Vec<Endpoint> = urls
            .iter()
            .map(|u| u.as_ref().trim())
            .filter(|u| !u.is_empty())
            .enumerate()
            .map(|(i, url)| Endpoint {
                id: format!("{}_{}", self.id, i + 1),
                base_url: url.to_string(),
                path: String::new(),
                priority: u32::try_from(i + 1).unwrap_or(u32::MAX),
                enabled: true,
                role: if i == 0 {
                    EndpointRole::Primary
                } else {
                    EndpointRole::Fallback
                },
            })
            .collect();

        if endpoints.is_empty() {
            return self.clone();
        }

        Self {
            endpoints,
            ..self.clone()
        }
    }
}

// ── Compile-time embedded TOML files ────────────────────────────────

const GROUP_TOMLS: &[(&str, &str)] = &[
    (LOCATIONS, include_str!("../endpoints/locations.toml")),
    (SUMMARY, include_str!("../endpoints/summary.toml")),
    (CLASSIFY, include_str!("../endpoints/classify.toml")),
];

#[cfg(test)]
const EXPECTED_GROUP_COUNT: usize = 3;

/// Returns all endpoint groups as compiled in.
///
/// # Panics
///
/// Panics if any TOML config is malformed (this is a compile-time guarantee
/// since the configs are embedded).
#[must_use]
pub fn all_groups() -> Vec<EndpointGroup> {
    GROUP_TOMLS
        .iter()
        .map(|(name, toml_str)| {
            toml::de::from_str(toml_str)
                .unwrap_or_else(|e| panic!("Failed to parse endpoint group '{name}': {e}"))
        })
        .collect()
}

/// Returns the compiled-in group with the given identifier.
#[must_use]
pub fn group(id: &str) -> Option<EndpointGroup> {
    all_groups().into_iter().find(|g| g.id == id)
}

/// Returns the group with the given identifier after applying the
/// [`API_URL_ENV`] and [`CLASSIFY_URLS_ENV`] overrides.
#[must_use]
pub fn group_from_env(id: &str) -> Option<EndpointGroup> {
    let group = group(id)?;

    if id == CLASSIFY {
        if let Ok(urls) = std::env::var(CLASSIFY_URLS_ENV) {
            let urls: Vec<&str> = urls.split(',').collect();
            log::debug!("Using {CLASSIFY_URLS_ENV} override for '{id}': {urls:?}");
            return Some(group.with_urls(&urls));
        }
        return Some(group);
    }

    match std::env::var(API_URL_ENV) {
        Ok(base_url) if !base_url.trim().is_empty() => {
            log::debug!("Using {API_URL_ENV} override for '{id}': {base_url}");
            Some(group.with_base_url(base_url.trim()))
        }
        _ => Some(group),
    }
}
