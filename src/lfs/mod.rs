//! Content-addressed data-fetch layer.
//!
//! This module owns remote-specific concerns: repository reference parsing,
//! manifest resolution, object download and the local content-addressed
//! store. Datasets are published as a JSON manifest per ref mapping
//! tree-relative paths to sha256 object ids; objects are fetched once,
//! verified against their id, and cached by content address.

pub mod fetch;
pub mod pointer;

use url::Url;

use crate::error::ChipviewError;

pub use fetch::{LfsClient, Manifest, ObjectRef};
pub use pointer::{Oid, Pointer};

/// Canonical reference to a remote LFS repository at a given ref.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LfsRemote {
    pub url: Url,
    pub reference: String,
}

impl LfsRemote {
    /// Parse a user-supplied repository URL and data ref.
    pub fn parse(input: &str, reference: &str) -> Result<Self, ChipviewError> {
        let url = Url::parse(input).map_err(|source| ChipviewError::LfsUrlInvalid {
            url: input.to_string(),
            message: format!("invalid URL: {source}"),
        })?;

        if url.scheme() != "http" && url.scheme() != "https" {
            return Err(ChipviewError::LfsUrlInvalid {
                url: input.to_string(),
                message: format!("expected http(s) scheme, found '{}'", url.scheme()),
            });
        }

        if url.host_str().is_none() {
            return Err(ChipviewError::LfsUrlInvalid {
                url: input.to_string(),
                message: "URL is missing a host".to_string(),
            });
        }

        if reference.is_empty() {
            return Err(ChipviewError::LfsUrlInvalid {
                url: input.to_string(),
                message: "ref must not be empty".to_string(),
            });
        }

        Ok(Self {
            url,
            reference: reference.to_string(),
        })
    }

    /// Base URL with any trailing slash removed, for endpoint formatting.
    pub fn base(&self) -> &str {
        self.url.as_str().trim_end_matches('/')
    }
}

/// Returns true if `value` looks like a remote URI rather than a local path.
pub fn is_uri(value: &str) -> bool {
    value.starts_with("http://") || value.starts_with("https://")
}
