//! Byte sources for document locators

use std::path::PathBuf;

use super::request::{EngineFault, LoadParams};

/// Where a locator points
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SourceKind {
    File(PathBuf),
    Remote(String),
}

impl SourceKind {
    /// Classify a locator. Protocol-relative `//host/path` locators are treated as https.
    pub fn classify(locator: &str) -> Result<Self, EngineFault> {
        let trimmed = locator.trim();
        if trimmed.is_empty() {
            return Err(EngineFault::UnsupportedLocator("empty locator".to_string()));
        }

        if let Some(path) = trimmed.strip_prefix("file://") {
            return Ok(Self::File(PathBuf::from(path)));
        }
        if trimmed.starts_with("http://") || trimmed.starts_with("https://") {
            return Ok(Self::Remote(trimmed.to_string()));
        }
        if let Some(rest) = trimmed.strip_prefix("//") {
            return Ok(Self::Remote(format!("https://{rest}")));
        }
        if trimmed.contains("://") {
            return Err(EngineFault::UnsupportedLocator(trimmed.to_string()));
        }

        Ok(Self::File(PathBuf::from(trimmed)))
    }
}

/// Read all bytes behind a locator
pub fn fetch(params: &LoadParams) -> Result<Vec<u8>, EngineFault> {
    match SourceKind::classify(&params.locator)? {
        SourceKind::File(path) => std::fs::read(&path).map_err(|source| EngineFault::Io {
            locator: params.locator.clone(),
            source,
        }),
        SourceKind::Remote(url) => fetch_remote(&url, params),
    }
}

/// Split `user:password@` out of a URL, returning the bare URL and the credentials
fn split_userinfo(url: &str) -> (String, Option<(String, Option<String>)>) {
    let Some((scheme, rest)) = url.split_once("://") else {
        return (url.to_string(), None);
    };
    let authority_end = rest.find('/').unwrap_or(rest.len());
    let (authority, path) = rest.split_at(authority_end);

    match authority.rsplit_once('@') {
        Some((userinfo, host)) => {
            let credentials = match userinfo.split_once(':') {
                Some((user, password)) => (user.to_string(), Some(password.to_string())),
                None => (userinfo.to_string(), None),
            };
            (format!("{scheme}://{host}{path}"), Some(credentials))
        }
        None => (url.to_string(), None),
    }
}

#[cfg(feature = "http")]
fn fetch_remote(url: &str, params: &LoadParams) -> Result<Vec<u8>, EngineFault> {
    let (bare_url, credentials) = split_userinfo(url);
    let http_fault = |source: reqwest::Error| EngineFault::Http {
        locator: params.locator.clone(),
        source,
    };

    let client = reqwest::blocking::Client::builder()
        .build()
        .map_err(http_fault)?;
    let mut request = client.get(&bare_url);
    if params.with_credentials {
        if let Some((user, password)) = credentials {
            request = request.basic_auth(user, password);
        }
    }

    let response = request
        .send()
        .and_then(reqwest::blocking::Response::error_for_status)
        .map_err(http_fault)?;
    let bytes = response.bytes().map_err(http_fault)?;
    Ok(bytes.to_vec())
}

#[cfg(not(feature = "http"))]
fn fetch_remote(url: &str, _params: &LoadParams) -> Result<Vec<u8>, EngineFault> {
    let (bare_url, _) = split_userinfo(url);
    Err(EngineFault::UnsupportedLocator(format!(
        "{bare_url} (built without the `http` feature)"
    )))
}
