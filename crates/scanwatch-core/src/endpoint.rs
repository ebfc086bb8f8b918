//! Page context and scan endpoint derivation.

use thiserror::Error;
use url::Url;

/// Path segments preceding the scan id on the progress endpoint.
const SCAN_PATH: [&str; 2] = ["ws", "scan"];

#[derive(Debug, Error, PartialEq, Eq)]
pub enum EndpointError {
    #[error("origin {0} has no host")]
    MissingHost(String),
    #[error("scan id is empty")]
    EmptyScanId,
    #[error("scan id {0:?} is not a valid path segment")]
    InvalidScanId(String),
    #[error("invalid origin: {0}")]
    InvalidOrigin(#[from] url::ParseError),
}

/// Root anchor of a scan view, carrying the scan it reports on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanAnchor {
    scan_id: String,
}

impl ScanAnchor {
    pub fn new(scan_id: impl Into<String>) -> Self {
        Self {
            scan_id: scan_id.into(),
        }
    }

    pub fn scan_id(&self) -> &str {
        &self.scan_id
    }
}

/// What the client attaches to: the origin the view was loaded from and the
/// scan anchor, if the view has one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageContext {
    pub origin: Url,
    pub anchor: Option<ScanAnchor>,
}

impl PageContext {
    pub fn new(origin: Url, anchor: Option<ScanAnchor>) -> Self {
        Self { origin, anchor }
    }

    /// Parse an origin string and attach an optional scan id.
    pub fn parse(origin: &str, scan_id: Option<&str>) -> Result<Self, EndpointError> {
        let origin = Url::parse(origin)?;
        Ok(Self::new(origin, scan_id.map(ScanAnchor::new)))
    }
}

/// WebSocket scheme mirroring the security of the origin.
pub fn socket_scheme(origin: &Url) -> &'static str {
    match origin.scheme() {
        "https" | "wss" => "wss",
        _ => "ws",
    }
}

/// Build `{ws|wss}://<host>[:port]/ws/scan/<scan_id>/` for an origin.
///
/// Only the origin's host and port are used. The scan id becomes a single
/// percent-encoded path segment.
pub fn scan_endpoint(origin: &Url, scan_id: &str) -> Result<Url, EndpointError> {
    if scan_id.trim().is_empty() {
        return Err(EndpointError::EmptyScanId);
    }
    if matches!(scan_id, "." | "..") {
        return Err(EndpointError::InvalidScanId(scan_id.to_string()));
    }
    let host = origin
        .host_str()
        .ok_or_else(|| EndpointError::MissingHost(origin.to_string()))?;
    let authority = match origin.port() {
        Some(port) => format!("{host}:{port}"),
        None => host.to_string(),
    };

    let mut endpoint = Url::parse(&format!("{}://{authority}/", socket_scheme(origin)))?;
    endpoint
        .path_segments_mut()
        .map_err(|_| EndpointError::MissingHost(origin.to_string()))?
        .extend(SCAN_PATH)
        .push(scan_id)
        // Trailing slash, as the server route requires.
        .push("");
    Ok(endpoint)
}
