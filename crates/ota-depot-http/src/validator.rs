use axum::{
    http::{HeaderMap, StatusCode, header},
    response::{IntoResponse, Response},
};
use ota_depot_core::{FIRMWARE_EXTENSION, FirmwareFamily, UpdateRequest};
use std::net::{IpAddr, SocketAddr};
use tracing::info;

/// User agent sent by the ESP8266 HTTP update client
pub const ACCEPTED_USER_AGENT: &str = "ESP8266-http-Update";

/// Header carrying the version the device currently runs
pub const VERSION_HEADER: &str = "x-esp8266-version";

const FORWARDED_FOR_HEADER: &str = "x-forwarded-for";
const REAL_IP_HEADER: &str = "x-real-ip";

/// Why an update check was turned away before touching the firmware store
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rejection {
    /// Wrong client identity or missing version
    BadRequest,
    /// Path does not name a firmware image
    NotFound,
}

impl Rejection {
    pub fn status(self) -> StatusCode {
        match self {
            Rejection::BadRequest => StatusCode::BAD_REQUEST,
            Rejection::NotFound => StatusCode::NOT_FOUND,
        }
    }
}

impl IntoResponse for Rejection {
    fn into_response(self) -> Response {
        self.status().into_response()
    }
}

/// Check an inbound update request. No filesystem access happens here.
///
/// `path` is the decoded request path below the OTA prefix; only its final
/// segment matters.
pub fn validate(
    headers: &HeaderMap,
    path: &str,
    peer: Option<SocketAddr>,
) -> Result<UpdateRequest, Rejection> {
    let client_agent = header_str(headers, header::USER_AGENT.as_str()).unwrap_or_default();
    if client_agent != ACCEPTED_USER_AGENT {
        return Err(Rejection::BadRequest);
    }

    let client_version = match header_str(headers, VERSION_HEADER) {
        Some(version) if !version.is_empty() => version,
        _ => return Err(Rejection::BadRequest),
    };

    let file_name = path.rsplit('/').next().unwrap_or_default();
    let stem = file_name
        .strip_suffix(FIRMWARE_EXTENSION)
        .ok_or(Rejection::NotFound)?;
    let firmware_family: FirmwareFamily = stem.parse().map_err(|_| Rejection::NotFound)?;

    let remote_addr = remote_addr(headers, peer);
    info!(
        "Received request {} from {} firmware {} version {}",
        path,
        remote_addr.map_or_else(|| "unknown".to_string(), |ip| ip.to_string()),
        firmware_family,
        client_version
    );

    Ok(UpdateRequest {
        client_agent: client_agent.to_string(),
        client_version: client_version.to_string(),
        requested_path: path.to_string(),
        firmware_family,
        remote_addr,
    })
}

/// Originating address of a request.
///
/// Proxy headers win over the TCP peer: first `X-Forwarded-For` entry, then
/// `X-Real-IP`. Values that are not IP addresses are skipped.
pub fn remote_addr(headers: &HeaderMap, peer: Option<SocketAddr>) -> Option<IpAddr> {
    let forwarded = header_str(headers, FORWARDED_FOR_HEADER)
        .and_then(|value| value.split(',').next())
        .and_then(|first| first.trim().parse().ok());

    forwarded
        .or_else(|| header_str(headers, REAL_IP_HEADER).and_then(|v| v.trim().parse().ok()))
        .or_else(|| peer.map(|addr| addr.ip()))
}

fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers.get(name).and_then(|value| value.to_str().ok())
}
