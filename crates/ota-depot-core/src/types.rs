use serde::{Deserialize, Serialize};
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::PathBuf;

use crate::error::OtaError;
use crate::version::FirmwareVersion;

/// Extension every published firmware image carries
pub const FIRMWARE_EXTENSION: &str = ".bin";

/// Logical name of a device/product line
///
/// Maps 1:1 to a subdirectory of the firmware root, so a family can never
/// contain a path separator or name the root itself.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FirmwareFamily(String);

impl FirmwareFamily {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Name devices store the image under, independent of its version
    pub fn attachment_name(&self) -> String {
        format!("{}{}", self.0, FIRMWARE_EXTENSION)
    }
}

impl std::fmt::Display for FirmwareFamily {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::str::FromStr for FirmwareFamily {
    type Err = OtaError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.is_empty() || s == "." || s == ".." || s.contains(['/', '\\', '\0']) {
            return Err(OtaError::InvalidFamily(s.to_string()));
        }
        Ok(FirmwareFamily(s.to_string()))
    }
}

/// A validated update check coming from a device
#[derive(Debug, Clone)]
pub struct UpdateRequest {
    pub client_agent: String,
    pub client_version: String,
    pub requested_path: String,
    pub firmware_family: FirmwareFamily,
    pub remote_addr: Option<IpAddr>,
}

/// One image on disk named `<family>-<version>.bin`
#[derive(Debug, Clone)]
pub struct FirmwareCandidate {
    pub family: FirmwareFamily,
    pub file_name: String,
    pub file_path: PathBuf,
    pub version: FirmwareVersion,
}

impl FirmwareCandidate {
    /// Build a candidate from a directory entry name.
    ///
    /// Returns `None` for names without the firmware extension or without the
    /// family prefix. The version is whatever sits between the last `-` and
    /// the extension, so `fw-1.0.0-rc1.bin` yields `rc1`; that string will not
    /// parse and the file never wins a comparison.
    pub fn from_file_name(
        family: &FirmwareFamily,
        file_name: &str,
        file_path: PathBuf,
    ) -> Option<Self> {
        let stem = file_name.strip_suffix(FIRMWARE_EXTENSION)?;
        if !file_name.starts_with(family.as_str()) {
            return None;
        }
        let raw_version = stem.rsplit('-').next().unwrap_or(stem);

        Some(Self {
            family: family.clone(),
            file_name: file_name.to_string(),
            file_path,
            version: FirmwareVersion::parse(raw_version),
        })
    }
}

/// What the resolver decided for one update check
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResolvedOutcome {
    /// Unknown family, or a family without any usable image
    NotFound,
    /// The newest image is not newer than what the device runs
    NoUpdate,
    UpdateAvailable {
        path: PathBuf,
        version: FirmwareVersion,
    },
    /// Storage failure, already logged
    InternalError,
}

/// Server configuration, fixed for the process lifetime
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub listen_addr: SocketAddr,
    pub firmware_root: PathBuf,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen_addr: SocketAddr::new(IpAddr::V4(Ipv4Addr::UNSPECIFIED), 8080),
            firmware_root: PathBuf::from("/var/lib/ota-depot/firmware"),
        }
    }
}
