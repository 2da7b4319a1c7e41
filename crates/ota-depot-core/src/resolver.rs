use std::path::{Path, PathBuf};
use tracing::{debug, error};

use crate::types::{FirmwareCandidate, FirmwareFamily, ResolvedOutcome};
use crate::version::FirmwareVersion;

/// Picks the newest firmware image for a family from the firmware root.
///
/// Layout consumed: `<root>/<family>/<family>-<version>.bin`. Every call scans
/// the directory again; nothing is cached between requests.
#[derive(Debug, Clone)]
pub struct FirmwareResolver {
    root: PathBuf,
}

impl FirmwareResolver {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn family_dir(&self, family: &FirmwareFamily) -> PathBuf {
        self.root.join(family.as_str())
    }

    /// List the candidates in a family directory.
    ///
    /// `Ok(None)` means the directory does not exist or is not a directory.
    pub async fn scan(
        &self,
        family: &FirmwareFamily,
    ) -> std::io::Result<Option<Vec<FirmwareCandidate>>> {
        let dir = self.family_dir(family);
        match tokio::fs::metadata(&dir).await {
            Ok(meta) if meta.is_dir() => {}
            _ => return Ok(None),
        }

        let mut candidates = Vec::new();
        let mut entries = tokio::fs::read_dir(&dir).await?;
        while let Some(entry) = entries.next_entry().await? {
            if entry.file_type().await?.is_dir() {
                continue;
            }
            let file_name = entry.file_name();
            let Some(file_name) = file_name.to_str() else {
                continue;
            };
            if let Some(candidate) =
                FirmwareCandidate::from_file_name(family, file_name, entry.path())
            {
                candidates.push(candidate);
            }
        }

        Ok(Some(candidates))
    }

    pub async fn resolve(&self, family: &FirmwareFamily, client_version: &str) -> ResolvedOutcome {
        let candidates = match self.scan(family).await {
            Ok(Some(candidates)) => candidates,
            Ok(None) => return ResolvedOutcome::NotFound,
            Err(e) => {
                error!(
                    "Firmware directory listing failed for {}: {}",
                    self.family_dir(family).display(),
                    e
                );
                return ResolvedOutcome::InternalError;
            }
        };

        let Some(latest) = select_latest(&candidates) else {
            debug!("No usable firmware images for family {}", family);
            return ResolvedOutcome::NotFound;
        };

        let client = FirmwareVersion::parse(client_version);
        if latest.version > client {
            ResolvedOutcome::UpdateAvailable {
                path: latest.file_path.clone(),
                version: latest.version.clone(),
            }
        } else {
            ResolvedOutcome::NoUpdate
        }
    }
}

/// Highest-precedence candidate with a parseable version.
///
/// Equal precedence (for instance differing only in build metadata) goes to
/// the lexicographically smallest file name, so directory order never matters.
pub fn select_latest(candidates: &[FirmwareCandidate]) -> Option<&FirmwareCandidate> {
    candidates
        .iter()
        .filter(|c| c.version.is_valid())
        .max_by(|a, b| {
            a.version
                .cmp(&b.version)
                .then_with(|| b.file_name.cmp(&a.file_name))
        })
}
