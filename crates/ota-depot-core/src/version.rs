//! Semantic version handling for firmware images and device reports.
//!
//! Devices report versions as `1.2.3` or `v1.2.3`. The shorthands `v1` and
//! `v1.2` are accepted as `1.0.0` and `1.2.0`. Anything else that does not
//! parse still gets a `FirmwareVersion`; it just ranks below every valid one.

use semver::Version;
use std::cmp::Ordering;

#[derive(Debug, Clone)]
pub struct FirmwareVersion {
    raw: String,
    parsed: Option<Version>,
}

impl FirmwareVersion {
    pub fn parse(raw: &str) -> Self {
        let trimmed = raw.strip_prefix('v').unwrap_or(raw);
        let parsed = Version::parse(trimmed)
            .ok()
            .or_else(|| parse_shorthand(trimmed));

        Self {
            raw: raw.to_string(),
            parsed,
        }
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }

    pub fn is_valid(&self) -> bool {
        self.parsed.is_some()
    }

    pub fn semver(&self) -> Option<&Version> {
        self.parsed.as_ref()
    }
}

// `major` or `major.minor`, numeric only, no leading zeros
fn parse_shorthand(s: &str) -> Option<Version> {
    let mut parts = s.split('.');
    let major = parse_numeric(parts.next()?)?;
    let minor = match parts.next() {
        Some(part) => parse_numeric(part)?,
        None => 0,
    };
    if parts.next().is_some() {
        return None;
    }
    Some(Version::new(major, minor, 0))
}

fn parse_numeric(s: &str) -> Option<u64> {
    if s.is_empty() || !s.bytes().all(|b| b.is_ascii_digit()) || (s.len() > 1 && s.starts_with('0'))
    {
        return None;
    }
    s.parse().ok()
}

/// Precedence ignores build metadata
fn cmp_precedence(a: &Version, b: &Version) -> Ordering {
    a.major
        .cmp(&b.major)
        .then(a.minor.cmp(&b.minor))
        .then(a.patch.cmp(&b.patch))
        .then_with(|| a.pre.cmp(&b.pre))
}

impl Ord for FirmwareVersion {
    fn cmp(&self, other: &Self) -> Ordering {
        match (&self.parsed, &other.parsed) {
            (Some(a), Some(b)) => cmp_precedence(a, b),
            (Some(_), None) => Ordering::Greater,
            (None, Some(_)) => Ordering::Less,
            (None, None) => Ordering::Equal,
        }
    }
}

impl PartialOrd for FirmwareVersion {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for FirmwareVersion {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for FirmwareVersion {}

impl std::fmt::Display for FirmwareVersion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.raw)
    }
}
